use crate::model::db::Role;

/// The privilege level a route guard demands.
///
/// Used as a marker type parameter on [`super::AuthToken`] so that a
/// route's signature states who may call it.
pub trait Permission {
    /// Does a user with the given role satisfy this permission?
    fn permits(role: Role) -> bool;
}

/// Any authenticated user.
pub struct AnyUser;

/// Administrators only.
pub struct Admins;

impl Permission for AnyUser {
    fn permits(_: Role) -> bool {
        true
    }
}

impl Permission for Admins {
    fn permits(role: Role) -> bool {
        role == Role::Admin
    }
}

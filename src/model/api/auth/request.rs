use serde::{Deserialize, Serialize};

use crate::model::{
    db::{Role, User},
    mongodb::Id,
};

/// A new-account request.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Defaults to `voter` when omitted.
    #[serde(default)]
    pub role: Role,
}

/// A login request.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A user as presented to API clients. Never includes the password hash.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDescription {
    pub id: Id,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.user.email,
            name: user.user.name,
            role: user.user.role,
        }
    }
}

/// The response to a successful registration or login.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserDescription,
    pub token: String,
}

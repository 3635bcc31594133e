use std::ops::Deref;

use argon2::Config as ArgonConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A user's privilege level.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Voter,
    Admin,
}

/// Core user data, as stored in the database.
/// Only the argon2-encoded hash of the password is ever stored.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: Role,
}

impl NewUser {
    /// Create a new user by hashing their plaintext password.
    pub fn new(email: String, password: &str, name: String, role: Role) -> Self {
        // 16 bytes of salt is the recommended amount for argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(password.as_bytes(), &salt, &ArgonConfig::default())
                .expect("Hashing with the default config does not fail");
        Self {
            email,
            password_hash,
            name,
            role,
        }
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }
}

/// A user from the database, with their unique ID.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: NewUser,
}

impl Deref for User {
    type Target = NewUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl NewUser {
        pub fn admin_example() -> Self {
            Self::new(
                "admin@university.edu".to_string(),
                "correct horse battery staple",
                "Election Officer".to_string(),
                Role::Admin,
            )
        }

        pub fn voter_example() -> Self {
            Self::new(
                "student@university.edu".to_string(),
                "hunter2hunter2",
                "Sam Student".to_string(),
                Role::Voter,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_never_stored_in_plaintext() {
        let user = NewUser::new(
            "a@b.c".to_string(),
            "s3cret-passphrase",
            "A".to_string(),
            Role::Voter,
        );
        assert_ne!(user.password_hash, "s3cret-passphrase");
        assert!(user.password_hash.starts_with("$argon2"));
    }

    #[test]
    fn correct_password_verifies() {
        let user = NewUser::new(
            "a@b.c".to_string(),
            "s3cret-passphrase",
            "A".to_string(),
            Role::Voter,
        );
        assert!(user.verify_password("s3cret-passphrase"));
    }

    #[test]
    fn altered_password_fails() {
        let user = NewUser::new(
            "a@b.c".to_string(),
            "s3cret-passphrase",
            "A".to_string(),
            Role::Voter,
        );
        assert!(!user.verify_password("s3cret-passphrasf"));
        assert!(!user.verify_password("S3cret-passphrase"));
        assert!(!user.verify_password(""));
    }

    #[test]
    fn salts_are_random() {
        let a = NewUser::new("a@b.c".to_string(), "pw", "A".to_string(), Role::Voter);
        let b = NewUser::new("a@b.c".to_string(), "pw", "A".to_string(), Role::Voter);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn role_serializes_lowercase() {
        use rocket::serde::json::serde_json;

        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(serde_json::to_string(&Role::Voter).unwrap(), "\"voter\"");
    }
}

use std::io::Cursor;

use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{ContentType, Status},
    response::{self, Responder, Response},
    serde::json::json,
    Request,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// All the ways a request can fail.
///
/// Business-rule failures carry a status and a client-visible message via
/// the `Status` variant; everything else is an internal failure that gets
/// logged and reported as an opaque 500.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Chain RPC failure: {0}")]
    Chain(#[from] reqwest::Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", what.into()))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Status(Status::Conflict, msg.into())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    /// Convert into a `{"error": "<message>"}` response with the right status.
    /// Internal errors are logged here and never shown to the client.
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'o> {
        let (status, message) = match self {
            Self::Status(status, message) => (status, message),
            Self::Jwt(err) => match err.into_kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    (Status::Forbidden, "Token expired".to_string())
                }
                _ => (Status::Forbidden, "Invalid token".to_string()),
            },
            err => {
                error!("Internal error: {err}");
                (Status::InternalServerError, "Server error".to_string())
            }
        };

        let body = json!({ "error": message }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

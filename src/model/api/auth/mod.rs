//! Authentication: request/response bodies, bearer tokens, and the
//! permission markers used by route guards.

mod request;
mod token;
mod user;

pub use request::{AuthResponse, Credentials, RegisterRequest, UserDescription};
pub use token::AuthToken;
pub use user::{Admins, AnyUser, Permission};

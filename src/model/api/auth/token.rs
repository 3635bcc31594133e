use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use mongodb::Database;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    db::{Role, User},
    mongodb::{Coll, Id},
};

use super::user::Permission;

/// An authentication token representing a specific user with a specific role.
///
/// As a request guard, `AuthToken<AnyUser>` admits any authenticated user
/// and `AuthToken<Admins>` admits admins only. A missing `Authorization`
/// header fails with 401; an invalid or expired token, or an insufficient
/// role, fails with 403.
pub struct AuthToken<P> {
    pub id: Id,
    pub role: Role,
    phantom: PhantomData<P>,
}

impl<P> AuthToken<P> {
    /// Create a new token for the given user.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            phantom: PhantomData,
        }
    }

    /// Sign this token into its wire form.
    pub fn encode(&self, config: &Config) -> String {
        let claims = Claims {
            sub: self.id,
            role: self.role,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
        .expect("JWT encoding is infallible with default settings")
    }

    /// Verify and decode a token from its wire form.
    pub fn decode(token: &str, config: &Config) -> Result<Self, Error> {
        let data: TokenData<Claims> = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )?;
        Ok(Self {
            id: data.claims.sub,
            role: data.claims.role,
            phantom: PhantomData,
        })
    }
}

/// Token claims: the user's identity and role, plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    sub: Id,
    #[serde(rename = "rol")]
    role: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

#[rocket::async_trait]
impl<'r, P> FromRequest<'r> for AuthToken<P>
where
    P: Permission + Send,
{
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let header = match req.headers().get_one("Authorization") {
            Some(header) => header,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Missing authorization header"),
                ))
            }
        };
        let token = match header.strip_prefix("Bearer ") {
            Some(token) => token,
            None => {
                return Outcome::Failure((
                    Status::Unauthorized,
                    Error::unauthorized("Expected a bearer token"),
                ))
            }
        };

        // Decode the token.
        let token: Self = match Self::decode(token, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Forbidden, e)),
        };

        // Check it represents the required role.
        if !P::permits(token.role) {
            return Outcome::Failure((
                Status::Forbidden,
                Error::forbidden("Insufficient privileges"),
            ));
        }

        // Check the user actually exists.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<User>::from_db(db).find_one(token.id.as_doc(), None).await {
            Ok(Some(_)) => Outcome::Success(token),
            Ok(None) => Outcome::Failure((
                Status::Forbidden,
                Error::forbidden("User no longer exists"),
            )),
            Err(e) => Outcome::Failure((Status::InternalServerError, e.into())),
        }
    }
}

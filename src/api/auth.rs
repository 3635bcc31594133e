use mongodb::bson::doc;
use rocket::{response::status::Created, serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{AnyUser, AuthResponse, AuthToken, Credentials, RegisterRequest},
    db::{NewUser, User},
    mongodb::{is_duplicate_key_error, Coll},
};

pub fn routes() -> Vec<Route> {
    routes![register, login]
}

#[post("/auth/register", format = "json", data = "<request>")]
async fn register(
    request: Json<RegisterRequest>,
    users: Coll<User>,
    new_users: Coll<NewUser>,
    config: &State<Config>,
) -> Result<Created<Json<AuthResponse>>> {
    let request = request.into_inner();
    if request.email.trim().is_empty()
        || request.password.is_empty()
        || request.name.trim().is_empty()
    {
        return Err(Error::bad_request("Email, password, and name are all required"));
    }

    // Friendly pre-check; the unique index on `email` is what actually
    // guarantees uniqueness under concurrent registrations.
    let existing = users.find_one(doc! { "email": &request.email }, None).await?;
    if existing.is_some() {
        return Err(Error::conflict("Email is already registered"));
    }

    let new_user = NewUser::new(request.email, &request.password, request.name, request.role);
    let id = match new_users.insert_one(&new_user, None).await {
        Ok(result) => result
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into(),
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::conflict("Email is already registered"));
        }
        Err(err) => return Err(err.into()),
    };

    let user = User { id, user: new_user };
    let token = AuthToken::<AnyUser>::for_user(&user).encode(config);
    let response = AuthResponse {
        user: user.into(),
        token,
    };
    Ok(Created::new(format!("/api/users/{}", id)).body(Json(response)))
}

#[post("/auth/login", format = "json", data = "<credentials>")]
async fn login(
    credentials: Json<Credentials>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let credentials = credentials.into_inner();

    // The same message for an unknown email and a wrong password, so the
    // endpoint cannot be used to probe which emails are registered.
    let user = users
        .find_one(doc! { "email": &credentials.email }, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Invalid email or password"))?;

    let token = AuthToken::<AnyUser>::for_user(&user).encode(config);
    Ok(Json(AuthResponse {
        user: user.into(),
        token,
    }))
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use crate::api::common::test::register;
    use crate::model::{
        api::AuthResponse,
        db::{Role, User},
        mongodb::Coll,
    };

    #[backend_test]
    async fn register_stores_hash_and_returns_token(client: Client, users: Coll<User>) {
        let auth = register(&client, "alice@uni.edu", "p4ssw0rd!", "voter").await;

        assert_eq!(auth.user.email, "alice@uni.edu");
        assert_eq!(auth.user.role, Role::Voter);
        assert!(!auth.token.is_empty());

        let stored = users
            .find_one(mongodb::bson::doc! { "email": "alice@uni.edu" }, None)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, "p4ssw0rd!");
        assert!(stored.verify_password("p4ssw0rd!"));
    }

    #[backend_test]
    async fn register_never_leaks_password_hash(client: Client) {
        let body = json!({
            "email": "bob@uni.edu",
            "password": "hunter2hunter2",
            "name": "Bob",
        });
        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        let raw = response.into_string().await.unwrap();
        assert!(!raw.contains("password"));
        assert!(!raw.contains("argon2"));
    }

    #[backend_test]
    async fn duplicate_email_conflicts(client: Client) {
        register(&client, "carol@uni.edu", "first-password", "voter").await;

        let body = json!({
            "email": "carol@uni.edu",
            "password": "second-password",
            "name": "Imposter",
        });
        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
    }

    #[backend_test]
    async fn register_requires_all_fields(client: Client) {
        for body in [
            json!({"email": "", "password": "pw", "name": "N"}),
            json!({"email": "a@b.c", "password": "", "name": "N"}),
            json!({"email": "a@b.c", "password": "pw", "name": "  "}),
        ] {
            let response = client
                .post("/api/auth/register")
                .header(ContentType::JSON)
                .body(serde_json::to_string(&body).unwrap())
                .dispatch()
                .await;
            assert_eq!(Status::BadRequest, response.status());
        }
    }

    #[backend_test]
    async fn login_round_trip(client: Client) {
        register(&client, "dave@uni.edu", "letmein-letmein", "admin").await;

        let body = json!({"email": "dave@uni.edu", "password": "letmein-letmein"});
        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let auth = response.into_json::<AuthResponse>().await.unwrap();
        assert_eq!(auth.user.role, Role::Admin);
    }

    #[backend_test]
    async fn bad_credentials_are_indistinguishable(client: Client) {
        register(&client, "eve@uni.edu", "correct-password", "voter").await;

        let mut messages = Vec::new();
        for body in [
            json!({"email": "eve@uni.edu", "password": "wrong-password"}),
            json!({"email": "nobody@uni.edu", "password": "whatever"}),
        ] {
            let response = client
                .post("/api/auth/login")
                .header(ContentType::JSON)
                .body(serde_json::to_string(&body).unwrap())
                .dispatch()
                .await;
            assert_eq!(Status::Unauthorized, response.status());
            messages.push(response.into_string().await.unwrap());
        }
        assert_eq!(messages[0], messages[1]);
    }
}

use rocket::{
    http::Status,
    response::status::Custom,
    serde::json::{json, Value},
    Catcher, Route,
};

mod auth;
mod common;
mod elections;
mod votes;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(elections::routes());
    routes.extend(votes::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![fallback, unprocessable]
}

/// Give every error response the same JSON shape, including those raised
/// by guards and the framework itself.
#[catch(default)]
fn fallback(status: Status, _request: &rocket::Request) -> Custom<Value> {
    let message = status.reason().unwrap_or("Unknown error");
    Custom(status, json!({ "error": message }))
}

/// A body that parses but doesn't match the expected shape is a client
/// error; report it as 400 rather than Rocket's default 422.
#[catch(422)]
fn unprocessable(_request: &rocket::Request) -> Custom<Value> {
    Custom(Status::BadRequest, json!({ "error": "Malformed request body" }))
}

#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

pub mod api;
pub mod chain;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

use config::{ChainFairing, ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use rocket::{Build, Rocket};

/// Assemble the server: config, database, chain bridge, and logging
/// fairings, plus all API routes under `/api`.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(ChainFairing)
        .attach(LoggerFairing)
        .mount("/api", api::routes())
        .register("/", api::catchers())
}

/// Connect to the test database server (test version).
/// Used by the `#[backend_test]` macro.
#[cfg(test)]
pub(crate) async fn db_client() -> mongodb::Client {
    let db_uri = rocket::Config::figment()
        .extract_inner::<String>("db_uri")
        .expect("`db_uri` not set");
    mongodb::Client::with_uri_str(&db_uri)
        .await
        .expect("Could not connect to database")
}

/// Pick a fresh database name to avoid collisions between tests.
#[cfg(test)]
pub(crate) fn database() -> String {
    let random: u32 = rand::random();
    format!("test{random}")
}

/// Build a rocket against a specific database, bypassing the connection
/// fairings so each test gets its own isolated database.
#[cfg(test)]
pub(crate) async fn rocket_for_db(client: mongodb::Client, db_name: &str) -> Rocket<Build> {
    let db = client.database(db_name);
    model::mongodb::ensure_indexes_exist(&db)
        .await
        .expect("Failed to create indexes");
    let config = rocket::Config::figment()
        .extract::<config::Config>()
        .expect("Invalid application config");

    rocket::build()
        .manage(config)
        .manage(client)
        .manage(db)
        .manage(chain::ChainClient::new("http://localhost:8545".to_string()))
        .mount("/api", api::routes())
        .register("/", api::catchers())
}

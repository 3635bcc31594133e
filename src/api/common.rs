use std::collections::HashMap;

use mongodb::bson::doc;
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    db::{Candidate, Election},
    mongodb::{Coll, Id},
};

/// Look up an election by ID, or 404.
pub async fn election_by_id(elections: &Coll<Election>, election_id: Id) -> Result<Election> {
    elections
        .find_one(election_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Election with ID '{}'", election_id)))
}

/// All candidates of one election.
pub async fn candidates_of(candidates: &Coll<Candidate>, election_id: Id) -> Result<Vec<Candidate>> {
    let found = candidates
        .find(doc! { "election_id": election_id }, None)
        .await?
        .try_collect()
        .await?;
    Ok(found)
}

/// All candidates in the database, grouped by their election.
pub async fn candidates_by_election(
    candidates: &Coll<Candidate>,
) -> Result<HashMap<Id, Vec<Candidate>>> {
    let all: Vec<Candidate> = candidates.find(None, None).await?.try_collect().await?;
    let mut by_election: HashMap<Id, Vec<Candidate>> = HashMap::new();
    for candidate in all {
        by_election
            .entry(candidate.election_id)
            .or_default()
            .push(candidate);
    }
    Ok(by_election)
}

/// Helpers shared by the route integration tests.
#[cfg(test)]
pub mod test {
    use chrono::{Duration, DurationRound, Utc};
    use rocket::{
        http::{ContentType, Header, Status},
        local::asynchronous::{Client, LocalResponse},
        serde::json::{json, serde_json, Value},
    };

    use crate::model::{
        api::{AuthResponse, ElectionDescription},
        mongodb::Id,
    };

    pub fn bearer(token: &str) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {}", token))
    }

    pub async fn register(
        client: &Client,
        email: &str,
        password: &str,
        role: &str,
    ) -> AuthResponse {
        let body = json!({
            "email": email,
            "password": password,
            "name": "Test User",
            "role": role,
        });
        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        response.into_json().await.unwrap()
    }

    pub async fn admin_token(client: &Client) -> String {
        register(client, "officer@uni.edu", "admin-password", "admin")
            .await
            .token
    }

    pub fn election_body() -> Value {
        // Truncate to milliseconds so the values survive the BSON round trip
        // and responses can be compared exactly.
        let start = Utc::now()
            .duration_trunc(Duration::milliseconds(1))
            .unwrap()
            - Duration::hours(1);
        let end = start + Duration::days(1);
        json!({
            "title": "Student Union President",
            "description": "Annual SU presidential election",
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "contract_address": "0x5FbDB2315678afecb367f032d93F642f64180aa3",
            "candidates": [
                {"name": "Alice Anderson", "on_chain_index": 0},
                {"name": "Bob Brown", "on_chain_index": 1},
            ],
        })
    }

    pub async fn create_election(client: &Client, token: &str) -> ElectionDescription {
        let response = client
            .post("/api/elections")
            .header(ContentType::JSON)
            .header(bearer(token))
            .body(serde_json::to_string(&election_body()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());
        response.into_json().await.unwrap()
    }

    pub async fn activate(client: &Client, token: &str, election_id: Id) {
        let response = client
            .put(format!("/api/elections/{}", election_id))
            .header(ContentType::JSON)
            .header(bearer(token))
            .body(serde_json::to_string(&json!({"state": "active"})).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
    }

    pub async fn cast_vote<'c>(
        client: &'c Client,
        token: &str,
        election_id: Id,
        candidate_id: Id,
        transaction_hash: &str,
    ) -> LocalResponse<'c> {
        client
            .post(format!(
                "/api/votes/elections/{}/candidates/{}",
                election_id, candidate_id
            ))
            .header(ContentType::JSON)
            .header(bearer(token))
            .body(
                serde_json::to_string(&json!({ "transaction_hash": transaction_hash })).unwrap(),
            )
            .dispatch()
            .await
    }
}

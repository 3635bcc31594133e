use chrono::Utc;
use mongodb::{bson::doc, Client};
use rocket::{
    futures::TryStreamExt, response::status::Created, serde::json::Json, Route, State,
};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        Admins, AuthToken, CandidateCount, CandidateDescription, CandidateSpec,
        ElectionDescription, ElectionResults, ElectionSpec, ElectionUpdate,
    },
    db::{Candidate, Election, ElectionState, NewCandidate, NewElection, Vote},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::common::{candidates_by_election, candidates_of, election_by_id};

pub fn routes() -> Vec<Route> {
    routes![
        create_election,
        get_elections,
        get_active_elections,
        get_election,
        update_election,
        delete_election,
        add_candidate,
        get_results,
    ]
}

/// Create an election together with its initial candidates, atomically.
#[post("/elections", format = "json", data = "<spec>")]
async fn create_election(
    _token: AuthToken<Admins>,
    spec: Json<ElectionSpec>,
    new_elections: Coll<NewElection>,
    new_candidates: Coll<NewCandidate>,
    candidates: Coll<Candidate>,
    db_client: &State<Client>,
) -> Result<Created<Json<ElectionDescription>>> {
    let spec = spec.into_inner();
    spec.validate()?;
    let (election, candidate_specs) = spec.into_election();

    let (election, election_candidates) = {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let election_id: Id = new_elections
            .insert_one_with_session(&election, None, &mut session)
            .await?
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into();

        let inserts = candidate_specs
            .into_iter()
            .map(|candidate| candidate.into_candidate(election_id))
            .collect::<Vec<_>>();
        new_candidates
            .insert_many_with_session(&inserts, None, &mut session)
            .await?;

        // Retrieve the candidates complete with their IDs.
        let mut cursor = candidates
            .find_with_session(doc! { "election_id": election_id }, None, &mut session)
            .await?;
        let election_candidates: Vec<Candidate> =
            cursor.stream(&mut session).try_collect().await?;

        session.commit_transaction().await?;
        (
            Election {
                id: election_id,
                election,
            },
            election_candidates,
        )
    };

    let location = format!("/api/elections/{}", election.id);
    let description = ElectionDescription::new(election, election_candidates);
    Ok(Created::new(location).body(Json(description)))
}

#[get("/elections")]
async fn get_elections(
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let all_elections: Vec<Election> = elections.find(None, None).await?.try_collect().await?;
    let mut by_election = candidates_by_election(&candidates).await?;

    let descriptions = all_elections
        .into_iter()
        .map(|election| {
            let election_candidates = by_election.remove(&election.id).unwrap_or_default();
            ElectionDescription::new(election, election_candidates)
        })
        .collect();
    Ok(Json(descriptions))
}

/// Elections that are currently accepting votes: active state and inside
/// their voting window.
#[get("/elections/active")]
async fn get_active_elections(
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<ElectionDescription>>> {
    let now = Utc::now();
    let filter = doc! {
        "state": ElectionState::Active,
        "start_time": { "$lte": now },
        "end_time": { "$gt": now },
    };
    let active: Vec<Election> = elections.find(filter, None).await?.try_collect().await?;
    let mut by_election = candidates_by_election(&candidates).await?;

    let descriptions = active
        .into_iter()
        .map(|election| {
            let election_candidates = by_election.remove(&election.id).unwrap_or_default();
            ElectionDescription::new(election, election_candidates)
        })
        .collect();
    Ok(Json(descriptions))
}

#[get("/elections/<election_id>")]
async fn get_election(
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDescription>> {
    let election = election_by_id(&elections, election_id).await?;
    let election_candidates = candidates_of(&candidates, election_id).await?;
    Ok(Json(ElectionDescription::new(election, election_candidates)))
}

/// Partially update an election. The voting-window invariant is re-checked
/// against the merged result, so an update cannot leave
/// `start_time >= end_time`.
#[put("/elections/<election_id>", format = "json", data = "<update>")]
async fn update_election(
    _token: AuthToken<Admins>,
    election_id: Id,
    update: Json<ElectionUpdate>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDescription>> {
    let mut election = election_by_id(&elections, election_id).await?;

    update.into_inner().apply(&mut election.election)?;
    elections
        .replace_one(election_id.as_doc(), &election, None)
        .await?;

    let election_candidates = candidates_of(&candidates, election_id).await?;
    Ok(Json(ElectionDescription::new(election, election_candidates)))
}

/// Delete an election along with its candidates and votes, atomically.
#[delete("/elections/<election_id>")]
async fn delete_election(
    _token: AuthToken<Admins>,
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<()> {
    election_by_id(&elections, election_id).await?;

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    elections
        .delete_one_with_session(election_id.as_doc(), None, &mut session)
        .await?;
    let filter = doc! { "election_id": election_id };
    candidates
        .delete_many_with_session(filter.clone(), None, &mut session)
        .await?;
    votes
        .delete_many_with_session(filter, None, &mut session)
        .await?;

    session.commit_transaction().await?;
    Ok(())
}

#[post("/elections/<election_id>/candidates", format = "json", data = "<spec>")]
async fn add_candidate(
    _token: AuthToken<Admins>,
    election_id: Id,
    spec: Json<CandidateSpec>,
    elections: Coll<Election>,
    new_candidates: Coll<NewCandidate>,
) -> Result<Created<Json<CandidateDescription>>> {
    election_by_id(&elections, election_id).await?;

    let spec = spec.into_inner();
    if spec.name.trim().is_empty() {
        return Err(Error::bad_request("Candidate name must not be empty"));
    }

    let candidate = spec.into_candidate(election_id);
    let id: Id = match new_candidates.insert_one(&candidate, None).await {
        Ok(result) => result
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into(),
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::conflict(
                "A candidate with that on-chain index already exists",
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let location = format!("/api/elections/{}/candidates", election_id);
    let description = CandidateDescription::from(Candidate { id, candidate });
    Ok(Created::new(location).body(Json(description)))
}

/// The off-chain tally: recorded vote receipts per candidate. The deployed
/// contract holds the authoritative count; this reflects what this backend
/// has recorded.
#[get("/elections/<election_id>/results")]
async fn get_results(
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
) -> Result<Json<ElectionResults>> {
    let election = election_by_id(&elections, election_id).await?;

    // Present candidates in contract order; those without an on-chain
    // index come last, sorted by name.
    let mut election_candidates = candidates_of(&candidates, election_id).await?;
    election_candidates.sort_by(|a, b| match (a.on_chain_index, b.on_chain_index) {
        (Some(a_index), Some(b_index)) => a_index.cmp(&b_index),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });

    let mut counts = Vec::with_capacity(election_candidates.len());
    let mut total_votes = 0;
    for candidate in election_candidates {
        let vote_count = votes
            .count_documents(
                doc! { "election_id": election_id, "candidate_id": candidate.id },
                None,
            )
            .await?;
        total_votes += vote_count;
        counts.push(CandidateCount {
            id: candidate.id,
            name: candidate.candidate.name,
            on_chain_index: candidate.candidate.on_chain_index,
            vote_count,
        });
    }

    Ok(Json(ElectionResults {
        election_id,
        title: election.election.title,
        state: election.election.state,
        total_votes,
        candidates: counts,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::{json, serde_json},
    };

    use crate::api::common::test::{
        activate, admin_token, bearer, cast_vote, create_election, election_body, register,
    };
    use crate::model::{
        api::ElectionDescription,
        db::{Candidate, Election, ElectionState, Vote},
        mongodb::Coll,
    };

    #[backend_test]
    async fn create_inserts_election_and_candidates(client: Client, candidates: Coll<Candidate>) {
        let token = admin_token(&client).await;
        let description = create_election(&client, &token).await;

        assert_eq!(description.state, ElectionState::Pending);
        assert_eq!(description.candidates.len(), 2);

        let stored = candidates
            .count_documents(mongodb::bson::doc! { "election_id": description.id }, None)
            .await
            .unwrap();
        assert_eq!(stored, 2);
    }

    #[backend_test]
    async fn create_requires_admin(client: Client, elections: Coll<Election>) {
        // No token at all.
        let response = client
            .post("/api/elections")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&election_body()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());

        // A voter token is not enough.
        let voter = register(&client, "student@uni.edu", "student-pw", "voter").await;
        let response = client
            .post("/api/elections")
            .header(ContentType::JSON)
            .header(bearer(&voter.token))
            .body(serde_json::to_string(&election_body()).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Forbidden, response.status());

        assert_eq!(elections.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn create_rejects_invalid_window(client: Client) {
        let token = admin_token(&client).await;
        let mut body = election_body();
        body["end_time"] = body["start_time"].clone();
        let response = client
            .post("/api/elections")
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
    }

    #[backend_test]
    async fn get_and_list_include_candidates(client: Client) {
        let token = admin_token(&client).await;
        let created = create_election(&client, &token).await;

        let response = client
            .get(format!("/api/elections/{}", created.id))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let fetched: ElectionDescription = response.into_json().await.unwrap();
        assert_eq!(fetched, created);

        let response = client.get("/api/elections").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        let all: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].candidates.len(), 2);
    }

    #[backend_test]
    async fn missing_election_is_404(client: Client) {
        let response = client
            .get("/api/elections/000000000000000000000000")
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test]
    async fn active_filter_excludes_pending_and_out_of_window(client: Client) {
        let token = admin_token(&client).await;
        let pending = create_election(&client, &token).await;

        // Still pending, so not active.
        let response = client.get("/api/elections/active").dispatch().await;
        let active: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert!(active.is_empty());

        activate(&client, &token, pending.id).await;
        let response = client.get("/api/elections/active").dispatch().await;
        let active: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert_eq!(active.len(), 1);

        // Push the window into the future; active state alone is not enough.
        let start = Utc::now() + Duration::days(1);
        let body = json!({
            "start_time": start.to_rfc3339(),
            "end_time": (start + Duration::days(1)).to_rfc3339(),
        });
        let response = client
            .put(format!("/api/elections/{}", pending.id))
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let response = client.get("/api/elections/active").dispatch().await;
        let active: Vec<ElectionDescription> = response.into_json().await.unwrap();
        assert!(active.is_empty());
    }

    #[backend_test]
    async fn update_revalidates_window_against_merged_document(client: Client) {
        let token = admin_token(&client).await;
        let created = create_election(&client, &token).await;

        // Moving only the end time before the existing start must fail.
        let body = json!({
            "end_time": (created.start_time - Duration::hours(2)).to_rfc3339(),
        });
        let response = client
            .put(format!("/api/elections/{}", created.id))
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());

        // The election is unchanged.
        let fetched: ElectionDescription = client
            .get(format!("/api/elections/{}", created.id))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(fetched.end_time, created.end_time);
    }

    #[backend_test]
    async fn delete_cascades(
        client: Client,
        elections: Coll<Election>,
        candidates: Coll<Candidate>,
        votes: Coll<Vote>,
    ) {
        let token = admin_token(&client).await;
        let created = create_election(&client, &token).await;
        activate(&client, &token, created.id).await;

        // Record one vote so the cascade has something to delete.
        let voter = register(&client, "student@uni.edu", "student-pw", "voter").await;
        let response = cast_vote(
            &client,
            &voter.token,
            created.id,
            created.candidates[0].id,
            "0xabc123",
        )
        .await;
        assert_eq!(Status::Created, response.status());

        let response = client
            .delete(format!("/api/elections/{}", created.id))
            .header(bearer(&token))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        assert_eq!(elections.count_documents(None, None).await.unwrap(), 0);
        assert_eq!(candidates.count_documents(None, None).await.unwrap(), 0);
        assert_eq!(votes.count_documents(None, None).await.unwrap(), 0);
    }

    #[backend_test]
    async fn add_candidate_to_existing_election(client: Client) {
        let token = admin_token(&client).await;
        let created = create_election(&client, &token).await;

        let body = json!({"name": "Carol Clark", "on_chain_index": 2});
        let response = client
            .post(format!("/api/elections/{}/candidates", created.id))
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Created, response.status());

        let fetched: ElectionDescription = client
            .get(format!("/api/elections/{}", created.id))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(fetched.candidates.len(), 3);
    }

    #[backend_test]
    async fn duplicate_on_chain_index_conflicts(client: Client) {
        let token = admin_token(&client).await;
        let created = create_election(&client, &token).await;

        let body = json!({"name": "Copycat", "on_chain_index": 0});
        let response = client
            .post(format!("/api/elections/{}/candidates", created.id))
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(serde_json::to_string(&body).unwrap())
            .dispatch()
            .await;
        assert_eq!(Status::Conflict, response.status());
    }
}

use mongodb::bson::doc;
use rocket::{
    futures::TryStreamExt, response::status::Created, serde::json::Json, Route, State,
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::chain::ChainClient;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        AnyUser, AuthToken, CastVoteRequest, ElectionVoteCount, VoteHistoryEntry, VoteReceipt,
        VoteStatus,
    },
    db::{Candidate, Election, ElectionState, NewVote, Vote},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::common::election_by_id;

pub fn routes() -> Vec<Route> {
    routes![vote_status, cast_vote, voting_history, vote_stats]
}

/// Has the requesting user already voted in this election?
#[get("/votes/elections/<election_id>/status")]
async fn vote_status(
    token: AuthToken<AnyUser>,
    election_id: Id,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<VoteStatus>> {
    election_by_id(&elections, election_id).await?;
    let has_voted = votes
        .find_one(
            doc! { "user_id": token.id, "election_id": election_id },
            None,
        )
        .await?
        .is_some();
    Ok(Json(VoteStatus { has_voted }))
}

/// Record a vote receipt for an on-chain transaction.
///
/// The early already-voted check gives a clean error in the common case;
/// under a race, the unique index on `(user_id, election_id)` is what
/// actually prevents a second vote from being recorded.
#[cfg_attr(test, allow(unused_variables))]
#[post(
    "/votes/elections/<election_id>/candidates/<candidate_id>",
    format = "json",
    data = "<request>"
)]
async fn cast_vote(
    token: AuthToken<AnyUser>,
    election_id: Id,
    candidate_id: Id,
    request: Json<CastVoteRequest>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
    votes: Coll<Vote>,
    new_votes: Coll<NewVote>,
    chain: &State<ChainClient>,
) -> Result<Created<Json<VoteReceipt>>> {
    let already_voted = votes
        .find_one(
            doc! { "user_id": token.id, "election_id": election_id },
            None,
        )
        .await?
        .is_some();
    if already_voted {
        return Err(Error::conflict("You have already voted in this election"));
    }

    let election = election_by_id(&elections, election_id).await?;

    // The candidate lookup is scoped to the election, so a candidate ID
    // from a different election is a 404 rather than a silent cross-vote.
    candidates
        .find_one(
            doc! { "_id": candidate_id, "election_id": election_id },
            None,
        )
        .await?
        .ok_or_else(|| {
            Error::not_found(format!(
                "Candidate with ID '{}' in election '{}'",
                candidate_id, election_id
            ))
        })?;

    if election.state != ElectionState::Active {
        return Err(Error::bad_request("Election is not open for voting"));
    }

    let request = request.into_inner();
    if request.transaction_hash.trim().is_empty() {
        return Err(Error::bad_request("Transaction hash must not be empty"));
    }

    // Existence-only verification; local test runs have no chain node.
    #[cfg(not(test))]
    {
        let exists = chain
            .transaction_exists(&request.transaction_hash)
            .await
            .map_err(|err| {
                warn!("Chain lookup failed: {}", err);
                Error::bad_request("Could not verify transaction on chain")
            })?;
        if !exists {
            return Err(Error::bad_request("Transaction not found on chain"));
        }
    }

    let vote = NewVote::new(token.id, election_id, candidate_id, request.transaction_hash);
    let id: Id = match new_votes.insert_one(&vote, None).await {
        Ok(result) => result
            .inserted_id
            .as_object_id()
            .unwrap() // Valid because the ID comes directly from the DB
            .into(),
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(Error::conflict(
                "You have already voted in this election, or the transaction is already used",
            ));
        }
        Err(err) => return Err(err.into()),
    };

    let location = format!("/api/votes/elections/{}/status", election_id);
    let receipt = VoteReceipt::from(Vote { id, vote });
    Ok(Created::new(location).body(Json(receipt)))
}

/// The requesting user's votes, joined with election and candidate details.
#[get("/votes/history")]
async fn voting_history(
    token: AuthToken<AnyUser>,
    votes: Coll<Vote>,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<VoteHistoryEntry>>> {
    let user_votes: Vec<Vote> = votes
        .find(doc! { "user_id": token.id }, None)
        .await?
        .try_collect()
        .await?;

    let election_ids = user_votes
        .iter()
        .map(|vote| vote.election_id)
        .collect::<Vec<_>>();
    let elections_by_id: HashMap<Id, Election> = elections
        .find(doc! { "_id": { "$in": election_ids } }, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .map(|election| (election.id, election))
        .collect();

    let candidate_ids = user_votes
        .iter()
        .map(|vote| vote.candidate_id)
        .collect::<Vec<_>>();
    let candidates_by_id: HashMap<Id, Candidate> = candidates
        .find(doc! { "_id": { "$in": candidate_ids } }, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .map(|candidate| (candidate.id, candidate))
        .collect();

    // Votes whose election or candidate has since been removed are
    // skipped rather than reported half-empty.
    let history = user_votes
        .into_iter()
        .filter_map(|vote| {
            let election = elections_by_id.get(&vote.election_id)?;
            let candidate = candidates_by_id.get(&vote.candidate_id)?;
            Some(VoteHistoryEntry {
                election_id: election.id,
                election_title: election.title.clone(),
                election_state: election.state,
                start_time: election.start_time,
                end_time: election.end_time,
                candidate_name: candidate.name.clone(),
                transaction_hash: vote.vote.transaction_hash,
                cast_at: vote.vote.cast_at,
            })
        })
        .collect();
    Ok(Json(history))
}

/// Recorded receipts per election, via a single aggregation.
#[get("/votes/stats")]
async fn vote_stats(
    votes: Coll<Vote>,
    elections: Coll<Election>,
) -> Result<Json<Vec<ElectionVoteCount>>> {
    #[derive(Deserialize)]
    struct VoteGroup {
        #[serde(rename = "_id")]
        election_id: Id,
        count: i64,
    }

    let pipeline = vec![doc! {
        "$group": {
            "_id": "$election_id",
            "count": { "$sum": 1 },
        }
    }];
    let groups: Vec<VoteGroup> = votes
        .aggregate(pipeline, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .map(|doc| mongodb::bson::from_document(doc).map_err(mongodb::error::Error::from))
        .collect::<std::result::Result<_, _>>()?;

    let election_ids = groups
        .iter()
        .map(|group| group.election_id)
        .collect::<Vec<_>>();
    let titles: HashMap<Id, String> = elections
        .find(doc! { "_id": { "$in": election_ids } }, None)
        .await?
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .map(|election| (election.id, election.election.title))
        .collect();

    let mut stats = groups
        .into_iter()
        .filter_map(|group| {
            let title = titles.get(&group.election_id)?.clone();
            Some(ElectionVoteCount {
                election_id: group.election_id,
                title,
                vote_count: group.count as u64,
            })
        })
        .collect::<Vec<_>>();
    stats.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(Json(stats))
}

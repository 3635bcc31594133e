use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    db::{ElectionState, Vote},
    mongodb::Id,
};

/// The body of a cast-vote request. The election and candidate come from
/// the route; the caller supplies the on-chain transaction that cast it.
#[derive(Debug, Clone, Deserialize)]
pub struct CastVoteRequest {
    pub transaction_hash: String,
}

/// The receipt returned for a recorded vote.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub id: Id,
    pub election_id: Id,
    pub candidate_id: Id,
    pub transaction_hash: String,
    pub cast_at: DateTime<Utc>,
}

impl From<Vote> for VoteReceipt {
    fn from(vote: Vote) -> Self {
        Self {
            id: vote.id,
            election_id: vote.vote.election_id,
            candidate_id: vote.vote.candidate_id,
            transaction_hash: vote.vote.transaction_hash,
            cast_at: vote.vote.cast_at,
        }
    }
}

/// Whether the requesting user has already voted in an election.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatus {
    pub has_voted: bool,
}

/// One entry in a user's voting history.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteHistoryEntry {
    pub election_id: Id,
    pub election_title: String,
    pub election_state: ElectionState,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub candidate_name: String,
    pub transaction_hash: String,
    pub cast_at: DateTime<Utc>,
}

/// Recorded-receipt count for one election, as returned by the stats route.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionVoteCount {
    pub election_id: Id,
    pub title: String,
    pub vote_count: u64,
}

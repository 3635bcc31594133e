use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core vote data, as stored in the database.
///
/// A vote row is an audit receipt for an on-chain transaction, not the
/// authoritative tally; the contract owns that. The unique indexes on
/// `(user_id, election_id)` and `transaction_hash` are what actually
/// enforce one vote per user per election.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct NewVote {
    pub user_id: Id,
    pub election_id: Id,
    pub candidate_id: Id,
    /// Hash of the on-chain transaction that cast this vote.
    pub transaction_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl NewVote {
    pub fn new(user_id: Id, election_id: Id, candidate_id: Id, transaction_hash: String) -> Self {
        Self {
            user_id,
            election_id,
            candidate_id,
            transaction_hash,
            cast_at: Utc::now(),
        }
    }
}

/// A vote from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: NewVote,
}

impl Deref for Vote {
    type Target = NewVote;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core candidate data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct NewCandidate {
    /// The election this candidate belongs to.
    pub election_id: Id,
    pub name: String,
    pub description: Option<String>,
    /// Position in the contract's candidate array. Must match the order
    /// used on chain; absent for candidates not represented on chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_chain_index: Option<u32>,
}

/// A candidate from the database, with its unique ID.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: NewCandidate,
}

impl Deref for Candidate {
    type Target = NewCandidate;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

use chrono::{DateTime, Utc};
use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    db::{Candidate, Election, ElectionState, NewCandidate, NewElection},
    mongodb::Id,
};

/// An election as submitted by an administrator.
///
/// Datetimes here are plain JSON (RFC 3339) rather than BSON; conversion to
/// the database representation happens via [`ElectionSpec::into_election`].
#[derive(Debug, Clone, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub contract_address: Option<String>,
    #[serde(default)]
    pub contract_abi: Option<Bson>,
    pub candidates: Vec<CandidateSpec>,
}

impl ElectionSpec {
    /// Check the business rules for a new election.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::bad_request("Election title must not be empty"));
        }
        if self.description.trim().is_empty() {
            return Err(Error::bad_request("Election description must not be empty"));
        }
        if self.start_time >= self.end_time {
            return Err(Error::bad_request("Election must start before it ends"));
        }
        if self.candidates.is_empty() {
            return Err(Error::bad_request("Election must have at least one candidate"));
        }
        for candidate in &self.candidates {
            if candidate.name.trim().is_empty() {
                return Err(Error::bad_request("Candidate name must not be empty"));
            }
        }
        Ok(())
    }

    /// Convert into a database election (always created pending) plus the
    /// candidate specs still awaiting the election's ID.
    pub fn into_election(self) -> (NewElection, Vec<CandidateSpec>) {
        let election = NewElection {
            title: self.title,
            description: self.description,
            state: ElectionState::Pending,
            start_time: self.start_time,
            end_time: self.end_time,
            contract_address: self.contract_address,
            contract_abi: self.contract_abi,
        };
        (election, self.candidates)
    }
}

/// A candidate as submitted by an administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub on_chain_index: Option<u32>,
}

impl CandidateSpec {
    /// Attach this candidate to its election.
    pub fn into_candidate(self, election_id: Id) -> NewCandidate {
        NewCandidate {
            election_id,
            name: self.name,
            description: self.description,
            on_chain_index: self.on_chain_index,
        }
    }
}

/// A partial election update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElectionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub state: Option<ElectionState>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub contract_address: Option<String>,
    pub contract_abi: Option<Bson>,
}

impl ElectionUpdate {
    /// Merge this update into an election, re-checking the invariants
    /// against the merged result. In particular, moving either bound of the
    /// voting window must leave `start_time < end_time`.
    pub fn apply(self, election: &mut NewElection) -> Result<()> {
        if let Some(title) = self.title {
            if title.trim().is_empty() {
                return Err(Error::bad_request("Election title must not be empty"));
            }
            election.title = title;
        }
        if let Some(description) = self.description {
            if description.trim().is_empty() {
                return Err(Error::bad_request("Election description must not be empty"));
            }
            election.description = description;
        }
        if let Some(state) = self.state {
            election.state = state;
        }
        if let Some(start_time) = self.start_time {
            election.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            election.end_time = end_time;
        }
        if election.start_time >= election.end_time {
            return Err(Error::bad_request("Election must start before it ends"));
        }
        Ok(())
    }
}

/// An election as presented to API clients, with its candidates inlined.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ElectionDescription {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub state: ElectionState,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub contract_address: Option<String>,
    pub contract_abi: Option<Bson>,
    pub candidates: Vec<CandidateDescription>,
}

impl ElectionDescription {
    pub fn new(election: Election, candidates: Vec<Candidate>) -> Self {
        Self {
            id: election.id,
            title: election.election.title,
            description: election.election.description,
            state: election.election.state,
            start_time: election.election.start_time,
            end_time: election.election.end_time,
            contract_address: election.election.contract_address,
            contract_abi: election.election.contract_abi,
            candidates: candidates.into_iter().map(CandidateDescription::from).collect(),
        }
    }
}

/// A candidate as presented to API clients.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDescription {
    pub id: Id,
    pub name: String,
    pub description: Option<String>,
    pub on_chain_index: Option<u32>,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            name: candidate.candidate.name,
            description: candidate.candidate.description,
            on_chain_index: candidate.candidate.on_chain_index,
        }
    }
}

/// One candidate's recorded-receipt count in an election's results.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCount {
    pub id: Id,
    pub name: String,
    pub on_chain_index: Option<u32>,
    pub vote_count: u64,
}

/// Off-chain election results, counting recorded vote receipts only.
/// The deployed contract remains the authoritative tally.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionResults {
    pub election_id: Id,
    pub title: String,
    pub state: ElectionState,
    pub total_votes: u64,
    pub candidates: Vec<CandidateCount>,
}

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{serde_helpers::chrono_datetime_as_bson_datetime, to_bson, Bson};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// States in the election lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionState {
    /// Created but not yet open for voting.
    Pending,
    /// Open for voting (within the start/end window).
    Active,
    /// Closed; results are final.
    Completed,
}

impl From<ElectionState> for Bson {
    fn from(state: ElectionState) -> Self {
        to_bson(&state).expect("Serialisation is infallible")
    }
}

/// Core election data, as stored in the database.
///
/// The contract fields describe the externally deployed contract that
/// holds the authoritative tally; the backend never calls it directly.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NewElection {
    pub title: String,
    pub description: String,
    pub state: ElectionState,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_time: DateTime<Utc>,
    pub contract_address: Option<String>,
    pub contract_abi: Option<Bson>,
}

impl NewElection {
    /// Is this election currently accepting votes?
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.state == ElectionState::Active && self.start_time <= now && now < self.end_time
    }
}

/// An election from the database, with its unique ID.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: NewElection,
}

impl Deref for Election {
    type Target = NewElection;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

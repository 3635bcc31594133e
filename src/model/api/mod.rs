//! API-compatible types: request bodies, response shapes, and the auth
//! guard. Datetimes serialise as RFC 3339 here, unlike the BSON forms in
//! [`crate::model::db`].

pub mod auth;
pub mod election;
pub mod vote;

pub use auth::{Admins, AnyUser, AuthResponse, AuthToken, Credentials, RegisterRequest, UserDescription};
pub use election::{
    CandidateCount, CandidateDescription, CandidateSpec, ElectionDescription, ElectionResults,
    ElectionSpec, ElectionUpdate,
};
pub use vote::{CastVoteRequest, ElectionVoteCount, VoteHistoryEntry, VoteReceipt, VoteStatus};

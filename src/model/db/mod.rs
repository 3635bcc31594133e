//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in a DB-friendly way, e.g. IDs
//! and datetimes use MongoDB's own formats. Each entity comes in two
//! flavours: a `New*` type without an ID (for inserts) and a full type
//! with the `_id` the database assigned.

pub mod candidate;
pub mod election;
pub mod user;
pub mod vote;

pub use candidate::{Candidate, NewCandidate};
pub use election::{Election, ElectionState, NewElection};
pub use user::{NewUser, Role, User};
pub use vote::{NewVote, Vote};

//! Core domain types
//!
//! A session grants time-bounded access to one remote database using a
//! credential supplied once. Job records are read fresh from that database
//! on every poll and are never persisted.

pub mod credential;
pub mod job;
pub mod session;

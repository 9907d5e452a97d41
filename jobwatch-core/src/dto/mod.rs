//! Data Transfer Objects for the HTTP adapter
//!
//! Request and response bodies exchanged with the browser front-end.

pub mod metrics;
pub mod session;

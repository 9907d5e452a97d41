//! Scheduler layer
//!
//! Discovers live sessions and keeps one polling task per session, each on
//! its own timer, so one tenant's cadence never depends on how many other
//! tenants there are or how slow they are.

pub mod poller;

pub use poller::{PollerSettings, SessionPoller};

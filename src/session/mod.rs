//! Session lifecycle
//!
//! The controller owning start/stop, and the two capture loops it runs on
//! their own threads.

pub mod controller;
pub(crate) mod loops;

pub use controller::{Recorder, SessionSummary};

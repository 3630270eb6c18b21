//! Throttle Module - Rate limiting for viewport publications
//!
//! - [`state`] - the pure Idle/Scheduled state machine
//! - [`scheduler`] - drives the machine from an event source and a platform

pub mod scheduler;
pub mod state;

pub use scheduler::{Cadence, PublishFn, ThrottleScheduler};
pub use state::{Phase, ThrottleState, TickAction, TriggerAction};

//! Event Source - Raw viewport events normalized into one change trigger
//!
//! - **Resize** events trigger immediately
//! - **Orientation** events trigger after a settle delay, since the reported
//!   dimensions lag behind the rotation
//!
//! No throttling happens here. See [`crate::throttle`] for that.

mod adapter;

pub use adapter::{ChangeFn, ChangeSubscription, EventSource};

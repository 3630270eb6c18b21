//! # spark-viewport
//!
//! Throttled, reactive viewport size for spark-tui.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals): the
//! published size is a `Signal<Size>`, so anything derived from it re-runs
//! when the viewport changes, but never more often than once per frame (or
//! per the configured fps).
//!
//! ## Architecture
//!
//! ```text
//! resize / orientation → EventSource → ThrottleScheduler → Signal<Size>
//!                        (settle)      (cadence gate)      (publish)
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Size, ThrottleConfig, ConfigError
//! - [`platform`] - Platform trait plus manual, terminal and headless platforms
//! - [`source`] - Shared resize/orientation listener registration
//! - [`throttle`] - Throttle state machine and scheduler
//! - [`observe`] - `observe_size` / `observe_width` / `observe_height`

pub mod observe;
pub mod platform;
pub mod source;
pub mod throttle;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use platform::{
    Capabilities, EventKind, HeadlessPlatform, ManualPlatform, Platform, TerminalPlatform,
};

pub use source::{ChangeSubscription, EventSource};

pub use throttle::{Cadence, Phase, ThrottleScheduler};

pub use observe::{
    default_viewport, height_derived, install_platform, observe_height, observe_size,
    observe_width, reset_viewport, width_derived, HeightSubscription, SizeSubscription,
    Viewport, WidthSubscription,
};

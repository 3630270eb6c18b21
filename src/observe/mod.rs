//! Observe Module - Public accessors for the throttled viewport size
//!
//! - `observe_size` - full `(width, height)`
//! - `observe_width` / `observe_height` - one dimension, same scheduler
//!
//! # Example
//!
//! ```ignore
//! use spark_viewport::{install_platform, observe_size, ThrottleConfig};
//!
//! install_platform(Rc::new(TerminalPlatform::new()));
//!
//! let size = observe_size(None, ThrottleConfig::default())?;
//! let cleanup = size.on_publish(|size| println!("{}x{}", size.width, size.height));
//! ```

mod subscription;
mod viewport;

pub use subscription::{
    height_derived, width_derived, HeightSubscription, SizeSubscription, WidthSubscription,
};
pub use viewport::{
    default_viewport, install_platform, observe_height, observe_size, observe_width,
    reset_viewport, Viewport,
};

// =============================================================================
// Tests
// =============================================================================

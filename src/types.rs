//! Core types for spark-viewport.
//!
//! These types flow from the platform through the scheduler and out to
//! subscribers. Everything else builds on them.

use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Default publish rate. Matches the usual display refresh rate, so the
/// default cadence lines up with animation frames.
pub const DEFAULT_FPS: f64 = 60.0;

/// Delay between an orientation change and the trigger it produces.
///
/// Platforms report stale dimensions for a short while after rotating.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(16);

// =============================================================================
// Size
// =============================================================================

/// Viewport dimensions in pixels (or cells, for terminals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Zero-sized viewport. Used when nothing better is known.
    pub const ZERO: Self = Self::new(0, 0);

    /// Create a new size.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl From<(u16, u16)> for Size {
    fn from((width, height): (u16, u16)) -> Self {
        Self::new(width as u32, height as u32)
    }
}

impl From<Size> for (u32, u32) {
    fn from(size: Size) -> Self {
        (size.width, size.height)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration errors, reported synchronously when subscribing.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// fps was zero, negative, NaN or infinite.
    #[error("fps must be a positive finite number, got {0}")]
    InvalidFps(f64),
    /// The orientation settle delay must be non-zero.
    #[error("orientation settle delay must be non-zero")]
    ZeroSettleDelay,
}

// =============================================================================
// Throttle Config
// =============================================================================

/// Timing policy for a size subscription.
///
/// ```ignore
/// let config = ThrottleConfig::default().leading(true).fps(30.0);
/// assert_eq!(config.interval(), Duration::from_secs_f64(1.0 / 30.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    /// Publish the first trigger immediately instead of waiting for a tick.
    pub leading: bool,
    /// Maximum publications per second.
    pub fps: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            leading: false,
            fps: DEFAULT_FPS,
        }
    }
}

impl ThrottleConfig {
    /// Set leading-edge publishing.
    pub fn leading(mut self, leading: bool) -> Self {
        self.leading = leading;
        self
    }

    /// Set the publish rate.
    pub fn fps(mut self, fps: f64) -> Self {
        self.fps = fps;
        self
    }

    /// Check that the config can drive a scheduler.
    ///
    /// Rejects fps values so small that `1 / fps` seconds overflows a `Duration`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = self.fps.is_finite() && self.fps > 0.0;
        if positive && Duration::try_from_secs_f64(1.0 / self.fps).is_ok() {
            Ok(())
        } else {
            Err(ConfigError::InvalidFps(self.fps))
        }
    }

    /// Minimum time between two publications (`1000 / fps` ms).
    ///
    /// Only meaningful for a validated config; saturates to `Duration::MAX`
    /// otherwise.
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(1.0 / self.fps).unwrap_or(Duration::MAX)
    }
}

// =============================================================================
// Tests
// =============================================================================

//! Viewport context and the `observe_*` accessors.
//!
//! A [`Viewport`] bundles a platform with the one event source every
//! subscription on it shares. The free functions use a thread-local default
//! viewport, which is headless until [`install_platform`] is called.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use spark_signals::signal;
use tracing::debug;

use super::subscription::{HeightSubscription, SizeSubscription, WidthSubscription};
use crate::platform::{HeadlessPlatform, Platform};
use crate::source::EventSource;
use crate::throttle::ThrottleScheduler;
use crate::types::{ConfigError, Size, ThrottleConfig};

// =============================================================================
// VIEWPORT
// =============================================================================

/// A platform plus its shared event source.
#[derive(Clone)]
pub struct Viewport {
    platform: Rc<dyn Platform>,
    source: EventSource,
}

impl Viewport {
    pub fn new(platform: Rc<dyn Platform>) -> Self {
        let source = EventSource::new(platform.clone());
        Self { platform, source }
    }

    /// Viewport whose orientation changes settle for `settle_delay`.
    pub fn with_settle_delay(
        platform: Rc<dyn Platform>,
        settle_delay: Duration,
    ) -> Result<Self, ConfigError> {
        let source = EventSource::with_settle_delay(platform.clone(), settle_delay)?;
        Ok(Self { platform, source })
    }

    /// Viewport for hosts without one. Subscriptions keep their initial size.
    pub fn headless() -> Self {
        Self::new(Rc::new(HeadlessPlatform))
    }

    pub fn platform(&self) -> &Rc<dyn Platform> {
        &self.platform
    }

    pub fn source(&self) -> &EventSource {
        &self.source
    }

    /// Throttled viewport size.
    ///
    /// Starts from the measured size, or from `initial` (default 0x0) when
    /// the platform reports no viewport events. Fails on an invalid fps.
    pub fn observe_size(
        &self,
        initial: Option<Size>,
        config: ThrottleConfig,
    ) -> Result<SizeSubscription, ConfigError> {
        config.validate()?;

        if !self.platform.capabilities().observes_viewport() {
            let initial = initial.unwrap_or_default();
            debug!(?initial, "no viewport events, keeping initial size");
            return Ok(SizeSubscription::new(signal(initial), None));
        }

        let value = signal(self.platform.current_viewport_size());
        let scheduler =
            ThrottleScheduler::start(self.platform.clone(), &self.source, config, value.clone())?;
        Ok(SizeSubscription::new(value, Some(scheduler)))
    }

    /// Throttled viewport width.
    pub fn observe_width(
        &self,
        initial: Option<Size>,
        config: ThrottleConfig,
    ) -> Result<WidthSubscription, ConfigError> {
        self.observe_size(initial, config).map(WidthSubscription::new)
    }

    /// Throttled viewport height.
    pub fn observe_height(
        &self,
        initial: Option<Size>,
        config: ThrottleConfig,
    ) -> Result<HeightSubscription, ConfigError> {
        self.observe_size(initial, config).map(HeightSubscription::new)
    }
}

// =============================================================================
// DEFAULT VIEWPORT
// =============================================================================

thread_local! {
    static DEFAULT_VIEWPORT: RefCell<Option<Viewport>> = const { RefCell::new(None) };
}

/// Make `platform` the default for the free `observe_*` functions.
///
/// Existing subscriptions keep the viewport they were created on.
pub fn install_platform(platform: Rc<dyn Platform>) -> Viewport {
    let viewport = Viewport::new(platform);
    DEFAULT_VIEWPORT.with(|slot| *slot.borrow_mut() = Some(viewport.clone()));
    viewport
}

/// The default viewport. Headless if no platform was installed.
pub fn default_viewport() -> Viewport {
    DEFAULT_VIEWPORT.with(|slot| slot.borrow_mut().get_or_insert_with(Viewport::headless).clone())
}

/// Forget the installed platform (for testing).
pub fn reset_viewport() {
    let previous = DEFAULT_VIEWPORT.with(|slot| slot.borrow_mut().take());
    drop(previous);
}

/// [`Viewport::observe_size`] on the default viewport.
pub fn observe_size(
    initial: Option<Size>,
    config: ThrottleConfig,
) -> Result<SizeSubscription, ConfigError> {
    default_viewport().observe_size(initial, config)
}

/// [`Viewport::observe_width`] on the default viewport.
pub fn observe_width(
    initial: Option<Size>,
    config: ThrottleConfig,
) -> Result<WidthSubscription, ConfigError> {
    default_viewport().observe_width(initial, config)
}

/// [`Viewport::observe_height`] on the default viewport.
pub fn observe_height(
    initial: Option<Size>,
    config: ThrottleConfig,
) -> Result<HeightSubscription, ConfigError> {
    default_viewport().observe_height(initial, config)
}

//! Subscription handles returned by the `observe_*` accessors.

use spark_signals::{derived, Derived, Signal};

use crate::throttle::{Cadence, ThrottleScheduler};
use crate::types::Size;

// =============================================================================
// SIZE SUBSCRIPTION
// =============================================================================

/// Throttled view of the viewport size.
///
/// Holds the published value as a signal. Released on
/// [`SizeSubscription::unsubscribe`] or drop.
pub struct SizeSubscription {
    value: Signal<Size>,
    scheduler: Option<ThrottleScheduler>,
}

impl SizeSubscription {
    pub(crate) fn new(value: Signal<Size>, scheduler: Option<ThrottleScheduler>) -> Self {
        Self { value, scheduler }
    }

    /// Latest published size.
    pub fn get(&self) -> Size {
        self.value.get()
    }

    pub fn width(&self) -> u32 {
        self.get().width
    }

    pub fn height(&self) -> u32 {
        self.get().height
    }

    /// The underlying signal, for reactive tracking.
    pub fn signal(&self) -> Signal<Size> {
        self.value.clone()
    }

    /// How ticks are scheduled. `None` when the platform has no viewport.
    pub fn cadence(&self) -> Option<Cadence> {
        self.scheduler.as_ref().map(ThrottleScheduler::cadence)
    }

    /// Whether this subscription can still publish.
    pub fn is_active(&self) -> bool {
        self.scheduler.as_ref().is_some_and(ThrottleScheduler::is_running)
    }

    /// Call `listener` synchronously on every publish. Returns a cleanup
    /// function; a no-op when the subscription never publishes.
    pub fn on_publish(&self, listener: impl Fn(Size) + 'static) -> Box<dyn FnOnce()> {
        match &self.scheduler {
            Some(scheduler) => scheduler.on_publish(listener),
            None => Box::new(|| {}),
        }
    }

    /// Cancel any pending publish and release the listeners. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
    }
}

impl Drop for SizeSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// =============================================================================
// PROJECTIONS
// =============================================================================

/// Width-only view. Shares one scheduling decision with the full size.
pub struct WidthSubscription {
    size: SizeSubscription,
}

impl WidthSubscription {
    pub(crate) fn new(size: SizeSubscription) -> Self {
        Self { size }
    }

    pub fn get(&self) -> u32 {
        self.size.width()
    }

    /// The full size this projection reads from.
    pub fn size(&self) -> &SizeSubscription {
        &self.size
    }

    pub fn is_active(&self) -> bool {
        self.size.is_active()
    }

    pub fn unsubscribe(&mut self) {
        self.size.unsubscribe();
    }
}

/// Height-only view. Shares one scheduling decision with the full size.
pub struct HeightSubscription {
    size: SizeSubscription,
}

impl HeightSubscription {
    pub(crate) fn new(size: SizeSubscription) -> Self {
        Self { size }
    }

    pub fn get(&self) -> u32 {
        self.size.height()
    }

    /// The full size this projection reads from.
    pub fn size(&self) -> &SizeSubscription {
        &self.size
    }

    pub fn is_active(&self) -> bool {
        self.size.is_active()
    }

    pub fn unsubscribe(&mut self) {
        self.size.unsubscribe();
    }
}

/// Derived width, recomputed whenever the size signal changes.
pub fn width_derived(size: Signal<Size>) -> Derived<u32> {
    derived(move || size.get().width)
}

/// Derived height, recomputed whenever the size signal changes.
pub fn height_derived(size: Signal<Size>) -> Derived<u32> {
    derived(move || size.get().height)
}

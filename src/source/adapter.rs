//! Shared, reference-counted registration of the viewport listeners.
//!
//! # Pattern
//!
//! - Platform listeners are registered when the first subscriber arrives
//! - Every later subscriber shares them (one registration per event type)
//! - The last unsubscribe removes them and cancels pending settle timers
//!
//! # Example
//!
//! ```ignore
//! let source = EventSource::new(platform);
//!
//! let mut sub = source.on_change(|| println!("viewport changed"));
//! // ... resize / orientation events ...
//! sub.unsubscribe();
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, trace};

use crate::platform::{EventKind, ListenerId, Platform, TimerHandle};
use crate::types::{ConfigError, DEFAULT_SETTLE_DELAY};

/// Change callback. Called once per trigger.
pub type ChangeFn = Rc<dyn Fn()>;

// =============================================================================
// SOURCE STATE
// =============================================================================

struct SourceInner {
    platform: Rc<dyn Platform>,
    settle_delay: Duration,
    next_id: u64,
    /// Subscribers in registration order. Its length is the reference count
    /// that decides when the platform listeners are attached and detached.
    subscribers: Vec<(u64, ChangeFn)>,
    resize_listener: Option<ListenerId>,
    orientation_listener: Option<ListenerId>,
    /// Orientation changes waiting out the settle delay.
    settling: Vec<(u64, TimerHandle)>,
}

impl SourceInner {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Normalizes resize and orientation events into a single change trigger.
///
/// Cloning is cheap and yields a handle to the same shared registration.
#[derive(Clone)]
pub struct EventSource {
    inner: Rc<RefCell<SourceInner>>,
}

impl EventSource {
    /// Source with the default orientation settle delay.
    pub fn new(platform: Rc<dyn Platform>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SourceInner {
                platform,
                settle_delay: DEFAULT_SETTLE_DELAY,
                next_id: 0,
                subscribers: Vec::new(),
                resize_listener: None,
                orientation_listener: None,
                settling: Vec::new(),
            })),
        }
    }

    /// Source with a custom orientation settle delay.
    pub fn with_settle_delay(
        platform: Rc<dyn Platform>,
        settle_delay: Duration,
    ) -> Result<Self, ConfigError> {
        if settle_delay.is_zero() {
            return Err(ConfigError::ZeroSettleDelay);
        }
        let source = Self::new(platform);
        source.inner.borrow_mut().settle_delay = settle_delay;
        Ok(source)
    }

    pub fn settle_delay(&self) -> Duration {
        self.inner.borrow().settle_delay
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    /// Whether the platform listeners are currently registered.
    pub fn is_attached(&self) -> bool {
        let inner = self.inner.borrow();
        inner.resize_listener.is_some() || inner.orientation_listener.is_some()
    }

    /// Register `callback` to run on every viewport change.
    ///
    /// The first subscription registers the platform listeners.
    pub fn on_change(&self, callback: impl Fn() + 'static) -> ChangeSubscription {
        let (id, first) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id();
            inner.subscribers.push((id, Rc::new(callback)));
            (id, inner.subscribers.len() == 1)
        };

        if first {
            attach(&self.inner);
        }

        ChangeSubscription {
            source: Rc::downgrade(&self.inner),
            id: Some(id),
        }
    }
}

// =============================================================================
// LISTENER LIFECYCLE
// =============================================================================

fn attach(inner: &Rc<RefCell<SourceInner>>) {
    let platform = inner.borrow().platform.clone();
    let capabilities = platform.capabilities();

    let resize_listener = capabilities.supports(EventKind::Resize).then(|| {
        let weak = Rc::downgrade(inner);
        platform.add_resize_listener(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                trace!("resize");
                emit(&inner);
            }
        }))
    });

    let orientation_listener = capabilities.supports(EventKind::Orientation).then(|| {
        let weak = Rc::downgrade(inner);
        platform.add_orientation_listener(Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                trace!("orientation change, settling");
                settle(&inner);
            }
        }))
    });

    debug!(
        resize = resize_listener.is_some(),
        orientation = orientation_listener.is_some(),
        "viewport listeners attached"
    );

    let mut inner = inner.borrow_mut();
    inner.resize_listener = resize_listener;
    inner.orientation_listener = orientation_listener;
}

fn detach(inner: &Rc<RefCell<SourceInner>>) {
    let (platform, resize, orientation, settling) = {
        let mut inner = inner.borrow_mut();
        (
            inner.platform.clone(),
            inner.resize_listener.take(),
            inner.orientation_listener.take(),
            std::mem::take(&mut inner.settling),
        )
    };

    if let Some(id) = resize {
        platform.remove_resize_listener(id);
    }
    if let Some(id) = orientation {
        platform.remove_orientation_listener(id);
    }
    for (_, handle) in settling {
        platform.cancel_timeout(handle);
    }

    debug!("viewport listeners detached");
}

/// Arm a settle timer; the trigger fires when it expires.
fn settle(inner: &Rc<RefCell<SourceInner>>) {
    let (platform, delay, token) = {
        let mut inner = inner.borrow_mut();
        (inner.platform.clone(), inner.settle_delay, inner.next_id())
    };

    let weak = Rc::downgrade(inner);
    let handle = platform.schedule_timeout(
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().settling.retain(|(t, _)| *t != token);
                emit(&inner);
            }
        }),
        delay,
    );

    inner.borrow_mut().settling.push((token, handle));
}

/// Invoke every subscriber. Subscribers may (un)subscribe while this runs.
fn emit(inner: &Rc<RefCell<SourceInner>>) {
    let subscribers: Vec<ChangeFn> = inner
        .borrow()
        .subscribers
        .iter()
        .map(|(_, callback)| callback.clone())
        .collect();

    for callback in subscribers {
        callback();
    }
}

// =============================================================================
// CHANGE SUBSCRIPTION
// =============================================================================

/// Live registration with an [`EventSource`].
///
/// Released on [`ChangeSubscription::unsubscribe`] or drop, whichever comes
/// first. Releasing twice is a no-op.
pub struct ChangeSubscription {
    source: Weak<RefCell<SourceInner>>,
    id: Option<u64>,
}

impl ChangeSubscription {
    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.source.strong_count() > 0
    }

    /// Stop receiving changes. The last subscriber detaches the listeners.
    pub fn unsubscribe(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        let Some(inner) = self.source.upgrade() else {
            return;
        };

        let last = {
            let mut state = inner.borrow_mut();
            let before = state.subscribers.len();
            state.subscribers.retain(|(existing, _)| *existing != id);
            before > 0 && state.subscribers.is_empty()
        };

        if last {
            detach(&inner);
        }
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

// =============================================================================
// TESTS
// =============================================================================

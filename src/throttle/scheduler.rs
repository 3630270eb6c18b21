//! Throttle Scheduler - Decides when to sample and publish the viewport size
//!
//! Subscribes to an [`EventSource`], runs every trigger through the
//! [`ThrottleState`] machine and carries out what it returns: arming frame
//! callbacks or timers, and publishing the current size into a signal.
//!
//! # Cadence
//!
//! - fps equal to the platform's native frame rate: animation frames
//! - any other fps: fixed timers computed from the interval
//!
//! Either way there is at most one publish per interval window.
//!
//! # Teardown
//!
//! [`ThrottleScheduler::stop`] (or drop) cancels the armed tick and releases
//! the event-source subscription. Nothing is published afterwards.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use spark_signals::Signal;
use tracing::trace;

use super::state::{Phase, ThrottleState, TickAction, TriggerAction};
use crate::platform::{Capabilities, FrameHandle, Platform, TimerHandle};
use crate::source::{ChangeSubscription, EventSource};
use crate::types::{ConfigError, Size, ThrottleConfig};

/// Publish listener. Receives every published size.
pub type PublishFn = Rc<dyn Fn(Size)>;

/// What drives the ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    /// Animation-frame callbacks.
    AnimationFrame,
    /// One-shot timers.
    Timer,
}

impl Cadence {
    /// Frames when the platform runs them at exactly the requested rate.
    pub fn select(config: &ThrottleConfig, platform: &dyn Platform) -> Self {
        let native = platform.capabilities().contains(Capabilities::FRAMES)
            && (config.fps - platform.native_fps()).abs() < f64::EPSILON;
        if native { Self::AnimationFrame } else { Self::Timer }
    }
}

enum ArmedTick {
    Frame(FrameHandle),
    Timer(TimerHandle),
}

// =============================================================================
// SCHEDULER STATE
// =============================================================================

struct SchedulerInner {
    platform: Rc<dyn Platform>,
    cadence: Cadence,
    state: ThrottleState,
    armed: Option<ArmedTick>,
    change: Option<ChangeSubscription>,
    value: Signal<Size>,
    next_listener: u64,
    listeners: Vec<(u64, PublishFn)>,
    stopped: bool,
}

/// Throttled publisher of the viewport size.
pub struct ThrottleScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl ThrottleScheduler {
    /// Start listening on `source` and publishing into `value`.
    pub fn start(
        platform: Rc<dyn Platform>,
        source: &EventSource,
        config: ThrottleConfig,
        value: Signal<Size>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let cadence = Cadence::select(&config, platform.as_ref());
        trace!(?cadence, fps = config.fps, leading = config.leading, "scheduler started");

        let inner = Rc::new(RefCell::new(SchedulerInner {
            platform,
            cadence,
            state: ThrottleState::new(config.leading, config.interval()),
            armed: None,
            change: None,
            value,
            next_listener: 0,
            listeners: Vec::new(),
            stopped: false,
        }));

        let weak = Rc::downgrade(&inner);
        let change = source.on_change(move || {
            if let Some(inner) = weak.upgrade() {
                on_trigger(&inner);
            }
        });
        inner.borrow_mut().change = Some(change);

        Ok(Self { inner })
    }

    pub fn cadence(&self) -> Cadence {
        self.inner.borrow().cadence
    }

    pub fn phase(&self) -> Phase {
        self.inner.borrow().state.phase()
    }

    pub fn interval(&self) -> Duration {
        self.inner.borrow().state.interval()
    }

    pub fn is_running(&self) -> bool {
        !self.inner.borrow().stopped
    }

    /// Feed a trigger by hand, as if the viewport had changed.
    pub fn trigger(&self) {
        on_trigger(&self.inner);
    }

    /// Call `listener` with every published size.
    ///
    /// Returns a cleanup function. Listeners run in registration order,
    /// after the signal has been updated.
    pub fn on_publish(&self, listener: impl Fn(Size) + 'static) -> Box<dyn FnOnce()> {
        let id = {
            let mut inner = self.inner.borrow_mut();
            if inner.stopped {
                return Box::new(|| {});
            }
            inner.next_listener += 1;
            let id = inner.next_listener;
            inner.listeners.push((id, Rc::new(listener)));
            id
        };

        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                let removed = {
                    let mut inner = inner.borrow_mut();
                    let pos = inner.listeners.iter().position(|(existing, _)| *existing == id);
                    pos.map(|pos| inner.listeners.remove(pos))
                };
                drop(removed);
            }
        })
    }

    /// Cancel the armed tick and stop listening. Idempotent.
    pub fn stop(&self) {
        let (platform, armed, change, listeners) = {
            let mut inner = self.inner.borrow_mut();
            if inner.stopped {
                return;
            }
            inner.stopped = true;
            inner.state.cancel();
            (
                inner.platform.clone(),
                inner.armed.take(),
                inner.change.take(),
                std::mem::take(&mut inner.listeners),
            )
        };

        match armed {
            Some(ArmedTick::Frame(handle)) => platform.cancel_frame_callback(handle),
            Some(ArmedTick::Timer(handle)) => platform.cancel_timeout(handle),
            None => {}
        }

        drop(change);
        drop(listeners);
        trace!("scheduler stopped");
    }
}

impl Drop for ThrottleScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// TRANSITIONS
// =============================================================================

fn on_trigger(inner: &Rc<RefCell<SchedulerInner>>) {
    let action = {
        let mut state = inner.borrow_mut();
        if state.stopped {
            return;
        }
        let now = state.platform.now();
        state.state.on_trigger(now)
    };

    match action {
        TriggerAction::PublishAndArm { due } => {
            // Arm first: a listener may stop the scheduler while publishing
            arm(inner, due);
            publish(inner);
        }
        TriggerAction::Arm { due } => arm(inner, due),
        TriggerAction::Coalesce => trace!("trigger coalesced"),
    }
}

fn on_tick(inner: &Rc<RefCell<SchedulerInner>>, now: Duration) {
    let action = {
        let mut state = inner.borrow_mut();
        if state.stopped {
            return;
        }
        state.armed = None;
        state.state.on_tick(now)
    };

    match action {
        TickAction::Wait { due } => arm(inner, due),
        TickAction::Publish => publish(inner),
        TickAction::Expire => trace!("cooldown expired"),
        TickAction::Stale => {}
    }
}

fn arm(inner: &Rc<RefCell<SchedulerInner>>, due: Duration) {
    let (platform, cadence) = {
        let state = inner.borrow();
        (state.platform.clone(), state.cadence)
    };
    let weak = Rc::downgrade(inner);

    let armed = match cadence {
        Cadence::AnimationFrame => {
            let handle = platform.schedule_frame_callback(Box::new(move |timestamp| {
                if let Some(inner) = weak.upgrade() {
                    on_tick(&inner, timestamp);
                }
            }));
            ArmedTick::Frame(handle)
        }
        Cadence::Timer => {
            let delay = due.saturating_sub(platform.now());
            let handle = platform.schedule_timeout(
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        let now = inner.borrow().platform.now();
                        on_tick(&inner, now);
                    }
                }),
                delay,
            );
            ArmedTick::Timer(handle)
        }
    };

    trace!(?due, "tick armed");
    inner.borrow_mut().armed = Some(armed);
}

/// Sample the viewport and notify everyone, synchronously.
fn publish(inner: &Rc<RefCell<SchedulerInner>>) {
    let (platform, value, listeners) = {
        let state = inner.borrow();
        let listeners: Vec<PublishFn> = state
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        (state.platform.clone(), state.value.clone(), listeners)
    };

    let size = platform.current_viewport_size();
    trace!(width = size.width, height = size.height, "publish");

    if value.get() != size {
        value.set(size);
    }

    for listener in listeners {
        if inner.borrow().stopped {
            return;
        }
        listener(size);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ManualPlatform;
    use spark_signals::signal;
    use std::cell::Cell;

    fn frame(fps: f64) -> Duration {
        Duration::from_secs_f64(1.0 / fps)
    }

    fn setup(config: ThrottleConfig) -> (Rc<ManualPlatform>, EventSource, ThrottleScheduler) {
        let platform = Rc::new(ManualPlatform::new());
        let source = EventSource::new(platform.clone());
        let scheduler =
            ThrottleScheduler::start(platform.clone(), &source, config, signal(Size::ZERO))
                .unwrap();
        (platform, source, scheduler)
    }

    fn record(scheduler: &ThrottleScheduler) -> Rc<RefCell<Vec<Size>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        // Cleanup is dropped: the listener lives as long as the scheduler
        let _cleanup = scheduler.on_publish(move |size| seen_clone.borrow_mut().push(size));
        seen
    }

    #[test]
    fn test_cadence_selection() {
        let platform = ManualPlatform::new();
        let config = ThrottleConfig::default();
        assert_eq!(Cadence::select(&config, &platform), Cadence::AnimationFrame);
        assert_eq!(Cadence::select(&config.fps(30.0), &platform), Cadence::Timer);

        let no_frames = ManualPlatform::new().with_capabilities(Capabilities::RESIZE);
        assert_eq!(Cadence::select(&config, &no_frames), Cadence::Timer);

        let fast = ManualPlatform::new().with_native_fps(120.0);
        assert_eq!(Cadence::select(&config.fps(120.0), &fast), Cadence::AnimationFrame);
    }

    #[test]
    fn test_invalid_fps_rejected() {
        let platform = Rc::new(ManualPlatform::new());
        let source = EventSource::new(platform.clone());
        let result = ThrottleScheduler::start(
            platform.clone(),
            &source,
            ThrottleConfig::default().fps(0.0),
            signal(Size::ZERO),
        );
        assert!(matches!(result, Err(ConfigError::InvalidFps(_))));
        // Nothing was registered
        assert_eq!(platform.resize_listener_count(), 0);
    }

    #[test]
    fn test_trailing_publishes_latest_on_frame() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default());
        let seen = record(&scheduler);

        platform.resize_to(100, 100);
        platform.resize_to(200, 150);
        platform.resize_to(300, 200);
        assert!(seen.borrow().is_empty());
        assert_eq!(platform.pending_frame_callbacks(), 1);

        platform.step(1, frame(60.0));
        assert_eq!(*seen.borrow(), vec![Size::new(300, 200)]);
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[test]
    fn test_frame_before_window_end_rearms() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default());
        let seen = record(&scheduler);

        platform.resize_to(1, 1);
        platform.step(1, frame(60.0));
        assert_eq!(seen.borrow().len(), 1);

        // Trigger right after the publish; a fast frame must not publish
        platform.resize_to(2, 2);
        platform.step(1, Duration::from_millis(4));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(platform.pending_frame_callbacks(), 1);

        platform.step(1, frame(60.0));
        assert_eq!(*seen.borrow(), vec![Size::new(1, 1), Size::new(2, 2)]);
    }

    #[test]
    fn test_timer_cadence() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default().fps(30.0));
        let seen = record(&scheduler);
        assert_eq!(scheduler.cadence(), Cadence::Timer);

        platform.resize_to(640, 480);
        assert_eq!(platform.pending_timers(), 1);
        assert_eq!(platform.pending_frame_callbacks(), 0);

        platform.advance(Duration::from_millis(1));
        assert_eq!(*seen.borrow(), vec![Size::new(640, 480)]);

        // Inside the 33ms window: waits for the window end
        platform.resize_to(800, 600);
        platform.advance(Duration::from_millis(20));
        assert_eq!(seen.borrow().len(), 1);
        platform.advance(Duration::from_millis(14));
        assert_eq!(seen.borrow().last(), Some(&Size::new(800, 600)));
    }

    #[test]
    fn test_leading_publishes_immediately() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default().leading(true));
        let seen = record(&scheduler);

        platform.resize_to(600, 400);
        assert_eq!(*seen.borrow(), vec![Size::new(600, 400)]);

        // Coalesced into one publish at cooldown expiry
        platform.resize_to(601, 401);
        platform.resize_to(602, 402);
        assert_eq!(seen.borrow().len(), 1);

        platform.step(1, frame(30.0));
        assert_eq!(
            *seen.borrow(),
            vec![Size::new(600, 400), Size::new(602, 402)]
        );
    }

    #[test]
    fn test_leading_cooldown_without_triggers_is_silent() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default().leading(true));
        let seen = record(&scheduler);

        platform.resize_to(10, 10);
        platform.step(3, frame(60.0));
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(scheduler.phase(), Phase::Idle);
    }

    #[test]
    fn test_signal_updated_before_listeners() {
        let platform = Rc::new(ManualPlatform::new());
        let source = EventSource::new(platform.clone());
        let value = signal(Size::ZERO);
        let scheduler = ThrottleScheduler::start(
            platform.clone(),
            &source,
            ThrottleConfig::default().leading(true),
            value.clone(),
        )
        .unwrap();

        let observed = Rc::new(Cell::new(Size::ZERO));
        let observed_clone = observed.clone();
        let value_clone = value.clone();
        let _cleanup = scheduler.on_publish(move |_| observed_clone.set(value_clone.get()));

        platform.resize_to(5, 6);
        assert_eq!(observed.get(), Size::new(5, 6));
        assert_eq!(value.get(), Size::new(5, 6));
    }

    #[test]
    fn test_stop_cancels_pending_tick() {
        let (platform, source, scheduler) = setup(ThrottleConfig::default());
        let seen = record(&scheduler);

        platform.resize_to(50, 50);
        assert_eq!(platform.pending_frame_callbacks(), 1);

        scheduler.stop();
        assert_eq!(platform.pending_frame_callbacks(), 0);
        assert_eq!(source.subscriber_count(), 0);
        assert_eq!(platform.resize_listener_count(), 0);

        platform.resize_to(60, 60);
        platform.step(2, frame(60.0));
        assert!(seen.borrow().is_empty());

        // Second stop is a no-op
        scheduler.stop();
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_stop_from_listener_suppresses_rest() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default().leading(true));
        let scheduler = Rc::new(scheduler);

        let weak = Rc::downgrade(&scheduler);
        let _stop = scheduler.on_publish(move |_| {
            if let Some(scheduler) = weak.upgrade() {
                scheduler.stop();
            }
        });
        let seen = record(&scheduler);

        platform.resize_to(1, 1);
        assert!(seen.borrow().is_empty());
        assert!(!scheduler.is_running());
        assert_eq!(platform.pending_frame_callbacks(), 0);
    }

    #[test]
    fn test_on_publish_cleanup() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default().leading(true));
        let count = Rc::new(Cell::new(0));
        let count_clone = count.clone();
        let cleanup = scheduler.on_publish(move |_| count_clone.set(count_clone.get() + 1));

        platform.resize_to(1, 1);
        assert_eq!(count.get(), 1);

        cleanup();
        platform.step(1, frame(30.0));
        platform.resize_to(2, 2);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_manual_trigger() {
        let (platform, _source, scheduler) = setup(ThrottleConfig::default());
        let seen = record(&scheduler);

        platform.set_size(42, 24);
        scheduler.trigger();
        platform.step(1, frame(60.0));
        assert_eq!(*seen.borrow(), vec![Size::new(42, 24)]);
    }
}

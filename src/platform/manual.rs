//! Manual Platform - Deterministic clock driven by the caller
//!
//! Nothing happens on its own. The caller moves the viewport with
//! [`ManualPlatform::resize_to`] / [`ManualPlatform::change_orientation`] and
//! moves time with [`ManualPlatform::step`] / [`ManualPlatform::advance`].
//!
//! # Example
//!
//! ```ignore
//! use spark_viewport::platform::ManualPlatform;
//!
//! let platform = Rc::new(ManualPlatform::new());
//! platform.resize_to(600, 400);
//!
//! // One 30fps frame: runs due timers, then the queued frame callbacks
//! platform.step(1, Duration::from_secs_f64(1.0 / 30.0));
//! ```

use std::cell::RefCell;
use std::time::Duration;

use super::queue::CallbackQueue;
use super::{
    Capabilities, EventKind, FrameCallback, FrameHandle, ListenerFn, ListenerId, Platform,
    TimerCallback, TimerHandle,
};
use crate::types::{Size, DEFAULT_FPS};

struct ManualState {
    queue: CallbackQueue,
    clock: Duration,
    size: Size,
    capabilities: Capabilities,
    native_fps: f64,
}

/// Platform whose clock and viewport only change when told to.
pub struct ManualPlatform {
    state: RefCell<ManualState>,
}

impl Default for ManualPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualPlatform {
    /// 0x0 viewport, every capability, 60fps frames.
    pub fn new() -> Self {
        Self {
            state: RefCell::new(ManualState {
                queue: CallbackQueue::default(),
                clock: Duration::ZERO,
                size: Size::ZERO,
                capabilities: Capabilities::all(),
                native_fps: DEFAULT_FPS,
            }),
        }
    }

    /// Start with the given viewport size.
    pub fn with_size(self, width: u32, height: u32) -> Self {
        self.state.borrow_mut().size = Size::new(width, height);
        self
    }

    /// Restrict what the platform advertises.
    pub fn with_capabilities(self, capabilities: Capabilities) -> Self {
        self.state.borrow_mut().capabilities = capabilities;
        self
    }

    /// Change the animation-frame rate.
    pub fn with_native_fps(self, fps: f64) -> Self {
        self.state.borrow_mut().native_fps = fps;
        self
    }

    // -------------------------------------------------------------------------
    // Viewport
    // -------------------------------------------------------------------------

    /// Change the viewport size without emitting any event.
    pub fn set_size(&self, width: u32, height: u32) {
        self.state.borrow_mut().size = Size::new(width, height);
    }

    /// Change the viewport size and emit a resize event.
    pub fn resize_to(&self, width: u32, height: u32) {
        self.set_size(width, height);
        self.emit(EventKind::Resize);
    }

    /// Change the viewport size and emit an orientation-change event.
    pub fn change_orientation(&self, width: u32, height: u32) {
        self.set_size(width, height);
        self.emit(EventKind::Orientation);
    }

    fn emit(&self, kind: EventKind) {
        let listeners = self.state.borrow().queue.listeners(kind);
        for listener in listeners {
            listener();
        }
    }

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------

    /// Run `count` frames, each `frame_time` after the previous one.
    ///
    /// Per frame: advance the clock, run every timer that is now due, then run
    /// the frame callbacks queued at that point. Frame callbacks scheduled
    /// while the frame runs wait for the next one.
    pub fn step(&self, count: usize, frame_time: Duration) {
        for _ in 0..count {
            self.advance(frame_time);
            self.run_frame();
        }
    }

    /// Advance the clock and run due timers. Frame callbacks do not run.
    pub fn advance(&self, by: Duration) {
        self.state.borrow_mut().clock += by;
        self.run_due_timers();
    }

    fn run_due_timers(&self) {
        loop {
            let next = {
                let mut state = self.state.borrow_mut();
                let now = state.clock;
                state.queue.pop_due_timer(now)
            };
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    fn run_frame(&self) {
        let (handles, timestamp) = {
            let state = self.state.borrow();
            (state.queue.frame_handles(), state.clock)
        };
        for handle in handles {
            let callback = self.state.borrow_mut().queue.take_frame(handle);
            if let Some(callback) = callback {
                callback(timestamp);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Introspection
    // -------------------------------------------------------------------------

    pub fn resize_listener_count(&self) -> usize {
        self.state.borrow().queue.listener_count(EventKind::Resize)
    }

    pub fn orientation_listener_count(&self) -> usize {
        self.state.borrow().queue.listener_count(EventKind::Orientation)
    }

    pub fn pending_frame_callbacks(&self) -> usize {
        self.state.borrow().queue.frame_count()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.borrow().queue.timer_count()
    }
}

impl Platform for ManualPlatform {
    fn capabilities(&self) -> Capabilities {
        self.state.borrow().capabilities
    }

    fn current_viewport_size(&self) -> Size {
        self.state.borrow().size
    }

    fn now(&self) -> Duration {
        self.state.borrow().clock
    }

    fn native_fps(&self) -> f64 {
        self.state.borrow().native_fps
    }

    fn add_resize_listener(&self, listener: ListenerFn) -> ListenerId {
        self.state.borrow_mut().queue.add_listener(EventKind::Resize, listener)
    }

    fn remove_resize_listener(&self, id: ListenerId) {
        self.state.borrow_mut().queue.remove_listener(EventKind::Resize, id);
    }

    fn add_orientation_listener(&self, listener: ListenerFn) -> ListenerId {
        self.state
            .borrow_mut()
            .queue
            .add_listener(EventKind::Orientation, listener)
    }

    fn remove_orientation_listener(&self, id: ListenerId) {
        self.state
            .borrow_mut()
            .queue
            .remove_listener(EventKind::Orientation, id);
    }

    fn schedule_frame_callback(&self, callback: FrameCallback) -> FrameHandle {
        self.state.borrow_mut().queue.push_frame(callback)
    }

    fn cancel_frame_callback(&self, handle: FrameHandle) {
        self.state.borrow_mut().queue.cancel_frame(handle);
    }

    fn schedule_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let due = state.clock + delay;
        state.queue.push_timer(callback, due)
    }

    fn cancel_timeout(&self, handle: TimerHandle) {
        self.state.borrow_mut().queue.cancel_timer(handle);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_resize_updates_size_and_notifies() {
        let platform = ManualPlatform::new();
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();
        platform.add_resize_listener(Rc::new(move || hits_clone.set(hits_clone.get() + 1)));

        platform.resize_to(600, 400);
        assert_eq!(platform.current_viewport_size(), Size::new(600, 400));
        assert_eq!(hits.get(), 1);

        // Orientation listeners are a separate stream
        platform.change_orientation(400, 600);
        assert_eq!(hits.get(), 1);
        assert_eq!(platform.current_viewport_size(), Size::new(400, 600));
    }

    #[test]
    fn test_timer_fires_when_due() {
        let platform = ManualPlatform::new();
        let fired = Rc::new(Cell::new(false));
        let fired_clone = fired.clone();
        platform.schedule_timeout(Box::new(move || fired_clone.set(true)), ms(10));

        platform.advance(ms(9));
        assert!(!fired.get());
        platform.advance(ms(1));
        assert!(fired.get());
        assert_eq!(platform.pending_timers(), 0);
    }

    #[test]
    fn test_frame_receives_timestamp() {
        let platform = ManualPlatform::new();
        let seen = Rc::new(Cell::new(None));
        let seen_clone = seen.clone();
        platform.schedule_frame_callback(Box::new(move |ts| seen_clone.set(Some(ts))));

        // advance() alone runs no frames
        platform.advance(ms(5));
        assert_eq!(seen.get(), None);

        platform.step(1, ms(16));
        assert_eq!(seen.get(), Some(ms(21)));
    }

    #[test]
    fn test_frame_scheduled_during_frame_waits() {
        let platform = Rc::new(ManualPlatform::new());
        let count = Rc::new(Cell::new(0));

        let platform_clone = platform.clone();
        let count_clone = count.clone();
        platform.schedule_frame_callback(Box::new(move |_| {
            count_clone.set(count_clone.get() + 1);
            let count_inner = count_clone.clone();
            platform_clone.schedule_frame_callback(Box::new(move |_| {
                count_inner.set(count_inner.get() + 1);
            }));
        }));

        platform.step(1, ms(16));
        assert_eq!(count.get(), 1);
        platform.step(1, ms(16));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_timer_scheduled_frame_runs_same_step() {
        let platform = Rc::new(ManualPlatform::new());
        let ran = Rc::new(Cell::new(false));

        let platform_clone = platform.clone();
        let ran_clone = ran.clone();
        platform.schedule_timeout(
            Box::new(move || {
                let ran_inner = ran_clone.clone();
                platform_clone.schedule_frame_callback(Box::new(move |_| ran_inner.set(true)));
            }),
            ms(10),
        );

        platform.step(1, ms(16));
        assert!(ran.get());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let platform = ManualPlatform::new();
        let ran = Rc::new(Cell::new(false));
        let (ran_frame, ran_timer) = (ran.clone(), ran.clone());
        let frame = platform.schedule_frame_callback(Box::new(move |_| ran_frame.set(true)));
        let timer = platform.schedule_timeout(Box::new(move || ran_timer.set(true)), ms(1));

        platform.cancel_frame_callback(frame);
        platform.cancel_frame_callback(frame);
        platform.cancel_timeout(timer);
        platform.cancel_timeout(timer);

        platform.step(2, ms(16));
        assert!(!ran.get());
        assert_eq!(platform.pending_frame_callbacks(), 0);
        assert_eq!(platform.pending_timers(), 0);
    }
}

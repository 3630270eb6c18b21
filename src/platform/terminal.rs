//! Terminal Platform - crossterm-backed viewport
//!
//! The viewport is the terminal window, measured in cells. Resize events
//! come from crossterm; there is no orientation in a terminal.
//!
//! Nothing runs in the background. The host drives the platform either by
//! handing it events it already read ([`TerminalPlatform::dispatch`]) or by
//! letting it poll ([`TerminalPlatform::pump`]). Both paths then run due
//! timers and, once per native frame, the queued frame callbacks.
//!
//! # Example
//!
//! ```ignore
//! use spark_viewport::platform::TerminalPlatform;
//!
//! let platform = Rc::new(TerminalPlatform::new());
//! let viewport = Viewport::new(platform.clone());
//! let size = viewport.observe_size(None, ThrottleConfig::default())?;
//!
//! loop {
//!     if let Some(event) = platform.pump(Duration::from_millis(50))? {
//!         // Keys, mouse, etc. Resize was already handled.
//!     }
//!     draw(size.get());
//! }
//! ```

use std::cell::RefCell;
use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use tracing::{debug, trace};

use super::queue::CallbackQueue;
use super::{
    Capabilities, EventKind, FrameCallback, FrameHandle, ListenerFn, ListenerId, Platform,
    TimerCallback, TimerHandle,
};
use crate::types::{Size, DEFAULT_FPS};

/// Size assumed when the terminal cannot be measured.
const FALLBACK_SIZE: Size = Size::new(80, 24);

struct TerminalState {
    queue: CallbackQueue,
    size: Size,
    native_fps: f64,
    last_frame: Option<Duration>,
}

/// Platform backed by the controlling terminal.
pub struct TerminalPlatform {
    state: RefCell<TerminalState>,
    origin: Instant,
}

impl Default for TerminalPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPlatform {
    /// Measure the terminal and start the clock.
    pub fn new() -> Self {
        let platform = Self {
            state: RefCell::new(TerminalState {
                queue: CallbackQueue::default(),
                size: FALLBACK_SIZE,
                native_fps: DEFAULT_FPS,
                last_frame: None,
            }),
            origin: Instant::now(),
        };
        platform.refresh_size();
        platform
    }

    /// Change the frame rate used for animation-frame callbacks.
    pub fn with_native_fps(self, fps: f64) -> Self {
        self.state.borrow_mut().native_fps = fps;
        self
    }

    /// Re-query the terminal size. Keeps the last known size on failure.
    pub fn refresh_size(&self) -> Size {
        match crossterm::terminal::size() {
            Ok(size) => {
                let size = Size::from(size);
                self.state.borrow_mut().size = size;
                size
            }
            Err(err) => {
                debug!(%err, "terminal size unavailable, keeping last known size");
                self.state.borrow().size
            }
        }
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.state.borrow().native_fps)
    }

    // -------------------------------------------------------------------------
    // Event Loop
    // -------------------------------------------------------------------------

    /// Feed an event the host already read.
    ///
    /// Returns true if the event was a resize (and listeners were notified).
    pub fn dispatch(&self, event: &Event) -> bool {
        let Event::Resize(width, height) = *event else {
            return false;
        };

        trace!(width, height, "terminal resized");
        self.state.borrow_mut().size = Size::from((width, height));

        let listeners = self.state.borrow().queue.listeners(EventKind::Resize);
        for listener in listeners {
            listener();
        }
        true
    }

    /// Wait up to `timeout` for terminal input, then run whatever is due.
    ///
    /// The wait is cut short when a timer or frame falls due first. Resize
    /// events are consumed; any other event is handed back to the caller.
    pub fn pump(&self, timeout: Duration) -> io::Result<Option<Event>> {
        let wait = poll_wait(self.next_deadline(), self.now(), timeout);

        let mut unhandled = None;
        if event::poll(wait)? {
            let event = event::read()?;
            if !self.dispatch(&event) {
                unhandled = Some(event);
            }
        }

        self.run_due();
        Ok(unhandled)
    }

    /// Run due timers, then the frame callbacks if a frame is due.
    pub fn run_due(&self) {
        loop {
            let now = self.now();
            let next = self.state.borrow_mut().queue.pop_due_timer(now);
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }

        let now = self.now();
        let frame_due = {
            let state = self.state.borrow();
            state.queue.frame_count() > 0
                && state
                    .last_frame
                    .is_none_or(|last| now >= last + self.frame_interval())
        };
        if !frame_due {
            return;
        }

        let handles = {
            let mut state = self.state.borrow_mut();
            state.last_frame = Some(now);
            state.queue.frame_handles()
        };
        for handle in handles {
            let callback = self.state.borrow_mut().queue.take_frame(handle);
            if let Some(callback) = callback {
                callback(now);
            }
        }
    }

    /// When the next timer or frame wants to run, if anything is pending.
    fn next_deadline(&self) -> Option<Duration> {
        let state = self.state.borrow();
        let next_frame = (state.queue.frame_count() > 0).then(|| {
            state
                .last_frame
                .map(|last| last + self.frame_interval())
                .unwrap_or(Duration::ZERO)
        });

        match (state.queue.next_timer_due(), next_frame) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// How long `pump` may block: `timeout`, cut short by a pending deadline.
/// A deadline already in the past means no wait at all.
fn poll_wait(deadline: Option<Duration>, now: Duration, timeout: Duration) -> Duration {
    deadline
        .map(|deadline| deadline.saturating_sub(now).min(timeout))
        .unwrap_or(timeout)
}

impl Platform for TerminalPlatform {
    fn capabilities(&self) -> Capabilities {
        Capabilities::RESIZE | Capabilities::FRAMES
    }

    fn current_viewport_size(&self) -> Size {
        self.state.borrow().size
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
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

    // Terminals never rotate. Registrations are accepted and never fire.
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
        let due = self.now() + delay;
        self.state.borrow_mut().queue.push_timer(callback, due)
    }

    fn cancel_timeout(&self, handle: TimerHandle) {
        self.state.borrow_mut().queue.cancel_timer(handle);
    }
}

// =============================================================================
// Tests
// =============================================================================

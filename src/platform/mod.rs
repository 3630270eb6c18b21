//! Platform Module - Event and scheduling primitives
//!
//! The scheduler never touches a real window or terminal directly. It talks
//! to a [`Platform`], which provides:
//!
//! - **Events** - resize and orientation-change listener registration
//! - **Frames** - animation-frame callbacks (one-shot, cancellable)
//! - **Timers** - one-shot timeouts (cancellable)
//! - **Measurement** - current viewport size and a monotonic clock
//!
//! Three platforms ship with the crate:
//!
//! - [`ManualPlatform`] - deterministic clock driven by the caller (tests, replays)
//! - [`TerminalPlatform`] - crossterm-backed terminal
//! - [`HeadlessPlatform`] - no viewport at all; subscriptions keep their initial size
//!
//! All platforms are single-threaded. Callbacks run on the thread that drives
//! the platform and may freely call back into it.

mod headless;
mod manual;
mod queue;
mod terminal;

use std::rc::Rc;
use std::time::Duration;

use crate::types::{Size, DEFAULT_FPS};

pub use headless::HeadlessPlatform;
pub use manual::ManualPlatform;
pub use terminal::TerminalPlatform;

// =============================================================================
// Handles
// =============================================================================

/// Identifies a registered resize/orientation listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Identifies a pending animation-frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Identifies a pending timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Listener for resize/orientation events. Called once per event.
pub type ListenerFn = Rc<dyn Fn()>;

/// Animation-frame callback. Receives the frame timestamp (platform clock).
pub type FrameCallback = Box<dyn FnOnce(Duration)>;

/// Timeout callback.
pub type TimerCallback = Box<dyn FnOnce()>;

/// The two raw event streams a viewport can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Resize,
    Orientation,
}

// =============================================================================
// Capabilities
// =============================================================================

bitflags::bitflags! {
    /// What a platform can actually deliver.
    ///
    /// Combine with bitwise OR: `Capabilities::RESIZE | Capabilities::FRAMES`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Emits resize events.
        const RESIZE = 1 << 0;
        /// Emits orientation-change events.
        const ORIENTATION = 1 << 1;
        /// Runs animation-frame callbacks at its native frame rate.
        const FRAMES = 1 << 2;
    }
}

impl Capabilities {
    /// Whether the platform reports any viewport change at all.
    pub fn observes_viewport(self) -> bool {
        self.intersects(Self::RESIZE | Self::ORIENTATION)
    }

    /// Whether listeners of this kind can be registered.
    pub fn supports(self, kind: EventKind) -> bool {
        match kind {
            EventKind::Resize => self.contains(Self::RESIZE),
            EventKind::Orientation => self.contains(Self::ORIENTATION),
        }
    }
}

// =============================================================================
// Platform Trait
// =============================================================================

/// Host environment collaborator.
///
/// Cancelling or removing something that already fired, was already
/// cancelled, or never existed must be a no-op.
pub trait Platform {
    /// Event streams and scheduling primitives this platform provides.
    fn capabilities(&self) -> Capabilities;

    /// Current viewport dimensions.
    fn current_viewport_size(&self) -> Size;

    /// Monotonic clock, measured from an arbitrary platform-defined origin.
    fn now(&self) -> Duration;

    /// Rate at which animation-frame callbacks run.
    fn native_fps(&self) -> f64 {
        DEFAULT_FPS
    }

    fn add_resize_listener(&self, listener: ListenerFn) -> ListenerId;
    fn remove_resize_listener(&self, id: ListenerId);

    fn add_orientation_listener(&self, listener: ListenerFn) -> ListenerId;
    fn remove_orientation_listener(&self, id: ListenerId);

    /// Run `callback` on the next animation frame.
    fn schedule_frame_callback(&self, callback: FrameCallback) -> FrameHandle;
    fn cancel_frame_callback(&self, handle: FrameHandle);

    /// Run `callback` once `delay` has elapsed on the platform clock.
    fn schedule_timeout(&self, callback: TimerCallback, delay: Duration) -> TimerHandle;
    fn cancel_timeout(&self, handle: TimerHandle);
}

// =============================================================================
// Tests
// =============================================================================

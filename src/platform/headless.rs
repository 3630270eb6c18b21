//! Headless Platform - No viewport at all.
//!
//! Advertises no capabilities. Registration calls hand back dummy handles and
//! scheduled callbacks are dropped without running.

use std::time::Duration;

use super::{
    Capabilities, FrameCallback, FrameHandle, ListenerFn, ListenerId, Platform, TimerCallback,
    TimerHandle,
};
use crate::types::Size;

/// Platform for hosts without a viewport (batch jobs, pipes, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessPlatform;

impl Platform for HeadlessPlatform {
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn current_viewport_size(&self) -> Size {
        Size::ZERO
    }

    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn add_resize_listener(&self, _listener: ListenerFn) -> ListenerId {
        ListenerId(0)
    }

    fn remove_resize_listener(&self, _id: ListenerId) {}

    fn add_orientation_listener(&self, _listener: ListenerFn) -> ListenerId {
        ListenerId(0)
    }

    fn remove_orientation_listener(&self, _id: ListenerId) {}

    fn schedule_frame_callback(&self, _callback: FrameCallback) -> FrameHandle {
        FrameHandle(0)
    }

    fn cancel_frame_callback(&self, _handle: FrameHandle) {}

    fn schedule_timeout(&self, _callback: TimerCallback, _delay: Duration) -> TimerHandle {
        TimerHandle(0)
    }

    fn cancel_timeout(&self, _handle: TimerHandle) {}
}

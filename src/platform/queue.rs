//! Callback bookkeeping shared by the concrete platforms.
//!
//! Holds listeners, pending frame callbacks and pending timers. Knows nothing
//! about clocks beyond comparing due times; the owning platform decides when
//! to run things. Callbacks are always handed out, never invoked here, so the
//! owner can release its borrow before calling them.

use std::time::Duration;

use super::{
    EventKind, FrameCallback, FrameHandle, ListenerFn, ListenerId, TimerCallback, TimerHandle,
};

struct PendingTimer {
    handle: TimerHandle,
    due: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
pub(crate) struct CallbackQueue {
    next_id: u64,
    resize: Vec<(ListenerId, ListenerFn)>,
    orientation: Vec<(ListenerId, ListenerFn)>,
    frames: Vec<(FrameHandle, FrameCallback)>,
    timers: Vec<PendingTimer>,
}

impl CallbackQueue {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn listeners_mut(&mut self, kind: EventKind) -> &mut Vec<(ListenerId, ListenerFn)> {
        match kind {
            EventKind::Resize => &mut self.resize,
            EventKind::Orientation => &mut self.orientation,
        }
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    pub fn add_listener(&mut self, kind: EventKind, listener: ListenerFn) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners_mut(kind).push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, kind: EventKind, id: ListenerId) {
        self.listeners_mut(kind).retain(|(existing, _)| *existing != id);
    }

    /// Snapshot of the listeners for `kind`, in registration order.
    pub fn listeners(&self, kind: EventKind) -> Vec<ListenerFn> {
        let list = match kind {
            EventKind::Resize => &self.resize,
            EventKind::Orientation => &self.orientation,
        };
        list.iter().map(|(_, listener)| listener.clone()).collect()
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::Resize => self.resize.len(),
            EventKind::Orientation => self.orientation.len(),
        }
    }

    // -------------------------------------------------------------------------
    // Frames
    // -------------------------------------------------------------------------

    pub fn push_frame(&mut self, callback: FrameCallback) -> FrameHandle {
        let handle = FrameHandle(self.next_id());
        self.frames.push((handle, callback));
        handle
    }

    pub fn cancel_frame(&mut self, handle: FrameHandle) {
        self.frames.retain(|(existing, _)| *existing != handle);
    }

    /// Handles of every frame callback queued right now.
    pub fn frame_handles(&self) -> Vec<FrameHandle> {
        self.frames.iter().map(|(handle, _)| *handle).collect()
    }

    /// Remove a frame callback so it can be run. `None` if it was cancelled.
    pub fn take_frame(&mut self, handle: FrameHandle) -> Option<FrameCallback> {
        let pos = self.frames.iter().position(|(existing, _)| *existing == handle)?;
        Some(self.frames.remove(pos).1)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    pub fn push_timer(&mut self, callback: TimerCallback, due: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id());
        self.timers.push(PendingTimer {
            handle,
            due,
            callback,
        });
        handle
    }

    pub fn cancel_timer(&mut self, handle: TimerHandle) {
        self.timers.retain(|timer| timer.handle != handle);
    }

    /// Remove the earliest timer due at or before `now`.
    ///
    /// Timers with equal due times come out in scheduling order.
    pub fn pop_due_timer(&mut self, now: Duration) -> Option<TimerCallback> {
        let pos = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= now)
            .min_by_key(|(_, timer)| (timer.due, timer.handle.0))
            .map(|(pos, _)| pos)?;
        Some(self.timers.remove(pos).callback)
    }

    /// Earliest due time among pending timers.
    pub fn next_timer_due(&self) -> Option<Duration> {
        self.timers.iter().map(|timer| timer.due).min()
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

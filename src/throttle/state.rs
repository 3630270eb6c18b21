//! Throttle state machine.
//!
//! Pure transitions, no platform. The scheduler feeds it triggers and ticks
//! with timestamps and carries out the action it returns.
//!
//! ```text
//! Idle --(trigger, leading)--> publish now --> Scheduled(cooldown)
//! Idle --(trigger)-----------> Scheduled(pending)
//! Scheduled --(trigger)------> Scheduled(pending), no new tick
//! Scheduled --(tick, pending)--> publish latest --> Idle
//! Scheduled --(tick, idle)-----> Idle
//! ```

use std::time::Duration;

/// Where the machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No tick armed.
    Idle,
    /// A tick is armed for `due`. `pending` records whether a trigger arrived
    /// that has not been published yet.
    Scheduled { due: Duration, pending: bool },
}

/// What the scheduler must do after a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Publish right now, then arm a cooldown tick for `due`.
    PublishAndArm { due: Duration },
    /// Arm a tick for `due`; publish when it fires.
    Arm { due: Duration },
    /// A tick is already armed and will pick this trigger up.
    Coalesce,
}

/// What the scheduler must do when a tick fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Fired before `due` (frame cadence): re-arm and wait.
    Wait { due: Duration },
    /// Publish the latest size. The machine is idle again.
    Publish,
    /// Cooldown ran out with nothing pending. The machine is idle again.
    Expire,
    /// No tick was armed. Nothing to do.
    Stale,
}

/// Leading/trailing throttle over an abstract clock.
///
/// Trailing mode publishes at most once per `interval`. Leading mode is
/// looser: a trailing publish at the end of a cooldown returns the machine to
/// `Idle`, so a trigger at that same instant leads again and the two publishes
/// share a timestamp. What holds is that any three consecutive publishes span
/// at least one `interval`.
#[derive(Debug, Clone)]
pub struct ThrottleState {
    phase: Phase,
    leading: bool,
    interval: Duration,
    last_publish: Option<Duration>,
}

impl ThrottleState {
    pub fn new(leading: bool, interval: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            leading,
            interval,
            last_publish: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_publish(&self) -> Option<Duration> {
        self.last_publish
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A viewport change arrived at `now`.
    pub fn on_trigger(&mut self, now: Duration) -> TriggerAction {
        match self.phase {
            Phase::Scheduled { due, .. } => {
                self.phase = Phase::Scheduled { due, pending: true };
                TriggerAction::Coalesce
            }
            Phase::Idle if self.leading => {
                let due = now + self.interval;
                self.last_publish = Some(now);
                self.phase = Phase::Scheduled {
                    due,
                    pending: false,
                };
                TriggerAction::PublishAndArm { due }
            }
            Phase::Idle => {
                // First frame boundary at or after a full interval since the
                // last publish; right away if nothing was published yet.
                let due = self
                    .last_publish
                    .map(|last| (last + self.interval).max(now))
                    .unwrap_or(now);
                self.phase = Phase::Scheduled { due, pending: true };
                TriggerAction::Arm { due }
            }
        }
    }

    /// The armed tick fired at `now`.
    ///
    /// A due tick always ends in `Idle`, including the cooldown tick in
    /// leading mode. No new cooldown starts after a trailing publish.
    pub fn on_tick(&mut self, now: Duration) -> TickAction {
        let Phase::Scheduled { due, pending } = self.phase else {
            return TickAction::Stale;
        };

        if now < due {
            return TickAction::Wait { due };
        }

        self.phase = Phase::Idle;
        if pending {
            self.last_publish = Some(now);
            TickAction::Publish
        } else {
            TickAction::Expire
        }
    }

    /// Drop any armed tick. Idempotent.
    pub fn cancel(&mut self) {
        self.phase = Phase::Idle;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_trailing_first_trigger_due_now() {
        let mut state = ThrottleState::new(false, ms(16));
        assert_eq!(state.on_trigger(ms(5)), TriggerAction::Arm { due: ms(5) });
        assert_eq!(
            state.phase(),
            Phase::Scheduled {
                due: ms(5),
                pending: true
            }
        );
    }

    #[test]
    fn test_trailing_coalesces_until_tick() {
        let mut state = ThrottleState::new(false, ms(16));
        state.on_trigger(ms(0));
        for t in 1..10 {
            assert_eq!(state.on_trigger(ms(t)), TriggerAction::Coalesce);
        }
        assert_eq!(state.on_tick(ms(16)), TickAction::Publish);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.last_publish(), Some(ms(16)));
    }

    #[test]
    fn test_trailing_respects_interval_after_publish() {
        let mut state = ThrottleState::new(false, ms(16));
        state.on_trigger(ms(0));
        state.on_tick(ms(0));

        // Next trigger lands inside the window: due at the window end
        assert_eq!(state.on_trigger(ms(4)), TriggerAction::Arm { due: ms(16) });
        assert_eq!(state.on_tick(ms(10)), TickAction::Wait { due: ms(16) });
        assert_eq!(state.on_tick(ms(16)), TickAction::Publish);

        // Trigger well after the window: due immediately
        assert_eq!(state.on_trigger(ms(100)), TriggerAction::Arm { due: ms(100) });
    }

    #[test]
    fn test_leading_publishes_then_cools_down() {
        let mut state = ThrottleState::new(true, ms(33));
        assert_eq!(
            state.on_trigger(ms(10)),
            TriggerAction::PublishAndArm { due: ms(43) }
        );
        assert_eq!(state.last_publish(), Some(ms(10)));

        // Nothing during the cooldown: expire quietly
        assert_eq!(state.on_tick(ms(43)), TickAction::Expire);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.last_publish(), Some(ms(10)));
    }

    #[test]
    fn test_leading_cooldown_trailing_publish() {
        let mut state = ThrottleState::new(true, ms(33));
        state.on_trigger(ms(0));
        assert_eq!(state.on_trigger(ms(5)), TriggerAction::Coalesce);
        assert_eq!(state.on_tick(ms(40)), TickAction::Publish);

        // Idle again: next trigger leads
        assert_eq!(
            state.on_trigger(ms(41)),
            TriggerAction::PublishAndArm { due: ms(74) }
        );
    }

    #[test]
    fn test_leading_relead_at_cooldown_expiry() {
        let mut state = ThrottleState::new(true, ms(33));
        assert_eq!(
            state.on_trigger(ms(0)),
            TriggerAction::PublishAndArm { due: ms(33) }
        );
        assert_eq!(state.on_trigger(ms(20)), TriggerAction::Coalesce);
        assert_eq!(state.on_tick(ms(33)), TickAction::Publish);
        assert_eq!(state.last_publish(), Some(ms(33)));

        // Same instant as the trailing publish: leads again
        assert_eq!(
            state.on_trigger(ms(33)),
            TriggerAction::PublishAndArm { due: ms(66) }
        );

        // The third publish waits out the new cooldown
        assert_eq!(state.on_trigger(ms(40)), TriggerAction::Coalesce);
        assert_eq!(state.on_tick(ms(50)), TickAction::Wait { due: ms(66) });
        assert_eq!(state.on_tick(ms(66)), TickAction::Publish);
    }

    #[test]
    fn test_stale_tick_and_cancel() {
        let mut state = ThrottleState::new(false, ms(16));
        assert_eq!(state.on_tick(ms(0)), TickAction::Stale);

        state.on_trigger(ms(0));
        state.cancel();
        state.cancel();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.on_tick(ms(100)), TickAction::Stale);
        assert_eq!(state.last_publish(), None);
    }
}

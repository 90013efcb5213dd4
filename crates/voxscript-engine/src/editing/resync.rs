use std::time::{Duration, Instant};

/// How long unmanaged edits may coalesce before the next read-back.
pub const RESYNC_WINDOW: Duration = Duration::from_millis(200);

/// Single-slot, cancel-and-reschedule timer that coalesces read-back
/// requests.
///
/// Every unmanaged input event calls [`schedule`](Self::schedule); rapid
/// keystrokes keep pushing one shared deadline out, so a burst collapses
/// into a single read-back when the host's tick observes the deadline
/// passing. Programmatic mutations must [`cancel`](Self::cancel) and read
/// back synchronously instead of waiting, or they would act on a stale
/// document.
#[derive(Debug, Clone)]
pub struct ResyncQueue {
    deadline: Option<Instant>,
    window: Duration,
}

impl Default for ResyncQueue {
    fn default() -> Self {
        Self::new(RESYNC_WINDOW)
    }
}

impl ResyncQueue {
    pub fn new(window: Duration) -> Self {
        Self {
            deadline: None,
            window,
        }
    }

    /// Arm (or re-arm) the deadline at `now + window`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    /// A read-back is owed but has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the pending read-back is due, if any. Hosts use this to bound
    /// their event-poll timeout.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True exactly once per armed deadline, the first time `now` reaches
    /// it.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

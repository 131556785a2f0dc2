use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Counters {
    in_flight: usize,
    launched: u64,
    completed: u64,
    shutting_down: bool,
    drained: bool,
}

/// Point-in-time copy of the run counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub in_flight: usize,
    pub launched: u64,
    pub completed: u64,
    pub shutting_down: bool,
}

/// Process-wide in-flight bookkeeping shared by the coordinator and its workers.
///
/// Every mutation goes through one mutex, so shutdown never reads a stale count.
/// The drain condition (`shutting_down && in_flight == 0`) fires at most once.
#[derive(Debug, Default)]
pub struct RunState {
    counters: Mutex<Counters>,
    drained: Notify,
}

impl RunState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn counters(&self) -> MutexGuard<'_, Counters> {
        // Nothing panics while holding the lock, so a poisoned state is still consistent.
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a new worker. The count drops again when the guard is dropped.
    pub fn enter(self: &Arc<Self>) -> InFlightGuard {
        let mut counters = self.counters();
        counters.in_flight += 1;
        counters.launched += 1;
        InFlightGuard {
            state: Arc::clone(self),
        }
    }

    fn leave(&self) {
        let drained_now = {
            let mut counters = self.counters();
            counters.in_flight = counters.in_flight.saturating_sub(1);
            counters.completed += 1;
            Self::mark_drained_if_idle(&mut counters)
        };
        if drained_now {
            self.drained.notify_waiters();
        }
    }

    /// Stops accepting the idea of new work. Returns `true` when nothing was in
    /// flight, i.e. the process may exit right away.
    pub fn begin_shutdown(&self) -> bool {
        let (drained_now, drained) = {
            let mut counters = self.counters();
            counters.shutting_down = true;
            let drained_now = Self::mark_drained_if_idle(&mut counters);
            (drained_now, counters.drained)
        };
        if drained_now {
            self.drained.notify_waiters();
        }
        drained
    }

    fn mark_drained_if_idle(counters: &mut Counters) -> bool {
        if counters.shutting_down && counters.in_flight == 0 && !counters.drained {
            counters.drained = true;
            return true;
        }
        false
    }

    /// Resolves once shutdown has begun and the last in-flight worker finished.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.drained.notified();
            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }

    pub fn is_drained(&self) -> bool {
        self.counters().drained
    }

    pub fn is_shutting_down(&self) -> bool {
        self.counters().shutting_down
    }

    pub fn in_flight(&self) -> usize {
        self.counters().in_flight
    }

    pub fn stats(&self) -> RunStats {
        let counters = self.counters();
        RunStats {
            in_flight: counters.in_flight,
            launched: counters.launched,
            completed: counters.completed,
            shutting_down: counters.shutting_down,
        }
    }
}

/// Held by a running worker task; dropping it (including on panic) marks the
/// worker complete.
#[derive(Debug)]
pub struct InFlightGuard {
    state: Arc<RunState>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.leave();
    }
}

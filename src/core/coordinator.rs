use crate::core::clock::{dispatch_delay, WindowClock};
use crate::core::run_state::RunState;
use crate::core::worker::{WindowOutcome, WindowWorker};
use crate::domain::model::Window;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives the tick loop: one spawned worker per window, never waiting on them.
pub struct RunCoordinator {
    clock: WindowClock,
    worker: Arc<WindowWorker>,
    state: Arc<RunState>,
}

impl RunCoordinator {
    pub fn new(clock: WindowClock, worker: WindowWorker) -> Self {
        Self {
            clock,
            worker: Arc::new(worker),
            state: RunState::new(),
        }
    }

    /// Shared handle on the in-flight counters, for observers and tests.
    pub fn state(&self) -> Arc<RunState> {
        Arc::clone(&self.state)
    }

    /// Runs until `ct` is cancelled, then waits for every dispatched window to
    /// finish before returning.
    pub async fn run(mut self, ct: CancellationToken) {
        let interval = self.clock.interval();
        let anchor = Instant::now();

        tracing::info!(
            interval_secs = interval.as_secs(),
            first_window = %self.clock.cursor(),
            "Cloudflare log push tasks to Elastic started."
        );

        while !ct.is_cancelled() {
            let window = self.clock.next_window();
            self.dispatch(window, ct.clone());

            let delay = dispatch_delay(anchor.elapsed(), interval);
            tokio::select! {
                biased;
                _ = ct.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.shutdown().await;
    }

    fn dispatch(&self, window: Window, ct: CancellationToken) {
        // Counted before the task exists so shutdown can never miss it.
        let guard = self.state.enter();
        let worker = Arc::clone(&self.worker);

        tracing::debug!(in_flight = self.state.in_flight(), "{}: Dispatching", window);

        tokio::spawn(async move {
            let _guard = guard;
            let outcome = worker.process(&window, &ct).await;
            match outcome {
                WindowOutcome::Pushed { .. } | WindowOutcome::Empty | WindowOutcome::Skipped => {
                    tracing::debug!(?outcome, "{}: Finished", window)
                }
                _ => tracing::debug!(?outcome, "{}: Finished without pushing", window),
            }
        });
    }

    async fn shutdown(&self) {
        tracing::info!("Initiating program exit. Finishing up log push tasks...");

        if !self.state.begin_shutdown() {
            tracing::info!(
                in_flight = self.state.in_flight(),
                "Waiting for in-flight log push tasks to finish"
            );
            self.state.wait_drained().await;
        }

        let stats = self.state.stats();
        tracing::info!(
            windows = stats.launched,
            "Program exited gracefully."
        );
    }
}

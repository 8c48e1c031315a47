use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// One unit of periodic work.
#[async_trait::async_trait]
pub trait Cycle: Send + Sync + 'static {
    type Output: Send;

    fn name(&self) -> &'static str;

    async fn run_cycle(&self) -> Self::Output;
}

struct SchedulerState {
    interval: Duration,
    stop_tx: Option<watch::Sender<bool>>,
}

/// STOPPED ⇄ RUNNING timer around a [`Cycle`].
///
/// At most one cycle of a given scheduler executes at a time. `stop()` only
/// prevents future cycles; an in-flight cycle runs to completion.
pub struct PeriodicScheduler<C: Cycle> {
    cycle: Arc<C>,
    run_lock: Arc<tokio::sync::Mutex<()>>,
    state: Mutex<SchedulerState>,
}

impl<C: Cycle> PeriodicScheduler<C> {
    pub fn new(cycle: Arc<C>, default_interval: Duration) -> Self {
        Self {
            cycle,
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
            state: Mutex::new(SchedulerState {
                interval: default_interval.max(Duration::from_millis(1)),
                stop_tx: None,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn cycle(&self) -> &Arc<C> {
        &self.cycle
    }

    pub fn is_active(&self) -> bool {
        self.state().stop_tx.is_some()
    }

    pub fn interval(&self) -> Duration {
        self.state().interval
    }

    /// Transition to RUNNING and await one immediate cycle.
    ///
    /// Returns `None` without doing anything when already running. A given
    /// `interval` replaces the current one; `None` keeps it.
    pub async fn start(&self, interval: Option<Duration>) -> Option<C::Output> {
        let stop_rx = {
            let mut st = self.state();
            if st.stop_tx.is_some() {
                debug!(scheduler = self.cycle.name(), "start ignored: already running");
                return None;
            }
            if let Some(i) = interval {
                st.interval = i.max(Duration::from_millis(1));
            }
            let (tx, rx) = watch::channel(false);
            st.stop_tx = Some(tx);
            info!(
                scheduler = self.cycle.name(),
                interval_ms = st.interval.as_millis() as u64,
                "scheduler started"
            );
            self.spawn_timer(st.interval, rx.clone());
            rx
        };

        let _guard = self.run_lock.lock().await;
        if *stop_rx.borrow() {
            return None;
        }
        Some(self.cycle.run_cycle().await)
    }

    fn spawn_timer(&self, period: Duration, mut stop_rx: watch::Receiver<bool>) {
        let cycle = Arc::clone(&self.cycle);
        let run_lock = Arc::clone(&self.run_lock);

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        // The cycle runs in the branch body, so a stop signal
                        // arriving meanwhile cannot cancel it.
                        match run_lock.try_lock() {
                            Ok(_guard) => {
                                cycle.run_cycle().await;
                            }
                            Err(_) => {
                                debug!(scheduler = cycle.name(), "tick skipped: previous cycle still running");
                            }
                        }
                    }
                }
            }
            debug!(scheduler = cycle.name(), "timer loop exited");
        });
    }

    /// Transition to STOPPED. Returns whether the scheduler was running.
    pub fn stop(&self) -> bool {
        let tx = self.state().stop_tx.take();
        match tx {
            Some(tx) => {
                let _ = tx.send(true);
                info!(scheduler = self.cycle.name(), "scheduler stopped");
                true
            }
            None => false,
        }
    }

    /// Run one cycle now, waiting for any in-flight cycle to finish first.
    pub async fn trigger_now(&self) -> C::Output {
        let _guard = self.run_lock.lock().await;
        self.cycle.run_cycle().await
    }
}

impl<C: Cycle> Drop for PeriodicScheduler<C> {
    fn drop(&mut self) {
        self.stop();
    }
}

// =====================================================================================
// LINK MONITOR SCHEDULER
// =====================================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::models::{MonitorConfig, MonitorStatus, RoundBatch, Target};
use crate::services::broadcast::{BatchReceiver, LatencyBroadcaster};
use crate::services::prober::{PingProber, Prober, SimulatedProber};

struct Lifecycle {
    running: bool,
    /// Bumped on every start and stop; a round only emits if it still matches.
    epoch: u64,
    shutdown: Option<watch::Sender<bool>>,
    ticker: Option<JoinHandle<()>>,
}

struct MonitorInner {
    config: MonitorConfig,
    prober: Arc<dyn Prober>,
    limiter: Semaphore,
    targets: RwLock<Vec<Target>>,
    lifecycle: Mutex<Lifecycle>,
    /// Held by a ticker for the whole of a round, so a restarted ticker waits
    /// for a halted one to drain.
    round_guard: Mutex<()>,
    broadcaster: LatencyBroadcaster,
    round_seq: AtomicU64,
    /// Rounds whose batch was actually published.
    rounds_completed: AtomicU64,
}

/// Process-wide monitor. Every session shares the same target set and the
/// same running state; cloning hands out another reference to it.
#[derive(Clone)]
pub struct LinkMonitorService {
    inner: Arc<MonitorInner>,
}

impl LinkMonitorService {
    pub fn new(config: MonitorConfig) -> Self {
        let prober: Arc<dyn Prober> = if config.simulation_mode {
            Arc::new(SimulatedProber::new())
        } else {
            Arc::new(PingProber::new(config.probe_timeout))
        };
        Self::with_prober(config, prober)
    }

    pub fn with_prober(config: MonitorConfig, prober: Arc<dyn Prober>) -> Self {
        let broadcaster = LatencyBroadcaster::new(config.broadcast_capacity);
        let limiter = Semaphore::new(config.concurrency.max(1));

        Self {
            inner: Arc::new(MonitorInner {
                config,
                prober,
                limiter,
                targets: RwLock::new(Vec::new()),
                lifecycle: Mutex::new(Lifecycle {
                    running: false,
                    epoch: 0,
                    shutdown: None,
                    ticker: None,
                }),
                round_guard: Mutex::new(()),
                broadcaster,
                round_seq: AtomicU64::new(0),
                rounds_completed: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    pub fn subscribe(&self) -> BatchReceiver {
        self.inner.broadcaster.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lifecycle.lock().await.running
    }

    pub async fn targets(&self) -> Vec<Target> {
        self.inner.targets.read().await.clone()
    }

    /// Probes immediately, then once per configured interval until stopped.
    /// Calling it while already running does nothing.
    pub async fn start(&self) {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if lifecycle.running {
            debug!("Link monitor already running");
            return;
        }

        lifecycle.epoch += 1;
        let epoch = lifecycle.epoch;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let monitor = self.clone();
        let ticker = tokio::spawn(async move { monitor.tick_loop(epoch, shutdown_rx).await });

        lifecycle.running = true;
        lifecycle.shutdown = Some(shutdown_tx);
        lifecycle.ticker = Some(ticker);

        let mode = if self.inner.config.simulation_mode { "DEV MODE" } else { "LIVE" };
        info!(
            "Link monitor started ({}) - {} links",
            mode,
            self.inner.targets.read().await.len()
        );
    }

    /// Cancels the timer. Probes already in flight finish, but their batch
    /// is not emitted.
    pub async fn stop(&self) {
        // the ticker exits on its own once signalled
        let _ = self.halt().await;
    }

    /// Replaces the whole target set. Duplicate ids keep their first position
    /// and the last address given.
    pub async fn update_targets(&self, targets: Vec<Target>) {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(targets.len());
        let mut deduped: Vec<Target> = Vec::with_capacity(targets.len());

        for target in targets {
            match positions.get(&target.id) {
                Some(&index) => deduped[index].address = target.address,
                None => {
                    positions.insert(target.id.clone(), deduped.len());
                    deduped.push(target);
                }
            }
        }

        let count = deduped.len();
        *self.inner.targets.write().await = deduped;
        info!("Monitoring {} links", count);
    }

    /// Runs one probe pass over a snapshot of the current targets without
    /// emitting it. `None` when there is nothing to probe.
    #[instrument(skip(self))]
    pub async fn probe_round(&self) -> Option<RoundBatch> {
        let targets = self.inner.targets.read().await.clone();
        if targets.is_empty() {
            debug!("No links to probe, skipping round");
            return None;
        }

        let started = Instant::now();
        let inner = &self.inner;
        let results = futures::future::join_all(targets.iter().map(|target| async move {
            // fair semaphore: waiting probes get slots in target order
            let _permit = inner.limiter.acquire().await.ok();
            inner.prober.probe(target).await
        }))
        .await;

        let round = inner.round_seq.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "Round {} probed {} links in {}ms",
            round,
            results.len(),
            started.elapsed().as_millis()
        );

        Some(RoundBatch { round, results })
    }

    pub async fn status(&self) -> MonitorStatus {
        let running = self.is_running().await;
        MonitorStatus {
            running,
            simulation_mode: self.inner.config.simulation_mode,
            target_count: self.inner.targets.read().await.len(),
            subscriber_count: self.inner.broadcaster.subscriber_count(),
            rounds_completed: self.inner.rounds_completed.load(Ordering::Relaxed),
            interval_ms: self.inner.config.interval.as_millis() as u64,
            concurrency: self.inner.config.concurrency,
        }
    }

    /// Stops, waits for an in-flight round to drain, then forgets all
    /// targets and prober state.
    pub async fn shutdown(&self) {
        if let Some(ticker) = self.halt().await {
            if let Err(e) = ticker.await {
                warn!("Link monitor ticker ended abnormally: {}", e);
            }
        }

        self.inner.targets.write().await.clear();
        self.inner.prober.reset().await;
        info!("Link monitor shut down");
    }

    // Private helper methods

    async fn halt(&self) -> Option<JoinHandle<()>> {
        let mut lifecycle = self.inner.lifecycle.lock().await;
        if !lifecycle.running {
            return None;
        }

        lifecycle.running = false;
        lifecycle.epoch += 1;
        if let Some(shutdown) = lifecycle.shutdown.take() {
            let _ = shutdown.send(true);
        }

        info!("Link monitor stopped");
        lifecycle.ticker.take()
    }

    async fn tick_loop(self, epoch: u64, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.inner.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = interval.tick() => {}
            }

            let _round = self.inner.round_guard.lock().await;
            if *shutdown.borrow() {
                break;
            }

            if let Some(batch) = self.probe_round().await {
                self.emit(epoch, batch).await;
            }
        }

        debug!("Link monitor ticker {} exited", epoch);
    }

    async fn emit(&self, epoch: u64, batch: RoundBatch) {
        let lifecycle = self.inner.lifecycle.lock().await;
        if !lifecycle.running || lifecycle.epoch != epoch {
            debug!("Dropping round {} that finished after the monitor stopped", batch.round);
            return;
        }

        self.inner.broadcaster.publish(batch);
        self.inner.rounds_completed.fetch_add(1, Ordering::Relaxed);
    }
}

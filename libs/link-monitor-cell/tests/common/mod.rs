#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use link_monitor_cell::{
    LinkMonitorService, MonitorConfig, ProbeResult, ProbeStatus, Prober, Target,
};

/// Prober double with a controllable delay and an in-flight counter.
pub struct StubProber {
    default_delay: Duration,
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
    started: Mutex<Vec<(String, Instant)>>,
}

impl StubProber {
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            delays: HashMap::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, id: &str, delay: Duration) -> Self {
        self.delays.insert(id.to_string(), delay);
        self
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn started(&self) -> Vec<(String, Instant)> {
        self.started.lock().await.clone()
    }
}

#[async_trait]
impl Prober for StubProber {
    async fn probe(&self, target: &Target) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.started.lock().await.push((target.id.clone(), Instant::now()));

        let delay = self.delays.get(&target.id).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        ProbeResult::new(&target.id, 20, ProbeStatus::Online)
    }
}

pub fn test_config(concurrency: usize) -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_millis(2000),
        probe_timeout: Duration::from_secs(2),
        concurrency,
        simulation_mode: false,
        broadcast_capacity: 32,
    }
}

pub fn targets(count: usize) -> Vec<Target> {
    (0..count)
        .map(|i| Target::new(format!("link-{}", i), format!("https://host-{}.test/", i)))
        .collect()
}

pub fn monitor_with(concurrency: usize, prober: Arc<StubProber>) -> LinkMonitorService {
    LinkMonitorService::with_prober(test_config(concurrency), prober)
}

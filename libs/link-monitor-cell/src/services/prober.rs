// =====================================================================================
// LINK PROBERS
// =====================================================================================

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::models::{MonitorError, ProbeResult, ProbeStatus, Target};

/// Latency above which a reachable host is reported as slow.
pub const SLOW_THRESHOLD_MS: u64 = 100;

/// Extra time granted to the ping process beyond its own reply timeout.
const PROCESS_GRACE: Duration = Duration::from_millis(500);

/// Checks a single target. Implementations never fail: every error
/// resolves to an offline result.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: &Target) -> ProbeResult;

    /// Forget any per-target state kept between calls.
    async fn reset(&self) {}
}

/// Pulls the host out of a URL-like string without a full URL parser.
/// Falls back to the raw input when nothing usable remains.
pub fn extract_hostname(address: &str) -> String {
    let raw = address.trim();

    let without_scheme = match raw.split_once("://") {
        Some((scheme, rest)) if !scheme.contains('/') => rest,
        _ => raw,
    };

    let authority = without_scheme
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    let authority = authority
        .rsplit_once('@')
        .map(|(_, host)| host)
        .unwrap_or(authority);

    let host = match authority.strip_prefix('[') {
        Some(bracketed) => bracketed.split(']').next().unwrap_or_default(),
        None => authority.split(':').next().unwrap_or_default(),
    };

    if host.is_empty() {
        raw.to_string()
    } else {
        host.to_string()
    }
}

pub fn classify_latency(latency_ms: u64) -> ProbeStatus {
    if latency_ms > SLOW_THRESHOLD_MS {
        ProbeStatus::Slow
    } else {
        ProbeStatus::Online
    }
}

// =====================================================================================
// ICMP PROBER (system ping)
// =====================================================================================

pub struct PingProber {
    timeout: Duration,
    rtt_pattern: Regex,
}

impl PingProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            rtt_pattern: Regex::new(r"time[=<]\s*([0-9]+(?:[.,][0-9]+)?)\s*ms")
                .expect("RTT pattern is a valid regex"),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reads the round-trip time from ping output, if it reported one.
    pub fn parse_rtt(&self, output: &str) -> Option<f64> {
        self.rtt_pattern
            .captures(output)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
    }

    /// Latency of a successful ping run. Windows `ping` also exits cleanly on
    /// "Destination host unreachable", so there a missing RTT means no reply.
    pub fn reply_latency(&self, stdout: &str, rtt_required: bool) -> Option<f64> {
        match self.parse_rtt(stdout) {
            Some(rtt) => Some(rtt),
            None if rtt_required => None,
            None => Some(0.0),
        }
    }

    fn build_command(&self, host: &str) -> Command {
        let secs = self.timeout.as_secs().max(1);
        let mut cmd = Command::new("ping");

        if cfg!(target_os = "windows") {
            cmd.args(["-n", "1", "-w"]).arg((secs * 1000).to_string());
        } else if cfg!(target_os = "macos") {
            cmd.args(["-n", "-c", "1", "-t"]).arg(secs.to_string());
        } else {
            cmd.args(["-n", "-c", "1", "-W"]).arg(secs.to_string());
        }

        cmd.arg(host)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// `Ok(Some(rtt))` on a reply, `Ok(None)` when the host did not answer in time.
    async fn ping(&self, host: &str) -> Result<Option<f64>, MonitorError> {
        let child = self.build_command(host).spawn()?;

        let output = match tokio::time::timeout(self.timeout + PROCESS_GRACE, child.wait_with_output()).await {
            Ok(output) => output?,
            Err(_) => return Ok(None),
        };

        if !output.status.success() {
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(self.reply_latency(&stdout, cfg!(target_os = "windows")))
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, target: &Target) -> ProbeResult {
        let host = extract_hostname(&target.address);

        // never hand option-looking strings to ping
        if host.is_empty() || host.starts_with('-') || host.chars().any(char::is_whitespace) {
            debug!("Rejecting malformed address '{}' for link {}", target.address, target.id);
            return ProbeResult::offline(&target.id);
        }

        match self.ping(&host).await {
            Ok(Some(rtt)) => {
                let latency_ms = rtt.max(0.0).round() as u64;
                ProbeResult::new(&target.id, latency_ms, classify_latency(latency_ms))
            }
            Ok(None) => {
                debug!("No reply from {} for link {}", host, target.id);
                ProbeResult::offline(&target.id)
            }
            Err(e) => {
                warn!("Ping failed for {}: {}", host, e);
                ProbeResult::offline(&target.id)
            }
        }
    }
}

// =====================================================================================
// SIMULATED PROBER (DEV_MODE)
// =====================================================================================

pub const SIMULATED_SEED_LATENCY: f64 = 50.0;
pub const SIMULATED_MIN_LATENCY: f64 = 10.0;
pub const SIMULATED_MAX_LATENCY: f64 = 2000.0;
pub const SIMULATED_SLOW_THRESHOLD: f64 = 1000.0;
pub const SPIKE_PROBABILITY: f64 = 0.05;
pub const OFFLINE_PROBABILITY: f64 = 0.02;

struct WalkState {
    rng: StdRng,
    last_latency: HashMap<String, f64>,
}

/// Bounded random walk per link id, for environments without network access.
pub struct SimulatedProber {
    state: Mutex<WalkState>,
}

impl SimulatedProber {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(WalkState {
                rng,
                last_latency: HashMap::new(),
            }),
        }
    }

    pub async fn last_latency(&self, id: &str) -> Option<f64> {
        self.state.lock().await.last_latency.get(id).copied()
    }

    async fn step(&self, id: &str) -> (f64, bool, bool) {
        let mut state = self.state.lock().await;
        let WalkState { rng, last_latency } = &mut *state;

        let prev = last_latency.get(id).copied().unwrap_or(SIMULATED_SEED_LATENCY);
        let delta = rng.gen_range(-10.0..=16.0);
        let mut latency = (prev + delta).clamp(SIMULATED_MIN_LATENCY, SIMULATED_MAX_LATENCY);

        let spiked = rng.gen_bool(SPIKE_PROBABILITY);
        if spiked {
            latency = rng.gen_range(500.0..=SIMULATED_MAX_LATENCY);
        }

        let offline = rng.gen_bool(OFFLINE_PROBABILITY);
        last_latency.insert(id.to_string(), latency);

        (latency, spiked, offline)
    }
}

impl Default for SimulatedProber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Prober for SimulatedProber {
    async fn probe(&self, target: &Target) -> ProbeResult {
        let (latency, _, offline) = self.step(&target.id).await;

        let status = if offline {
            ProbeStatus::Offline
        } else if latency > SIMULATED_SLOW_THRESHOLD {
            ProbeStatus::Slow
        } else {
            ProbeStatus::Online
        };

        ProbeResult::new(&target.id, latency.round() as u64, status)
    }

    async fn reset(&self) {
        self.state.lock().await.last_latency.clear();
    }
}

// =====================================================================================
// LINK MONITOR CELL MODELS
// =====================================================================================

use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_config::AppConfig;

/// One endpoint being probed. Deserialization is lenient: any JSON value
/// becomes a target, so a garbage entry simply probes offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Target {
    pub id: String,
    #[serde(rename = "url")]
    pub address: String,
}

impl Target {
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

impl From<Value> for Target {
    fn from(value: Value) -> Self {
        let field = |names: &[&str]| {
            names
                .iter()
                .find_map(|name| value.get(*name).filter(|v| !v.is_null()))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_default()
        };

        Self {
            id: field(&["id"]),
            address: field(&["url", "address"]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Online,
    Slow,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(rename = "linkId")]
    pub id: String,
    #[serde(rename = "latency")]
    pub latency_ms: u64,
    pub status: ProbeStatus,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl ProbeResult {
    pub fn new(id: impl Into<String>, latency_ms: u64, status: ProbeStatus) -> Self {
        let latency_ms = if status == ProbeStatus::Offline { 0 } else { latency_ms };
        Self {
            id: id.into(),
            latency_ms,
            status,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn offline(id: impl Into<String>) -> Self {
        Self::new(id, 0, ProbeStatus::Offline)
    }
}

/// Results of one round, in target order as of the start of the round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundBatch {
    pub round: u64,
    pub results: Vec<ProbeResult>,
}

impl RoundBatch {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

// Wire protocol: every frame is `{"event": ..., "data": ...}`

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    StartMonitoring,
    StopMonitoring,
    UpdateLinks(Vec<Target>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    LatencyUpdate(Vec<ProbeResult>),
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub interval: Duration,
    pub probe_timeout: Duration,
    pub concurrency: usize,
    pub simulation_mode: bool,
    pub broadcast_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for MonitorConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.monitor_interval_ms.max(1)),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs.max(1)),
            concurrency: config.probe_concurrency.max(1),
            simulation_mode: config.simulation_mode,
            broadcast_capacity: config.broadcast_capacity.max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub simulation_mode: bool,
    pub target_count: usize,
    pub subscriber_count: usize,
    pub rounds_completed: u64,
    pub interval_ms: u64,
    pub concurrency: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    #[error("Failed to run probe: {0}")]
    ProbeSpawn(#[from] std::io::Error),
    #[error("Transport error: {0}")]
    Transport(String),
}

use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_PROBE_CONCURRENCY: usize = 20;
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub monitor_interval_ms: u64,
    pub probe_timeout_secs: u64,
    pub probe_concurrency: usize,
    pub simulation_mode: bool,
    pub broadcast_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            probe_concurrency: DEFAULT_PROBE_CONCURRENCY,
            simulation_mode: false,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            port: parse_var("PORT", DEFAULT_PORT),
            monitor_interval_ms: non_zero(
                "MONITOR_INTERVAL_MS",
                parse_var("MONITOR_INTERVAL_MS", DEFAULT_MONITOR_INTERVAL_MS),
                DEFAULT_MONITOR_INTERVAL_MS,
            ),
            probe_timeout_secs: non_zero(
                "MONITOR_PROBE_TIMEOUT_SECS",
                parse_var("MONITOR_PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS),
                DEFAULT_PROBE_TIMEOUT_SECS,
            ),
            probe_concurrency: non_zero(
                "MONITOR_CONCURRENCY",
                parse_var("MONITOR_CONCURRENCY", DEFAULT_PROBE_CONCURRENCY),
                DEFAULT_PROBE_CONCURRENCY,
            ),
            simulation_mode: env::var("DEV_MODE")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            broadcast_capacity: non_zero(
                "MONITOR_BROADCAST_CAPACITY",
                parse_var("MONITOR_BROADCAST_CAPACITY", DEFAULT_BROADCAST_CAPACITY),
                DEFAULT_BROADCAST_CAPACITY,
            ),
        };

        if config.simulation_mode {
            warn!("DEV_MODE enabled - link latency is simulated, no real probes will be sent");
        }

        config
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn non_zero<T>(name: &str, value: T, default: T) -> T
where
    T: PartialEq + Default + std::fmt::Display + Copy,
{
    if value == T::default() {
        warn!("{} must be greater than zero, using default {}", name, default);
        default
    } else {
        value
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

// =====================================================================================
// LINK MONITOR CELL - LIVE LATENCY PROBING FOR SAVED LINKS
// =====================================================================================
//
// This cell provides:
// - Reachability probes (system ping, or a simulated walk in DEV_MODE)
// - A shared scheduler running bounded-concurrency probe rounds on a timer
// - Fan-out of each round's results to every connected WebSocket session
// - A client-side rolling history buffer for the wire contract
//
// =====================================================================================

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{
    ClientCommand, MonitorConfig, MonitorError, MonitorStatus, ProbeResult, ProbeStatus,
    RoundBatch, ServerEvent, Target,
};

pub use services::{
    LatencyBroadcaster, LatencyHistory, LinkMonitorService, MonitorSession, PingProber, Prober,
    SimulatedProber,
};

pub use router::create_link_monitor_router;

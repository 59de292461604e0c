pub mod prober;
pub mod monitor;
pub mod broadcast;
pub mod session;
pub mod history;

pub use prober::{classify_latency, extract_hostname, PingProber, Prober, SimulatedProber};
pub use monitor::LinkMonitorService;
pub use broadcast::LatencyBroadcaster;
pub use session::MonitorSession;
pub use history::LatencyHistory;

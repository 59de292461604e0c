// =====================================================================================
// LINK MONITOR CELL ROUTER
// =====================================================================================

use axum::{routing::get, Router};

use crate::handlers::{get_monitor_status, monitor_websocket};
use crate::services::LinkMonitorService;

pub fn create_link_monitor_router(monitor: LinkMonitorService) -> Router {
    Router::new()
        .route("/ws", get(monitor_websocket))
        .route("/status", get(get_monitor_status))
        .with_state(monitor)
}

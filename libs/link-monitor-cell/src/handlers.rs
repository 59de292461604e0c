// =====================================================================================
// LINK MONITOR CELL HANDLERS
// =====================================================================================

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
    Json,
};
use tracing::instrument;

use crate::models::MonitorStatus;
use crate::services::{LinkMonitorService, MonitorSession};

/// Upgrades to the live monitoring channel. The session is subscribed to
/// every batch from here on, whether or not it ever sends `start_monitoring`.
#[instrument(skip(ws, monitor))]
pub async fn monitor_websocket(
    ws: WebSocketUpgrade,
    State(monitor): State<LinkMonitorService>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| MonitorSession::new(monitor).run(socket))
}

#[instrument(skip(monitor))]
pub async fn get_monitor_status(
    State(monitor): State<LinkMonitorService>,
) -> Json<MonitorStatus> {
    Json(monitor.status().await)
}

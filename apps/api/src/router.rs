use axum::{
    Router,
    routing::get,
};

use link_monitor_cell::{create_link_monitor_router, LinkMonitorService};

pub fn create_router(monitor: LinkMonitorService) -> Router {
    Router::new()
        .route("/", get(|| async { "Link Monitor API is running!" }))
        .nest("/monitor", create_link_monitor_router(monitor))
}

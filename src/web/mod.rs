//! Web server module

mod middleware;
mod routes;
mod sse;

use anyhow::Result;
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::Config;
use crate::dashboard::Dashboard;
use crate::events::EventBus;
use crate::scheduler::Scheduler;
use middleware::RequestLoggingLayer;

pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub scheduler: Arc<Scheduler>,
    pub bus: EventBus,
}

pub fn router(state: Arc<AppState>) -> Router {
    // Read-only endpoints may be embedded elsewhere; controls stay same-origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        // Page shell
        .route("/", get(routes::index))
        // Patch stream and full view
        .route("/events", get(sse::events_handler))
        .route("/api/view", get(routes::api_view))
        // Controls
        .route("/search", post(routes::search))
        .route("/search/clear", post(routes::clear_search))
        .route("/filters/:key/remove", post(routes::remove_filter))
        .route("/page/prev", post(routes::prev_page))
        .route("/page/next", post(routes::next_page))
        .route("/auto-refresh/toggle", post(routes::toggle_auto_refresh))
        .route("/tab/:tab", post(routes::switch_tab))
        .route("/polling/pause", post(routes::pause))
        .route("/polling/resume", post(routes::resume))
        // Static files
        .nest_service("/static", ServeDir::new("static"))
        .layer(cors)
        .layer(RequestLoggingLayer)
        .with_state(state)
}

pub async fn start_server(config: &Config, state: Arc<AppState>) -> Result<()> {
    let scheduler = state.scheduler.clone();
    let app = router(state);

    let addr = config.bind_addr();
    info!("Web server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    scheduler.shutdown().await;
    Ok(())
}

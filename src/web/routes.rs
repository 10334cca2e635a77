//! Page shell, view snapshot and control routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Html,
    Form, Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::AppState;
use crate::scheduler::StartupParams;
use crate::state::{FilterForm, FilterKey, LogFilterSet, Tab};
use crate::view::Node;

/// Serve the dashboard shell. `tab` and `since` act like on first load;
/// a missing or unknown `tab` selects the dashboard.
pub async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartupParams>,
) -> Html<&'static str> {
    let tab = params.tab.as_deref().map(Tab::from_param).unwrap_or_default();
    state.dashboard.switch_tab(tab).await;

    // The reload lands through the patch stream; the shell never waits on upstream
    if let Some(since) = params.since {
        let dashboard = state.dashboard.clone();
        tokio::spawn(async move {
            dashboard.load_stats_from_timestamp(&since).await;
        });
    }
    Html(include_str!("../../static/index.html"))
}

#[derive(Debug, Serialize)]
pub struct ViewState {
    pub page: u32,
    pub page_size: u32,
    pub filters: LogFilterSet,
    pub auto_refresh: bool,
    pub tab: Tab,
    pub paused: bool,
    pub last_update_time: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub nodes: BTreeMap<String, Node>,
    pub state: ViewState,
}

/// API: every node of the document plus the poll state, for the initial paint
pub async fn api_view(State(state): State<Arc<AppState>>) -> Json<ViewResponse> {
    let nodes = state.dashboard.document().await;
    let poll = state.dashboard.poll_state().await;

    Json(ViewResponse {
        nodes,
        state: ViewState {
            page: poll.current_log_page,
            page_size: poll.log_page_size,
            filters: poll.current_filters,
            auto_refresh: poll.auto_refresh_logs,
            tab: poll.active_tab,
            paused: state.scheduler.is_paused().await,
            last_update_time: poll.last_update_time,
        },
    })
}

/// Search form submit; responds with the filters now in effect
pub async fn search(State(state): State<Arc<AppState>>, Form(form): Form<FilterForm>) -> Json<LogFilterSet> {
    state.dashboard.handle_search(form.fields()).await;
    Json(state.dashboard.poll_state().await.current_filters)
}

pub async fn clear_search(State(state): State<Arc<AppState>>) -> Json<LogFilterSet> {
    state.dashboard.clear_search().await;
    Json(state.dashboard.poll_state().await.current_filters)
}

/// Remove one filter badge. `size` removes both size bounds.
pub async fn remove_filter(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<LogFilterSet>, StatusCode> {
    let key = FilterKey::parse(&key).ok_or(StatusCode::NOT_FOUND)?;
    state.dashboard.remove_filter(key).await;
    Ok(Json(state.dashboard.poll_state().await.current_filters))
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub page: u32,
    pub changed: bool,
}

async fn move_page(state: &AppState, delta: i64) -> Json<PageResponse> {
    let changed = state.dashboard.change_page(delta).await;
    let page = state.dashboard.poll_state().await.current_log_page;
    Json(PageResponse { page, changed })
}

pub async fn prev_page(State(state): State<Arc<AppState>>) -> Json<PageResponse> {
    move_page(&state, -1).await
}

pub async fn next_page(State(state): State<Arc<AppState>>) -> Json<PageResponse> {
    move_page(&state, 1).await
}

#[derive(Debug, Serialize)]
pub struct AutoRefreshResponse {
    pub enabled: bool,
}

pub async fn toggle_auto_refresh(State(state): State<Arc<AppState>>) -> Json<AutoRefreshResponse> {
    let enabled = state.scheduler.toggle_auto_refresh().await;
    Json(AutoRefreshResponse { enabled })
}

pub async fn switch_tab(State(state): State<Arc<AppState>>, Path(tab): Path<String>) -> StatusCode {
    state.dashboard.switch_tab(Tab::from_param(&tab)).await;
    StatusCode::NO_CONTENT
}

pub async fn pause(State(state): State<Arc<AppState>>) -> StatusCode {
    state.scheduler.pause().await;
    StatusCode::NO_CONTENT
}

pub async fn resume(State(state): State<Arc<AppState>>) -> StatusCode {
    state.scheduler.resume().await;
    StatusCode::NO_CONTENT
}

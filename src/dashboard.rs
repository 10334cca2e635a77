//! Page controller
//!
//! Owns the poll state, the rendered document and the chart registry, and
//! turns API responses into document patches for connected browsers.

use chrono::Local;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::api::{DashboardApi, StatsSnapshot, SyncResult};
use crate::charts::ChartRegistry;
use crate::config::Config;
use crate::events::EventBus;
use crate::scheduler::BusyFlag;
use crate::state::{FilterKey, PollState, Tab};
use crate::view::format::parse_timestamp;
use crate::view::{anchor, logs, stats, Document, Node};

/// Startup knobs of the controller
#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    pub log_page_size: u32,
    pub auto_refresh_logs: bool,
    pub charts_enabled: bool,
}

impl DashboardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            log_page_size: config.polling.page_size,
            auto_refresh_logs: config.polling.auto_refresh_logs,
            charts_enabled: config.charts.enabled,
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            log_page_size: 50,
            auto_refresh_logs: true,
            charts_enabled: true,
        }
    }
}

/// Result of one stats poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Another stats poll was in flight; nothing fetched
    Skipped,
    Rendered { has_new_data: bool },
    /// Fetch failed; the error region shows why
    Failed,
}

struct View {
    state: PollState,
    doc: Document,
    charts: ChartRegistry,
    last_snapshot: Option<StatsSnapshot>,
}

impl View {
    fn apply_tab(&mut self, tab: Tab) {
        self.state.active_tab = tab;
        let (dashboard, search) = match tab {
            Tab::Dashboard => (" active", ""),
            Tab::Search => ("", " active"),
        };
        self.doc.set_class(anchor::DASHBOARD_TAB, format!("tab-content{}", dashboard));
        self.doc.set_class(anchor::SEARCH_TAB, format!("tab-content{}", search));
        self.doc.set_class(anchor::DASHBOARD_TAB_BTN, format!("tab-btn{}", dashboard));
        self.doc.set_class(anchor::SEARCH_TAB_BTN, format!("tab-btn{}", search));
    }

    fn render_snapshot(&mut self, snapshot: StatsSnapshot, has_new_data: bool) {
        stats::process_stats_data(&mut self.doc, &mut self.charts, &snapshot);
        stats::update_status_indicator(&mut self.doc, has_new_data);
        stats::clear_stats_error(&mut self.doc);
        stats::update_last_update(&mut self.doc, Local::now());
        self.last_snapshot = Some(snapshot);
    }
}

pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    view: Mutex<View>,
    stats_busy: BusyFlag,
    bus: EventBus,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DashboardApi>, settings: DashboardSettings, bus: EventBus) -> Self {
        let mut view = View {
            state: PollState::new(settings.log_page_size, settings.auto_refresh_logs),
            doc: Document::dashboard(),
            charts: ChartRegistry::new(settings.charts_enabled),
            last_snapshot: None,
        };
        view.apply_tab(Tab::Dashboard);
        logs::update_auto_refresh_label(&mut view.doc, settings.auto_refresh_logs);
        stats::clear_stats_error(&mut view.doc);
        // Initial paint is served whole from `document()`
        view.doc.take_patches();

        Self {
            api,
            view: Mutex::new(view),
            stats_busy: BusyFlag::new(),
            bus,
        }
    }

    fn publish(&self, view: &mut View) {
        self.bus.publish_all(view.doc.take_patches());
    }

    /// Trigger server-side ingestion. Failures only mean "no new data".
    pub async fn sync_logs(&self, force: bool) -> SyncResult {
        let result = self.api.sync_logs(force).await;
        if !result.success {
            debug!("Log sync did not succeed, continuing with existing data");
        }
        result
    }

    /// One stats poll. A call made while another is in flight is dropped.
    pub async fn update(&self) -> UpdateOutcome {
        let Some(_busy) = self.stats_busy.try_acquire() else {
            debug!("Stats poll still in flight, dropping tick");
            return UpdateOutcome::Skipped;
        };
        self.refresh_stats().await
    }

    /// Forget the last seen timestamp and load a fresh snapshot.
    ///
    /// The stats endpoint always returns a full snapshot, so `since` only
    /// needs to be a valid timestamp; it does not change the request.
    pub async fn load_stats_from_timestamp(&self, since: &str) -> UpdateOutcome {
        if parse_timestamp(since).is_none() {
            warn!("Invalid timestamp '{}'. Use ISO format like: 2025-12-13T02:00:03", since);
            return UpdateOutcome::Skipped;
        }

        let Some(_busy) = self.stats_busy.acquire().await else {
            return UpdateOutcome::Skipped;
        };
        self.view.lock().await.state.reset_last_update();
        info!("Reloading stats from scratch (since {})", since);
        self.refresh_stats().await
    }

    async fn refresh_stats(&self) -> UpdateOutcome {
        let result = self.api.fetch_stats().await;

        let mut view = self.view.lock().await;
        let outcome = match result {
            Ok(snapshot) => {
                let has_new_data = view.state.record_snapshot(&snapshot);
                view.render_snapshot(snapshot, has_new_data);
                UpdateOutcome::Rendered { has_new_data }
            }
            Err(e) => {
                error!("Error fetching stats: {}", e);
                stats::show_stats_error(&mut view.doc, &e.to_string());
                UpdateOutcome::Failed
            }
        };
        self.publish(&mut view);
        outcome
    }

    /// Fetch and render the current logs page. Returns false when the
    /// response was discarded because a newer one already rendered.
    pub async fn load_logs(&self) -> bool {
        let (ticket, query) = {
            let mut view = self.view.lock().await;
            (view.state.begin_logs_request(), view.state.logs_query())
        };

        let result = self.api.fetch_logs(&query).await;

        let mut view = self.view.lock().await;
        if !view.state.accept_logs_response(ticket) {
            debug!("Discarding stale logs response for page {}", query.page);
            return false;
        }

        match result {
            Ok(mut page) => {
                if page.filters.is_empty() {
                    page.filters = query.filters.clone();
                }
                logs::render_logs(&mut view.doc, &page);
            }
            Err(e) => {
                error!("Error loading logs: {}", e);
                logs::render_logs_error(&mut view.doc, &e.to_string());
            }
        }
        self.publish(&mut view);
        true
    }

    /// Search form submit: new filters, back to page 1
    pub async fn handle_search<I, K, V>(&self, raw: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        {
            let mut view = self.view.lock().await;
            let filters = view.state.apply_filters(raw);
            debug!("Applying {} log filters", filters.len());
        }
        self.load_logs().await;
    }

    pub async fn clear_search(&self) {
        self.view.lock().await.state.clear();
        self.load_logs().await;
    }

    pub async fn remove_filter(&self, key: FilterKey) {
        self.view.lock().await.state.remove_filter(key);
        self.load_logs().await;
    }

    /// Move by `delta` pages; ignored if that would go below page 1.
    pub async fn change_page(&self, delta: i64) -> bool {
        if !self.view.lock().await.state.change_page(delta) {
            return false;
        }
        self.load_logs().await;
        true
    }

    /// Show a tab. Charts skipped while the dashboard was hidden are drawn
    /// from the last snapshot when it comes back.
    pub async fn switch_tab(&self, tab: Tab) {
        let mut view = self.view.lock().await;
        view.apply_tab(tab);

        if tab == Tab::Dashboard {
            let View {
                doc,
                charts,
                last_snapshot,
                ..
            } = &mut *view;
            if let Some(snapshot) = last_snapshot.as_ref() {
                stats::render_charts(doc, charts, snapshot);
            }
        }
        self.publish(&mut view);
    }

    pub async fn set_auto_refresh(&self, enabled: bool) {
        let mut view = self.view.lock().await;
        view.state.auto_refresh_logs = enabled;
        logs::update_auto_refresh_label(&mut view.doc, enabled);
        self.publish(&mut view);
    }

    pub async fn auto_refresh_enabled(&self) -> bool {
        self.view.lock().await.state.auto_refresh_logs
    }

    /// Every node, for the initial paint
    pub async fn document(&self) -> BTreeMap<String, Node> {
        self.view.lock().await.doc.snapshot()
    }

    pub async fn poll_state(&self) -> PollState {
        self.view.lock().await.state.clone()
    }

    pub async fn live_charts(&self) -> u64 {
        self.view.lock().await.charts.live_instances()
    }

    pub fn is_updating(&self) -> bool {
        self.stats_busy.is_busy()
    }
}

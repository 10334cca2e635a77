//! Poll scheduling
//!
//! Stats and logs are polled on independent intervals. Each tick spawns its
//! poll, so a slow request never delays the timer; overlapping stats polls
//! are dropped by the dashboard's busy flag instead.

use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::PollingConfig;
use crate::dashboard::Dashboard;
use crate::state::Tab;

/// Single-holder flag marking an operation as in flight
#[derive(Debug, Clone)]
pub struct BusyFlag {
    permits: Arc<Semaphore>,
}

/// Held while busy; dropping it clears the flag
#[derive(Debug)]
pub struct BusyGuard {
    _permit: OwnedSemaphorePermit,
}

impl BusyFlag {
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Take the flag if it is free
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| BusyGuard { _permit: permit })
    }

    /// Wait for the flag
    pub async fn acquire(&self) -> Option<BusyGuard> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .ok()
            .map(|permit| BusyGuard { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for BusyFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// A repeating timer. The first tick fires one period after spawn;
/// the timer stops when dropped.
pub struct PollTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

impl PollTask {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, tick: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tokio::spawn(tick());
            }
        });
        debug!("Started {} timer ({}ms)", name, period.as_millis());
        Self { name, handle }
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
        debug!("Stopped {} timer", self.name);
    }
}

/// Query parameters accepted when the page is opened
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartupParams {
    pub tab: Option<String>,
    /// ISO timestamp; reload stats from scratch instead of a plain poll
    pub since: Option<String>,
}

pub struct Scheduler {
    dashboard: Arc<Dashboard>,
    stats_period: Duration,
    logs_period: Duration,
    force_sync: bool,
    stats_task: Mutex<Option<PollTask>>,
    logs_task: Mutex<Option<PollTask>>,
}

impl Scheduler {
    pub fn new(dashboard: Arc<Dashboard>, polling: &PollingConfig) -> Self {
        Self {
            dashboard,
            stats_period: Duration::from_millis(polling.stats_interval_ms),
            logs_period: Duration::from_millis(polling.logs_interval_ms),
            force_sync: polling.force_sync,
            stats_task: Mutex::new(None),
            logs_task: Mutex::new(None),
        }
    }

    pub fn dashboard(&self) -> &Arc<Dashboard> {
        &self.dashboard
    }

    /// Page load: pick the tab, sync, first stats and logs load, then timers.
    pub async fn start(&self, params: StartupParams) {
        let tab = params.tab.as_deref().map(Tab::from_param).unwrap_or_default();
        self.dashboard.switch_tab(tab).await;

        self.dashboard.sync_logs(self.force_sync).await;

        match params.since.as_deref() {
            Some(since) => {
                self.dashboard.load_stats_from_timestamp(since).await;
            }
            None => {
                self.dashboard.update().await;
            }
        }
        self.dashboard.load_logs().await;

        self.start_stats_timer().await;
        if self.dashboard.auto_refresh_enabled().await {
            let mut logs_task = self.logs_task.lock().await;
            self.start_logs_timer(&mut logs_task);
        }
        info!(
            "Polling stats every {}ms, logs every {}ms",
            self.stats_period.as_millis(),
            self.logs_period.as_millis()
        );
    }

    async fn start_stats_timer(&self) {
        let dashboard = self.dashboard.clone();
        let task = PollTask::spawn("stats", self.stats_period, move || {
            let dashboard = dashboard.clone();
            async move {
                dashboard.update().await;
            }
        });
        *self.stats_task.lock().await = Some(task);
    }

    fn start_logs_timer(&self, slot: &mut Option<PollTask>) {
        let dashboard = self.dashboard.clone();
        let task = PollTask::spawn("logs", self.logs_period, move || {
            let dashboard = dashboard.clone();
            async move {
                if dashboard.auto_refresh_enabled().await {
                    dashboard.load_logs().await;
                }
            }
        });
        *slot = Some(task);
    }

    /// Stop both timers. In-flight polls still finish.
    pub async fn pause(&self) {
        self.stats_task.lock().await.take();
        self.logs_task.lock().await.take();
        info!("Polling paused");
    }

    pub async fn resume(&self) {
        if !self.is_paused().await {
            return;
        }
        self.start_stats_timer().await;
        if self.dashboard.auto_refresh_enabled().await {
            let mut logs_task = self.logs_task.lock().await;
            self.start_logs_timer(&mut logs_task);
        }
        info!("Polling resumed");
    }

    pub async fn is_paused(&self) -> bool {
        self.stats_task.lock().await.is_none()
    }

    /// Flip logs auto-refresh and start or stop its timer. Returns the new setting.
    pub async fn toggle_auto_refresh(&self) -> bool {
        let stats_task = self.stats_task.lock().await;
        let mut logs_task = self.logs_task.lock().await;
        let enabled = !self.dashboard.auto_refresh_enabled().await;
        self.dashboard.set_auto_refresh(enabled).await;

        if enabled {
            // Stays off while paused; resume starts it
            if stats_task.is_some() {
                self.start_logs_timer(&mut logs_task);
            }
        } else {
            logs_task.take();
        }
        info!("Logs auto-refresh {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    pub async fn logs_timer_running(&self) -> bool {
        self.logs_task.lock().await.is_some()
    }

    pub async fn shutdown(&self) {
        self.pause().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeApi;
    use crate::dashboard::DashboardSettings;
    use crate::events::EventBus;
    use std::sync::atomic::Ordering;

    fn polling(stats_ms: u64, logs_ms: u64) -> PollingConfig {
        PollingConfig {
            stats_interval_ms: stats_ms,
            logs_interval_ms: logs_ms,
            ..Default::default()
        }
    }

    fn scheduler(api: Arc<FakeApi>, polling: &PollingConfig) -> Scheduler {
        let dashboard = Dashboard::new(api, DashboardSettings::default(), EventBus::with_capacity(256));
        Scheduler::new(Arc::new(dashboard), polling)
    }

    #[test]
    fn test_busy_flag() {
        let flag = BusyFlag::new();
        let guard = flag.try_acquire().unwrap();
        assert!(flag.is_busy());
        assert!(flag.try_acquire().is_none());

        drop(guard);
        assert!(!flag.is_busy());
        assert!(flag.try_acquire().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_order() {
        let api = Arc::new(FakeApi::new());
        let scheduler = scheduler(api.clone(), &polling(3000, 30000));

        scheduler.start(StartupParams::default()).await;

        assert_eq!(api.calls(), vec!["sync", "stats", "logs"]);
        assert!(!scheduler.is_paused().await);
        assert!(scheduler.logs_timer_running().await);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_polled_every_period() {
        let api = Arc::new(FakeApi::new());
        let scheduler = scheduler(api.clone(), &polling(3000, 30000));

        scheduler.start(StartupParams::default()).await;
        tokio::time::sleep(Duration::from_millis(9100)).await;

        // Initial load plus ticks at 3s, 6s and 9s
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 4);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_stats_drop_ticks() {
        let api = Arc::new(FakeApi::new());
        let scheduler = scheduler(api.clone(), &polling(3000, 30000));

        scheduler.start(StartupParams::default()).await;
        api.set_stats_delay(Duration::from_secs(7));
        tokio::time::sleep(Duration::from_millis(12500)).await;

        // Tick at 3s runs until 10s, so 6s and 9s are dropped; 12s runs
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 3);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_auto_refresh() {
        let api = Arc::new(FakeApi::new());
        let scheduler = scheduler(api.clone(), &polling(3000, 5000));
        scheduler.start(StartupParams::default()).await;

        assert!(!scheduler.toggle_auto_refresh().await);
        assert!(!scheduler.logs_timer_running().await);
        tokio::time::sleep(Duration::from_millis(11000)).await;
        assert_eq!(api.logs_calls.load(Ordering::SeqCst), 1);

        assert!(scheduler.toggle_auto_refresh().await);
        assert!(scheduler.logs_timer_running().await);
        tokio::time::sleep(Duration::from_millis(5100)).await;
        assert_eq!(api.logs_calls.load(Ordering::SeqCst), 2);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_and_resume() {
        let api = Arc::new(FakeApi::new());
        let scheduler = scheduler(api.clone(), &polling(3000, 30000));
        scheduler.start(StartupParams::default()).await;

        scheduler.pause().await;
        assert!(scheduler.is_paused().await);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 1);

        scheduler.resume().await;
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 2);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_on_search_tab_with_since() {
        let api = Arc::new(FakeApi::new());
        let scheduler = scheduler(api.clone(), &polling(3000, 30000));

        scheduler
            .start(StartupParams {
                tab: Some("search".to_string()),
                since: Some("2025-12-13T02:00:03".to_string()),
            })
            .await;

        let state = scheduler.dashboard().poll_state().await;
        assert_eq!(state.active_tab, Tab::Search);
        assert_eq!(api.stats_calls.load(Ordering::SeqCst), 1);
        scheduler.shutdown().await;
    }
}

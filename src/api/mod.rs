//! Client side of the log-monitoring API

mod client;
mod retry;
mod wire;

pub use client::{ApiClient, DashboardApi};
pub use retry::{fetch_with_retry, RetryPolicy};
pub use wire::{LogEntry, LogPage, Pair, StatsSnapshot, SyncResult};

/// Scriptable in-memory API used by controller and scheduler tests
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::ApiError;
    use crate::state::LogsQuery;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    pub struct FakeApi {
        pub sync_result: Mutex<SyncResult>,
        pub stats: Mutex<VecDeque<Result<StatsSnapshot, ApiError>>>,
        pub stats_delay: Mutex<Duration>,
        pub logs: Mutex<VecDeque<(Duration, Result<LogPage, ApiError>)>>,
        pub log_queries: Mutex<Vec<LogsQuery>>,
        pub calls: Mutex<Vec<&'static str>>,
        pub stats_calls: AtomicUsize,
        pub logs_calls: AtomicUsize,
    }

    impl FakeApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_stats(&self, result: Result<StatsSnapshot, ApiError>) {
            self.stats.lock().unwrap().push_back(result);
        }

        pub fn push_logs(&self, delay: Duration, result: Result<LogPage, ApiError>) {
            self.logs.lock().unwrap().push_back((delay, result));
        }

        pub fn set_stats_delay(&self, delay: Duration) {
            *self.stats_delay.lock().unwrap() = delay;
        }

        pub fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DashboardApi for FakeApi {
        async fn sync_logs(&self, _force: bool) -> SyncResult {
            self.calls.lock().unwrap().push("sync");
            self.sync_result.lock().unwrap().clone()
        }

        async fn fetch_stats(&self) -> Result<StatsSnapshot, ApiError> {
            self.calls.lock().unwrap().push("stats");
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            let delay = *self.stats_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let next = self.stats.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(StatsSnapshot::default()))
        }

        async fn fetch_logs(&self, query: &LogsQuery) -> Result<LogPage, ApiError> {
            self.calls.lock().unwrap().push("logs");
            self.logs_calls.fetch_add(1, Ordering::SeqCst);
            self.log_queries.lock().unwrap().push(query.clone());
            let next = self.logs.lock().unwrap().pop_front();
            let (delay, result) = next.unwrap_or_else(|| (Duration::ZERO, Ok(LogPage::default())));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

//! HTTP client for the log-monitoring API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::retry::{fetch_with_retry, RetryPolicy};
use super::wire::{LogPage, StatsSnapshot, SyncResult};
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::state::LogsQuery;

/// The three resources the dashboard polls
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Ask the server to ingest new raw log lines. Never fails: any error
    /// is reported as an unsuccessful result.
    async fn sync_logs(&self, force: bool) -> SyncResult;

    async fn fetch_stats(&self) -> Result<StatsSnapshot, ApiError>;

    async fn fetch_logs(&self, query: &LogsQuery) -> Result<LogPage, ApiError>;
}

/// reqwest-backed API client
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let retry = RetryPolicy {
            attempts: config.retries.max(1),
            base: Duration::from_millis(config.retry_base_ms),
        };

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// One GET request decoded as JSON
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let response = self.http.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Request {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// `fetch_stats` with retry and backoff, regardless of the configured policy
    pub async fn fetch_stats_with_retry(&self, policy: &RetryPolicy) -> Result<StatsSnapshot, ApiError> {
        fetch_with_retry(policy, "stats", || self.get_json("/api/stats", &[])).await
    }

    /// `fetch_logs` with retry and backoff, regardless of the configured policy
    pub async fn fetch_logs_with_retry(&self, query: &LogsQuery, policy: &RetryPolicy) -> Result<LogPage, ApiError> {
        let params = query.to_query();
        fetch_with_retry(policy, "logs", || self.get_json("/api/logs", &params)).await
    }
}

#[async_trait]
impl DashboardApi for ApiClient {
    async fn sync_logs(&self, force: bool) -> SyncResult {
        let query = if force {
            vec![("force", "true".to_string())]
        } else {
            Vec::new()
        };

        match self.get_json::<SyncResult>("/api/sync", &query).await {
            Ok(result) => {
                if result.has_new_entries() {
                    info!("Synced {} new log entries", result.count);
                } else if !result.success {
                    warn!("Log sync reported failure: {}", result.message.as_deref().unwrap_or("no message"));
                }
                result
            }
            Err(e) => {
                warn!("Error syncing logs: {}", e);
                SyncResult::failed()
            }
        }
    }

    async fn fetch_stats(&self) -> Result<StatsSnapshot, ApiError> {
        if self.retry.retries() {
            return self.fetch_stats_with_retry(&self.retry).await;
        }
        self.get_json("/api/stats", &[]).await
    }

    async fn fetch_logs(&self, query: &LogsQuery) -> Result<LogPage, ApiError> {
        if self.retry.retries() {
            return self.fetch_logs_with_retry(query, &self.retry).await;
        }
        self.get_json("/api/logs", &query.to_query()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_config(base_url: &str, retries: u32) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            request_timeout_secs: 5,
            retries,
            retry_base_ms: 250,
        }
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new(&api_config("http://logs.local:5000/", 1)).unwrap();
        assert_eq!(client.url("/api/stats"), "http://logs.local:5000/api/stats");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let client = ApiClient::new(&api_config("http://logs.local", 3)).unwrap();
        let policy = client.retry_policy();
        assert_eq!(policy.attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_millis(500));

        let single = ApiClient::new(&api_config("http://logs.local", 0)).unwrap();
        assert!(!single.retry_policy().retries());
    }
}

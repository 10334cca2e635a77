//! Wire schema of the log API
//!
//! The server is loose about shapes: series come as `[label, count]` tuples or
//! as objects, numbers sometimes arrive as strings and any field may be null.
//! Everything is normalized here so the renderer only sees one shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::state::LogFilterSet;

/// Keys that may carry the label of an object-shaped series item
const LABEL_KEYS: &[&str] = &[
    "label", "ip", "path", "status", "method", "agent", "referer", "range", "hour", "time",
    "minute", "name",
];

/// Keys that may carry the count of an object-shaped series item
const VALUE_KEYS: &[&str] = &["count", "value", "n"];

/// One `(label, count)` point of a statistics series
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pair {
    pub label: String,
    pub value: u64,
}

impl Pair {
    pub fn new(label: impl Into<String>, value: u64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }

    /// Normalize either `[label, count]` or `{<label key>: .., count: ..}`.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self {
                label: label_of(items.first()),
                value: count_of(items.get(1)),
            },
            Value::Object(map) => Self {
                label: label_of(LABEL_KEYS.iter().find_map(|k| map.get(*k))),
                value: count_of(VALUE_KEYS.iter().find_map(|k| map.get(*k))),
            },
            _ => Self::new("Unknown", 0),
        }
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Pair::from_value(&value))
    }
}

fn label_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "Unknown".to_string(),
    }
}

fn count_of(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Treat an explicit `null` like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a number, a numeric string, or nothing.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(number.and_then(|n| T::try_from(n).ok()))
}

/// Non-empty string, otherwise `None`
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Complete statistics payload from `/api/stats`. Each one replaces the last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default, deserialize_with = "lenient_string")]
    pub latest_time: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub new_entries: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub total_entries: u64,
    #[serde(default, deserialize_with = "nullable")]
    pub rpm: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub top_ips: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub top_paths: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub status: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub methods: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub top_user_agents: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub top_referers: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub size_distribution: Vec<Pair>,
    #[serde(default, deserialize_with = "nullable")]
    pub hourly: Vec<Pair>,
}

impl StatsSnapshot {
    /// Value of the total counter, falling back to `new_entries`
    pub fn display_total(&self) -> u64 {
        if self.total_entries > 0 {
            self.total_entries
        } else {
            self.new_entries
        }
    }
}

/// One access log record. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ident: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub method: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub status: Option<u16>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub referer: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub agent: Option<String>,
}

/// One page of `/api/logs`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPage {
    #[serde(default, deserialize_with = "nullable")]
    pub logs: Vec<LogEntry>,
    #[serde(default = "first_page", deserialize_with = "page_number")]
    pub page: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub pages: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub total: u64,
    #[serde(default)]
    pub filters: LogFilterSet,
}

fn first_page() -> u32 {
    1
}

fn page_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    Ok(lenient_number::<D, u32>(deserializer)?.unwrap_or(1))
}

impl Default for LogPage {
    fn default() -> Self {
        Self {
            logs: Vec::new(),
            page: 1,
            pages: 0,
            total: 0,
            filters: LogFilterSet::default(),
        }
    }
}

impl LogPage {
    /// Page count for display; an empty result still has one page.
    pub fn page_count(&self) -> u32 {
        self.pages.max(1)
    }
}

/// Response of `/api/sync`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    #[serde(default, deserialize_with = "nullable")]
    pub success: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub count: u64,
    #[serde(default)]
    pub message: Option<String>,
}

impl SyncResult {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn has_new_entries(&self) -> bool {
        self.success && self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FilterKey;

    #[test]
    fn test_pair_accepts_tuple_and_object() {
        let pairs: Vec<Pair> = serde_json::from_str(
            r#"[["GET", 12], {"method": "POST", "count": 3}, [404, "7"], {"ip": "1.2.3.4"}, "junk"]"#,
        )
        .unwrap();

        assert_eq!(pairs[0], Pair::new("GET", 12));
        assert_eq!(pairs[1], Pair::new("POST", 3));
        assert_eq!(pairs[2], Pair::new("404", 7));
        assert_eq!(pairs[3], Pair::new("1.2.3.4", 0));
        assert_eq!(pairs[4], Pair::new("Unknown", 0));
    }

    #[test]
    fn test_snapshot_tolerates_missing_and_null() {
        let snapshot: StatsSnapshot = serde_json::from_str(
            r#"{"rpm": null, "top_ips": [["10.0.0.1", 4]], "latest_time": null, "total_entries": 9}"#,
        )
        .unwrap();

        assert!(snapshot.rpm.is_empty());
        assert!(snapshot.methods.is_empty());
        assert_eq!(snapshot.top_ips.len(), 1);
        assert_eq!(snapshot.latest_time, None);
        assert_eq!(snapshot.display_total(), 9);
    }

    #[test]
    fn test_display_total_falls_back_to_new_entries() {
        let snapshot = StatsSnapshot {
            new_entries: 4,
            ..Default::default()
        };
        assert_eq!(snapshot.display_total(), 4);
        assert_eq!(StatsSnapshot::default().display_total(), 0);
    }

    #[test]
    fn test_log_page_decodes_loose_fields() {
        let page: LogPage = serde_json::from_str(
            r#"{
                "logs": [
                    {"time": "2025-12-13T02:00:03", "ip": "1.2.3.4", "status": "404", "size": 512, "agent": ""},
                    {"ip": null, "method": "GET", "size": null}
                ],
                "page": 2,
                "limit": 50,
                "pages": 0,
                "total": 51,
                "filters": {"ip": "", "method": "GET"}
            }"#,
        )
        .unwrap();

        assert_eq!(page.logs[0].status, Some(404));
        assert_eq!(page.logs[0].size, Some(512));
        assert_eq!(page.logs[0].agent, None);
        assert_eq!(page.logs[1].ip, None);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_count(), 1);
        assert_eq!(page.filters.len(), 1);
        assert_eq!(page.filters.get(FilterKey::Method), Some("GET"));
    }

    #[test]
    fn test_log_page_defaults() {
        let page: LogPage = serde_json::from_str("{}").unwrap();
        assert_eq!(page, LogPage::default());
        assert_eq!(page.page, 1);
    }

    #[test]
    fn test_sync_result() {
        let ok: SyncResult = serde_json::from_str(r#"{"success": true, "count": 3, "message": "Synced 3"}"#).unwrap();
        assert!(ok.has_new_entries());

        let none: SyncResult = serde_json::from_str(r#"{"success": true, "count": 0}"#).unwrap();
        assert!(!none.has_new_entries());
        assert!(!SyncResult::failed().has_new_entries());
    }
}

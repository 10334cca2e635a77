//! Filter, pagination and poll state owned by the dashboard controller

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::api::StatsSnapshot;

/// The fixed set of log filter keys accepted by `/api/logs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Ip,
    Ident,
    User,
    Method,
    Path,
    Status,
    SizeMin,
    SizeMax,
    Referer,
    Agent,
}

impl FilterKey {
    pub const ALL: [FilterKey; 10] = [
        FilterKey::Ip,
        FilterKey::Ident,
        FilterKey::User,
        FilterKey::Method,
        FilterKey::Path,
        FilterKey::Status,
        FilterKey::SizeMin,
        FilterKey::SizeMax,
        FilterKey::Referer,
        FilterKey::Agent,
    ];

    /// Query parameter / form field name
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Ip => "ip",
            FilterKey::Ident => "ident",
            FilterKey::User => "user",
            FilterKey::Method => "method",
            FilterKey::Path => "path",
            FilterKey::Status => "status",
            FilterKey::SizeMin => "size_min",
            FilterKey::SizeMax => "size_max",
            FilterKey::Referer => "referer",
            FilterKey::Agent => "agent",
        }
    }

    /// Badge label shown in the active filter bar
    pub fn label(&self) -> &'static str {
        match self {
            FilterKey::Ip => "IP",
            FilterKey::Ident => "Ident",
            FilterKey::User => "User",
            FilterKey::Method => "Method",
            FilterKey::Path => "Path",
            FilterKey::Status => "Status",
            FilterKey::SizeMin | FilterKey::SizeMax => "Size",
            FilterKey::Referer => "Referer",
            FilterKey::Agent => "Agent",
        }
    }

    /// Id of the search form input bound to this key
    pub fn field_id(&self) -> &'static str {
        match self {
            FilterKey::Ip => "searchIp",
            FilterKey::Ident => "searchIdent",
            FilterKey::User => "searchUser",
            FilterKey::Method => "searchMethod",
            FilterKey::Path => "searchPath",
            FilterKey::Status => "searchStatus",
            FilterKey::SizeMin => "searchSizeMin",
            FilterKey::SizeMax => "searchSizeMax",
            FilterKey::Referer => "searchReferer",
            FilterKey::Agent => "searchAgent",
        }
    }

    /// Parse a key name. `size` names the combined size range badge.
    pub fn parse(name: &str) -> Option<Self> {
        if name == "size" {
            return Some(FilterKey::SizeMin);
        }
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    pub fn is_size(&self) -> bool {
        matches!(self, FilterKey::SizeMin | FilterKey::SizeMax)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active log filters. Never holds an empty value, so every entry ends up
/// in the query string and nothing is ever sent as `key=`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogFilterSet(BTreeMap<FilterKey, String>);

impl LogFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw form fields: values are trimmed, blanks and unknown keys dropped.
    pub fn from_raw<I, K, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = Self::new();
        for (key, value) in raw {
            if let Some(key) = FilterKey::ALL.into_iter().find(|k| k.as_str() == key.as_ref()) {
                set.insert(key, value.as_ref());
            }
        }
        set
    }

    /// Set a filter; a blank value removes the key instead.
    pub fn insert(&mut self, key: FilterKey, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value.to_string());
        }
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub fn remove(&mut self, key: FilterKey) -> Option<String> {
        self.0.remove(&key)
    }

    pub fn contains(&self, key: FilterKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    /// Query pairs in the fixed key order
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.clone())).collect()
    }
}

impl<'de> Deserialize<'de> for LogFilterSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FilterVisitor;

        impl<'de> Visitor<'de> for FilterVisitor {
            type Value = LogFilterSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of filter names to values")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(LogFilterSet::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut set = LogFilterSet::new();
                while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                    let Some(key) = FilterKey::ALL.into_iter().find(|k| k.as_str() == key) else {
                        continue;
                    };
                    match value {
                        serde_json::Value::String(s) => set.insert(key, &s),
                        serde_json::Value::Number(n) => set.insert(key, &n.to_string()),
                        _ => {}
                    }
                }
                Ok(set)
            }
        }

        deserializer.deserialize_any(FilterVisitor)
    }
}

/// Search form as submitted: every field a raw, possibly blank string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterForm {
    pub ip: String,
    pub ident: String,
    pub user: String,
    pub method: String,
    pub path: String,
    pub status: String,
    pub size_min: String,
    pub size_max: String,
    pub referer: String,
    pub agent: String,
}

impl FilterForm {
    pub fn fields(&self) -> [(&'static str, &str); 10] {
        [
            ("ip", &self.ip),
            ("ident", &self.ident),
            ("user", &self.user),
            ("method", &self.method),
            ("path", &self.path),
            ("status", &self.status),
            ("size_min", &self.size_min),
            ("size_max", &self.size_max),
            ("referer", &self.referer),
            ("agent", &self.agent),
        ]
    }
}

/// Parameters of one `/api/logs` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogsQuery {
    pub page: u32,
    pub limit: u32,
    pub filters: LogFilterSet,
}

impl LogsQuery {
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        params.extend(self.filters.to_query());
        params
    }
}

/// Which view of the page is visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Dashboard,
    Search,
}

impl Tab {
    /// Anything but `search` selects the dashboard.
    pub fn from_param(value: &str) -> Self {
        match value {
            "search" => Tab::Search,
            _ => Tab::Dashboard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Search => "search",
        }
    }
}

/// Ticket handed out when a logs request starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogsTicket(u64);

/// Page-lifetime poll state
#[derive(Debug, Clone)]
pub struct PollState {
    pub last_update_time: Option<String>,
    pub current_log_page: u32,
    pub log_page_size: u32,
    pub current_filters: LogFilterSet,
    pub auto_refresh_logs: bool,
    pub active_tab: Tab,
    logs_issued: u64,
    logs_applied: u64,
}

impl PollState {
    pub fn new(log_page_size: u32, auto_refresh_logs: bool) -> Self {
        Self {
            last_update_time: None,
            current_log_page: 1,
            log_page_size,
            current_filters: LogFilterSet::new(),
            auto_refresh_logs,
            active_tab: Tab::Dashboard,
            logs_issued: 0,
            logs_applied: 0,
        }
    }

    /// Replace the filter set from a submitted form. Always returns to page 1.
    pub fn apply_filters<I, K, V>(&mut self, raw: I) -> &LogFilterSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.set_filters(LogFilterSet::from_raw(raw));
        &self.current_filters
    }

    pub fn set_filters(&mut self, filters: LogFilterSet) {
        self.current_filters = filters;
        self.current_log_page = 1;
    }

    /// Returns false (and changes nothing) for pages below 1.
    pub fn set_page(&mut self, page: i64) -> bool {
        if page < 1 {
            return false;
        }
        self.current_log_page = u32::try_from(page).unwrap_or(u32::MAX);
        true
    }

    pub fn change_page(&mut self, delta: i64) -> bool {
        self.set_page(i64::from(self.current_log_page) + delta)
    }

    pub fn clear(&mut self) {
        self.set_filters(LogFilterSet::new());
    }

    /// Drop one filter. The size bounds share a badge, so removing either removes both.
    pub fn remove_filter(&mut self, key: FilterKey) {
        let mut filters = self.current_filters.clone();
        if key.is_size() {
            filters.remove(FilterKey::SizeMin);
            filters.remove(FilterKey::SizeMax);
        } else {
            filters.remove(key);
        }
        self.set_filters(filters);
    }

    pub fn logs_query(&self) -> LogsQuery {
        LogsQuery {
            page: self.current_log_page,
            limit: self.log_page_size,
            filters: self.current_filters.clone(),
        }
    }

    pub fn begin_logs_request(&mut self) -> LogsTicket {
        self.logs_issued += 1;
        LogsTicket(self.logs_issued)
    }

    /// Accept a logs response unless a newer request already rendered.
    pub fn accept_logs_response(&mut self, ticket: LogsTicket) -> bool {
        if ticket.0 < self.logs_applied {
            return false;
        }
        self.logs_applied = ticket.0;
        true
    }

    /// Record a stats snapshot; returns whether it counts as new data.
    pub fn record_snapshot(&mut self, snapshot: &StatsSnapshot) -> bool {
        let has_new_data = snapshot.new_entries > 0 || self.last_update_time.is_none();
        if let Some(latest) = &snapshot.latest_time {
            self.last_update_time = Some(latest.clone());
        }
        has_new_data
    }

    pub fn reset_last_update(&mut self) {
        self.last_update_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_filters_drops_blank_fields() {
        let mut state = PollState::new(50, true);
        let filters = state.apply_filters([
            ("ip", "  10.0.0.1 "),
            ("path", ""),
            ("status", "   "),
            ("agent", "curl"),
        ]);

        assert_eq!(filters.len(), 2);
        assert_eq!(filters.get(FilterKey::Ip), Some("10.0.0.1"));
        assert!(!filters.contains(FilterKey::Path));
        assert!(!filters.contains(FilterKey::Status));

        let query = state.logs_query().to_query();
        assert!(query.iter().all(|(_, v)| !v.is_empty()));
        assert!(!query.iter().any(|(k, _)| *k == "path"));
    }

    #[test]
    fn test_unknown_filter_keys_ignored() {
        let set = LogFilterSet::from_raw([("host", "example.com"), ("method", "GET")]);
        assert_eq!(set.to_query(), vec![("method", "GET".to_string())]);
    }

    #[test]
    fn test_changing_filters_resets_page() {
        let mut state = PollState::new(50, true);
        assert!(state.set_page(5));
        assert_eq!(state.current_log_page, 5);

        state.apply_filters([("method", "POST")]);
        assert_eq!(state.current_log_page, 1);

        state.set_page(3);
        state.remove_filter(FilterKey::Method);
        assert_eq!(state.current_log_page, 1);
        assert!(state.current_filters.is_empty());
    }

    #[test]
    fn test_set_page_below_one_is_noop() {
        let mut state = PollState::new(50, true);
        state.set_page(2);
        assert!(!state.set_page(0));
        assert!(!state.set_page(-4));
        assert_eq!(state.current_log_page, 2);

        assert!(state.change_page(-1));
        assert!(!state.change_page(-1));
        assert_eq!(state.current_log_page, 1);
    }

    #[test]
    fn test_clear_resets_filters_and_page() {
        let mut state = PollState::new(25, false);
        state.apply_filters([("ip", "1.2.3.4"), ("user", "bob")]);
        state.set_page(7);
        state.clear();

        assert!(state.current_filters.is_empty());
        assert_eq!(state.current_log_page, 1);
        assert_eq!(state.logs_query().limit, 25);
    }

    #[test]
    fn test_remove_size_filter_clears_both_bounds() {
        let mut state = PollState::new(50, true);
        state.apply_filters([("size_min", "100"), ("size_max", "2000"), ("ip", "::1")]);
        state.remove_filter(FilterKey::parse("size").unwrap());

        assert!(!state.current_filters.contains(FilterKey::SizeMin));
        assert!(!state.current_filters.contains(FilterKey::SizeMax));
        assert!(state.current_filters.contains(FilterKey::Ip));
    }

    #[test]
    fn test_logs_query_order() {
        let mut state = PollState::new(50, true);
        state.apply_filters([("agent", "bot"), ("ip", "1.1.1.1")]);
        state.set_page(2);

        let query = state.logs_query().to_query();
        let keys: Vec<&str> = query.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["page", "limit", "ip", "agent"]);
        assert_eq!(query[0].1, "2");
    }

    #[test]
    fn test_stale_logs_ticket_rejected() {
        let mut state = PollState::new(50, true);
        let first = state.begin_logs_request();
        let second = state.begin_logs_request();

        assert!(state.accept_logs_response(second));
        assert!(!state.accept_logs_response(first));

        let third = state.begin_logs_request();
        assert!(state.accept_logs_response(third));
    }

    #[test]
    fn test_record_snapshot_new_data() {
        let mut state = PollState::new(50, true);
        let mut snapshot = StatsSnapshot {
            latest_time: Some("2025-12-13T02:00:03".to_string()),
            ..Default::default()
        };

        // First snapshot always counts as new
        assert!(state.record_snapshot(&snapshot));
        assert_eq!(state.last_update_time.as_deref(), Some("2025-12-13T02:00:03"));

        assert!(!state.record_snapshot(&snapshot));

        snapshot.new_entries = 3;
        assert!(state.record_snapshot(&snapshot));

        state.reset_last_update();
        snapshot.new_entries = 0;
        assert!(state.record_snapshot(&snapshot));
    }

    #[test]
    fn test_filter_set_deserialize_drops_empty() {
        let set: LogFilterSet = serde_json::from_str(
            r#"{"ip": "", "method": "GET", "status": 404, "size_min": null, "bogus": "x"}"#,
        )
        .unwrap();

        assert_eq!(set.get(FilterKey::Method), Some("GET"));
        assert_eq!(set.get(FilterKey::Status), Some("404"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_filter_form_fields() {
        let form = FilterForm {
            method: "POST".to_string(),
            size_max: " 512 ".to_string(),
            ..Default::default()
        };
        let set = LogFilterSet::from_raw(form.fields());
        assert_eq!(
            set.to_query(),
            vec![("method", "POST".to_string()), ("size_max", "512".to_string())]
        );
        assert_eq!(FilterKey::SizeMax.field_id(), "searchSizeMax");
    }

    #[test]
    fn test_tab_from_param() {
        assert_eq!(Tab::from_param("search"), Tab::Search);
        assert_eq!(Tab::from_param("dashboard"), Tab::Dashboard);
        assert_eq!(Tab::from_param("nope"), Tab::Dashboard);
    }
}

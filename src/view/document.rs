//! In-memory render target
//!
//! The page is a fixed set of anchors. Render functions write into anchor
//! nodes; only nodes whose content actually changed are queued as patches
//! for connected browsers, so re-rendering identical data is free.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Stable anchor ids shared with the page shell
pub mod anchor {
    pub const LOGS_TABLE_BODY: &str = "logsTableBody";
    pub const ACTIVE_FILTERS: &str = "activeFilters";
    pub const PAGE_INFO: &str = "pageInfo";
    pub const PREV_BTN: &str = "prevBtn";
    pub const NEXT_BTN: &str = "nextBtn";
    pub const AUTO_REFRESH_TEXT: &str = "autoRefreshText";

    pub const TOP_IPS: &str = "topIps";
    pub const TOP_PATHS: &str = "topPaths";
    pub const TOP_STATUS_CODES: &str = "topStatusCodes";
    pub const TOTAL_ENTRIES: &str = "totalEntries";
    pub const STATUS_INDICATOR: &str = "statusIndicator";
    pub const ERROR_MESSAGE: &str = "errorMessage";
    pub const LAST_UPDATE: &str = "updateStatus";

    pub const DASHBOARD_TAB: &str = "dashboardTab";
    pub const SEARCH_TAB: &str = "searchTab";
    pub const DASHBOARD_TAB_BTN: &str = "dashboardTabBtn";
    pub const SEARCH_TAB_BTN: &str = "searchTabBtn";

    pub const RPM_CHART: &str = "rpmChart";
    pub const METHOD_CHART: &str = "methodChart";
    pub const STATUS_CHART: &str = "statusChart";
    pub const USER_AGENT_CHART: &str = "userAgentChart";
    pub const REFERER_CHART: &str = "refererChart";
    pub const SIZE_CHART: &str = "sizeChart";
    pub const HOURLY_CHART: &str = "hourlyChart";

    /// Every anchor the dashboard page provides
    pub const ALL: &[&str] = &[
        LOGS_TABLE_BODY,
        ACTIVE_FILTERS,
        PAGE_INFO,
        PREV_BTN,
        NEXT_BTN,
        AUTO_REFRESH_TEXT,
        TOP_IPS,
        TOP_PATHS,
        TOP_STATUS_CODES,
        TOTAL_ENTRIES,
        STATUS_INDICATOR,
        ERROR_MESSAGE,
        LAST_UPDATE,
        DASHBOARD_TAB,
        SEARCH_TAB,
        DASHBOARD_TAB_BTN,
        SEARCH_TAB_BTN,
        RPM_CHART,
        METHOD_CHART,
        STATUS_CHART,
        USER_AGENT_CHART,
        REFERER_CHART,
        SIZE_CHART,
        HOURLY_CHART,
    ];
}

/// Rendered state of one anchor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Node {
    /// Inner HTML, already escaped
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub disabled: bool,
    pub hidden: bool,
    /// Chart.js config of the chart mounted on this anchor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<serde_json::Value>,
}

impl Node {
    pub fn has_class(&self, name: &str) -> bool {
        self.class
            .as_deref()
            .map(|c| c.split_whitespace().any(|part| part == name))
            .unwrap_or(false)
    }
}

/// A changed node, pushed to browsers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Patch {
    pub anchor: String,
    pub node: Node,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: BTreeMap<String, Node>,
    dirty: BTreeSet<String>,
}

impl Document {
    /// Document with the given anchors, all empty
    pub fn with_anchors<'a>(anchors: impl IntoIterator<Item = &'a str>) -> Self {
        let nodes = anchors
            .into_iter()
            .map(|id| (id.to_string(), Node::default()))
            .collect();
        Self {
            nodes,
            dirty: BTreeSet::new(),
        }
    }

    /// The full dashboard page
    pub fn dashboard() -> Self {
        Self::with_anchors(anchor::ALL.iter().copied())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn html(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|n| n.html.as_str())
    }

    pub fn has_class(&self, id: &str, class: &str) -> bool {
        self.nodes.get(id).map(|n| n.has_class(class)).unwrap_or(false)
    }

    /// Edit a node in place. Returns false when the anchor does not exist;
    /// a missing anchor is a skip, not an error.
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut Node)) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };
        let mut next = node.clone();
        edit(&mut next);
        if next != *node {
            *node = next;
            self.dirty.insert(id.to_string());
        }
        true
    }

    pub fn set_html(&mut self, id: &str, html: impl Into<String>) -> bool {
        let html = html.into();
        self.update(id, |n| n.html = html)
    }

    /// Set plain text content (escaped)
    pub fn set_text(&mut self, id: &str, text: &str) -> bool {
        self.set_html(id, html_escape::encode_text(text).into_owned())
    }

    pub fn set_class(&mut self, id: &str, class: impl Into<String>) -> bool {
        let class = class.into();
        self.update(id, |n| n.class = Some(class))
    }

    pub fn set_disabled(&mut self, id: &str, disabled: bool) -> bool {
        self.update(id, |n| n.disabled = disabled)
    }

    pub fn set_hidden(&mut self, id: &str, hidden: bool) -> bool {
        self.update(id, |n| n.hidden = hidden)
    }

    /// Drain the nodes changed since the last call
    pub fn take_patches(&mut self) -> Vec<Patch> {
        let dirty = std::mem::take(&mut self.dirty);
        dirty
            .into_iter()
            .filter_map(|id| {
                let node = self.nodes.get(&id)?.clone();
                Some(Patch { anchor: id, node })
            })
            .collect()
    }

    pub fn has_pending_patches(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Full copy of every node, for the initial paint
    pub fn snapshot(&self) -> BTreeMap<String, Node> {
        self.nodes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_anchor_is_skipped() {
        let mut doc = Document::with_anchors(["a"]);
        assert!(!doc.set_html("missing", "<b>x</b>"));
        assert!(doc.take_patches().is_empty());
    }

    #[test]
    fn test_only_changed_nodes_are_patched() {
        let mut doc = Document::with_anchors(["a", "b"]);
        doc.set_html("a", "one");
        doc.set_html("b", "two");
        assert_eq!(doc.take_patches().len(), 2);

        // Same content again: nothing to push
        doc.set_html("a", "one");
        doc.set_disabled("b", false);
        assert!(!doc.has_pending_patches());

        doc.set_html("a", "uno");
        let patches = doc.take_patches();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].anchor, "a");
        assert_eq!(patches[0].node.html, "uno");
    }

    #[test]
    fn test_set_text_escapes() {
        let mut doc = Document::with_anchors(["a"]);
        doc.set_text("a", "<script>");
        assert_eq!(doc.html("a"), Some("&lt;script&gt;"));
    }

    #[test]
    fn test_has_class() {
        let mut doc = Document::dashboard();
        doc.set_class(anchor::DASHBOARD_TAB, "tab-content active");
        assert!(doc.has_class(anchor::DASHBOARD_TAB, "active"));
        assert!(!doc.has_class(anchor::SEARCH_TAB, "active"));
        assert!(!doc.has_class(anchor::DASHBOARD_TAB, "act"));
    }
}

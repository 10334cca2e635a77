//! Log table, pagination and filter badges

use super::document::{anchor, Document};
use super::format::{escape, escape_attr, format_bytes, format_time, method_class, status_class, PLACEHOLDER};
use crate::api::{LogEntry, LogPage};
use crate::state::{FilterKey, LogFilterSet};

/// Number of columns in the log table
const LOG_COLUMNS: usize = 10;

pub const NO_ENTRIES_TEXT: &str = "No log entries found";

/// Replace the whole table body with one page of logs, then refresh
/// pagination and the filter bar from the same page.
pub fn render_logs(doc: &mut Document, page: &LogPage) {
    let body = if page.logs.is_empty() {
        message_row(NO_ENTRIES_TEXT, false)
    } else {
        page.logs.iter().map(log_row).collect::<String>()
    };
    doc.set_html(anchor::LOGS_TABLE_BODY, body);

    update_pagination(doc, page);
    update_active_filters(doc, &page.filters);
}

/// Replace the table body with an error row
pub fn render_logs_error(doc: &mut Document, message: &str) {
    let text = format!("Error loading logs: {}", message);
    doc.set_html(anchor::LOGS_TABLE_BODY, message_row(&text, true));
}

fn message_row(text: &str, is_error: bool) -> String {
    let class = if is_error { "loading-cell error-cell" } else { "loading-cell" };
    format!(
        r#"<tr><td colspan="{}" class="{}"><span>{}</span></td></tr>"#,
        LOG_COLUMNS,
        class,
        escape(text)
    )
}

fn or_placeholder(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(PLACEHOLDER)
}

/// Cell with a hover title carrying the full text
fn titled_cell(class: &str, value: Option<&str>) -> String {
    let text = or_placeholder(value);
    format!(
        r#"<td class="{}" title="{}">{}</td>"#,
        class,
        escape_attr(text),
        escape(text)
    )
}

fn log_row(entry: &LogEntry) -> String {
    let method = or_placeholder(entry.method.as_deref());
    let status = entry
        .status
        .filter(|s| *s > 0)
        .map(|s| s.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string());

    let mut row = String::from("<tr>");
    row.push_str(&format!(r#"<td class="log-time">{}</td>"#, escape(&format_time(entry.time.as_deref()))));
    row.push_str(&format!(r#"<td class="log-ip">{}</td>"#, escape(or_placeholder(entry.ip.as_deref()))));
    row.push_str(&format!(r#"<td class="log-ident">{}</td>"#, escape(or_placeholder(entry.ident.as_deref()))));
    row.push_str(&format!(r#"<td class="log-user">{}</td>"#, escape(or_placeholder(entry.user.as_deref()))));
    row.push_str(&format!(
        r#"<td><span class="log-method {}">{}</span></td>"#,
        method_class(entry.method.as_deref()),
        escape(method)
    ));
    row.push_str(&titled_cell("log-path", entry.path.as_deref()));
    row.push_str(&format!(
        r#"<td><span class="log-status {}">{}</span></td>"#,
        status_class(entry.status),
        status
    ));
    row.push_str(&format!("<td>{}</td>", format_bytes(entry.size)));
    row.push_str(&titled_cell("log-referer", entry.referer.as_deref()));
    row.push_str(&titled_cell("log-agent", entry.agent.as_deref()));
    row.push_str("</tr>");
    row
}

/// Text of the combined size badge, if either bound is set
pub fn size_badge_text(filters: &LogFilterSet) -> Option<String> {
    match (filters.get(FilterKey::SizeMin), filters.get(FilterKey::SizeMax)) {
        (Some(min), Some(max)) => Some(format!("{} - {}", min, max)),
        (Some(min), None) => Some(format!("≥ {}", min)),
        (None, Some(max)) => Some(format!("≤ {}", max)),
        (None, None) => None,
    }
}

fn badge(label: &str, text: &str, remove_key: &str) -> String {
    format!(
        r#"<span class="filter-badge">{}: {} <span class="remove" data-filter="{}">×</span></span>"#,
        label,
        escape(text),
        remove_key
    )
}

/// One removable badge per active filter; the size bounds share one badge.
pub fn update_active_filters(doc: &mut Document, filters: &LogFilterSet) {
    let mut html = String::new();
    let mut size_done = false;

    for (key, value) in filters.iter() {
        if key.is_size() {
            if size_done {
                continue;
            }
            size_done = true;
            if let Some(text) = size_badge_text(filters) {
                html.push_str(&badge(key.label(), &text, "size"));
            }
            continue;
        }
        html.push_str(&badge(key.label(), value, key.as_str()));
    }

    doc.set_html(anchor::ACTIVE_FILTERS, html);
}

/// Page info text and prev/next enablement
pub fn update_pagination(doc: &mut Document, page: &LogPage) {
    let pages = page.page_count();
    doc.set_text(
        anchor::PAGE_INFO,
        &format!("Page {} of {} (Total: {})", page.page, pages, page.total),
    );

    let at_first = page.page <= 1;
    let at_last = page.page >= pages;
    doc.set_disabled(anchor::PREV_BTN, at_first);
    doc.set_class(anchor::PREV_BTN, if at_first { "page-btn disabled" } else { "page-btn" });
    doc.set_disabled(anchor::NEXT_BTN, at_last);
    doc.set_class(anchor::NEXT_BTN, if at_last { "page-btn disabled" } else { "page-btn" });
}

/// Label of the auto-refresh toggle
pub fn update_auto_refresh_label(doc: &mut Document, enabled: bool) {
    let text = if enabled { "Pause Auto-refresh" } else { "Resume Auto-refresh" };
    doc.set_text(anchor::AUTO_REFRESH_TEXT, text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ip: &str, status: u16) -> LogEntry {
        LogEntry {
            time: Some("2025-12-13T02:00:03".to_string()),
            ip: Some(ip.to_string()),
            method: Some("GET".to_string()),
            path: Some("/index.html".to_string()),
            status: Some(status),
            size: Some(2048),
            ..Default::default()
        }
    }

    fn row_count(html: &str) -> usize {
        html.matches("<tr>").count()
    }

    #[test]
    fn test_empty_page_renders_single_placeholder_row() {
        let mut doc = Document::dashboard();
        let full = LogPage {
            logs: vec![entry("1.1.1.1", 200), entry("2.2.2.2", 404)],
            ..Default::default()
        };
        render_logs(&mut doc, &full);
        assert_eq!(row_count(doc.html(anchor::LOGS_TABLE_BODY).unwrap()), 2);

        render_logs(&mut doc, &LogPage::default());
        let body = doc.html(anchor::LOGS_TABLE_BODY).unwrap();
        assert_eq!(row_count(body), 1);
        assert!(body.contains(NO_ENTRIES_TEXT));
    }

    #[test]
    fn test_row_formatting_and_placeholders() {
        let mut doc = Document::dashboard();
        let page = LogPage {
            logs: vec![entry("10.0.0.1", 503)],
            ..Default::default()
        };
        render_logs(&mut doc, &page);

        let body = doc.html(anchor::LOGS_TABLE_BODY).unwrap();
        assert!(body.contains("2025-12-13 02:00:03"));
        assert!(body.contains("status-5xx"));
        assert!(body.contains("method-get"));
        assert!(body.contains("2.0 KB"));
        assert!(body.contains(r#"<td class="log-ident">-</td>"#));
        assert!(body.contains(r#"<td class="log-agent" title="-">-</td>"#));
    }

    #[test]
    fn test_row_escapes_untrusted_text() {
        let mut doc = Document::dashboard();
        let page = LogPage {
            logs: vec![LogEntry {
                path: Some(r#"/"><script>alert(1)</script>"#.to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        render_logs(&mut doc, &page);

        let body = doc.html(anchor::LOGS_TABLE_BODY).unwrap();
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let mut doc = Document::dashboard();
        let page = LogPage {
            logs: vec![entry("1.1.1.1", 200)],
            page: 1,
            pages: 2,
            total: 60,
            ..Default::default()
        };
        render_logs(&mut doc, &page);
        let first = doc.snapshot();
        doc.take_patches();

        render_logs(&mut doc, &page);
        assert_eq!(doc.snapshot(), first);
        assert!(doc.take_patches().is_empty());
    }

    #[test]
    fn test_pagination_controls() {
        let mut doc = Document::dashboard();

        update_pagination(&mut doc, &LogPage { page: 1, pages: 3, ..Default::default() });
        assert!(doc.node(anchor::PREV_BTN).unwrap().disabled);
        assert!(!doc.node(anchor::NEXT_BTN).unwrap().disabled);

        update_pagination(&mut doc, &LogPage { page: 3, pages: 3, total: 150, ..Default::default() });
        assert!(!doc.node(anchor::PREV_BTN).unwrap().disabled);
        assert!(doc.node(anchor::NEXT_BTN).unwrap().disabled);
        assert_eq!(doc.html(anchor::PAGE_INFO), Some("Page 3 of 3 (Total: 150)"));

        // Missing page count means one page
        update_pagination(&mut doc, &LogPage::default());
        assert!(doc.node(anchor::PREV_BTN).unwrap().disabled);
        assert!(doc.node(anchor::NEXT_BTN).unwrap().disabled);
        assert_eq!(doc.html(anchor::PAGE_INFO), Some("Page 1 of 1 (Total: 0)"));
    }

    #[test]
    fn test_size_badge_text() {
        let both = LogFilterSet::from_raw([("size_min", "100"), ("size_max", "500")]);
        assert_eq!(size_badge_text(&both).as_deref(), Some("100 - 500"));

        let min = LogFilterSet::from_raw([("size_min", "100")]);
        assert_eq!(size_badge_text(&min).as_deref(), Some("≥ 100"));

        let max = LogFilterSet::from_raw([("size_max", "500")]);
        assert_eq!(size_badge_text(&max).as_deref(), Some("≤ 500"));

        assert_eq!(size_badge_text(&LogFilterSet::new()), None);
    }

    #[test]
    fn test_active_filter_badges() {
        let mut doc = Document::dashboard();
        let filters = LogFilterSet::from_raw([
            ("ip", "1.2.3.4"),
            ("size_min", "10"),
            ("size_max", "20"),
            ("agent", "curl"),
        ]);
        update_active_filters(&mut doc, &filters);

        let html = doc.html(anchor::ACTIVE_FILTERS).unwrap();
        assert_eq!(html.matches("filter-badge").count(), 3);
        assert!(html.contains("IP: 1.2.3.4"));
        assert!(html.contains("Size: 10 - 20"));
        assert!(html.contains(r#"data-filter="size""#));
        assert!(html.contains("Agent: curl"));

        update_active_filters(&mut doc, &LogFilterSet::new());
        assert_eq!(doc.html(anchor::ACTIVE_FILTERS), Some(""));
    }

    #[test]
    fn test_error_row() {
        let mut doc = Document::dashboard();
        render_logs_error(&mut doc, "HTTP error! status: 502");
        let body = doc.html(anchor::LOGS_TABLE_BODY).unwrap();
        assert_eq!(row_count(body), 1);
        assert!(body.contains("Error loading logs: HTTP error! status: 502"));
    }
}

//! Statistics fan-out: top lists, counters and charts

use chrono::{DateTime, Local};

use super::document::{anchor, Document};
use super::format::{escape, status_label_class};
use crate::api::{Pair, StatsSnapshot};
use crate::charts::{ChartKind, ChartRegistry};

pub const NO_DATA_TEXT: &str = "No data available";

/// Render a whole snapshot. Each call replaces everything the previous
/// snapshot rendered.
pub fn process_stats_data(doc: &mut Document, charts: &mut ChartRegistry, snapshot: &StatsSnapshot) {
    render_top_list(doc, anchor::TOP_IPS, "ip", &snapshot.top_ips);
    render_top_list(doc, anchor::TOP_PATHS, "path", &snapshot.top_paths);
    render_status_codes(doc, &snapshot.status);
    doc.set_text(anchor::TOTAL_ENTRIES, &snapshot.display_total().to_string());

    render_charts(doc, charts, snapshot);
}

/// Chart part of a snapshot, also used to catch up after a tab switch
pub fn render_charts(doc: &mut Document, charts: &mut ChartRegistry, snapshot: &StatsSnapshot) {
    let series: [(ChartKind, &[Pair]); 7] = [
        (ChartKind::RequestsPerMinute, &snapshot.rpm),
        (ChartKind::Methods, &snapshot.methods),
        (ChartKind::StatusCodes, &snapshot.status),
        (ChartKind::UserAgents, &snapshot.top_user_agents),
        (ChartKind::Referers, &snapshot.top_referers),
        (ChartKind::SizeDistribution, &snapshot.size_distribution),
        (ChartKind::Hourly, &snapshot.hourly),
    ];

    for (kind, data) in series {
        charts.render(doc, kind, data);
    }
}

fn no_data_item() -> String {
    format!(r#"<li class="no-data">{}</li>"#, NO_DATA_TEXT)
}

/// `<li>label count</li>` list, or a single placeholder item
pub fn render_top_list(doc: &mut Document, id: &str, label_class: &str, items: &[Pair]) {
    let html = if items.is_empty() {
        no_data_item()
    } else {
        items
            .iter()
            .map(|p| {
                format!(
                    r#"<li><span class="{}">{}</span> <span class="count">{}</span></li>"#,
                    label_class,
                    escape(&p.label),
                    p.value
                )
            })
            .collect()
    };
    doc.set_html(id, html);
}

/// Status code list, most frequent first
pub fn render_status_codes(doc: &mut Document, items: &[Pair]) {
    let mut sorted = items.to_vec();
    sorted.sort_by(|a, b| b.value.cmp(&a.value));

    let html = if sorted.is_empty() {
        no_data_item()
    } else {
        sorted
            .iter()
            .map(|p| {
                format!(
                    r#"<li><span class="status-code {}">{}</span> <span class="count">{}</span></li>"#,
                    status_label_class(&p.label),
                    escape(&p.label),
                    p.value
                )
            })
            .collect()
    };
    doc.set_html(anchor::TOP_STATUS_CODES, html);
}

/// Live/Idle badge
pub fn update_status_indicator(doc: &mut Document, has_new_data: bool) {
    let (text, class) = if has_new_data {
        ("Live", "status-badge status-live")
    } else {
        ("Idle", "status-badge status-idle")
    };
    doc.set_html(anchor::STATUS_INDICATOR, format!(r#"<span class="status-text">{}</span>"#, text));
    doc.set_class(anchor::STATUS_INDICATOR, class);
}

pub fn update_last_update(doc: &mut Document, at: DateTime<Local>) {
    doc.set_text(anchor::LAST_UPDATE, &format!("Last update: {}", at.format("%H:%M:%S")));
}

pub fn show_stats_error(doc: &mut Document, message: &str) {
    doc.set_text(anchor::ERROR_MESSAGE, &format!("Error loading stats: {}", message));
    doc.set_hidden(anchor::ERROR_MESSAGE, false);
}

pub fn clear_stats_error(doc: &mut Document) {
    doc.set_html(anchor::ERROR_MESSAGE, "");
    doc.set_hidden(anchor::ERROR_MESSAGE, true);
}

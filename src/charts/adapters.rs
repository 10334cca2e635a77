//! Series → chart config, one builder per chart kind

use serde::Serialize;
use serde_json::{json, Value};

use crate::api::Pair;
use crate::view::format::parse_timestamp;

/// Longest agent/referer label shown on an axis
pub const MAX_LABEL_LEN: usize = 50;

/// Display order of the size distribution buckets
pub const SIZE_BUCKETS: [&str; 5] = ["< 1 KB", "1-10 KB", "10-100 KB", "100 KB - 1 MB", "> 1 MB"];

const SIZE_COLORS: [&str; 5] = [
    "rgba(16, 185, 129, 0.8)",
    "rgba(59, 130, 246, 0.8)",
    "rgba(245, 158, 11, 0.8)",
    "rgba(239, 68, 68, 0.8)",
    "rgba(139, 92, 246, 0.8)",
];

const GRAY: &str = "rgba(148, 163, 184, 0.8)";
const INDIGO: &str = "rgba(99, 102, 241, 0.8)";
const VIOLET: &str = "rgba(139, 92, 246, 0.8)";
const TEAL: &str = "rgb(75, 192, 192)";

/// Chart.js chart description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    pub data: ChartData,
    pub options: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    /// Untruncated labels, for tooltips
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_labels: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub data: Vec<u64>,
    pub background_color: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Value>,
    pub border_width: u32,
}

impl ChartConfig {
    pub fn labels(&self) -> &[String] {
        &self.data.labels
    }

    pub fn values(&self) -> &[u64] {
        self.data.datasets.first().map(|d| d.data.as_slice()).unwrap_or(&[])
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Shorten a label for display, keeping the first 50 characters
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_LEN {
        let head: String = label.chars().take(MAX_LABEL_LEN).collect();
        format!("{}...", head)
    } else {
        label.to_string()
    }
}

/// Format a timestamp label as local `HH:MM`; if it does not parse, fall back
/// to a slice of the raw string, then the raw string.
fn time_label(raw: &str, fallback: std::ops::Range<usize>) -> String {
    if let Some(dt) = parse_timestamp(raw) {
        return dt.format("%H:%M").to_string();
    }
    raw.get(fallback)
        .filter(|s| !s.is_empty())
        .unwrap_or(raw)
        .to_string()
}

pub fn minute_label(raw: &str) -> String {
    time_label(raw, 11..16)
}

pub fn hour_label(raw: &str) -> String {
    time_label(raw, 11..13)
}

pub fn method_color(method: &str) -> &'static str {
    match method {
        "GET" => "rgba(59, 130, 246, 0.8)",
        "POST" => "rgba(16, 185, 129, 0.8)",
        "PUT" => "rgba(245, 158, 11, 0.8)",
        "DELETE" => "rgba(239, 68, 68, 0.8)",
        "PATCH" => "rgba(139, 92, 246, 0.8)",
        "HEAD" => "rgba(99, 102, 241, 0.8)",
        "OPTIONS" => "rgba(236, 72, 153, 0.8)",
        _ => GRAY,
    }
}

pub fn status_color(status: &str) -> &'static str {
    match status.trim().parse::<u16>() {
        Ok(200..=299) => "rgba(16, 185, 129, 0.8)",
        Ok(300..=399) => "rgba(59, 130, 246, 0.8)",
        Ok(400..=499) => "rgba(245, 158, 11, 0.8)",
        Ok(code) if code >= 500 => "rgba(239, 68, 68, 0.8)",
        _ => GRAY,
    }
}

/// Size series in the fixed bucket order; absent buckets count zero.
pub fn size_buckets(series: &[Pair]) -> Vec<Pair> {
    SIZE_BUCKETS
        .iter()
        .map(|bucket| {
            let value = series
                .iter()
                .find(|p| p.label == *bucket)
                .map(|p| p.value)
                .unwrap_or(0);
            Pair::new(*bucket, value)
        })
        .collect()
}

fn opaque(color: &str) -> String {
    color.replace("0.8)", "1)")
}

fn bar_scales() -> Value {
    json!({
        "x": { "beginAtZero": true },
        "y": { "beginAtZero": true }
    })
}

fn share_tooltip_options() -> Value {
    json!({
        "responsive": true,
        "maintainAspectRatio": true,
        "plugins": {
            "legend": { "position": "bottom", "labels": { "padding": 15 } },
            "tooltip": { "callbacks": { "label": "share" } }
        }
    })
}

fn values(series: &[Pair]) -> Vec<u64> {
    series.iter().map(|p| p.value).collect()
}

/// Requests per minute line chart. An empty series becomes one `No data` point.
pub fn requests_per_minute(series: &[Pair]) -> ChartConfig {
    let (labels, data) = if series.is_empty() {
        (vec!["No data".to_string()], vec![0])
    } else {
        (series.iter().map(|p| minute_label(&p.label)).collect(), values(series))
    };

    ChartConfig {
        chart_type: "line",
        data: ChartData {
            labels,
            datasets: vec![Dataset {
                label: Some("Requests per Minute".to_string()),
                data,
                background_color: json!("rgba(75, 192, 192, 0.2)"),
                border_color: Some(json!(TEAL)),
                border_width: 2,
            }],
            full_labels: None,
        },
        options: json!({
            "responsive": true,
            "maintainAspectRatio": true,
            "animation": { "duration": 0 },
            "elements": { "line": { "fill": true, "tension": 0.1 }, "point": { "radius": 4, "hoverRadius": 6 } },
            "scales": {
                "y": { "beginAtZero": true, "title": { "display": true, "text": "Requests" }, "ticks": { "stepSize": 1 } },
                "x": { "title": { "display": true, "text": "Time (minute)" } }
            },
            "plugins": {
                "legend": { "display": true, "position": "top" },
                "tooltip": { "mode": "index", "intersect": false }
            },
            "interaction": { "mode": "nearest", "axis": "x", "intersect": false }
        }),
    }
}

/// Doughnut of request methods
pub fn method_distribution(series: &[Pair]) -> ChartConfig {
    let labels: Vec<String> = series.iter().map(|p| p.label.clone()).collect();
    let colors: Vec<&str> = labels.iter().map(|m| method_color(m)).collect();

    ChartConfig {
        chart_type: "doughnut",
        data: ChartData {
            labels,
            datasets: vec![Dataset {
                label: None,
                data: values(series),
                background_color: json!(colors),
                border_color: None,
                border_width: 2,
            }],
            full_labels: None,
        },
        options: share_tooltip_options(),
    }
}

/// Pie of status codes
pub fn status_codes(series: &[Pair]) -> ChartConfig {
    let labels: Vec<String> = series.iter().map(|p| p.label.clone()).collect();
    let colors: Vec<&str> = labels.iter().map(|s| status_color(s)).collect();

    ChartConfig {
        chart_type: "pie",
        data: ChartData {
            labels,
            datasets: vec![Dataset {
                label: None,
                data: values(series),
                background_color: json!(colors),
                border_color: None,
                border_width: 2,
            }],
            full_labels: None,
        },
        options: share_tooltip_options(),
    }
}

/// Horizontal bar with truncated labels and the full text kept for tooltips
fn horizontal_bar(series: &[Pair], color: &str) -> ChartConfig {
    ChartConfig {
        chart_type: "bar",
        data: ChartData {
            labels: series.iter().map(|p| truncate_label(&p.label)).collect(),
            datasets: vec![Dataset {
                label: Some("Requests".to_string()),
                data: values(series),
                background_color: json!(color),
                border_color: Some(json!(opaque(color))),
                border_width: 1,
            }],
            full_labels: Some(series.iter().map(|p| p.label.clone()).collect()),
        },
        options: json!({
            "responsive": true,
            "maintainAspectRatio": true,
            "indexAxis": "y",
            "scales": bar_scales(),
            "plugins": {
                "legend": { "display": false },
                "tooltip": { "callbacks": { "title": "fullLabel" } }
            }
        }),
    }
}

pub fn top_user_agents(series: &[Pair]) -> ChartConfig {
    horizontal_bar(series, INDIGO)
}

pub fn top_referers(series: &[Pair]) -> ChartConfig {
    horizontal_bar(series, VIOLET)
}

/// Vertical bar over the five fixed size buckets
pub fn size_distribution(series: &[Pair]) -> ChartConfig {
    let buckets = size_buckets(series);

    ChartConfig {
        chart_type: "bar",
        data: ChartData {
            labels: buckets.iter().map(|p| p.label.clone()).collect(),
            datasets: vec![Dataset {
                label: Some("Requests".to_string()),
                data: values(&buckets),
                background_color: json!(SIZE_COLORS),
                border_color: Some(json!(SIZE_COLORS.iter().map(|c| opaque(c)).collect::<Vec<_>>())),
                border_width: 1,
            }],
            full_labels: None,
        },
        options: json!({
            "responsive": true,
            "maintainAspectRatio": true,
            "scales": bar_scales(),
            "plugins": { "legend": { "display": false } }
        }),
    }
}

/// Vertical bar of requests per hour
pub fn hourly_distribution(series: &[Pair]) -> ChartConfig {
    ChartConfig {
        chart_type: "bar",
        data: ChartData {
            labels: series.iter().map(|p| hour_label(&p.label)).collect(),
            datasets: vec![Dataset {
                label: Some("Requests per Hour".to_string()),
                data: values(series),
                background_color: json!(INDIGO),
                border_color: Some(json!(opaque(INDIGO))),
                border_width: 1,
            }],
            full_labels: None,
        },
        options: json!({
            "responsive": true,
            "maintainAspectRatio": true,
            "scales": bar_scales(),
            "plugins": { "legend": { "display": false } }
        }),
    }
}

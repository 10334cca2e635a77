//! Display formatting helpers

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Placeholder for any missing value
pub const PLACEHOLDER: &str = "-";

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Human readable byte count. Zero and unknown sizes render as `-`.
pub fn format_bytes(bytes: Option<u64>) -> String {
    match bytes {
        None | Some(0) => PLACEHOLDER.to_string(),
        Some(b) if b < KB => format!("{} B", b),
        Some(b) if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
        Some(b) => format!("{:.1} MB", b as f64 / MB as f64),
    }
}

/// Parse a server timestamp into local time.
///
/// Offset-aware RFC 3339 strings are converted to the local zone; naive ISO
/// strings (what the log API emits) are taken as local already.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local.from_local_datetime(&naive).earliest()
}

/// Local date and time of a log record; unparseable values are shown as-is.
pub fn format_time(raw: Option<&str>) -> String {
    match raw {
        None | Some("") => PLACEHOLDER.to_string(),
        Some(s) => parse_timestamp(s)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| s.to_string()),
    }
}

/// `status-4xx` style class from the leading digit
pub fn status_class(status: Option<u16>) -> String {
    match status {
        None | Some(0) => String::new(),
        Some(code) => format!("status-{}xx", code / 100),
    }
}

/// Class for a status code given as a label (status code list)
pub fn status_label_class(label: &str) -> &'static str {
    match label.trim().parse::<u16>() {
        Ok(200..=299) => "status-2xx",
        Ok(300..=399) => "status-3xx",
        Ok(400..=499) => "status-4xx",
        Ok(code) if code >= 500 => "status-5xx",
        _ => "",
    }
}

/// `method-get` style class
pub fn method_class(method: Option<&str>) -> String {
    match method {
        None | Some("") => String::new(),
        Some(m) => format!("method-{}", m.to_lowercase()),
    }
}

pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

pub fn escape_attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

// src/calendar/mod.rs
pub mod cache;
pub mod fetcher;
pub mod filter;
pub mod types;

use chrono::DateTime;
use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::calendar::types::{EconomicEvent, Impact};

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "calendar_fetch_total",
            "Feed fetch attempts, labelled by outcome."
        );
        describe_counter!(
            "calendar_records_dropped_total",
            "Feed records dropped for missing title or bad date."
        );
        describe_gauge!(
            "calendar_snapshot_events",
            "Number of events in the last fetched snapshot."
        );
    });
}

/// Feed record as delivered by the remote endpoint. Extra fields are ignored;
/// numbers and booleans are kept as text, other non-string values read as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub impact: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub forecast: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub previous: Option<String>,
}

fn lenient_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// Normalize a title: decode HTML entities, collapse whitespace.
pub fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Project a raw record onto the event model.
/// Returns `None` when the title is empty or the date doesn't parse.
pub fn project_record(raw: RawRecord) -> Option<EconomicEvent> {
    let title = normalize_title(raw.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let date = DateTime::parse_from_rfc3339(raw.date.as_deref()?.trim()).ok()?;

    Some(EconomicEvent {
        title,
        country: raw
            .country
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase(),
        date,
        impact: Impact::from(raw.impact.unwrap_or_default()),
        forecast: non_empty(raw.forecast),
        previous: non_empty(raw.previous),
    })
}

/// Project a batch, preserving order. Returns (events, dropped_count).
pub fn project_records(raw: Vec<RawRecord>) -> (Vec<EconomicEvent>, usize) {
    let mut out = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;
    for r in raw {
        match project_record(r) {
            Some(ev) => out.push(ev),
            None => dropped += 1,
        }
    }
    (out, dropped)
}

/// Project a decoded JSON array record by record; entries that are not
/// objects count as dropped like any other malformed record.
pub fn project_values(values: Vec<Value>) -> (Vec<EconomicEvent>, usize) {
    let total = values.len();
    let raw: Vec<RawRecord> = values
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    let not_objects = total - raw.len();
    let (events, dropped) = project_records(raw);
    (events, dropped + not_objects)
}

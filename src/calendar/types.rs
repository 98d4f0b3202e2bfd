// src/calendar/types.rs
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Impact rating as published by the feed.
/// Unknown labels are kept verbatim so a cache round-trip stays lossless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Impact {
    High,
    Medium,
    Low,
    Holiday,
    Other(String),
}

impl Impact {
    pub fn as_str(&self) -> &str {
        match self {
            Impact::High => "High",
            Impact::Medium => "Medium",
            Impact::Low => "Low",
            Impact::Holiday => "Holiday",
            Impact::Other(s) => s.as_str(),
        }
    }
}

impl From<String> for Impact {
    fn from(s: String) -> Self {
        match s.trim() {
            "High" => Impact::High,
            "Medium" => Impact::Medium,
            "Low" => Impact::Low,
            "Holiday" => Impact::Holiday,
            _ => Impact::Other(s),
        }
    }
}

impl From<Impact> for String {
    fn from(i: Impact) -> Self {
        match i {
            Impact::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calendar entry. `date` keeps the feed's own UTC offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicEvent {
    pub title: String,
    pub country: String,
    pub date: DateTime<FixedOffset>,
    pub impact: Impact,
    #[serde(default)]
    pub forecast: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

/// Full event list from one successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub events: Vec<EconomicEvent>,
    pub fetched_at: DateTime<Utc>,
}

impl FeedSnapshot {
    pub fn new(events: Vec<EconomicEvent>, fetched_at: DateTime<Utc>) -> Self {
        Self { events, fetched_at }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_impact_survives_serde() {
        let json = r#""Non-Economic""#;
        let i: Impact = serde_json::from_str(json).unwrap();
        assert_eq!(i, Impact::Other("Non-Economic".into()));
        assert_eq!(serde_json::to_string(&i).unwrap(), json);
    }

    #[test]
    fn known_impacts_map_to_variants() {
        assert_eq!(Impact::from("High".to_string()), Impact::High);
        assert_eq!(Impact::from("Medium".to_string()), Impact::Medium);
        assert_eq!(Impact::from("Low".to_string()), Impact::Low);
        assert_eq!(Impact::from("Holiday".to_string()), Impact::Holiday);
    }
}

// src/render.rs
//! Turns filtered events into chat-sized text blocks.

use chrono::{FixedOffset, Offset, Utc};

use crate::calendar::filter::Window;
use crate::calendar::types::{EconomicEvent, Impact};

/// Discord's per-message character limit.
pub const MAX_BLOCK_LEN: usize = 2000;

/// Display offset used when none is configured (UTC+3).
pub const DEFAULT_DISPLAY_OFFSET_HOURS: i32 = 3;

pub fn header(window: Window) -> &'static str {
    match window {
        Window::Today => "Today's Medium and High impact events:\n",
        Window::CurrentWeek | Window::Snapshot => "This Week's Medium and High impact events:\n",
    }
}

pub fn empty_message(window: Window) -> &'static str {
    match window {
        Window::Today => "No Medium or High impact events found for today.",
        Window::CurrentWeek | Window::Snapshot => {
            "No Medium or High impact events found for this week."
        }
    }
}

pub fn impact_glyph(impact: &Impact) -> &'static str {
    match impact {
        Impact::High => "🔴",
        _ => "🟠",
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    display_offset: FixedOffset,
    max_block_len: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_OFFSET_HOURS, MAX_BLOCK_LEN)
    }
}

impl Renderer {
    /// Out-of-range offsets fall back to UTC; a zero block length to `MAX_BLOCK_LEN`.
    pub fn new(display_offset_hours: i32, max_block_len: usize) -> Self {
        let display_offset = display_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        let max_block_len = if max_block_len == 0 {
            MAX_BLOCK_LEN
        } else {
            max_block_len
        };
        Self {
            display_offset,
            max_block_len,
        }
    }

    pub fn max_block_len(&self) -> usize {
        self.max_block_len
    }

    pub fn render_line(&self, ev: &EconomicEvent, window: Window) -> String {
        let shown = ev.date.with_timezone(&self.display_offset);
        let time = shown.format("%H:%M");
        let glyph = impact_glyph(&ev.impact);
        match window {
            Window::Today => format!(
                "- **{}** at **{}** ({}):\n  Impact: {} {}\n\n",
                ev.title, time, ev.country, glyph, ev.impact
            ),
            Window::CurrentWeek | Window::Snapshot => format!(
                "- **{}** on **{}** at **{}** ({}):\n  Impact: {} {}\n\n",
                ev.title,
                shown.format("%A, %B %-d, %Y"),
                time,
                ev.country,
                glyph,
                ev.impact
            ),
        }
    }

    /// Render `events` into blocks no longer than `max_block_len` chars.
    /// An empty list yields exactly one "no events" block.
    pub fn render(&self, events: &[EconomicEvent], window: Window) -> Vec<String> {
        if events.is_empty() {
            return vec![empty_message(window).to_string()];
        }
        let lines: Vec<String> = events.iter().map(|e| self.render_line(e, window)).collect();
        chunk_lines(header(window), &lines, self.max_block_len)
    }
}

/// Greedy linear packing: `header` opens the first block, each line is
/// appended while it fits, otherwise the block is sealed and the line starts
/// the next one. Lines longer than `max` are cut at char boundaries.
/// Lengths are counted in chars.
pub fn chunk_lines(header: &str, lines: &[String], max: usize) -> Vec<String> {
    let max = max.max(1);
    let mut blocks = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    let pieces = std::iter::once(header)
        .chain(lines.iter().map(String::as_str))
        .flat_map(|s| split_at_chars(s, max));

    for piece in pieces {
        let n = piece.chars().count();
        if buf_len + n > max && !buf.is_empty() {
            blocks.push(std::mem::take(&mut buf));
            buf_len = 0;
        }
        buf.push_str(piece);
        buf_len += n;
    }
    if !buf.is_empty() {
        blocks.push(buf);
    }
    blocks
}

fn split_at_chars(s: &str, max: usize) -> Vec<&str> {
    if s.chars().count() <= max {
        return vec![s];
    }
    let mut out = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(max)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(cut);
        out.push(head);
        rest = tail;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn ev(title: &str, impact: Impact) -> EconomicEvent {
        EconomicEvent {
            title: title.into(),
            country: "USD".into(),
            date: DateTime::parse_from_rfc3339("2025-09-10T08:30:00-04:00").unwrap(),
            impact,
            forecast: None,
            previous: None,
        }
    }

    #[test]
    fn today_line_uses_display_offset() {
        let r = Renderer::default();
        let line = r.render_line(&ev("CPI m/m", Impact::High), Window::Today);
        // 08:30 at -04:00 is 12:30 UTC, 15:30 at +03:00
        assert_eq!(line, "- **CPI m/m** at **15:30** (USD):\n  Impact: 🔴 High\n\n");
    }

    #[test]
    fn week_line_has_long_date_and_medium_glyph() {
        let r = Renderer::default();
        let line = r.render_line(&ev("ISM PMI", Impact::Medium), Window::CurrentWeek);
        assert_eq!(
            line,
            "- **ISM PMI** on **Wednesday, September 10, 2025** at **15:30** (USD):\n  Impact: 🟠 Medium\n\n"
        );
    }

    #[test]
    fn empty_input_gives_single_notice() {
        let r = Renderer::default();
        assert_eq!(
            r.render(&[], Window::Today),
            vec!["No Medium or High impact events found for today.".to_string()]
        );
        assert_eq!(r.render(&[], Window::CurrentWeek).len(), 1);
    }

    #[test]
    fn header_only_on_first_block() {
        let lines: Vec<String> = (0..10).map(|i| format!("line-{i:02}\n")).collect();
        let blocks = chunk_lines("H:\n", &lines, 20);
        assert!(blocks[0].starts_with("H:\n"));
        assert!(blocks[1..].iter().all(|b| !b.contains("H:")));
        assert!(blocks.iter().all(|b| b.chars().count() <= 20));
        assert_eq!(blocks.concat(), format!("H:\n{}", lines.concat()));
    }

    #[test]
    fn oversized_line_is_split() {
        let long = "x".repeat(45);
        let blocks = chunk_lines("H\n", &[long.clone()], 20);
        assert!(blocks.iter().all(|b| b.chars().count() <= 20));
        assert_eq!(blocks.concat(), format!("H\n{long}"));
    }

    #[test]
    fn multibyte_chars_count_once() {
        let lines = vec!["🔴🔴🔴\n".to_string(), "🟠🟠🟠\n".to_string()];
        let blocks = chunk_lines("", &lines, 8);
        assert_eq!(blocks, vec!["🔴🔴🔴\n🟠🟠🟠\n".to_string()]);
    }

    #[test]
    fn absurd_offset_falls_back_to_utc() {
        for hours in [i32::MAX, i32::MIN, 30] {
            let r = Renderer::new(hours, MAX_BLOCK_LEN);
            let line = r.render_line(&ev("CPI m/m", Impact::High), Window::Today);
            assert!(line.contains("at **12:30**"), "{hours}: {line}");
        }
    }
}

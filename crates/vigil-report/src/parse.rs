//! Tolerant status-page parser.
//!
//! The page shape: one summary block carrying the aggregate counts (and
//! optionally a generation timestamp), followed by zero or more subject
//! cards. A card whose title carries the failure marker becomes a
//! [`FailureRecord`]; cards with the success marker are ignored.
//!
//! ```text
//! <div class="summary"><p>Total: 10</p><p>Success: 8</p></div>
//! <div class="user-card">
//!   <h3>S1 ❌</h3>
//!   <p>Duration: 2s</p>
//!   <pre>timeout</pre>
//! </div>
//! ```
//!
//! Tolerance contract: a malformed individual card is skipped and counted
//! as a warning; only a missing/unlocatable summary block fails the parse.
//! Hand-rolled tag scanning, no HTML crate — the page is machine-generated
//! and the cost of a full DOM is not justified here.
//!
//! Deterministic: output depends on the input bytes alone.

use chrono::{DateTime, Utc};

use vigil_core::error::{Result, VigilError};

use crate::report::{FailureRecord, Report};

const SUMMARY_CLASS: &str = "class=\"summary\"";
const CARD_CLASS: &str = "class=\"user-card\"";
const FAILURE_MARKER: &str = "❌";

/// A parsed report together with the number of cards that were skipped
/// as malformed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReport {
    pub report: Report,
    pub warnings: u32,
}

/// Parse raw page bytes into a report.
pub fn parse(raw: &[u8]) -> Result<ParsedReport> {
    let text = String::from_utf8_lossy(raw);
    let mut warnings = 0u32;

    let summary = find_summary(&text)
        .ok_or_else(|| VigilError::Parse("summary block not found".into()))?;
    let total = labeled_count(summary, "Total:")
        .ok_or_else(|| VigilError::Parse("summary missing total count".into()))?;
    let success_count = labeled_count(summary, "Success:")
        .ok_or_else(|| VigilError::Parse("summary missing success count".into()))?;

    let generated_at = match attr_value(summary, "datetime=\"") {
        Some(ts) => match DateTime::parse_from_rfc3339(ts) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(_) => {
                warnings += 1;
                None
            }
        },
        None => None,
    };

    let mut failures = Vec::new();
    for card in text.split(CARD_CLASS).skip(1) {
        // Each segment runs to the next card (or EOF); the summary never
        // follows a card, so no further trimming is needed.
        let title = match tag_text(card, "h3") {
            Some(t) => t,
            None => {
                warnings += 1;
                continue;
            }
        };
        if !title.contains(FAILURE_MARKER) {
            // Success card, not a malformation.
            continue;
        }
        let subject_id = title
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        let duration = tag_text(card, "p").and_then(|p| p.split(": ").nth(1));
        let detail = tag_text(card, "pre");
        match (subject_id.is_empty(), duration, detail) {
            (false, Some(duration), Some(detail)) => failures.push(FailureRecord {
                subject_id,
                duration: duration.trim().to_string(),
                detail: detail.trim().to_string(),
            }),
            _ => warnings += 1,
        }
    }

    Ok(ParsedReport {
        report: Report {
            generated_at,
            total,
            success_count,
            failures,
        },
        warnings,
    })
}

/// The summary block: from its class marker to the first card marker
/// (or EOF). Good enough for a machine-generated page.
fn find_summary(text: &str) -> Option<&str> {
    let start = text.find(SUMMARY_CLASS)?;
    let rest = &text[start..];
    let end = rest.find(CARD_CLASS).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Extract the integer following a label like "Total:".
fn labeled_count(block: &str, label: &str) -> Option<u32> {
    let after = &block[block.find(label)? + label.len()..];
    let digits: String = after
        .chars()
        .skip_while(|c| c.is_whitespace())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Inner text of the first `<tag ...>...</tag>` in the block.
fn tag_text<'a>(block: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let start = block.find(&open)?;
    let rest = &block[start..];
    let body_start = rest.find('>')? + 1;
    let body_end = rest.find(&close)?;
    if body_end < body_start {
        return None;
    }
    Some(rest[body_start..body_end].trim())
}

/// Value of the first `attr="..."` occurrence.
fn attr_value<'a>(block: &'a str, attr_prefix: &str) -> Option<&'a str> {
    let start = block.find(attr_prefix)? + attr_prefix.len();
    let rest = &block[start..];
    let end = rest.find('"')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(cards: &str) -> String {
        format!(
            "<html><body>\
             <div class=\"summary\"><p>Total: 10</p><p>Success: 8</p></div>\
             {cards}</body></html>"
        )
    }

    fn card(id: &str, mark: &str, duration: &str, detail: &str) -> String {
        format!(
            "<div class=\"user-card\"><h3>{id} {mark}</h3>\
             <p>Duration: {duration}</p><pre>{detail}</pre></div>"
        )
    }

    #[test]
    fn test_worked_example() {
        let cards = format!(
            "{}{}",
            card("S1", "❌", "2s", "timeout"),
            card("S2", "❌", "1s", "auth error")
        );
        let parsed = parse(page(&cards).as_bytes()).unwrap();
        assert_eq!(parsed.warnings, 0);
        let r = parsed.report;
        assert_eq!(r.total, 10);
        assert_eq!(r.success_count, 8);
        assert_eq!(r.failure_count(), 2);
        assert_eq!(r.failures[0].subject_id, "S1");
        assert_eq!(r.failures[0].duration, "2s");
        assert_eq!(r.failures[0].detail, "timeout");
        assert_eq!(r.failures[1].subject_id, "S2");
        assert_eq!(r.failures[1].detail, "auth error");
    }

    #[test]
    fn test_malformed_card_is_warning_not_error() {
        let cards = format!(
            "{}<div class=\"user-card\"><h3>S9 ❌</h3></div>{}",
            card("S1", "❌", "2s", "timeout"),
            card("S2", "❌", "1s", "auth error")
        );
        let parsed = parse(page(&cards).as_bytes()).unwrap();
        assert_eq!(parsed.warnings, 1);
        assert_eq!(parsed.report.failure_count(), 2);
        // Source order survives the skip.
        assert_eq!(parsed.report.failures[0].subject_id, "S1");
        assert_eq!(parsed.report.failures[1].subject_id, "S2");
    }

    #[test]
    fn test_success_cards_are_ignored_silently() {
        let cards = format!(
            "{}{}",
            card("S1", "✅", "1s", "ok"),
            card("S2", "❌", "3s", "dns failure")
        );
        let parsed = parse(page(&cards).as_bytes()).unwrap();
        assert_eq!(parsed.warnings, 0);
        assert_eq!(parsed.report.failure_count(), 1);
        assert_eq!(parsed.report.failures[0].subject_id, "S2");
    }

    #[test]
    fn test_missing_summary_is_fatal() {
        let raw = card("S1", "❌", "2s", "timeout");
        assert!(matches!(
            parse(raw.as_bytes()),
            Err(VigilError::Parse(_))
        ));
    }

    #[test]
    fn test_summary_missing_count_is_fatal() {
        let raw = "<div class=\"summary\"><p>Total: 10</p></div>";
        assert!(matches!(
            parse(raw.as_bytes()),
            Err(VigilError::Parse(_))
        ));
    }

    #[test]
    fn test_generated_at_from_summary() {
        let raw = "<div class=\"summary\">\
                   <time datetime=\"2026-08-30T08:00:00Z\"></time>\
                   <p>Total: 3</p><p>Success: 3</p></div>";
        let parsed = parse(raw.as_bytes()).unwrap();
        let ts = parsed.report.generated_at.unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-08-30T08:00:00+00:00");
    }

    #[test]
    fn test_bad_timestamp_is_warning() {
        let raw = "<div class=\"summary\">\
                   <time datetime=\"yesterday\"></time>\
                   <p>Total: 3</p><p>Success: 3</p></div>";
        let parsed = parse(raw.as_bytes()).unwrap();
        assert!(parsed.report.generated_at.is_none());
        assert_eq!(parsed.warnings, 1);
    }

    #[test]
    fn test_deterministic() {
        let raw = page(&card("S1", "❌", "2s", "timeout"));
        let a = parse(raw.as_bytes()).unwrap();
        let b = parse(raw.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_page_with_summary_only() {
        let parsed = parse(page("").as_bytes()).unwrap();
        assert_eq!(parsed.report.failure_count(), 0);
        assert_eq!(parsed.warnings, 0);
    }
}

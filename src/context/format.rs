//! Section formatting: raw records to bounded, deterministic text blocks.
//!
//! Formatting is pure. Given an identical record set the output is
//! byte-identical, which the budget allocator and the tests both rely on.

use crate::context::budget::estimate_tokens;
use crate::context::{ContextCategory, SectionOrder};
use crate::store::ContextRecord;
use std::collections::HashMap;

/// A rendered context block, immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedSection {
    pub category: ContextCategory,
    pub text: String,
    pub estimated_tokens: usize,
}

/// Render one category's records into a section.
///
/// Returns `None` when nothing renders (no records, or all malformed). A
/// malformed record is skipped; its siblings still render.
pub fn format_section(
    category: ContextCategory,
    records: &[ContextRecord],
) -> Option<FormattedSection> {
    let mut ordered: Vec<&ContextRecord> = records.iter().collect();
    sort_records(category.section_order(), &mut ordered);

    let mut lines = Vec::with_capacity(ordered.len());
    for record in ordered {
        match record_line(category, record) {
            Some(line) => lines.push(line),
            None => {
                tracing::debug!(
                    "Skipping malformed {} record '{}'",
                    category.as_db_str(),
                    record.id
                );
            }
        }
    }

    if lines.is_empty() {
        return None;
    }

    let text = format!("{}\n{}", category.header(), lines.join("\n"));
    let estimated_tokens = estimate_tokens(&text);
    Some(FormattedSection {
        category,
        text,
        estimated_tokens,
    })
}

/// Render every relevant category that has data, in the given category order.
pub fn format_all(
    categories: &[ContextCategory],
    fetched: &HashMap<ContextCategory, Vec<ContextRecord>>,
) -> Vec<FormattedSection> {
    categories
        .iter()
        .filter_map(|category| {
            fetched
                .get(category)
                .and_then(|records| format_section(*category, records))
        })
        .collect()
}

fn sort_records(order: SectionOrder, records: &mut [&ContextRecord]) {
    match order {
        SectionOrder::ChronoDescending => {
            // Newest first; undated records last; id as deterministic tiebreak.
            records.sort_by(|a, b| {
                b.occurred_at
                    .cmp(&a.occurred_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
        SectionOrder::KindThenPriority => {
            records.sort_by(|a, b| {
                sort_key_kind(a)
                    .cmp(sort_key_kind(b))
                    .then_with(|| sort_key_priority(a).cmp(&sort_key_priority(b)))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }
    }
}

fn sort_key_kind(record: &ContextRecord) -> &str {
    // Absent kind groups after every named kind; "~" sorts after ASCII text.
    record.kind.as_deref().unwrap_or("~")
}

fn sort_key_priority(record: &ContextRecord) -> i64 {
    record.priority.unwrap_or(i64::MAX)
}

fn record_line(category: ContextCategory, record: &ContextRecord) -> Option<String> {
    let title = record.title.trim();
    let body = record.body.trim();
    if title.is_empty() && body.is_empty() {
        return None;
    }

    let mut line = if title.is_empty() {
        format!("- {}", body)
    } else if body.is_empty() {
        format!("- {}", title)
    } else {
        format!("- {}: {}", title, body)
    };

    if let Some(progress) = progress_label(record) {
        line.push_str(&format!(" ({})", progress));
    }

    Some(truncate(&line, category.max_record_chars()))
}

/// Progress rendering: a percentage when a non-zero target exists, otherwise
/// the raw current value.
fn progress_label(record: &ContextRecord) -> Option<String> {
    let current = record.current?;
    match record.target {
        Some(target) if target != 0.0 => Some(format!("{:.0}%", current / target * 100.0)),
        _ => Some(format!("{}", current)),
    }
}

fn truncate(input: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in input.chars().enumerate() {
        if idx >= max_chars {
            out.push_str("...");
            break;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn record(id: &str, title: &str, body: &str) -> ContextRecord {
        ContextRecord {
            id: id.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            kind: None,
            priority: None,
            target: None,
            current: None,
            occurred_at: None,
        }
    }

    #[test]
    fn formatting_is_idempotent() {
        let records = vec![
            record("a", "First", "one"),
            record("b", "Second", "two"),
        ];
        let once = format_section(ContextCategory::Principles, &records).unwrap();
        let twice = format_section(ContextCategory::Principles, &records).unwrap();
        assert_eq!(once.text, twice.text);
        assert_eq!(once.estimated_tokens, twice.estimated_tokens);
    }

    #[test]
    fn log_categories_render_newest_first() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut old = record("old", "Older", "entry");
        old.occurred_at = Some(base - Duration::days(3));
        let mut new = record("new", "Newer", "entry");
        new.occurred_at = Some(base);

        let section =
            format_section(ContextCategory::RecentJournal, &[old, new]).unwrap();
        let lines: Vec<&str> = section.text.lines().collect();
        assert_eq!(lines[0], "## Recent Journal");
        assert!(lines[1].starts_with("- Newer"));
        assert!(lines[2].starts_with("- Older"));
    }

    #[test]
    fn reference_categories_group_by_kind_then_priority() {
        let mut a = record("a", "Courage", "act anyway");
        a.kind = Some("character".to_string());
        a.priority = Some(2);
        let mut b = record("b", "Honesty", "tell the truth");
        b.kind = Some("character".to_string());
        b.priority = Some(1);
        let mut c = record("c", "Rest", "stop on time");
        c.kind = Some("body".to_string());
        c.priority = Some(9);

        let section = format_section(ContextCategory::Principles, &[a, b, c]).unwrap();
        let lines: Vec<&str> = section.text.lines().collect();
        assert!(lines[1].starts_with("- Rest"));
        assert!(lines[2].starts_with("- Honesty"));
        assert!(lines[3].starts_with("- Courage"));
    }

    #[test]
    fn long_records_are_truncated_per_category() {
        let long_body = "x".repeat(1000);
        let section =
            format_section(ContextCategory::TasksToday, &[record("t", "Task", &long_body)])
                .unwrap();
        let line = section.text.lines().nth(1).unwrap();
        assert_eq!(line.chars().count(), 80 + 3);
        assert!(line.ends_with("..."));
    }

    #[test]
    fn malformed_record_is_skipped_but_siblings_render() {
        let records = vec![record("bad", "  ", "  "), record("good", "Fine", "renders")];
        let section = format_section(ContextCategory::Plans, &records).unwrap();
        assert_eq!(section.text.lines().count(), 2);
        assert!(section.text.contains("Fine"));
    }

    #[test]
    fn all_malformed_records_yield_no_section() {
        let records = vec![record("bad", "", "")];
        assert!(format_section(ContextCategory::Plans, &records).is_none());
    }

    #[test]
    fn missing_target_reports_raw_current_value() {
        let mut no_target = record("n", "Pushups", "daily");
        no_target.current = Some(43.0);
        let mut with_target = record("w", "Reading", "pages");
        with_target.current = Some(50.0);
        with_target.target = Some(200.0);

        let section = format_section(
            ContextCategory::ProgressSummary,
            &[no_target, with_target],
        )
        .unwrap();
        assert!(section.text.contains("Pushups: daily (43)"));
        assert!(section.text.contains("Reading: pages (25%)"));
    }

    #[test]
    fn empty_input_yields_no_section() {
        assert!(format_section(ContextCategory::Victories, &[]).is_none());
    }
}

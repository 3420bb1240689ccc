//! Behavior summarizer.
//!
//! Formats session aggregates into one sentence. Clause order is fixed:
//! duration, pages, feature usage, outcome.

use crate::events::{Event, EventPayload, EventType};
use crate::limits::SUMMARY_MAX_QUERIES;
use crate::outcome::Outcome;
use crate::session::Session;

/// Summarizes a session.
///
/// `events` is only consulted for enrichments (search queries, editor
/// time); the clauses themselves come from the session aggregates.
pub fn summarize(session: &Session, events: &[Event]) -> String {
    let mut clauses = vec![
        format!("spent {}", format_duration(session_seconds(session, events))),
        format!(
            "visited {} {}",
            session.pages_visited.len(),
            plural(session.pages_visited.len(), "page", "pages")
        ),
    ];

    let flags = &session.flags;
    if flags.browsed_cards {
        clauses.push("browsed greeting cards".to_string());
    }
    if flags.browsed_stickers {
        clauses.push("browsed stickers".to_string());
    }
    if flags.used_search {
        let queries = search_queries(events);
        if queries.is_empty() {
            clauses.push("used search".to_string());
        } else {
            let quoted: Vec<String> = queries.iter().map(|q| format!("\"{}\"", q)).collect();
            clauses.push(format!("searched for {}", quoted.join(" and ")));
        }
    }
    if flags.uploaded_image {
        clauses.push("uploaded an image".to_string());
    }
    if flags.used_editor {
        let editor_ms = editor_time_ms(events);
        if editor_ms >= 1_000 {
            clauses.push(format!(
                "used the editor for about {}",
                format_duration(editor_ms / 1_000)
            ));
        } else {
            clauses.push("used the editor".to_string());
        }
    }
    if flags.reached_checkout {
        clauses.push("reached checkout".to_string());
    }
    if flags.completed_payment {
        clauses.push("completed payment".to_string());
    }

    clauses.push(outcome_clause(session));

    finish_sentence(&clauses.join(", "))
}

fn outcome_clause(session: &Session) -> String {
    match session.effective_outcome() {
        Outcome::PrintedCard => "and successfully printed a greeting card".to_string(),
        Outcome::PrintedSticker => "and successfully printed stickers".to_string(),
        Outcome::SentDigital => "and successfully sent a digital card".to_string(),
        Outcome::Abandoned if session.flags.reached_checkout => {
            "but abandoned at checkout".to_string()
        }
        Outcome::Abandoned => "but left without completing".to_string(),
        Outcome::InProgress => "and is still in progress".to_string(),
    }
}

/// Ended sessions use the recorded duration; active ones span to the last event.
fn session_seconds(session: &Session, events: &[Event]) -> i64 {
    if let Some(seconds) = session.duration_seconds {
        return seconds.max(0);
    }
    events
        .iter()
        .map(|e| e.timestamp)
        .max()
        .map(|last| (last - session.started_at).num_seconds().max(0))
        .unwrap_or(0)
}

/// Up to two distinct queries, in timestamp order.
fn search_queries(events: &[Event]) -> Vec<&str> {
    let mut ordered: Vec<&Event> = events.iter().filter(|e| e.event_type.is_search()).collect();
    ordered.sort_by_key(|e| e.timestamp);

    let mut queries: Vec<&str> = Vec::new();
    for query in ordered.into_iter().filter_map(Event::search_query) {
        if queries.len() == SUMMARY_MAX_QUERIES {
            break;
        }
        if !queries.contains(&query) {
            queries.push(query);
        }
    }
    queries
}

/// Sum of `editDurationMs` over `editor_save` events.
fn editor_time_ms(events: &[Event]) -> i64 {
    events
        .iter()
        .filter(|e| e.event_type == EventType::EditorSave)
        .filter_map(|e| match e.payload() {
            EventPayload::EditorSave {
                edit_duration_ms, ..
            } => edit_duration_ms,
            _ => None,
        })
        .filter(|ms| *ms > 0)
        .sum()
}

fn format_duration(seconds: i64) -> String {
    let minutes = seconds / 60;
    let rest = seconds % 60;
    match (minutes, rest) {
        (0, s) => format!("{} {}", s, plural(s as usize, "second", "seconds")),
        (m, 0) => format!("{} {}", m, plural(m as usize, "minute", "minutes")),
        (m, s) => format!(
            "{} {} {} {}",
            m,
            plural(m as usize, "minute", "minutes"),
            s,
            plural(s as usize, "second", "seconds")
        ),
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

fn finish_sentence(text: &str) -> String {
    let mut chars = text.chars();
    let mut sentence = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    sentence.push('.');
    sentence
}

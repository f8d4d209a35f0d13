//! Single-event iCalendar payloads for "add to calendar" downloads.

use crate::catalog::Event;
use crate::config::CalendarConfig;
use crate::schedule::Schedule;
use chrono::NaiveDateTime;

const MISSING_BROCHURE: &str = "(Not found in brochure)";
const MAX_LINE_OCTETS: usize = 75;

/// Build a VCALENDAR with one VEVENT. Times are floating local times.
pub fn calendar_file(event: &Event, schedule: &Schedule, settings: &CalendarConfig) -> String {
    let brochure = if event.brochure_block.trim().is_empty() {
        MISSING_BROCHURE
    } else {
        event.brochure_block.as_str()
    };
    let description = escape_truncated(brochure, settings.description_limit);

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//Cynosure//EN".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{}@{}", event.key().replace(' ', "-"), settings.uid_domain),
        format!("SUMMARY:{}", escape_text(&event.name)),
    ];
    if let Some(start) = schedule.start {
        lines.push(format!("DTSTART:{}", ics_time(start)));
    }
    if let Some(end) = schedule.end {
        lines.push(format!("DTEND:{}", ics_time(end)));
    }
    if !event.venue.trim().is_empty() {
        lines.push(format!("LOCATION:{}", escape_text(event.venue.trim())));
    }
    lines.push(format!("DESCRIPTION:{}", description));
    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let mut body = String::new();
    for line in &lines {
        body.push_str(&fold_line(line));
        body.push_str("\r\n");
    }
    body
}

/// File name offered for the download
pub fn calendar_file_name(event: &Event) -> String {
    let stem: String = event
        .name
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    format!("{}.ics", stem)
}

fn ics_time(at: NaiveDateTime) -> String {
    at.format("%Y%m%dT%H%M%S").to_string()
}

fn escape_text(text: &str) -> String {
    escape_truncated(text, usize::MAX)
}

/// Escape per RFC 5545 and stop before the escaped text exceeds `limit`
/// characters. An escape sequence is never split.
fn escape_truncated(text: &str, limit: usize) -> String {
    let text = text.replace("\r\n", "\n");
    let mut out = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let piece: &str = match c {
            '\\' => "\\\\",
            ';' => "\\;",
            ',' => "\\,",
            '\n' => "\\n",
            other => other.encode_utf8(&mut buf),
        };
        let width = piece.chars().count();
        if used + width > limit {
            break;
        }
        used += width;
        out.push_str(piece);
    }
    out
}

/// Fold a content line into chunks of at most 75 octets; continuation
/// lines start with a single space, which counts toward their 75.
fn fold_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len() + line.len() / 37);
    let mut budget = MAX_LINE_OCTETS;
    let mut used = 0;
    for c in line.chars() {
        if used + c.len_utf8() > budget {
            out.push_str("\r\n ");
            budget = MAX_LINE_OCTETS - 1;
            used = 0;
        }
        out.push(c);
        used += c.len_utf8();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::FestivalCalendar;

    fn event(brochure: &str) -> Event {
        serde_json::from_value(serde_json::json!({
            "name": "Solo Singing",
            "date": "FRIDAY",
            "time": "10:00 AM to 12:00 PM",
            "venue": "Main Hall",
            "brochure_block": brochure,
        }))
        .unwrap()
    }

    #[test]
    fn test_calendar_file_lines() {
        let ev = event("Age Category: 6th to 8th\nDuration: 3 min, max");
        let sched = FestivalCalendar::default().resolve_event(&ev);
        let ics = calendar_file(&ev, &sched, &CalendarConfig::default());
        let lines: Vec<&str> = ics.split("\r\n").collect();
        assert_eq!(lines[0], "BEGIN:VCALENDAR");
        assert!(lines.contains(&"UID:solo-singing@cynosure"));
        assert!(lines.contains(&"SUMMARY:Solo Singing"));
        assert!(lines.contains(&"DTSTART:20250926T100000"));
        assert!(lines.contains(&"DTEND:20250926T120000"));
        assert!(lines.contains(&"LOCATION:Main Hall"));
        assert!(lines.contains(&"DESCRIPTION:Age Category: 6th to 8th\\nDuration: 3 min\\, max"));
        assert!(ics.ends_with("END:VCALENDAR\r\n"));
    }

    #[test]
    fn test_unknown_schedule_omits_times() {
        let ev = event("");
        let ics = calendar_file(&ev, &Schedule::default(), &CalendarConfig::default());
        assert!(!ics.contains("DTSTART"));
        assert!(!ics.contains("DTEND"));
        assert!(ics.contains("DESCRIPTION:(Not found in brochure)"));
    }

    fn unfold(ics: &str) -> String {
        ics.replace("\r\n ", "")
    }

    #[test]
    fn test_description_truncated_after_escaping() {
        let ev = event(&"a,".repeat(3000));
        let settings = CalendarConfig {
            description_limit: 1800,
            ..Default::default()
        };
        let ics = unfold(&calendar_file(&ev, &Schedule::default(), &settings));
        let desc = ics
            .split("\r\n")
            .find(|l| l.starts_with("DESCRIPTION:"))
            .unwrap()
            .trim_start_matches("DESCRIPTION:");
        // "a" plus an escaped comma is three characters; 1800 fits 600 pairs exactly
        assert_eq!(desc.chars().count(), 1800);
        assert!(desc.ends_with("a\\,"));
    }

    #[test]
    fn test_truncation_never_splits_an_escape() {
        assert_eq!(escape_truncated("ab;c", 3), "ab");
        assert_eq!(escape_truncated("ab;c", 4), "ab\\;");
        assert_eq!(escape_truncated("x\r\ny", 10), "x\\ny");
    }

    #[test]
    fn test_long_lines_folded_at_75_octets() {
        let ev = event(&"é".repeat(400));
        let ics = calendar_file(&ev, &Schedule::default(), &CalendarConfig::default());
        let physical: Vec<&str> = ics.split("\r\n").collect();
        assert!(physical.len() > 10);
        for line in &physical {
            assert!(line.len() <= 75, "{} octets: {}", line.len(), line);
        }
        assert!(physical.iter().skip(1).any(|l| l.starts_with(' ')));
        let desc = unfold(&ics)
            .split("\r\n")
            .find(|l| l.starts_with("DESCRIPTION:"))
            .map(|l| l.to_string())
            .unwrap();
        assert_eq!(desc, format!("DESCRIPTION:{}", "é".repeat(400)));
    }

    #[test]
    fn test_file_name_sanitized() {
        let mut ev = event("");
        ev.name = "Quiz/Debate".into();
        assert_eq!(calendar_file_name(&ev), "Quiz-Debate.ics");
    }
}

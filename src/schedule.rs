//! Free-text date/time resolution against the closed two-day festival calendar.
//!
//! Nothing in here fails: text that cannot be understood resolves to an
//! unknown start or end, and status rendering degrades to "time unknown".

use crate::catalog::Event;
use crate::config::FestivalConfig;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static CLOCK_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:\b(\d{1,2})(?:[:.](\d{2}))?\s*(a\.\s?m\.?|p\.\s?m\.?|am\b|pm\b|noon\b)|\b(noon)\b)",
    )
    .unwrap()
});

/// Grace period after the end during which a participant may still mark completion
const COMPLETION_GRACE_HOURS: i64 = 1;
const REMIND_SOON_MINUTES: i64 = 30;
const REMIND_URGENT_MINUTES: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FestivalDay {
    One,
    Two,
}

#[derive(Debug, Clone)]
pub struct FestivalCalendar {
    pub day_one: NaiveDate,
    pub day_two: NaiveDate,
    pub default_start: NaiveTime,
    pub default_duration: Duration,
}

impl Default for FestivalCalendar {
    fn default() -> Self {
        Self::from(&FestivalConfig::default())
    }
}

impl From<&FestivalConfig> for FestivalCalendar {
    fn from(cfg: &FestivalConfig) -> Self {
        Self {
            day_one: cfg.day_one,
            day_two: cfg.day_two,
            default_start: cfg.default_start,
            default_duration: Duration::minutes(cfg.default_duration_minutes),
        }
    }
}

impl FestivalCalendar {
    pub fn date_of(&self, day: FestivalDay) -> NaiveDate {
        match day {
            FestivalDay::One => self.day_one,
            FestivalDay::Two => self.day_two,
        }
    }

    /// Whether the free-text day field places the event on `day`
    pub fn falls_on(&self, date_text: &str, day: FestivalDay) -> bool {
        let upper = date_text.to_uppercase();
        upper.contains("BOTH") || mentions_date(&upper, self.date_of(day))
    }

    /// Start and end day named by the free-text date field
    pub fn day_span(&self, date_text: &str) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let upper = date_text.to_uppercase();
        if upper.contains("BOTH") {
            return (Some(self.day_one), Some(self.day_two));
        }

        let mut start = None;
        let mut end = None;
        if mentions_date(&upper, self.day_one) {
            start = Some(self.day_one);
        }
        if mentions_date(&upper, self.day_two) {
            if start.is_some() {
                end = Some(self.day_two);
            } else {
                start = Some(self.day_two);
            }
        }
        (start, end)
    }

    pub fn resolve(&self, date_text: &str, time_text: &str) -> Schedule {
        let (start_day, end_day) = self.day_span(date_text);
        let (start_tod, end_tod) = parse_clock_times(time_text);

        let start = start_day.map(|d| d.and_time(start_tod.unwrap_or(self.default_start)));

        let end = match (start, end_day, end_tod) {
            (None, _, _) => None,
            (Some(_), Some(day), Some(t)) => Some(day.and_time(t)),
            (Some(s), None, Some(t)) => Some(s.date().and_time(t)),
            (Some(s), Some(day), None) => Some(day.and_time(s.time()) + self.default_duration),
            (Some(s), None, None) => Some(s + self.default_duration),
        };

        // "9 PM to 1 AM" style ranges cross midnight
        let end = match (start, end) {
            (Some(s), Some(e)) if e < s => Some(e + Duration::days(1)),
            _ => end,
        };

        Schedule { start, end }
    }

    pub fn resolve_event(&self, event: &Event) -> Schedule {
        self.resolve(event.date_text(), &event.time)
    }

    /// Events ordered by start; events with no known start go last, in catalog order
    pub fn timeline<'a>(&self, events: &'a [Event]) -> Vec<(Schedule, &'a Event)> {
        let mut items: Vec<(Schedule, &Event)> = events
            .iter()
            .map(|ev| (self.resolve_event(ev), ev))
            .collect();
        items.sort_by_key(|(sched, _)| (sched.start.is_none(), sched.start));
        items
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MONDAY",
        Weekday::Tue => "TUESDAY",
        Weekday::Wed => "WEDNESDAY",
        Weekday::Thu => "THURSDAY",
        Weekday::Fri => "FRIDAY",
        Weekday::Sat => "SATURDAY",
        Weekday::Sun => "SUNDAY",
    }
}

/// Upper-cased text mentions the weekday name or the day-of-month number
fn mentions_date(upper: &str, date: NaiveDate) -> bool {
    upper.contains(weekday_name(date.weekday())) || contains_number(upper, date.day())
}

/// Finds `n` as a standalone number, so "26" does not match inside "2026"
fn contains_number(text: &str, n: u32) -> bool {
    let needle = n.to_string();
    let bytes = text.as_bytes();
    text.match_indices(&needle).any(|(idx, m)| {
        let before = idx.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(idx + m.len()).copied();
        !before.is_some_and(|b| b.is_ascii_digit()) && !after.is_some_and(|b| b.is_ascii_digit())
    })
}

/// First two 12-hour clock tokens in the text, as (start, end) times of day
pub fn parse_clock_times(time_text: &str) -> (Option<NaiveTime>, Option<NaiveTime>) {
    let mut tokens = CLOCK_TOKEN.captures_iter(time_text).map(|caps| {
        if caps.get(4).is_some() {
            return NaiveTime::from_hms_opt(12, 0, 0);
        }
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let suffix = caps.get(3)?.as_str().to_lowercase();
        to_24h(hour, minute, &suffix)
    });
    let start = tokens.next().flatten();
    let end = tokens.next().flatten();
    (start, end)
}

fn to_24h(hour: u32, minute: u32, suffix: &str) -> Option<NaiveTime> {
    if !(1..=12).contains(&hour) {
        return None;
    }
    let hour = if suffix.starts_with("noon") {
        12
    } else if suffix.starts_with('a') {
        hour % 12
    } else {
        hour % 12 + 12
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Resolved start/end of an event; either side may be unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Schedule {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Whole days, hours and minutes until an event starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
}

impl Countdown {
    pub fn from_duration(delta: Duration) -> Self {
        let total = delta.num_minutes().max(0);
        Self {
            days: total / (24 * 60),
            hours: (total % (24 * 60)) / 60,
            minutes: total % 60,
        }
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.days > 0 {
            write!(f, "{}d {}h {}m", self.days, self.hours, self.minutes)
        } else {
            write!(f, "{}h {}m", self.hours, self.minutes)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    TimeUnknown,
    Upcoming(Countdown),
    Ongoing,
    Completed,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventStatus::TimeUnknown => write!(f, "time unknown"),
            EventStatus::Upcoming(countdown) => write!(f, "starts in {}", countdown),
            EventStatus::Ongoing => write!(f, "ongoing"),
            EventStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reminder {
    /// Starts within 30 minutes
    StartingSoon,
    /// Starts within 10 minutes
    HeadToVenue,
}

impl Schedule {
    /// Status over the half-open interval `[start, end)`
    pub fn status(&self, now: NaiveDateTime) -> EventStatus {
        let Some(start) = self.start else {
            return EventStatus::TimeUnknown;
        };
        if now < start {
            return EventStatus::Upcoming(Countdown::from_duration(start - now));
        }
        match self.end {
            Some(end) if now >= end => EventStatus::Completed,
            _ => EventStatus::Ongoing,
        }
    }

    pub fn reminder(&self, now: NaiveDateTime) -> Option<Reminder> {
        let minutes = (self.start? - now).num_minutes();
        if minutes <= 0 {
            None
        } else if minutes <= REMIND_URGENT_MINUTES {
            Some(Reminder::HeadToVenue)
        } else if minutes <= REMIND_SOON_MINUTES {
            Some(Reminder::StartingSoon)
        } else {
            None
        }
    }

    /// Participants may mark completion from the start until an hour past the end
    pub fn completion_window_open(&self, now: NaiveDateTime) -> bool {
        let Some(start) = self.start else {
            return false;
        };
        now >= start
            && self
                .end
                .is_none_or(|end| now <= end + Duration::hours(COMPLETION_GRACE_HOURS))
    }
}

//! Sub-category extraction from raw brochure text.
//!
//! The brochure is the only schema the festival publishes, so the rules
//! here are regex driven and kept in one place. Rules are tried in priority
//! order and the first one that yields anything wins; results are never
//! merged across rules.

use once_cell::sync::Lazy;
use regex::Regex;

static GIRLS_TEAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bgirls?(?:\s+\S+){0,3}?\s+teams?\b").unwrap());
static BOYS_TEAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bboys?(?:\s+\S+){0,3}?\s+teams?\b").unwrap());

static AGE_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)Age\s*Category\s*:\s*(.+?)(?:Duration|Event\s*Category|Venue|Dress|Participants|Time|$)",
    )
    .unwrap()
});

static ROMAN_BAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b([IVX]+)\s*[.:]\s*([0-9]{1,2}(?:th|st|nd|rd)\s*to\s*[0-9]{1,2}(?:th|st|nd|rd))",
    )
    .unwrap()
});

static ORDINAL_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-9]{1,2}(?:th|st|nd|rd)\s*to\s*[0-9]{1,2}(?:th|st|nd|rd))\b").unwrap()
});

pub const GIRLS: &str = "Girls";
pub const BOYS: &str = "Boys";

/// Derive the ordered, duplicate-free sub-category labels for an event.
/// An empty result means registrations carry no sub-category.
pub fn extract_categories(brochure: &str) -> Vec<String> {
    let text = brochure.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Vec::new();
    }

    if let Some(genders) = gender_split(&text) {
        return genders;
    }

    let segment = age_segment(&text);

    if let Some(seg) = segment {
        let bands = roman_bands(seg);
        if !bands.is_empty() {
            return bands;
        }
    }

    // The whole text is only consulted when there is no age segment at all
    let scope = segment.unwrap_or(&text);
    ORDINAL_SPAN
        .captures(scope)
        .map(|caps| vec![format!("Category : {}", &caps[1])])
        .unwrap_or_default()
}

fn gender_split(text: &str) -> Option<Vec<String>> {
    if GIRLS_TEAM.is_match(text) && BOYS_TEAM.is_match(text) {
        Some(vec![GIRLS.to_string(), BOYS.to_string()])
    } else {
        None
    }
}

fn age_segment(text: &str) -> Option<&str> {
    AGE_SEGMENT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn roman_bands(segment: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in ROMAN_BAND.captures_iter(segment) {
        let label = format!("Category {} : {}", caps[1].to_uppercase(), &caps[2]);
        if !out.contains(&label) {
            out.push(label);
        }
    }
    out
}

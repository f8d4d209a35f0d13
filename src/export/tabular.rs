//! CSV exports of the participant list.

use crate::catalog::Catalog;
use crate::error::{PortalError, Result};
use crate::store::Registration;
use serde::Serialize;
use std::io::Write;

const RAW_HEADERS: [&str; 6] = ["event", "name", "phone", "email", "grade", "subcat"];

const REPORT_HEADERS: [&str; 9] = [
    "NAME OF THE EVENT",
    "TEACHER IN CHARGE",
    "NAME OF PARTICIPANTS",
    "EMAIL ID OF PARTICIPANTS",
    "PHONE NUMBER",
    "STD",
    "DIV",
    "DATES",
    "CATEGORY",
];

#[derive(Debug, Serialize)]
struct RawRow<'a> {
    event: &'a str,
    name: &'a str,
    phone: &'a str,
    email: &'a str,
    grade: &'a str,
    subcat: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    #[serde(rename = "NAME OF THE EVENT")]
    pub event: String,
    #[serde(rename = "TEACHER IN CHARGE")]
    pub teacher: String,
    #[serde(rename = "NAME OF PARTICIPANTS")]
    pub participant: String,
    #[serde(rename = "EMAIL ID OF PARTICIPANTS")]
    pub email: String,
    #[serde(rename = "PHONE NUMBER")]
    pub phone: String,
    #[serde(rename = "STD")]
    pub standard: String,
    #[serde(rename = "DIV")]
    pub division: String,
    #[serde(rename = "DATES")]
    pub dates: String,
    #[serde(rename = "CATEGORY")]
    pub category: String,
}

/// Split "10 B" into ("10", "B"); everything after the first token is the division
pub fn split_grade(grade: &str) -> (String, String) {
    let mut parts = grade.split_whitespace();
    let standard = parts.next().unwrap_or_default().to_string();
    let division = parts.collect::<Vec<_>>().join(" ");
    (standard, division)
}

pub fn report_rows(participants: &[Registration], catalog: &Catalog) -> Vec<ReportRow> {
    participants
        .iter()
        .map(|p| {
            let event = catalog.get(&p.event_key);
            let (standard, division) = split_grade(&p.grade);
            ReportRow {
                event: event.map_or_else(|| p.event.clone(), |e| e.name.clone()),
                teacher: event
                    .map(|e| e.teacher_in_charge.clone())
                    .unwrap_or_default(),
                participant: p.name.clone(),
                email: p.email.clone(),
                phone: p.phone.clone(),
                standard,
                division,
                dates: event.map(|e| e.date_text().to_string()).unwrap_or_default(),
                category: p.subcat.clone(),
            }
        })
        .collect()
}

fn flush<W: Write>(mut wtr: csv::Writer<W>) -> Result<()> {
    wtr.flush().map_err(|e| PortalError::Export {
        message: format!("CSV flush failed: {}", e),
    })
}

/// Column dump: event,name,phone,email,grade,subcat
pub fn write_raw_csv<W: Write>(participants: &[Registration], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(RAW_HEADERS)?;
    for p in participants {
        wtr.serialize(RawRow {
            event: &p.event,
            name: &p.name,
            phone: &p.phone,
            email: &p.email,
            grade: &p.grade,
            subcat: &p.subcat,
        })?;
    }
    flush(wtr)
}

/// Per-event report with the fixed headers the festival office expects
pub fn write_report_csv<W: Write>(
    participants: &[Registration],
    catalog: &Catalog,
    writer: W,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(REPORT_HEADERS)?;
    for row in report_rows(participants, catalog) {
        wtr.serialize(row)?;
    }
    flush(wtr)
}

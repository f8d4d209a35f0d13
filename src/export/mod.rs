//! Outbound formats consumed by calendar apps and spreadsheets

pub mod calendar;
pub mod tabular;

pub use calendar::{calendar_file, calendar_file_name};
pub use tabular::{ReportRow, report_rows, split_grade, write_raw_csv, write_report_csv};

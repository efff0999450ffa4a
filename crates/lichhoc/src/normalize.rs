use chrono::{Duration, Local, NaiveDate};
use thiserror::Error;
use tracing::debug;

use crate::types::{RawCell, RawRow, TimetableEntry};

/// Room shown when the sheet has none.
pub const DEFAULT_ROOM: &str = "Chưa có phòng";

/// Days between the Excel serial epoch (1899-12-30) and 1970-01-01.
const EXCEL_UNIX_EPOCH_OFFSET: i64 = 25569;

/// Why a spreadsheet row was rejected during normalization.
///
/// A row without an identity is treated as structurally invalid (a trailing
/// blank line, a subtotal row) and excluded from the batch, not reported as
/// an import failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RowIssue {
    #[error("missing course name")]
    MissingCourseName,
    #[error("missing course code")]
    MissingCourseCode,
}

/// Normalize a batch of raw spreadsheet rows into canonical entries.
///
/// Rows missing a course name or course code are dropped; everything else
/// is recovered via defaulting. Ids are 1-based input-row indices, so a
/// dropped row leaves a gap rather than renumbering the rest.
pub fn normalize(rows: &[RawRow]) -> Vec<TimetableEntry> {
    normalize_with_today(rows, Local::now().date_naive())
}

/// [`normalize`] with an explicit fallback date for missing/unparseable
/// date cells.
pub fn normalize_with_today(rows: &[RawRow], today: NaiveDate) -> Vec<TimetableEntry> {
    rows.iter()
        .enumerate()
        .filter_map(|(index, row)| match normalize_row(index, row, today) {
            Ok(entry) => Some(entry),
            Err(issue) => {
                debug!(row = index + 1, %issue, "Dropped invalid row");
                None
            }
        })
        .collect()
}

/// Normalize a single row, returning the rejection reason on failure.
pub fn normalize_row(
    index: usize,
    row: &RawRow,
    today: NaiveDate,
) -> Result<TimetableEntry, RowIssue> {
    let course_name = row
        .course_name
        .as_text()
        .ok_or(RowIssue::MissingCourseName)?
        .to_string();
    let course_code = row
        .course_code
        .as_text()
        .ok_or(RowIssue::MissingCourseCode)?
        .to_string();

    Ok(TimetableEntry {
        id: (index + 1) as u32,
        course_name,
        course_code,
        session_label: row.session_label.as_text().unwrap_or_default().to_string(),
        start_date: date_from_raw(&row.start_date, today),
        end_date: date_from_raw(&row.end_date, today),
        weekday: weekday_from_raw(&row.weekday),
        start_time: time_from_raw(&row.start_time),
        end_time: time_from_raw(&row.end_time),
        room: row.room.as_text().unwrap_or(DEFAULT_ROOM).to_string(),
    })
}

/// Map a raw "Thứ" cell to the ISO weekday (1 = Monday .. 7 = Sunday).
///
/// Vietnamese timetables count days from "Thứ 2" (Monday), so codes 2..7
/// are Monday..Saturday and Sunday arrives as "CN", 8, or 1. A missing or
/// unrecognized value falls back to Monday.
pub fn weekday_from_raw(cell: &RawCell) -> u8 {
    let code = match cell {
        RawCell::Empty => return 1,
        RawCell::Number(n) => *n as i64,
        RawCell::Text(s) => {
            let t = s.trim().to_lowercase();
            if t == "cn" || t == "chủ nhật" || t == "chu nhat" {
                return 7;
            }
            match t.parse::<i64>() {
                Ok(n) => n,
                Err(_) => {
                    debug!(value = %s, "Unrecognized weekday, defaulting to Monday");
                    return 1;
                }
            }
        }
    };

    match code {
        2..=7 => (code - 1) as u8,
        1 | 8 => 7,
        _ => {
            debug!(value = code, "Weekday code out of range, defaulting to Monday");
            1
        }
    }
}

/// Convert a raw time cell to `HH:MM:SS`.
///
/// Colon-delimited strings pass through (a `:00` seconds suffix is appended
/// when absent); numeric cells are Excel fractional-day serials. Missing
/// values become midnight.
pub fn time_from_raw(cell: &RawCell) -> String {
    match cell {
        RawCell::Empty => "00:00:00".to_string(),
        RawCell::Text(s) => {
            let t = s.trim();
            if t.contains(':') {
                match t.matches(':').count() {
                    1 => format!("{}:00", t),
                    _ => t.to_string(),
                }
            } else if let Ok(n) = t.parse::<f64>() {
                serial_to_time(n)
            } else {
                "00:00:00".to_string()
            }
        }
        RawCell::Number(n) => serial_to_time(*n),
    }
}

/// Decompose a fractional-day serial into zero-padded `HH:MM:00`.
///
/// Serials carrying a whole-day part (full datetimes) keep only the
/// fractional time-of-day.
fn serial_to_time(serial: f64) -> String {
    let frac = if serial >= 1.0 || serial < 0.0 {
        serial.rem_euclid(1.0)
    } else {
        serial
    };
    let total_seconds = (frac * 86400.0).round() as i64;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    format!("{:02}:{:02}:00", hours, minutes)
}

/// Convert a raw date cell to a calendar date.
///
/// Strings containing `/` parse as `DD/MM/YYYY`; ISO `YYYY-MM-DD` strings
/// (with or without a time suffix) are accepted as well; numeric cells are
/// Excel serial dates. Anything else falls back to `today`.
pub fn date_from_raw(cell: &RawCell, today: NaiveDate) -> NaiveDate {
    match cell {
        RawCell::Empty => today,
        RawCell::Number(n) => serial_to_date(*n).unwrap_or(today),
        RawCell::Text(s) => {
            let t = s.trim();
            if t.contains('/') {
                NaiveDate::parse_from_str(t, "%d/%m/%Y").unwrap_or(today)
            } else if t.contains('-') {
                let date_part = t.split_whitespace().next().unwrap_or(t);
                NaiveDate::parse_from_str(date_part, "%Y-%m-%d").unwrap_or(today)
            } else if let Ok(n) = t.parse::<f64>() {
                serial_to_date(n).unwrap_or(today)
            } else {
                today
            }
        }
    }
}

/// Excel serial date to calendar date: serial days minus the 1970 epoch
/// offset, applied to 1970-01-01.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    let days = serial.trunc() as i64 - EXCEL_UNIX_EPOCH_OFFSET;
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(Duration::days(days))
}

use serde::{Deserialize, Serialize};

/// A single spreadsheet cell as read from a workbook, before normalization.
///
/// Excel stores dates and times as fractional-day serial numbers, so a cell
/// that looks like "07:30" in a spreadsheet program may arrive here as
/// `Number(0.3125)`. The normalizer decides how to interpret each variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawCell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl RawCell {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }

    /// The trimmed text content, if this is a non-empty text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawCell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t)
                }
            }
            _ => None,
        }
    }
}

/// One untyped spreadsheet row, keyed by the known timetable columns.
///
/// Columns the sheet does not carry stay [`RawCell::Empty`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub course_name: RawCell,
    pub course_code: RawCell,
    pub session_label: RawCell,
    pub start_date: RawCell,
    pub end_date: RawCell,
    pub weekday: RawCell,
    pub start_time: RawCell,
    pub end_time: RawCell,
    pub room: RawCell,
}

/// A canonical recurring weekly class slot.
///
/// `weekday` uses the ISO encoding (1 = Monday .. 7 = Sunday); the
/// Vietnamese "Thứ" code from the spreadsheet is mapped during
/// normalization. Times are `HH:MM:SS`, 24-hour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimetableEntry {
    pub id: u32,
    pub course_name: String,
    pub course_code: String,
    pub session_label: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub weekday: u8,
    pub start_time: String,
    pub end_time: String,
    pub room: String,
}

impl TimetableEntry {
    /// Hour component of `start_time`, used for period classification.
    pub fn start_hour(&self) -> u32 {
        self.start_time
            .split(':')
            .next()
            .and_then(|h| h.parse().ok())
            .unwrap_or(0)
    }

    /// The daily time band this slot falls into.
    pub fn period(&self) -> Period {
        Period::classify(self.start_hour())
    }
}

/// One of the three daily time bands of the timetable grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    /// Display order: morning, afternoon, evening.
    pub const ALL: [Period; 3] = [Period::Morning, Period::Afternoon, Period::Evening];

    /// Classify an hour of day into a period.
    ///
    /// The afternoon/evening boundary is 17:00. This is the single
    /// classification site; entries and queried periods go through the
    /// same boundaries.
    pub fn classify(hour: u32) -> Period {
        if hour < 12 {
            Period::Morning
        } else if hour < 17 {
            Period::Afternoon
        } else {
            Period::Evening
        }
    }

    /// Fixed Vietnamese label, as shown in the grid.
    pub fn label(&self) -> &'static str {
        match self {
            Period::Morning => "Sáng",
            Period::Afternoon => "Chiều",
            Period::Evening => "Tối",
        }
    }
}

use chrono::{Datelike, Duration, NaiveDate};

/// Vietnamese day-of-week labels, Monday first.
pub const DAY_LABELS: [&str; 7] = [
    "Thứ 2",
    "Thứ 3",
    "Thứ 4",
    "Thứ 5",
    "Thứ 6",
    "Thứ 7",
    "Chủ nhật",
];

/// ISO weekday number for a date: 1 = Monday .. 7 = Sunday.
pub fn weekday_of(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// The Monday on or before `date`. A Sunday belongs to the week that
/// started six days earlier, not the one starting the next day.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    date - Duration::days(weekday_of(date) as i64 - 1)
}

/// Monday..Sunday of the week containing `date`, as consecutive dates.
pub fn dates_for_week(date: NaiveDate) -> [NaiveDate; 7] {
    let monday = start_of_week(date);
    std::array::from_fn(|i| monday + Duration::days(i as i64))
}

/// Shift a reference date by whole weeks. Unbounded in both directions.
pub fn shift_week(reference: NaiveDate, delta_weeks: i64) -> NaiveDate {
    reference + Duration::days(7 * delta_weeks)
}

/// `DD/MM/YYYY`, as shown in the grid header.
pub fn format_date_dmy(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

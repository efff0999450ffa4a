use chrono::NaiveDate;

use crate::types::{Period, TimetableEntry};
use crate::week::{dates_for_week, weekday_of};

/// The entries occupying one (day, period) cell.
///
/// An entry matches when the day falls inside its inclusive
/// `[start_date, end_date]` range, the day's ISO weekday equals the entry's,
/// and the entry's start hour classifies into the requested period. The
/// filter is stable: matches keep their input order.
pub fn cell_contents<'a>(
    entries: &'a [TimetableEntry],
    day: NaiveDate,
    period: Period,
) -> Vec<&'a TimetableEntry> {
    entries
        .iter()
        .filter(|entry| {
            entry.start_date <= day
                && day <= entry.end_date
                && weekday_of(day) == entry.weekday
                && entry.period() == period
        })
        .collect()
}

/// A fully placed 7-day × 3-period week.
///
/// `cells[p][d]` holds the entries for period `Period::ALL[p]` on day
/// `days[d]`. Built with one linear scan per cell; fine for the tens to low
/// hundreds of entries a timetable carries.
pub struct WeekView<'a> {
    pub days: [NaiveDate; 7],
    pub cells: [[Vec<&'a TimetableEntry>; 7]; 3],
}

pub fn week_view<'a>(entries: &'a [TimetableEntry], reference: NaiveDate) -> WeekView<'a> {
    let days = dates_for_week(reference);
    let cells = std::array::from_fn(|p| {
        std::array::from_fn(|d| cell_contents(entries, days[d], Period::ALL[p]))
    });
    WeekView { days, cells }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_entry(id: u32, weekday: u8, start_time: &str) -> TimetableEntry {
        TimetableEntry {
            id,
            course_name: "Giải tích 1".to_string(),
            course_code: "MI1111".to_string(),
            session_label: "1-3".to_string(),
            start_date: date(2024, 9, 1),
            end_date: date(2024, 12, 1),
            weekday,
            start_time: start_time.to_string(),
            end_time: "09:30:00".to_string(),
            room: "D9-301".to_string(),
        }
    }

    #[test]
    fn test_cell_contents_monday_morning_match() {
        // Weekday 1 = Monday; 2024-09-02 is a Monday inside the range
        let entries = vec![make_entry(1, 1, "07:30:00")];

        let hit = cell_contents(&entries, date(2024, 9, 2), Period::Morning);
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].id, 1);

        // The following Tuesday must not match
        let miss = cell_contents(&entries, date(2024, 9, 3), Period::Morning);
        assert!(miss.is_empty());
    }

    #[test]
    fn test_cell_contents_wrong_period_excluded() {
        let entries = vec![make_entry(1, 1, "07:30:00")];
        assert!(cell_contents(&entries, date(2024, 9, 2), Period::Afternoon).is_empty());
        assert!(cell_contents(&entries, date(2024, 9, 2), Period::Evening).is_empty());
    }

    #[test]
    fn test_cell_contents_outside_date_range_excluded() {
        // Weekday and period match, but the Monday is after end_date
        let entries = vec![make_entry(1, 1, "07:30:00")];
        assert!(cell_contents(&entries, date(2024, 12, 2), Period::Morning).is_empty());
        // And before start_date
        assert!(cell_contents(&entries, date(2024, 8, 26), Period::Morning).is_empty());
    }

    #[test]
    fn test_cell_contents_range_boundaries_inclusive() {
        let mut entry = make_entry(1, 1, "07:30:00");
        // 2024-09-02 and 2024-11-25 are both Mondays
        entry.start_date = date(2024, 9, 2);
        entry.end_date = date(2024, 11, 25);
        let entries = vec![entry];

        assert_eq!(cell_contents(&entries, date(2024, 9, 2), Period::Morning).len(), 1);
        assert_eq!(cell_contents(&entries, date(2024, 11, 25), Period::Morning).len(), 1);
    }

    #[test]
    fn test_cell_contents_sunday_slot() {
        let entries = vec![make_entry(1, 7, "18:00:00")];
        // 2024-09-08 is a Sunday
        let hit = cell_contents(&entries, date(2024, 9, 8), Period::Evening);
        assert_eq!(hit.len(), 1);
        // Saturday does not pick up the Sunday slot
        assert!(cell_contents(&entries, date(2024, 9, 7), Period::Evening).is_empty());
    }

    #[test]
    fn test_cell_contents_preserves_input_order() {
        let entries = vec![
            make_entry(3, 1, "07:30:00"),
            make_entry(1, 1, "10:00:00"),
            make_entry(2, 1, "08:00:00"),
        ];

        let hits = cell_contents(&entries, date(2024, 9, 2), Period::Morning);
        let ids: Vec<u32> = hits.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_cell_contents_period_boundaries() {
        let entries = vec![
            make_entry(1, 1, "11:59:00"),
            make_entry(2, 1, "12:00:00"),
            make_entry(3, 1, "16:59:00"),
            make_entry(4, 1, "17:00:00"),
        ];
        let day = date(2024, 9, 2);

        let morning: Vec<u32> = cell_contents(&entries, day, Period::Morning)
            .iter()
            .map(|e| e.id)
            .collect();
        let afternoon: Vec<u32> = cell_contents(&entries, day, Period::Afternoon)
            .iter()
            .map(|e| e.id)
            .collect();
        let evening: Vec<u32> = cell_contents(&entries, day, Period::Evening)
            .iter()
            .map(|e| e.id)
            .collect();

        assert_eq!(morning, vec![1]);
        assert_eq!(afternoon, vec![2, 3]);
        assert_eq!(evening, vec![4]);
    }

    #[test]
    fn test_week_view_places_each_entry_once() {
        let entries = vec![
            make_entry(1, 1, "07:30:00"),
            make_entry(2, 3, "13:00:00"),
            make_entry(3, 7, "19:00:00"),
        ];

        let view = week_view(&entries, date(2024, 9, 4));
        assert_eq!(view.days[0], date(2024, 9, 2));

        let placed: usize = view
            .cells
            .iter()
            .flat_map(|row| row.iter())
            .map(|cell| cell.len())
            .sum();
        assert_eq!(placed, 3);

        // Monday morning, Wednesday afternoon, Sunday evening
        assert_eq!(view.cells[0][0].len(), 1);
        assert_eq!(view.cells[1][2].len(), 1);
        assert_eq!(view.cells[2][6].len(), 1);
    }

    #[test]
    fn test_week_view_empty_entries() {
        let view = week_view(&[], date(2024, 9, 4));
        assert!(view.cells.iter().flatten().all(|cell| cell.is_empty()));
    }
}

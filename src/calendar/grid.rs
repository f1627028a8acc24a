//! Month Grid Builder
//!
//! Produces the weeks needed to render a month view. The grid runs from the
//! start of the week containing the 1st through the end of the week
//! containing the last day; padding days from adjacent months are marked
//! `in_current_month = false`.
//!
//! # Example
//!
//! ```rust
//! use chrono::{NaiveDate, Weekday};
//! use mood_diary::calendar::MonthGrid;
//! use mood_diary::mood::MoodMap;
//!
//! let reference = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
//! let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
//! let grid = MonthGrid::build(reference, today, None, Weekday::Mon, &MoodMap::new());
//!
//! assert_eq!(grid.weeks.len(), 5);
//! assert_eq!(grid.weeks[0][0].date, NaiveDate::from_ymd_opt(2024, 2, 26).unwrap());
//! ```

use chrono::{NaiveDate, Weekday};
use serde::Serialize;

use super::month::{end_of_week, start_of_week, MonthKey};
use crate::mood::{MoodMap, StickerId};

/// One rendered day box
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub is_today: bool,
    pub is_selected: bool,
    /// False for days strictly after today
    pub selectable: bool,
    pub mood_color: Option<String>,
    pub mood_sticker: Option<StickerId>,
}

/// A month view: weeks of exactly seven cells
#[derive(Debug, Clone, Serialize)]
pub struct MonthGrid {
    pub month: MonthKey,
    pub week_start: Weekday,
    pub weeks: Vec<[DayCell; 7]>,
}

impl MonthGrid {
    /// Build the grid for the month containing `reference`
    ///
    /// Mood lookups only read `moods`; days without an entry render empty.
    pub fn build(
        reference: NaiveDate,
        today: NaiveDate,
        selected: Option<NaiveDate>,
        week_start: Weekday,
        moods: &MoodMap,
    ) -> Self {
        let month = MonthKey::of(reference);
        let first = start_of_week(month.first_day(), week_start);
        let last = end_of_week(month.last_day(), week_start);

        let cells: Vec<DayCell> = first
            .iter_days()
            .take_while(|day| *day <= last)
            .map(|date| {
                let entry = moods.get(&date);
                DayCell {
                    date,
                    in_current_month: month.contains(date),
                    is_today: date == today,
                    is_selected: selected == Some(date),
                    selectable: date <= today,
                    mood_color: entry.and_then(|e| e.color.clone()),
                    mood_sticker: entry.and_then(|e| e.sticker_id),
                }
            })
            .collect();

        let weeks = cells
            .chunks_exact(7)
            .map(|week| std::array::from_fn(|i| week[i].clone()))
            .collect();

        Self {
            month,
            week_start,
            weeks,
        }
    }

    /// All cells in display order
    pub fn days(&self) -> impl Iterator<Item = &DayCell> {
        self.weeks.iter().flat_map(|week| week.iter())
    }

    /// Number of cells (always a multiple of 7)
    pub fn cell_count(&self) -> usize {
        self.weeks.len() * 7
    }

    /// Look up the cell for `date`, if it is on the grid
    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        self.days().find(|cell| cell.date == date)
    }
}

/// Weekday header labels starting from `week_start`
pub fn weekday_labels(week_start: Weekday) -> [&'static str; 7] {
    let mut day = week_start;
    std::array::from_fn(|_| {
        let label = match day {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        };
        day = day.succ();
        label
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::{MoodAttrs, MoodEntry};
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_march_2024_monday_start() {
        let grid = MonthGrid::build(
            date(2024, 3, 15),
            date(2024, 3, 20),
            None,
            Weekday::Mon,
            &MoodMap::new(),
        );

        assert_eq!(grid.weeks.len(), 5);
        assert_eq!(grid.cell_count(), 35);

        let week1 = &grid.weeks[0];
        for (i, day) in [26, 27, 28, 29].iter().enumerate() {
            assert_eq!(week1[i].date, date(2024, 2, *day));
            assert!(!week1[i].in_current_month);
        }
        for (i, day) in [1, 2, 3].iter().enumerate() {
            assert_eq!(week1[4 + i].date, date(2024, 3, *day));
            assert!(week1[4 + i].in_current_month);
        }
        assert_eq!(grid.weeks[4][6].date, date(2024, 3, 31));
    }

    #[test]
    fn test_march_2024_sunday_start() {
        let grid = MonthGrid::build(
            date(2024, 3, 1),
            date(2024, 3, 20),
            None,
            Weekday::Sun,
            &MoodMap::new(),
        );

        // March 31st is a Sunday, so it opens a sixth week
        assert_eq!(grid.weeks.len(), 6);
        assert_eq!(grid.weeks[0][0].date, date(2024, 2, 25));
        assert_eq!(grid.weeks[0][5].date, date(2024, 3, 1));
        assert_eq!(grid.weeks[5][6].date, date(2024, 4, 6));
    }

    #[test]
    fn test_grid_shape_for_many_months() {
        for week_start in [Weekday::Sun, Weekday::Mon] {
            let mut month = MonthKey::new(2023, 1).unwrap();
            for _ in 0..36 {
                let grid = MonthGrid::build(
                    month.first_day(),
                    date(2024, 6, 1),
                    None,
                    week_start,
                    &MoodMap::new(),
                );

                assert_eq!(grid.cell_count() % 7, 0);
                assert!((4..=6).contains(&grid.weeks.len()));
                assert_eq!(grid.weeks[0][0].date.weekday(), week_start);

                for cell in grid.days() {
                    let inside = cell.date >= month.first_day() && cell.date <= month.last_day();
                    assert_eq!(cell.in_current_month, inside);
                }
                let in_month = grid.days().filter(|c| c.in_current_month).count();
                assert_eq!(in_month as u32, month.days());

                month = month.next();
            }
        }
    }

    #[test]
    fn test_today_selected_and_future_flags() {
        let today = date(2024, 3, 20);
        let grid = MonthGrid::build(
            today,
            today,
            Some(date(2024, 3, 5)),
            Weekday::Sun,
            &MoodMap::new(),
        );

        let cell = grid.cell(today).unwrap();
        assert!(cell.is_today);
        assert!(cell.selectable);

        assert!(grid.cell(date(2024, 3, 5)).unwrap().is_selected);
        assert_eq!(grid.days().filter(|c| c.is_selected).count(), 1);

        let tomorrow = grid.cell(date(2024, 3, 21)).unwrap();
        assert!(!tomorrow.selectable);
        assert!(!tomorrow.is_today);
    }

    #[test]
    fn test_mood_lookup_does_not_fabricate() {
        let mut moods = MoodMap::new();
        let mut entry = MoodEntry::empty(date(2024, 3, 10));
        entry.merge(&MoodAttrs::default().color("#FFABAB").sticker(4));
        moods.insert(entry.date, entry);

        let grid = MonthGrid::build(date(2024, 3, 1), date(2024, 3, 31), None, Weekday::Sun, &moods);

        let marked = grid.cell(date(2024, 3, 10)).unwrap();
        assert_eq!(marked.mood_color.as_deref(), Some("#FFABAB"));
        assert_eq!(marked.mood_sticker, Some(4));

        let plain = grid.cell(date(2024, 3, 11)).unwrap();
        assert_eq!(plain.mood_color, None);
        assert_eq!(plain.mood_sticker, None);
        assert_eq!(moods.len(), 1);
    }

    #[test]
    fn test_weekday_labels() {
        assert_eq!(weekday_labels(Weekday::Sun)[0], "Sun");
        assert_eq!(weekday_labels(Weekday::Sun)[6], "Sat");
        assert_eq!(weekday_labels(Weekday::Mon)[6], "Sun");
    }
}

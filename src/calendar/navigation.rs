//! Calendar navigation state
//!
//! Month/year browsing and day selection for a calendar view. Selection is
//! an echo of the last clicked day and is never persisted.

use chrono::{Datelike, NaiveDate, Weekday};

use super::grid::MonthGrid;
use super::month::MonthKey;
use crate::mood::MoodMap;

/// Which calendar view is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarView {
    Month,
    Year,
}

/// Navigation state for one calendar view
#[derive(Debug, Clone)]
pub struct CalendarState {
    current_month: MonthKey,
    current_year: i32,
    selected: Option<NaiveDate>,
    today: NaiveDate,
    view: CalendarView,
    week_start: Weekday,
}

impl CalendarState {
    /// Start on the month containing `today`
    pub fn new(today: NaiveDate, week_start: Weekday) -> Self {
        Self {
            current_month: MonthKey::of(today),
            current_year: today.year(),
            selected: None,
            today,
            view: CalendarView::Month,
            week_start,
        }
    }

    pub fn current_month(&self) -> MonthKey {
        self.current_month
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn selected(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn view(&self) -> CalendarView {
        self.view
    }

    /// Jump straight to a month in month view
    pub fn show_month(&mut self, month: MonthKey) {
        self.current_month = month;
        self.current_year = month.year;
        self.view = CalendarView::Month;
    }

    pub fn prev_month(&mut self) {
        self.current_month = self.current_month.prev();
    }

    pub fn next_month(&mut self) {
        self.current_month = self.current_month.next();
    }

    /// Back to the month containing today, in month view
    pub fn go_to_today(&mut self) {
        self.show_month(MonthKey::of(self.today));
    }

    pub fn toggle_year_view(&mut self) {
        self.view = match self.view {
            CalendarView::Month => CalendarView::Year,
            CalendarView::Year => CalendarView::Month,
        };
    }

    pub fn prev_year(&mut self) {
        self.current_year -= 1;
    }

    pub fn next_year(&mut self) {
        self.current_year += 1;
    }

    /// The twelve months offered by the year view
    pub fn year_months(&self) -> Vec<MonthKey> {
        MonthKey::year_months(self.current_year)
    }

    /// Pick a month from the year view
    pub fn pick_month(&mut self, month: MonthKey) {
        self.show_month(month);
    }

    /// Handle a click on `date`
    ///
    /// Days after today cannot be selected; returns whether the click took.
    pub fn click(&mut self, date: NaiveDate) -> bool {
        if date > self.today {
            tracing::debug!(%date, "Ignoring click on future date");
            return false;
        }
        self.selected = Some(date);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Build the grid for the current month
    pub fn grid(&self, moods: &MoodMap) -> MonthGrid {
        MonthGrid::build(
            self.current_month.first_day(),
            self.today,
            self.selected,
            self.week_start,
            moods,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_navigation_wraps_years() {
        let mut state = CalendarState::new(date(2024, 1, 15), Weekday::Sun);
        state.prev_month();
        assert_eq!(state.current_month().to_string(), "2023-12");
        state.next_month();
        state.next_month();
        assert_eq!(state.current_month().to_string(), "2024-02");
    }

    #[test]
    fn test_go_to_today_leaves_year_view() {
        let mut state = CalendarState::new(date(2024, 5, 2), Weekday::Sun);
        state.prev_month();
        state.prev_month();
        state.toggle_year_view();
        assert_eq!(state.view(), CalendarView::Year);

        state.go_to_today();
        assert_eq!(state.view(), CalendarView::Month);
        assert_eq!(state.current_month().to_string(), "2024-05");
    }

    #[test]
    fn test_year_view_pick_month() {
        let mut state = CalendarState::new(date(2024, 5, 2), Weekday::Sun);
        state.toggle_year_view();
        state.prev_year();
        assert_eq!(state.current_year(), 2023);

        let months = state.year_months();
        assert_eq!(months.len(), 12);
        state.pick_month(months[8]);

        assert_eq!(state.view(), CalendarView::Month);
        assert_eq!(state.current_month().to_string(), "2023-09");
    }

    #[test]
    fn test_click_rejects_future_dates() {
        let mut state = CalendarState::new(date(2024, 3, 20), Weekday::Sun);

        assert!(!state.click(date(2024, 3, 21)));
        assert_eq!(state.selected(), None);

        assert!(state.click(date(2024, 3, 20)));
        assert_eq!(state.selected(), Some(date(2024, 3, 20)));

        assert!(state.click(date(2023, 1, 1)));
        assert_eq!(state.selected(), Some(date(2023, 1, 1)));
    }

    #[test]
    fn test_grid_echoes_selection() {
        let mut state = CalendarState::new(date(2024, 3, 20), Weekday::Sun);
        state.click(date(2024, 3, 4));

        let grid = state.grid(&MoodMap::new());
        assert!(grid.cell(date(2024, 3, 4)).unwrap().is_selected);
        assert!(grid.cell(date(2024, 3, 20)).unwrap().is_today);
    }
}

//! Calendar model
//!
//! - **month**: `MonthKey` and week arithmetic
//! - **grid**: Month Grid Builder (`MonthGrid`, `DayCell`)
//! - **navigation**: month/year browsing and selection (`CalendarState`)

pub mod grid;
pub mod month;
pub mod navigation;

pub use grid::{weekday_labels, DayCell, MonthGrid};
pub use month::{end_of_week, start_of_week, MonthKey, ParseMonthError};
pub use navigation::{CalendarState, CalendarView};

//! Mood tracking
//!
//! - **types**: `MoodEntry`, `MoodAttrs`, palette and color validation
//! - **store**: Mood State Store (optimistic writes, server reconciliation)
//! - **remote**: `MoodRemote` seam and its HTTP implementation
//! - **aggregate**: Mood Aggregator (per-month tag and color counts)

pub mod aggregate;
pub mod remote;
pub mod store;
pub mod types;

pub use aggregate::{
    color_chart, color_counts, entries_in_month, tag_counts, tag_rows, tag_totals,
    AggregatedTagCount, ColorChart, ColorSeries, HeatLevel, PeriodCounts,
};
pub use remote::MoodRemote;
pub use store::{LoadOutcome, MoodStore};
pub use types::{
    normalize_color, MoodAttrs, MoodEntry, MoodMap, StickerId, DEFAULT_PALETTE, TRANSPARENT,
};

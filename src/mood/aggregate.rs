//! Aggregation Reducer
//!
//! Turns the per-day mood map into per-month frequency tables for charts.
//! Results are `BTreeMap`s so iteration is in ascending month (and label)
//! order and repeated runs over the same input are identical.

use serde::Serialize;
use std::collections::BTreeMap;

use super::types::{MoodEntry, MoodMap, TRANSPARENT};
use crate::calendar::MonthKey;

/// Month -> label (tag or color) -> occurrences
pub type PeriodCounts = BTreeMap<MonthKey, BTreeMap<String, usize>>;

/// One row of the tag frequency table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedTagCount {
    pub period: MonthKey,
    pub tag: String,
    pub count: usize,
}

/// Count tags per month. Entries without a tag are skipped.
pub fn tag_counts<'a>(entries: impl IntoIterator<Item = &'a MoodEntry>) -> PeriodCounts {
    let mut counts = PeriodCounts::new();
    for entry in entries {
        let Some(tag) = entry.tag.as_deref() else {
            continue;
        };
        *counts
            .entry(MonthKey::of(entry.date))
            .or_default()
            .entry(tag.to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Count colors per month
///
/// Entries without a color land in the transparent bucket, which is dropped
/// from the output.
pub fn color_counts<'a>(entries: impl IntoIterator<Item = &'a MoodEntry>) -> PeriodCounts {
    let mut counts = PeriodCounts::new();
    for entry in entries {
        let bucket = entry.color_bucket();
        if bucket == TRANSPARENT {
            continue;
        }
        *counts
            .entry(MonthKey::of(entry.date))
            .or_default()
            .entry(bucket.to_string())
            .or_insert(0) += 1;
    }
    counts
}

/// Flatten period counts into table rows, ascending by month then tag
pub fn tag_rows(counts: &PeriodCounts) -> Vec<AggregatedTagCount> {
    counts
        .iter()
        .flat_map(|(period, tags)| {
            tags.iter().map(move |(tag, count)| AggregatedTagCount {
                period: *period,
                tag: tag.clone(),
                count: *count,
            })
        })
        .collect()
}

/// Entries dated within `month`
pub fn entries_in_month(moods: &MoodMap, month: MonthKey) -> impl Iterator<Item = &MoodEntry> {
    moods
        .range(month.first_day()..=month.last_day())
        .map(|(_, entry)| entry)
}

/// Tag totals over any set of entries (heat map input)
pub fn tag_totals<'a>(entries: impl IntoIterator<Item = &'a MoodEntry>) -> BTreeMap<String, usize> {
    let mut totals = BTreeMap::new();
    for tag in entries.into_iter().filter_map(|e| e.tag.as_deref()) {
        *totals.entry(tag.to_string()).or_insert(0) += 1;
    }
    totals
}

/// Heat map intensity for a tag count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatLevel {
    Low,
    Medium,
    High,
}

impl HeatLevel {
    pub fn for_count(count: usize) -> Self {
        if count > 5 {
            HeatLevel::High
        } else if count > 1 {
            HeatLevel::Medium
        } else {
            HeatLevel::Low
        }
    }
}

/// One stacked-bar series: a color's count per month on the shared axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorSeries {
    pub color: String,
    pub counts: Vec<usize>,
}

/// Stacked bar chart input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorChart {
    pub months: Vec<MonthKey>,
    pub series: Vec<ColorSeries>,
}

/// Align per-month color counts onto a shared ascending month axis
///
/// A color missing from a month contributes 0 for that month.
pub fn color_chart(counts: &PeriodCounts) -> ColorChart {
    let months: Vec<MonthKey> = counts.keys().copied().collect();
    let mut series: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for (index, colors) in counts.values().enumerate() {
        for (color, count) in colors {
            series
                .entry(color.as_str())
                .or_insert_with(|| vec![0; months.len()])[index] = *count;
        }
    }

    ColorChart {
        months,
        series: series
            .into_iter()
            .map(|(color, counts)| ColorSeries {
                color: color.to_string(),
                counts,
            })
            .collect(),
    }
}

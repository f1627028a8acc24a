//! Mood data types
//!
//! - `MoodEntry`: one date's color/tag/sticker annotation
//! - `MoodAttrs`: a partial update merged into an entry
//! - `MoodMap`: the date-keyed collection (one entry per date)

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// Identifier of a sticker in the shop catalogue
pub type StickerId = i64;

/// Date-keyed mood collection; the key is the unique identity of an entry
pub type MoodMap = BTreeMap<NaiveDate, MoodEntry>;

/// Default seven-color mood palette
pub const DEFAULT_PALETTE: [&str; 7] = [
    "#FFABAB", "#FFC3A0", "#FFF58E", "#CDE6A5", "#ACD1EA", "#9FB1D9", "#C8BFE7",
];

/// Neutral bucket for entries without a color; never charted
pub const TRANSPARENT: &str = "transparent";

/// A user's mood annotation for one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub sticker_id: Option<StickerId>,
}

impl MoodEntry {
    /// An entry with no attributes set
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            color: None,
            tag: None,
            sticker_id: None,
        }
    }

    /// Merge a partial update; unset fields in `attrs` keep their current value
    pub fn merge(&mut self, attrs: &MoodAttrs) {
        if let Some(color) = &attrs.color {
            self.color = Some(color.clone());
        }
        if let Some(tag) = &attrs.tag {
            self.tag = Some(tag.clone());
        }
        if let Some(sticker_id) = attrs.sticker_id {
            self.sticker_id = Some(sticker_id);
        }
    }

    /// True when no attribute is set
    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.tag.is_none() && self.sticker_id.is_none()
    }

    /// The color bucket this entry aggregates into
    pub fn color_bucket(&self) -> &str {
        self.color.as_deref().unwrap_or(TRANSPARENT)
    }
}

/// Partial mood update for one date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<StickerId>,
}

impl MoodAttrs {
    /// Builder method: set color
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Builder method: set tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Builder method: set sticker
    pub fn sticker(mut self, sticker_id: StickerId) -> Self {
        self.sticker_id = Some(sticker_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none() && self.tag.is_none() && self.sticker_id.is_none()
    }

    /// Validate and normalise the update
    ///
    /// Colors are normalised to upper-case `#RRGGBB`; tags are trimmed and
    /// must not be blank. An update with nothing set is rejected.
    pub fn normalized(self) -> Result<Self> {
        if self.is_empty() {
            return Err(Error::Validation(
                "a color, tag or sticker is required".to_string(),
            ));
        }

        let color = self.color.as_deref().map(normalize_color).transpose()?;
        let tag = match self.tag.as_deref().map(str::trim) {
            Some("") => {
                return Err(Error::Validation("tag must not be blank".to_string()));
            }
            Some(tag) => Some(tag.to_string()),
            None => None,
        };

        Ok(Self {
            color,
            tag,
            sticker_id: self.sticker_id,
        })
    }
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"))
}

/// Validate a `#RRGGBB` color and return it upper-cased
pub fn normalize_color(color: &str) -> Result<String> {
    let color = color.trim();
    if color_pattern().is_match(color) {
        Ok(color.to_ascii_uppercase())
    } else {
        Err(Error::Validation(format!(
            "invalid color '{}', expected #RRGGBB",
            color
        )))
    }
}

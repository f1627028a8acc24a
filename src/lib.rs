//! # Mood Diary
//!
//! Personal mood journaling client: a calendar of daily moods (color, tag,
//! sticker), diary entries, monthly statistics and a sticker shop, backed
//! by a remote journaling API and a local cache.
//!
//! ## Modules
//!
//! - [`calendar`]: month grid building and calendar navigation
//! - [`mood`]: mood entries, the mood state store and aggregation
//! - [`client`]: typed client for the journaling REST API
//! - [`cache`]: file-backed local key/value cache
//! - [`context`]: per-session application context
//! - [`diary`], [`stickers`], [`account`]: user-facing features
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mood_diary::{AppContext, Config, MoodAttrs};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut ctx = AppContext::open(Config::from_env()?)?;
//!     ctx.login("kim", "secret").await?;
//!
//!     // Pull the server's moods, then set today's
//!     ctx.load_moods().await?;
//!     let today = mood_diary::context::today();
//!     ctx.set_mood(today, MoodAttrs::default().color("#FFABAB").tag("happy")).await?;
//!
//!     let grid = ctx.moods().snapshot();
//!     println!("{} days tracked", grid.len());
//!
//!     ctx.logout().await?;
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod cache;
pub mod calendar;
pub mod client;
pub mod config;
pub mod context;
pub mod diary;
pub mod error;
pub mod mood;
pub mod stickers;

// Re-export top-level types for convenience
pub use calendar::{CalendarState, CalendarView, DayCell, MonthGrid, MonthKey};

pub use mood::{
    AggregatedTagCount, ColorChart, HeatLevel, LoadOutcome, MoodAttrs, MoodEntry, MoodMap,
    MoodRemote, MoodStore, StickerId, DEFAULT_PALETTE,
};

pub use client::{ApiClient, ClientConfig, ClientError, Diary, Sticker, User};

pub use cache::{CacheError, LocalCache};

pub use config::{Config, ConfigError, LoggingConfig, WeekStart};

pub use context::AppContext;

pub use diary::{DiaryDraft, DiaryService};

pub use stickers::{ShopView, StickerShop};

pub use account::{Account, SignupForm};

pub use error::{Error, ErrorKind, Result};

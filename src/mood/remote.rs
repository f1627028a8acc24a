//! Remote mood persistence
//!
//! `MoodRemote` is the seam between the mood store and the server. The HTTP
//! implementation fans a merged entry out over the color, tag and sticker
//! endpoints.

use async_trait::async_trait;

use super::types::{MoodEntry, DEFAULT_PALETTE};
use crate::client::{ApiClient, ClientResult};

/// Server-side copy of the mood calendar
#[async_trait]
pub trait MoodRemote: Send + Sync {
    /// Fetch every mood entry of the authenticated user
    async fn fetch_moods(&self, token: &str) -> ClientResult<Vec<MoodEntry>>;

    /// Persist the full state of one date
    async fn save_mood(&self, token: &str, entry: &MoodEntry) -> ClientResult<()>;
}

#[async_trait]
impl MoodRemote for ApiClient {
    async fn fetch_moods(&self, token: &str) -> ClientResult<Vec<MoodEntry>> {
        let records = self.fetch_calendar(token).await?;
        Ok(records.into_iter().map(MoodEntry::from).collect())
    }

    async fn save_mood(&self, token: &str, entry: &MoodEntry) -> ClientResult<()> {
        if let Some(color) = &entry.color {
            self.set_mood_color(token, entry.date, color).await?;
        }
        if let Some(tag) = &entry.tag {
            self.set_mood_tag(token, entry.date, tag).await?;
        }
        if let Some(sticker_id) = entry.sticker_id {
            // A sticker is placed on a colored day; uncolored days use the first palette color
            let color = entry.color.as_deref().unwrap_or(DEFAULT_PALETTE[0]);
            self.place_sticker(token, entry.date, color, sticker_id).await?;
        }
        Ok(())
    }
}

//! Request/response bodies for the journaling API

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::mood::{normalize_color, MoodEntry, StickerId, TRANSPARENT};

// ============================================
// Domain records
// ============================================

/// Profile of the logged-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "profilePicture")]
    pub profile_picture: Option<String>,
    /// In-app currency balance
    #[serde(default)]
    pub coins: Option<i64>,
}

/// A diary entry as stored by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diary {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// One-line review
    #[serde(default, rename = "one")]
    pub one_line: Option<String>,
}

/// A sticker from the shop catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    pub sticker_id: StickerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub price: i64,
}

/// One day of the server-side mood calendar
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarRecord {
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub sticker_id: Option<StickerId>,
}

impl From<CalendarRecord> for MoodEntry {
    fn from(record: CalendarRecord) -> Self {
        let date = record.date;
        let color = record
            .color
            .filter(|c| !c.trim().is_empty() && !c.trim().eq_ignore_ascii_case(TRANSPARENT))
            .and_then(|c| match normalize_color(&c) {
                Ok(color) => Some(color),
                Err(e) => {
                    tracing::warn!(%date, error = %e, "Dropping unrecognized server color");
                    None
                }
            });

        MoodEntry {
            date,
            color,
            tag: record.tag.filter(|t| !t.is_empty()),
            sticker_id: record.sticker_id,
        }
    }
}

// ============================================
// Requests
// ============================================

#[derive(Debug, Serialize)]
pub(crate) struct SignupRequest<'a> {
    pub name: &'a str,
    pub user_id: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub user_id: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChangePasswordRequest<'a> {
    pub current_password: &'a str,
    pub new_password: &'a str,
}

/// Body for creating or editing a diary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiaryRequest {
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
    pub one: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct MoodColorRequest<'a> {
    pub date: NaiveDate,
    pub color: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MoodTagRequest<'a> {
    pub date: NaiveDate,
    pub tag: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct StickerPlacementRequest<'a> {
    pub date: NaiveDate,
    pub color: &'a str,
    pub sticker_id: StickerId,
}

#[derive(Debug, Serialize)]
pub(crate) struct BuyStickerRequest {
    pub sticker_id: StickerId,
}

// ============================================
// Responses
// ============================================

/// Generic `{isSuccess, message}` acknowledgement
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default = "default_true", rename = "isSuccess")]
    pub is_success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// Successful login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiariesResponse {
    #[serde(default)]
    pub diaries: Vec<Diary>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DiaryResponse {
    pub diary: Diary,
}

/// Whether a diary exists for a date
#[derive(Debug, Clone, Deserialize)]
pub struct Availability {
    #[serde(default)]
    pub exists: bool,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CalendarResponse {
    #[serde(default = "default_true", rename = "isSuccess")]
    pub is_success: bool,
    #[serde(default)]
    pub data: Vec<CalendarRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StickersResponse {
    #[serde(default)]
    pub stickers: Vec<Sticker>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserInfoResponse {
    #[serde(default = "default_true", rename = "isSuccess")]
    pub is_success: bool,
    pub user: Option<User>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a sticker purchase
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseResponse {
    #[serde(default = "default_true", rename = "isSuccess")]
    pub is_success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Remaining balance, when the server reports it
    #[serde(default)]
    pub coins: Option<i64>,
}

/// Error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

fn default_true() -> bool {
    true
}

// ============================================
// Lenient field decoding
// ============================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Ids arrive as numbers or strings depending on the endpoint
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn deserialize_opt_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

/// Dates arrive as `YYYY-MM-DD` or as full ISO timestamps; keep the date part
fn deserialize_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_api_date(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_api_date(raw: &str) -> Result<NaiveDate, String> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {}", raw, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diary_decodes_numeric_id_and_timestamp() {
        let json = r#"{"id": 42, "date": "2024-03-10T00:00:00.000Z", "title": "t", "content": "c", "one": "ok"}"#;
        let diary: Diary = serde_json::from_str(json).unwrap();
        assert_eq!(diary.id, "42");
        assert_eq!(diary.date, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(diary.one_line.as_deref(), Some("ok"));
    }

    #[test]
    fn test_calendar_record_into_entry() {
        let json = r##"{"date": "2024-03-10", "color": "#FFABAB", "tag": ""}"##;
        let record: CalendarRecord = serde_json::from_str(json).unwrap();
        let entry = MoodEntry::from(record);
        assert_eq!(entry.color.as_deref(), Some("#FFABAB"));
        assert_eq!(entry.tag, None);
        assert_eq!(entry.sticker_id, None);
    }

    #[test]
    fn test_calendar_record_color_normalized() {
        let json = r##"{"date": "2024-03-10", "color": "#ffabab"}"##;
        let entry = MoodEntry::from(serde_json::from_str::<CalendarRecord>(json).unwrap());
        assert_eq!(entry.color.as_deref(), Some("#FFABAB"));

        for raw in ["transparent", "not-a-color", "  "] {
            let json = format!(r#"{{"date": "2024-03-10", "color": "{}", "tag": "calm"}}"#, raw);
            let entry = MoodEntry::from(serde_json::from_str::<CalendarRecord>(&json).unwrap());
            assert_eq!(entry.color, None);
            assert_eq!(entry.tag.as_deref(), Some("calm"));
        }
    }

    #[test]
    fn test_status_defaults_to_success() {
        let status: StatusResponse = serde_json::from_str("{}").unwrap();
        assert!(status.is_success);

        let status: StatusResponse =
            serde_json::from_str(r#"{"isSuccess": false, "message": "nope"}"#).unwrap();
        assert!(!status.is_success);
        assert_eq!(status.message.as_deref(), Some("nope"));
    }

    #[test]
    fn test_change_password_is_camel_case() {
        let body = ChangePasswordRequest {
            current_password: "old",
            new_password: "new",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["currentPassword"], "old");
        assert_eq!(json["newPassword"], "new");
    }

    #[test]
    fn test_parse_api_date_rejects_garbage() {
        assert!(parse_api_date("yesterday").is_err());
        assert!(parse_api_date("2024-02-30").is_err());
    }
}

//! Journaling API client
//!
//! Thin typed wrapper over the REST endpoints. Authenticated calls carry
//! `Authorization: Bearer <token>`; a 401 on those calls becomes
//! `ClientError::Unauthorized`. Nothing here retries.

use chrono::NaiveDate;
use reqwest::{multipart, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

use super::dto::*;
use super::error::{ClientError, ClientResult};
use crate::mood::StickerId;

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "http://localhost:3011";

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL (e.g., "http://localhost:3011")
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl From<&crate::config::ApiConfig> for ClientConfig {
    fn from(config: &crate::config::ApiConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            request_timeout_ms: config.request_timeout_secs * 1000,
        }
    }
}

/// REST client for the journaling backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with the given configuration
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("mood-diary/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    fn authed(&self, method: Method, path: &str, token: &str) -> ClientResult<RequestBuilder> {
        if token.trim().is_empty() {
            return Err(ClientError::MissingToken);
        }
        Ok(self.request(method, path).bearer_auth(token))
    }

    /// Send a request and return the successful response
    async fn dispatch(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
        authenticated: bool,
    ) -> ClientResult<Response> {
        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::debug!(request_id = %request_id, operation, "Sending API request");

        let response = builder
            .header("X-Request-Id", &request_id)
            .send()
            .await
            .map_err(ClientError::transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if authenticated && status.as_u16() == 401 {
            tracing::warn!(request_id = %request_id, operation, "Session rejected by server");
            return Err(ClientError::Unauthorized);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(text);

        tracing::warn!(
            request_id = %request_id,
            operation,
            status = status.as_u16(),
            error_message = %message,
            "API request failed"
        );

        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
        authenticated: bool,
    ) -> ClientResult<T> {
        let response = self.dispatch(builder, operation, authenticated).await?;
        let bytes = response.bytes().await.map_err(ClientError::transport)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ClientError::Decode(format!("{}: {}", operation, e)))
    }

    async fn send_empty(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
    ) -> ClientResult<()> {
        self.dispatch(builder, operation, true).await.map(|_| ())
    }

    // ============================================
    // Account
    // ============================================

    pub async fn signup(
        &self,
        name: &str,
        user_id: &str,
        password: &str,
    ) -> ClientResult<StatusResponse> {
        let body = SignupRequest {
            name,
            user_id,
            password,
        };
        self.send_json(self.request(Method::POST, "/signup").json(&body), "signup", false)
            .await
    }

    pub async fn login(&self, user_id: &str, password: &str) -> ClientResult<LoginResponse> {
        let body = LoginRequest { user_id, password };
        self.send_json(self.request(Method::POST, "/login").json(&body), "login", false)
            .await
    }

    pub async fn logout(&self, token: &str) -> ClientResult<()> {
        let builder = self
            .authed(Method::POST, "/logout", token)?
            .json(&serde_json::json!({}));
        self.send_empty(builder, "logout").await
    }

    pub async fn user_info(&self, token: &str) -> ClientResult<User> {
        let builder = self.authed(Method::GET, "/get-user-info", token)?;
        let response: UserInfoResponse = self.send_json(builder, "user_info", true).await?;

        match response.user {
            Some(user) if response.is_success => Ok(user),
            _ => Err(ClientError::Api {
                status: 200,
                message: response
                    .message
                    .unwrap_or_else(|| "user info unavailable".to_string()),
            }),
        }
    }

    pub async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> ClientResult<StatusResponse> {
        let body = ChangePasswordRequest {
            current_password,
            new_password,
        };
        let builder = self.authed(Method::POST, "/change-password", token)?.json(&body);
        self.send_json(builder, "change_password", true).await
    }

    /// Upload a profile picture as multipart field `profilePicture`
    pub async fn upload_profile_picture(
        &self,
        token: &str,
        path: &Path,
    ) -> ClientResult<StatusResponse> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "profile".to_string());

        let form = multipart::Form::new()
            .part("profilePicture", multipart::Part::bytes(bytes).file_name(file_name));

        let builder = self
            .authed(Method::POST, "/upload-profile-picture", token)?
            .multipart(form);
        self.send_json(builder, "upload_profile_picture", true).await
    }

    // ============================================
    // Diaries
    // ============================================

    pub async fn add_diary(&self, token: &str, diary: &DiaryRequest) -> ClientResult<Diary> {
        let builder = self.authed(Method::POST, "/add-diary", token)?.json(diary);
        self.send_json(builder, "add_diary", true).await
    }

    pub async fn list_diaries(&self, token: &str) -> ClientResult<Vec<Diary>> {
        let builder = self.authed(Method::GET, "/get-diaries", token)?;
        let response: DiariesResponse = self.send_json(builder, "list_diaries", true).await?;
        Ok(response.diaries)
    }

    pub async fn get_diary(&self, token: &str, id: &str) -> ClientResult<Diary> {
        let path = format!("/get-diary/{}", urlencoding::encode(id));
        let builder = self.authed(Method::GET, &path, token)?;
        let response: DiaryResponse = self.send_json(builder, "get_diary", true).await?;
        Ok(response.diary)
    }

    pub async fn edit_diary(
        &self,
        token: &str,
        id: &str,
        diary: &DiaryRequest,
    ) -> ClientResult<StatusResponse> {
        let path = format!("/edit-diary/{}", urlencoding::encode(id));
        let builder = self.authed(Method::PUT, &path, token)?.json(diary);
        self.send_json(builder, "edit_diary", true).await
    }

    pub async fn delete_diary(&self, token: &str, id: &str) -> ClientResult<()> {
        let path = format!("/delete-diary/{}", urlencoding::encode(id));
        let builder = self.authed(Method::DELETE, &path, token)?;
        self.send_empty(builder, "delete_diary").await
    }

    /// Whether a diary already exists for `date`
    pub async fn check_diary(&self, token: &str, date: NaiveDate) -> ClientResult<Availability> {
        let path = format!("/check-diary?date={}", date.format("%Y-%m-%d"));
        let builder = self.authed(Method::GET, &path, token)?;
        self.send_json(builder, "check_diary", true).await
    }

    // ============================================
    // Mood calendar
    // ============================================

    pub async fn fetch_calendar(&self, token: &str) -> ClientResult<Vec<CalendarRecord>> {
        let builder = self.authed(Method::GET, "/get-calendar", token)?;
        let response: CalendarResponse = self.send_json(builder, "fetch_calendar", true).await?;

        if !response.is_success {
            return Err(ClientError::Api {
                status: 200,
                message: response
                    .message
                    .unwrap_or_else(|| "calendar unavailable".to_string()),
            });
        }
        Ok(response.data)
    }

    pub async fn set_mood_color(&self, token: &str, date: NaiveDate, color: &str) -> ClientResult<()> {
        let builder = self
            .authed(Method::POST, "/set-mood-color", token)?
            .json(&MoodColorRequest { date, color });
        self.send_empty(builder, "set_mood_color").await
    }

    pub async fn set_mood_tag(&self, token: &str, date: NaiveDate, tag: &str) -> ClientResult<()> {
        let builder = self
            .authed(Method::POST, "/set-mood-tag", token)?
            .json(&MoodTagRequest { date, tag });
        self.send_empty(builder, "set_mood_tag").await
    }

    pub async fn place_sticker(
        &self,
        token: &str,
        date: NaiveDate,
        color: &str,
        sticker_id: StickerId,
    ) -> ClientResult<()> {
        let builder = self
            .authed(Method::POST, "/api/calendar", token)?
            .json(&StickerPlacementRequest {
                date,
                color,
                sticker_id,
            });
        self.send_empty(builder, "place_sticker").await
    }

    // ============================================
    // Sticker shop
    // ============================================

    pub async fn fetch_stickers(&self, token: &str) -> ClientResult<Vec<Sticker>> {
        let builder = self.authed(Method::GET, "/get-stickers", token)?;
        let response: StickersResponse = self.send_json(builder, "fetch_stickers", true).await?;
        Ok(response.stickers)
    }

    pub async fn fetch_user_stickers(&self, token: &str) -> ClientResult<Vec<Sticker>> {
        let builder = self.authed(Method::GET, "/get-user-stickers", token)?;
        let response: StickersResponse =
            self.send_json(builder, "fetch_user_stickers", true).await?;
        Ok(response.stickers)
    }

    pub async fn buy_sticker(
        &self,
        token: &str,
        sticker_id: StickerId,
    ) -> ClientResult<PurchaseResponse> {
        let builder = self
            .authed(Method::POST, "/buy-sticker", token)?
            .json(&BuyStickerRequest { sticker_id });
        self.send_json(builder, "buy_sticker", true).await
    }
}

//! Application context
//!
//! Owns everything a session needs: configuration, the API client, the local
//! cache, the mood store and the auth token. Created once at startup and
//! torn down on logout.

use chrono::{Local, NaiveDate};
use std::sync::Arc;

use crate::cache::{keys, LocalCache};
use crate::client::{ApiClient, ClientConfig, ClientError, User};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::mood::{LoadOutcome, MoodAttrs, MoodEntry, MoodStore};

/// Today's date in local time
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct AppContext {
    config: Config,
    client: ApiClient,
    cache: Arc<LocalCache>,
    moods: Arc<MoodStore>,
    token: Option<String>,
}

impl AppContext {
    /// Build the client, open the cache and hydrate the session from it
    pub fn open(config: Config) -> Result<Self> {
        let client = ApiClient::new(ClientConfig::from(&config.api))?;
        let cache = Arc::new(LocalCache::open(&config.cache.data_dir())?);

        let token = match cache.get::<String>(keys::TOKEN) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached token");
                None
            }
        };

        let moods = Arc::new(MoodStore::new(
            Arc::new(client.clone()),
            Arc::clone(&cache),
        ));

        tracing::debug!(
            api = %client.base_url(),
            cache = ?cache.path(),
            logged_in = token.is_some(),
            "Application context opened"
        );

        Ok(Self {
            config,
            client,
            cache,
            moods,
            token,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn moods(&self) -> &Arc<MoodStore> {
        &self.moods
    }

    /// Current token; `AuthRequired` when logged out
    pub fn token(&self) -> Result<&str> {
        self.token.as_deref().ok_or(Error::AuthRequired)
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    /// Profile cached at login or by the last profile fetch
    pub fn cached_user(&self) -> Option<User> {
        self.cache.get(keys::USER).ok().flatten()
    }

    /// Log in and persist the session
    ///
    /// Any previous session's moods are dropped first.
    pub async fn login(&mut self, user_id: &str, password: &str) -> Result<Option<User>> {
        let user_id = user_id.trim();
        if user_id.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "user id and password are required".to_string(),
            ));
        }

        let response = match self.client.login(user_id, password).await {
            Ok(response) => response,
            Err(ClientError::Api { status, message }) if (400..500).contains(&status) => {
                return Err(Error::Validation(if message.is_empty() {
                    "login failed".to_string()
                } else {
                    message
                }));
            }
            Err(e) => return Err(e.into()),
        };

        let token = response
            .token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::Validation(
                    response
                        .message
                        .clone()
                        .unwrap_or_else(|| "login failed".to_string()),
                )
            })?;

        self.moods.reset();
        self.cache.set(keys::TOKEN, &token)?;
        match &response.user {
            Some(user) => self.cache.set(keys::USER, user)?,
            None => {
                self.cache.remove(keys::USER)?;
            }
        }
        self.token = Some(token);

        tracing::info!(user_id, "Logged in");
        Ok(response.user)
    }

    /// End the session
    ///
    /// The remote logout is best effort; local state is always cleared.
    pub async fn logout(&mut self) -> Result<()> {
        if let Some(token) = self.token.take() {
            if let Err(e) = self.client.logout(&token).await {
                tracing::warn!(error = %e, "Remote logout failed; clearing local session anyway");
            }
        }

        self.moods.reset();
        self.cache.remove_all(&keys::SESSION)?;

        tracing::info!("Logged out");
        Ok(())
    }

    /// Drop a session the server rejected
    pub fn expire_session(&mut self) -> Result<()> {
        self.token = None;
        self.moods.reset();
        self.cache.remove_all(&keys::SESSION)?;
        tracing::info!("Session expired; local session cleared");
        Ok(())
    }

    /// Replace local moods with the server's
    pub async fn load_moods(&self) -> Result<LoadOutcome> {
        let token = self.token()?;
        self.moods.load(token).await
    }

    /// Set a day's mood; future dates are rejected
    pub async fn set_mood(&self, date: NaiveDate, attrs: MoodAttrs) -> Result<MoodEntry> {
        self.set_mood_on(date, attrs, today()).await
    }

    pub(crate) async fn set_mood_on(
        &self,
        date: NaiveDate,
        attrs: MoodAttrs,
        today: NaiveDate,
    ) -> Result<MoodEntry> {
        let token = self.token()?;
        if date > today {
            return Err(Error::Validation(format!(
                "cannot set a mood for a future date ({})",
                date
            )));
        }
        self.moods.set_mood(token, date, attrs).await
    }
}

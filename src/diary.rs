//! Diary entries
//!
//! One diary per date. Drafts are validated locally, then the server is
//! asked whether the date is still free before anything is written.

use chrono::NaiveDate;

use crate::client::{ApiClient, Diary, DiaryRequest};
use crate::context::{today, AppContext};
use crate::error::{Error, Result};

/// A diary being written or edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryDraft {
    pub date: NaiveDate,
    pub title: String,
    pub content: String,
    /// One-line review
    pub one_line: String,
}

impl DiaryDraft {
    pub fn new(date: NaiveDate, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            date,
            title: title.into(),
            content: content.into(),
            one_line: String::new(),
        }
    }

    pub fn one_line(mut self, one_line: impl Into<String>) -> Self {
        self.one_line = one_line.into();
        self
    }

    /// Draft pre-filled from an existing diary
    pub fn from_diary(diary: &Diary) -> Self {
        Self {
            date: diary.date,
            title: diary.title.clone(),
            content: diary.content.clone(),
            one_line: diary.one_line.clone().unwrap_or_default(),
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("title is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(Error::Validation("content is required".to_string()));
        }
        if self.date > today {
            return Err(Error::Validation(format!(
                "cannot write a diary for a future date ({})",
                self.date
            )));
        }
        Ok(())
    }

    fn to_request(&self) -> DiaryRequest {
        DiaryRequest {
            date: self.date,
            title: self.title.trim().to_string(),
            content: self.content.clone(),
            one: self.one_line.trim().to_string(),
        }
    }
}

/// Diary operations for the logged-in user
pub struct DiaryService<'a> {
    client: &'a ApiClient,
    token: &'a str,
}

impl<'a> DiaryService<'a> {
    pub fn new(client: &'a ApiClient, token: &'a str) -> Self {
        Self { client, token }
    }

    /// Service bound to the context's session; `AuthRequired` when logged out
    pub fn for_context(ctx: &'a AppContext) -> Result<Self> {
        Ok(Self::new(ctx.client(), ctx.token()?))
    }

    /// All diaries, newest first
    pub async fn list(&self) -> Result<Vec<Diary>> {
        let mut diaries = self.client.list_diaries(self.token).await?;
        diaries.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
        Ok(diaries)
    }

    pub async fn get(&self, id: &str) -> Result<Diary> {
        Ok(self.client.get_diary(self.token, id).await?)
    }

    pub async fn add(&self, draft: &DiaryDraft) -> Result<Diary> {
        self.add_on(draft, today()).await
    }

    pub async fn add_on(&self, draft: &DiaryDraft, today: NaiveDate) -> Result<Diary> {
        draft.validate(today)?;

        let status = match self.date_status(draft.date).await {
            Ok(status) => status,
            Err(err @ (Error::AuthRequired | Error::SessionExpired)) => return Err(err),
            Err(err) => {
                tracing::warn!(
                    date = %draft.date,
                    error = %err,
                    "Diary availability check failed; assuming date is free"
                );
                DateStatus::Free
            }
        };
        if let DateStatus::Taken(existing) = status {
            tracing::debug!(date = %draft.date, existing = ?existing, "Diary date already taken");
            return Err(Error::Validation(format!(
                "a diary has already been written for {}",
                draft.date
            )));
        }

        let diary = self.client.add_diary(self.token, &draft.to_request()).await?;
        tracing::info!(id = %diary.id, date = %diary.date, "Diary added");
        Ok(diary)
    }

    pub async fn edit(&self, id: &str, draft: &DiaryDraft) -> Result<()> {
        self.edit_on(id, draft, today()).await
    }

    pub async fn edit_on(&self, id: &str, draft: &DiaryDraft, today: NaiveDate) -> Result<()> {
        draft.validate(today)?;

        // A taken date with no id reported cannot be told apart from this diary
        if let DateStatus::Taken(Some(existing)) = self.date_status(draft.date).await? {
            if existing != id {
                return Err(Error::Validation(format!(
                    "another diary has already been written for {}",
                    draft.date
                )));
            }
        }

        let status = self
            .client
            .edit_diary(self.token, id, &draft.to_request())
            .await?;
        if !status.is_success {
            return Err(Error::Validation(
                status
                    .message
                    .unwrap_or_else(|| "diary could not be updated".to_string()),
            ));
        }

        tracing::info!(id, date = %draft.date, "Diary updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete_diary(self.token, id).await?;
        tracing::info!(id, "Diary deleted");
        Ok(())
    }

    async fn date_status(&self, date: NaiveDate) -> Result<DateStatus> {
        let availability = self.client.check_diary(self.token, date).await?;
        Ok(if availability.exists {
            DateStatus::Taken(availability.id.filter(|id| !id.is_empty()))
        } else {
            DateStatus::Free
        })
    }
}

/// Server's answer for one date
#[derive(Debug, Clone, PartialEq, Eq)]
enum DateStatus {
    Free,
    /// Occupied by the diary with this id, when the server says which
    Taken(Option<String>),
}

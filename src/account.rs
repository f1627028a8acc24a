//! Account management: sign up, profile, password and profile picture

use std::path::Path;

use crate::cache::{keys, LocalCache};
use crate::client::{ApiClient, ClientError, StatusResponse, User};
use crate::context::AppContext;
use crate::error::{Error, Result};

/// Sign-up form as entered by the user
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub name: String,
    pub user_id: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("name", &self.name),
            ("user id", &self.user_id),
            ("password", &self.password),
            ("password confirmation", &self.confirm_password),
        ];
        if let Some((field, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Error::Validation(format!("{} is required", field)));
        }
        if self.password != self.confirm_password {
            return Err(Error::Validation("passwords do not match".to_string()));
        }
        Ok(())
    }
}

/// Turn a `{isSuccess: false}` acknowledgement into a validation error
fn check_status(status: StatusResponse, fallback: &str) -> Result<Option<String>> {
    if status.is_success {
        Ok(status.message)
    } else {
        Err(Error::Validation(
            status.message.unwrap_or_else(|| fallback.to_string()),
        ))
    }
}

/// Create an account; does not log in
pub async fn signup(client: &ApiClient, form: &SignupForm) -> Result<Option<String>> {
    form.validate()?;

    let status = match client
        .signup(form.name.trim(), form.user_id.trim(), &form.password)
        .await
    {
        Ok(status) => status,
        Err(ClientError::Api { status, message }) if (400..500).contains(&status) => {
            return Err(Error::Validation(message));
        }
        Err(e) => return Err(e.into()),
    };

    let message = check_status(status, "sign up failed")?;
    tracing::info!(user_id = %form.user_id.trim(), "Account created");
    Ok(message)
}

/// Profile operations for the logged-in user
pub struct Account<'a> {
    client: &'a ApiClient,
    cache: &'a LocalCache,
    token: &'a str,
}

impl<'a> Account<'a> {
    pub fn new(client: &'a ApiClient, cache: &'a LocalCache, token: &'a str) -> Self {
        Self {
            client,
            cache,
            token,
        }
    }

    pub fn for_context(ctx: &'a AppContext) -> Result<Self> {
        Ok(Self::new(ctx.client(), ctx.cache(), ctx.token()?))
    }

    /// Fetch the profile and mirror it to the cache
    pub async fn profile(&self) -> Result<User> {
        let user = self.client.user_info(self.token).await?;
        if let Err(e) = self.cache.set(keys::USER, &user) {
            tracing::warn!(error = %e, "Failed to mirror profile to cache");
        }
        Ok(user)
    }

    pub async fn change_password(&self, current: &str, new: &str) -> Result<Option<String>> {
        if current.is_empty() || new.is_empty() {
            return Err(Error::Validation(
                "current and new password are required".to_string(),
            ));
        }

        let status = self.client.change_password(self.token, current, new).await?;
        let message = check_status(status, "password could not be changed")?;
        tracing::info!("Password changed");
        Ok(message)
    }

    /// Upload a new profile picture and refresh the cached profile
    pub async fn upload_profile_picture(&self, path: &Path) -> Result<Option<String>> {
        if !path.is_file() {
            return Err(Error::Validation(format!(
                "no such file: {}",
                path.display()
            )));
        }

        let status = self.client.upload_profile_picture(self.token, path).await?;
        let message = check_status(status, "profile picture upload failed")?;
        tracing::info!(path = %path.display(), "Profile picture uploaded");

        if let Err(e) = self.profile().await {
            tracing::warn!(error = %e, "Could not refresh profile after upload");
        }
        Ok(message)
    }
}

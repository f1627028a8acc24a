//! Sticker shop
//!
//! The catalogue comes from the server; the owned list is mirrored to the
//! local cache so the calendar can offer owned stickers offline.

use std::collections::BTreeSet;

use crate::cache::{keys, LocalCache};
use crate::client::{ApiClient, Sticker};
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::mood::StickerId;

/// Catalogue plus what the user owns
#[derive(Debug, Clone, Default)]
pub struct ShopView {
    pub stickers: Vec<Sticker>,
    pub owned: Vec<Sticker>,
}

impl ShopView {
    pub fn is_owned(&self, sticker_id: StickerId) -> bool {
        self.owned.iter().any(|s| s.sticker_id == sticker_id)
    }

    pub fn find(&self, sticker_id: StickerId) -> Option<&Sticker> {
        self.stickers.iter().find(|s| s.sticker_id == sticker_id)
    }

    pub fn owned_ids(&self) -> BTreeSet<StickerId> {
        self.owned.iter().map(|s| s.sticker_id).collect()
    }
}

/// Outcome of a purchase
#[derive(Debug, Clone)]
pub struct Purchase {
    pub sticker: Sticker,
    /// Remaining balance, when the server reports it
    pub coins: Option<i64>,
    pub message: Option<String>,
}

pub struct StickerShop<'a> {
    client: &'a ApiClient,
    cache: &'a LocalCache,
    token: &'a str,
}

impl<'a> StickerShop<'a> {
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

    /// Owned stickers as last mirrored to the cache
    pub fn cached_owned(&self) -> Vec<Sticker> {
        match self.cache.get(keys::USER_STICKERS) {
            Ok(owned) => owned.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached stickers");
                Vec::new()
            }
        }
    }

    /// Fetch the catalogue and the owned list
    pub async fn load(&self) -> Result<ShopView> {
        let stickers = self.client.fetch_stickers(self.token).await?;
        let owned = self.refresh_owned().await?;
        tracing::debug!(catalogue = stickers.len(), owned = owned.len(), "Loaded sticker shop");
        Ok(ShopView { stickers, owned })
    }

    /// Buy a sticker the user does not own yet
    pub async fn purchase(&self, view: &ShopView, sticker_id: StickerId) -> Result<Purchase> {
        let sticker = view
            .find(sticker_id)
            .cloned()
            .ok_or_else(|| Error::Validation(format!("unknown sticker {}", sticker_id)))?;
        if view.is_owned(sticker_id) {
            return Err(Error::Validation(format!(
                "sticker '{}' is already owned",
                sticker.name
            )));
        }

        let response = self.client.buy_sticker(self.token, sticker_id).await?;
        if !response.is_success {
            return Err(Error::Validation(
                response
                    .message
                    .unwrap_or_else(|| "purchase failed".to_string()),
            ));
        }

        self.refresh_owned().await?;
        tracing::info!(sticker_id, price = sticker.price, "Sticker purchased");

        Ok(Purchase {
            sticker,
            coins: response.coins,
            message: response.message,
        })
    }

    async fn refresh_owned(&self) -> Result<Vec<Sticker>> {
        let owned = self.client.fetch_user_stickers(self.token).await?;
        if let Err(e) = self.cache.set(keys::USER_STICKERS, &owned) {
            tracing::warn!(error = %e, "Failed to mirror owned stickers to cache");
        }
        Ok(owned)
    }
}

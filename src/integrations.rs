//! Linked platform credentials (`users/{uid}/integrations/{platform}`)

use chrono::Utc;

use crate::error::{Error, Result};
use crate::models::{Integration, Platform, TokenPayload};
use crate::store::{Change, Store, Subscription};

/// Reads and writes integration records
#[derive(Clone)]
pub struct IntegrationStore {
    store: Store,
}

impl IntegrationStore {
    /// Create an integration store over the shared store
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Shared store handle
    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    /// Upsert with merge semantics; `updated_at` is refreshed
    pub async fn persist(
        &self,
        user_id: &str,
        platform: Platform,
        payload: &TokenPayload,
    ) -> Result<Integration> {
        if payload.access_token.trim().is_empty() {
            return Err(Error::invalid("access token is empty"));
        }

        let integration = self
            .store
            .write(
                Change::Integration {
                    user_id: user_id.to_string(),
                    platform,
                },
                |db| db.upsert_integration(user_id, platform, payload, Utc::now()),
            )
            .await?;

        tracing::info!(user = %user_id, %platform, "integration saved");
        Ok(integration)
    }

    /// Delete the record. Deleting a missing record succeeds.
    pub async fn remove(&self, user_id: &str, platform: Platform) -> Result<()> {
        let existed = self
            .store
            .write(
                Change::Integration {
                    user_id: user_id.to_string(),
                    platform,
                },
                |db| db.delete_integration(user_id, platform),
            )
            .await?;

        if existed {
            tracing::info!(user = %user_id, %platform, "integration removed");
        }
        Ok(())
    }

    /// Get one integration
    pub async fn get(&self, user_id: &str, platform: Platform) -> Result<Option<Integration>> {
        self.store
            .read(|db| db.get_integration(user_id, platform))
            .await
    }

    /// All of a user's integrations
    pub async fn list(&self, user_id: &str) -> Result<Vec<Integration>> {
        self.store.read(|db| db.get_integrations(user_id)).await
    }

    /// Access token for publishing; [`Error::NotLinked`] when the integration
    /// is missing or expired
    pub async fn token(&self, user_id: &str, platform: Platform) -> Result<String> {
        match self.get(user_id, platform).await? {
            Some(integration) if !integration.is_expired(Utc::now()) => {
                Ok(integration.access_token)
            }
            Some(_) => {
                tracing::warn!(user = %user_id, %platform, "integration token expired");
                Err(Error::NotLinked(platform))
            }
            None => Err(Error::NotLinked(platform)),
        }
    }

    /// Live view of one integration; `None` while unlinked
    pub fn watch<C>(&self, user_id: &str, platform: Platform, on_change: C) -> Subscription
    where
        C: FnMut(Option<Integration>) + Send + 'static,
    {
        let watched = user_id.to_string();
        let user_id = user_id.to_string();
        self.store.watch(
            move |change| {
                matches!(change, Change::Integration { user_id: u, platform: p }
                    if *u == watched && *p == platform)
            },
            move |db| db.get_integration(&user_id, platform),
            on_change,
        )
    }
}

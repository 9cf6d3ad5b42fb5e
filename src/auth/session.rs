//! Signed-in session
//!
//! The session survives restarts by living in the encrypted credentials
//! file. Every other component gets its [`Actor`] from
//! [`SessionManager::require`].

use crate::error::{Error, Result};
use crate::models::Actor;
use crate::profile::ProfileStore;

use super::{IdentityProvider, Vault};

const SESSION_KEY: &str = "session";

/// Owns the current session
pub struct SessionManager<P> {
    provider: P,
    vault: Vault,
    profiles: ProfileStore,
    current: Option<Actor>,
}

impl<P: IdentityProvider> SessionManager<P> {
    /// Create a manager, restoring any saved session
    pub fn new(provider: P, vault: Vault, profiles: ProfileStore) -> Self {
        let current = match vault.get(SESSION_KEY) {
            Ok(Some(json)) => match serde_json::from_str::<Actor>(&json) {
                Ok(actor) => Some(actor),
                Err(e) => {
                    tracing::warn!("Discarding unreadable saved session: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Could not read saved session: {e}");
                None
            }
        };

        Self {
            provider,
            vault,
            profiles,
            current,
        }
    }

    /// Sign in, bootstrap the profile and remember the session
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Actor> {
        let actor = self.provider.sign_in(email, password).await?;
        self.profiles.ensure_profile(&actor).await?;
        self.vault.put(SESSION_KEY, &serde_json::to_string(&actor)?)?;

        tracing::info!(uid = %actor.uid, "session started");
        self.current = Some(actor.clone());
        Ok(actor)
    }

    /// Forget the session. Safe when already signed out.
    pub fn sign_out(&mut self) -> Result<()> {
        self.vault.remove(SESSION_KEY)?;
        if let Some(actor) = self.current.take() {
            tracing::info!(uid = %actor.uid, "session ended");
        }
        Ok(())
    }

    /// The signed-in actor, if any
    pub fn current(&self) -> Option<&Actor> {
        self.current.as_ref()
    }

    /// The signed-in actor, or [`Error::Unauthenticated`]
    pub fn require(&self) -> Result<&Actor> {
        self.current.as_ref().ok_or(Error::Unauthenticated)
    }

    /// Profile store used for bootstrap
    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }
}

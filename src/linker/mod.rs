//! Integration linker
//!
//! Connects a signed-in user to an external platform and keeps the resulting
//! credential in `users/{uid}/integrations/{platform}`.
//!
//! ```text
//!   Meta (popup)                         TikTok (redirect)
//!   ────────────                         ─────────────────
//!   begin → Popup{app_id, scopes}        begin → pending{state, verifier}
//!        │                                     → Redirect{url}
//!   SDK JSON ──► on_provider_response          │  browser round trip
//!        │                               callback URL ──► complete_authorization
//!        ▼                                     │  state check, code exchange
//!   persist_integration ◄──────────────────────┘
//! ```

pub mod exchange;
pub mod oauth;
pub mod provider;

use chrono::Utc;

use crate::config::{MetaConfig, TikTokConfig};
use crate::db::PendingAuthorization;
use crate::error::{Error, Result};
use crate::integrations::IntegrationStore;
use crate::models::{Actor, Integration, LinkFlow, Platform, TokenPayload};
use crate::store::Subscription;

pub use exchange::{TikTokTokenExchange, TokenExchange};
pub use oauth::CallbackParams;
pub use provider::ProviderResponse;

/// What the caller must do to let the user authorize
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationRequest {
    /// Send the browser to `url`
    Redirect {
        /// Provider authorization page
        url: String,
    },
    /// Open the provider SDK popup with these parameters
    Popup {
        /// Meta app id
        app_id: String,
        /// Permissions to request
        scopes: Vec<String>,
    },
}

/// Result of handling a redirect callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The URL carried no authorization result
    NoOp,
    /// The account was linked
    Linked {
        /// Stored integration
        integration: Integration,
        /// Callback URL with OAuth parameters removed
        clean_url: String,
    },
}

/// Result of a popup login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The account was linked
    Linked(Integration),
    /// The user closed the popup
    Cancelled,
}

/// Explicit answer to "disconnect this account?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Go ahead
    Confirmed,
    /// Keep the link
    Declined,
}

/// Drives both linking flows
pub struct IntegrationLinker<X> {
    integrations: IntegrationStore,
    meta: MetaConfig,
    tiktok: TikTokConfig,
    exchange: X,
}

impl<X: TokenExchange> IntegrationLinker<X> {
    /// Create a linker
    pub const fn new(
        integrations: IntegrationStore,
        meta: MetaConfig,
        tiktok: TikTokConfig,
        exchange: X,
    ) -> Self {
        Self {
            integrations,
            meta,
            tiktok,
            exchange,
        }
    }

    /// Start linking `platform` for `user`.
    ///
    /// For redirect platforms the pending state is stored before the URL is
    /// returned; a second call replaces the first attempt.
    pub async fn begin_authorization(
        &self,
        user: &Actor,
        platform: Platform,
    ) -> Result<AuthorizationRequest> {
        match platform.flow() {
            LinkFlow::Popup => Ok(AuthorizationRequest::Popup {
                app_id: self.meta.app_id()?.to_string(),
                scopes: self.meta.scopes.clone(),
            }),
            LinkFlow::Redirect => {
                let client = self.tiktok.client()?;
                let state = oauth::new_state();
                let verifier = oauth::new_code_verifier();
                let url = oauth::authorize_url(
                    &self.tiktok.auth_url,
                    &client,
                    &state,
                    &oauth::code_challenge(&verifier),
                )?;

                let pending = PendingAuthorization {
                    user_id: user.uid.clone(),
                    platform,
                    state,
                    code_verifier: Some(verifier),
                    created_at: Utc::now(),
                };
                self.integrations
                    .store()
                    .write_silent(|db| db.put_pending_authorization(&pending))
                    .await?;

                tracing::info!(user = %user.uid, %platform, "authorization started");
                Ok(AuthorizationRequest::Redirect { url })
            }
        }
    }

    /// Handle the URL the provider redirected back to.
    ///
    /// TikTok is the only redirect platform. The pending attempt is consumed
    /// whatever the outcome, except for [`CallbackOutcome::NoOp`] where
    /// nothing is touched.
    pub async fn complete_authorization(
        &self,
        user: &Actor,
        callback_url: &str,
    ) -> Result<CallbackOutcome> {
        let platform = Platform::TikTok;
        let params = CallbackParams::parse(callback_url);
        if params.is_empty() {
            tracing::debug!("callback URL carries no authorization result");
            return Ok(CallbackOutcome::NoOp);
        }

        let uid = user.uid.clone();
        let pending = self
            .integrations
            .store()
            .write_silent(|db| db.take_pending_authorization(&uid, platform))
            .await?;

        let Some(pending) = pending else {
            tracing::warn!(user = %user.uid, %platform, "callback without a pending authorization");
            return Err(Error::CsrfMismatch(platform));
        };
        if !oauth::state_is_fresh(pending.created_at, Utc::now()) {
            tracing::warn!(user = %user.uid, %platform, "authorization state expired");
            return Err(Error::CsrfMismatch(platform));
        }
        if params.state.as_deref() != Some(pending.state.as_str()) {
            tracing::warn!(user = %user.uid, %platform, "authorization state mismatch");
            return Err(Error::CsrfMismatch(platform));
        }

        if let Some(error) = params.error {
            return Err(Error::AuthorizationFailed {
                platform,
                reason: params.error_description.unwrap_or(error),
            });
        }
        let code = params.code.ok_or_else(|| Error::AuthorizationFailed {
            platform,
            reason: "callback has no code".to_string(),
        })?;

        let payload = self
            .exchange
            .exchange(&code, pending.code_verifier.as_deref())
            .await?;
        let integration = self.persist_integration(user, platform, &payload).await?;

        Ok(CallbackOutcome::Linked {
            integration,
            clean_url: oauth::sanitize_callback_url(callback_url),
        })
    }

    /// Handle what the popup SDK returned
    pub async fn on_provider_response(
        &self,
        user: &Actor,
        platform: Platform,
        response: ProviderResponse,
    ) -> Result<LinkOutcome> {
        if platform.flow() != LinkFlow::Popup {
            return Err(Error::invalid(format!("{platform} does not use the popup flow")));
        }

        match response {
            ProviderResponse::Authorized(payload) => {
                let integration = self.persist_integration(user, platform, &payload).await?;
                Ok(LinkOutcome::Linked(integration))
            }
            ProviderResponse::Cancelled => {
                tracing::info!(user = %user.uid, %platform, "login popup cancelled");
                Ok(LinkOutcome::Cancelled)
            }
            ProviderResponse::Failed(reason) => {
                Err(Error::AuthorizationFailed { platform, reason })
            }
        }
    }

    /// Store a credential; fields missing from `payload` keep their values
    pub async fn persist_integration(
        &self,
        user: &Actor,
        platform: Platform,
        payload: &TokenPayload,
    ) -> Result<Integration> {
        self.integrations.persist(&user.uid, platform, payload).await
    }

    /// Remove a link after explicit confirmation
    pub async fn disconnect(
        &self,
        user: &Actor,
        platform: Platform,
        confirmation: Confirmation,
    ) -> Result<()> {
        if confirmation != Confirmation::Confirmed {
            return Err(Error::invalid("disconnect was not confirmed"));
        }
        self.integrations.remove(&user.uid, platform).await
    }

    /// Live view of one integration
    pub fn watch_integration<C>(&self, user: &Actor, platform: Platform, on_change: C) -> Subscription
    where
        C: FnMut(Option<Integration>) + Send + 'static,
    {
        self.integrations.watch(&user.uid, platform, on_change)
    }

    /// Token the publisher should use
    pub async fn integration_token(&self, user: &Actor, platform: Platform) -> Result<String> {
        self.integrations.token(&user.uid, platform).await
    }

    /// Underlying integration store
    pub const fn integrations(&self) -> &IntegrationStore {
        &self.integrations
    }
}

//! Service wiring
//!
//! Builds every component from a [`Config`] over one shared [`Store`].

use reqwest::Client;

use crate::api::{MetaPublisher, PlatformClients, TikTokPublisher};
use crate::auth::{HttpIdentityProvider, SessionManager, Vault};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::generate::{BrandImageGenerator, ContentGateway, TextBackend};
use crate::integrations::IntegrationStore;
use crate::leads::LeadStore;
use crate::linker::{IntegrationLinker, TikTokTokenExchange};
use crate::posts::PostStore;
use crate::profile::ProfileStore;
use crate::publisher::Publisher;
use crate::rpc::Functions;
use crate::store::Store;

/// Gateway with the configured backends
pub type Gateway = ContentGateway<TextBackend, BrandImageGenerator>;

/// Everything the dashboard talks to
pub struct Services {
    /// Loaded configuration
    pub config: Config,
    /// Shared document store
    pub store: Store,
    /// `users/{uid}`
    pub profiles: ProfileStore,
    /// `users/{uid}/integrations/{platform}`
    pub integrations: IntegrationStore,
    /// Popup and redirect linking
    pub linker: IntegrationLinker<TikTokTokenExchange>,
    /// `posts/{postId}`
    pub posts: PostStore,
    /// `leads/{leadId}`
    pub leads: LeadStore,
    /// Caption and image generation
    pub gateway: Gateway,
    /// Platform publishing
    pub publisher: Publisher<PlatformClients>,
}

impl Services {
    /// Open the default database and wire everything up
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let db = Database::open(config.store.auto_create_indexes)?;
        Ok(Self::with_database(config, db)?)
    }

    /// Wire everything over an already opened database
    pub fn with_database(config: Config, db: Database) -> Result<Self> {
        let store = Store::new(db);
        let profiles = ProfileStore::new(store.clone());
        let integrations = IntegrationStore::new(store.clone());
        let posts = PostStore::new(store.clone());
        let leads = LeadStore::new(store.clone());

        let request_timeout = config.publisher.request_timeout();
        let linker = IntegrationLinker::new(
            integrations.clone(),
            config.meta.clone(),
            config.tiktok.clone(),
            TikTokTokenExchange::from_config(&config.tiktok, request_timeout)?,
        );

        let gateway = ContentGateway::new(
            TextBackend::from_config(&config.generation)?,
            BrandImageGenerator::new(config.generation.image_template.clone()),
            config.generation.timeout(),
        );

        let http = Client::builder().timeout(request_timeout).build()?;
        let clients = PlatformClients {
            meta: MetaPublisher::new(http.clone(), &config.meta.graph_url),
            tiktok: TikTokPublisher::new(http, &config.tiktok.api_url),
        };
        let publisher = Publisher::new(
            posts.clone(),
            integrations.clone(),
            clients,
            &config.publisher,
        );

        Ok(Self {
            config,
            store,
            profiles,
            integrations,
            linker,
            posts,
            leads,
            gateway,
            publisher,
        })
    }

    /// Session manager backed by the configured identity provider and the
    /// default credentials file
    pub fn session(&self) -> anyhow::Result<SessionManager<HttpIdentityProvider>> {
        let provider = HttpIdentityProvider::from_config(&self.config.identity)?;
        Ok(SessionManager::new(
            provider,
            Vault::open_default()?,
            self.profiles.clone(),
        ))
    }

    /// Callable functions bound to these services
    pub const fn functions(&self) -> Functions<'_, TextBackend, BrandImageGenerator, PlatformClients> {
        Functions::new(&self.gateway, &self.publisher, &self.posts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCipher;
    use crate::models::Actor;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_wiring_without_credentials() {
        let dir = tempdir().unwrap();
        let db = Database::open_path(
            &dir.path().join("svc.sqlite"),
            TokenCipher::from_key([9u8; 32]),
            true,
        )
        .unwrap();

        let services = Services::with_database(Config::default(), db).unwrap();
        let actor = Actor::new("u1", "a@example.com", "jwt");

        // No generation key configured: offline captions still work
        let value = services
            .functions()
            .call(
                "generateContent",
                Some(&actor),
                serde_json::json!({ "topic": "DOA", "platform": "FACEBOOK" }),
            )
            .await
            .unwrap();
        assert_eq!(value["success"], serde_json::json!(true));

        assert!(services.integrations.list("u1").await.unwrap().is_empty());
    }
}

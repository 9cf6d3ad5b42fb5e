//! Publisher: pushes due posts to their platforms
//!
//! Each attempt loads the owner's integration token, then calls the
//! platform API. Transient failures (network, 429, 5xx) are retried with
//! exponential backoff; anything else settles the post as `FAILED` at once.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, sleep};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::PublishApi;
use crate::config::PublisherConfig;
use crate::error::{Error, Result};
use crate::integrations::IntegrationStore;
use crate::models::{Platform, PostStatus, ScheduledPost};
use crate::posts::PostStore;

/// Outcome of one post in a `publish_due` sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Post id
    pub post_id: Uuid,
    /// Target platform
    pub platform: Platform,
    /// Status after the attempt
    pub status: PostStatus,
    /// External id or failure reason
    pub detail: Option<String>,
}

/// Publishes scheduled posts
pub struct Publisher<A> {
    posts: PostStore,
    integrations: IntegrationStore,
    api: A,
    max_attempts: u32,
    backoff_base: Duration,
}

impl<A: PublishApi> Publisher<A> {
    /// Create a publisher with the retry settings from `config`
    pub fn new(
        posts: PostStore,
        integrations: IntegrationStore,
        api: A,
        config: &PublisherConfig,
    ) -> Self {
        Self {
            posts,
            integrations,
            api,
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        }
    }

    /// Delay before retrying after `attempt` (1-based): base, 2×base, 4×base...
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Publish one post now.
    ///
    /// A post that already settled is returned as is, and so is one another
    /// publisher has claimed. A missing or expired integration marks the
    /// post `FAILED` and returns [`Error::NotLinked`]. API failures settle
    /// the post as `FAILED` and return it.
    pub async fn publish(&self, post_id: Uuid) -> Result<ScheduledPost> {
        let post = self
            .posts
            .get(post_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("posts/{post_id}")))?;
        if post.status.is_terminal() {
            return Ok(post);
        }
        if !self.posts.claim(post_id).await? {
            info!(id = %post_id, "already being published elsewhere");
            return self
                .posts
                .get(post_id)
                .await?
                .ok_or_else(|| Error::NotFound(format!("posts/{post_id}")));
        }

        let result = self.publish_claimed(&post).await;
        if result.is_err() {
            if let Err(e) = self.posts.release(post_id).await {
                warn!(id = %post_id, "could not release publish claim: {e}");
            }
        }
        result
    }

    async fn publish_claimed(&self, post: &ScheduledPost) -> Result<ScheduledPost> {
        let token = match self.integrations.token(&post.user_id, post.platform).await {
            Ok(token) => token,
            Err(e @ Error::NotLinked(_)) => {
                warn!(id = %post.id, platform = %post.platform, "cannot publish: account not linked");
                self.posts.mark_failed(post.id, &format!("not-linked: {e}")).await?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        for attempt in 1..=self.max_attempts {
            match self.api.publish(&token, post).await {
                Ok(receipt) => {
                    if attempt > 1 {
                        info!(id = %post.id, "published on attempt {attempt}");
                    }
                    return self.posts.mark_posted(post.id, Some(&receipt.external_id)).await;
                }
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        id = %post.id,
                        platform = %post.platform,
                        "transient error (attempt {attempt}/{}): {e}. Retrying in {delay:?}",
                        self.max_attempts
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    warn!(id = %post.id, platform = %post.platform, "publish failed after {attempt} attempt(s): {e}");
                    return self.posts.mark_failed(post.id, &e.to_string()).await;
                }
            }
        }

        Err(Error::Internal(format!("publish loop for {} ended without an outcome", post.id)))
    }

    /// Publish every post due at `now`, oldest first
    pub async fn publish_due(&self, now: DateTime<Utc>) -> Result<Vec<PublishReport>> {
        let due = self.posts.due(now).await?;
        let mut reports = Vec::with_capacity(due.len());

        for post in due {
            let report = match self.publish(post.id).await {
                Ok(settled) => PublishReport {
                    post_id: settled.id,
                    platform: settled.platform,
                    status: settled.status,
                    detail: settled.external_id.or(settled.failure_reason),
                },
                Err(e) => {
                    let status = self
                        .posts
                        .get(post.id)
                        .await
                        .ok()
                        .flatten()
                        .map_or(PostStatus::Scheduled, |p| p.status);
                    PublishReport {
                        post_id: post.id,
                        platform: post.platform,
                        status,
                        detail: Some(e.to_string()),
                    }
                }
            };
            reports.push(report);
        }

        Ok(reports)
    }

    /// Sweep for due posts every `interval` until `shutdown` resolves
    pub async fn run(&self, interval: Duration, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(?interval, "publisher running");
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("publisher stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    match self.publish_due(Utc::now()).await {
                        Ok(reports) => {
                            for r in reports {
                                info!(id = %r.post_id, platform = %r.platform, status = %r.status, "swept");
                            }
                        }
                        Err(e) => warn!("sweep failed: {e}"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PublishError, PublishReceipt};
    use crate::auth::TokenCipher;
    use crate::db::Database;
    use crate::models::{Actor, Draft, Platform, Topic, TokenPayload};
    use crate::store::Store;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Replays scripted results and counts calls
    struct ScriptedApi {
        results: Mutex<Vec<std::result::Result<PublishReceipt, PublishError>>>,
        calls: Mutex<u32>,
        latency: Duration,
    }

    impl ScriptedApi {
        fn new(mut results: Vec<std::result::Result<PublishReceipt, PublishError>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: Mutex::new(0),
                latency: Duration::ZERO,
            }
        }

        fn slow(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    impl PublishApi for ScriptedApi {
        async fn publish(
            &self,
            _token: &str,
            _post: &ScheduledPost,
        ) -> std::result::Result<PublishReceipt, PublishError> {
            *self.calls.lock().unwrap() += 1;
            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(PublishError::Rejected("script exhausted".into())))
        }
    }

    fn ok(id: &str) -> std::result::Result<PublishReceipt, PublishError> {
        Ok(PublishReceipt {
            external_id: id.to_string(),
        })
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        posts: PostStore,
        integrations: IntegrationStore,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let db = Database::open_path(
            &dir.path().join("pub.sqlite"),
            TokenCipher::from_key([3u8; 32]),
            true,
        )
        .unwrap();
        let store = Store::new(db);
        Fixture {
            _dir: dir,
            posts: PostStore::new(store.clone()),
            integrations: IntegrationStore::new(store),
        }
    }

    fn publisher(f: &Fixture, api: ScriptedApi) -> Publisher<ScriptedApi> {
        let config = PublisherConfig {
            backoff_base_ms: 1,
            ..PublisherConfig::default()
        };
        Publisher::new(f.posts.clone(), f.integrations.clone(), api, &config)
    }

    async fn scheduled(f: &Fixture) -> ScheduledPost {
        let actor = Actor::new("u1", "mitra@example.com", "jwt");
        let now = Utc::now();
        f.posts
            .schedule_at(
                &actor,
                Draft {
                    topic: Topic::Promo,
                    platform: Platform::Facebook,
                    content: "Promo".into(),
                    image_url: None,
                },
                now,
                now,
            )
            .await
            .unwrap()
    }

    async fn link(f: &Fixture) {
        f.integrations
            .persist("u1", Platform::Facebook, &TokenPayload::new("fb-token"))
            .await
            .unwrap();
    }

    #[test]
    fn test_backoff_doubles() {
        let f = fixture();
        let mut p = publisher(&f, ScriptedApi::new(vec![]));
        p.backoff_base = Duration::from_secs(1);
        assert_eq!(p.backoff(1), Duration::from_secs(1));
        assert_eq!(p.backoff(2), Duration::from_secs(2));
        assert_eq!(p.backoff(3), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_success_marks_posted() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        let p = publisher(&f, ScriptedApi::new(vec![ok("fb-1")]));

        let settled = p.publish(post.id).await.unwrap();
        assert_eq!(settled.status, PostStatus::Posted);
        assert_eq!(settled.external_id.as_deref(), Some("fb-1"));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        let api = ScriptedApi::new(vec![
            Err(PublishError::Server("502".into())),
            Err(PublishError::Network("reset".into())),
            ok("fb-2"),
        ]);
        let p = publisher(&f, api);

        let settled = p.publish(post.id).await.unwrap();
        assert_eq!(settled.status, PostStatus::Posted);
        assert_eq!(p.api.calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_fails_immediately() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        let p = publisher(&f, ScriptedApi::new(vec![Err(PublishError::Rejected("too long".into()))]));

        let settled = p.publish(post.id).await.unwrap();
        assert_eq!(settled.status, PostStatus::Failed);
        assert_eq!(settled.failure_reason.as_deref(), Some("rejected: too long"));
        assert_eq!(p.api.calls(), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        let api = ScriptedApi::new(vec![
            Err(PublishError::RateLimited("a".into())),
            Err(PublishError::RateLimited("b".into())),
            Err(PublishError::RateLimited("c".into())),
        ]);
        let p = publisher(&f, api);

        let settled = p.publish(post.id).await.unwrap();
        assert_eq!(settled.status, PostStatus::Failed);
        assert_eq!(settled.failure_reason.as_deref(), Some("rate-limited: c"));
        assert_eq!(p.api.calls(), 3);
    }

    #[tokio::test]
    async fn test_not_linked_marks_failed() {
        let f = fixture();
        let post = scheduled(&f).await;
        let p = publisher(&f, ScriptedApi::new(vec![ok("never")]));

        let err = p.publish(post.id).await.unwrap_err();
        assert!(matches!(err, Error::NotLinked(Platform::Facebook)));
        assert_eq!(p.api.calls(), 0);

        let stored = f.posts.get(post.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PostStatus::Failed);
        assert!(stored.failure_reason.unwrap().starts_with("not-linked"));
    }

    #[tokio::test]
    async fn test_settled_post_is_left_alone() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        f.posts.mark_posted(post.id, Some("earlier")).await.unwrap();
        let p = publisher(&f, ScriptedApi::new(vec![ok("again")]));

        let settled = p.publish(post.id).await.unwrap();
        assert_eq!(settled.external_id.as_deref(), Some("earlier"));
        assert_eq!(p.api.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_publishes_send_once() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        let api = ScriptedApi::new(vec![ok("fb-once"), ok("fb-twice")]).slow(Duration::from_millis(50));
        let p = publisher(&f, api);

        let (a, b) = tokio::join!(p.publish(post.id), p.publish(post.id));
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(p.api.calls(), 1);

        let statuses = [a.status, b.status];
        assert!(statuses.contains(&PostStatus::Posted));
        assert!(statuses.contains(&PostStatus::Scheduled));

        let stored = f.posts.get(post.id).await.unwrap().unwrap();
        assert_eq!(stored.external_id.as_deref(), Some("fb-once"));

        // Settled now, so a later call does nothing
        p.publish(post.id).await.unwrap();
        assert_eq!(p.api.calls(), 1);
    }

    #[tokio::test]
    async fn test_released_claim_can_publish() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        assert!(f.posts.claim(post.id).await.unwrap());
        f.posts.release(post.id).await.unwrap();

        let p = publisher(&f, ScriptedApi::new(vec![ok("fb-4")]));
        let settled = p.publish(post.id).await.unwrap();
        assert_eq!(settled.status, PostStatus::Posted);
    }

    #[tokio::test]
    async fn test_publish_due_reports() {
        let f = fixture();
        link(&f).await;
        let post = scheduled(&f).await;
        let p = publisher(&f, ScriptedApi::new(vec![ok("fb-3")]));

        let reports = p.publish_due(Utc::now() + ChronoDuration::seconds(1)).await.unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].post_id, post.id);
        assert_eq!(reports[0].status, PostStatus::Posted);
        assert!(p.publish_due(Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture();
        let p = publisher(&f, ScriptedApi::new(vec![]));
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(2),
            p.run(Duration::from_millis(10), sleep(Duration::from_millis(50))),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}

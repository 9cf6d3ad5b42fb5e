//! Scheduled post store (`posts/{postId}`)

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::POSTS_BY_USER_INDEX;
use crate::error::{Error, Result};
use crate::models::{Actor, Draft, PostStatus, ScheduledPost};
use crate::store::{Change, Store, Subscription};

/// A publish claim older than this is treated as abandoned
pub const CLAIM_TTL_MINUTES: i64 = 10;

/// Creates, lists and settles scheduled posts
#[derive(Clone)]
pub struct PostStore {
    store: Store,
}

impl PostStore {
    /// Create a post store over the shared store
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Commit a draft to a publish time
    pub async fn schedule(
        &self,
        user: &Actor,
        draft: Draft,
        when: DateTime<Utc>,
    ) -> Result<ScheduledPost> {
        self.schedule_at(user, draft, when, Utc::now()).await
    }

    /// [`PostStore::schedule`] against an explicit clock
    pub async fn schedule_at(
        &self,
        user: &Actor,
        draft: Draft,
        when: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ScheduledPost> {
        if when < now {
            return Err(Error::InvalidSchedule(when));
        }
        if draft.content.trim().is_empty() {
            return Err(Error::invalid("post content is empty"));
        }

        let post = ScheduledPost::new(&user.uid, draft, when);
        self.store
            .write(
                Change::Posts {
                    user_id: user.uid.clone(),
                },
                |db| db.insert_post(&post),
            )
            .await?;

        tracing::info!(id = %post.id, platform = %post.platform, at = %post.scheduled_at, "post scheduled");
        Ok(post)
    }

    /// A post by id
    pub async fn get(&self, id: Uuid) -> Result<Option<ScheduledPost>> {
        self.store.read(|db| db.get_post(id)).await
    }

    /// A user's posts, newest first
    pub async fn list_for_user(&self, user: &Actor) -> Result<Vec<ScheduledPost>> {
        self.store.read(|db| db.get_posts_for_user(&user.uid)).await
    }

    /// Posts whose publish time has come
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
        self.store.read(|db| db.get_due_posts(now)).await
    }

    /// Live list of a user's posts, newest first.
    ///
    /// Fails up front with [`Error::QueryRequiresIndex`] when the composite
    /// index backing the query does not exist.
    pub async fn watch_for_user<C>(&self, user: &Actor, on_change: C) -> Result<Subscription>
    where
        C: FnMut(Vec<ScheduledPost>) + Send + 'static,
    {
        let has_index = self.store.read(|db| db.has_index(POSTS_BY_USER_INDEX)).await?;
        if !has_index {
            // Surface the exact statement via the query itself
            self.list_for_user(user).await?;
        }

        let watched = user.uid.clone();
        let uid = user.uid.clone();
        Ok(self.store.watch(
            move |change| matches!(change, Change::Posts { user_id } if *user_id == watched),
            move |db| db.get_posts_for_user(&uid),
            on_change,
        ))
    }

    /// Record a successful publish. A post that already settled is returned
    /// unchanged.
    pub async fn mark_posted(&self, id: Uuid, external_id: Option<&str>) -> Result<ScheduledPost> {
        self.finish(id, PostStatus::Posted, None, external_id).await
    }

    /// Record a failed publish. A post that already settled is returned
    /// unchanged.
    pub async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<ScheduledPost> {
        self.finish(id, PostStatus::Failed, Some(reason), None).await
    }

    /// Take the exclusive right to publish a scheduled post. Returns `false`
    /// when the post settled or another publisher holds a live claim.
    pub async fn claim(&self, id: Uuid) -> Result<bool> {
        let now = Utc::now();
        let stale_before = now - chrono::Duration::minutes(CLAIM_TTL_MINUTES);
        self.store
            .write_silent(|db| db.claim_post(id, now, stale_before))
            .await
    }

    /// Give a claim back without settling the post
    pub async fn release(&self, id: Uuid) -> Result<()> {
        self.store.write_silent(|db| db.release_post_claim(id)).await
    }

    async fn finish(
        &self,
        id: Uuid,
        status: PostStatus,
        reason: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<ScheduledPost> {
        let post = self.require(id).await?;
        if post.status.is_terminal() {
            tracing::debug!(%id, status = %post.status, "post already settled");
            return Ok(post);
        }

        self.store
            .write(
                Change::Posts {
                    user_id: post.user_id.clone(),
                },
                |db| db.finish_post(id, status, reason, external_id),
            )
            .await?;

        let settled = self.require(id).await?;
        tracing::info!(%id, status = %settled.status, "post settled");
        Ok(settled)
    }

    /// Delete a post that has not been published. Returns whether it was
    /// removed; settled posts are kept.
    pub async fn cancel(&self, user: &Actor, id: Uuid) -> Result<bool> {
        let post = self.require(id).await?;
        if post.user_id != user.uid {
            return Err(Error::NotFound(format!("posts/{id}")));
        }

        self.store
            .write(
                Change::Posts {
                    user_id: post.user_id,
                },
                |db| db.delete_scheduled_post(id),
            )
            .await
    }

    async fn require(&self, id: Uuid) -> Result<ScheduledPost> {
        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("posts/{id}")))
    }
}

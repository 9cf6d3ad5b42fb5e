//! Shared document store with a change feed
//!
//! Every component holds a clone of [`Store`]. Writes go through
//! [`Store::write`], which announces a [`Change`] on a broadcast channel once
//! the write has landed. Live subscriptions are tokio tasks that re-run their
//! query whenever a matching change arrives.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio::task::AbortHandle;

use crate::db::Database;
use crate::error::Result;
use crate::models::Platform;

const CHANGE_FEED_CAPACITY: usize = 256;

/// Which document (or collection) a write touched
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// `users/{uid}`
    Profile(String),
    /// `users/{uid}/integrations/{platform}`
    Integration {
        /// Owning user
        user_id: String,
        /// Platform
        platform: Platform,
    },
    /// Some post owned by this user
    Posts {
        /// Owning user
        user_id: String,
    },
    /// `leads`
    Leads,
}

/// Handle to the shared database plus its change feed
#[derive(Clone)]
pub struct Store {
    db: Arc<Mutex<Database>>,
    changes: broadcast::Sender<Change>,
}

impl Store {
    /// Wrap an open database
    pub fn new(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    /// Run a read against the database
    pub async fn read<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self.db.lock().await;
        f(&db)
    }

    /// Run a write and announce `change` if it succeeded
    pub async fn write<T>(
        &self,
        change: Change,
        f: impl FnOnce(&Database) -> Result<T>,
    ) -> Result<T> {
        let value = {
            let db = self.db.lock().await;
            f(&db)?
        };
        // No receivers just means nobody is watching
        let _ = self.changes.send(change);
        Ok(value)
    }

    /// Run a write on data no live query watches
    pub async fn write_silent<T>(&self, f: impl FnOnce(&Database) -> Result<T>) -> Result<T> {
        let db = self.db.lock().await;
        f(&db)
    }

    /// Start a live query.
    ///
    /// `query` runs once immediately and again after every change accepted by
    /// `matches` (and after the feed lagged). Each successful result is handed
    /// to `on_change` without the database lock held. Failed re-reads are
    /// logged and skipped.
    pub fn watch<T, M, Q, C>(&self, matches: M, query: Q, mut on_change: C) -> Subscription
    where
        T: Send + 'static,
        M: Fn(&Change) -> bool + Send + Sync + 'static,
        Q: Fn(&Database) -> Result<T> + Send + Sync + 'static,
        C: FnMut(T) + Send + 'static,
    {
        // Subscribe before the first read so no write slips between them
        let mut rx = self.changes.subscribe();
        let store = self.clone();

        let task = tokio::spawn(async move {
            deliver(store.read(&query), &mut on_change).await;

            loop {
                match rx.recv().await {
                    Ok(change) if matches(&change) => {
                        deliver(store.read(&query), &mut on_change).await;
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "change feed lagged; re-reading");
                        deliver(store.read(&query), &mut on_change).await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription {
            task: Some(task.abort_handle()),
        }
    }
}

async fn deliver<T>(value: impl Future<Output = Result<T>>, on_change: &mut impl FnMut(T)) {
    match value.await {
        Ok(value) => on_change(value),
        Err(e) => tracing::warn!("live query failed: {e}"),
    }
}

/// A live query. Dropping the handle stops it.
#[derive(Debug)]
pub struct Subscription {
    task: Option<AbortHandle>,
}

impl Subscription {
    /// Stop delivering updates. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Whether the subscription is still delivering
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenCipher;
    use crate::models::LeadFilter;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    fn store(dir: &tempfile::TempDir) -> Store {
        let db = Database::open_path(
            &dir.path().join("store.sqlite"),
            TokenCipher::from_key([4u8; 32]),
            true,
        )
        .unwrap();
        Store::new(db)
    }

    async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no update delivered")
            .expect("subscription closed")
    }

    #[tokio::test]
    async fn test_watch_delivers_initial_and_updates() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _sub = store.watch(
            |c| matches!(c, Change::Profile(uid) if uid == "u1"),
            |db| db.get_profile("u1"),
            move |p| {
                let _ = tx.send(p.map(|p| p.email));
            },
        );

        assert_eq!(next(&mut rx).await, None);

        store
            .write(Change::Profile("u1".into()), |db| {
                db.ensure_profile("u1", "a@example.com")
            })
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn test_watch_ignores_unrelated_changes() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _sub = store.watch(
            |c| matches!(c, Change::Leads),
            |db| db.get_leads(&LeadFilter::default()).map(|l| l.len()),
            move |n| {
                let _ = tx.send(n);
            },
        );
        assert_eq!(next(&mut rx).await, 0);

        store
            .write(Change::Profile("u9".into()), |db| db.ensure_profile("u9", "x@y.z"))
            .await
            .unwrap();

        let quiet = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(quiet.is_err());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_stops_updates() {
        let dir = tempdir().unwrap();
        let store = store(&dir);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut sub = store.watch(
            |_| true,
            |db| db.get_profile("u1"),
            move |p| {
                let _ = tx.send(p.is_some());
            },
        );
        assert!(!next(&mut rx).await);

        sub.cancel();
        sub.cancel();
        tokio::task::yield_now().await;

        store
            .write(Change::Profile("u1".into()), |db| db.ensure_profile("u1", "a@b.c"))
            .await
            .unwrap();

        // The sender lives in the aborted task, so the channel closes
        let after = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(matches!(after, Ok(None)));
        assert!(!sub.is_active());
    }
}

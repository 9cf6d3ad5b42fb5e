//! Partner profiles (`users/{uid}`)

use crate::error::{Error, Result};
use crate::models::{Actor, ProfileUpdate, UserProfile};
use crate::store::{Change, Store, Subscription};

/// Reads and writes user profiles
#[derive(Clone)]
pub struct ProfileStore {
    store: Store,
}

impl ProfileStore {
    /// Create a profile store over the shared store
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Create the profile on first sign-in. An existing profile keeps its
    /// role and settings; only the email is refreshed.
    pub async fn ensure_profile(&self, actor: &Actor) -> Result<UserProfile> {
        let uid = actor.uid.clone();
        let email = actor.email.clone();
        self.store
            .write(Change::Profile(uid.clone()), move |db| {
                db.ensure_profile(&uid, &email)
            })
            .await
    }

    /// Get a profile
    pub async fn get(&self, uid: &str) -> Result<Option<UserProfile>> {
        self.store.read(|db| db.get_profile(uid)).await
    }

    /// Merge a settings update into the profile
    pub async fn update(&self, uid: &str, update: &ProfileUpdate) -> Result<UserProfile> {
        self.store
            .write(Change::Profile(uid.to_string()), |db| {
                let mut profile = db
                    .get_profile(uid)?
                    .ok_or_else(|| Error::NotFound(format!("users/{uid}")))?;
                profile.apply(update);
                db.save_profile(&profile)?;
                Ok(profile)
            })
            .await
    }

    /// Live view of one profile; `None` while it does not exist
    pub fn watch_profile<C>(&self, uid: &str, on_change: C) -> Subscription
    where
        C: FnMut(Option<UserProfile>) + Send + 'static,
    {
        let watched = uid.to_string();
        let uid = uid.to_string();
        self.store.watch(
            move |change| matches!(change, Change::Profile(u) if *u == watched),
            move |db| db.get_profile(&uid),
            on_change,
        )
    }
}

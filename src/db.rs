//! Database module for `SQLite` storage
//!
//! Tables mirror the document layout: `users` (`users/{uid}`), `integrations`
//! (`users/{uid}/integrations/{platform}`), `posts` (`posts/{postId}`),
//! `leads` (`leads/{leadId}`) and the short-lived `pending_authorizations`.

use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use uuid::Uuid;

use crate::auth::TokenCipher;
use crate::error::{Error, Result};
use crate::models::{
    Integration, Lead, LeadFilter, LeadSource, LeadStatus, Platform, PostStatus, Role,
    ScheduledPost, Topic, TokenPayload, UserProfile,
};

/// Composite index backing the per-user post listing
pub const POSTS_BY_USER_INDEX: &str = "idx_posts_user_created";

const POSTS_BY_USER_INDEX_DDL: &str =
    "CREATE INDEX IF NOT EXISTS idx_posts_user_created ON posts(user_id, created_at DESC)";

const POST_COLUMNS: &str = "id, user_id, topic, platform, content, image_url, status, \
     scheduled_at, created_at, failure_reason, external_id";

const INTEGRATION_COLUMNS: &str = "user_id, platform, access_token, refresh_token, \
     provider_user_id, name, email, scopes, expires_at, updated_at";

/// OAuth attempt waiting for its callback
#[derive(Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    /// User who started the attempt
    pub user_id: String,
    /// Platform being linked
    pub platform: Platform,
    /// Anti-forgery value sent with the authorization URL
    pub state: String,
    /// PKCE verifier
    pub code_verifier: Option<String>,
    /// When the attempt started
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("user_id", &self.user_id)
            .field("platform", &self.platform)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Database connection wrapper
pub struct Database {
    conn: Connection,
    cipher: TokenCipher,
}

fn parse_time(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn parse_opt_time(idx: usize, value: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|s| parse_time(idx, &s)).transpose()
}

fn bad_value(idx: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        format!("unknown {what}: {value}").into(),
    )
}

fn parse_uuid(idx: usize, value: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, value: &str) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

impl Database {
    /// Open or create the database at the default location
    pub fn open(create_indexes: bool) -> anyhow::Result<Self> {
        let path = crate::paths::database_path()?;
        Self::open_path(&path, TokenCipher::for_machine(), create_indexes)
            .with_context(|| format!("Failed to open {}", path.display()))
    }

    /// Open or create the database at a specific path.
    ///
    /// With `create_indexes` unset the composite indexes are left for the
    /// operator to create; queries that need them fail with
    /// [`Error::QueryRequiresIndex`].
    pub fn open_path(path: &Path, cipher: TokenCipher, create_indexes: bool) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let db = Self { conn, cipher };
        db.init()?;
        if create_indexes {
            db.create_indexes()?;
        }

        Ok(db)
    }

    /// Initialize the database schema
    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                uid TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                display_name TEXT,
                photo_url TEXT,
                phone_number TEXT,
                role TEXT NOT NULL DEFAULT 'MITRA',
                bank_details TEXT,
                social_media TEXT NOT NULL DEFAULT '{}',
                fee_achievement REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- One row per (user, platform); tokens are sealed
            CREATE TABLE IF NOT EXISTS integrations (
                user_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                provider_user_id TEXT,
                name TEXT,
                email TEXT,
                scopes TEXT,
                expires_at TEXT,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (user_id, platform)
            );

            CREATE TABLE IF NOT EXISTS pending_authorizations (
                user_id TEXT NOT NULL,
                platform TEXT NOT NULL,
                state TEXT NOT NULL,
                code_verifier TEXT,
                created_at TEXT NOT NULL,
                PRIMARY KEY (user_id, platform)
            );

            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                platform TEXT NOT NULL,
                content TEXT NOT NULL,
                image_url TEXT,
                status TEXT NOT NULL DEFAULT 'SCHEDULED',
                scheduled_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                failure_reason TEXT,
                external_id TEXT,
                claimed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS leads (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                phone TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                platform TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'NEW',
                notes TEXT NOT NULL DEFAULT '',
                last_contact_at TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_posts_status_scheduled ON posts(status, scheduled_at);
            CREATE INDEX IF NOT EXISTS idx_leads_last_contact ON leads(last_contact_at);
            ",
        )?;

        // Databases created before publish claims existed
        let has_claims: bool = self.conn.query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('posts') WHERE name = 'claimed_at'",
            [],
            |row| row.get(0),
        )?;
        if !has_claims {
            self.conn.execute_batch("ALTER TABLE posts ADD COLUMN claimed_at TEXT;")?;
        }

        Ok(())
    }

    /// Create the composite indexes
    pub fn create_indexes(&self) -> Result<()> {
        self.conn.execute_batch(POSTS_BY_USER_INDEX_DDL)?;
        Ok(())
    }

    /// Whether a named index exists
    pub fn has_index(&self, name: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn require_index(&self, name: &str, ddl: &str) -> Result<()> {
        if self.has_index(name)? {
            Ok(())
        } else {
            Err(Error::QueryRequiresIndex {
                index: name.to_string(),
                create: ddl.to_string(),
            })
        }
    }

    // ==================== Profiles ====================

    /// Create the profile on first sign-in; an existing profile only gets
    /// its email refreshed
    pub fn ensure_profile(&self, uid: &str, email: &str) -> Result<UserProfile> {
        let fresh = UserProfile::new(uid, email);
        self.conn.execute(
            r"INSERT INTO users (uid, email, role, social_media, fee_achievement, created_at)
               VALUES (?1, ?2, ?3, '{}', 0, ?4)
               ON CONFLICT(uid) DO UPDATE SET email = excluded.email",
            params![uid, email, fresh.role.as_str(), fresh.created_at.to_rfc3339()],
        )?;

        self.get_profile(uid)?
            .ok_or_else(|| Error::Internal(format!("profile {uid} vanished after upsert")))
    }

    /// Get a profile
    pub fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                "SELECT uid, email, display_name, photo_url, phone_number, role, bank_details,
                        social_media, fee_achievement, created_at
                 FROM users WHERE uid = ?1",
                params![uid],
                Self::row_to_profile,
            )
            .optional()?;
        Ok(profile)
    }

    /// Write every mutable profile field
    pub fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let bank = profile
            .bank_details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let social = serde_json::to_string(&profile.social_media)?;

        let updated = self.conn.execute(
            r"UPDATE users SET email = ?2, display_name = ?3, photo_url = ?4, phone_number = ?5,
                   role = ?6, bank_details = ?7, social_media = ?8, fee_achievement = ?9
               WHERE uid = ?1",
            params![
                profile.uid,
                profile.email,
                profile.display_name,
                profile.photo_url,
                profile.phone_number,
                profile.role.as_str(),
                bank,
                social,
                profile.fee_achievement,
            ],
        )?;

        if updated == 0 {
            return Err(Error::NotFound(format!("users/{}", profile.uid)));
        }
        Ok(())
    }

    fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserProfile> {
        let role: String = row.get(5)?;
        let bank: Option<String> = row.get(6)?;
        let social: String = row.get(7)?;

        Ok(UserProfile {
            uid: row.get(0)?,
            email: row.get(1)?,
            display_name: row.get(2)?,
            photo_url: row.get(3)?,
            phone_number: row.get(4)?,
            role: Role::from_str(&role).ok_or_else(|| bad_value(5, "role", &role))?,
            bank_details: bank.map(|b| parse_json(6, &b)).transpose()?,
            social_media: parse_json(7, &social)?,
            fee_achievement: row.get(8)?,
            created_at: parse_time(9, &row.get::<_, String>(9)?)?,
        })
    }

    // ==================== Integrations ====================

    /// Upsert an integration. Payload fields left `None` keep their stored
    /// values.
    pub fn upsert_integration(
        &self,
        user_id: &str,
        platform: Platform,
        payload: &TokenPayload,
        updated_at: DateTime<Utc>,
    ) -> Result<Integration> {
        let access_token = self.cipher.seal(&payload.access_token)?;
        let refresh_token = payload
            .refresh_token
            .as_deref()
            .map(|t| self.cipher.seal(t))
            .transpose()?;
        let scopes = payload.scopes.as_ref().map(|s| s.join(" "));

        self.conn.execute(
            r"INSERT INTO integrations
                (user_id, platform, access_token, refresh_token, provider_user_id, name, email,
                 scopes, expires_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
               ON CONFLICT(user_id, platform) DO UPDATE SET
                 access_token = excluded.access_token,
                 refresh_token = COALESCE(excluded.refresh_token, integrations.refresh_token),
                 provider_user_id = COALESCE(excluded.provider_user_id, integrations.provider_user_id),
                 name = COALESCE(excluded.name, integrations.name),
                 email = COALESCE(excluded.email, integrations.email),
                 scopes = COALESCE(excluded.scopes, integrations.scopes),
                 expires_at = COALESCE(excluded.expires_at, integrations.expires_at),
                 updated_at = excluded.updated_at",
            params![
                user_id,
                platform.as_str(),
                access_token,
                refresh_token,
                payload.provider_user_id,
                payload.name,
                payload.email,
                scopes,
                payload.expires_at.map(|dt| dt.to_rfc3339()),
                updated_at.to_rfc3339(),
            ],
        )?;

        self.get_integration(user_id, platform)?
            .ok_or_else(|| Error::Internal("integration vanished after upsert".to_string()))
    }

    /// Get the integration for `(user, platform)`
    pub fn get_integration(&self, user_id: &str, platform: Platform) -> Result<Option<Integration>> {
        let sql = format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE user_id = ?1 AND platform = ?2"
        );
        let integration = self
            .conn
            .query_row(&sql, params![user_id, platform.as_str()], |row| {
                self.row_to_integration(row)
            })
            .optional()?;
        Ok(integration)
    }

    /// All integrations of a user
    pub fn get_integrations(&self, user_id: &str) -> Result<Vec<Integration>> {
        let sql = format!(
            "SELECT {INTEGRATION_COLUMNS} FROM integrations WHERE user_id = ?1 ORDER BY platform"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user_id], |row| self.row_to_integration(row))?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Delete an integration; returns whether a row existed
    pub fn delete_integration(&self, user_id: &str, platform: Platform) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM integrations WHERE user_id = ?1 AND platform = ?2",
            params![user_id, platform.as_str()],
        )?;
        Ok(deleted > 0)
    }

    fn row_to_integration(&self, row: &rusqlite::Row<'_>) -> rusqlite::Result<Integration> {
        let unseal = |idx: usize, sealed: String| {
            self.cipher.open(&sealed).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    e.to_string().into(),
                )
            })
        };

        let platform: String = row.get(1)?;
        let scopes: Option<String> = row.get(7)?;

        Ok(Integration {
            user_id: row.get(0)?,
            platform: Platform::from_str(&platform)
                .ok_or_else(|| bad_value(1, "platform", &platform))?,
            access_token: unseal(2, row.get(2)?)?,
            refresh_token: row
                .get::<_, Option<String>>(3)?
                .map(|t| unseal(3, t))
                .transpose()?,
            provider_user_id: row.get(4)?,
            name: row.get(5)?,
            email: row.get(6)?,
            scopes: scopes
                .map(|s| s.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
            expires_at: parse_opt_time(8, row.get(8)?)?,
            updated_at: parse_time(9, &row.get::<_, String>(9)?)?,
        })
    }

    // ==================== Pending authorizations ====================

    /// Record an in-flight attempt, replacing any earlier one for the pair
    pub fn put_pending_authorization(&self, pending: &PendingAuthorization) -> Result<()> {
        let state = self.cipher.seal(&pending.state)?;
        let verifier = pending
            .code_verifier
            .as_deref()
            .map(|v| self.cipher.seal(v))
            .transpose()?;

        self.conn.execute(
            r"INSERT OR REPLACE INTO pending_authorizations
                (user_id, platform, state, code_verifier, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                pending.user_id,
                pending.platform.as_str(),
                state,
                verifier,
                pending.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Remove and return the in-flight attempt for the pair
    pub fn take_pending_authorization(
        &self,
        user_id: &str,
        platform: Platform,
    ) -> Result<Option<PendingAuthorization>> {
        let row = self
            .conn
            .query_row(
                "SELECT state, code_verifier, created_at FROM pending_authorizations
                 WHERE user_id = ?1 AND platform = ?2",
                params![user_id, platform.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        parse_time(2, &row.get::<_, String>(2)?)?,
                    ))
                },
            )
            .optional()?;

        self.conn.execute(
            "DELETE FROM pending_authorizations WHERE user_id = ?1 AND platform = ?2",
            params![user_id, platform.as_str()],
        )?;

        let Some((state, verifier, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(PendingAuthorization {
            user_id: user_id.to_string(),
            platform,
            state: self.cipher.open(&state)?,
            code_verifier: verifier.map(|v| self.cipher.open(&v)).transpose()?,
            created_at,
        }))
    }

    // ==================== Scheduled Posts ====================

    /// Save a scheduled post
    pub fn insert_post(&self, post: &ScheduledPost) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO posts ({POST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                post.id.to_string(),
                post.user_id,
                post.topic.as_str(),
                post.platform.as_str(),
                post.content,
                post.image_url,
                post.status.as_str(),
                post.scheduled_at.to_rfc3339(),
                post.created_at.to_rfc3339(),
                post.failure_reason,
                post.external_id,
            ],
        )?;
        Ok(())
    }

    /// Get a post by id
    pub fn get_post(&self, id: Uuid) -> Result<Option<ScheduledPost>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1");
        let post = self
            .conn
            .query_row(&sql, params![id.to_string()], Self::row_to_post)
            .optional()?;
        Ok(post)
    }

    /// A user's posts, newest first. Needs the composite index.
    pub fn get_posts_for_user(&self, user_id: &str) -> Result<Vec<ScheduledPost>> {
        self.require_index(POSTS_BY_USER_INDEX, POSTS_BY_USER_INDEX_DDL)?;

        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE user_id = ?1 ORDER BY created_at DESC, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let posts = stmt.query_map(params![user_id], Self::row_to_post)?;
        posts.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Scheduled posts whose publish time is at or before `now`
    pub fn get_due_posts(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts
             WHERE status = 'SCHEDULED' AND scheduled_at <= ?1
             ORDER BY scheduled_at ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let posts = stmt.query_map(params![now.to_rfc3339()], Self::row_to_post)?;
        posts.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }

    /// Move a post out of `SCHEDULED`. Returns `false` (and changes nothing)
    /// when the post is already terminal or missing.
    pub fn finish_post(
        &self,
        id: Uuid,
        status: PostStatus,
        failure_reason: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE posts SET status = ?2, failure_reason = ?3, external_id = ?4, claimed_at = NULL
             WHERE id = ?1 AND status = 'SCHEDULED'",
            params![id.to_string(), status.as_str(), failure_reason, external_id],
        )?;
        Ok(updated > 0)
    }

    /// Take the publish claim on a scheduled post. Succeeds only when nobody
    /// holds it or the holder's claim is older than `stale_before`.
    pub fn claim_post(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> Result<bool> {
        let claimed = self.conn.execute(
            "UPDATE posts SET claimed_at = ?2
             WHERE id = ?1 AND status = 'SCHEDULED'
               AND (claimed_at IS NULL OR claimed_at < ?3)",
            params![id.to_string(), now.to_rfc3339(), stale_before.to_rfc3339()],
        )?;
        Ok(claimed > 0)
    }

    /// Drop the publish claim on a post that is still scheduled
    pub fn release_post_claim(&self, id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE posts SET claimed_at = NULL WHERE id = ?1 AND status = 'SCHEDULED'",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Delete a post that has not been published yet
    pub fn delete_scheduled_post(&self, id: Uuid) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM posts WHERE id = ?1 AND status = 'SCHEDULED'",
            params![id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Helper to convert a row to `ScheduledPost`
    fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduledPost> {
        let topic: String = row.get(2)?;
        let platform: String = row.get(3)?;
        let status: String = row.get(6)?;

        Ok(ScheduledPost {
            id: parse_uuid(0, &row.get::<_, String>(0)?)?,
            user_id: row.get(1)?,
            topic: Topic::from_str(&topic).ok_or_else(|| bad_value(2, "topic", &topic))?,
            platform: Platform::from_str(&platform)
                .ok_or_else(|| bad_value(3, "platform", &platform))?,
            content: row.get(4)?,
            image_url: row.get(5)?,
            status: PostStatus::from_str(&status).ok_or_else(|| bad_value(6, "status", &status))?,
            scheduled_at: parse_time(7, &row.get::<_, String>(7)?)?,
            created_at: parse_time(8, &row.get::<_, String>(8)?)?,
            failure_reason: row.get(9)?,
            external_id: row.get(10)?,
        })
    }

    // ==================== Leads ====================

    /// Insert or replace a lead
    pub fn upsert_lead(&self, lead: &Lead) -> Result<()> {
        self.conn.execute(
            r"INSERT OR REPLACE INTO leads
                (id, name, phone, email, platform, status, notes, last_contact_at, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                lead.id.to_string(),
                lead.name,
                lead.phone,
                lead.email,
                lead.platform.as_str(),
                lead.status.as_str(),
                lead.notes,
                lead.last_contact_at.to_rfc3339(),
                lead.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Leads passing the filter, most recently contacted first
    pub fn get_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        let term = filter.search.trim().to_lowercase();
        let pattern = format!("%{term}%");

        let mut stmt = self.conn.prepare(
            "SELECT id, name, phone, email, platform, status, notes, last_contact_at, created_at
             FROM leads
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 = '' OR lower(name) LIKE ?3 OR phone LIKE ?3)
             ORDER BY last_contact_at DESC",
        )?;

        let leads = stmt.query_map(
            params![filter.status.map(|s| s.as_str()), term, pattern],
            |row| {
                let source: String = row.get(4)?;
                let status: String = row.get(5)?;
                Ok(Lead {
                    id: parse_uuid(0, &row.get::<_, String>(0)?)?,
                    name: row.get(1)?,
                    phone: row.get(2)?,
                    email: row.get(3)?,
                    platform: LeadSource::from_str(&source)
                        .ok_or_else(|| bad_value(4, "lead source", &source))?,
                    status: LeadStatus::from_str(&status)
                        .ok_or_else(|| bad_value(5, "lead status", &status))?,
                    notes: row.get(6)?,
                    last_contact_at: parse_time(7, &row.get::<_, String>(7)?)?,
                    created_at: parse_time(8, &row.get::<_, String>(8)?)?,
                })
            },
        )?;

        leads.collect::<rusqlite::Result<Vec<_>>>().map_err(Into::into)
    }
}

//! # SocialDesk
//!
//! Core of a partner dashboard for a travel agency: link Instagram, Facebook
//! and TikTok accounts, draft captions with a generative backend, schedule
//! posts and publish them when they fall due.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Services / CLI / RPC                    │
//! │  Wires every component from Config over one shared Store    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!      ┌──────────────┬────────┴───────┬──────────────┐
//!      ▼              ▼                ▼              ▼
//! ┌──────────┐ ┌─────────────┐ ┌──────────────┐ ┌───────────┐
//! │   Auth   │ │   Linker    │ │   Generate   │ │ Publisher │
//! │          │ │             │ │              │ │           │
//! │ • Sign in│ │ • Meta popup│ │ • Captions   │ │ • Retries │
//! │ • Vault  │ │ • TikTok    │ │ • Images     │ │ • Meta    │
//! │          │ │   redirect  │ │ • Timeout    │ │ • TikTok  │
//! └──────────┘ └─────────────┘ └──────────────┘ └───────────┘
//!      │              │                │              │
//!      └──────────────┴────────┬───────┴──────────────┘
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Store (SQLite + change feed)                │
//! │   users · integrations · pending auth · posts · leads       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`auth`] — Sign-in, session persistence, encrypted vault
//! - [`linker`] — Account linking (popup and redirect flows)
//! - [`generate`] — Caption and image generation
//! - [`posts`] — Scheduled posts
//! - [`publisher`] — Publishing due posts with retries
//! - [`rpc`] — Callable functions (`generateContent`, `postToSocial`)
//! - [`store`] — Shared store and live subscriptions
//! - [`db`] — `SQLite` persistence
//!
//! ## Example
//!
//! ```no_run
//! use socialdesk::{Config, services::Services};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let services = Services::open(Config::load()?)?;
//!     let reports = services.publisher.publish_due(chrono::Utc::now()).await?;
//!     println!("{} posts processed", reports.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(clippy::unused_async)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::single_match_else)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::trivially_copy_pass_by_ref)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::use_self)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::similar_names)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(async_fn_in_trait)]

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod generate;
pub mod integrations;
pub mod leads;
pub mod linker;
pub mod models;
pub mod paths;
pub mod posts;
pub mod profile;
pub mod publisher;
pub mod rpc;
pub mod schedule;
pub mod services;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use models::{Actor, Integration, Lead, Platform, PostStatus, ScheduledPost, UserProfile};
pub use services::Services;

/// ASCII logo for the application
pub const LOGO: &str = r"
  ____             _       _ ____            _
 / ___|  ___   ___(_) __ _| |  _ \  ___  ___| | __
 \___ \ / _ \ / __| |/ _` | | | | |/ _ \/ __| |/ /
  ___) | (_) | (__| | (_| | | |_| |  __/\__ \   <
 |____/ \___/ \___|_|\__,_|_|____/ \___||___/_|\_\
";

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Identity, sessions and secret storage
//!
//! - [`identity`] talks to the password sign-in endpoint
//! - [`session`] tracks the signed-in [`Actor`](crate::models::Actor) and
//!   persists it between runs
//! - [`vault`] seals secrets at rest with a machine-derived key

pub mod identity;
pub mod session;
pub mod vault;

pub use identity::{HttpIdentityProvider, IdentityProvider};
pub use session::SessionManager;
pub use vault::{TokenCipher, Vault};

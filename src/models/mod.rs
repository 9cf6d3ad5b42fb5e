//! Data models for SocialDesk

mod actor;
mod integration;
mod lead;
mod platform;
mod profile;
mod scheduled_post;

pub use actor::Actor;
pub use integration::{Integration, TokenPayload};
pub use lead::{Lead, LeadFilter, LeadSource, LeadStatus};
pub use platform::{LinkFlow, Platform};
pub use profile::{BankDetails, ProfileUpdate, Role, SocialLinks, UserProfile};
pub use scheduled_post::{Draft, PostStatus, ScheduledPost, Topic};

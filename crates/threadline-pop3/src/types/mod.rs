//! Core POP3 types.

mod capability;
mod mailbox;
mod reply;

pub use capability::Capability;
pub use mailbox::{Listing, Stat, UniqueId};
pub use reply::{Reply, Status};

//! Conversation entries: one record per inbound or outbound message.

mod model;
mod repository;

pub use model::{ConversationEntry, Direction, EntryAttachment, EntryId, MEDIUM_EMAIL};
pub use repository::{ConversationRepository, UnrepliedCandidate};
pub(crate) use repository::SCHEMA;

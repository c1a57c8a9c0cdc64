//! Parent cases: the records a thread of conversation entries hangs off.

mod kind;
mod model;
mod repository;

pub use kind::{CaseKinds, Issue, JobApplicant, Lead, ParentCase};
pub use model::{CaseId, CaseRecord, CaseRef, CaseStatus, NewCase};
pub use repository::CaseRepository;
pub(crate) use repository::SCHEMA;

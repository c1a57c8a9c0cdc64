//! Case record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub i64);

impl CaseId {
    /// Create a new case ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Polymorphic reference from a conversation entry to its case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaseRef {
    /// Registered kind name, e.g. `"Issue"`.
    pub kind: String,
    /// Case identifier.
    pub id: CaseId,
}

impl std::fmt::Display for CaseRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// Workflow status of a case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CaseStatus {
    /// Waiting on the desk.
    #[default]
    Open,
    /// Answered, waiting on the customer.
    Replied,
    /// Done.
    Closed,
    /// Any other workflow state a kind defines.
    Other(String),
}

impl CaseStatus {
    /// Stored form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "Open",
            Self::Replied => "Replied",
            Self::Closed => "Closed",
            Self::Other(s) => s,
        }
    }

    /// Parse the stored form.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "Open" => Self::Open,
            "Replied" => Self::Replied,
            "Closed" => Self::Closed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    /// Case identifier.
    pub id: CaseId,
    /// Registered kind name.
    pub kind: String,
    /// Subject, for kinds that carry one.
    pub subject: Option<String>,
    /// Raised-by address, for kinds that carry one.
    pub sender: Option<String>,
    /// Unique email-identifying field, for kinds that have one.
    pub email_id: Option<String>,
    /// Workflow status.
    pub status: CaseStatus,
    /// When the case was created.
    pub created_at: DateTime<Utc>,
}

impl CaseRecord {
    /// Reference to this case.
    #[must_use]
    pub fn reference(&self) -> CaseRef {
        CaseRef {
            kind: self.kind.clone(),
            id: self.id,
        }
    }

    /// Whether the case is waiting on the desk.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == CaseStatus::Open
    }
}

/// A case about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewCase {
    /// Registered kind name.
    pub kind: String,
    /// Subject.
    pub subject: Option<String>,
    /// Raised-by address.
    pub sender: Option<String>,
    /// Unique email-identifying field.
    pub email_id: Option<String>,
}

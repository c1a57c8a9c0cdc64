//! Parent case kinds and their field capabilities.
//!
//! Each kind states up front which of the message-derived fields it can
//! hold. The resolver only writes fields a kind supports, and only kinds
//! with an email-identifying field can recover from a duplicate insert.

use std::collections::BTreeMap;
use std::fmt;

use super::model::NewCase;

/// A case kind under construction from an incoming message.
pub trait ParentCase: Send {
    /// Registered kind name.
    fn kind(&self) -> &str;

    /// Whether the kind has a subject field.
    fn supports_subject(&self) -> bool {
        false
    }

    /// Sets the subject. Ignored by kinds without one.
    fn set_subject(&mut self, _subject: &str) {}

    /// Whether the kind records who raised it.
    fn supports_sender(&self) -> bool {
        false
    }

    /// Sets the sender. Ignored by kinds without one.
    fn set_sender(&mut self, _sender: &str) {}

    /// Value of the unique email-identifying field, if the kind has one.
    fn email_key(&self) -> Option<&str> {
        None
    }

    /// Converts into a storable row.
    fn to_new_case(&self) -> NewCase;
}

/// Support ticket: subject plus raised-by address.
#[derive(Debug, Clone, Default)]
pub struct Issue {
    subject: Option<String>,
    raised_by: Option<String>,
}

impl Issue {
    /// Kind name.
    pub const KIND: &'static str = "Issue";
}

impl ParentCase for Issue {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn supports_subject(&self) -> bool {
        true
    }

    fn set_subject(&mut self, subject: &str) {
        self.subject = Some(subject.to_string());
    }

    fn supports_sender(&self) -> bool {
        true
    }

    fn set_sender(&mut self, sender: &str) {
        self.raised_by = Some(sender.to_string());
    }

    fn to_new_case(&self) -> NewCase {
        NewCase {
            kind: Self::KIND.to_string(),
            subject: self.subject.clone(),
            sender: self.raised_by.clone(),
            email_id: None,
        }
    }
}

/// Sales lead keyed by the prospect's address. No subject.
#[derive(Debug, Clone, Default)]
pub struct Lead {
    email_id: Option<String>,
}

impl Lead {
    /// Kind name.
    pub const KIND: &'static str = "Lead";
}

impl ParentCase for Lead {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn supports_sender(&self) -> bool {
        true
    }

    fn set_sender(&mut self, sender: &str) {
        self.email_id = Some(sender.to_string());
    }

    fn email_key(&self) -> Option<&str> {
        self.email_id.as_deref()
    }

    fn to_new_case(&self) -> NewCase {
        NewCase {
            kind: Self::KIND.to_string(),
            subject: None,
            sender: self.email_id.clone(),
            email_id: self.email_id.clone(),
        }
    }
}

/// Job applicant keyed by the applicant's address.
#[derive(Debug, Clone, Default)]
pub struct JobApplicant {
    subject: Option<String>,
    email_id: Option<String>,
}

impl JobApplicant {
    /// Kind name.
    pub const KIND: &'static str = "Job Applicant";
}

impl ParentCase for JobApplicant {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn supports_subject(&self) -> bool {
        true
    }

    fn set_subject(&mut self, subject: &str) {
        self.subject = Some(subject.to_string());
    }

    fn supports_sender(&self) -> bool {
        true
    }

    fn set_sender(&mut self, sender: &str) {
        self.email_id = Some(sender.to_string());
    }

    fn email_key(&self) -> Option<&str> {
        self.email_id.as_deref()
    }

    fn to_new_case(&self) -> NewCase {
        NewCase {
            kind: Self::KIND.to_string(),
            subject: self.subject.clone(),
            sender: self.email_id.clone(),
            email_id: self.email_id.clone(),
        }
    }
}

type Constructor = fn() -> Box<dyn ParentCase>;

#[derive(Clone, Copy)]
struct KindEntry {
    has_email_field: bool,
    construct: Constructor,
}

/// Registry of parent case kinds an account may append to.
#[derive(Clone)]
pub struct CaseKinds {
    kinds: BTreeMap<String, KindEntry>,
}

impl CaseKinds {
    /// Registry holding the built-in kinds.
    #[must_use]
    pub fn builtin() -> Self {
        let mut kinds = Self::empty();
        kinds.register(Issue::KIND, false, || Box::new(Issue::default()));
        kinds.register(Lead::KIND, true, || Box::new(Lead::default()));
        kinds.register(JobApplicant::KIND, true, || {
            Box::new(JobApplicant::default())
        });
        kinds
    }

    /// Registry without any kinds.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            kinds: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) a kind.
    pub fn register(&mut self, name: &str, has_email_field: bool, construct: Constructor) {
        self.kinds.insert(
            name.to_string(),
            KindEntry {
                has_email_field,
                construct,
            },
        );
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    /// Registered kind names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }

    /// Builds an empty case of kind `name`.
    #[must_use]
    pub fn new_case(&self, name: &str) -> Option<Box<dyn ParentCase>> {
        self.kinds.get(name).map(|entry| (entry.construct)())
    }

    /// Whether kind `name` has an email-identifying unique field.
    #[must_use]
    pub fn has_email_field(&self, name: &str) -> bool {
        self.kinds.get(name).is_some_and(|entry| entry.has_email_field)
    }
}

impl Default for CaseKinds {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for CaseKinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds.keys()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_kinds_are_registered() {
        let kinds = CaseKinds::default();
        assert_eq!(
            kinds.names().collect::<Vec<_>>(),
            ["Issue", "Job Applicant", "Lead"]
        );
        assert!(!kinds.has_email_field("Issue"));
        assert!(kinds.has_email_field("Lead"));
        assert!(!kinds.has_email_field("Ticket"));
        assert!(kinds.new_case("Ticket").is_none());
    }

    #[test]
    fn lead_has_no_subject() {
        let mut lead = CaseKinds::default().new_case("Lead").unwrap();
        assert!(!lead.supports_subject());
        lead.set_subject("ignored");
        lead.set_sender("prospect@example.com");

        let row = lead.to_new_case();
        assert_eq!(row.subject, None);
        assert_eq!(row.email_id.as_deref(), Some("prospect@example.com"));
        assert_eq!(lead.email_key(), Some("prospect@example.com"));
    }

    #[test]
    fn issue_records_raised_by() {
        let mut issue = CaseKinds::default().new_case("Issue").unwrap();
        issue.set_subject("Printer on fire");
        issue.set_sender("user@example.com");

        let row = issue.to_new_case();
        assert_eq!(row.kind, "Issue");
        assert_eq!(row.subject.as_deref(), Some("Printer on fire"));
        assert_eq!(row.sender.as_deref(), Some("user@example.com"));
        assert_eq!(row.email_id, None);
    }

    #[test]
    fn custom_kind_registration() {
        let mut kinds = CaseKinds::empty();
        kinds.register("Ticket", false, || Box::new(Issue::default()));
        assert!(kinds.contains("Ticket"));
        assert!(!kinds.contains("Issue"));
    }
}

//! First-contact auto reply.

use crate::account::Account;
use crate::conversation::ConversationEntry;
use crate::outbox::{MailPurpose, OutboundMail};

/// Footer offered on automatic mail.
pub const LEAVE_CONVERSATION: &str = "Leave this conversation";

/// Decides whether and what to answer a newly received entry with.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoReplyPolicy;

impl AutoReplyPolicy {
    /// Builds the reply for `entry`, or `None` when the account has auto
    /// reply off, has no reply text, or the entry did not open a new case.
    ///
    /// The reply goes to the sender from the account's address, is linked
    /// to the same case and carries the entry id as its message id, so an
    /// answer to it threads back into the case.
    #[must_use]
    pub fn compose(account: &Account, entry: &ConversationEntry) -> Option<OutboundMail> {
        let settings = &account.auto_reply;
        if !settings.enabled || !entry.is_first || settings.message.trim().is_empty() {
            return None;
        }
        let content = settings.message.clone();

        let mut mail = OutboundMail::new(
            MailPurpose::AutoReply,
            vec![entry.sender.clone()],
            format!("Re: {}", entry.subject),
            content,
        );
        mail.account_id = account.id;
        mail.sender = Some(account.email.clone());
        mail.reply_to = Some(account.email.clone());
        mail.reference.clone_from(&entry.reference);
        mail.message_id = Some(entry.id.clone());
        mail.unsubscribe_text = Some(LEAVE_CONVERSATION.to_string());
        mail.bulk = true;
        Some(mail)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::AccountId;
    use crate::case::{CaseId, CaseRef};

    fn setup() -> (Account, ConversationEntry) {
        let mut account = Account::with_email("desk@example.com");
        account.id = Some(AccountId::new(3));
        account.name = "Desk".into();
        account.auto_reply.enabled = true;

        let mut entry = ConversationEntry::received(AccountId::new(3), "ann@example.com");
        entry.subject = "Printer".into();
        entry.is_first = true;
        entry.reference = Some(CaseRef {
            kind: "Issue".into(),
            id: CaseId::new(9),
        });
        (account, entry)
    }

    #[test]
    fn replies_to_first_message() {
        let (mut account, entry) = setup();
        account.auto_reply.message = "<p>Thanks!</p>".into();

        let mail = AutoReplyPolicy::compose(&account, &entry).unwrap();
        assert_eq!(mail.recipients, ["ann@example.com"]);
        assert_eq!(mail.sender.as_deref(), Some("desk@example.com"));
        assert_eq!(mail.reply_to.as_deref(), Some("desk@example.com"));
        assert_eq!(mail.subject, "Re: Printer");
        assert_eq!(mail.content, "<p>Thanks!</p>");
        assert_eq!(mail.reference, entry.reference);
        assert_eq!(mail.message_id, Some(entry.id));
        assert_eq!(mail.unsubscribe_text.as_deref(), Some(LEAVE_CONVERSATION));
        assert!(mail.bulk);
    }

    #[test]
    fn no_reply_without_message_text() {
        let (mut account, entry) = setup();
        assert!(AutoReplyPolicy::compose(&account, &entry).is_none());

        account.auto_reply.message = " \n\t ".into();
        assert!(AutoReplyPolicy::compose(&account, &entry).is_none());
    }

    #[test]
    fn no_reply_when_disabled_or_not_first() {
        let (mut account, mut entry) = setup();
        entry.is_first = false;
        assert!(AutoReplyPolicy::compose(&account, &entry).is_none());

        entry.is_first = true;
        account.auto_reply.enabled = false;
        assert!(AutoReplyPolicy::compose(&account, &entry).is_none());
    }
}

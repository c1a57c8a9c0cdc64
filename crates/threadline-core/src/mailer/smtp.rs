//! SMTP delivery through lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::{ContentType, Header, HeaderName, HeaderValue};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

use super::{Mailer, SendError};
use crate::account::{Account, Security};
use crate::conversation::EntryAttachment;
use crate::outbox::OutboundMail;
use crate::render::{escape_html, html_to_text};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// `Precedence: bulk`, set on low-priority mail so autoresponders skip it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Precedence(String);

impl Header for Precedence {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Precedence")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.trim().to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// `Auto-Submitted` (RFC 3834) for machine-generated mail.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AutoSubmitted(String);

impl Header for AutoSubmitted {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Auto-Submitted")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.trim().to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// [`Mailer`] backed by an async SMTP transport per account.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    /// Creates a mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn transport(account: &Account) -> Result<AsyncSmtpTransport<Tokio1Executor>, SendError> {
        let config = &account.outgoing;
        if config.host.trim().is_empty() {
            return Err(SendError::Configuration(format!(
                "SMTP server is required for {}",
                account.email
            )));
        }

        let builder = match config.security {
            Security::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
            Security::StartTls => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?,
            Security::None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };

        let mut builder = builder.timeout(Some(SMTP_TIMEOUT));
        if config.port != 0 {
            builder = builder.port(config.port);
        }
        if !config.password.is_empty() {
            builder = builder.credentials(Credentials::new(
                account.outgoing_login().to_string(),
                config.password.clone(),
            ));
        }
        Ok(builder.build())
    }
}

/// Builds the RFC 5322 message for `mail`, sent as `from`.
///
/// # Errors
///
/// Returns an error if an address does not parse or the message cannot be
/// assembled.
pub(crate) fn build_message(
    mail: &OutboundMail,
    attachments: &[EntryAttachment],
    from: &str,
) -> Result<Message, SendError> {
    let from: Mailbox = from.parse()?;
    let mut builder = Message::builder().from(from.clone()).subject(&mail.subject);

    for recipient in &mail.recipients {
        builder = builder.to(recipient.parse::<Mailbox>()?);
    }
    if let Some(reply_to) = &mail.reply_to {
        builder = builder.reply_to(reply_to.parse::<Mailbox>()?);
    }
    if let Some(entry) = &mail.message_id {
        builder = builder.message_id(Some(format!("<{entry}@{}>", from.email.domain())));
    }
    if mail.bulk {
        builder = builder
            .header(Precedence("bulk".into()))
            .header(AutoSubmitted("auto-generated".into()));
    }

    let mut html = mail.content.clone();
    if let Some(text) = &mail.unsubscribe_text {
        html.push_str(&format!(
            "\n<p style=\"color: #888; font-size: small;\">{}</p>",
            escape_html(text)
        ));
    }
    let body = MultiPart::alternative_plain_html(html_to_text(&html), html);

    let message = if attachments.is_empty() {
        builder.multipart(body)?
    } else {
        let mut mixed = MultiPart::mixed().multipart(body);
        for attachment in attachments {
            let Ok(content_type) = ContentType::parse(&attachment.content_type)
                .or_else(|_| ContentType::parse("application/octet-stream"))
            else {
                warn!(filename = %attachment.filename, "Skipping attachment with unusable type");
                continue;
            };
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(mixed)?
    };
    Ok(message)
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        mail: &OutboundMail,
        attachments: &[EntryAttachment],
        via: &Account,
    ) -> Result<(), SendError> {
        let from = mail.sender.as_deref().unwrap_or(&via.email);
        let message = build_message(mail, attachments, from)?;
        let transport = Self::transport(via)?;

        transport.send(message).await?;
        debug!(
            purpose = %mail.purpose,
            recipients = mail.recipients.len(),
            via = %via.email,
            "Mail sent"
        );
        Ok(())
    }

    async fn verify(&self, account: &Account) -> Result<(), SendError> {
        let transport = Self::transport(account)?;
        if transport.test_connection().await? {
            Ok(())
        } else {
            Err(SendError::Configuration(format!(
                "SMTP server {} did not accept the connection",
                account.outgoing.host
            )))
        }
    }
}

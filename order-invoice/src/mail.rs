//! Delivering the invoice mail.

use std::{
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::info;

use crate::error::{AddContext, Error};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A file attached to a mail
#[derive(Debug, Clone, PartialEq)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A fully composed mail, ready to hand to a [`Mailer`]
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachment: Option<MailAttachment>,
}

/// Proof that the transport accepted a mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Hand one mail to the transport. Never retried.
    async fn send(&self, mail: &OutgoingMail) -> Result<DeliveryReceipt, Error>;
}

/// SMTP connection settings. The password is only exposed when building credentials.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_email: String,
    pub from_name: String,
}

/// Sends over SMTP with implicit TLS
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// # Errors
    /// [`crate::Error`] if the sender address is invalid or the TLS parameters for `host`
    /// cannot be built
    pub fn new(settings: &SmtpSettings) -> Result<SmtpMailer, Error> {
        let from_address: Address = settings
            .from_email
            .parse()
            .map_err(Error::from)
            .add_context("parsing sender address")?;
        let credentials = Credentials::new(
            settings.username.clone(),
            settings.password.expose_secret().clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(Error::from)
            .add_context("creating smtp relay")?
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(SmtpMailer {
            transport,
            from: Mailbox::new(Some(settings.from_name.clone()), from_address),
        })
    }

    fn build_message(&self, mail: &OutgoingMail, message_id: &str) -> Result<Message, Error> {
        let to: Mailbox = mail
            .to
            .parse()
            .map_err(Error::from)
            .add_context("parsing recipient")?;
        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.as_str())
            .message_id(Some(message_id.to_string()));

        let html = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(mail.html.clone());
        let message = match &mail.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type)
                    .map_err(|e| Error::from(e.to_string()))
                    .add_context("parsing attachment content type")?;
                builder.multipart(
                    MultiPart::mixed().singlepart(html).singlepart(
                        Attachment::new(attachment.filename.clone())
                            .body(attachment.bytes.clone(), content_type),
                    ),
                )
            }
            None => builder.singlepart(html),
        };
        message.map_err(Error::from).add_context("building message")
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<DeliveryReceipt, Error> {
        let message_id = format!("<{}@{}>", uuid::Uuid::new_v4(), self.from.email.domain());
        let message = self.build_message(mail, &message_id)?;
        let response = self
            .transport
            .send(message)
            .await
            .map_err(Error::from)
            .add_context("sending mail")?;
        info!(
            to = %mail.to,
            message_id = %message_id,
            smtp_reply = response.message().next().unwrap_or_default(),
            "mail accepted by smtp server"
        );
        Ok(DeliveryReceipt { message_id })
    }
}

/// Keeps mails in memory instead of sending them. Used for dry runs and tests.
#[derive(Default)]
pub struct MockMailer {
    fail_with: Option<String>,
    send_count: AtomicU64,
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer whose transport rejects every mail with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail_with: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Number of mails accepted
    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<DeliveryReceipt, Error> {
        if let Some(reason) = &self.fail_with {
            return Err(Error::transport(reason.clone()).add_context("sending mail"));
        }
        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        match self.sent.lock() {
            Ok(mut sent) => sent.push(mail.clone()),
            Err(poisoned) => poisoned.into_inner().push(mail.clone()),
        }
        info!(
            to = %mail.to,
            subject = %mail.subject,
            attachment = mail.attachment.as_ref().map(|a| a.filename.as_str()),
            "[MOCK] mail would be sent"
        );
        Ok(DeliveryReceipt {
            message_id: format!("<mock-{count}@localhost>"),
        })
    }
}

//! SMTP delivery of rendered emails.
//!
//! Settings are validated before any message is built or any connection is
//! attempted. Failures are returned to the caller; nothing is retried.

mod smtp;

use std::fmt;

use async_trait::async_trait;
use lettre::{
    Message,
    address::AddressError,
    message::{Mailbox, MultiPart},
};
use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::application::render::RenderedEmail;

pub use smtp::SmtpMailTransport;

pub const METRIC_DELIVERY_TOTAL: &str = "mailsmith_delivery_total";
pub const METRIC_DELIVERY_FAILURES_TOTAL: &str = "mailsmith_delivery_failures_total";

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connection and sender settings for an SMTP relay.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Display name used in the `From` header.
    pub sender_identity: String,
    pub sender_address: String,
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("sender_identity", &self.sender_identity)
            .field("sender_address", &self.sender_address)
            .finish()
    }
}

/// Per-message options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub recipients: Vec<String>,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryConfigError {
    #[error("SMTP server is not set")]
    MissingServer,
    #[error("SMTP port must be non-zero")]
    InvalidPort,
    #[error("SMTP username is not set")]
    MissingUsername,
    #[error("sender identity is not set")]
    MissingSenderIdentity,
    #[error("sender address is not set")]
    MissingSenderAddress,
    #[error("at least one recipient is required")]
    NoRecipients,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Config(#[from] DeliveryConfigError),
    #[error("invalid address `{value}`: {source}")]
    Address {
        value: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport failed: {0}")]
    Transport(#[source] BoxError),
}

/// Check the required delivery fields in a fixed order, reporting the first
/// one that is missing.
pub fn validate(settings: &SmtpSettings, options: &SendOptions) -> Result<(), DeliveryConfigError> {
    if settings.server.trim().is_empty() {
        return Err(DeliveryConfigError::MissingServer);
    }
    if settings.port == 0 {
        return Err(DeliveryConfigError::InvalidPort);
    }
    if settings.username.trim().is_empty() {
        return Err(DeliveryConfigError::MissingUsername);
    }
    if settings.sender_identity.trim().is_empty() {
        return Err(DeliveryConfigError::MissingSenderIdentity);
    }
    if settings.sender_address.trim().is_empty() {
        return Err(DeliveryConfigError::MissingSenderAddress);
    }
    if options
        .recipients
        .iter()
        .all(|recipient| recipient.trim().is_empty())
    {
        return Err(DeliveryConfigError::NoRecipients);
    }
    Ok(())
}

/// Sends one assembled message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), BoxError>;
}

#[async_trait]
impl<T: MailTransport + ?Sized> MailTransport for std::sync::Arc<T> {
    async fn send(&self, message: Message) -> Result<(), BoxError> {
        (**self).send(message).await
    }
}

/// Validates, assembles and hands rendered emails to a transport.
#[derive(Debug, Clone)]
pub struct Mailer<T> {
    transport: T,
}

impl<T: MailTransport> Mailer<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn send(
        &self,
        settings: &SmtpSettings,
        options: &SendOptions,
        email: &RenderedEmail,
    ) -> Result<(), DeliveryError> {
        validate(settings, options)?;
        let message = build_message(settings, options, email)?;

        match self.transport.send(message).await {
            Ok(()) => {
                counter!(METRIC_DELIVERY_TOTAL).increment(1);
                info!(
                    target = "application::delivery",
                    subject = %options.subject,
                    recipients = options.recipients.len(),
                    "Email sent"
                );
                Ok(())
            }
            Err(err) => {
                counter!(METRIC_DELIVERY_FAILURES_TOTAL).increment(1);
                Err(DeliveryError::Transport(err))
            }
        }
    }
}

/// Assemble a `multipart/alternative` message with the plain-text part first.
pub fn build_message(
    settings: &SmtpSettings,
    options: &SendOptions,
    email: &RenderedEmail,
) -> Result<Message, DeliveryError> {
    let sender = settings
        .sender_address
        .trim()
        .parse()
        .map_err(|source| DeliveryError::Address {
            value: settings.sender_address.clone(),
            source,
        })?;
    let from = Mailbox::new(Some(settings.sender_identity.trim().to_string()), sender);

    let mut builder = Message::builder().from(from).subject(options.subject.as_str());
    for recipient in options
        .recipients
        .iter()
        .map(|recipient| recipient.trim())
        .filter(|recipient| !recipient.is_empty())
    {
        let mailbox: Mailbox = recipient.parse().map_err(|source| DeliveryError::Address {
            value: recipient.to_string(),
            source,
        })?;
        builder = builder.to(mailbox);
    }

    Ok(builder.multipart(MultiPart::alternative_plain_html(
        email.plain_text.clone(),
        email.html.clone(),
    ))?)
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        calls: AtomicUsize,
        sent: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: Message) -> Result<(), BoxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err("connection refused".into());
            }
            self.sent
                .lock()
                .expect("lock")
                .push(message.formatted());
            Ok(())
        }
    }

    fn settings() -> SmtpSettings {
        SmtpSettings {
            server: "smtp.example.com".to_string(),
            port: 587,
            username: "mailer".to_string(),
            password: "secret".to_string(),
            sender_identity: "Mailsmith".to_string(),
            sender_address: "noreply@example.com".to_string(),
        }
    }

    fn options() -> SendOptions {
        SendOptions {
            recipients: vec!["ada@example.com".to_string(), "Jon <jon@example.com>".to_string()],
            subject: "Mailsmith | default | welcome".to_string(),
        }
    }

    fn email() -> RenderedEmail {
        RenderedEmail {
            html: "<p>Hello</p>".to_string(),
            plain_text: "Hello".to_string(),
        }
    }

    #[test]
    fn validation_reports_fields_in_order() {
        let cases: [(fn(&mut SmtpSettings, &mut SendOptions), DeliveryConfigError); 6] = [
            (|s, _| s.server.clear(), DeliveryConfigError::MissingServer),
            (|s, _| s.port = 0, DeliveryConfigError::InvalidPort),
            (|s, _| s.username = "  ".to_string(), DeliveryConfigError::MissingUsername),
            (
                |s, _| s.sender_identity.clear(),
                DeliveryConfigError::MissingSenderIdentity,
            ),
            (
                |s, _| s.sender_address.clear(),
                DeliveryConfigError::MissingSenderAddress,
            ),
            (
                |_, o| o.recipients = vec![" ".to_string()],
                DeliveryConfigError::NoRecipients,
            ),
        ];

        for (mutate, expected) in cases {
            let mut settings = settings();
            let mut options = options();
            mutate(&mut settings, &mut options);
            assert_eq!(validate(&settings, &options), Err(expected));
        }

        let everything_missing = SmtpSettings {
            port: 25,
            ..SmtpSettings::default()
        };
        assert_eq!(
            validate(&everything_missing, &SendOptions::default()),
            Err(DeliveryConfigError::MissingServer)
        );
        assert_eq!(validate(&settings(), &options()), Ok(()));
    }

    #[tokio::test]
    async fn empty_server_never_reaches_the_transport() {
        let mailer = Mailer::new(Arc::new(RecordingTransport::default()));
        let settings = SmtpSettings {
            server: String::new(),
            ..settings()
        };

        let err = mailer
            .send(&settings, &options(), &email())
            .await
            .expect_err("server missing");

        assert!(matches!(
            err,
            DeliveryError::Config(DeliveryConfigError::MissingServer)
        ));
        assert_eq!(mailer.transport().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sends_multipart_alternative_to_every_recipient() {
        let mailer = Mailer::new(Arc::new(RecordingTransport::default()));

        mailer
            .send(&settings(), &options(), &email())
            .await
            .expect("sent");

        let sent = mailer.transport().sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        let raw = String::from_utf8_lossy(&sent[0]);
        assert!(raw.contains("From: Mailsmith <noreply@example.com>"));
        assert!(raw.contains("ada@example.com"));
        assert!(raw.contains("Jon <jon@example.com>"));
        assert!(raw.contains("Subject: Mailsmith | default | welcome"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
    }

    #[tokio::test]
    async fn invalid_addresses_are_reported() {
        let mailer = Mailer::new(Arc::new(RecordingTransport::default()));
        let options = SendOptions {
            recipients: vec!["not an address".to_string()],
            ..options()
        };

        let err = mailer
            .send(&settings(), &options, &email())
            .await
            .expect_err("invalid recipient");

        assert!(matches!(err, DeliveryError::Address { ref value, .. } if value == "not an address"));
        assert_eq!(mailer.transport().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn transport_failures_are_surfaced_once() {
        let transport = Arc::new(RecordingTransport {
            fail: true,
            ..RecordingTransport::default()
        });
        let mailer = Mailer::new(Arc::clone(&transport));

        let err = mailer
            .send(&settings(), &options(), &email())
            .await
            .expect_err("transport fails");

        assert!(matches!(err, DeliveryError::Transport(_)));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_output_redacts_password() {
        let rendered = format!("{:?}", settings());

        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}

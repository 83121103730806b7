use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    transport::smtp::authentication::Credentials,
};
use tracing::debug;

use super::{BoxError, DeliveryError, MailTransport, SmtpSettings};

/// Port on which the relay expects TLS from the first byte.
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// [`MailTransport`] backed by an authenticated SMTP relay.
pub struct SmtpMailTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    /// Build a pooled relay transport: implicit TLS on port 465, STARTTLS on
    /// any other port.
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, DeliveryError> {
        let host = settings.server.trim();
        let builder = if settings.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|err| DeliveryError::Transport(Box::new(err)))?;

        debug!(
            target = "application::delivery::smtp",
            server = host,
            port = settings.port,
            "SMTP transport configured"
        );

        let inner = builder
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self { inner })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: Message) -> Result<(), BoxError> {
        self.inner
            .send(message)
            .await
            .map(|_| ())
            .map_err(|err| Box::new(err) as BoxError)
    }
}

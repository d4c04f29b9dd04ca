use crate::config::{EmailSettings, SmtpSecurity};
use lettre::{
    address::AddressError,
    message::{Mailbox, MultiPart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};

/// Sender used when outbound mail is disabled.
pub const TESTING_SENDER: &str = "testing@picoctf.com";

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub default_sender: String,
    pub delivery: Delivery,
}

#[derive(Clone, Debug)]
pub enum Delivery {
    Smtp(SmtpConfig),
    /// Messages are accepted and logged but never sent.
    Suppressed,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub security: SmtpSecurity,
}

impl EmailSettings {
    pub fn transport_config(&self) -> MailConfig {
        if !self.enable_email {
            return MailConfig {
                default_sender: TESTING_SENDER.into(),
                delivery: Delivery::Suppressed,
            };
        }

        MailConfig {
            default_sender: self.from_addr.clone(),
            delivery: Delivery::Smtp(SmtpConfig {
                server: self.smtp_url.clone(),
                port: self.smtp_port,
                username: self.email_username.clone(),
                password: self.email_password.clone(),
                security: self.smtp_security,
            }),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("Invalid email address")]
    InvalidAddress(#[from] AddressError),
    #[error("Failed to build the email message")]
    Build(#[from] lettre::error::Error),
    #[error("Failed to deliver the email")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Outbound mail handle shared with the route handlers.
pub struct Mailer {
    sender: Mailbox,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Mailer {
    /// Does not connect; the SMTP session is opened on the first send.
    pub fn new(config: &MailConfig) -> Result<Self, MailError> {
        let sender = config.default_sender.parse()?;
        let transport = match &config.delivery {
            Delivery::Smtp(smtp) => Some(smtp_transport(smtp)?),
            Delivery::Suppressed => None,
        };

        Ok(Self { sender, transport })
    }

    pub fn sender(&self) -> &Mailbox {
        &self.sender
    }

    pub fn is_suppressed(&self) -> bool {
        self.transport.is_none()
    }

    #[tracing::instrument(name = "Sending an email", skip(self, html_body, text_body))]
    pub async fn send_email(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.sender.clone())
            .to(recipient.parse()?)
            .subject(subject)
            .multipart(MultiPart::alternative_plain_html(
                text_body.to_string(),
                html_body.to_string(),
            ))?;

        match &self.transport {
            Some(transport) => {
                transport.send(message).await?;
            }
            None => tracing::debug!("Email delivery is disabled, dropping the message"),
        }
        Ok(())
    }
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("sender", &self.sender.to_string())
            .field("suppressed", &self.is_suppressed())
            .finish()
    }
}

fn smtp_transport(config: &SmtpConfig) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let tls = match config.security {
        SmtpSecurity::Tls => Tls::Required(TlsParameters::new(config.server.clone())?),
        SmtpSecurity::Ssl => Tls::Wrapper(TlsParameters::new(config.server.clone())?),
        SmtpSecurity::Plain => Tls::None,
    };

    let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        .port(config.port)
        .tls(tls);
    if !config.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        ));
    }

    Ok(builder.build())
}

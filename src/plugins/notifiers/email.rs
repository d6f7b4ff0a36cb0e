use crate::config::{EmailSettings, SmtpLogin};
use crate::models::ProductRecord;
use crate::plugins::traits::{NotificationResult, NotifierPlugin};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::Utc;
use lettre::message::{header, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Which flavour of message to compose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    Restock,
    /// Sent by test mode to verify the mail configuration end to end.
    Test,
}

/// The mail transport capability: authenticate, send, release.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, login: &SmtpLogin, message: Message) -> Result<()>;
    async fn test_connection(&self, login: &SmtpLogin) -> Result<bool>;
}

/// STARTTLS submission to a relay such as `smtp.gmail.com:587`.
///
/// A fresh connection is opened for every call and dropped when the call
/// returns, whether or not the send succeeded.
#[derive(Debug, Clone)]
pub struct SmtpMailTransport {
    host: String,
    port: u16,
}

impl SmtpMailTransport {
    pub fn new(settings: &EmailSettings) -> Self {
        Self {
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
        }
    }

    fn connect(&self, login: &SmtpLogin) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let credentials = Credentials::new(login.username.clone(), login.password.clone());
        Ok(AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(credentials)
            .build())
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, login: &SmtpLogin, message: Message) -> Result<()> {
        tracing::debug!(host = %self.host, port = self.port, "Connecting to SMTP server");
        let mailer = self.connect(login)?;
        mailer.send(message).await?;
        Ok(())
    }

    async fn test_connection(&self, login: &SmtpLogin) -> Result<bool> {
        let mailer = self.connect(login)?;
        Ok(mailer.test_connection().await?)
    }
}

pub struct EmailNotifier<'a, T> {
    settings: &'a EmailSettings,
    transport: T,
    kind: EmailKind,
}

impl<'a, T: MailTransport> EmailNotifier<'a, T> {
    pub fn new(settings: &'a EmailSettings, transport: T, kind: EmailKind) -> Self {
        EmailNotifier { settings, transport, kind }
    }

    fn format_subject(&self, record: &ProductRecord) -> String {
        match self.kind {
            EmailKind::Restock => format!("[Restock] {} is back in stock!", record.name),
            EmailKind::Test => format!("[TEST] {} stock notification test", record.name),
        }
    }

    fn format_text_body(&self, record: &ProductRecord) -> String {
        let mut text = String::new();

        match self.kind {
            EmailKind::Restock => {
                text.push_str(&format!("Heads up: {} is back in stock!\n\n", record.name))
            }
            EmailKind::Test => text.push_str(&format!(
                "This is a test email. Checking the stock alert for {}.\n\n",
                record.name
            )),
        }

        text.push_str(&format!("Price: {}\n\n", record.price));
        text.push_str(&format!(
            "URL: {}\n\n",
            record.detail_url.as_deref().unwrap_or("(no link)")
        ));

        match self.kind {
            EmailKind::Restock => text.push_str("Check it soon.\n"),
            EmailKind::Test => {
                text.push_str("This email was sent from the stock watcher's test mode.\n")
            }
        }

        text
    }

    fn compose(&self, login: &SmtpLogin, record: &ProductRecord) -> Result<Message> {
        let from: Mailbox = login.username.parse()?;
        let to: Mailbox = login.recipient.parse()?;

        Ok(Message::builder()
            .from(from)
            .to(to)
            .subject(self.format_subject(record))
            .header(header::ContentType::TEXT_PLAIN)
            .body(self.format_text_body(record))?)
    }
}

#[async_trait]
impl<'a, T: MailTransport> NotifierPlugin for EmailNotifier<'a, T> {
    async fn notify(&self, record: &ProductRecord) -> Result<NotificationResult> {
        // Checked before anything touches the network.
        let login = self.settings.login()?;
        let message = self.compose(&login, record)?;

        self.transport.send(&login, message).await?;

        let sent_at = Utc::now();
        Ok(NotificationResult {
            message_id: format!("email-{}", sent_at.timestamp_millis()),
            recipient: login.recipient,
            sent_at,
        })
    }

    async fn test_connection(&self) -> Result<bool> {
        let login = self.settings.login()?;
        self.transport.test_connection(&login).await
    }
}

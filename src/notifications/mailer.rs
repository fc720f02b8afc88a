use async_trait::async_trait;
use lettre::{
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::{config::MailConfig, notifications::message::OutgoingMail};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address: {0}")]
    Address(String),

    #[error("could not build message: {0}")]
    Build(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Authenticated STARTTLS relay when credentials are configured, plain local relay otherwise
    /// (Mailpit, MailHog and friends).
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid MAIL_FROM: {e}"))?;

        let transport = match (&config.smtp_username, &config.smtp_password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                    .port(config.smtp_port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build()
            }
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port)
                .build(),
        };

        Ok(Self { transport, from })
    }

    fn build(&self, mail: &OutgoingMail) -> Result<Message, MailError> {
        let address = mail
            .to_email
            .parse::<Address>()
            .map_err(|e| MailError::Address(format!("{e}")))?;

        Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(Some(mail.to_name.clone()), address))
            .subject(mail.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = self.build(mail)?;
        self.transport
            .send(message)
            .await
            .map(|_response| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Writes mail to the log instead of a relay.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            to = %mail.to_email,
            subject = %mail.subject,
            "mail written to log"
        );
        // Bodies carry verification links.
        tracing::debug!(to = %mail.to_email, body = %mail.body, "mail body");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::config::{DispatchMode, MailDriver};

    fn mail_config(from: &str) -> MailConfig {
        MailConfig {
            driver: MailDriver::Smtp,
            smtp_host: "localhost".into(),
            smtp_port: 1025,
            smtp_username: None,
            smtp_password: None,
            from: from.into(),
            retry_attempts: 5,
            retry_delay: Duration::from_millis(100),
            dispatch: DispatchMode::Inline,
        }
    }

    fn mail(to: &str) -> OutgoingMail {
        OutgoingMail {
            to_name: "Ada".into(),
            to_email: to.into(),
            subject: "Hello".into(),
            body: "Body".into(),
        }
    }

    #[test]
    fn rejects_invalid_sender_address() {
        assert!(SmtpMailer::from_config(&mail_config("not-an-address")).is_err());
    }

    #[tokio::test]
    async fn invalid_recipient_fails_before_transport() {
        let mailer = SmtpMailer::from_config(&mail_config("Shop <shop@example.com>")).unwrap();

        let result = mailer.send(&mail("not-an-email")).await;

        assert!(matches!(result, Err(MailError::Address(_))));
    }

    #[tokio::test]
    async fn builds_plain_text_message() {
        let mailer = SmtpMailer::from_config(&mail_config("shop@example.com")).unwrap();

        let message = mailer.build(&mail("ada@example.com")).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Hello"));
        assert!(raw.contains("ada@example.com"));
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        assert!(LogMailer.send(&mail("anything")).await.is_ok());
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn log_mailer_keeps_body_out_of_info_logs() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut outgoing = mail("ada@example.com");
        outgoing.body = "http://shop.test/api/users/verify/tok-123".into();
        LogMailer.send(&outgoing).await.unwrap();

        let logged = captured.text();
        assert!(logged.contains("ada@example.com"), "{logged}");
        assert!(!logged.contains("tok-123"), "{logged}");
    }
}

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::{AppConfig, DispatchMode, MailDriver},
    entity::users::Model as UserModel,
    notifications::{
        mailer::{LogMailer, MailError, Mailer, SmtpMailer},
        message::{NotificationKind, OutgoingMail},
    },
};

/// Fixed-delay retry: `attempts` sends at most, `delay` between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Error)]
#[error("mail delivery failed after {attempts} attempts: {last_error}")]
pub struct DeliveryFailure {
    pub attempts: u32,
    pub last_error: MailError,
}

/// Sends `mail`, retrying transient failures. Returns the number of attempts used.
pub async fn send_with_retry(
    mailer: &dyn Mailer,
    mail: &OutgoingMail,
    policy: RetryPolicy,
) -> Result<u32, DeliveryFailure> {
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match mailer.send(mail).await {
            Ok(()) => return Ok(attempt),
            Err(err) if attempt >= attempts => {
                return Err(DeliveryFailure {
                    attempts: attempt,
                    last_error: err,
                });
            }
            Err(err) => {
                tracing::debug!(attempt, error = %err, "mail send failed, retrying");
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}

/// Delivers lifecycle mail after the triggering write has committed.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
    mode: DispatchMode,
    app_url: Arc<str>,
}

impl Notifier {
    pub fn new(
        mailer: Arc<dyn Mailer>,
        policy: RetryPolicy,
        mode: DispatchMode,
        app_url: impl Into<String>,
    ) -> Self {
        Self {
            mailer,
            policy,
            mode,
            app_url: Arc::from(app_url.into()),
        }
    }

    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match config.mail.driver {
            MailDriver::Smtp => Arc::new(SmtpMailer::from_config(&config.mail)?),
            MailDriver::Log => Arc::new(LogMailer),
        };
        let policy = RetryPolicy {
            attempts: config.mail.retry_attempts,
            delay: config.mail.retry_delay,
        };
        Ok(Self::new(
            mailer,
            policy,
            config.mail.dispatch,
            config.app_url.clone(),
        ))
    }

    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// Never fails: exhausted retries are reported through the log and swallowed.
    pub async fn notify(&self, kind: NotificationKind, user: &UserModel) {
        let Some(mail) = OutgoingMail::render(kind, user, &self.app_url) else {
            tracing::warn!(
                user_id = %user.id,
                kind = kind.as_str(),
                "no pending verification token, notification skipped"
            );
            return;
        };

        match self.mode {
            DispatchMode::Inline => self.deliver(kind, user.id, mail).await,
            DispatchMode::Background => {
                let notifier = self.clone();
                let user_id = user.id;
                tokio::spawn(async move { notifier.deliver(kind, user_id, mail).await });
            }
        }
    }

    async fn deliver(&self, kind: NotificationKind, user_id: Uuid, mail: OutgoingMail) {
        match send_with_retry(self.mailer.as_ref(), &mail, self.policy).await {
            Ok(attempts) => {
                tracing::info!(%user_id, kind = kind.as_str(), attempts, "notification delivered");
            }
            Err(failure) => {
                tracing::error!(
                    %user_id,
                    kind = kind.as_str(),
                    attempts = failure.attempts,
                    error = %failure.last_error,
                    "notification delivery exhausted retries"
                );
            }
        }
    }
}

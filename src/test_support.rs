use std::{
    sync::{Arc, Mutex, OnceLock},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::{
    config::DispatchMode,
    entity::users::{Model as UserModel, UserRole},
    notifications::{MailError, Mailer, Notifier, OutgoingMail, RetryPolicy},
    services::user_service::hash_password,
    state::AppState,
};

pub const PASSWORD: &str = "secret1";

fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).unwrap_or_default())
        .clone()
}

/// A stored user; verified exactly when no token is given.
pub fn user_model(name: &str, email: &str, token: Option<&str>) -> UserModel {
    let now = Utc::now().fixed_offset();
    UserModel {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: email.to_string(),
        password_hash: password_hash(),
        role: UserRole::User,
        verified: token.is_none(),
        verification_token: token.map(str::to_string),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

pub fn state_with(orm: DatabaseConnection, mailer: RecordingMailer) -> AppState {
    let notifier = Notifier::new(
        Arc::new(mailer),
        RetryPolicy {
            attempts: 5,
            delay: Duration::from_millis(1),
        },
        DispatchMode::Inline,
        "http://shop.test",
    );
    AppState {
        orm: Arc::new(orm),
        notifier,
    }
}

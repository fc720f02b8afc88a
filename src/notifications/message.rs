use serde::Serialize;

use crate::entity::users::Model as UserModel;

/// Identity lifecycle mails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AccountCreated,
    EmailChanged,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AccountCreated => "account_created",
            NotificationKind::EmailChanged => "email_changed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

pub fn verification_link(app_url: &str, token: &str) -> String {
    format!("{}/api/users/verify/{}", app_url.trim_end_matches('/'), token)
}

impl OutgoingMail {
    /// Renders the mail for `user`, or `None` when the user holds no pending token.
    pub fn render(kind: NotificationKind, user: &UserModel, app_url: &str) -> Option<Self> {
        let token = user.verification_token.as_deref()?;
        let link = verification_link(app_url, token);

        let (subject, body) = match kind {
            NotificationKind::AccountCreated => (
                "Please confirm your account".to_string(),
                format!(
                    "Hello {},\n\nThanks for creating an account. Please verify your email using this link:\n{}\n",
                    user.name, link
                ),
            ),
            NotificationKind::EmailChanged => (
                "Please confirm your new email".to_string(),
                format!(
                    "Hello {},\n\nYou changed your email, so we need to verify this new address. Please use the link below:\n{}\n",
                    user.name, link
                ),
            ),
        };

        Some(Self {
            to_name: user.name.clone(),
            to_email: user.email.clone(),
            subject,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::user_model;

    #[test]
    fn account_created_mail_links_to_verification() {
        let user = user_model("Ada", "ada@example.com", Some("tok123"));

        let mail = OutgoingMail::render(NotificationKind::AccountCreated, &user, "http://shop.test/")
            .unwrap();

        assert_eq!(mail.to_email, "ada@example.com");
        assert_eq!(mail.subject, "Please confirm your account");
        assert!(mail.body.contains("http://shop.test/api/users/verify/tok123"));
    }

    #[test]
    fn email_changed_mail_goes_to_new_address() {
        let user = user_model("Ada", "new@example.com", Some("fresh"));

        let mail =
            OutgoingMail::render(NotificationKind::EmailChanged, &user, "http://shop.test").unwrap();

        assert_eq!(mail.to_email, "new@example.com");
        assert!(mail.body.contains("/api/users/verify/fresh"));
    }

    #[test]
    fn verified_user_has_nothing_to_render() {
        let user = user_model("Ada", "ada@example.com", None);

        assert!(OutgoingMail::render(NotificationKind::AccountCreated, &user, "http://x").is_none());
    }
}

pub mod dispatcher;
pub mod mailer;
pub mod message;

pub use dispatcher::{DeliveryFailure, Notifier, RetryPolicy, send_with_retry};
pub use mailer::{LogMailer, MailError, Mailer, SmtpMailer};
pub use message::{NotificationKind, OutgoingMail};

use std::{env, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailDriver {
    /// Render mail into the tracing log instead of sending it.
    Log,
    Smtp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// The request awaits the retry loop.
    Inline,
    /// Delivery is spawned onto the runtime after the write commits.
    Background,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub driver: MailDriver,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub dispatch: DispatchMode,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub app_url: String,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let app_url = env::var("APP_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));
        Ok(Self {
            port,
            database_url,
            host,
            app_url,
            mail: MailConfig::from_env()?,
        })
    }
}

impl MailConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let driver = match env::var("MAIL_DRIVER").as_deref() {
            Ok("smtp") => MailDriver::Smtp,
            Ok("log") | Err(_) => MailDriver::Log,
            Ok(other) => anyhow::bail!("unsupported MAIL_DRIVER `{other}`"),
        };
        let dispatch = match env::var("MAIL_DISPATCH").as_deref() {
            Ok("background") => DispatchMode::Background,
            Ok("inline") | Err(_) => DispatchMode::Inline,
            Ok(other) => anyhow::bail!("unsupported MAIL_DISPATCH `{other}`"),
        };
        let smtp_port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(587);
        let retry_attempts = env::var("MAIL_RETRY_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5)
            .max(1);
        let retry_delay_ms = env::var("MAIL_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(100);

        Ok(Self {
            driver,
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
            smtp_port,
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "Marketplace <no-reply@marketplace.local>".to_string()),
            retry_attempts,
            retry_delay: Duration::from_millis(retry_delay_ms),
            dispatch,
        })
    }
}

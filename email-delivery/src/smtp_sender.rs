use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::Mailer;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::fmt;
use tracing::debug;

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Providers whose port 465 speaks TLS from the first byte.
const IMPLICIT_TLS_HOSTS: &[&str] = &["smtp.163.com", "smtp.126.com", "smtp.qq.com", "smtp.gmail.com"];
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS wrapper from connect (SMTPS).
    Implicit,
    /// Plain connect upgraded with STARTTLS.
    StartTls,
}

impl TlsMode {
    pub fn for_endpoint(host: &str, port: u16) -> Self {
        let known = IMPLICIT_TLS_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(host));
        if known && port == IMPLICIT_TLS_PORT {
            TlsMode::Implicit
        } else {
            TlsMode::StartTls
        }
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub recipients: Vec<String>,
}

impl SmtpConfig {
    /// Read `EMAIL_HOST`, `EMAIL_PORT`, `EMAIL_USER`, `EMAIL_PASSWORD` and the
    /// comma separated `RECIPIENT_EMAIL` through `lookup`. Missing values stay
    /// empty; call `missing_fields` to validate.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup("EMAIL_HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());

        let port = match lookup("EMAIL_PORT").filter(|p| !p.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("EMAIL_PORT '{}' is not a valid port: {}", raw, e))?,
            None => DEFAULT_SMTP_PORT,
        };

        Ok(Self {
            host: host.trim().to_string(),
            port,
            username: lookup("EMAIL_USER").unwrap_or_default().trim().to_string(),
            password: lookup("EMAIL_PASSWORD").unwrap_or_default(),
            recipients: parse_recipients(&lookup("RECIPIENT_EMAIL").unwrap_or_default()),
        })
    }

    /// Names of the required variables that are absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.is_empty() {
            missing.push("EMAIL_USER");
        }
        if self.password.is_empty() {
            missing.push("EMAIL_PASSWORD");
        }
        if self.recipients.is_empty() {
            missing.push("RECIPIENT_EMAIL");
        }
        missing
    }

    pub fn tls_mode(&self) -> TlsMode {
        TlsMode::for_endpoint(&self.host, self.port)
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("recipients", &self.recipients)
            .finish()
    }
}

pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

/// Plaintext UTF-8 message from the configured account.
pub fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message> {
    let message = Message::builder()
        .from(from.parse()?)
        .to(to.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())?;
    Ok(message)
}

/// `Mailer` over an authenticated SMTP relay.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let builder = match config.tls_mode() {
            TlsMode::Implicit => SmtpTransport::relay(&config.host)?,
            TlsMode::StartTls => SmtpTransport::starttls_relay(&config.host)?,
        };
        let transport = builder.port(config.port).credentials(credentials).build();

        debug!(host = %config.host, port = config.port, tls = ?config.tls_mode(), "SMTP transport ready");

        Ok(Self {
            transport,
            from: config.username.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let message = build_message(&self.from, recipient, subject, body)?;
        let transport = self.transport.clone();

        // lettre's SmtpTransport blocks; keep it off the async workers.
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await?
            .map_err(|e| anyhow::anyhow!("SMTP send failed: {}", e))?;
        Ok(())
    }
}

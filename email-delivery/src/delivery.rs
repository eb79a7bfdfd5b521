use chrono::{DateTime, Local};
use interfaces::defs::Mailer;
use tracing::{error, info, warn};

/// Outcome of sending one message to every recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl DeliveryReport {
    pub fn attempted(&self) -> usize {
        self.sent.len() + self.failed.len()
    }

    /// At least one recipient received the message.
    pub fn is_success(&self) -> bool {
        !self.sent.is_empty()
    }
}

/// Send `body` to each recipient in turn. A failure for one address is logged
/// and does not stop the others.
pub async fn deliver(mailer: &dyn Mailer, recipients: &[String], subject: &str, body: &str) -> DeliveryReport {
    let mut report = DeliveryReport::default();

    for recipient in recipients {
        match mailer.send(recipient, subject, body).await {
            Ok(()) => {
                info!(recipient = %recipient, "Email sent");
                report.sent.push(recipient.clone());
            }
            Err(e) => {
                error!(recipient = %recipient, error = %e, "Email send failed");
                report.failed.push((recipient.clone(), e.to_string()));
            }
        }
    }

    if report.failed.is_empty() {
        info!("Email sent {}/{}", report.sent.len(), report.attempted());
    } else {
        warn!("Email sent {}/{}", report.sent.len(), report.attempted());
    }
    report
}

pub const TEST_SUBJECT: &str = "arXiv digest - test email";

pub fn test_email_body(now: DateTime<Local>) -> String {
    format!(
        "This is a test email from the arXiv digest service.\n\n\
         If you received it, the SMTP settings are working.\n\n\
         Sent at: {}",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Connectivity check used by the `test` command.
pub async fn send_test_email(mailer: &dyn Mailer, recipients: &[String], now: DateTime<Local>) -> DeliveryReport {
    deliver(mailer, recipients, TEST_SUBJECT, &test_email_body(now)).await
}

use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::Mailer;
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records every message; refuses recipients listed in `rejects`.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMessage>>,
    pub rejects: Vec<String>,
}

impl RecordingMailer {
    pub fn rejecting(rejects: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            rejects: rejects.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        if self.rejects.iter().any(|r| r == recipient) {
            anyhow::bail!("550 mailbox unavailable: {}", recipient);
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub fn recipients(list: &[&str]) -> Vec<String> {
    list.iter().map(|r| r.to_string()).collect()
}

#![allow(dead_code)]

use anyhow::Result as AnyResult;
use arxiv_digest::{Mailer, PaperRecord, PaperSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Request seen by the canned HTTP server.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub target: String,
    pub body: String,
}

pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(content_type: &'static str, body: impl Into<String>) -> Self {
        Self { status: 200, content_type, body: body.into() }
    }

    pub fn status(status: u16) -> Self {
        Self { status, content_type: "text/plain", body: "error".to_string() }
    }
}

/// Serve canned responses on an ephemeral port until the test ends.
/// Every request is recorded in `log`.
pub async fn spawn_http_server<F>(handler: F) -> (SocketAddr, Arc<Mutex<Vec<HttpRequest>>>)
where
    F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler = Arc::new(handler);

    let server_log = log.clone();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let handler = handler.clone();
            let log = server_log.clone();
            tokio::spawn(async move {
                let _ = serve_connection(stream, handler.as_ref(), &log).await;
            });
        }
    });

    (addr, log)
}

async fn serve_connection<F>(mut stream: TcpStream, handler: &F, log: &Mutex<Vec<HttpRequest>>) -> std::io::Result<()>
where
    F: Fn(&HttpRequest) -> HttpResponse,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length").then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let request = HttpRequest {
        method: request_line.next().unwrap_or_default().to_string(),
        target: request_line.next().unwrap_or_default().to_string(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    };
    let response = handler(&request);
    log.lock().unwrap().push(request);

    let reply = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.content_type,
        response.body.len(),
        response.body
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

pub struct AtomEntry<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub summary: &'a str,
    pub published: DateTime<Utc>,
}

pub fn atom_feed(entries: &[AtomEntry<'_>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query</title>
  <id>http://arxiv.org/api/query</id>
  <updated>2024-01-16T00:00:00-05:00</updated>
"#,
    );
    for entry in entries {
        xml.push_str(&format!(
            r#"  <entry>
    <id>http://arxiv.org/abs/{id}</id>
    <updated>{published}</updated>
    <published>{published}</published>
    <title>{title}</title>
    <summary>{summary}</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/{id}" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}" rel="related" type="application/pdf"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
"#,
            id = entry.id,
            title = entry.title,
            summary = entry.summary,
            published = entry.published.to_rfc3339(),
        ));
    }
    xml.push_str("</feed>\n");
    xml
}

/// In-memory source returning a fixed list.
pub struct StaticSource {
    pub papers: Vec<PaperRecord>,
}

#[async_trait]
impl PaperSource for StaticSource {
    async fn fetch(&self, _categories: &[String], _max_per_category: usize, _days_back: u32) -> Vec<PaperRecord> {
        self.papers.clone()
    }
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Records messages through a shared handle so the test keeps access after
/// the mailer is boxed into the pipeline.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
    pub fail_all: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self { sent: Arc::default(), fail_all: true }
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> AnyResult<()> {
        if self.fail_all {
            anyhow::bail!("connection refused");
        }
        self.sent.lock().unwrap().push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

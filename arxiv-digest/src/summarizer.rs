use crate::types::{DigestError, Result, Synopsis};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const HEURISTIC_SPAN: usize = 200;

const SYSTEM_PROMPT: &str = "You are a research assistant who writes short, precise synopses of academic papers.";

const CORE_PROBLEM_LABELS: &[&str] = &["核心问题", "core problem"];
const KEY_APPROACH_LABELS: &[&str] = &["关键思路", "key approach"];
const MAIN_CONCLUSION_LABELS: &[&str] = &["主要结论", "main conclusion"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_seconds: u64,
    pub enable_thinking: Option<bool>,
    /// Only ever read from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: 120,
            enable_thinking: None,
            api_key: None,
        }
    }
}

impl SummarizerConfig {
    /// Remote summaries need both the flag and a credential.
    pub fn remote_enabled(&self) -> bool {
        self.enabled && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Trait for LLM adapters that can turn a prompt into text
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    /// Get the name of this LLM adapter
    fn adapter_name(&self) -> String;

    /// Send one system/user instruction pair and return the generated message
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_thinking: Option<bool>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions endpoint.
pub struct ChatCompletionsAdapter {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    enable_thinking: Option<bool>,
}

impl ChatCompletionsAdapter {
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| DigestError::Config("summarizer API key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            enable_thinking: config.enable_thinking,
        })
    }
}

#[async_trait]
impl LlmAdapter for ChatCompletionsAdapter {
    fn adapter_name(&self) -> String {
        format!("chat-completions ({})", self.model)
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            stream: false,
            temperature: 0.3,
            max_tokens: 500,
            enable_thinking: self.enable_thinking,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DigestError::General(format!("LLM API returned {}: {}", status, body)));
        }

        let reply: ChatResponse = response.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DigestError::Parse("LLM reply has no message content".to_string()))
    }
}

/// Produces a `Synopsis` for a paper. Never fails: remote errors fall back to
/// the local heuristic with `degraded` set.
pub struct SynopsisGenerator {
    adapter: Option<Box<dyn LlmAdapter>>,
}

impl SynopsisGenerator {
    pub fn from_config(config: &SummarizerConfig) -> Result<Self> {
        if !config.remote_enabled() {
            info!("Remote summaries disabled, using local heuristic");
            return Ok(Self::disabled());
        }
        let adapter = ChatCompletionsAdapter::new(config)?;
        info!("Remote summaries via {}", adapter.adapter_name());
        Ok(Self::with_adapter(Box::new(adapter)))
    }

    pub fn disabled() -> Self {
        Self { adapter: None }
    }

    pub fn with_adapter(adapter: Box<dyn LlmAdapter>) -> Self {
        Self { adapter: Some(adapter) }
    }

    pub fn is_remote(&self) -> bool {
        self.adapter.is_some()
    }

    pub async fn summarize(&self, title: &str, abstract_text: &str) -> Synopsis {
        let Some(adapter) = &self.adapter else {
            return heuristic_synopsis(abstract_text);
        };

        let prompt = build_prompt(title, abstract_text);
        let outcome = match adapter.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(reply) => parse_reply(&reply)
                .ok_or_else(|| DigestError::Parse("no labelled sections in reply".to_string())),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(synopsis) => {
                debug!(adapter = %adapter.adapter_name(), "Remote synopsis parsed");
                synopsis
            }
            Err(e) => {
                warn!(error = %e, "Remote summary failed, falling back to heuristic");
                Synopsis {
                    degraded: true,
                    ..heuristic_synopsis(abstract_text)
                }
            }
        }
    }
}

fn build_prompt(title: &str, abstract_text: &str) -> String {
    format!(
        r#"Analyse the following academic paper and extract its key information.

Title: {title}
Abstract: {abstract_text}

Answer in Simplified Chinese, using exactly this format:
核心问题：[the core problem the paper addresses]
关键思路：[the main method and what is new about it]
主要结论：[the main findings and results]

Rules:
1. Keep each section under 100 characters.
2. Emphasise technical points and novelty.
3. Output nothing besides the three sections."#
    )
}

/// Local fallback built from the abstract's sentences.
pub fn heuristic_synopsis(abstract_text: &str) -> Synopsis {
    let sentences: Vec<&str> = abstract_text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let chars: Vec<char> = abstract_text.chars().collect();
    let span = |from: usize, to: usize| -> String {
        let to = to.min(chars.len());
        let from = from.min(to);
        chars[from..to].iter().collect::<String>().trim().to_string()
    };

    let core_problem = match sentences.first() {
        Some(first) => first.to_string(),
        None => span(0, HEURISTIC_SPAN),
    };
    let key_approach = match sentences.get(1) {
        Some(second) => second.to_string(),
        None => span(HEURISTIC_SPAN, 2 * HEURISTIC_SPAN),
    };
    let main_conclusion = match sentences.last() {
        Some(last) => last.to_string(),
        None => span(chars.len().saturating_sub(HEURISTIC_SPAN), chars.len()),
    };

    Synopsis {
        core_problem,
        key_approach,
        main_conclusion,
        degraded: false,
    }
}

#[derive(Clone, Copy)]
enum Section {
    CoreProblem,
    KeyApproach,
    MainConclusion,
}

/// Parse a labelled reply. `None` when no label is found at all.
pub fn parse_reply(content: &str) -> Option<Synopsis> {
    let mut core_problem = String::new();
    let mut key_approach = String::new();
    let mut main_conclusion = String::new();
    let mut current: Option<Section> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((section, rest)) = find_label(line) {
            current = Some(section);
            let target = match section {
                Section::CoreProblem => &mut core_problem,
                Section::KeyApproach => &mut key_approach,
                Section::MainConclusion => &mut main_conclusion,
            };
            *target = after_separator(rest).to_string();
            continue;
        }

        let Some(section) = current else {
            continue;
        };
        if line.starts_with(['[', '【']) {
            continue;
        }
        let target = match section {
            Section::CoreProblem => &mut core_problem,
            Section::KeyApproach => &mut key_approach,
            Section::MainConclusion => &mut main_conclusion,
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(line);
    }

    current?;
    Some(Synopsis {
        core_problem: core_problem.trim().to_string(),
        key_approach: key_approach.trim().to_string(),
        main_conclusion: main_conclusion.trim().to_string(),
        degraded: false,
    })
}

/// Locate the earliest recognised label in `line`, returning its section and
/// the text following it.
fn find_label(line: &str) -> Option<(Section, &str)> {
    let sections = [
        (Section::CoreProblem, CORE_PROBLEM_LABELS),
        (Section::KeyApproach, KEY_APPROACH_LABELS),
        (Section::MainConclusion, MAIN_CONCLUSION_LABELS),
    ];

    sections
        .iter()
        .flat_map(|(section, labels)| labels.iter().map(move |label| (*section, *label)))
        .filter_map(|(section, label)| {
            find_ignore_ascii_case(line, label).map(|(start, end)| (start, section, end))
        })
        .min_by_key(|(start, _, _)| *start)
        .map(|(_, section, end)| (section, &line[end..]))
}

/// Byte range of the first case-insensitive occurrence of `needle`.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    haystack.char_indices().find_map(|(start, _)| {
        let end = start + needle.len();
        haystack
            .get(start..end)
            .filter(|candidate| candidate.eq_ignore_ascii_case(needle))
            .map(|_| (start, end))
    })
}

fn after_separator(rest: &str) -> &str {
    let rest = match rest.find(['：', ':']) {
        Some(idx) => {
            let sep_len = rest[idx..].chars().next().map_or(0, char::len_utf8);
            &rest[idx + sep_len..]
        }
        None => rest,
    };
    rest.trim()
}

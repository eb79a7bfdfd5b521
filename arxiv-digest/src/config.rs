use crate::summarizer::SummarizerConfig;
use crate::types::{DigestError, FetchConfig, GlobalKeywordSet, KeywordGroup, Result};
use chrono::NaiveTime;
use email_delivery::SmtpConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
const PROCESS_TIME_FORMAT: &str = "%H:%M";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

/// Everything the digest run needs that is not a secret. Loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestSettings {
    pub categories: Vec<String>,
    pub max_per_category: usize,
    pub days_back: u32,
    pub max_papers_per_group: usize,
    pub min_score: u32,
    pub process_time: String,
    pub subject_prefix: String,
    pub global: GlobalKeywordSet,
    pub groups: Vec<KeywordGroup>,
    pub fetch: FetchConfig,
    pub summarizer: SummarizerConfig,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            categories: ["cs.AI", "cs.CV", "cs.LG", "cs.CL", "cs.NE", "cs.RO", "stat.ML"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            max_per_category: 5000,
            days_back: 7,
            max_papers_per_group: 5,
            min_score: crate::filter::DEFAULT_MIN_SCORE,
            process_time: "00:01".to_string(),
            subject_prefix: "[arXiv]".to_string(),
            global: GlobalKeywordSet {
                include: Vec::new(),
                exclude: ["survey", "review", "tutorial", "综述", "教程"]
                    .iter()
                    .map(|t| t.to_string())
                    .collect(),
            },
            groups: vec![
                KeywordGroup::new(
                    "dllm",
                    &[
                        "diffusion language model",
                        "discrete diffusion model",
                        "dllm",
                        "discrete large language model",
                        "diffusion",
                    ],
                    &[],
                ),
                KeywordGroup::new(
                    "video understanding",
                    &["video", "video understanding", "video large language model", "video llm", "vllm", "vlm"],
                    &[],
                ),
            ],
            fetch: FetchConfig::default(),
            summarizer: SummarizerConfig::default(),
        }
    }
}

impl DigestSettings {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn process_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(self.process_time.trim(), PROCESS_TIME_FORMAT).map_err(|e| {
            DigestError::Config(format!("process_time '{}' is not HH:MM: {}", self.process_time, e))
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: "logs".to_string(),
            file_name: "arxiv_digest.log".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub digest: DigestSettings,
    pub email: SmtpConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load `.env`, the TOML file and the process environment, in that order.
    ///
    /// An explicitly requested file must exist; the default path falls back to
    /// built-in settings when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::try_load_dotenv();

        let toml_content = match path {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
                DigestError::Config(format!("cannot read config file {}: {}", path.display(), e))
            })?),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Some(std::fs::read_to_string(default_path)?)
                } else {
                    debug!("No {} found, using built-in settings", DEFAULT_CONFIG_PATH);
                    None
                }
            }
        };

        Self::from_sources(toml_content.as_deref(), |key| env::var(key).ok())
    }

    /// Build a config from TOML text (or defaults) plus an environment lookup.
    pub fn from_sources(toml_content: Option<&str>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut digest = match toml_content {
            Some(content) => DigestSettings::from_toml(content)?,
            None => DigestSettings::default(),
        };

        apply_summarizer_env(&mut digest.summarizer, &lookup)?;

        let email = SmtpConfig::from_lookup(&lookup).map_err(|e| DigestError::Config(e.to_string()))?;

        let mut logging = LoggingConfig::default();
        if let Some(level) = non_empty(lookup("LOG_LEVEL")) {
            logging.level = level.to_lowercase();
        }
        if let Some(file_name) = non_empty(lookup("LOG_FILE")) {
            logging.file_name = file_name;
        }

        Ok(Self { digest, email, logging })
    }

    fn try_load_dotenv() {
        // Environment variables set system-wide are fine too.
        if dotenvy::dotenv().is_ok() {
            debug!("Loaded .env from the working directory");
        }
    }

    /// Reject configurations that cannot produce a delivered digest.
    pub fn validate(&self) -> Result<()> {
        let missing = self.email.missing_fields();
        if !missing.is_empty() {
            return Err(DigestError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let mut seen = HashSet::new();
        for group in &self.digest.groups {
            if group.name.trim().is_empty() {
                return Err(DigestError::Config("keyword group with an empty name".to_string()));
            }
            if !seen.insert(group.name.as_str()) {
                return Err(DigestError::Config(format!("duplicate keyword group '{}'", group.name)));
            }
        }

        self.digest.process_time()?;
        Ok(())
    }

    /// Log the effective settings. The SMTP password is never written out.
    pub fn log_summary(&self) {
        let digest = &self.digest;
        let group_names: Vec<&str> = digest.groups.iter().map(|g| g.name.as_str()).collect();

        info!(
            count = digest.categories.len(),
            categories = %digest.categories.join(", "),
            "Categories"
        );
        info!(
            max_per_category = digest.max_per_category,
            days_back = digest.days_back,
            max_papers_per_group = digest.max_papers_per_group,
            min_score = digest.min_score,
            process_time = %digest.process_time,
            "Limits"
        );
        info!(groups = %group_names.join(", "), global_exclude = %digest.global.exclude.join(", "), "Keyword groups");
        info!(
            model = %digest.summarizer.model,
            ai_summary = digest.summarizer.remote_enabled(),
            "Summarizer"
        );
        info!(
            host = %self.email.host,
            port = self.email.port,
            sender = %self.email.username,
            recipients = %self.email.recipients.join(", "),
            "Email"
        );
    }
}

fn apply_summarizer_env(config: &mut SummarizerConfig, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
    config.api_key = non_empty(lookup("OPENAI_API_KEY")).or_else(|| non_empty(lookup("LLM_API_KEY")));

    if let Some(base) = non_empty(lookup("LLM_API_BASE_URL")) {
        config.endpoint = chat_completions_endpoint(&base);
    }
    if let Some(model) = non_empty(lookup("MODEL_TYPE")) {
        config.model = model;
    }
    if let Some(flag) = non_empty(lookup("USE_AI_SUMMARY")) {
        config.enabled = parse_flag("USE_AI_SUMMARY", &flag)?;
    }
    if let Some(flag) = non_empty(lookup("ENABLE_THINKING")) {
        config.enable_thinking = Some(parse_flag("ENABLE_THINKING", &flag)?);
    }
    Ok(())
}

/// Accepts either a base URL or the full chat-completions URL.
pub fn chat_completions_endpoint(base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    if base.ends_with(CHAT_COMPLETIONS_PATH) {
        base.to_string()
    } else {
        format!("{}{}", base, CHAT_COMPLETIONS_PATH)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(DigestError::Config(format!("{} must be true or false, got '{}'", name, other))),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

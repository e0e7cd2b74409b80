use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Result};

/// Full application configuration. Process environment wins over `.env`.
#[derive(Debug, Clone)]
pub struct Config {
    // Completion provider
    pub azure_endpoint: String,
    pub azure_api_key: String,
    pub azure_api_version: String,
    pub base_model: String,
    pub reasoning_model: String,

    // Ticketing gateway
    pub apim_base_url: String,
    pub apim_subscription_key: String,
    /// Pre-encoded Basic credential for the dispatch integration user.
    pub dispatch_user: String,

    // Decision log
    pub database_url: Option<String>,
    pub decision_log_table: String,

    // Side channels
    pub proposed_note_endpoint: Option<String>,
    pub teams_alert_webhook: Option<String>,
    pub alert_team_id: Option<String>,
    pub alert_channel_id: Option<String>,

    /// Directory overriding the embedded lookup tables.
    pub data_dir: Option<PathBuf>,

    // Web
    pub web_bind: String,
    pub web_port: u16,
    /// "text" (default) or "json".
    pub log_format: String,

    // Retry tuning
    pub transport_retry_delay_ms: u64,
    pub semantic_retry_delay_ms: u64,
}

fn parse_dotenv_str(contents: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(v);
            map.insert(k.trim().to_string(), v.to_string());
        }
    }
    map
}

fn parse_dotenv(path: &Path) -> HashMap<String, String> {
    std::fs::read_to_string(path)
        .map(|c| parse_dotenv_str(&c))
        .unwrap_or_default()
}

struct Sources<'a> {
    env: &'a dyn Fn(&str) -> Option<String>,
    dotenv: &'a HashMap<String, String>,
}

impl Sources<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.env)(key)
            .or_else(|| self.dotenv.get(key).cloned())
            .filter(|v| !v.is_empty())
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn get_u64(&self, key: &str, default: u64) -> u64 {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }

    fn get_u16(&self, key: &str, default: u16) -> u16 {
        self.get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let dotenv = parse_dotenv(Path::new(".env"));
        let env = |k: &str| std::env::var(k).ok();
        Self::from_sources(&env, &dotenv)
    }

    fn from_sources(
        env: &dyn Fn(&str) -> Option<String>,
        dotenv: &HashMap<String, String>,
    ) -> Result<Self> {
        let src = Sources { env, dotenv };

        let required = [
            "AZURE_OPENAI_ENDPOINT",
            "AZURE_OPENAI_API_KEY",
            "AZURE_BASE_MODEL",
            "AZURE_REASONING_MODEL",
            "APIM_BASE_URL",
            "APIM_SUBSCRIPTION_KEY",
            "DISPATCH_USER",
        ];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|k| src.get(k).is_none())
            .collect();
        if !missing.is_empty() {
            bail!("missing required configuration: {}", missing.join(", "));
        }

        Ok(Self {
            azure_endpoint: src.get_str("AZURE_OPENAI_ENDPOINT", ""),
            azure_api_key: src.get_str("AZURE_OPENAI_API_KEY", ""),
            azure_api_version: src.get_str("AZURE_OPENAI_API_VERSION", "2024-10-21"),
            base_model: src.get_str("AZURE_BASE_MODEL", ""),
            reasoning_model: src.get_str("AZURE_REASONING_MODEL", ""),
            apim_base_url: src.get_str("APIM_BASE_URL", ""),
            apim_subscription_key: src.get_str("APIM_SUBSCRIPTION_KEY", ""),
            dispatch_user: src.get_str("DISPATCH_USER", ""),
            database_url: src.get("DATABASE_URL"),
            decision_log_table: src.get_str("DECISION_LOG_TABLE_NAME", "decision_logs"),
            proposed_note_endpoint: src.get("PROPOSED_NOTE_ENDPOINT"),
            teams_alert_webhook: src.get("TEAMS_ALERT_WEBHOOK"),
            alert_team_id: src.get("ALERT_TEAMS_ID"),
            alert_channel_id: src.get("ALERT_CHANNEL_ID"),
            data_dir: src.get("DISPATCH_DATA_DIR").map(PathBuf::from),
            web_bind: src.get_str("WEB_BIND", "0.0.0.0"),
            web_port: src.get_u16("WEB_PORT", 3140),
            log_format: src.get_str("LOG_FORMAT", "text"),
            transport_retry_delay_ms: src.get_u64("TRANSPORT_RETRY_DELAY_MS", 5000),
            semantic_retry_delay_ms: src.get_u64("SEMANTIC_RETRY_DELAY_MS", 15000),
        })
    }

    pub fn transport_retry_delay(&self) -> Duration {
        Duration::from_millis(self.transport_retry_delay_ms)
    }

    pub fn semantic_retry_delay(&self) -> Duration {
        Duration::from_millis(self.semantic_retry_delay_ms)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.web_bind, self.web_port)
    }
}

//! Configuration types for SMS Search

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{BusinessError, InvalidVerticalError};

/// Placeholder replaced by the incoming query in response templates
pub const QUERY_PLACEHOLDER: &str = "{query}";

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_online_template() -> String {
    format!("No direct answer found. Online results for '{}'", QUERY_PLACEHOLDER)
}

/// A vertical: a narrow category of queries answered by a canned template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalConfig {
    /// Single word that selects this vertical (matched case-insensitively)
    pub keyword: String,

    /// Display name
    pub name: String,

    /// Response template, may contain `{query}`
    pub response: String,
}

/// Fallback online query settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineQueryConfig {
    /// Response template, may contain `{query}`
    #[serde(default = "default_online_template")]
    pub template: String,
}

impl Default for OnlineQueryConfig {
    fn default() -> Self {
        Self {
            template: default_online_template(),
        }
    }
}

/// Top-level configuration file (sms-search.yaml / sms-search.json)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsSearchConfig {
    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Verticals seeded into the store at startup
    #[serde(default)]
    pub verticals: Vec<VerticalConfig>,

    /// Fallback handler settings
    #[serde(default)]
    pub online: OnlineQueryConfig,
}

impl Default for SmsSearchConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            verticals: Vec::new(),
            online: OnlineQueryConfig::default(),
        }
    }
}

impl SmsSearchConfig {
    /// Load configuration from a YAML (`.yaml`/`.yml`) or JSON file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let config: Self = if is_yaml {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject keywords that could never be matched or that collide
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();

        for vertical in &self.verticals {
            let keyword = vertical.keyword.trim();
            if keyword.is_empty() {
                return Err(invalid(&vertical.keyword, "keyword must not be empty"));
            }
            if keyword.split_whitespace().count() > 1 {
                return Err(invalid(&vertical.keyword, "keyword must be a single word"));
            }
            if !seen.insert(keyword.to_lowercase()) {
                return Err(invalid(&vertical.keyword, "keyword is declared twice"));
            }
        }

        if self.log_filter.trim().is_empty() {
            return Err(BusinessError::Config("logFilter must not be empty".to_string()));
        }

        Ok(())
    }

    /// Keywords of all configured verticals
    pub fn keywords(&self) -> Vec<&str> {
        self.verticals.iter().map(|v| v.keyword.as_str()).collect()
    }
}

fn invalid(keyword: &str, reason: &str) -> BusinessError {
    InvalidVerticalError {
        keyword: keyword.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Substitute the query into a response template
pub fn render_template(template: &str, query: &str) -> String {
    template.replace(QUERY_PLACEHOLDER, query)
}

//! TemplateOnlineQueryManager - Fallback answer rendered from configuration

use tracing::debug;

use shared::{render_template, OnlineQueryConfig, Result};
use sms_business::OnlineQueryManager;

#[derive(Debug, Clone)]
pub struct TemplateOnlineQueryManager {
    template: String,
}

impl TemplateOnlineQueryManager {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_config(config: &OnlineQueryConfig) -> Self {
        Self::new(config.template.clone())
    }
}

impl OnlineQueryManager for TemplateOnlineQueryManager {
    fn execute_query(&self, query: &str) -> Result<String> {
        debug!(query, "answering from online fallback");
        Ok(render_template(&self.template, query.trim()))
    }
}

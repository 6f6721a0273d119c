//! Dependency wiring
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  App::from_config                                               │
//! │    ├── Creates: InMemoryStore (adapter)                         │
//! │    ├── Registers: VerticalDao named queries                     │
//! │    ├── Seeds: configured verticals                              │
//! │    └── Builds: QueryHandlerService(StoredVerticalManager,       │
//! │                                    TemplateOnlineQueryManager)  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use std::path::Path;
use tracing::info;

use shared::SmsSearchConfig;
use sms_adapter::gateway::{StoredVerticalManager, TemplateOnlineQueryManager};
use sms_adapter::repository::{InMemoryStore, VerticalDao, VerticalRecord};
use sms_business::QueryHandlerService;
use sms_dao::Session;

pub type SmsQueryHandler = QueryHandlerService<StoredVerticalManager, TemplateOnlineQueryManager>;

pub struct App {
    config: SmsSearchConfig,
    store: InMemoryStore,
    handler: SmsQueryHandler,
}

impl App {
    /// Load configuration (defaults when no path is given) and wire the app
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::from_config(Self::load_config(path)?)
    }

    pub fn load_config(path: Option<&Path>) -> anyhow::Result<SmsSearchConfig> {
        match path {
            Some(path) => SmsSearchConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display())),
            None => Ok(SmsSearchConfig::default()),
        }
    }

    pub fn from_config(config: SmsSearchConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let store = InMemoryStore::new();
        for (name, query) in VerticalDao::named_queries() {
            store.register_named_query(name, query)?;
        }

        let mut session = store.open_session()?;
        let seeded = VerticalDao::new().seed(&mut session, &config.verticals)?;
        session.commit()?;
        info!(verticals = seeded, "store seeded");

        let handler = QueryHandlerService::new(
            StoredVerticalManager::new(store.clone()),
            TemplateOnlineQueryManager::from_config(&config.online),
        );

        Ok(Self {
            config,
            store,
            handler,
        })
    }

    pub fn config(&self) -> &SmsSearchConfig {
        &self.config
    }

    pub fn handler(&self) -> &SmsQueryHandler {
        &self.handler
    }

    /// Stored verticals ordered by keyword
    pub fn verticals(&self) -> anyhow::Result<Vec<VerticalRecord>> {
        let session = self.store.open_session()?;
        let verticals = VerticalDao::new().list_ordered(&session);
        session.rollback();
        Ok(verticals?)
    }
}

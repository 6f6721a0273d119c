//! Query manager adapters

pub mod online;
pub mod vertical;

pub use online::TemplateOnlineQueryManager;
pub use vertical::StoredVerticalManager;

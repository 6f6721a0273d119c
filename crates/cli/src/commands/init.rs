//! sms-search init command

use anyhow::bail;
use clap::Args;
use std::path::{Path, PathBuf};

use shared::{OnlineQueryConfig, SmsSearchConfig, VerticalConfig};

/// Name of the config file written by `init`
pub const CONFIG_FILE: &str = "sms-search.yaml";

#[derive(Debug, Args)]
pub struct InitCommand {
    /// Directory to initialize
    #[arg(default_value = ".")]
    pub directory: PathBuf,

    /// Write a config without example verticals
    #[arg(long)]
    pub minimal: bool,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let path = self.write_config()?;
        println!("✓ Wrote {}", path.display());
        Ok(())
    }

    /// Write the starter config and return its path
    pub fn write_config(&self) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(&self.directory)?;

        let path = self.directory.join(CONFIG_FILE);
        if path.exists() && !self.force {
            bail!("{} already exists (use --force to overwrite)", path.display());
        }

        let config = if self.minimal {
            SmsSearchConfig::default()
        } else {
            example_config()
        };
        write_yaml(&path, &config)?;
        Ok(path)
    }
}

fn example_config() -> SmsSearchConfig {
    SmsSearchConfig {
        verticals: vec![
            VerticalConfig {
                keyword: "weather".to_string(),
                name: "Weather".to_string(),
                response: "Weather service: forecast for '{query}' coming up".to_string(),
            },
            VerticalConfig {
                keyword: "stocks".to_string(),
                name: "Stock Prices".to_string(),
                response: "Stock service: latest quote for '{query}'".to_string(),
            },
        ],
        online: OnlineQueryConfig::default(),
        ..Default::default()
    }
}

fn write_yaml(path: &Path, config: &SmsSearchConfig) -> anyhow::Result<()> {
    std::fs::write(path, serde_yaml::to_string(config)?)?;
    Ok(())
}

//! sms-search verticals command

use clap::Args;
use std::fmt::Write;

use crate::app::App;

#[derive(Debug, Args)]
pub struct VerticalsCommand {
    /// Show response templates too
    #[arg(short, long)]
    pub verbose: bool,
}

impl VerticalsCommand {
    pub fn run(&self, app: &App, as_json: bool) -> anyhow::Result<()> {
        println!("{}", self.render(app, as_json)?);
        Ok(())
    }

    /// List stored verticals formatted for output
    pub fn render(&self, app: &App, as_json: bool) -> anyhow::Result<String> {
        let verticals = app.verticals()?;

        if as_json {
            return Ok(serde_json::to_string_pretty(&verticals)?);
        }
        if verticals.is_empty() {
            return Ok("No verticals configured".to_string());
        }

        let mut out = String::from("Verticals:");
        for vertical in &verticals {
            write!(out, "\n  {:<12} {}", vertical.keyword, vertical.name)?;
            if self.verbose {
                write!(out, " -> {}", vertical.response)?;
            }
        }
        Ok(out)
    }
}

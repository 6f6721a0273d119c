//! sms-search query command

use clap::Args;
use serde_json::json;

use crate::app::App;

#[derive(Debug, Args)]
pub struct QueryCommand {
    /// Phone number the query came from
    #[arg(short, long)]
    pub phone: String,

    /// Query text
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,
}

impl QueryCommand {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }

    pub fn run(&self, app: &App, as_json: bool) -> anyhow::Result<()> {
        println!("{}", self.render(app, as_json)?);
        Ok(())
    }

    /// Answer the query and format it for output
    pub fn render(&self, app: &App, as_json: bool) -> anyhow::Result<String> {
        let query = self.query_text();
        let outcome = app.handler().execute_routed(&self.phone, &query)?;

        if !as_json {
            return Ok(outcome.result);
        }
        let body = json!({
            "phone": self.phone,
            "query": query,
            "route": outcome.route.to_string(),
            "result": outcome.result,
        });
        Ok(serde_json::to_string_pretty(&body)?)
    }
}

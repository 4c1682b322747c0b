//! Advanced Rating — Stash plugin entrypoint.
//! Reads one plugin request from stdin, runs it, prints the reply on stdout.
//!
//! Logs go to stderr in the Stash log format; see `logging.rs`.

use advanced_rating::logging;
use advanced_rating::plugin::{self, PluginInput, PluginOutput};
use advanced_rating::store::StashClient;
use anyhow::{Context, Result};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::{error, info};

async fn run() -> Result<Value> {
    let mut raw = String::new();
    tokio::io::stdin()
        .read_to_string(&mut raw)
        .await
        .context("reading plugin input")?;
    let input = PluginInput::parse(&raw)?;
    let request = input.request()?;

    let conn = input
        .server_connection
        .as_ref()
        .context("plugin input has no server_connection")?;
    let client = StashClient::new(conn)?;
    info!(endpoint = client.endpoint(), "connected to stash");

    let cfg = plugin::load_config(&client).await?;
    plugin::dispatch(&client, &cfg, &request).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Local runs may keep ADVANCED_RATING_CONFIG / ADVANCED_RATING_LOG in .env.
    let _ = dotenvy::dotenv();
    logging::init("info");

    let reply = match run().await {
        Ok(out) => PluginOutput::ok(out),
        Err(e) => {
            error!(error = ?e, "plugin run failed");
            PluginOutput::err(format!("{e:#}"))
        }
    };

    match serde_json::to_string(&reply) {
        Ok(s) => println!("{s}"),
        Err(e) => error!(error = %e, "could not encode plugin reply"),
    }
}

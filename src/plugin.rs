// src/plugin.rs
//! Stash plugin surface: the JSON request Stash writes to stdin, the reply
//! it reads from stdout, and dispatch of tasks and hooks onto the core.

use crate::config::{self, RatingConfig, PLUGIN_ID};
use crate::rating::{self, RecordOutcome};
use crate::store::{RatingStore, RecordFilter, ServerConnection, StashClient};
use crate::taxonomy::{RemoveOutcome, TaxonomyManager};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub const HOOK_SCENE_UPDATE_POST: &str = "Scene.Update.Post";

/// Task selected from the Stash UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ProcessAll,
    ProcessUnrated,
    CreateTaxonomy,
    RemoveTaxonomy,
}

impl Mode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "process_scenes" => Some(Mode::ProcessAll),
            "process_scenes_unrated" => Some(Mode::ProcessUnrated),
            "create_tags" => Some(Mode::CreateTaxonomy),
            "remove_tags" => Some(Mode::RemoveTaxonomy),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HookContext {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    #[serde(rename = "type")]
    pub hook_type: String,
}

fn id_as_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginArgs {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, rename = "hookContext")]
    pub hook_context: Option<HookContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginInput {
    #[serde(default)]
    pub server_connection: Option<ServerConnection>,
    #[serde(default)]
    pub args: PluginArgs,
}

/// What the invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Task(Mode),
    Hook(HookContext),
}

impl PluginInput {
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            bail!("no input received on stdin");
        }
        serde_json::from_str(raw).context("plugin input is not valid JSON")
    }

    /// A task wins over a hook when both are present.
    pub fn request(&self) -> Result<Request> {
        if let Some(m) = self.args.mode.as_deref() {
            return Mode::parse(m)
                .map(Request::Task)
                .ok_or_else(|| anyhow!("unknown mode: {m}"));
        }
        if let Some(h) = &self.args.hook_context {
            return Ok(Request::Hook(h.clone()));
        }
        Err(anyhow!("input carries neither a mode nor a hook context"))
    }
}

/// Reply printed to stdout.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PluginOutput {
    pub output: Option<Value>,
    pub error: Option<String>,
}

impl PluginOutput {
    pub fn ok(output: Value) -> Self {
        Self {
            output: Some(output),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            output: None,
            error: Some(msg.into()),
        }
    }
}

/// File/default config overlaid with the settings saved in Stash. An
/// unreachable settings query keeps the local config.
pub async fn load_config(client: &StashClient) -> Result<RatingConfig> {
    let mut cfg = config::load_config_default()?;
    match client.plugin_settings(PLUGIN_ID).await {
        Ok(Some(settings)) => {
            debug!(?settings, "plugin settings");
            cfg.apply_settings(&settings);
        }
        Ok(None) => debug!("no plugin settings saved; using local config"),
        Err(e) => warn!(error = %e, "could not load plugin settings; using local config"),
    }
    for w in cfg.warnings() {
        warn!("{w}");
    }
    info!(
        categories = ?cfg.categories,
        minimum_required_tags = cfg.minimum_required_tags,
        scale = ?cfg.rating_scale,
        "configuration loaded"
    );
    Ok(cfg)
}

/// Run one request against `store`. Returns the summary for the reply.
pub async fn dispatch(store: &dyn RatingStore, cfg: &RatingConfig, req: &Request) -> Result<Value> {
    match req {
        Request::Task(Mode::ProcessAll) => {
            let report = rating::process_filter(store, &RecordFilter::All, cfg).await?;
            Ok(serde_json::to_value(report)?)
        }
        Request::Task(Mode::ProcessUnrated) => {
            let report = rating::process_filter(store, &RecordFilter::Unrated, cfg).await?;
            Ok(serde_json::to_value(report)?)
        }
        Request::Task(Mode::CreateTaxonomy) => {
            let report = TaxonomyManager::new(store)
                .ensure(&cfg.categories, cfg.levels_per_category)
                .await?;
            Ok(serde_json::to_value(report)?)
        }
        Request::Task(Mode::RemoveTaxonomy) => {
            let outcome: RemoveOutcome = TaxonomyManager::new(store)
                .remove(
                    &cfg.categories,
                    cfg.levels_per_category,
                    cfg.allow_destructive_actions,
                )
                .await?;
            Ok(serde_json::to_value(outcome)?)
        }
        Request::Hook(hook) => handle_hook(store, cfg, hook).await,
    }
}

async fn handle_hook(store: &dyn RatingStore, cfg: &RatingConfig, hook: &HookContext) -> Result<Value> {
    if hook.hook_type != HOOK_SCENE_UPDATE_POST {
        debug!(hook = %hook.hook_type, "ignoring hook");
        return Ok(json!({ "scene": hook.id, "status": "ignored" }));
    }

    let records = store
        .find_records(&RecordFilter::ById(hook.id.clone()))
        .await?;
    let Some(record) = records.first() else {
        warn!(scene = %hook.id, "hooked scene not found");
        return Ok(json!({ "scene": hook.id, "status": "not_found" }));
    };

    let out = match rating::process_one(store, record, cfg).await {
        RecordOutcome::Updated { from, to } => {
            json!({ "scene": record.id, "status": "updated", "from": from, "to": to })
        }
        RecordOutcome::Unchanged => json!({ "scene": record.id, "status": "unchanged" }),
        RecordOutcome::Skipped { scored, required } => json!({
            "scene": record.id, "status": "skipped", "scored": scored, "required": required
        }),
        RecordOutcome::Failed(e) => {
            json!({ "scene": record.id, "status": "failed", "error": e.to_string() })
        }
    };
    Ok(out)
}

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use vts_core::{
    connect, ClientConfig, CredentialStore, ModelCatalog, PluginIdentity, Session, Triggers,
};
use vts_observability::{init_process_logging, ProcessKind};

#[derive(Parser, Debug)]
#[command(name = "vts-bridge")]
#[command(about = "Load VTube Studio models and trigger their hotkeys")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Print results as JSON.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// Also write JSONL logs to this directory.
    #[arg(long, global = true, env = "VTS_LOGS_DIR")]
    logs_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Host running VTube Studio. Defaults to this machine's name
    /// (with `.local` appended under WSL).
    #[arg(long, global = true, env = "VTS_HOST")]
    host: Option<String>,
    #[arg(long, global = true, env = "VTS_PORT", default_value_t = vts_core::config::DEFAULT_PORT)]
    port: u16,
    #[arg(long, global = true, env = "VTS_TOKEN_FILE")]
    token_file: Option<PathBuf>,
    #[arg(long, global = true, env = "VTS_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    connect_timeout_secs: u64,
    #[arg(long, global = true, env = "VTS_PLUGIN_NAME", default_value = vts_core::config::DEFAULT_PLUGIN_NAME)]
    plugin_name: String,
    #[arg(long, global = true, env = "VTS_PLUGIN_DEVELOPER", default_value = vts_core::config::DEFAULT_PLUGIN_DEVELOPER)]
    plugin_developer: String,
}

impl ConnectionArgs {
    fn to_config(&self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            host: self.host.clone().filter(|h| !h.trim().is_empty()),
            port: self.port,
            token_path: self.token_file.clone().unwrap_or(defaults.token_path),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            identity: PluginIdentity {
                plugin_name: self.plugin_name.clone(),
                plugin_developer: self.plugin_developer.clone(),
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate and exit.
    Connect,
    /// List available models.
    Models,
    /// Show the loaded model.
    Current,
    /// Load a model by name or ID.
    Load { model: String },
    /// List animation and expression hotkeys.
    Hotkeys {
        #[arg(long)]
        model_id: Option<String>,
    },
    /// Trigger an expression and/or an animation hotkey.
    Trigger {
        #[arg(long)]
        animation: Option<String>,
        #[arg(long)]
        expression: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (_log_guard, log_info) =
        init_process_logging(ProcessKind::Cli, cli.logs_dir.as_deref(), 14)?;
    tracing::debug!("logging initialized: {:?}", log_info);

    validate(&cli.command)?;
    let config = cli.connection.to_config();
    let store = CredentialStore::new(&config.token_path);
    let mut session = connect(&config, &store)
        .await
        .with_context(|| format!("could not connect to {}", config.websocket_url()))?;

    let outcome = run(&mut session, cli.command, cli.json).await;
    session.disconnect().await;
    outcome
}

/// Reject argument combinations that would need no request, before any
/// handshake can prompt the user in the host application.
fn validate(command: &Command) -> anyhow::Result<()> {
    if let Command::Trigger {
        animation: None,
        expression: None,
    } = command
    {
        anyhow::bail!("nothing to trigger: pass --animation and/or --expression");
    }
    Ok(())
}

async fn run(session: &mut Session, command: Command, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Connect => {
            info!("session ready");
            emit(json, &serde_json::json!({ "state": session.state() }), || {
                "connected".to_string()
            })
        }
        Command::Models => {
            let models = session.list_models().await.context("listing models")?;
            emit(json, &models, || render_models(&models))
        }
        Command::Current => {
            let current = session
                .current_model()
                .await
                .context("querying current model")?;
            emit(json, &serde_json::json!({ "modelID": current }), || {
                current
                    .clone()
                    .unwrap_or_else(|| "no model loaded".to_string())
            })
        }
        Command::Load { model } => {
            let models = session.list_models().await.context("listing models")?;
            let model_id = resolve_model_id(&models, &model);
            session
                .load_model(&model_id)
                .await
                .with_context(|| format!("loading model {model}"))?;
            emit(json, &serde_json::json!({ "loaded": model_id }), || {
                format!("loaded {model_id}")
            })
        }
        Command::Hotkeys { model_id } => {
            let triggers = session
                .list_triggers(model_id.as_deref())
                .await
                .context("listing hotkeys")?;
            emit(json, &triggers, || render_triggers(&triggers))
        }
        Command::Trigger {
            animation,
            expression,
        } => {
            let triggered = session
                .trigger_hotkeys(animation.as_deref(), expression.as_deref())
                .await
                .context("triggering hotkeys")?;
            emit(json, &serde_json::json!({ "triggered": triggered }), || {
                "triggered".to_string()
            })
        }
    }
}

/// A model name resolves through the catalog; anything else is taken as an ID.
fn resolve_model_id(models: &ModelCatalog, model: &str) -> String {
    if let Some(model_id) = models.get(model) {
        return model_id.to_string();
    }
    if !models.contains_id(model) {
        warn!("{model} is not a known model name or ID, sending it as an ID");
    }
    model.to_string()
}

fn render_models(models: &ModelCatalog) -> String {
    if models.is_empty() {
        return "no models available".to_string();
    }
    models
        .iter()
        .map(|(name, id)| format!("{name}\t{id}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_triggers(triggers: &Triggers) -> String {
    let mut out = String::from("animations:");
    for name in &triggers.animations {
        out.push_str(&format!("\n  {name}"));
    }
    out.push_str("\nexpressions:");
    for name in &triggers.expressions {
        out.push_str(&format!("\n  {name}"));
    }
    out
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

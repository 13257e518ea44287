use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Cli,
}

impl ProcessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessKind::Cli => "cli",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingInitInfo {
    pub process: String,
    pub logs_dir: Option<String>,
    pub prefix: String,
    pub retention_days: u64,
    pub initialized_at: DateTime<Utc>,
}

/// One structured record about a protocol exchange.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProtocolEvent<'a> {
    pub event: &'a str,
    pub component: &'a str,
    pub operation: Option<&'a str>,
    pub request_id: Option<&'a str>,
    pub message_type: Option<&'a str>,
    pub status: Option<&'a str>,
    pub error_id: Option<i64>,
    pub detail: Option<&'a str>,
}

pub fn redact_text(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!(
        "[redacted len={} hash={}]",
        trimmed.len(),
        short_hash(trimmed)
    )
}

pub fn short_hash(input: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    input.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Record a failed exchange on the `vts.obs` target at warn level.
pub fn emit_event(event: ProtocolEvent<'_>) {
    let error_id = event.error_id.map(|id| id.to_string());
    tracing::warn!(
        target: "vts.obs",
        component = event.component,
        event = event.event,
        operation = event.operation.unwrap_or(""),
        request_id = event.request_id.unwrap_or(""),
        message_type = event.message_type.unwrap_or(""),
        status = event.status.unwrap_or(""),
        error_id = error_id.as_deref().unwrap_or(""),
        detail = event.detail.unwrap_or(""),
        "protocol_event"
    );
}

/// Install the global subscriber: console on stderr, plus a daily-rolling
/// JSONL file when `logs_dir` is given. The guard must outlive the process's
/// logging; dropping it flushes and stops the file writer.
pub fn init_process_logging(
    process: ProcessKind,
    logs_dir: Option<&Path>,
    retention_days: u64,
) -> anyhow::Result<(Option<WorkerGuard>, LoggingInitInfo)> {
    let prefix = format!("vts.{}", process.as_str());

    let console_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match logs_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            cleanup_old_jsonl(dir, process.as_str(), retention_days)?;

            let file_appender = tracing_appender::rolling::Builder::new()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix(&prefix)
                .filename_suffix("jsonl")
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_current_span(false)
                .with_span_list(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();

    let info = LoggingInitInfo {
        process: process.as_str().to_string(),
        logs_dir: logs_dir.map(|dir| dir.display().to_string()),
        prefix,
        retention_days,
        initialized_at: Utc::now(),
    };

    Ok((guard, info))
}

fn cleanup_old_jsonl(logs_dir: &Path, process: &str, retention_days: u64) -> anyhow::Result<()> {
    let cutoff = Utc::now() - chrono::Duration::days(retention_days as i64);
    let prefix = format!("vts.{}.", process);

    for entry in fs::read_dir(logs_dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if !name.starts_with(&prefix) || !name.ends_with(".jsonl") {
            continue;
        }

        // expected: vts.<proc>.YYYY-MM-DD.jsonl
        let date_part = name.trim_start_matches(&prefix).trim_end_matches(".jsonl");

        let Ok(date) = chrono::NaiveDate::parse_from_str(date_part, "%Y-%m-%d") else {
            continue;
        };

        let Some(dt) = date.and_hms_opt(0, 0, 0) else {
            continue;
        };

        if DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc) < cutoff {
            let _ = fs::remove_file(path);
        }
    }

    Ok(())
}

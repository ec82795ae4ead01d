use anyhow::Context;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use vaulty_core::models::ItemReport;
use vaulty_core::{ProgressReporter, TracingProgressReporter};
use vaulty_db::ledger_file_name;

/// Initialize tracing for the CLI. Logs go to stderr so stdout carries only JSON output.
pub fn init_tracing(format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vaulty=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Pretty-prints a command's final result on stdout. Item runs emit their JSON lines
/// before it.
pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Prints every item outcome as one JSON line on stdout and logs it as well.
pub struct JsonLinesReporter;

impl ProgressReporter for JsonLinesReporter {
    fn item_finished(&self, action: &str, container: &str, report: &ItemReport) {
        let line = serde_json::json!({
            "action": action,
            "container": container,
            "item": report,
        });
        println!("{}", line);
        TracingProgressReporter.item_finished(action, container, report);
    }
}

/// Ledger for a run: the explicit path when resuming, a fresh timestamped file under
/// `base_path` otherwise.
pub fn run_ledger_path(
    base_path: &Path,
    kind: &str,
    container: &str,
    explicit: Option<PathBuf>,
) -> PathBuf {
    explicit.unwrap_or_else(|| base_path.join(ledger_file_name(kind, container, Local::now())))
}

/// Combine a run's result with the outcome of closing its ledger. The run's own error
/// wins; a close error fails an otherwise successful run.
pub fn finish_run<T, E>(result: Result<T, E>, closed: anyhow::Result<()>) -> anyhow::Result<T>
where
    E: Into<anyhow::Error>,
{
    let value = result.map_err(Into::into)?;
    closed?;
    Ok(value)
}

/// Job output as JSON when it parses, as text otherwise.
pub fn job_output_value(output: &[u8]) -> serde_json::Value {
    serde_json::from_slice(output)
        .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(output).into_owned()))
}

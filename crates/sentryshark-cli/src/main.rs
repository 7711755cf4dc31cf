//! SentryShark command-line interface.
//!
//! This binary runs offline anomaly analysis over PCAP/PCAPNG captures and
//! emits a deterministic JSON `AnalysisResult` to a file path or stdout. It
//! is a thin wrapper over the `sentryshark-core` analysis pipeline.
//!
//! Typical usage:
//! - `sentryshark analyze capture.pcapng -o report.json`
//! - `sentryshark analyze capture.pcap --stdout --pretty`
//! - `sentryshark info capture.pcapng`
//!
//! Errors are reported to stderr; a non-zero exit code indicates failure to
//! read the input capture, an invalid configuration, or (with `--strict`)
//! the presence of a high-severity detection.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glob::glob;
use sentryshark_core::{AnalysisResult, Analyzer, AnalyzerConfig, PacketSource};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

#[derive(Parser, Debug)]
#[command(name = "sentryshark")]
#[command(
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (commit ",
        env!("SENTRYSHARK_BUILD_COMMIT"),
        ", built ",
        env!("SENTRYSHARK_BUILD_DATE"),
        ")"
    )
)]
#[command(
    about = "Offline anomaly-detection engine for PCAP/PCAPNG captures.",
    long_about = None,
    after_help = "Examples:\n  sentryshark analyze capture.pcapng -o report.json\n  sentryshark analyze capture.pcap --stdout --pretty\n  sentryshark info capture.pcapng"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full detection pipeline over a capture and emit a JSON report.
    Analyze {
        /// Path to a .pcap or .pcapng file (glob patterns are expanded and
        /// must resolve to exactly one file).
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write the JSON report to stdout instead of a file
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Path to a TOML file configuring detector engines
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if any detection's severity meets
        /// `--strict-threshold` (default 0.8)
        #[arg(long)]
        strict: bool,

        /// Severity threshold used by `--strict`
        #[arg(long, default_value_t = 0.8)]
        strict_threshold: f64,
    },
    /// Show capture metadata only (no detection pipeline).
    Info {
        /// Path to a .pcap or .pcapng file
        input: PathBuf,

        /// Output JSON metadata instead of plain text
        #[arg(long)]
        json: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            report,
            stdout,
            config,
            pretty,
            compact,
            quiet,
            strict,
            strict_threshold,
        } => cmd_analyze(
            input,
            report,
            stdout,
            config,
            pretty,
            compact,
            quiet,
            strict,
            strict_threshold,
        ),
        Commands::Info {
            input,
            json,
            pretty,
            compact,
        } => cmd_info(input, json, pretty, compact),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(err.to_string(), None)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_analyze(
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    config: Option<PathBuf>,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
    strict_threshold: f64,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;

    let report = if stdout {
        None
    } else {
        Some(report.ok_or_else(|| {
            CliError::new(
                "missing report output",
                Some("pass -o <FILE> or use --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        reject_report_equals_input(report_path, &input_abs)?;
    }

    let analyzer_config = load_config(config.as_deref())?;

    let mut analyzer = Analyzer::new(analyzer_config)
        .map_err(|err| CliError::new(format!("invalid configuration: {err}"), None))?;
    let result = analyzer
        .analyze_source(&resolved_input.display().to_string(), open_source(&resolved_input)?)
        .map_err(|err| CliError::new(format!("analysis failed: {err}"), None))?;

    let json = serialize_json(&result, pretty, compact)?;

    if stdout {
        print!("{}", json);
    } else {
        let report_path = report.expect("checked above");
        if let Some(parent) = report_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
        }
        write_report_atomic(&report_path, &json)?;
        if !quiet {
            eprintln!("OK: report written -> {}", report_path.display());
        }
    }

    if strict && exceeds_strict_threshold(&result, strict_threshold) {
        return Err(CliError::new(
            "a detection met the strict severity threshold",
            Some(format!(
                "inspect the report's detections (threshold {strict_threshold})"
            )),
        ));
    }

    Ok(())
}

fn open_source(input: &Path) -> Result<sentryshark_core::PcapFileSource, CliError> {
    sentryshark_core::PcapFileSource::open(input)
        .map_err(|err| CliError::new(format!("failed to open capture: {err}"), None))
}

fn reject_report_equals_input(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_abs = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose()
        .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
    if let Some(report_dir) = report_abs {
        let report_target = report_dir.join(
            report_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid report path"))?,
        );
        if report_target == input_abs {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

/// Loads and validates detector configuration from a TOML file, falling
/// back to `AnalyzerConfig::default()` when none is given. Parsing lives
/// here in the CLI; the core library only defines the config shape and
/// validates it once parsed.
fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig, CliError> {
    let Some(path) = path else {
        return Ok(AnalyzerConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&text).map_err(|err| {
        CliError::new(
            format!("invalid config file {}: {err}", path.display()),
            Some("check the [models.<engine_id>] tables against the documented keys".to_string()),
        )
    })
}

fn exceeds_strict_threshold(result: &AnalysisResult, threshold: f64) -> bool {
    result.detections.iter().any(|d| d.severity >= threshold)
}

fn serialize_json<T: Serialize>(
    value: &T,
    pretty: bool,
    compact: bool,
) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(value)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn write_report_atomic(path: &Path, json: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp_path = PathBuf::from(tmp);

    fs::write(&tmp_path, json)
        .with_context(|| format!("Failed to write report: {}", tmp_path.display()))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        if path.exists() {
            fs::remove_file(path)
                .with_context(|| format!("Failed to replace report: {}", path.display()))?;
            fs::rename(&tmp_path, path)
                .with_context(|| format!("Failed to replace report: {}", path.display()))?;
        } else {
            return Err(CliError::new(
                format!("Failed to move report into place: {err}"),
                Some("check write permissions".to_string()),
            ));
        }
    }

    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn cmd_info(input: PathBuf, json: bool, pretty: bool, compact: bool) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;

    let info = collect_pcap_info(&resolved_input, meta.len())?;
    let json_output = json || pretty || compact;
    if json_output {
        let json = serialize_json(&info, pretty, compact)?;
        print!("{}", json);
        return Ok(());
    }

    println!("file: {}", info.path);
    println!("format: {}", info.capture_type);
    println!("bytes: {}", info.size_bytes);
    println!("packets: {}", info.packets);
    println!(
        "time_start: {}",
        info.first_ts.as_deref().unwrap_or("unknown")
    );
    println!("time_end: {}", info.last_ts.as_deref().unwrap_or("unknown"));
    println!("duration_s: {}", info.duration_s.unwrap_or(0.0));
    println!(
        "linktype: {}",
        info.linktype.as_deref().unwrap_or("unknown")
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct PcapInfo {
    path: String,
    size_bytes: u64,
    capture_type: String,
    packets: u64,
    first_ts: Option<String>,
    last_ts: Option<String>,
    duration_s: Option<f64>,
    linktype: Option<String>,
}

fn collect_pcap_info(input: &Path, size_bytes: u64) -> Result<PcapInfo, CliError> {
    let capture_type = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("unknown")
        .to_ascii_lowercase();
    let mut source = open_source(input)?;
    let mut packets = 0u64;
    let mut first_ts = None;
    let mut last_ts = None;
    let mut linktype = None;
    while let Some(event) = source
        .next_packet()
        .map_err(|err| CliError::new(err.to_string(), None))?
    {
        packets += 1;
        if linktype.is_none() {
            linktype = Some(format!("{:?}", event.linktype));
        }
        update_ts_bounds(&mut first_ts, &mut last_ts, event.ts);
    }

    let duration_s = match (first_ts, last_ts) {
        (Some(start), Some(end)) if end >= start => Some(end - start),
        _ => None,
    };

    Ok(PcapInfo {
        path: input.display().to_string(),
        size_bytes,
        capture_type,
        packets,
        first_ts: ts_to_rfc3339(first_ts),
        last_ts: ts_to_rfc3339(last_ts),
        duration_s,
        linktype,
    })
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let ts = match ts {
        Some(ts) => ts,
        None => return,
    };
    match first {
        None => *first = Some(ts),
        Some(existing) => {
            if ts < *existing {
                *first = Some(ts);
            }
        }
    }
    match last {
        None => *last = Some(ts),
        Some(existing) => {
            if ts > *existing {
                *last = Some(ts);
            }
        }
    }
}

fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    if matches.len() > 1 {
        let hint = "pass a single capture file, or run once per file".to_string();
        let mut message = format!(
            "multiple files match pattern '{}' ({} matches)",
            pattern,
            matches.len()
        );
        let listed = matches.iter().take(3).collect::<Vec<_>>();
        if !listed.is_empty() {
            let mut details = String::new();
            details.push_str("; matches: ");
            details.push_str(
                &listed
                    .into_iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            );
            if matches.len() > 3 {
                details.push_str(", ...");
            }
            message.push_str(&details);
        }
        return Err(CliError::new(message, Some(hint)));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

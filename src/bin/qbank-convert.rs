//! CLI binary for qbank-convert.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, then either serves HTTP, converts one file, or checks
//! for a Python interpreter.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use qbank_convert::{convert_to_dir, serve, Category, Converter, ServiceConfig};
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve the upload API on port 3000
  qbank-convert --scripts-dir ./scripts

  # Convert one document without HTTP
  qbank-convert paper.docx --category Mock --question-type question -o out/

  # Subtypes containing a comma need quoting
  qbank-convert paper.docx --category Section --question-type "section, mcq"

  # Check that a Python interpreter is available
  qbank-convert --check-runtime

CONVERTERS:
  Category   Question type   Family directory
  ────────   ─────────────   ────────────────
  Mock       question        mock_questions
  Mock       solution        solutions_mock
  Section    section, mcq    mcq_section
  Section    passage         question_passage

  Each family directory holds the entry point (default wordToMD.py). It is
  run as `<python> <entry point> <staged document>` and must print
  ===ZIP=== followed by the absolute path of the archive it wrote.

ENVIRONMENT VARIABLES:
  QBANK_HOST, QBANK_PORT            Listen address (default 127.0.0.1:3000)
  QBANK_SCRIPTS_DIR                 Converter families root (default ./scripts)
  QBANK_PYTHON                      Interpreter tried before python3/python
  QBANK_CORS_ORIGINS                Comma-separated allowed origins
  RUST_LOG                          Overrides the log filter
"#;

/// Convert question-bank documents through external converter scripts.
#[derive(Parser, Debug)]
#[command(
    name = "qbank-convert",
    version,
    about = "Convert question-bank documents into archives via converter scripts",
    long_about = "Serve an HTTP upload endpoint (default) or convert a single document. \
Uploads are routed by category and question type to one of four converter scripts, \
run under a locally installed Python interpreter.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Convert this document once and exit instead of serving.
    input: Option<PathBuf>,

    /// Document category for one-shot mode: Mock or Section.
    #[arg(long, value_parser = parse_category)]
    category: Option<Category>,

    /// Question type for one-shot mode (question, solution, "section, mcq", passage).
    #[arg(long = "question-type")]
    question_type: Option<String>,

    /// Directory the archive is written to in one-shot mode.
    #[arg(short, long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "QBANK_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "QBANK_PORT", default_value_t = 3000)]
    port: u16,

    /// Directory containing one sub-directory per converter family.
    #[arg(long, env = "QBANK_SCRIPTS_DIR", default_value = "./scripts")]
    scripts_dir: PathBuf,

    /// Script file name inside each family directory.
    #[arg(long, env = "QBANK_ENTRY_POINT", default_value = "wordToMD.py")]
    entry_point: String,

    /// Where uploads are staged. Default: the OS temp dir.
    #[arg(long, env = "QBANK_STAGING_DIR")]
    staging_dir: Option<PathBuf>,

    /// Python interpreter probed before the built-in candidates.
    #[arg(long, env = "QBANK_PYTHON")]
    python: Option<String>,

    /// Seconds to wait for each `--version` probe.
    #[arg(long, env = "QBANK_PROBE_TIMEOUT", default_value_t = 3,
          value_parser = clap::value_parser!(u64).range(1..=60))]
    probe_timeout: u64,

    /// Maximum upload size in MiB.
    #[arg(long, env = "QBANK_MAX_UPLOAD_MB", default_value_t = 100,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_upload_mb: u64,

    /// Accepted upload extensions, comma-separated, without dots.
    #[arg(long, env = "QBANK_EXTENSIONS", value_delimiter = ',', default_value = "docx")]
    extensions: Vec<String>,

    /// Allowed CORS origins, comma-separated.
    #[arg(long, env = "QBANK_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Vec<String>,

    /// Locate a Python interpreter, print it, and exit.
    #[arg(long)]
    check_runtime: bool,

    /// Disable the spinner in one-shot mode.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "QBANK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "QBANK_QUIET")]
    quiet: bool,
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse::<Category>()
        .map_err(|_| format!("'{s}' is not a category (expected Mock or Section)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner is the feedback in one-shot mode; keep INFO logs out of it.
    let show_progress = cli.input.is_some() && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    if cli.check_runtime {
        return check_runtime(&Converter::new(config), cli.quiet).await;
    }

    match cli.input.clone() {
        Some(input) => convert_one(&cli, config, input, show_progress).await,
        None => serve(&cli.host, cli.port, config)
            .await
            .context("Server stopped"),
    }
}

/// Map CLI args to `ServiceConfig`.
fn build_config(cli: &Cli) -> Result<ServiceConfig> {
    let max_upload_bytes = usize::try_from(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .context("--max-upload-mb is too large for this platform")?;

    let mut builder = ServiceConfig::builder()
        .scripts_dir(&cli.scripts_dir)
        .entry_point(&cli.entry_point)
        .probe_timeout_secs(cli.probe_timeout)
        .max_upload_bytes(max_upload_bytes)
        .accepted_extensions(cli.extensions.iter().map(|e| e.trim().trim_start_matches('.')))
        .allowed_origins(cli.cors_origins.iter().map(|o| o.trim()));

    if let Some(ref dir) = cli.staging_dir {
        builder = builder.staging_dir(dir);
    }
    if let Some(ref python) = cli.python {
        builder = builder.runtime_override(python);
    }

    builder.build().context("Invalid configuration")
}

async fn check_runtime(converter: &Converter, quiet: bool) -> Result<()> {
    match converter.check_runtime().await {
        Ok(rt) => {
            if !quiet {
                println!(
                    "{} Python found: {} {}",
                    green("✓"),
                    bold(&rt.executable),
                    dim(&format!("({})", rt.version))
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", red("✗"), e);
            bail!("No usable Python interpreter")
        }
    }
}

async fn convert_one(cli: &Cli, config: ServiceConfig, input: PathBuf, show_progress: bool) -> Result<()> {
    let Some(category) = cli.category else {
        bail!("--category is required when converting a file");
    };
    let Some(ref question_type) = cli.question_type else {
        bail!("--question-type is required when converting a file");
    };

    let converter = Converter::new(config);

    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Converting");
        bar.set_message(input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = convert_to_dir(&converter, &input, category, question_type, &cli.output_dir).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let (path, stats) = result.with_context(|| format!("Failed to convert {}", input.display()))?;

    if !cli.quiet {
        eprintln!(
            "{} {}  {}",
            green("✓"),
            bold(&path.display().to_string()),
            dim(&format!(
                "{} bytes via {} in {}ms",
                stats.archive_bytes, stats.family, stats.total_duration_ms
            )),
        );
    }

    Ok(())
}

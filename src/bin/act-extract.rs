//! CLI binary for act-mcq-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use act_mcq_extract::{
    extract, ExtractionConfig, ExtractionOutput, ExtractionProgressCallback, ProgressCallback,
    DEFAULT_SOURCE_URL,
};
use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while the PDF is fetched and read, then a page bar while parsing.
struct CliProgressCallback {
    bar: ProgressBar,
    image_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Fetching PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            image_errors: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Parsing");
        self.bar.set_message("");
    }

    fn on_page_parsed(&self, page_num: usize, total_pages: usize, questions: usize) {
        if questions > 0 {
            self.bar.println(format!(
                "  {} Page {:>3}/{:<3}  {}",
                green("✓"),
                page_num,
                total_pages,
                dim(&format!("{questions} question(s)")),
            ));
        }
        self.bar.set_position(page_num as u64);
    }

    fn on_image_written(&self, page_num: usize, _path: &Path) {
        self.bar.set_prefix("Rendering");
        self.bar.set_message(format!("page_{page_num}.png"));
    }

    fn on_image_error(&self, page_num: usize, error: String) {
        self.image_errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error
        };
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            red("✗"),
            page_num,
            red(&msg)
        ));
    }

    fn on_extraction_complete(&self, questions: usize, answered: usize) {
        self.bar.finish_and_clear();
        let failed = self.image_errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {} questions extracted, {} with answers{}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&questions.to_string()),
            answered,
            if failed == 0 {
                String::new()
            } else {
                format!("  ({} page images failed)", red(&failed.to_string()))
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Download the public practice test and write ./output
  act-extract

  # Use a local copy
  act-extract --source AIST-Math-Practice-Test.pdf

  # Records only, no page images
  act-extract --no-images --output-dir results

  # Four-option variant with a differently worded key heading
  act-extract --max-label D --answer-key-heading "Scoring Key"

  # Full run report on stdout
  act-extract --json --no-progress > report.json

OUTPUT:
  <output-dir>/act_math_questions.json   question records (JSON array)
  <output-dir>/page_<n>.png              one image per page with questions

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium; otherwise ./ then the system path
  RUST_LOG          Overrides the log filter (e.g. act_mcq_extract=debug)
  ACT_EXTRACT_*     Every flag, e.g. ACT_EXTRACT_SOURCE, ACT_EXTRACT_DPI
"#;

/// Extract multiple-choice questions from the ACT math practice test PDF.
#[derive(Parser, Debug)]
#[command(
    name = "act-extract",
    version,
    about = "Extract ACT math multiple-choice questions from the practice test PDF",
    long_about = "Extract numbered multiple-choice questions, their options, answer-key letters \
and equations from the ACT mathematics practice test, writing JSON records plus one PNG \
per page that carries a question.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(long, env = "ACT_EXTRACT_SOURCE", default_value = DEFAULT_SOURCE_URL)]
    source: String,

    /// Directory for the JSON file and page images.
    #[arg(short, long, env = "ACT_EXTRACT_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// File name of the JSON records inside the output directory.
    #[arg(long, env = "ACT_EXTRACT_QUESTIONS_FILE", default_value = "act_math_questions.json")]
    questions_file: String,

    /// Rendering DPI for page images (72–400).
    #[arg(long, env = "ACT_EXTRACT_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Skip writing page images.
    #[arg(long, env = "ACT_EXTRACT_NO_IMAGES")]
    no_images: bool,

    /// Heading that opens the answer-key section.
    #[arg(long, env = "ACT_EXTRACT_ANSWER_KEY_HEADING", default_value = "Answer Key")]
    answer_key_heading: String,

    /// Last option label; options run from A to this letter.
    #[arg(long, env = "ACT_EXTRACT_MAX_LABEL", default_value_t = 'E')]
    max_label: char,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "ACT_EXTRACT_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "ACT_EXTRACT_DOWNLOAD_TIMEOUT", default_value_t = 30)]
    download_timeout: u64,

    /// Print the full run report (ExtractionOutput) as JSON on stdout.
    #[arg(long, env = "ACT_EXTRACT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "ACT_EXTRACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ACT_EXTRACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ACT_EXTRACT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO output; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&config).await.context("Extraction failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&output, show_progress);
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .source(cli.source.clone())
        .output_dir(cli.output_dir.clone())
        .questions_file(cli.questions_file.clone())
        .dpi(cli.dpi)
        .render_images(!cli.no_images)
        .answer_key_heading(cli.answer_key_heading.clone())
        .last_label(cli.max_label)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(output: &ExtractionOutput, progress_shown: bool) {
    let stats = &output.stats;
    if !progress_shown {
        eprintln!(
            "Extracted {} questions ({} answered) from {} pages in {}ms",
            stats.questions_emitted, stats.answers_matched, stats.total_pages, stats.total_duration_ms
        );
    }
    if stats.key_page.is_none() {
        eprintln!("  {} no answer key found", cyan("⚠"));
    }
    if stats.skipped > 0 {
        eprintln!("  {}", dim(&format!("{} candidates skipped", stats.skipped)));
    }
    eprintln!(
        "  →  {}  {}",
        bold(&output.questions_path.display().to_string()),
        dim(&format!("{} page images", stats.images_written)),
    );
}

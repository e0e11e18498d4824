//! CLI binary for certsort.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `OrganizerConfig` and prints results.

use anyhow::{Context, Result};
use certsort::library::format_megabytes;
use certsort::pipeline::render::ensure_engine;
use certsort::{
    scan_library, BatchOutcome, BatchProgressCallback, BatchReport, CertificateOrganizer,
    CompanyFolder, FileReport, FileStatus, LibrarySummary, OrganizerConfig, ProcessingStats,
    ProgressCallback, Stage,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

fn status_icon(status: FileStatus) -> String {
    match status {
        FileStatus::Success => green("✓"),
        FileStatus::Warning => yellow("⚠"),
        FileStatus::Error => red("✗"),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 1).collect();
        format!("{head}\u{2026}")
    } else {
        s.to_string()
    }
}

fn seconds(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

/// One result line: icon, index, file name, company or message, duration.
fn file_line(index: usize, total: usize, report: &FileReport) -> String {
    let detail = match report.status {
        FileStatus::Success => bold(&report.company),
        FileStatus::Warning => yellow(&truncate(&report.company, 60)),
        FileStatus::Error => red(&truncate(&report.message, 80)),
    };
    let took = report
        .timings
        .map(|t| dim(&seconds(t.total_ms)))
        .unwrap_or_default();
    format!(
        "  {} {:>3}/{:<3} {:<40} {}  {}",
        status_icon(report.status),
        index,
        total,
        truncate(&report.file_name, 40),
        detail,
        took
    )
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per certificate.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        bar.set_style(style);
        bar.set_prefix("Sorting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Sorting {total_files} certificates…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, file_name: &str) {
        self.bar.set_message(truncate(file_name, 40));
    }

    fn on_file_complete(&self, index: usize, total: usize, report: &FileReport) {
        self.bar.println(file_line(index, total, report));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total: usize, _successful: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Sort a few certificates into ./certificates/<Company>/
  certsort sort aws.pdf coursera-ml.pdf

  # Sort every PDF in a folder into a custom library
  certsort sort ~/Downloads/certs --output-dir ~/Certificates

  # Use another provider
  certsort sort --provider openai --model gpt-4.1-mini inbox/

  # Machine-readable results
  certsort sort --json inbox/ > results.json

  # Show what is already sorted
  certsort tree --output-dir ~/Certificates

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  MISTRAL_API_KEY         Mistral API key
  PDFIUM_LIB_PATH         Path to an existing libpdfium; skips auto-download
  PDFIUM_CACHE_DIR        Override the default pdfium cache directory
  RUST_LOG                Override log filtering (e.g. certsort=debug)

SETUP:
  1. Set API key:     export GEMINI_API_KEY=...
  2. Sort:            certsort sort ~/Downloads/*.pdf

  PDFium (~30 MB) is downloaded automatically on first run and cached in
  ~/.cache/certsort/pdfium-7690/.
"#;

/// Sort PDF certificates into per-company folders using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "certsort",
    version,
    about = "Sort PDF certificates into per-company folders using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Identify the issuer of each certificate and file it.
    Sort(SortArgs),
    /// Show the company folders and certificates already sorted.
    Tree(TreeArgs),
}

#[derive(Args, Debug)]
struct SortArgs {
    /// PDF files, directories of PDFs, or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Root folder that receives one sub-folder per company.
    #[arg(short, long, env = "CERTSORT_OUTPUT_DIR", default_value = certsort::config::DEFAULT_CERTIFICATES_DIR)]
    output_dir: PathBuf,

    /// LLM provider: gemini, openai, anthropic, mistral, ollama.
    #[arg(long, env = "CERTSORT_PROVIDER")]
    provider: Option<String>,

    /// Vision model ID (default depends on the provider).
    #[arg(long, env = "CERTSORT_MODEL")]
    model: Option<String>,

    /// Rendering DPI for the first page (72–400).
    #[arg(long, env = "CERTSORT_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// JPEG quality of the page image sent to the model (1–100).
    #[arg(long, env = "CERTSORT_JPEG_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Extraction attempts per certificate.
    #[arg(long, env = "CERTSORT_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Delay after a failed model call, in milliseconds.
    #[arg(long, env = "CERTSORT_RETRY_DELAY_MS", default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Largest accepted file, in megabytes.
    #[arg(long, env = "CERTSORT_MAX_SIZE_MB", default_value_t = 200)]
    max_size_mb: u64,

    /// Text file holding a custom extraction prompt.
    #[arg(long, env = "CERTSORT_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, env = "CERTSORT_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print results as JSON.
    #[arg(long, env = "CERTSORT_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "CERTSORT_NO_PROGRESS")]
    no_progress: bool,

    /// Show the library tree after sorting.
    #[arg(long)]
    tree: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CERTSORT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CERTSORT_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct TreeArgs {
    /// Root folder holding the company folders.
    #[arg(short, long, env = "CERTSORT_OUTPUT_DIR", default_value = certsort::config::DEFAULT_CERTIFICATES_DIR)]
    output_dir: PathBuf,

    /// Print the library as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Sort(args) => run_sort(args).await,
        Command::Tree(args) => {
            init_tracing("warn");
            run_tree(&args).await
        }
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();
}

async fn run_sort(args: SortArgs) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose brings them back.
    let show_progress = !args.quiet && !args.no_progress && !args.json;
    let filter = if args.verbose {
        "debug"
    } else if args.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    init_tracing(filter);

    // ── Build config and check the key before any work ──────────────────
    let mut config = build_config(&args).await?;
    config.check_api_key()?;

    // ── Ensure PDFium engine is available ───────────────────────────────
    prepare_engine(args.quiet || args.json)?;

    // The sort bar starts ticking on creation, so it only exists once the
    // download bar is done.
    if show_progress {
        let progress: ProgressCallback = std::sync::Arc::new(CliProgressCallback::new());
        config.progress_callback = Some(progress);
    }

    let organizer =
        CertificateOrganizer::from_config(config).context("Failed to set up the vision model")?;

    // ── Sort ─────────────────────────────────────────────────────────────
    let mut stats = ProcessingStats::new();
    let batch = organizer.process_inputs(&args.inputs, &mut stats).await;

    if args.json {
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "reports": batch.reports,
            "stats": stats,
        }))
        .context("Failed to serialise results")?;
        println!("{json}");
        return Ok(());
    }

    if args.quiet {
        return Ok(());
    }

    if !show_progress {
        for (i, report) in batch.reports.iter().enumerate() {
            println!("{}", file_line(i + 1, batch.total(), report));
        }
    }

    print_summary(&batch);
    print_groups(&batch);
    print_analytics(&stats);

    if args.tree {
        let folders = scan_library(&args.output_dir).await?;
        println!();
        print_tree(&args.output_dir, &folders);
    }

    Ok(())
}

/// Download pdfium on first run, with a progress bar unless `silent`.
fn prepare_engine(silent: bool) -> Result<()> {
    if silent || pdfium_loader::find_library().is_some() {
        tokio::task::block_in_place(|| ensure_engine(None))
            .context("Failed to load the PDFium engine")?;
        return Ok(());
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        ensure_engine(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download the PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

fn print_summary(batch: &BatchReport) {
    let total = batch.total();
    let ok = batch.successful();
    let line = match batch.outcome() {
        BatchOutcome::AllSucceeded => {
            format!("{} Successfully processed all {} certificates", green("✔"), bold(&total.to_string()))
        }
        BatchOutcome::Partial => format!(
            "{} Processed {}/{} certificates  ({} need attention)",
            yellow("⚠"),
            bold(&ok.to_string()),
            total,
            red(&batch.failed().to_string())
        ),
        BatchOutcome::NoneSucceeded => {
            format!("{} Failed to process any certificates", red("✘"))
        }
    };
    println!("\n{line}");
}

fn print_groups(batch: &BatchReport) {
    let groups = batch.by_company();
    if groups.is_empty() {
        return;
    }
    println!("\n{}", bold("Results by company"));
    for group in groups {
        println!("  📁 {} {}", bold(group.company), dim(&format!("({})", group.files.len())));
        for report in group.files {
            println!("     {} {}  {}", status_icon(report.status), report.file_name, dim(&report.message));
        }
    }
}

fn print_analytics(stats: &ProcessingStats) {
    let Some(total) = stats.average_ms(Stage::Total) else {
        return;
    };

    println!("\n{}", bold("Average processing time"));
    for stage in Stage::WORK {
        if let Some(avg) = stats.average_ms(stage) {
            println!("  {:<16} {}", stage.display_name(), seconds(avg as u64));
        }
    }
    println!("  {:<16} {}", bold(Stage::Total.display_name()), seconds(total as u64));

    if let (Some((slow, slow_ms)), Some((fast, fast_ms))) = (stats.slowest_stage(), stats.fastest_stage()) {
        println!(
            "  {} slowest: {} ({})  fastest: {} ({})",
            dim("·"),
            slow,
            seconds(slow_ms as u64),
            fast,
            seconds(fast_ms as u64)
        );
    }
    if let Some(elapsed) = stats.elapsed() {
        println!(
            "  {} batch time {}  success rate {:.0}%",
            dim("·"),
            seconds(elapsed.as_millis() as u64),
            stats.success_rate()
        );
    }
    for hint in stats.hints() {
        println!("  {} {}", cyan("💡"), hint);
    }
}

fn print_tree(root: &Path, folders: &[CompanyFolder]) {
    let summary = LibrarySummary::of(folders);
    println!(
        "{} {}  {}",
        bold(&root.display().to_string()),
        dim(&format!("{} companies", summary.companies)),
        dim(&format!("{} certificates", summary.certificates))
    );
    if folders.is_empty() {
        println!("  {}", dim("(no certificates sorted yet)"));
        return;
    }
    for (i, folder) in folders.iter().enumerate() {
        let last_folder = i + 1 == folders.len();
        let (branch, indent) = if last_folder { ("└──", "    ") } else { ("├──", "│   ") };
        println!("{branch} 📁 {} {}", bold(&folder.name), dim(&format!("({})", folder.certificates.len())));
        for (j, cert) in folder.certificates.iter().enumerate() {
            let leaf = if j + 1 == folder.certificates.len() { "└──" } else { "├──" };
            let modified = cert
                .modified
                .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{indent}{leaf} {}  {}  {}",
                cert.file_name,
                dim(&format_megabytes(cert.size_bytes)),
                dim(&modified)
            );
        }
    }
}

async fn run_tree(args: &TreeArgs) -> Result<()> {
    let folders = scan_library(&args.output_dir)
        .await
        .with_context(|| format!("Failed to read {}", args.output_dir.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&serde_json::json!({
            "root": args.output_dir,
            "summary": LibrarySummary::of(&folders),
            "companies": folders,
        }))
        .context("Failed to serialise library")?;
        println!("{json}");
    } else {
        print_tree(&args.output_dir, &folders);
    }
    Ok(())
}

/// Map CLI args to `OrganizerConfig`.
async fn build_config(args: &SortArgs) -> Result<OrganizerConfig> {
    let mut builder = OrganizerConfig::builder()
        .certificates_dir(args.output_dir.clone())
        .dpi(args.dpi)
        .jpeg_quality(args.jpeg_quality)
        .max_attempts(args.max_attempts)
        .retry_delay_ms(args.retry_delay_ms)
        .max_file_size_mb(args.max_size_mb)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref path) = args.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    builder.build().context("Invalid configuration")
}

//! CLI binary for edgequake-newsbrief.
//!
//! A thin shim over the library crate: copies each input PDF into the
//! uploads directory, enqueues one job per file, watches the status stream
//! and prints the Articles that were created.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_newsbrief::config::{DEFAULT_MODEL, DEFAULT_PROVIDER};
use edgequake_newsbrief::{
    Job, JobQueue, JobState, JobStatus, MemoryRepository, Pipeline, PipelineConfig,
    UnmatchedSubjectPolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
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
  # Brief today's edition
  newsbrief the-hindu.pdf

  # Brief a past edition into a separate output tree
  newsbrief --date 2024-03-01 --output-dir briefs/ the-hindu.pdf

  # Several editions, processed one after another
  newsbrief hindu.pdf express.pdf --json > briefs.json

  # Drop briefs for subjects that are not registered
  newsbrief --skip-unmatched hindu.pdf

OUTPUT LAYOUT:
  <output-dir>/summaries/<date>/<subject-slug>.pdf
  (output-dir defaults to the uploads directory)

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key (--provider openai)
  ANTHROPIC_API_KEY       Anthropic API key (--provider anthropic)
  OLLAMA_HOST             Ollama endpoint; no key needed (--provider ollama)
  NEWSBRIEF_PROVIDER      Override provider (gemini, openai, anthropic, ollama)
  NEWSBRIEF_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Turn newspaper PDFs into subject-wise briefs.
#[derive(Parser, Debug)]
#[command(
    name = "newsbrief",
    version,
    about = "Turn newspaper PDFs into subject-wise briefs using an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Newspaper PDF files to process, in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Processing date (YYYY-MM-DD). Defaults to today.
    #[arg(long, env = "NEWSBRIEF_DATE")]
    date: Option<String>,

    /// Newspaper id recorded on every Article. Defaults to a fresh UUID per file.
    #[arg(long)]
    newspaper_id: Option<String>,

    /// Directory source documents are copied into and read from.
    #[arg(long, env = "NEWSBRIEF_UPLOADS_DIR", default_value = "uploads")]
    uploads_dir: PathBuf,

    /// Root for rendered briefs. Defaults to the uploads directory.
    #[arg(short, long, env = "NEWSBRIEF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// LLM provider name.
    #[arg(long, env = "NEWSBRIEF_PROVIDER", default_value = DEFAULT_PROVIDER)]
    provider: String,

    /// LLM model ID.
    #[arg(long, env = "NEWSBRIEF_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Environment variable that must hold the provider credential.
    /// Defaults to the provider's own key variable (none for ollama).
    #[arg(long)]
    credential_env: Option<String>,

    /// Path to a text file containing a custom instruction prompt.
    #[arg(long, env = "NEWSBRIEF_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens for the subject map.
    #[arg(long, env = "NEWSBRIEF_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "NEWSBRIEF_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Give up on a summarization call after this many seconds.
    #[arg(long, env = "NEWSBRIEF_TIMEOUT")]
    timeout: Option<u64>,

    /// Drop briefs whose subject is not registered instead of filing them
    /// under the first subject.
    #[arg(long)]
    skip_unmatched: bool,

    /// Output job statuses and Articles as JSON.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NEWSBRIEF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "NEWSBRIEF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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

    let config = build_config(&cli).await?;
    let date = cli
        .date
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());

    // ── Stage uploads ────────────────────────────────────────────────────
    let mut jobs = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let file_name = stage_upload(input, &config.uploads_dir).await?;
        let newspaper_id = cli
            .newspaper_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let name = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.clone());
        jobs.push(Job::new(newspaper_id, name, date.clone(), file_name));
    }

    // ── Run queue ────────────────────────────────────────────────────────
    let repository = Arc::new(MemoryRepository::new());
    let queue = JobQueue::start(Pipeline::new(config, repository.clone()));

    let bar = show_progress.then(|| progress_bar(jobs.len()));
    let watcher = tokio::spawn(watch_progress(queue.subscribe(), bar.clone()));

    let mut handles = Vec::with_capacity(jobs.len());
    for job in &jobs {
        let handle = queue.submit(job.clone()).context("Failed to enqueue job")?;
        handles.push((handle, job));
    }

    // The status stream can skip a job's terminal value; its handle cannot.
    let mut finished: Vec<(JobStatus, &Job)> = Vec::with_capacity(handles.len());
    for (handle, job) in handles {
        let status = handle.finished().await.context("Job was not run")?;
        if status.state == JobState::Failed {
            if let Some(ref bar) = bar {
                bar.println(format!(
                    "  {} {}  {}",
                    red("✗"),
                    job.name,
                    status.message.as_deref().unwrap_or("failed")
                ));
            }
        }
        finished.push((status, job));
    }

    queue.shutdown().await.context("Job queue did not shut down cleanly")?;
    watcher.await.context("Status watcher panicked")?;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    let articles = repository.articles().await;
    let failed = finished
        .iter()
        .filter(|(s, _)| s.state == JobState::Failed)
        .count();

    if cli.json {
        let statuses: Vec<&JobStatus> = finished.iter().map(|(s, _)| s).collect();
        let report = serde_json::json!({ "jobs": statuses, "articles": articles });
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        for (status, job) in &finished {
            if status.state == JobState::Failed {
                eprintln!(
                    "{} {}  {}",
                    red("✘"),
                    bold(&job.name),
                    red(status.message.as_deref().unwrap_or("failed"))
                );
            } else {
                eprintln!("{} {}", green("✔"), bold(&job.name));
            }
            for article in articles.iter().filter(|a| a.newspaper_id == job.newspaper_id) {
                println!(
                    "  {}  {}",
                    article.title,
                    dim(&format!(
                        "{}  {}p  {} min",
                        article.pdf_path.as_deref().unwrap_or("-"),
                        article.page_count,
                        article.read_time
                    ))
                );
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} jobs failed", failed, finished.len());
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .uploads_dir(&cli.uploads_dir)
        .provider_name(&cli.provider)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature);

    if let Some(ref var) = cli.credential_env {
        builder = builder.credential_env(var);
    }
    if let Some(ref dir) = cli.output_dir {
        builder = builder.output_dir(dir);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.summarize_timeout_secs(secs);
    }
    if cli.skip_unmatched {
        builder = builder.unmatched_subject(UnmatchedSubjectPolicy::Skip);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Copy `input` into the uploads directory unless it already lives there.
/// Returns the file name the job should reference.
async fn stage_upload(input: &Path, uploads_dir: &Path) -> Result<String> {
    let file_name = input
        .file_name()
        .with_context(|| format!("{} has no file name", input.display()))?
        .to_string_lossy()
        .to_string();

    tokio::fs::create_dir_all(uploads_dir)
        .await
        .with_context(|| format!("Failed to create {}", uploads_dir.display()))?;

    let target = uploads_dir.join(&file_name);
    let same = match (
        tokio::fs::canonicalize(input).await,
        tokio::fs::canonicalize(&target).await,
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if !same {
        tokio::fs::copy(input, &target).await.with_context(|| {
            format!(
                "Failed to copy {} into {}",
                input.display(),
                uploads_dir.display()
            )
        })?;
    }
    Ok(file_name)
}

fn progress_bar(jobs: usize) -> ProgressBar {
    let bar = ProgressBar::new(jobs as u64 * 100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {percent:>3}%  {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Briefing");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Drive the progress bar from the status stream until the queue shuts down.
///
/// The stream may skip snapshots, so it is only used for display.
async fn watch_progress(
    mut updates: impl tokio_stream::Stream<Item = JobStatus> + Unpin,
    bar: Option<ProgressBar>,
) {
    let Some(bar) = bar else {
        return;
    };
    let mut started: Vec<String> = Vec::new();

    while let Some(status) = updates.next().await {
        if !started.contains(&status.id) {
            started.push(status.id.clone());
        }
        let finished_before = started.len().saturating_sub(1) as u64;
        bar.set_position(finished_before * 100 + u64::from(status.progress));
        bar.set_message(status.message.clone().unwrap_or_default());
    }
}

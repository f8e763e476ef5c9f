//! CLI binary for pagelens.
//!
//! A thin shim over the library crate: maps flags to `LensConfig`, then
//! either serves the HTTP API or runs one operation and prints the result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pagelens::{
    convert_path, server, tools, write_markdown, GeminiClient, LensConfig, LensConfigBuilder,
    OcrProgressCallback, OcrStage, ProgressCallback, TextRequest,
};
use std::io::{self, IsTerminal, Read, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner that shows the current OCR stage and logs one line per stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("OCR");
        bar.set_message("Reading image…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl OcrProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: OcrStage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: OcrStage, output_len: usize) {
        let unit = if stage == OcrStage::Layout { "blocks" } else { "chars" };
        self.bar.println(format!(
            "  {} {:<9} {}",
            green("✓"),
            stage.as_str(),
            dim(&format!("{output_len:>5} {unit}"))
        ));
    }

    fn on_stage_failed(&self, stage: OcrStage, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        let mark = if stage == OcrStage::Extract { red("✗") } else { yellow("⚠") };
        self.bar
            .println(format!("  {} {:<9} {}", mark, stage.as_str(), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the HTTP API on the default port
  pagelens serve

  # OCR a page photo to stdout
  pagelens ocr page.jpg

  # OCR to a file, skipping the structured layout pass
  pagelens ocr page.jpg --no-layout -o page.md

  # Full JSON output (markdown, raw passes, blocks)
  pagelens ocr https://example.org/scan.png --json

  # Reader tools
  pagelens simplify "A function is injective if ..."
  pagelens explain --context "$(cat page.md)" 'f^{-1}(y)'
  echo "the chain rule" | pagelens tree

  # Check the API key and model name
  pagelens ping

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY        Google Gemini API key (required; also read from .env)
  GEMINI_TEXT_MODEL     Model for text calls (default: gemini-2.5-flash)
  GEMINI_VISION_MODEL   Model for the image call (default: the text model)
  GEMINI_BASE_URL       API base URL (default: Google's v1beta endpoint)
  RUST_LOG              Log filter, e.g. pagelens=debug
"#;

/// Textbook page OCR, simplification, explanation and prerequisite trees.
#[derive(Parser, Debug)]
#[command(
    name = "pagelens",
    version,
    about = "Textbook page OCR to Markdown + LaTeX, with reader tools, backed by Gemini",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    model: ModelArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAGELENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, global = true, env = "PAGELENS_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Model for text-only calls.
    #[arg(long, global = true, env = "GEMINI_TEXT_MODEL")]
    text_model: Option<String>,

    /// Model for the image extraction call.
    #[arg(long, global = true, env = "GEMINI_VISION_MODEL")]
    vision_model: Option<String>,

    /// Per-call model timeout in seconds (default: none).
    #[arg(long, global = true, env = "PAGELENS_API_TIMEOUT")]
    api_timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Address to bind.
        #[arg(long, env = "PAGELENS_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,

        /// Maximum upload size in MiB.
        #[arg(long, env = "PAGELENS_MAX_UPLOAD_MB", default_value_t = 20)]
        max_upload_mb: usize,

        #[command(flatten)]
        passes: PassArgs,
    },

    /// OCR one page image (local path or HTTP/HTTPS URL).
    Ocr {
        input: String,

        /// Write Markdown to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full structured result as JSON.
        #[arg(long)]
        json: bool,

        /// Print the Markdown rendered from layout blocks (when available).
        #[arg(long)]
        blocks: bool,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "PAGELENS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,

        /// Disable progress spinner.
        #[arg(long)]
        no_progress: bool,

        #[command(flatten)]
        passes: PassArgs,
    },

    /// Simplify an excerpt.
    Simplify(TextArgs),

    /// Explain an excerpt.
    Explain(TextArgs),

    /// Build a prerequisite knowledge tree for an excerpt (JSON).
    Tree(TextArgs),

    /// Send a one-line prompt to the text model.
    Ping,
}

#[derive(Args, Debug)]
struct PassArgs {
    /// Skip the readability reformat pass.
    #[arg(long)]
    no_reformat: bool,

    /// Skip the structured layout pass.
    #[arg(long)]
    no_layout: bool,
}

#[derive(Args, Debug)]
struct TextArgs {
    /// Excerpt to operate on. Read from stdin when omitted.
    text: Option<String>,

    /// Surrounding page text, used as context.
    #[arg(long)]
    context: Option<String>,

    /// Read the context from a file.
    #[arg(long, conflicts_with = "context")]
    context_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // One-shot commands stay quiet unless asked; the server logs requests.
    let default_filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if matches!(cli.command, Command::Serve { .. }) {
        "info,tower_http=info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Serve {
            bind,
            max_upload_mb,
            passes,
        } => {
            let config = base_config(&cli.model)
                .max_upload_bytes(max_upload_mb.saturating_mul(1024 * 1024))
                .reformat(!passes.no_reformat)
                .layout(!passes.no_layout)
                .build()
                .context("Invalid configuration")?;
            let state = server::AppState::new(config).context("Cannot start server")?;
            if !cli.quiet {
                eprintln!("{} listening on http://{bind}", green("◆"));
            }
            server::serve(state, *bind).await.context("Server failed")?;
        }

        Command::Ocr {
            input,
            output,
            json,
            blocks,
            download_timeout,
            no_progress,
            passes,
        } => {
            let show_progress = !cli.quiet && !no_progress && io::stderr().is_terminal();
            let spinner = show_progress.then(CliProgressCallback::new);

            let mut builder = base_config(&cli.model)
                .download_timeout_secs(*download_timeout)
                .reformat(!passes.no_reformat)
                .layout(!passes.no_layout);
            if let Some(ref cb) = spinner {
                builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
            }
            let config = builder.build().context("Invalid configuration")?;
            let client = client(&config)?;

            let result = convert_path(&client, &config, input).await;
            if let Some(ref cb) = spinner {
                cb.finish();
            }
            let result = result.context("OCR failed")?;

            let text = if *json {
                serde_json::to_string_pretty(&result).context("Failed to serialise output")?
            } else if *blocks {
                match result.blocks_markdown {
                    Some(ref md) => md.clone(),
                    None => bail!("The layout pass produced no blocks; rerun without --blocks"),
                }
            } else {
                result.markdown.clone()
            };

            match output {
                Some(path) => {
                    write_markdown(path, &text)
                        .await
                        .context("Failed to write output")?;
                    if !cli.quiet {
                        eprintln!("{} {}", green("✔"), path.display());
                    }
                }
                None => print_out(&text)?,
            }
        }

        Command::Simplify(args) => {
            let (client, request) = text_command(&cli.model, args).await?;
            let out = tools::simplify(&client, &request)
                .await
                .context("Failed to simplify text")?;
            print_out(&out)?;
        }

        Command::Explain(args) => {
            let (client, request) = text_command(&cli.model, args).await?;
            let out = tools::explain(&client, &request)
                .await
                .context("Failed to explain text")?;
            print_out(&out)?;
        }

        Command::Tree(args) => {
            let (client, request) = text_command(&cli.model, args).await?;
            let tree = tools::knowledge_tree(&client, &request)
                .await
                .context("Failed to generate knowledge tree")?;
            if tree.raw_response.is_some() && !cli.quiet {
                eprintln!("{} model output was not valid JSON", yellow("⚠"));
            }
            print_out(&serde_json::to_string_pretty(&tree).context("Failed to serialise tree")?)?;
        }

        Command::Ping => {
            let config = base_config(&cli.model).build().context("Invalid configuration")?;
            let client = client(&config)?;
            let out = tools::ping(&client)
                .await
                .context("Failed to reach text model")?;
            print_out(out.trim())?;
        }
    }

    Ok(())
}

/// Environment first, then flags on top.
fn base_config(args: &ModelArgs) -> LensConfigBuilder {
    let mut builder = LensConfigBuilder::from_env();
    if let Some(ref m) = args.text_model {
        builder = builder.text_model(m);
    }
    if let Some(ref m) = args.vision_model {
        builder = builder.vision_model(m);
    }
    if let Some(secs) = args.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    builder
}

fn client(config: &LensConfig) -> Result<GeminiClient> {
    GeminiClient::new(config).context("Model client is not configured")
}

async fn text_command(model: &ModelArgs, args: &TextArgs) -> Result<(GeminiClient, TextRequest)> {
    let config = base_config(model).build().context("Invalid configuration")?;
    let client = client(&config)?;

    let text = match args.text {
        Some(ref t) => t.clone(),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read excerpt from stdin")?;
            buf
        }
    };

    let full_text = match (&args.context, &args.context_file) {
        (Some(c), _) => Some(c.clone()),
        (None, Some(path)) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read context from {:?}", path))?,
        ),
        (None, None) => None,
    };

    let request = TextRequest {
        text: None,
        highlighted_text: Some(text),
        full_text,
    };
    // Validate before spending a request.
    request.selection().context("Nothing to send")?;
    Ok((client, request))
}

/// Write to stdout with a trailing newline.
fn print_out(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

//! CLI binary for formrelay.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! [`RelayConfig`], a [`FormFields`] record and a [`CaptureSession`],
//! then runs one of three actions: save-draft, dry-run, or submit.

use anyhow::{bail, Context, Result};
use clap::Parser;
use formrelay::{CaptureSession, Dispatcher, DraftStore, FormFields, RelayConfig};
use indicatif::{ProgressBar, ProgressStyle};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Submit one photo with the full record
  formrelay --date 2024-01-01 --article A1 --client ACME \
            --order-number B1 --quantity 5 photo.jpg

  # Several photos become one PDF, one page each, in argument order
  formrelay --date 2024-01-01 --article A1 --client ACME --quantity 3 \
            front.jpg back.jpg label.png

  # Validate and build the PDF locally; nothing is sent
  formrelay --dry-run --pdf-out bundle.pdf \
            --date 2024-01-01 --article A1 --client ACME --quantity 5 photo.jpg

  # Save a half-finished record for later
  formrelay --save-draft --date 2024-01-01 --client ACME

  # Pick the draft back up, fill in the rest, submit
  formrelay --from-draft --quantity 5 photo.jpg

ENVIRONMENT VARIABLES:
  FORMRELAY_SHEET_URL       Spreadsheet-ingestion endpoint URL
  FORMRELAY_DOCUMENT_URL    Full document-delivery URL (overrides the bot token)
  FORMRELAY_BOT_TOKEN       Messaging bot credential (builds the default delivery URL)
  FORMRELAY_CHAT_ID         Destination chat/room identifier
  FORMRELAY_CAPTION_PREFIX  Text prepended to the document caption
  FORMRELAY_DRAFT_PATH      Draft slot location (default: platform data dir)
  FORMRELAY_TIMEOUT         Per-request HTTP timeout in seconds (default: 60)

SETUP:
  1. Configure the deployment:
       export FORMRELAY_SHEET_URL=https://example.com/ingest
       export FORMRELAY_BOT_TOKEN=123:abc
       export FORMRELAY_CHAT_ID=-1000
  2. Submit:
       formrelay --date 2024-01-01 --article A1 --client ACME --quantity 5 photo.jpg

  The PDF is named <order-number>.pdf when an order number is given,
  submission_<timestamp>.pdf otherwise. The caption is the caption prefix
  followed by the client name.
"#;

/// Relay a data-entry record with photo attachments to the configured services.
#[derive(Parser, Debug)]
#[command(
    name = "formrelay",
    version,
    about = "Bundle photos into a PDF and relay a data-entry record to spreadsheet and messaging services",
    long_about = "Capture a data-entry record (date, article, client, order number, ticket number, \
quantity) plus one or more JPEG/PNG photos, bundle the photos into a single PDF (one page each), \
and relay the record to a spreadsheet-ingestion endpoint and the PDF to a chat-based document sink, \
concurrently.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// JPEG or PNG attachments; one PDF page each, in the given order.
    images: Vec<PathBuf>,

    /// Record date (required to submit).
    #[arg(long)]
    date: Option<String>,

    /// Article identifier (required to submit).
    #[arg(long)]
    article: Option<String>,

    /// Client name (required to submit; also the caption body).
    #[arg(long)]
    client: Option<String>,

    /// Order number; names the delivered PDF when present.
    #[arg(long)]
    order_number: Option<String>,

    /// Ticket number.
    #[arg(long)]
    ticket_number: Option<String>,

    /// Quantity; must parse as a whole number to submit.
    #[arg(long)]
    quantity: Option<String>,

    /// Save the field values to the draft slot and exit (no submit).
    #[arg(long)]
    save_draft: bool,

    /// Prefill fields from the stored draft; explicit flags override.
    #[arg(long)]
    from_draft: bool,

    /// Validate and assemble the PDF, but send nothing.
    #[arg(long)]
    dry_run: bool,

    /// Also write the assembled PDF to this file.
    #[arg(long, value_name = "FILE")]
    pdf_out: Option<PathBuf>,

    /// Spreadsheet-ingestion endpoint URL.
    #[arg(long, env = "FORMRELAY_SHEET_URL")]
    sheet_url: Option<String>,

    /// Full document-delivery URL (overrides --bot-token).
    #[arg(long, env = "FORMRELAY_DOCUMENT_URL")]
    document_url: Option<String>,

    /// Messaging bot credential.
    #[arg(long, env = "FORMRELAY_BOT_TOKEN", hide_env_values = true)]
    bot_token: Option<String>,

    /// Destination chat/room identifier.
    #[arg(long, env = "FORMRELAY_CHAT_ID")]
    chat_id: Option<String>,

    /// Text prepended to the document caption.
    #[arg(long, env = "FORMRELAY_CAPTION_PREFIX")]
    caption_prefix: Option<String>,

    /// Draft slot location.
    #[arg(long, env = "FORMRELAY_DRAFT_PATH", value_name = "FILE")]
    draft_path: Option<PathBuf>,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, env = "FORMRELAY_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FORMRELAY_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FORMRELAY_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The per-image lines and the spinner carry the feedback that matters;
    // library logs stay at WARN unless the user asks for more.
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let mut fields = resolve_fields(&cli, &config)?;

    // ── Save-draft mode ──────────────────────────────────────────────────
    if cli.save_draft {
        let store = DraftStore::new(&config)?;
        store.save(&fields)?;
        if !cli.quiet {
            eprintln!(
                "{} Draft saved to {}",
                green("✔"),
                bold(&store.path().display().to_string())
            );
        }
        return Ok(());
    }

    // ── Attach images ────────────────────────────────────────────────────
    let mut session = CaptureSession::with_thumbnail_px(config.thumbnail_px);
    for path in &cli.images {
        session.add_image_file(path)?;
        if !cli.quiet {
            if let Some(img) = session.images().last() {
                eprintln!(
                    "  {} {}  {}",
                    green("✓"),
                    path.display(),
                    dim(&format!(
                        "{} {}×{}, {}",
                        img.kind,
                        img.width,
                        img.height,
                        human_size(img.bytes.len())
                    ))
                );
            }
        }
    }

    let mut dispatcher = Dispatcher::new(config)?;

    // ── Dry-run / local PDF ──────────────────────────────────────────────
    if cli.dry_run || cli.pdf_out.is_some() {
        let pdf = dispatcher.dry_run(&fields, &session)?;
        if let Some(ref path) = cli.pdf_out {
            std::fs::write(path, &pdf)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} Wrote {} page(s) ({}) to {}",
                    green("✔"),
                    session.len(),
                    human_size(pdf.len()),
                    bold(&path.display().to_string())
                );
            }
        }
        if cli.dry_run {
            if !cli.quiet {
                eprintln!("{} Dry run complete — nothing was sent", green("✔"));
            }
            return Ok(());
        }
    }

    // ── Submit ───────────────────────────────────────────────────────────
    let spinner = (!cli.quiet).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Submitting");
        bar.set_message(format!(
            "{} page(s) → spreadsheet + document services",
            session.len()
        ));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let result = dispatcher.submit(&mut fields, &mut session).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    // Validation, configuration and assembly problems print their own
    // message; a submission that reached the services reports below.
    let report = result?;

    if report.succeeded() {
        if !cli.quiet {
            eprintln!(
                "{} Submitted — {} delivered  {}",
                green("✔"),
                bold(&report.document_name),
                dim(&format!(
                    "{} page(s), {}, {}ms",
                    report.stats.page_count,
                    human_size(report.stats.pdf_bytes),
                    report.stats.total_duration_ms
                ))
            );
        }
        Ok(())
    } else {
        // Per-channel detail went to the warn-level logs; the user-facing
        // message stays a single combined failure.
        eprintln!(
            "{} Submission failed — the record was kept, fix the problem and try again",
            red("✘")
        );
        std::process::exit(1);
    }
}

/// Map CLI args to a `RelayConfig`.
fn build_config(cli: &Cli) -> Result<RelayConfig> {
    let mut builder = RelayConfig::builder().request_timeout_secs(cli.timeout);

    if let Some(ref url) = cli.sheet_url {
        builder = builder.sheet_url(url);
    }
    if let Some(ref url) = cli.document_url {
        builder = builder.document_url(url);
    }
    if let Some(ref token) = cli.bot_token {
        builder = builder.bot_token(token);
    }
    if let Some(ref id) = cli.chat_id {
        builder = builder.chat_id(id);
    }
    if let Some(ref prefix) = cli.caption_prefix {
        builder = builder.caption_prefix(prefix);
    }
    if let Some(ref path) = cli.draft_path {
        builder = builder.draft_path(path);
    }

    builder.build().context("Invalid configuration")
}

/// Start from the stored draft (when asked) and lay explicit flags on top.
fn resolve_fields(cli: &Cli, config: &RelayConfig) -> Result<FormFields> {
    let mut fields = if cli.from_draft {
        let store = DraftStore::new(config)?;
        match store.load()? {
            Some(draft) => {
                if !cli.quiet {
                    eprintln!(
                        "{} Using draft saved at {}",
                        cyan("◆"),
                        draft.saved_at.to_rfc3339()
                    );
                }
                draft.fields
            }
            None => bail!("No draft saved yet (looked in {})", store.path().display()),
        }
    } else {
        FormFields::default()
    };

    if let Some(ref v) = cli.date {
        fields.date = v.clone();
    }
    if let Some(ref v) = cli.article {
        fields.article = v.clone();
    }
    if let Some(ref v) = cli.client {
        fields.client = v.clone();
    }
    if let Some(ref v) = cli.order_number {
        fields.order_number = v.clone();
    }
    if let Some(ref v) = cli.ticket_number {
        fields.ticket_number = v.clone();
    }
    if let Some(ref v) = cli.quantity {
        fields.quantity = v.clone();
    }

    Ok(fields)
}

fn human_size(bytes: usize) -> String {
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

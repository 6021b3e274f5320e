//! Submission dispatch: validate, assemble, fan out, decide.
//!
//! ## Why one dispatcher?
//!
//! A submission is a single irrevocable step from the caller's point of
//! view: once it starts, it runs to completion or failure with no
//! cancellation and no per-channel retry. The [`Dispatcher`] owns the
//! HTTP client and the resolved configuration so every submit reuses one
//! connection pool and one set of deployment values, and its
//! [`SubmitState`] tells a host UI when to disable its submit control.
//!
//! Ordering matters: validation and the quantity parse run before the
//! PDF is assembled, and assembly runs before any network call, so a
//! rejected submission has zero external side effects.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::fields::FormFields;
use crate::output::{SubmissionReport, SubmissionStats, SubmitState};
use crate::pipeline::{assemble, deliver, sheet};
use crate::session::CaptureSession;
use crate::validate::validate;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Relays validated submissions to the two delivery services.
///
/// # Example
/// ```rust,no_run
/// use formrelay::{CaptureSession, Dispatcher, FormFields, RelayConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RelayConfig::builder()
///     .sheet_url("https://example.com/ingest")
///     .bot_token("123:abc")
///     .chat_id("-1000")
///     .build()?;
///
/// let mut session = CaptureSession::new();
/// session.add_image_file("photo.jpg")?;
///
/// let mut fields = FormFields {
///     date: "2024-01-01".into(),
///     article: "A1".into(),
///     client: "ACME".into(),
///     quantity: "5".into(),
///     ..Default::default()
/// };
///
/// let mut dispatcher = Dispatcher::new(config)?;
/// let report = dispatcher.submit(&mut fields, &mut session).await?;
/// if report.succeeded() {
///     println!("delivered as {}", report.document_name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Dispatcher {
    client: reqwest::Client,
    config: RelayConfig,
    state: SubmitState,
}

impl Dispatcher {
    /// Build a dispatcher with its own HTTP client.
    ///
    /// The client carries the configured request timeout; with no retry
    /// anywhere in the submission path, that timeout is the only bound
    /// on a hung service.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| RelayError::Internal(format!("HTTP client construction failed: {e}")))?;

        Ok(Self {
            client,
            config,
            state: SubmitState::Idle,
        })
    }

    /// Where the dispatcher currently is in its lifecycle.
    pub fn state(&self) -> SubmitState {
        self.state
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Run every pre-network step — validation, quantity parse, PDF
    /// assembly — and return the assembled document without sending
    /// anything anywhere.
    pub fn dry_run(
        &self,
        fields: &FormFields,
        session: &CaptureSession,
    ) -> Result<Vec<u8>, RelayError> {
        let errors = validate(fields, session.len());
        if !errors.is_empty() {
            return Err(RelayError::ValidationFailed { errors });
        }
        fields.to_row()?;
        assemble::assemble_pdf(session.images(), &self.config.page)
    }

    /// Submit the record: validate, assemble the PDF, relay to both
    /// services concurrently, and decide the combined outcome.
    ///
    /// On full success the fields and the session are cleared. On any
    /// failure both are left untouched so the user can fix the problem
    /// and submit again.
    ///
    /// # Errors
    /// [`RelayError::ValidationFailed`] before anything is sent;
    /// [`RelayError::MissingEndpoint`] when the deployment is not
    /// configured; [`RelayError::PdfAssemblyFailed`] /
    /// [`RelayError::ImageDecodeFailed`] from assembly. A submission
    /// that reached the fan-out always returns `Ok` — inspect the
    /// [`SubmissionReport`] (or fold it with
    /// [`SubmissionReport::into_result`]) for what each channel did.
    pub async fn submit(
        &mut self,
        fields: &mut FormFields,
        session: &mut CaptureSession,
    ) -> Result<SubmissionReport, RelayError> {
        let total_start = Instant::now();
        self.state = SubmitState::Submitting;
        info!(
            "Submitting {} image(s) for client '{}'",
            session.len(),
            fields.client
        );

        // ── Step 1: Validate ─────────────────────────────────────────────
        let errors = validate(fields, session.len());
        if !errors.is_empty() {
            // Nothing was sent; back to Idle so the caller fixes and retries.
            self.state = SubmitState::Idle;
            return Err(RelayError::ValidationFailed { errors });
        }

        // ── Step 2: Project the spreadsheet row ──────────────────────────
        let row = match fields.to_row() {
            Ok(row) => row,
            Err(e) => {
                self.state = SubmitState::Idle;
                return Err(e);
            }
        };

        // ── Step 3: Resolve the deployment ───────────────────────────────
        // Before assembly, so a misconfigured deployment fails fast.
        let sheet_url = match self.config.resolve_sheet_url() {
            Ok(url) => url,
            Err(e) => {
                self.state = SubmitState::Failed;
                return Err(e);
            }
        };
        let endpoint = match self.config.resolve_document_endpoint() {
            Ok(ep) => ep,
            Err(e) => {
                self.state = SubmitState::Failed;
                return Err(e);
            }
        };

        // ── Step 4: Assemble the PDF ─────────────────────────────────────
        let assemble_start = Instant::now();
        let pdf = match assemble::assemble_pdf(session.images(), &self.config.page) {
            Ok(pdf) => pdf,
            Err(e) => {
                self.state = SubmitState::Failed;
                return Err(e);
            }
        };
        let assemble_duration_ms = assemble_start.elapsed().as_millis() as u64;

        let page_count = session.len();
        let pdf_bytes = pdf.len();
        let document_name = fields.document_name();
        let caption = self.config.caption_for(&fields.client);
        debug!(
            "Assembled '{}': {} page(s), {} bytes in {}ms",
            document_name, page_count, pdf_bytes, assemble_duration_ms
        );

        // ── Step 5: Fan out to both services ─────────────────────────────
        // Exactly two requests, concurrent; both settle before the
        // combined outcome is decided.
        let deliver_start = Instant::now();
        let (sheet_outcome, document_outcome) = tokio::join!(
            sheet::post_row(&self.client, &sheet_url, &row),
            deliver::send_document(&self.client, &endpoint, pdf, &document_name, &caption),
        );
        let deliver_duration_ms = deliver_start.elapsed().as_millis() as u64;

        // ── Step 6: Decide and reset ─────────────────────────────────────
        let report = SubmissionReport {
            document_name,
            sheet: sheet_outcome,
            document: document_outcome,
            stats: SubmissionStats {
                page_count,
                pdf_bytes,
                assemble_duration_ms,
                deliver_duration_ms,
                total_duration_ms: total_start.elapsed().as_millis() as u64,
            },
        };

        if report.succeeded() {
            fields.clear();
            session.clear();
            self.state = SubmitState::Succeeded;
            info!(
                "Submission complete: '{}' delivered, {}ms total",
                report.document_name, report.stats.total_duration_ms
            );
        } else {
            // Fields and session stay intact for a manual retry.
            self.state = SubmitState::Failed;
            warn!(
                "Submission failed (spreadsheet delivered: {}, document delivered: {})",
                report.sheet.delivered, report.document.delivered
            );
        }

        Ok(report)
    }
}

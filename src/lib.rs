//! # formrelay
//!
//! Capture a small data-entry record with photo attachments, bundle the
//! photos into a single PDF, and relay everything to two external
//! services: a spreadsheet-ingestion endpoint (one JSON row per
//! submission) and a chat-based document sink (the PDF, uploaded as a
//! multipart attachment with a caption).
//!
//! ## Why this crate?
//!
//! Field-capture workflows — goods-in tickets, delivery confirmations,
//! inspection reports — usually end the same way: a row lands in a
//! spreadsheet and the photos land in a chat room where the team already
//! lives. This crate is the headless core of that flow. It owns the
//! attachment list, the validation rules, the PDF assembly, and the
//! two-channel relay, with no dependency on any UI framework, so the
//! same logic drives a CLI, a desktop shell, or a test harness
//! unchanged.
//!
//! ## Pipeline Overview
//!
//! ```text
//! fields + images
//!  │
//!  ├─ 1. Validate  required fields present, at least one image
//!  ├─ 2. Project   quantity parsed, camelCase spreadsheet row
//!  ├─ 3. Assemble  one PDF page per image, fit-to-page, centered
//!  ├─ 4. Relay     spreadsheet JSON ∥ multipart PDF upload
//!  └─ 5. Report    per-channel outcomes + timing stats
//! ```
//!
//! The two relay requests run concurrently and both settle before the
//! combined outcome is decided; the fields and the attachment list are
//! cleared only when both channels confirm delivery.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formrelay::{CaptureSession, Dispatcher, FormFields, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Deployment values may also come from FORMRELAY_* env vars.
//!     let config = RelayConfig::builder()
//!         .sheet_url("https://example.com/ingest")
//!         .bot_token("123:abc")
//!         .chat_id("-1000")
//!         .build()?;
//!
//!     let mut session = CaptureSession::new();
//!     session.add_image_file("ticket_photo.jpg")?;
//!
//!     let mut fields = FormFields {
//!         date: "2024-01-01".into(),
//!         article: "A1".into(),
//!         client: "ACME".into(),
//!         order_number: "B1".into(),
//!         quantity: "5".into(),
//!         ..Default::default()
//!     };
//!
//!     let mut dispatcher = Dispatcher::new(config)?;
//!     let report = dispatcher.submit(&mut fields, &mut session).await?;
//!     if report.succeeded() {
//!         println!("delivered as {}", report.document_name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `formrelay` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! formrelay = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod draft;
pub mod error;
pub mod fields;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod submit;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DocumentEndpoint, PageLayout, RelayConfig, RelayConfigBuilder};
pub use draft::{DraftSnapshot, DraftStore};
pub use error::RelayError;
pub use fields::{FormFields, SheetRow};
pub use output::{ChannelOutcome, SubmissionReport, SubmissionStats, SubmitState};
pub use pipeline::assemble::assemble_pdf;
pub use session::{CaptureSession, CapturedImage, ImageKind};
pub use submit::Dispatcher;
pub use validate::validate;

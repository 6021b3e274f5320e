//! Error types for the formrelay library.
//!
//! One fatal enum, [`RelayError`], covers everything that stops an
//! operation: bad configuration, unreadable attachments, a failed PDF
//! build, or a submission the remote services rejected.
//!
//! Per-channel delivery results are deliberately NOT errors. A submission
//! fans out to two services and either of them may fail while the other
//! succeeds; that is an expected outcome the caller inspects on
//! [`crate::output::SubmissionReport`], not an exception. Only
//! [`crate::output::SubmissionReport::into_result`] folds a failed
//! delivery back into a [`RelayError::DeliveryFailed`] for callers that
//! want `?`-style control flow.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the formrelay library.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// Attachment file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    ImageFileNotFound { path: PathBuf },

    /// Attachment file exists but could not be read.
    #[error("Failed to read image '{path}': {source}")]
    ImageReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The attachment is neither JPEG nor PNG.
    #[error("Unsupported image format: {detail}\nOnly JPEG and PNG attachments can be placed in the PDF.")]
    UnsupportedImageFormat { detail: String },

    /// The attachment claims a supported format but its bytes do not decode.
    #[error("Image could not be decoded: {detail}")]
    ImageDecodeFailed { detail: String },

    // ── Submission errors ─────────────────────────────────────────────────
    /// Required fields are missing or no image is attached.
    ///
    /// Recoverable: nothing has been sent anywhere; the caller fixes the
    /// listed problems and submits again.
    #[error("Submission blocked: {}", errors.join(", "))]
    ValidationFailed { errors: Vec<String> },

    /// Building the PDF bundle failed.
    #[error("PDF assembly failed: {detail}")]
    PdfAssemblyFailed { detail: String },

    /// At least one of the two delivery channels did not confirm success.
    ///
    /// Produced from [`crate::output::SubmissionReport::into_result`];
    /// the flags say which channel(s) went through so logs stay useful
    /// even though the user-facing message is a single combined failure.
    #[error("Submission failed (spreadsheet delivered: {sheet_delivered}, document delivered: {document_delivered})")]
    DeliveryFailed {
        sheet_delivered: bool,
        document_delivered: bool,
    },

    // ── Draft errors ──────────────────────────────────────────────────────
    /// Could not write or read the draft slot.
    #[error("Draft store failed at '{path}': {source}")]
    DraftStoreFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stored draft exists but is not valid JSON for this version.
    #[error("Draft at '{path}' is corrupt: {detail}")]
    DraftCorrupt { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// A delivery endpoint is neither configured nor available from the
    /// environment.
    #[error("No {channel} endpoint configured.\n{hint}")]
    MissingEndpoint { channel: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

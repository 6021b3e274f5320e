//! Submission outcome types.
//!
//! A submission fans out to two services, and either can fail while the
//! other succeeds. That is an expected outcome, so each channel's result
//! is data — a [`ChannelOutcome`] — rather than an error. The combined
//! [`SubmissionReport`] says what actually happened; callers that prefer
//! `?`-style control flow fold it with [`SubmissionReport::into_result`].

use crate::error::RelayError;
use serde::Serialize;

/// What happened on one delivery channel.
///
/// For the spreadsheet channel `delivered` means "the request completed
/// without a transport error" — the response is never inspected. For the
/// document channel it means the service confirmed the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub delivered: bool,
    /// Failure detail for logs and reports. Never shown as the primary
    /// user-facing message, which stays a generic combined failure.
    pub detail: Option<String>,
}

impl ChannelOutcome {
    pub fn ok() -> Self {
        Self {
            delivered: true,
            detail: None,
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            delivered: false,
            detail: Some(detail.into()),
        }
    }
}

/// Timing and size figures for one submission attempt.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SubmissionStats {
    /// Pages in the assembled PDF (one per attached image).
    pub page_count: usize,
    /// Size of the assembled PDF in bytes.
    pub pdf_bytes: usize,
    pub assemble_duration_ms: u64,
    pub deliver_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// The result of one submission attempt: both channel outcomes plus
/// stats. Produced whenever the attempt got as far as the fan-out —
/// earlier failures (validation, assembly) surface as [`RelayError`]s
/// instead.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReport {
    /// File name the PDF was delivered under.
    pub document_name: String,
    pub sheet: ChannelOutcome,
    pub document: ChannelOutcome,
    pub stats: SubmissionStats,
}

impl SubmissionReport {
    /// Overall success requires both channels to have delivered.
    pub fn succeeded(&self) -> bool {
        self.sheet.delivered && self.document.delivered
    }

    /// Fold a partial or full failure into [`RelayError::DeliveryFailed`].
    pub fn into_result(self) -> Result<SubmissionReport, RelayError> {
        if self.succeeded() {
            Ok(self)
        } else {
            Err(RelayError::DeliveryFailed {
                sheet_delivered: self.sheet.delivered,
                document_delivered: self.document.delivered,
            })
        }
    }
}

/// Dispatcher lifecycle. The terminal states are informational — a
/// finished dispatcher always accepts the next submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmitState {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

//! Spreadsheet channel: best-effort POST of the form row.
//!
//! The ingestion endpoint is called cross-origin by the original
//! deployment, so its response has never been readable. The contract is
//! therefore deliberately thin: the outcome is "did the request complete
//! without a transport error" and nothing more. Status code and body are
//! logged at debug level for operators but never influence the result.

use crate::fields::SheetRow;
use crate::output::ChannelOutcome;
use tracing::{debug, warn};

/// POST the row as JSON. Never retries, never inspects the response.
pub async fn post_row(client: &reqwest::Client, url: &str, row: &SheetRow) -> ChannelOutcome {
    match client.post(url).json(row).send().await {
        Ok(response) => {
            debug!(status = %response.status(), "Spreadsheet row posted");
            ChannelOutcome::ok()
        }
        Err(e) => {
            warn!("Spreadsheet post failed: {e}");
            ChannelOutcome::failed(e.to_string())
        }
    }
}

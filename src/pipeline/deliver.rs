//! Document channel: multipart upload of the assembled PDF.
//!
//! The delivery service takes a Telegram-style `sendDocument` request:
//! a multipart form with the destination `chat_id`, the PDF as the
//! `document` part, and a `caption`. Unlike the spreadsheet channel the
//! response matters — the body is JSON with an `ok` flag, and only
//! `ok: true` counts as delivered. A transport error, a non-JSON body,
//! or `ok: false` all produce a failed outcome (with detail for logs).

use crate::config::DocumentEndpoint;
use crate::output::ChannelOutcome;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, warn};

/// The delivery service's response body.
#[derive(Debug, Deserialize)]
struct DeliveryResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Upload the PDF with its caption to the resolved endpoint.
pub async fn send_document(
    client: &reqwest::Client,
    endpoint: &DocumentEndpoint,
    pdf: Vec<u8>,
    file_name: &str,
    caption: &str,
) -> ChannelOutcome {
    let document = match Part::bytes(pdf)
        .file_name(file_name.to_string())
        .mime_str("application/pdf")
    {
        Ok(part) => part,
        Err(e) => return ChannelOutcome::failed(format!("document part: {e}")),
    };

    let form = Form::new()
        .text("chat_id", endpoint.chat_id.clone())
        .part("document", document)
        .text("caption", caption.to_string());

    let response = match client.post(&endpoint.url).multipart(form).send().await {
        Ok(r) => r,
        Err(e) => {
            warn!("Document upload failed: {e}");
            return ChannelOutcome::failed(e.to_string());
        }
    };

    let status = response.status();
    match response.json::<DeliveryResponse>().await {
        Ok(DeliveryResponse { ok: true, .. }) => {
            debug!(%status, "Document '{file_name}' delivered");
            ChannelOutcome::ok()
        }
        Ok(DeliveryResponse {
            ok: false,
            description,
        }) => {
            let detail = description.unwrap_or_else(|| format!("service returned ok: false ({status})"));
            warn!("Document delivery rejected: {detail}");
            ChannelOutcome::failed(detail)
        }
        Err(e) => {
            warn!("Document delivery response unreadable: {e}");
            ChannelOutcome::failed(format!("unreadable response ({status}): {e}"))
        }
    }
}

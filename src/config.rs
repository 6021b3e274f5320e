//! Configuration for submission relaying.
//!
//! All behaviour is controlled through [`RelayConfig`], built via its
//! [`RelayConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config between the draft store, the assembler and
//! the dispatcher, and to diff two deployments to understand why their
//! submissions land differently.
//!
//! # Design choice: deployment values are not constants
//! The spreadsheet URL, the bot credential and the destination room are
//! the only things that differ between deployments of this tool, so they
//! live here (with `FORMRELAY_*` environment fallbacks) rather than in
//! the source. [`RelayConfig::resolve_sheet_url`] and
//! [`RelayConfig::resolve_document_endpoint`] walk the fallback chain
//! from most specific (explicit config) to least specific (environment)
//! and fail with an actionable hint when nothing is set.

use crate::error::RelayError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Environment variable holding the spreadsheet-ingestion URL.
pub const ENV_SHEET_URL: &str = "FORMRELAY_SHEET_URL";
/// Environment variable holding a full document-delivery URL override.
pub const ENV_DOCUMENT_URL: &str = "FORMRELAY_DOCUMENT_URL";
/// Environment variable holding the messaging bot credential.
pub const ENV_BOT_TOKEN: &str = "FORMRELAY_BOT_TOKEN";
/// Environment variable holding the destination chat/room identifier.
pub const ENV_CHAT_ID: &str = "FORMRELAY_CHAT_ID";
/// Environment variable holding the caption prefix.
pub const ENV_CAPTION_PREFIX: &str = "FORMRELAY_CAPTION_PREFIX";

/// Page geometry used by the PDF assembler.
///
/// Dimensions are PDF points. The defaults reproduce the layout the tool
/// has always shipped with: a 600 × 800 page with a 20 pt margin on all
/// sides, images scaled down (never up) into the content box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: 600.0,
            height: 800.0,
            margin: 20.0,
        }
    }
}

impl PageLayout {
    /// The drawable area after margins: `(width − 2·margin, height − 2·margin)`.
    pub fn content_box(&self) -> (f32, f32) {
        (
            self.width - 2.0 * self.margin,
            self.height - 2.0 * self.margin,
        )
    }
}

/// Configuration for a submission relay.
///
/// Built via [`RelayConfig::builder()`] or [`RelayConfig::default()`].
///
/// # Example
/// ```rust
/// use formrelay::RelayConfig;
///
/// let config = RelayConfig::builder()
///     .sheet_url("https://example.com/ingest")
///     .bot_token("123:abc")
///     .chat_id("-1000")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RelayConfig {
    /// Spreadsheet-ingestion endpoint. Falls back to [`ENV_SHEET_URL`].
    pub sheet_url: Option<String>,

    /// Full document-delivery URL. Takes precedence over `bot_token`;
    /// falls back to [`ENV_DOCUMENT_URL`].
    pub document_url: Option<String>,

    /// Messaging bot credential. When no `document_url` is given, the
    /// delivery URL is `https://api.telegram.org/bot<token>/sendDocument`.
    /// Falls back to [`ENV_BOT_TOKEN`]. Redacted from `Debug` output.
    pub bot_token: Option<String>,

    /// Destination chat/room identifier. Falls back to [`ENV_CHAT_ID`].
    pub chat_id: Option<String>,

    /// Prefix prepended to the document caption (the caption body is the
    /// client field). Falls back to [`ENV_CAPTION_PREFIX`], else empty.
    pub caption_prefix: Option<String>,

    /// Page geometry for the assembled PDF. Default: 600 × 800 pt, 20 pt margin.
    pub page: PageLayout,

    /// Longest edge of generated preview thumbnails, in pixels. Default: 256.
    ///
    /// Previews exist so a host UI can render the attachment list without
    /// holding full-resolution decodes; 256 px keeps each preview under a
    /// few tens of kilobytes even for phone-camera photos.
    pub thumbnail_px: u32,

    /// Per-request HTTP timeout in seconds. Default: 60.
    ///
    /// There is no retry anywhere in the submission path, so this timeout
    /// is the only bound on a hung service.
    pub request_timeout_secs: u64,

    /// Draft slot location. Default: `<platform data dir>/formrelay/draft.json`.
    pub draft_path: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sheet_url: None,
            document_url: None,
            bot_token: None,
            chat_id: None,
            caption_prefix: None,
            page: PageLayout::default(),
            thumbnail_px: 256,
            request_timeout_secs: 60,
            draft_path: None,
        }
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("sheet_url", &self.sheet_url)
            .field("document_url", &self.document_url)
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("caption_prefix", &self.caption_prefix)
            .field("page", &self.page)
            .field("thumbnail_px", &self.thumbnail_px)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("draft_path", &self.draft_path)
            .finish()
    }
}

impl RelayConfig {
    /// Create a new builder for `RelayConfig`.
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the spreadsheet endpoint: explicit config, then environment.
    pub fn resolve_sheet_url(&self) -> Result<String, RelayError> {
        if let Some(ref url) = self.sheet_url {
            return Ok(url.clone());
        }
        if let Ok(url) = std::env::var(ENV_SHEET_URL) {
            if !url.is_empty() {
                return Ok(url);
            }
        }
        Err(RelayError::MissingEndpoint {
            channel: "spreadsheet".into(),
            hint: format!("Set {ENV_SHEET_URL} or call RelayConfigBuilder::sheet_url."),
        })
    }

    /// Resolve the document-delivery endpoint: explicit URL, then
    /// environment URL, then a URL built from the bot credential. The
    /// chat id resolves the same way (config, then environment).
    pub fn resolve_document_endpoint(&self) -> Result<DocumentEndpoint, RelayError> {
        let url = if let Some(ref url) = self.document_url {
            url.clone()
        } else if let Ok(url) = std::env::var(ENV_DOCUMENT_URL) {
            if url.is_empty() {
                return Err(missing_document_endpoint());
            }
            url
        } else {
            let token = self
                .bot_token
                .clone()
                .or_else(|| std::env::var(ENV_BOT_TOKEN).ok().filter(|t| !t.is_empty()))
                .ok_or_else(missing_document_endpoint)?;
            format!("https://api.telegram.org/bot{token}/sendDocument")
        };

        let chat_id = self
            .chat_id
            .clone()
            .or_else(|| std::env::var(ENV_CHAT_ID).ok().filter(|c| !c.is_empty()))
            .ok_or_else(|| RelayError::MissingEndpoint {
                channel: "document".into(),
                hint: format!("Set {ENV_CHAT_ID} or call RelayConfigBuilder::chat_id."),
            })?;

        Ok(DocumentEndpoint { url, chat_id })
    }

    /// The caption for a submission: configured prefix (or environment
    /// prefix, or nothing) followed by the client name.
    pub fn caption_for(&self, client: &str) -> String {
        let prefix = self
            .caption_prefix
            .clone()
            .or_else(|| std::env::var(ENV_CAPTION_PREFIX).ok())
            .unwrap_or_default();
        format!("{prefix}{client}")
    }
}

fn missing_document_endpoint() -> RelayError {
    RelayError::MissingEndpoint {
        channel: "document".into(),
        hint: format!(
            "Set {ENV_DOCUMENT_URL} for a full URL, or {ENV_BOT_TOKEN} for the default delivery service."
        ),
    }
}

/// A fully resolved document-delivery destination.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEndpoint {
    pub url: String,
    pub chat_id: String,
}

/// Builder for [`RelayConfig`].
#[derive(Debug)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    pub fn sheet_url(mut self, url: impl Into<String>) -> Self {
        self.config.sheet_url = Some(url.into());
        self
    }

    pub fn document_url(mut self, url: impl Into<String>) -> Self {
        self.config.document_url = Some(url.into());
        self
    }

    pub fn bot_token(mut self, token: impl Into<String>) -> Self {
        self.config.bot_token = Some(token.into());
        self
    }

    pub fn chat_id(mut self, id: impl Into<String>) -> Self {
        self.config.chat_id = Some(id.into());
        self
    }

    pub fn caption_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.caption_prefix = Some(prefix.into());
        self
    }

    pub fn page_size(mut self, width: f32, height: f32) -> Self {
        self.config.page.width = width;
        self.config.page.height = height;
        self
    }

    pub fn margin(mut self, margin: f32) -> Self {
        self.config.page.margin = margin.max(0.0);
        self
    }

    pub fn thumbnail_px(mut self, px: u32) -> Self {
        self.config.thumbnail_px = px.max(16);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn draft_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.draft_path = Some(path.into());
        self
    }

    /// Build the configuration, validating geometric constraints.
    pub fn build(self) -> Result<RelayConfig, RelayError> {
        let c = &self.config;
        if c.page.width <= 0.0 || c.page.height <= 0.0 {
            return Err(RelayError::InvalidConfig(format!(
                "Page size must be positive, got {} × {}",
                c.page.width, c.page.height
            )));
        }
        let (content_w, content_h) = c.page.content_box();
        if content_w <= 0.0 || content_h <= 0.0 {
            return Err(RelayError::InvalidConfig(format!(
                "Margin {} leaves no drawable area on a {} × {} page",
                c.page.margin, c.page.width, c.page.height
            )));
        }
        Ok(self.config)
    }
}

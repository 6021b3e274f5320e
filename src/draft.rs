//! Single-slot draft persistence.
//!
//! A draft is a snapshot of the six form fields plus the moment it was
//! saved. There is exactly one slot: every save overwrites the previous
//! one, and [`DraftStore::load`] returns the most recent snapshot on
//! demand (nothing is loaded automatically at startup).
//!
//! Writes go through a temp file in the target directory followed by a
//! rename, so a crash mid-save leaves either the old draft or the new
//! one, never a torn file.

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::fields::FormFields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A persisted draft: the field values and when they were saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub fields: FormFields,
    pub saved_at: DateTime<Utc>,
}

/// The single draft slot on disk.
#[derive(Debug, Clone)]
pub struct DraftStore {
    path: PathBuf,
}

impl DraftStore {
    /// Resolve the slot location from the config, defaulting to
    /// `<platform data dir>/formrelay/draft.json`.
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        if let Some(ref path) = config.draft_path {
            return Ok(Self::at(path));
        }
        let dir = dirs::data_dir().ok_or_else(|| {
            RelayError::InvalidConfig(
                "No platform data directory available; set an explicit draft path".to_string(),
            )
        })?;
        Ok(Self::at(dir.join("formrelay").join("draft.json")))
    }

    /// A store at an explicit location.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the slot lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot the fields with the current time, overwriting any
    /// previous draft.
    pub fn save(&self, fields: &FormFields) -> Result<DraftSnapshot, RelayError> {
        let snapshot = DraftSnapshot {
            fields: fields.clone(),
            saved_at: Utc::now(),
        };

        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| RelayError::DraftStoreFailed {
            path: self.path.clone(),
            source: e,
        })?;

        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| RelayError::Internal(format!("Draft serialization failed: {e}")))?;

        // Temp file in the same directory so the rename stays on one
        // filesystem and is atomic.
        let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| {
            RelayError::DraftStoreFailed {
                path: self.path.clone(),
                source: e,
            }
        })?;
        std::fs::write(tmp.path(), &json).map_err(|e| RelayError::DraftStoreFailed {
            path: self.path.clone(),
            source: e,
        })?;
        tmp.persist(&self.path)
            .map_err(|e| RelayError::DraftStoreFailed {
                path: self.path.clone(),
                source: e.error,
            })?;

        info!("Draft saved to {}", self.path.display());
        Ok(snapshot)
    }

    /// Read the most recent snapshot, or `None` when nothing has been
    /// saved yet.
    pub fn load(&self) -> Result<Option<DraftSnapshot>, RelayError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RelayError::DraftStoreFailed {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let snapshot: DraftSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| RelayError::DraftCorrupt {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;

        debug!(
            "Loaded draft saved at {}",
            snapshot.saved_at.to_rfc3339()
        );
        Ok(Some(snapshot))
    }
}

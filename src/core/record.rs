//! Deploy records written beside a working tree after a successful sync.
//!
//! The record is the only persisted evidence of what a working tree holds. It is
//! stored as pretty-printed JSON at [`RECORD_FILE`] under the tree root so that
//! diffs stay readable.
//!
//! Reading never fails: a missing file is [`RecordRead::Absent`], anything that
//! cannot be read or parsed is [`RecordRead::Malformed`]. Status classification
//! treats both as "no trustworthy record".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::core::error::Result;

/// Record location relative to the working tree root.
pub const RECORD_FILE: &str = ".mirrorsync-deploy.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRecord {
    pub module_name: String,
    pub signature: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of reading a record from disk.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordRead {
    Valid(DeployRecord),
    Malformed(String),
    Absent,
}

impl RecordRead {
    pub fn valid(self) -> Option<DeployRecord> {
        match self {
            RecordRead::Valid(record) => Some(record),
            _ => None,
        }
    }
}

pub fn record_path(work_tree: &Path) -> PathBuf {
    work_tree.join(RECORD_FILE)
}

impl DeployRecord {
    pub fn read(work_tree: &Path) -> RecordRead {
        let path = record_path(work_tree);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return RecordRead::Absent,
            Err(e) => return RecordRead::Malformed(e.to_string()),
        };

        match serde_json::from_str(&content) {
            Ok(record) => RecordRead::Valid(record),
            Err(e) => {
                log::debug!("Ignoring malformed deploy record {}: {e}", path.display());
                RecordRead::Malformed(e.to_string())
            }
        }
    }

    pub fn write(&self, work_tree: &Path) -> Result<()> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        std::fs::write(record_path(work_tree), content)?;
        Ok(())
    }
}

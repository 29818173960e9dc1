use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::state_machine::AccessEvent;
use crate::error::{error_codes, VaultError, VaultResult};
use crate::storage::{self, FileMode};

/// Format of `time` in log entries, in local time
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub user: String,
    pub time: String,
}

impl From<&AccessEvent> for AccessLogEntry {
    fn from(event: &AccessEvent) -> Self {
        Self {
            user: event.identity.clone(),
            time: event
                .timestamp
                .with_timezone(&Local)
                .format(LOG_TIME_FORMAT)
                .to_string(),
        }
    }
}

/// Persisted list of unlocks
#[derive(Debug, Clone)]
pub struct AccessLog {
    path: PathBuf,
}

impl AccessLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first; a missing file is an empty log
    pub fn entries(&self) -> VaultResult<Vec<AccessLogEntry>> {
        storage::read_json::<Vec<AccessLogEntry>>(&self.path)
            .map(Option::unwrap_or_default)
            .map_err(|e| match e {
                VaultError::SerializationError(cause) => VaultError::PersistenceError {
                    path: self.path.display().to_string(),
                    cause,
                    error_code: error_codes::ACCESS_LOG_CORRUPT,
                },
                other => other,
            })
    }

    pub fn append(&self, event: &AccessEvent) -> VaultResult<()> {
        let mut entries = self.entries()?;
        entries.push(AccessLogEntry::from(event));
        storage::write_json_atomic(&self.path, &entries, FileMode::Default)
    }

    /// Truncate to an empty list
    pub fn clear(&self) -> VaultResult<()> {
        storage::write_json_atomic(&self.path, &Vec::<AccessLogEntry>::new(), FileMode::Default)?;
        log::info!("Access log cleared");
        Ok(())
    }
}

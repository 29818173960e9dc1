//! Atomic file persistence
//!
//! Every record is written to `<path>.tmp`, flushed, and renamed over the
//! final path, so a crash mid-write never leaves a truncated file at the
//! final path. Concurrent writers to the same path are not coordinated here.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroize;

use crate::error::{error_codes, VaultError, VaultResult};
use crate::secure_memory::SecureBytes;

/// Permission class for a persisted file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Process umask applies
    Default,
    /// Read/write for the owner only (0600 on Unix)
    OwnerOnly,
}

/// Temporary sibling used while writing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Write `bytes` to `path` through a temp file and rename
pub fn write_atomic(path: &Path, bytes: &[u8], mode: FileMode) -> VaultResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            VaultError::persistence_error(parent, &e.to_string(), error_codes::PERSIST_WRITE_FAILED)
        })?;
    }

    let tmp = temp_path(path);
    if let Err(e) = write_temp(&tmp, bytes, mode) {
        discard(&tmp);
        return Err(VaultError::persistence_error(
            &tmp,
            &e.to_string(),
            error_codes::PERSIST_WRITE_FAILED,
        ));
    }

    if let Err(e) = fs::rename(&tmp, path) {
        discard(&tmp);
        return Err(VaultError::persistence_error(
            path,
            &e.to_string(),
            error_codes::PERSIST_RENAME_FAILED,
        ));
    }

    log::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn write_temp(tmp: &Path, bytes: &[u8], mode: FileMode) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    if mode == FileMode::OwnerOnly {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(tmp)?;

    // A stale temp file keeps its old mode; tighten it explicitly
    #[cfg(unix)]
    if mode == FileMode::OwnerOnly {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        if e.kind() != ErrorKind::NotFound {
            log::warn!("Failed to remove temp file {}: {}", tmp.display(), e);
        }
    }
}

/// Pretty JSON held in a buffer that is zeroed on drop
///
/// Records such as private keys pass through here, so the serialized text
/// must not outlive the write.
pub fn to_json_secure<T: Serialize>(value: &T) -> VaultResult<SecureBytes> {
    let mut buffer = Vec::with_capacity(4096);
    if let Err(e) = serde_json::to_writer_pretty(&mut buffer, value) {
        buffer.zeroize();
        return Err(e.into());
    }
    Ok(SecureBytes::from(buffer))
}

/// Serialize `value` as pretty JSON and write it atomically
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, mode: FileMode) -> VaultResult<()> {
    let json = to_json_secure(value)?;
    write_atomic(path, json.as_bytes(), mode)
}

/// Read a file, returning `None` if it does not exist
pub fn read_optional(path: &Path) -> VaultResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(VaultError::persistence_error(
            path,
            &e.to_string(),
            error_codes::PERSIST_READ_FAILED,
        )),
    }
}

/// Read and parse a JSON file, returning `None` if it does not exist
pub fn read_json<T: DeserializeOwned>(path: &Path) -> VaultResult<Option<T>> {
    match read_optional(path)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Remove `path`; returns whether a file was removed
pub fn remove_if_exists(path: &Path) -> VaultResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(VaultError::persistence_error(
            path,
            &e.to_string(),
            error_codes::PERSIST_REMOVE_FAILED,
        )),
    }
}

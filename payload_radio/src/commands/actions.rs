use std::fs;
use std::path::Path;

use tracing::info;

use crate::errors::{RadioError, Result};
use crate::uplink::backup_path;

/// Restores a destination file from its pre-upload backup. The backup is
/// consumed by the rename, so a transfer can be undone exactly once; with no
/// backup on disk nothing is touched.
pub fn undo_upload(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    if !backup.exists() {
        return Err(RadioError::NoBackup(path.to_path_buf()));
    }
    if path.exists() {
        fs::remove_file(path)?;
    }
    fs::rename(&backup, path)?;
    info!(path = %path.display(), "upload reverted from backup");
    Ok(())
}

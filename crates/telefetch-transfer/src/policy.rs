// SPDX-FileCopyrightText: 2026 Telefetch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Moving a downloaded file into place under a duplication policy.
//!
//! Everything here is blocking file system work; callers run it on the
//! blocking pool.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use telefetch_core::{DuplicationPolicy, TelefetchError};

use crate::digest;

/// What happened to the source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Destination taken and the policy said leave it; the source is untouched.
    Skipped,
    /// The source now lives at this path.
    Moved(PathBuf),
    /// Destination already had identical content; the source was deleted.
    Deduplicated(PathBuf),
}

impl TransferOutcome {
    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Moved(_) => "moved",
            Self::Deduplicated(_) => "deduplicated",
        }
    }
}

/// Move `source` to `target`, resolving a collision with `policy`.
pub fn transfer_file(
    source: &Path,
    target: &Path,
    policy: DuplicationPolicy,
) -> Result<TransferOutcome, TelefetchError> {
    if !source.is_file() {
        return Err(TelefetchError::io(
            source,
            io::Error::new(io::ErrorKind::NotFound, "source file is missing"),
        ));
    }
    if source == target {
        debug!(path = %source.display(), "file already at its destination");
        return Ok(TransferOutcome::Moved(target.to_path_buf()));
    }
    if !target.exists() {
        move_file(source, target)?;
        return Ok(TransferOutcome::Moved(target.to_path_buf()));
    }

    match policy {
        DuplicationPolicy::Skip => {
            info!(target = %target.display(), "destination exists, transfer skipped");
            Ok(TransferOutcome::Skipped)
        }
        DuplicationPolicy::Overwrite => {
            move_file(source, target)?;
            Ok(TransferOutcome::Moved(target.to_path_buf()))
        }
        DuplicationPolicy::Rename => move_renamed(source, target),
        DuplicationPolicy::Hash => {
            if digest::same_content(source, target)? {
                fs::remove_file(source).map_err(|e| TelefetchError::io(source, e))?;
                info!(
                    source = %source.display(),
                    target = %target.display(),
                    "identical file already present, source removed"
                );
                Ok(TransferOutcome::Deduplicated(target.to_path_buf()))
            } else {
                move_renamed(source, target)
            }
        }
    }
}

fn move_renamed(source: &Path, target: &Path) -> Result<TransferOutcome, TelefetchError> {
    let renamed = unique_path(target)?;
    move_file(source, &renamed)?;
    Ok(TransferOutcome::Moved(renamed))
}

/// First `stem-N.ext` next to `target` that does not exist, N from 1.
pub fn unique_path(target: &Path) -> Result<PathBuf, TelefetchError> {
    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target.extension().map(|e| e.to_string_lossy().into_owned());

    (1..=u32::MAX)
        .map(|n| match &extension {
            Some(ext) => parent.join(format!("{stem}-{n}.{ext}")),
            None => parent.join(format!("{stem}-{n}")),
        })
        .find(|candidate| !candidate.exists())
        .ok_or_else(|| {
            TelefetchError::Internal(format!("no free name next to {}", target.display()))
        })
}

/// Rename into place, creating parent directories. Falls back to copy and
/// delete when the rename crosses file systems.
fn move_file(source: &Path, target: &Path) -> Result<(), TelefetchError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| TelefetchError::io(parent, e))?;
    }

    if let Err(rename_err) = fs::rename(source, target) {
        debug!(error = %rename_err, "rename failed, copying instead");
        fs::copy(source, target).map_err(|_| TelefetchError::io(target, rename_err))?;
        fs::remove_file(source).map_err(|e| TelefetchError::io(source, e))?;
    }
    debug!(source = %source.display(), target = %target.display(), "file moved");
    Ok(())
}

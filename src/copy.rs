//! Duplicate-aware file copying
//!
//! For each file: hash, look the fingerprint up in the action log, resolve
//! name clashes at the target, then copy (or pretend to, in dry-run mode)
//! and record the decision. The hash is always computed before any
//! comparison or write, which keeps at most one `copy` entry per fingerprint
//! as long as files are processed one at a time.

use crate::action_log::{ActionKind, ActionLog};
use crate::error::{Error, Result};
use crate::hash::{Fingerprint, digest_file};
use std::ffi::OsStr;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Buffer size for file copies
const COPY_BUFFER_SIZE: usize = 256 * 1024;

/// Result of a single safe copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    /// What was decided, identical to the logged action
    pub action: ActionKind,
    /// The target path recorded in the log
    pub target: PathBuf,
    pub fingerprint: Fingerprint,
}

/// Copies files into the destination tree, consulting and appending to the
/// action log
pub struct SafeCopier<'a> {
    log: &'a ActionLog,
    dry_run: bool,
}

impl<'a> SafeCopier<'a> {
    pub fn new(log: &'a ActionLog, dry_run: bool) -> Self {
        Self { log, dry_run }
    }

    /// Copy `src` to `dest_dir/file_name`, unless its content was seen before.
    ///
    /// Duplicates and name clashes are outcomes, not errors. Errors are
    /// returned only for directory creation, copy and log failures.
    pub fn copy(
        &self,
        src: &Path,
        dest_dir: &Path,
        file_name: impl AsRef<OsStr>,
    ) -> Result<CopyOutcome> {
        if !self.dry_run {
            fs::create_dir_all(dest_dir).map_err(|e| Error::CreateDir {
                path: dest_dir.to_path_buf(),
                source: e,
            })?;
        }

        let target = dest_dir.join(file_name.as_ref());
        let fingerprint = digest_file(src);

        if self.log.exists_by_fingerprint(&fingerprint)? {
            warn!(file = %src.display(), "Duplicate file already imported (by checksum)");
            return self.finish(ActionKind::DuplicateSeen, src, target, fingerprint);
        }

        let mut final_target = target;
        if final_target.exists() {
            let existing = digest_file(&final_target);
            if fingerprint.matches(&existing) {
                warn!(target = %final_target.display(), "Duplicate at destination");
                return self.finish(ActionKind::DuplicateRef, src, final_target, fingerprint);
            }

            final_target = disambiguate(&final_target, &fingerprint)?;
            warn!(target = %final_target.display(), "Name clash, copying under a new name");
        }

        if self.dry_run {
            info!(src = %src.display(), dst = %final_target.display(), "[DRY-RUN] copy");
            return self.finish(ActionKind::DryRun, src, final_target, fingerprint);
        }

        copy_preserving_metadata(src, &final_target)?;
        info!(src = %src.display(), dst = %final_target.display(), "Copied");
        self.finish(ActionKind::Copy, src, final_target, fingerprint)
    }

    fn finish(
        &self,
        action: ActionKind,
        src: &Path,
        target: PathBuf,
        fingerprint: Fingerprint,
    ) -> Result<CopyOutcome> {
        self.log.record(action, src, &target, &fingerprint)?;
        Ok(CopyOutcome {
            action,
            target,
            fingerprint,
        })
    }
}

/// Pick a free name for a clashing target: `<stem>_<hash8>`, then keep
/// appending `_1` until nothing exists at the path.
fn disambiguate(target: &Path, fingerprint: &Fingerprint) -> Result<PathBuf> {
    let mut candidate = append_to_stem(target, &format!("_{}", fingerprint.short()))?;
    while candidate.exists() {
        candidate = append_to_stem(&candidate, "_1")?;
    }
    Ok(candidate)
}

fn append_to_stem(path: &Path, suffix: &str) -> Result<PathBuf> {
    let stem = path.file_stem().ok_or_else(|| Error::InvalidFileName {
        path: path.to_path_buf(),
    })?;

    let mut name = stem.to_os_string();
    name.push(suffix);
    if let Some(extension) = path.extension() {
        name.push(".");
        name.push(extension);
    }

    Ok(path.with_file_name(name))
}

/// Copy file bytes, then carry over permissions and access/modification times
fn copy_preserving_metadata(src: &Path, dest: &Path) -> Result<()> {
    let copy_err = |e: std::io::Error| Error::Copy {
        src: src.to_path_buf(),
        dst: dest.to_path_buf(),
        source: e,
    };

    let src_file = File::open(src).map_err(copy_err)?;
    let metadata = src_file.metadata().map_err(copy_err)?;
    // Never clobber a file that appeared after the existence check
    let dest_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(copy_err)?;

    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, src_file);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, dest_file);

    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    loop {
        let bytes_read = reader.read(&mut buffer).map_err(copy_err)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read]).map_err(copy_err)?;
    }
    writer.flush().map_err(copy_err)?;
    drop(writer);

    fs::set_permissions(dest, metadata.permissions()).map_err(copy_err)?;

    let atime = filetime::FileTime::from_last_access_time(&metadata);
    let mtime = filetime::FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(dest, atime, mtime).map_err(copy_err)?;

    Ok(())
}

//! Backup-and-replace patching of the link key in a BlueZ `info` file.
//!
//! The target is renamed to a sibling backup, the backup is parsed and edited,
//! and the result is written to a fresh file at the original path. The backup
//! is deleted only once the new file is on disk. Any failure after the rename
//! removes the partial file and renames the backup back, so the target path
//! always ends up holding either the new content or the untouched original.
//!
//! Atomicity rests on `rename` within one directory. On filesystems where that
//! is not atomic the guarantee is best effort.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::ini::{self, IniDocument, IniError};
use crate::scanner::LinkKey;

/// Section holding the pairing secret.
pub const LINK_KEY_SECTION: &str = "LinkKey";
/// Field inside [`LINK_KEY_SECTION`] holding the hex key.
pub const LINK_KEY_FIELD: &str = "Key";

const BACKUP_EXTENSION: &str = "bak";

/// Errors raised by [`patch_link_key`].
#[derive(Debug, Error)]
pub enum PatchError {
    /// Nothing to patch; no file was touched.
    #[error("target bluetooth config file not found: {}", .0.display())]
    TargetNotFound(PathBuf),
    /// A stale backup is in the way; no file was touched.
    #[error("backup file already exists: {}", .0.display())]
    BackupExists(PathBuf),
    /// Moving the target aside failed; no file was touched.
    #[error("failed to create backup {}: {source}", .backup.display())]
    Backup {
        backup: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Parsing or writing failed and the original file was restored.
    #[error("failed to patch {}, original restored: {source}", .path.display())]
    Mutation {
        path: PathBuf,
        #[source]
        source: IniError,
    },
    /// Parsing or writing failed and the backup could not be moved back.
    #[error(
        "failed to patch {}: {source}; restoring backup {} also failed: {rollback}",
        .path.display(),
        .backup.display()
    )]
    RollbackFailed {
        path: PathBuf,
        backup: PathBuf,
        source: IniError,
        rollback: io::Error,
    },
    /// The new file is in place but the backup could not be deleted.
    #[error("patched {} but failed to delete backup {}: {source}", .path.display(), .backup.display())]
    Cleanup {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a successful patch changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSummary {
    /// Key value before the patch, if the field was present with a value.
    pub previous_key: Option<String>,
    /// Backup location used while the patch was in flight.
    pub backup: PathBuf,
}

/// Sibling backup location for `target`: its extension replaced by `bak`, or
/// `.bak` appended when that would name the target itself.
pub fn backup_path(target: &Path) -> PathBuf {
    let replaced = target.with_extension(BACKUP_EXTENSION);
    if replaced != target {
        return replaced;
    }
    let mut name = target.as_os_str().to_os_string();
    name.push(".");
    name.push(BACKUP_EXTENSION);
    PathBuf::from(name)
}

/// Replace `LinkKey.Key` in the file at `target` with `key`.
pub fn patch_link_key(target: &Path, key: &LinkKey) -> Result<PatchSummary, PatchError> {
    patch_with(target, key, ini::write_file)
}

fn patch_with<W>(target: &Path, key: &LinkKey, write: W) -> Result<PatchSummary, PatchError>
where
    W: FnOnce(&IniDocument, &Path, &fs::Permissions) -> Result<(), IniError>,
{
    if !target.is_file() {
        return Err(PatchError::TargetNotFound(target.to_path_buf()));
    }
    let backup = backup_path(target);
    if backup.exists() {
        return Err(PatchError::BackupExists(backup));
    }

    debug!(path = %target.display(), backup = %backup.display(), "moving config to backup");
    fs::rename(target, &backup).map_err(|source| PatchError::Backup {
        backup: backup.clone(),
        source,
    })?;

    // From here on the target path must be recreated before returning.
    match rewrite(&backup, target, key, write) {
        Ok(previous_key) => {
            debug!(backup = %backup.display(), "deleting backup");
            fs::remove_file(&backup).map_err(|source| PatchError::Cleanup {
                path: target.to_path_buf(),
                backup: backup.clone(),
                source,
            })?;
            Ok(PatchSummary {
                previous_key,
                backup,
            })
        }
        Err(source) => {
            warn!(error = %source, "patch failed, restoring backup");
            match restore(&backup, target) {
                Ok(()) => Err(PatchError::Mutation {
                    path: target.to_path_buf(),
                    source,
                }),
                Err(rollback) => Err(PatchError::RollbackFailed {
                    path: target.to_path_buf(),
                    backup,
                    source,
                    rollback,
                }),
            }
        }
    }
}

fn rewrite<W>(
    backup: &Path,
    target: &Path,
    key: &LinkKey,
    write: W,
) -> Result<Option<String>, IniError>
where
    W: FnOnce(&IniDocument, &Path, &fs::Permissions) -> Result<(), IniError>,
{
    let mut doc = ini::parse_file(backup)?;
    let previous_key = doc
        .get(LINK_KEY_SECTION, LINK_KEY_FIELD)
        .flatten()
        .map(str::to_string);
    doc.set(LINK_KEY_SECTION, LINK_KEY_FIELD, key.as_str())?;

    let permissions = fs::metadata(backup)?.permissions();
    debug!(path = %target.display(), "writing patched config");
    write(&doc, target, &permissions)?;
    // Creation mode is narrowed by the umask; restore the exact bits.
    fs::set_permissions(target, permissions)?;
    Ok(previous_key)
}

fn restore(backup: &Path, target: &Path) -> io::Result<()> {
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    fs::rename(backup, target)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    const INFO: &str = "[General]\nName=Keyboard\nTrusted=true\nBlocked\n\n[LinkKey]\nKey=00000000000000000000000000000000\nType=4\nPINLength=0\n";

    fn key() -> LinkKey {
        LinkKey::from_hex_value("01,02,03,04").expect("key")
    }

    fn setup(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("info");
        fs::write(&path, contents).expect("write info");
        (dir, path)
    }

    #[test]
    fn backup_path_replaces_or_appends_extension() {
        assert_eq!(
            backup_path(Path::new("/var/lib/bluetooth/A/B/info")),
            PathBuf::from("/var/lib/bluetooth/A/B/info.bak")
        );
        assert_eq!(
            backup_path(Path::new("dir/info.conf")),
            PathBuf::from("dir/info.bak")
        );
        assert_eq!(
            backup_path(Path::new("dir/info.bak")),
            PathBuf::from("dir/info.bak.bak")
        );
    }

    #[test]
    fn failed_write_restores_original_and_removes_backup() {
        let (_dir, path) = setup(INFO);

        let err = patch_with(&path, &key(), |_, _, _| {
            Err(IniError::Io(io::Error::new(ErrorKind::Other, "disk full")))
        })
        .expect_err("write should fail");

        assert!(matches!(err, PatchError::Mutation { .. }));
        assert_eq!(fs::read_to_string(&path).expect("read"), INFO);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn half_written_file_is_discarded_on_failure() {
        let (_dir, path) = setup(INFO);

        let err = patch_with(&path, &key(), |_, target, _| {
            let mut file = fs::File::create(target)?;
            file.write_all(b"[Gene")?;
            Err(IniError::Io(io::Error::new(ErrorKind::Other, "power loss")))
        })
        .expect_err("write should fail");

        assert!(matches!(err, PatchError::Mutation { .. }));
        assert_eq!(fs::read_to_string(&path).expect("read"), INFO);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn lost_backup_reports_both_errors() {
        let (_dir, path) = setup(INFO);
        let backup = backup_path(&path);

        let err = patch_with(&path, &key(), |_, _, _| {
            fs::remove_file(&backup)?;
            Err(IniError::Io(io::Error::new(ErrorKind::Other, "disk full")))
        })
        .expect_err("write should fail");

        let message = err.to_string();
        match err {
            PatchError::RollbackFailed {
                source, rollback, ..
            } => {
                assert!(matches!(source, IniError::Io(_)));
                assert_eq!(rollback.kind(), ErrorKind::NotFound);
            }
            other => panic!("expected RollbackFailed, got {other:?}"),
        }
        assert!(message.contains("disk full"), "{message}");
        assert!(message.contains("restoring backup"), "{message}");
        assert!(message.contains(&backup.display().to_string()), "{message}");
    }

    #[cfg(unix)]
    #[test]
    fn new_file_is_created_with_original_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, path) = setup(INFO);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).expect("chmod");

        let mut created_mode = None;
        patch_with(&path, &key(), |doc, target, permissions| {
            ini::write_file(doc, target, permissions)?;
            created_mode = Some(fs::metadata(target)?.permissions().mode());
            Ok(())
        })
        .expect("patch");

        let mode = created_mode.expect("writer ran");
        assert_eq!(mode & 0o077, 0, "mode {mode:o} exposed the key before chmod");
    }

    #[test]
    fn missing_link_key_section_rolls_back() {
        let original = "[General]\nName=Mouse\n";
        let (_dir, path) = setup(original);

        let err = patch_link_key(&path, &key()).expect_err("no LinkKey section");
        assert!(matches!(
            err,
            PatchError::Mutation {
                source: IniError::MissingSection(_),
                ..
            }
        ));
        assert_eq!(fs::read_to_string(&path).expect("read"), original);
        assert!(!backup_path(&path).exists());
    }

    #[test]
    fn existing_backup_blocks_patch_without_touching_files() {
        let (_dir, path) = setup(INFO);
        let backup = backup_path(&path);
        fs::write(&backup, "keep me").expect("write backup");

        let err = patch_link_key(&path, &key()).expect_err("backup in the way");
        assert!(matches!(err, PatchError::BackupExists(_)));
        assert_eq!(fs::read_to_string(&path).expect("read"), INFO);
        assert_eq!(fs::read_to_string(&backup).expect("read"), "keep me");
    }

    #[test]
    fn reports_previous_key() {
        let (_dir, path) = setup(INFO);
        let summary = patch_link_key(&path, &key()).expect("patch");
        assert_eq!(
            summary.previous_key.as_deref(),
            Some("00000000000000000000000000000000")
        );
        assert_eq!(summary.backup, backup_path(&path));
    }

    #[cfg(unix)]
    #[test]
    fn keeps_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, path) = setup(INFO);
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).expect("chmod");

        patch_link_key(&path, &key()).expect("patch");
        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

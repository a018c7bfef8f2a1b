use std::fs::{File, Permissions};
use std::io::Write;
use std::path::Path;

use crate::ini::{IniDocument, IniError};

/// Serialize a document back into text.
pub fn write(doc: &IniDocument) -> String {
    doc.to_string()
}

/// Write a document to a newly created file at `path` and flush it to disk.
///
/// On unix the file is created with the mode bits of `permissions` (still
/// masked by the umask), so it is never more permissive than requested.
/// Fails if `path` already exists.
pub fn write_file(
    doc: &IniDocument,
    path: &Path,
    permissions: &Permissions,
) -> Result<(), IniError> {
    let mut options = File::options();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(permissions.mode());
    }
    #[cfg(not(unix))]
    let _ = permissions;

    let mut file = options.open(path)?;
    file.write_all(write(doc).as_bytes())?;
    file.sync_all()?;
    Ok(())
}

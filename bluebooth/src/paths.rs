use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use bluebooth_core::MacAddress;

use crate::APP_ID;

/// Default BlueZ storage directory.
pub const DEFAULT_STORAGE_ROOT: &str = "/var/lib/bluetooth";

/// Per-device file holding the `[LinkKey]` section.
pub const INFO_FILE: &str = "info";

/// `<root>/<HOST>/<TARGET>/info`, both addresses in uppercase colon form.
pub fn standard_config_path(root: &Path, host: &MacAddress, target: &MacAddress) -> PathBuf {
    root.join(host.to_string())
        .join(target.to_string())
        .join(INFO_FILE)
}

/// Root is only needed when patching the file under the storage root.
pub fn needs_privilege(explicit_config: bool, read_only: bool) -> bool {
    !explicit_config && !read_only
}

/// Fail unless `euid` is 0.
pub fn check_privilege(euid: u32) -> Result<()> {
    if euid != 0 {
        bail!(
            "{APP_ID} can only be run by root or with root (sudo) privileges.\nPermission denied"
        );
    }
    Ok(())
}

/// Effective uid of the current process.
pub fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

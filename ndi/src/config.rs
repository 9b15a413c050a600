// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Platform defaults for locating the NDI runtime.
//!
//! The runtime is found either at an explicit path handed to
//! [`crate::initialize`] or at the default location for the current operating
//! system. There is no other discovery mechanism.

use std::path::{Path, PathBuf};

/// Returns the default location of the NDI runtime for this platform.
///
/// On Linux the bare library name is returned so that the dynamic loader's search
/// path applies. Returns `None` on platforms the runtime is not distributed for.
///
/// # Examples
///
/// ```no_run
/// use ndi::config::default_library_path;
///
/// # fn main() -> Result<(), ndi::Error> {
/// ndi::initialize(default_library_path().as_deref())?;
/// # Ok(())
/// # }
/// ```
pub fn default_library_path() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        Some("/usr/local/lib/libndi.dylib".into())
    } else if cfg!(target_os = "linux") {
        Some("libndi.so".into())
    } else if cfg!(all(target_os = "windows", target_pointer_width = "64")) {
        Some("Processing.NDI.Lib.x64.dll".into())
    } else if cfg!(target_os = "windows") {
        Some("Processing.NDI.Lib.x86.dll".into())
    } else {
        None
    }
}

/// Picks the path to load: `explicit` unless it is absent or empty.
pub(crate) fn resolve_library_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) if !path.as_os_str().is_empty() => Some(path.to_path_buf()),
        _ => default_library_path(),
    }
}

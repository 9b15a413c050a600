// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide binding of the NDI runtime.
//!
//! The symbol table is the only process-wide state of this crate. It moves once from
//! "unbound" to "bound" and is read-only afterwards, so lookups after the first
//! successful [`initialize`] take no lock. There is no teardown: the runtime stays
//! loaded until the process exits.

use std::{
    ops::Deref,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock, PoisonError},
};

use tracing::{debug, info};

use crate::{Error, Result, config, marshal};

/// The bound runtime: the resolved symbol table plus where it was loaded from.
pub struct NdiApi {
    lib: ndi_sys::NdiLib,
    path: Option<PathBuf>,
}

impl Deref for NdiApi {
    type Target = ndi_sys::NdiLib;

    fn deref(&self) -> &Self::Target {
        &self.lib
    }
}

/// Handles keep a reference to the bound runtime instead of looking it up per call.
pub(crate) type NdiApiHandle = &'static NdiApi;

static API: OnceLock<NdiApi> = OnceLock::new();
/// Serializes first-time initialization; never taken once [`API`] is set.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Loads and initializes the NDI runtime.
///
/// `path` selects the shared object; `None` or an empty path uses
/// [`config::default_library_path`]. Calling this again after a successful
/// initialization returns `Ok(())` immediately and ignores `path`. Concurrent first
/// calls are serialized so that the runtime is bound exactly once.
///
/// # Errors
///
/// - [`Error::LibraryNotFound`] if the shared object cannot be opened
/// - [`Error::SymbolMissing`] if any required export is absent
/// - [`Error::InitializationRejected`] if the runtime's load or initialize entry
///   point reports failure
///
/// On error nothing is bound and a later call may retry with another path.
///
/// # Examples
///
/// ```no_run
/// # fn main() -> Result<(), ndi::Error> {
/// ndi::initialize(None)?;
/// println!("NDI {}", ndi::version()?);
/// # Ok(())
/// # }
/// ```
pub fn initialize(path: Option<&Path>) -> Result<()> {
    if API.get().is_some() {
        return Ok(());
    }
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if API.get().is_some() {
        return Ok(());
    }

    let path = config::resolve_library_path(path).ok_or_else(|| Error::LibraryNotFound {
        path: format!("<no default for {}>", std::env::consts::OS),
        source: None,
    })?;
    debug!("Opening NDI runtime at {}", path.display());
    let lib = unsafe { ndi_sys::NdiLib::new(&path) }?;
    bind(lib, Some(path))
}

/// Initializes from a symbol table that was resolved by other means.
///
/// Intended for runtimes linked into the process rather than opened from a path.
/// Behaves like [`initialize`] otherwise: a no-op if already initialized.
pub fn initialize_with_library(lib: ndi_sys::NdiLib) -> Result<()> {
    if API.get().is_some() {
        return Ok(());
    }
    let _guard = INIT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    if API.get().is_some() {
        return Ok(());
    }
    bind(lib, None)
}

/// Runs the runtime's own start-up entry points and publishes the table.
///
/// Must be called with [`INIT_LOCK`] held.
fn bind(lib: ndi_sys::NdiLib, path: Option<PathBuf>) -> Result<()> {
    if unsafe { lib.v3_load() }.is_null() {
        return Err(Error::InitializationRejected("NDIlib_v3_load"));
    }
    if !unsafe { lib.initialize() } {
        return Err(Error::InitializationRejected("NDIlib_initialize"));
    }

    let api = API.get_or_init(|| NdiApi { lib, path });
    info!(
        "Bound NDI runtime {} from {}",
        runtime_version(api),
        api.path
            .as_deref()
            .map_or_else(|| "<in-process>".to_string(), |p| p.display().to_string())
    );
    Ok(())
}

/// Returns the bound runtime, or [`Error::NotInitialized`].
///
/// Every operation of the crate goes through here before touching a symbol.
pub(crate) fn api() -> Result<NdiApiHandle> {
    API.get().ok_or(Error::NotInitialized)
}

/// Returns `true` once [`initialize`] has succeeded.
pub fn is_initialized() -> bool {
    API.get().is_some()
}

/// Returns the path the runtime was loaded from, if it was loaded from a path.
pub fn library_path() -> Option<&'static Path> {
    API.get().and_then(|api| api.path.as_deref())
}

/// Returns the runtime's version string, or `"N/A"` if it does not report one.
///
/// # Errors
///
/// Returns [`Error::NotInitialized`] before [`initialize`] succeeded.
pub fn version() -> Result<String> {
    Ok(runtime_version(api()?))
}

fn runtime_version(api: &NdiApi) -> String {
    let version = unsafe { api.version() };
    if version.is_null() {
        "N/A".to_string()
    } else {
        unsafe { marshal::from_native_string(version) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake;

    #[test]
    fn rejected_load_publishes_nothing() {
        let mut symbols = fake::symbols();
        symbols.v3_load = fake::v3_load_unavailable;
        assert!(matches!(
            bind(ndi_sys::NdiLib::from_symbols(symbols), None),
            Err(Error::InitializationRejected("NDIlib_v3_load"))
        ));

        let mut symbols = fake::symbols();
        symbols.initialize = fake::initialize_refused;
        assert!(matches!(
            bind(ndi_sys::NdiLib::from_symbols(symbols), None),
            Err(Error::InitializationRejected("NDIlib_initialize"))
        ));
    }

    #[test]
    fn repeated_initialization_is_a_no_op() {
        fake::install();
        assert!(is_initialized());
        initialize(Some(Path::new("/nonexistent/libndi.so"))).unwrap();
        initialize_with_library(ndi_sys::NdiLib::from_symbols(fake::symbols())).unwrap();
        assert_eq!(library_path(), None);
        assert!(!api().unwrap().is_dynamic());
    }

    #[test]
    fn reports_runtime_version() {
        fake::install();
        assert_eq!(version().unwrap(), "FAKE NDI 6.0.0");
    }
}

// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Source discovery.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    Result, Source,
    api::{NdiApiHandle, api},
    frame::timeout_ms,
    handle::{HandleKind, NativeHandle, PinnedSettings, creation_failed},
    marshal::{self, NativeArray},
};

/// Settings for a [`Finder`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindSettings {
    /// Include sources running on this machine.
    pub show_local_sources: bool,
    /// Comma separated groups to search; `None` searches the default groups.
    pub groups: Option<String>,
    /// Comma separated addresses to query directly, for networks without mDNS.
    pub extra_ips: Option<String>,
}

impl Default for FindSettings {
    fn default() -> Self {
        Self {
            show_local_sources: true,
            groups: None,
            extra_ips: None,
        }
    }
}

/// Discovers NDI sources on the network.
///
/// `Finder` is `Send + Sync`. The runtime's source list is only valid until the next
/// query, so concurrent [`Self::current_sources`] calls are serialized.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use ndi::{FindSettings, Finder};
///
/// # fn main() -> Result<(), ndi::Error> {
/// ndi::initialize(None)?;
/// let finder = Finder::new(&FindSettings::default())?;
/// if finder.wait_for_sources(Duration::from_secs(5))? {
///     for source in finder.current_sources()? {
///         println!("{}", source.name);
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Finder {
    api: NdiApiHandle,
    handle: NativeHandle,
    query: Mutex<()>,
    _settings: PinnedSettings<ndi_sys::FindCreate>,
}

// The runtime's find instance may be used from any thread; the one piece of
// shared state, the source list, is guarded by `query`.
unsafe impl Send for Finder {}
unsafe impl Sync for Finder {}

impl Finder {
    /// # Errors
    ///
    /// - [`crate::Error::NotInitialized`] before [`crate::initialize`]
    /// - [`crate::Error::CreationFailed`] if the runtime returns no instance
    pub fn new(settings: &FindSettings) -> Result<Self> {
        let api = api()?;
        let groups = marshal::to_optional_native_string(settings.groups.as_deref())?;
        let extra_ips = marshal::to_optional_native_string(settings.extra_ips.as_deref())?;
        let pinned = PinnedSettings::new(
            ndi_sys::FindCreate {
                show_local_sources: settings.show_local_sources,
                p_groups: marshal::ptr_or_null(groups.as_ref()),
                p_extra_ips: marshal::ptr_or_null(extra_ips.as_ref()),
            },
            groups.into_iter().chain(extra_ips).collect(),
        );

        let instance = unsafe { api.find_create_v2(pinned.as_ptr()) };
        if instance.is_null() {
            return Err(creation_failed(HandleKind::Find, settings));
        }
        debug!("Created NDI finder {:?}", settings);
        Ok(Self {
            api,
            handle: NativeHandle::new(HandleKind::Find, instance),
            query: Mutex::new(()),
            _settings: pinned,
        })
    }

    /// Blocks until the source list changes or `timeout` passes.
    ///
    /// Returns `false` on timeout.
    pub fn wait_for_sources(&self, timeout: Duration) -> Result<bool> {
        let instance = self.handle.live()?;
        Ok(unsafe { self.api.find_wait_for_sources(instance, timeout_ms(timeout)) })
    }

    /// Copies the sources currently known to the runtime.
    pub fn current_sources(&self) -> Result<Vec<Source>> {
        let instance = self.handle.live()?;
        let _query = self.query.lock().unwrap_or_else(PoisonError::into_inner);
        let mut count = 0u32;
        let sources = unsafe { self.api.find_get_current_sources(instance, &mut count) };
        let sources = unsafe { NativeArray::new(sources, count as usize) };
        Ok(sources
            .iter()
            .map(|source| unsafe { Source::from_raw(source) })
            .collect())
    }

    /// Explicitly destroys the finder.
    ///
    /// Normally the finder is destroyed automatically when dropped.
    pub fn destroy(mut self) -> Result<()> {
        self.destroy_inner()
    }

    fn destroy_inner(&mut self) -> Result<()> {
        let instance = self.handle.take()?;
        unsafe { self.api.find_destroy(instance) };
        Ok(())
    }
}

impl Drop for Finder {
    fn drop(&mut self) {
        if self.handle.is_live()
            && let Err(err) = self.destroy_inner()
        {
            error!("Failed to destroy NDI finder: {:?}", err);
        }
    }
}

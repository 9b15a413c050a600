// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Virtual sources that forward another source.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    Result, Source,
    api::{NdiApiHandle, api},
    handle::{HandleKind, NativeHandle, PinnedSettings, creation_failed},
    marshal,
    source::NativeSource,
};

/// Settings for a [`Router`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
    /// The name of the virtual source.
    pub name: String,
    pub groups: Option<String>,
}

/// A named virtual source whose receivers are redirected to another source.
///
/// Switching is done inside the runtime; no media passes through this process.
pub struct Router {
    api: NdiApiHandle,
    handle: NativeHandle,
    settings: RoutingSettings,
    /// The routed source and the descriptor the runtime was given for it.
    current: Mutex<Option<(Source, Box<NativeSource>)>>,
    _create: PinnedSettings<ndi_sys::RoutingCreate>,
}

// All calls go straight to the runtime, which accepts them from any thread;
// `current` is guarded by its own lock.
unsafe impl Send for Router {}
unsafe impl Sync for Router {}

impl Router {
    pub fn new(settings: &RoutingSettings) -> Result<Self> {
        let api = api()?;
        let name = marshal::to_optional_native_string(Some(&settings.name))?;
        let groups = marshal::to_optional_native_string(settings.groups.as_deref())?;
        let pinned = PinnedSettings::new(
            ndi_sys::RoutingCreate {
                p_ndi_name: marshal::ptr_or_null(name.as_ref()),
                p_groups: marshal::ptr_or_null(groups.as_ref()),
            },
            name.into_iter().chain(groups).collect(),
        );

        let instance = unsafe { api.routing_create(pinned.as_ptr()) };
        if instance.is_null() {
            return Err(creation_failed(HandleKind::Routing, settings));
        }
        debug!("Created NDI router '{}'", settings.name);
        Ok(Self {
            api,
            handle: NativeHandle::new(HandleKind::Routing, instance),
            settings: settings.clone(),
            current: Mutex::new(None),
            _create: pinned,
        })
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn groups(&self) -> Option<&str> {
        self.settings.groups.as_deref()
    }

    /// Redirects receivers of this virtual source to `source`.
    ///
    /// Returns the runtime's acknowledgement.
    pub fn change(&self, source: &Source) -> Result<bool> {
        let instance = self.handle.live()?;
        let native = Box::new(source.to_native()?);
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = current.replace((source.clone(), native));
        let ptr = current
            .as_ref()
            .map_or(std::ptr::null(), |(_, native)| native.as_ptr());
        let changed = unsafe { self.api.routing_change(instance, ptr) };
        if !changed {
            *current = previous;
        }
        Ok(changed)
    }

    /// Routes to nothing; receivers see a black, silent source.
    pub fn clear(&self) -> Result<bool> {
        let instance = self.handle.live()?;
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let cleared = unsafe { self.api.routing_clear(instance) };
        if cleared {
            *current = None;
        }
        Ok(cleared)
    }

    /// The source last routed to successfully.
    pub fn current_source(&self) -> Option<Source> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(source, _)| source.clone())
    }

    #[cfg(test)]
    pub(crate) fn instance(&self) -> Result<ndi_sys::RoutingInstance> {
        self.handle.live()
    }

    #[cfg(test)]
    pub(crate) fn current_at(&self) -> Option<usize> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(_, native)| native.as_ptr() as usize)
    }

    /// Explicitly destroys the router.
    ///
    /// Normally the router is destroyed automatically when dropped.
    pub fn destroy(mut self) -> Result<()> {
        self.destroy_inner()
    }

    fn destroy_inner(&mut self) -> Result<()> {
        let instance = self.handle.take()?;
        unsafe { self.api.routing_destroy(instance) };
        debug!("Destroyed NDI router '{}'", self.settings.name);
        Ok(())
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        if self.handle.is_live()
            && let Err(err) = self.destroy_inner()
        {
            error!("Failed to destroy NDI router: {:?}", err);
        }
    }
}

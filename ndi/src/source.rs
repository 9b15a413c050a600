// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Source descriptors and tally state.

use std::ffi::CString;

use serde::{Deserialize, Serialize};

use crate::{Result, marshal};

/// An NDI source on the network.
///
/// `name` has the form `MACHINE (Source)`. `address` is the runtime's URL or IP
/// address for the source when it reports one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    pub name: String,
    pub address: Option<String>,
}

impl Source {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Copies a runtime-owned descriptor.
    ///
    /// # Safety
    ///
    /// Both string pointers must be null or valid NUL-terminated strings.
    pub(crate) unsafe fn from_raw(raw: &ndi_sys::Source) -> Self {
        unsafe {
            Self {
                name: marshal::from_native_string(raw.p_ndi_name),
                address: marshal::from_optional_native_string(raw.p_url_address),
            }
        }
    }

    /// Builds a descriptor for the runtime that owns its strings.
    pub(crate) fn to_native(&self) -> Result<NativeSource> {
        NativeSource::new(Some(&self.name), self.address.as_deref())
    }
}

/// A [`ndi_sys::Source`] together with the strings it points at.
pub(crate) struct NativeSource {
    raw: ndi_sys::Source,
    name: Option<CString>,
    address: Option<CString>,
}

impl NativeSource {
    pub(crate) fn new(name: Option<&str>, address: Option<&str>) -> Result<Self> {
        let name = marshal::to_optional_native_string(name)?;
        let address = marshal::to_optional_native_string(address)?;
        Ok(Self {
            raw: ndi_sys::Source {
                p_ndi_name: marshal::ptr_or_null(name.as_ref()),
                p_url_address: marshal::ptr_or_null(address.as_ref()),
            },
            name,
            address,
        })
    }

    /// A descriptor with both strings null.
    pub(crate) fn null() -> Self {
        Self {
            raw: ndi_sys::Source::default(),
            name: None,
            address: None,
        }
    }

    pub(crate) fn raw(&self) -> ndi_sys::Source {
        self.raw
    }

    pub(crate) fn as_ptr(&self) -> *const ndi_sys::Source {
        &self.raw
    }

    /// Hands over the owned strings, e.g. to a [`crate::handle::PinnedSettings`].
    pub(crate) fn into_strings(self) -> Vec<CString> {
        self.name.into_iter().chain(self.address).collect()
    }
}

/// Whether a source is on program (live) or preview output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tally {
    pub on_program: bool,
    pub on_preview: bool,
}

impl From<ndi_sys::Tally> for Tally {
    fn from(raw: ndi_sys::Tally) -> Self {
        Self {
            on_program: raw.on_program,
            on_preview: raw.on_preview,
        }
    }
}

impl From<Tally> for ndi_sys::Tally {
    fn from(tally: Tally) -> Self {
        Self {
            on_program: tally.on_program,
            on_preview: tally.on_preview,
        }
    }
}

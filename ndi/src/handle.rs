// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Opaque native handles and the settings blocks they are created from.

use std::{ffi::CString, fmt, os::raw::c_void};

use serde::Serialize;

use crate::{Error, Result};

/// The four kinds of native instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleKind {
    Find,
    Recv,
    Send,
    Routing,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandleKind::Find => "find",
            HandleKind::Recv => "receive",
            HandleKind::Send => "send",
            HandleKind::Routing => "routing",
        })
    }
}

/// A native instance pointer that becomes null once destroyed.
pub(crate) struct NativeHandle {
    kind: HandleKind,
    ptr: *mut c_void,
}

impl NativeHandle {
    pub(crate) fn new(kind: HandleKind, ptr: *mut c_void) -> Self {
        Self { kind, ptr }
    }

    /// Returns the pointer, or [`Error::UseAfterDestroy`] once [`Self::take`] ran.
    pub(crate) fn live(&self) -> Result<*mut c_void> {
        if self.ptr.is_null() {
            Err(Error::UseAfterDestroy(self.kind))
        } else {
            Ok(self.ptr)
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.ptr.is_null()
    }

    /// Detaches the pointer for destruction, leaving the handle dead.
    pub(crate) fn take(&mut self) -> Result<*mut c_void> {
        let ptr = self.live()?;
        self.ptr = std::ptr::null_mut();
        Ok(ptr)
    }
}

/// A native settings struct together with the strings it points into.
///
/// Some runtimes keep reading the creation settings after the create call returns,
/// so the block lives as long as the handle it created.
pub(crate) struct PinnedSettings<T> {
    raw: Box<T>,
    _strings: Vec<CString>,
}

impl<T> PinnedSettings<T> {
    /// `raw` may only point into `strings`, whose heap buffers do not move.
    pub(crate) fn new(raw: T, strings: Vec<CString>) -> Self {
        Self {
            raw: Box::new(raw),
            _strings: strings,
        }
    }

    pub(crate) fn as_ptr(&self) -> *const T {
        &*self.raw
    }
}

/// Builds [`Error::CreationFailed`] with a JSON snapshot of the settings.
pub(crate) fn creation_failed<S: Serialize>(kind: HandleKind, settings: &S) -> Error {
    Error::CreationFailed {
        kind,
        settings: serde_json::to_string(settings)
            .unwrap_or_else(|err| format!("<unserializable settings: {err}>")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taken_handle_reports_use_after_destroy() {
        let mut value = 0u8;
        let mut handle = NativeHandle::new(HandleKind::Send, (&raw mut value).cast());
        assert!(handle.is_live());
        assert!(handle.take().is_ok());
        assert!(!handle.is_live());
        assert!(matches!(
            handle.live(),
            Err(Error::UseAfterDestroy(HandleKind::Send))
        ));
        assert!(matches!(
            handle.take(),
            Err(Error::UseAfterDestroy(HandleKind::Send))
        ));
    }

    #[test]
    fn creation_failure_carries_settings_snapshot() {
        #[derive(Serialize)]
        struct Settings {
            name: &'static str,
        }
        let err = creation_failed(HandleKind::Routing, &Settings { name: "router" });
        assert_eq!(
            err.to_string(),
            r#"failed to create routing instance with settings {"name":"router"}"#
        );
    }
}

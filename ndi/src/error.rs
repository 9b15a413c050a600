// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Error types for NDI operations.
//!
//! The variants fall into four groups:
//!
//! - **Environment**: the runtime could not be opened, bound or initialized. Raised
//!   once, by [`crate::initialize`], and not retryable without a different library.
//! - **Resource**: the runtime refused to create a handle. Retryable with other
//!   settings.
//! - **Protocol misuse**: double capture, double free, use after destroy, undersized
//!   buffers. These are caller bugs detected before anything reaches the runtime,
//!   which has no defined behavior for them.
//! - **Marshaling**: strings that cannot cross the boundary.
//!
//! Timeouts are not errors; capture calls report them as "no frame".

use crate::{FrameKind, HandleKind};

/// Convenience result type using [`Error`] as the error variant.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors that can occur when using the NDI runtime.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The shared object could not be opened at the given path.
    #[error("NDI runtime not found at '{path}'")]
    LibraryNotFound {
        path: String,
        #[source]
        source: Option<libloading::Error>,
    },

    /// The shared object lacks a required export.
    #[error("NDI runtime is missing export '{name}'")]
    SymbolMissing {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// The runtime's own load or initialize entry point reported failure.
    #[error("NDI runtime rejected initialization in {0}")]
    InitializationRejected(&'static str),

    /// An operation was attempted before [`crate::initialize`] succeeded.
    #[error("NDI runtime not initialized, call ndi::initialize() first")]
    NotInitialized,

    /// The runtime returned a null handle for the given settings.
    #[error("failed to create {kind} instance with settings {settings}")]
    CreationFailed { kind: HandleKind, settings: String },

    /// A frame of this kind was captured and not yet freed.
    #[error("a {0} frame is already captured on this handle and must be freed first")]
    DoubleCapture(FrameKind),

    /// The captured frame was already freed.
    #[error("{0} frame was already freed")]
    DoubleFree(FrameKind),

    /// The captured frame was read after being freed.
    #[error("{0} frame data read after the frame was freed")]
    FrameReleased(FrameKind),

    /// The handle was already destroyed.
    #[error("{0} instance used after being destroyed")]
    UseAfterDestroy(HandleKind),

    /// A destination or source buffer holds fewer elements than the operation needs.
    #[error("buffer too small: {required} elements required, {actual} provided")]
    BufferTooSmall { required: usize, actual: usize },

    /// A buffer handed to an asynchronous send changed before it was released.
    #[error("asynchronously sent buffer was modified before the next synchronizing call")]
    AsyncBufferMutated,

    /// A frame descriptor has inconsistent dimensions.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Failed to convert a Rust string to a C-compatible null-terminated string.
    #[error("Null string: {0}")]
    NulString(#[from] std::ffi::NulError),

    /// A generic error for failures without a dedicated variant.
    #[error("Other error: {0}")]
    Other(String),
}

impl From<ndi_sys::LoadError> for Error {
    fn from(value: ndi_sys::LoadError) -> Self {
        match value {
            ndi_sys::LoadError::Open { path, source } => Error::LibraryNotFound {
                path,
                source: Some(source),
            },
            ndi_sys::LoadError::SymbolMissing { name, source } => {
                Error::SymbolMissing { name, source }
            }
        }
    }
}

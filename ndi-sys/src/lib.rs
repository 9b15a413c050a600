// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! # ndi-sys: Raw FFI bindings to the NDI runtime library
//!
//! This crate provides low-level, unsafe Rust bindings to the NDI runtime, which is
//! only ever distributed as a shared object. There are no headers to generate from,
//! so every struct below is written by hand to match the C layout of the runtime
//! field for field, and every entry point is resolved at runtime through
//! `libloading`.
//!
//! ## Overview
//!
//! `ndi-sys` exposes:
//! - `#[repr(C)]` mirrors of the runtime's structs ([`VideoFrameV2`], [`AudioFrameV2`],
//!   [`MetadataFrame`], [`Source`], the `*Create` settings structs, ...)
//! - Enumeration constants with the runtime's exact numeric values
//! - [`NdiLib`], the resolved symbol table (one function pointer per required export)
//!
//! ## Usage
//!
//! **Most users should NOT use this crate directly.** Use the safe [`ndi`] wrapper crate
//! instead, which provides:
//! - One-time process-wide initialization
//! - RAII handles and frame guards that enforce the capture/free protocol
//! - Rust-idiomatic error handling with `Result`
//!
//! ## Safety
//!
//! All entry points are `unsafe` and require the caller to uphold the runtime's
//! invariants:
//! - Every frame returned by a capture call must be freed exactly once
//! - Buffers passed to an asynchronous send must stay untouched until the next
//!   synchronizing call
//! - Instances must not be used after being destroyed
//!
//! [`ndi`]: https://docs.rs/ndi

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::too_many_arguments)]

mod symbols;

use std::{
    ffi::OsStr,
    os::raw::{c_char, c_float, c_int, c_void},
};

pub use symbols::{SYMBOL_NAMES, Symbols};

/// Errors raised while opening the runtime or resolving its exports.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The shared object could not be opened.
    #[error("failed to open '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: libloading::Error,
    },

    /// A required export is absent from the shared object.
    #[error("missing export '{name}': {source}")]
    SymbolMissing {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
}

pub type FindInstance = *mut c_void;
pub type RecvInstance = *mut c_void;
pub type SendInstance = *mut c_void;
pub type RoutingInstance = *mut c_void;

// Frame types returned by the capture calls.
pub type FrameType = c_int;
pub const NDIlib_frame_type_none: FrameType = 0;
pub const NDIlib_frame_type_video: FrameType = 1;
pub const NDIlib_frame_type_audio: FrameType = 2;
pub const NDIlib_frame_type_metadata: FrameType = 3;
pub const NDIlib_frame_type_error: FrameType = 4;
pub const NDIlib_frame_type_status_change: FrameType = 100;

/// Builds a FourCC code the way the runtime's `NDI_LIB_FOURCC` macro does.
pub const fn make_fourcc(code: &[u8; 4]) -> FourCCVideoType {
    (code[0] as u32 | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24)
        as FourCCVideoType
}

pub type FourCCVideoType = c_int;
pub const NDIlib_FourCC_video_type_UYVY: FourCCVideoType = make_fourcc(b"UYVY");
pub const NDIlib_FourCC_video_type_UYVA: FourCCVideoType = make_fourcc(b"UYVA");
pub const NDIlib_FourCC_video_type_P216: FourCCVideoType = make_fourcc(b"P216");
pub const NDIlib_FourCC_video_type_PA16: FourCCVideoType = make_fourcc(b"PA16");
pub const NDIlib_FourCC_video_type_YV12: FourCCVideoType = make_fourcc(b"YV12");
pub const NDIlib_FourCC_video_type_I420: FourCCVideoType = make_fourcc(b"I420");
pub const NDIlib_FourCC_video_type_NV12: FourCCVideoType = make_fourcc(b"NV12");
pub const NDIlib_FourCC_video_type_BGRA: FourCCVideoType = make_fourcc(b"BGRA");
pub const NDIlib_FourCC_video_type_BGRX: FourCCVideoType = make_fourcc(b"BGRX");
pub const NDIlib_FourCC_video_type_RGBA: FourCCVideoType = make_fourcc(b"RGBA");
pub const NDIlib_FourCC_video_type_RGBX: FourCCVideoType = make_fourcc(b"RGBX");

pub type FrameFormatType = c_int;
pub const NDIlib_frame_format_type_interleaved: FrameFormatType = 0;
pub const NDIlib_frame_format_type_progressive: FrameFormatType = 1;
pub const NDIlib_frame_format_type_field_0: FrameFormatType = 2;
pub const NDIlib_frame_format_type_field_1: FrameFormatType = 3;

pub type RecvColorFormat = c_int;
pub const NDIlib_recv_color_format_BGRX_BGRA: RecvColorFormat = 0;
pub const NDIlib_recv_color_format_UYVY_BGRA: RecvColorFormat = 1;
pub const NDIlib_recv_color_format_RGBX_RGBA: RecvColorFormat = 2;
pub const NDIlib_recv_color_format_UYVY_RGBA: RecvColorFormat = 3;
pub const NDIlib_recv_color_format_fastest: RecvColorFormat = 100;
pub const NDIlib_recv_color_format_best: RecvColorFormat = 101;

pub type RecvBandwidth = c_int;
pub const NDIlib_recv_bandwidth_metadata_only: RecvBandwidth = -10;
pub const NDIlib_recv_bandwidth_audio_only: RecvBandwidth = 10;
pub const NDIlib_recv_bandwidth_lowest: RecvBandwidth = 0;
pub const NDIlib_recv_bandwidth_highest: RecvBandwidth = 100;

/// Asks the runtime to generate the timecode for an outgoing frame.
pub const NDIlib_send_timecode_synthesize: i64 = i64::MAX;
pub const NDIlib_send_timecode_empty: i64 = 0;
pub const NDIlib_recv_timestamp_undefined: i64 = i64::MAX;

/// A source descriptor as produced by the finder.
///
/// Both strings belong to whoever produced the struct. Absent strings are null.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct Source {
    pub p_ndi_name: *const c_char,
    /// Also known as `p_ip_address` in older runtimes (same union slot).
    pub p_url_address: *const c_char,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            p_ndi_name: std::ptr::null(),
            p_url_address: std::ptr::null(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct FindCreate {
    pub show_local_sources: bool,
    pub p_groups: *const c_char,
    pub p_extra_ips: *const c_char,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct RecvCreateV3 {
    pub source_to_connect_to: Source,
    pub color_format: RecvColorFormat,
    pub bandwidth: RecvBandwidth,
    pub allow_video_fields: bool,
    pub p_ndi_recv_name: *const c_char,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct SendCreate {
    pub p_ndi_name: *const c_char,
    pub p_groups: *const c_char,
    pub clock_video: bool,
    pub clock_audio: bool,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct RoutingCreate {
    pub p_ndi_name: *const c_char,
    pub p_groups: *const c_char,
}

/// Video frame descriptor.
///
/// `line_stride_in_bytes` shares its slot with `data_size_in_bytes` for compressed
/// formats; only the uncompressed meaning is used here.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct VideoFrameV2 {
    pub xres: c_int,
    pub yres: c_int,
    pub FourCC: FourCCVideoType,
    pub frame_rate_N: c_int,
    pub frame_rate_D: c_int,
    pub picture_aspect_ratio: c_float,
    pub frame_format_type: FrameFormatType,
    pub timecode: i64,
    pub p_data: *mut u8,
    pub line_stride_in_bytes: c_int,
    pub p_metadata: *const c_char,
    pub timestamp: i64,
}

impl Default for VideoFrameV2 {
    fn default() -> Self {
        Self {
            xres: 0,
            yres: 0,
            FourCC: NDIlib_FourCC_video_type_BGRX,
            frame_rate_N: 25,
            frame_rate_D: 1,
            picture_aspect_ratio: 0.0,
            frame_format_type: NDIlib_frame_format_type_progressive,
            timecode: NDIlib_send_timecode_synthesize,
            p_data: std::ptr::null_mut(),
            line_stride_in_bytes: 0,
            p_metadata: std::ptr::null(),
            timestamp: NDIlib_send_timecode_empty,
        }
    }
}

/// Planar 32-bit float audio frame descriptor.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct AudioFrameV2 {
    pub sample_rate: c_int,
    pub no_channels: c_int,
    pub no_samples: c_int,
    pub timecode: i64,
    pub p_data: *mut c_float,
    pub channel_stride_in_bytes: c_int,
    pub p_metadata: *const c_char,
    pub timestamp: i64,
}

impl Default for AudioFrameV2 {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            no_channels: 2,
            no_samples: 0,
            timecode: NDIlib_send_timecode_synthesize,
            p_data: std::ptr::null_mut(),
            channel_stride_in_bytes: 0,
            p_metadata: std::ptr::null(),
            timestamp: NDIlib_send_timecode_empty,
        }
    }
}

/// Interleaved 32-bit float audio, used only by the conversion utilities.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct AudioFrameInterleaved32f {
    pub sample_rate: c_int,
    pub no_channels: c_int,
    pub no_samples: c_int,
    pub timecode: i64,
    pub p_data: *mut c_float,
}

impl Default for AudioFrameInterleaved32f {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            no_channels: 2,
            no_samples: 0,
            timecode: NDIlib_send_timecode_synthesize,
            p_data: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct MetadataFrame {
    pub length: c_int,
    pub timecode: i64,
    pub p_data: *mut c_char,
}

impl Default for MetadataFrame {
    fn default() -> Self {
        Self {
            length: 0,
            timecode: NDIlib_send_timecode_synthesize,
            p_data: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub on_program: bool,
    pub on_preview: bool,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct RecvPerformance {
    pub video_frames: i64,
    pub audio_frames: i64,
    pub metadata_frames: i64,
}

/// The resolved symbol table.
///
/// Holds the shared object open for as long as the table lives, so every
/// function pointer in [`Symbols`] stays callable.
pub struct NdiLib {
    _library: Option<libloading::Library>,
    symbols: Symbols,
}

impl NdiLib {
    /// Opens the shared object at `path` and resolves every required export.
    ///
    /// Fails on the first missing export; no partially bound table is ever returned.
    ///
    /// # Safety
    ///
    /// Loading a shared object runs its initializers. `path` must point at a genuine
    /// NDI runtime whose exports have the signatures declared in [`Symbols`].
    pub unsafe fn new<P: AsRef<OsStr>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let library = unsafe { libloading::Library::new(path) }.map_err(|source| {
            LoadError::Open {
                path: path.to_string_lossy().into_owned(),
                source,
            }
        })?;
        let symbols = unsafe { Symbols::resolve(&library) }?;
        Ok(Self {
            _library: Some(library),
            symbols,
        })
    }

    /// Builds a table from function pointers that are already in the process.
    ///
    /// Used for statically provided implementations of the runtime.
    pub fn from_symbols(symbols: Symbols) -> Self {
        Self {
            _library: None,
            symbols,
        }
    }

    pub fn symbols(&self) -> &Symbols {
        &self.symbols
    }

    /// Returns `true` when the table is backed by a dynamically opened shared object.
    pub fn is_dynamic(&self) -> bool {
        self._library.is_some()
    }
}

// Only function pointers and the library handle live here; the runtime's entry
// points are callable from any thread.
unsafe impl Send for NdiLib {}
unsafe impl Sync for NdiLib {}

/// Marker for the opaque struct returned by `NDIlib_v3_load`.
pub type LoadedApi = c_void;

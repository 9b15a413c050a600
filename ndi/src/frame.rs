// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Frame descriptors shared by the send and receive paths.
//!
//! Outgoing frames ([`VideoFrame`], [`AudioFrame`], [`MetadataFrame`]) borrow caller
//! memory. Captured frames ([`CapturedVideo`], [`CapturedAudio`],
//! [`CapturedMetadata`]) borrow runtime memory and give it back exactly once, on
//! [`CapturedVideo::release`] or on drop.

pub(crate) mod audio;
pub(crate) mod metadata;
pub(crate) mod slot;
pub(crate) mod video;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

pub use audio::{AudioFrame, CapturedAudio, OwnedAudioFrame};
pub use metadata::{CapturedMetadata, MetadataFrame};
pub use video::{CapturedVideo, OwnedVideoFrame, VideoFrame};

/// Asks the runtime to generate the timecode of an outgoing frame.
pub const TIMECODE_SYNTHESIZE: i64 = ndi_sys::NDIlib_send_timecode_synthesize;

/// The kind of frame a capture slot or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    Video,
    Audio,
    Metadata,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameKind::Video => "video",
            FrameKind::Audio => "audio",
            FrameKind::Metadata => "metadata",
        })
    }
}

/// Uncompressed pixel formats understood by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FourCC {
    /// 4:2:2 packed, 16 bits per pixel.
    Uyvy,
    /// UYVY followed by an 8-bit alpha plane.
    Uyva,
    /// 4:2:2 semi-planar, 16 bits per component.
    P216,
    /// P216 followed by a 16-bit alpha plane.
    Pa16,
    /// 4:2:0 planar, V before U.
    Yv12,
    /// 4:2:0 planar, U before V.
    I420,
    /// 4:2:0 with interleaved chroma.
    Nv12,
    Bgra,
    Bgrx,
    Rgba,
    Rgbx,
}

impl FourCC {
    pub fn from_raw(raw: ndi_sys::FourCCVideoType) -> Option<Self> {
        Some(match raw {
            ndi_sys::NDIlib_FourCC_video_type_UYVY => FourCC::Uyvy,
            ndi_sys::NDIlib_FourCC_video_type_UYVA => FourCC::Uyva,
            ndi_sys::NDIlib_FourCC_video_type_P216 => FourCC::P216,
            ndi_sys::NDIlib_FourCC_video_type_PA16 => FourCC::Pa16,
            ndi_sys::NDIlib_FourCC_video_type_YV12 => FourCC::Yv12,
            ndi_sys::NDIlib_FourCC_video_type_I420 => FourCC::I420,
            ndi_sys::NDIlib_FourCC_video_type_NV12 => FourCC::Nv12,
            ndi_sys::NDIlib_FourCC_video_type_BGRA => FourCC::Bgra,
            ndi_sys::NDIlib_FourCC_video_type_BGRX => FourCC::Bgrx,
            ndi_sys::NDIlib_FourCC_video_type_RGBA => FourCC::Rgba,
            ndi_sys::NDIlib_FourCC_video_type_RGBX => FourCC::Rgbx,
            _ => return None,
        })
    }

    pub fn to_raw(self) -> ndi_sys::FourCCVideoType {
        match self {
            FourCC::Uyvy => ndi_sys::NDIlib_FourCC_video_type_UYVY,
            FourCC::Uyva => ndi_sys::NDIlib_FourCC_video_type_UYVA,
            FourCC::P216 => ndi_sys::NDIlib_FourCC_video_type_P216,
            FourCC::Pa16 => ndi_sys::NDIlib_FourCC_video_type_PA16,
            FourCC::Yv12 => ndi_sys::NDIlib_FourCC_video_type_YV12,
            FourCC::I420 => ndi_sys::NDIlib_FourCC_video_type_I420,
            FourCC::Nv12 => ndi_sys::NDIlib_FourCC_video_type_NV12,
            FourCC::Bgra => ndi_sys::NDIlib_FourCC_video_type_BGRA,
            FourCC::Bgrx => ndi_sys::NDIlib_FourCC_video_type_BGRX,
            FourCC::Rgba => ndi_sys::NDIlib_FourCC_video_type_RGBA,
            FourCC::Rgbx => ndi_sys::NDIlib_FourCC_video_type_RGBX,
        }
    }

    /// Bytes per pixel in the first plane.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            FourCC::Uyvy | FourCC::Uyva | FourCC::P216 | FourCC::Pa16 => 2,
            FourCC::Yv12 | FourCC::I420 | FourCC::Nv12 => 1,
            FourCC::Bgra | FourCC::Bgrx | FourCC::Rgba | FourCC::Rgbx => 4,
        }
    }

    /// The tightly packed line stride of the first plane.
    pub fn line_stride(self, xres: usize) -> usize {
        xres * self.bytes_per_pixel()
    }

    /// Bytes the runtime reads for a whole frame, all planes included.
    ///
    /// Every plane after the first is laid out with a stride derived from
    /// `line_stride`, so padding in the first plane carries over to the others.
    pub fn frame_len(self, xres: usize, yres: usize, line_stride: usize) -> usize {
        let plane = line_stride * yres;
        let half_rows = yres.div_ceil(2);
        match self {
            FourCC::Uyvy | FourCC::Bgra | FourCC::Bgrx | FourCC::Rgba | FourCC::Rgbx => plane,
            FourCC::Uyva => plane + (line_stride / 2).max(xres) * yres,
            FourCC::P216 => plane * 2,
            FourCC::Pa16 => plane * 3,
            FourCC::Yv12 | FourCC::I420 => plane + 2 * (line_stride / 2) * half_rows,
            FourCC::Nv12 => plane + line_stride * half_rows,
        }
    }
}

/// Field layout of a video frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameFormat {
    /// Both fields interleaved in one frame.
    Interleaved,
    #[default]
    Progressive,
    /// The even field alone.
    Field0,
    /// The odd field alone.
    Field1,
}

impl FrameFormat {
    pub fn from_raw(raw: ndi_sys::FrameFormatType) -> Option<Self> {
        Some(match raw {
            ndi_sys::NDIlib_frame_format_type_interleaved => FrameFormat::Interleaved,
            ndi_sys::NDIlib_frame_format_type_progressive => FrameFormat::Progressive,
            ndi_sys::NDIlib_frame_format_type_field_0 => FrameFormat::Field0,
            ndi_sys::NDIlib_frame_format_type_field_1 => FrameFormat::Field1,
            _ => return None,
        })
    }

    pub fn to_raw(self) -> ndi_sys::FrameFormatType {
        match self {
            FrameFormat::Interleaved => ndi_sys::NDIlib_frame_format_type_interleaved,
            FrameFormat::Progressive => ndi_sys::NDIlib_frame_format_type_progressive,
            FrameFormat::Field0 => ndi_sys::NDIlib_frame_format_type_field_0,
            FrameFormat::Field1 => ndi_sys::NDIlib_frame_format_type_field_1,
        }
    }
}

/// A frame rate as numerator over denominator, e.g. 30000/1001.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: i32,
    pub denominator: i32,
}

impl FrameRate {
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// The duration of one frame, or `None` for a non-positive rate.
    pub fn frame_duration(&self) -> Option<Duration> {
        if self.numerator <= 0 || self.denominator <= 0 {
            return None;
        }
        Some(Duration::from_secs_f64(
            f64::from(self.denominator) / f64::from(self.numerator),
        ))
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Converts a timeout to the runtime's millisecond argument, saturating.
pub(crate) fn timeout_ms(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

/// Maps a runtime timestamp to `None` when the runtime did not set one.
pub(crate) fn defined_timestamp(timestamp: i64) -> Option<i64> {
    (timestamp != ndi_sys::NDIlib_recv_timestamp_undefined).then_some(timestamp)
}

/// Content hash of a buffer, used to detect writes to in-flight async sends.
#[cfg(debug_assertions)]
pub(crate) fn fingerprint(bytes: &[u8]) -> u64 {
    use std::hash::{DefaultHasher, Hasher};

    let mut hasher = DefaultHasher::new();
    hasher.write(bytes);
    hasher.finish()
}

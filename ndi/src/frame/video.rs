// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Video frames: outgoing descriptors over caller memory and captured frames over
//! runtime memory.

use std::{ffi::CString, fmt, marker::PhantomData};

use tracing::error;

use crate::{
    Error, FourCC, FrameFormat, FrameKind, FrameRate, Result,
    frame::defined_timestamp,
    marshal,
    recv::Receiver,
};

/// An outgoing video frame over a caller-owned buffer.
///
/// The buffer is borrowed for `'buf`, which is what keeps it alive and unmodified
/// while an asynchronous send is in flight (see [`crate::Sender::send_video_async`]).
///
/// # Examples
///
/// ```
/// use ndi::{FourCC, VideoFrame};
///
/// # fn main() -> Result<(), ndi::Error> {
/// let pixels = vec![0u8; 1920 * 1080 * 2];
/// let frame = VideoFrame::new(1920, 1080, FourCC::Uyvy, &pixels)?
///     .with_frame_rate(50, 1)
///     .with_metadata("<camera id=\"1\"/>")?;
/// assert_eq!(frame.line_stride(), 3840);
/// # Ok(())
/// # }
/// ```
pub struct VideoFrame<'buf> {
    raw: ndi_sys::VideoFrameV2,
    fourcc: FourCC,
    metadata: Option<CString>,
    _buffer: PhantomData<&'buf [u8]>,
}

impl<'buf> VideoFrame<'buf> {
    /// Describes a tightly packed frame.
    ///
    /// # Errors
    ///
    /// [`Error::BufferTooSmall`] if `data` is shorter than the frame, counting every
    /// plane of `fourcc`.
    pub fn new(xres: usize, yres: usize, fourcc: FourCC, data: &'buf [u8]) -> Result<Self> {
        Self::with_line_stride(xres, yres, fourcc, fourcc.line_stride(xres), data)
    }

    /// Describes a frame whose rows are `line_stride` bytes apart.
    pub fn with_line_stride(
        xres: usize,
        yres: usize,
        fourcc: FourCC,
        line_stride: usize,
        data: &'buf [u8],
    ) -> Result<Self> {
        let required = fourcc.frame_len(xres, yres, line_stride);
        if data.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                actual: data.len(),
            });
        }
        unsafe { Self::from_raw_parts(xres, yres, fourcc, line_stride, data.as_ptr()) }
    }

    /// Describes a frame over memory the borrow checker cannot see.
    ///
    /// # Safety
    ///
    /// `data` must point at [`FourCC::frame_len`] readable bytes that stay valid for
    /// `'buf`. When the frame is sent asynchronously, the caller must not modify them
    /// until the send is released; debug builds check this.
    pub unsafe fn from_raw_parts(
        xres: usize,
        yres: usize,
        fourcc: FourCC,
        line_stride: usize,
        data: *const u8,
    ) -> Result<Self> {
        if xres == 0 || yres == 0 {
            return Err(Error::InvalidFrame(format!(
                "video dimensions {xres}x{yres} must be positive"
            )));
        }
        if line_stride < fourcc.line_stride(xres) {
            return Err(Error::InvalidFrame(format!(
                "line stride {line_stride} shorter than {xres} {fourcc:?} pixels"
            )));
        }
        if data.is_null() {
            return Err(Error::InvalidFrame("null video buffer".to_string()));
        }
        Ok(Self {
            raw: ndi_sys::VideoFrameV2 {
                xres: marshal::to_c_int(xres, "xres")?,
                yres: marshal::to_c_int(yres, "yres")?,
                FourCC: fourcc.to_raw(),
                p_data: data.cast_mut(),
                line_stride_in_bytes: marshal::to_c_int(line_stride, "line stride")?,
                ..Default::default()
            },
            fourcc,
            metadata: None,
            _buffer: PhantomData,
        })
    }

    pub fn with_frame_rate(mut self, numerator: i32, denominator: i32) -> Self {
        self.raw.frame_rate_N = numerator;
        self.raw.frame_rate_D = denominator;
        self
    }

    pub fn with_frame_format(mut self, format: FrameFormat) -> Self {
        self.raw.frame_format_type = format.to_raw();
        self
    }

    /// Sets the display aspect ratio; `0.0` means square pixels.
    pub fn with_aspect_ratio(mut self, ratio: f32) -> Self {
        self.raw.picture_aspect_ratio = ratio;
        self
    }

    /// Sets the timecode in 100ns units, or [`crate::frame::TIMECODE_SYNTHESIZE`].
    pub fn with_timecode(mut self, timecode: i64) -> Self {
        self.raw.timecode = timecode;
        self
    }

    /// Attaches an XML metadata string; an empty string clears it.
    pub fn with_metadata(mut self, metadata: &str) -> Result<Self> {
        self.metadata = marshal::to_optional_native_string(Some(metadata))?;
        self.raw.p_metadata = marshal::ptr_or_null(self.metadata.as_ref());
        Ok(self)
    }

    pub fn xres(&self) -> usize {
        self.raw.xres as usize
    }

    pub fn yres(&self) -> usize {
        self.raw.yres as usize
    }

    pub fn fourcc(&self) -> FourCC {
        self.fourcc
    }

    pub fn line_stride(&self) -> usize {
        self.raw.line_stride_in_bytes as usize
    }

    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::new(self.raw.frame_rate_N, self.raw.frame_rate_D)
    }

    pub fn frame_format(&self) -> FrameFormat {
        FrameFormat::from_raw(self.raw.frame_format_type).unwrap_or_default()
    }

    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref().and_then(|m| m.to_str().ok())
    }

    /// The whole frame, every plane included.
    pub fn data(&self) -> &'buf [u8] {
        let len = self
            .fourcc
            .frame_len(self.xres(), self.yres(), self.line_stride());
        unsafe { marshal::view_buffer(self.raw.p_data, len) }
    }

    pub(crate) fn as_raw(&self) -> &ndi_sys::VideoFrameV2 {
        &self.raw
    }

    /// Gives up the borrow; the descriptor stays valid while the buffer and the
    /// returned metadata string are alive.
    pub(crate) fn into_raw_parts(self) -> (ndi_sys::VideoFrameV2, Option<CString>) {
        (self.raw, self.metadata)
    }
}

impl fmt::Debug for VideoFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("xres", &self.xres())
            .field("yres", &self.yres())
            .field("fourcc", &self.fourcc)
            .field("line_stride", &self.line_stride())
            .field("frame_rate", &self.frame_rate())
            .field("timecode", &self.raw.timecode)
            .finish_non_exhaustive()
    }
}

/// A video frame owned by a receiver until released.
///
/// The pixel data is readable through [`Self::data`] until [`Self::release`] runs or
/// the guard is dropped; only one captured video frame per receiver may exist at a
/// time.
pub struct CapturedVideo<'r> {
    receiver: &'r Receiver,
    raw: ndi_sys::VideoFrameV2,
    released: bool,
}

impl<'r> CapturedVideo<'r> {
    pub(crate) fn new(receiver: &'r Receiver, raw: ndi_sys::VideoFrameV2) -> Self {
        Self {
            receiver,
            raw,
            released: false,
        }
    }

    pub fn xres(&self) -> usize {
        usize::try_from(self.raw.xres).unwrap_or(0)
    }

    pub fn yres(&self) -> usize {
        usize::try_from(self.raw.yres).unwrap_or(0)
    }

    pub fn line_stride(&self) -> usize {
        usize::try_from(self.raw.line_stride_in_bytes).unwrap_or(0)
    }

    /// `None` for pixel formats this crate does not know.
    pub fn fourcc(&self) -> Option<FourCC> {
        FourCC::from_raw(self.raw.FourCC)
    }

    pub fn raw_fourcc(&self) -> ndi_sys::FourCCVideoType {
        self.raw.FourCC
    }

    pub fn frame_rate(&self) -> FrameRate {
        FrameRate::new(self.raw.frame_rate_N, self.raw.frame_rate_D)
    }

    pub fn frame_format(&self) -> Option<FrameFormat> {
        FrameFormat::from_raw(self.raw.frame_format_type)
    }

    pub fn picture_aspect_ratio(&self) -> f32 {
        self.raw.picture_aspect_ratio
    }

    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    /// The sender's timestamp in 100ns units, when the sender set one.
    pub fn timestamp(&self) -> Option<i64> {
        defined_timestamp(self.raw.timestamp)
    }

    pub fn metadata(&self) -> Result<Option<String>> {
        self.ensure_held()?;
        Ok(unsafe { marshal::from_optional_native_string(self.raw.p_metadata) })
    }

    /// The pixel data: exactly `line_stride * yres` bytes.
    ///
    /// # Errors
    ///
    /// [`Error::FrameReleased`] after [`Self::release`].
    pub fn data(&self) -> Result<&[u8]> {
        self.ensure_held()?;
        Ok(unsafe { marshal::view_buffer(self.raw.p_data, self.line_stride() * self.yres()) })
    }

    /// Copies the frame so it can outlive the capture.
    pub fn to_owned_frame(&self) -> Result<OwnedVideoFrame> {
        let fourcc = self.known_fourcc()?;
        Ok(OwnedVideoFrame {
            xres: self.xres(),
            yres: self.yres(),
            fourcc,
            line_stride: self.line_stride(),
            frame_rate: self.frame_rate(),
            frame_format: self.frame_format().unwrap_or_default(),
            timecode: self.raw.timecode,
            metadata: self.metadata()?,
            data: self.data()?.to_vec(),
        })
    }

    /// Describes the captured frame for sending, without copying it.
    pub fn as_send_frame(&self) -> Result<VideoFrame<'_>> {
        self.ensure_held()?;
        let fourcc = self.known_fourcc()?;
        Ok(VideoFrame {
            raw: ndi_sys::VideoFrameV2 {
                timestamp: ndi_sys::NDIlib_send_timecode_empty,
                ..self.raw
            },
            fourcc,
            metadata: None,
            _buffer: PhantomData,
        })
    }

    /// Gives the frame back to the runtime.
    ///
    /// # Errors
    ///
    /// [`Error::DoubleFree`] if the frame was already released.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::DoubleFree(FrameKind::Video));
        }
        self.released = true;
        self.receiver.free_video(&self.raw)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn ensure_held(&self) -> Result<()> {
        if self.released {
            Err(Error::FrameReleased(FrameKind::Video))
        } else {
            Ok(())
        }
    }

    fn known_fourcc(&self) -> Result<FourCC> {
        self.fourcc().ok_or_else(|| {
            Error::InvalidFrame(format!("unknown FourCC {:#010x}", self.raw.FourCC))
        })
    }
}

impl Drop for CapturedVideo<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = self.release()
        {
            error!("Failed to free captured video frame: {:?}", err);
        }
    }
}

impl fmt::Debug for CapturedVideo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedVideo")
            .field("xres", &self.raw.xres)
            .field("yres", &self.raw.yres)
            .field("fourcc", &self.fourcc())
            .field("line_stride", &self.raw.line_stride_in_bytes)
            .field("timecode", &self.raw.timecode)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// A captured video frame copied into host memory.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedVideoFrame {
    pub xres: usize,
    pub yres: usize,
    pub fourcc: FourCC,
    pub line_stride: usize,
    pub frame_rate: FrameRate,
    pub frame_format: FrameFormat,
    pub timecode: i64,
    pub metadata: Option<String>,
    pub data: Vec<u8>,
}

impl OwnedVideoFrame {
    /// Describes the copy for sending.
    ///
    /// Set `timecode` to [`crate::frame::TIMECODE_SYNTHESIZE`] to have the runtime restamp it.
    pub fn as_video_frame(&self) -> Result<VideoFrame<'_>> {
        let frame = VideoFrame::with_line_stride(
            self.xres,
            self.yres,
            self.fourcc,
            self.line_stride,
            &self.data,
        )?
        .with_frame_rate(self.frame_rate.numerator, self.frame_rate.denominator)
        .with_frame_format(self.frame_format)
        .with_timecode(self.timecode);
        match &self.metadata {
            Some(metadata) => frame.with_metadata(metadata),
            None => Ok(frame),
        }
    }
}

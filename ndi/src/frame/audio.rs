// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Planar 32-bit float audio frames.

use std::{ffi::CString, fmt, marker::PhantomData, mem::size_of};

use tracing::error;

use crate::{
    Error, FrameKind, Result,
    frame::defined_timestamp,
    interleave, marshal,
    recv::Receiver,
};

/// Number of floats a planar buffer must hold.
fn planar_len(channels: usize, samples: usize, channel_stride: usize) -> usize {
    match channels {
        0 => 0,
        _ => (channels - 1) * channel_stride + samples,
    }
}

/// An outgoing planar audio frame over a caller-owned buffer.
///
/// Channel `c` starts at `data[c * channel_stride]` and holds `samples` floats.
pub struct AudioFrame<'buf> {
    raw: ndi_sys::AudioFrameV2,
    metadata: Option<CString>,
    _buffer: PhantomData<&'buf [f32]>,
}

impl<'buf> AudioFrame<'buf> {
    /// Describes tightly packed planes, one after the other.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndi::AudioFrame;
    ///
    /// # fn main() -> Result<(), ndi::Error> {
    /// let planes = vec![0.0f32; 2 * 1920];
    /// let frame = AudioFrame::new(48_000, 2, 1920, &planes)?;
    /// assert_eq!(frame.channel(1).map(<[f32]>::len), Some(1920));
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(sample_rate: i32, channels: usize, samples: usize, data: &'buf [f32]) -> Result<Self> {
        Self::with_channel_stride(sample_rate, channels, samples, samples, data)
    }

    /// Describes planes that start `channel_stride` floats apart.
    pub fn with_channel_stride(
        sample_rate: i32,
        channels: usize,
        samples: usize,
        channel_stride: usize,
        data: &'buf [f32],
    ) -> Result<Self> {
        if sample_rate <= 0 {
            return Err(Error::InvalidFrame(format!(
                "sample rate {sample_rate} must be positive"
            )));
        }
        if channel_stride < samples {
            return Err(Error::InvalidFrame(format!(
                "channel stride {channel_stride} shorter than {samples} samples"
            )));
        }
        let required = planar_len(channels, samples, channel_stride);
        if data.len() < required {
            return Err(Error::BufferTooSmall {
                required,
                actual: data.len(),
            });
        }
        Ok(Self {
            raw: ndi_sys::AudioFrameV2 {
                sample_rate,
                no_channels: marshal::to_c_int(channels, "channel count")?,
                no_samples: marshal::to_c_int(samples, "sample count")?,
                p_data: data.as_ptr().cast_mut(),
                channel_stride_in_bytes: marshal::to_c_int(
                    channel_stride * size_of::<f32>(),
                    "channel stride",
                )?,
                ..Default::default()
            },
            metadata: None,
            _buffer: PhantomData,
        })
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

    pub fn sample_rate(&self) -> i32 {
        self.raw.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.raw.no_channels as usize
    }

    pub fn samples(&self) -> usize {
        self.raw.no_samples as usize
    }

    /// Distance between channel starts, in floats.
    pub fn channel_stride(&self) -> usize {
        self.raw.channel_stride_in_bytes as usize / size_of::<f32>()
    }

    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    pub fn data(&self) -> &'buf [f32] {
        let len = planar_len(self.channels(), self.samples(), self.channel_stride());
        unsafe { marshal::view_buffer(self.raw.p_data, len) }
    }

    pub fn channel(&self, channel: usize) -> Option<&'buf [f32]> {
        if channel >= self.channels() {
            return None;
        }
        let start = channel * self.channel_stride();
        self.data().get(start..start + self.samples())
    }

    pub(crate) fn as_raw(&self) -> &ndi_sys::AudioFrameV2 {
        &self.raw
    }
}

impl fmt::Debug for AudioFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFrame")
            .field("sample_rate", &self.raw.sample_rate)
            .field("channels", &self.raw.no_channels)
            .field("samples", &self.raw.no_samples)
            .field("channel_stride", &self.channel_stride())
            .field("timecode", &self.raw.timecode)
            .finish_non_exhaustive()
    }
}

/// An audio frame owned by a receiver until released.
pub struct CapturedAudio<'r> {
    receiver: &'r Receiver,
    raw: ndi_sys::AudioFrameV2,
    released: bool,
}

impl<'r> CapturedAudio<'r> {
    pub(crate) fn new(receiver: &'r Receiver, raw: ndi_sys::AudioFrameV2) -> Self {
        Self {
            receiver,
            raw,
            released: false,
        }
    }

    pub fn sample_rate(&self) -> i32 {
        self.raw.sample_rate
    }

    pub fn channels(&self) -> usize {
        usize::try_from(self.raw.no_channels).unwrap_or(0)
    }

    pub fn samples(&self) -> usize {
        usize::try_from(self.raw.no_samples).unwrap_or(0)
    }

    /// Distance between channel starts, in floats.
    ///
    /// A runtime that leaves the stride at zero packs the planes tightly.
    pub fn channel_stride(&self) -> usize {
        match usize::try_from(self.raw.channel_stride_in_bytes).unwrap_or(0) {
            0 => self.samples(),
            bytes => bytes / size_of::<f32>(),
        }
    }

    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    pub fn timestamp(&self) -> Option<i64> {
        defined_timestamp(self.raw.timestamp)
    }

    pub fn metadata(&self) -> Result<Option<String>> {
        self.ensure_held()?;
        Ok(unsafe { marshal::from_optional_native_string(self.raw.p_metadata) })
    }

    /// All planes, from the first sample of channel 0 to the last of the last channel.
    pub fn data(&self) -> Result<&[f32]> {
        self.ensure_held()?;
        if self.channel_stride() < self.samples() {
            return Err(Error::InvalidFrame(format!(
                "channel stride {} shorter than {} samples",
                self.channel_stride(),
                self.samples()
            )));
        }
        let len = planar_len(self.channels(), self.samples(), self.channel_stride());
        Ok(unsafe { marshal::view_buffer(self.raw.p_data.cast_const(), len) })
    }

    /// The samples of one channel.
    pub fn channel(&self, channel: usize) -> Result<&[f32]> {
        if channel >= self.channels() {
            return Err(Error::InvalidFrame(format!(
                "channel {channel} out of range for {} channels",
                self.channels()
            )));
        }
        let start = channel * self.channel_stride();
        let data = self.data()?;
        data.get(start..start + self.samples()).ok_or_else(|| {
            Error::InvalidFrame(format!("channel {channel} extends past the frame"))
        })
    }

    /// Interleaves the frame into `dst` using the runtime's converter.
    ///
    /// # Errors
    ///
    /// [`Error::BufferTooSmall`] if `dst` holds fewer than `channels * samples` floats.
    pub fn to_interleaved(&self, dst: &mut [f32]) -> Result<()> {
        self.ensure_held()?;
        interleave::to_interleaved_raw(&self.raw, dst)
    }

    /// Interleaves the frame into a new buffer.
    pub fn interleaved(&self) -> Result<Vec<f32>> {
        let mut dst = vec![0.0; self.channels() * self.samples()];
        self.to_interleaved(&mut dst)?;
        Ok(dst)
    }

    /// Copies the frame into tightly packed host memory.
    pub fn to_owned_frame(&self) -> Result<OwnedAudioFrame> {
        let mut data = Vec::with_capacity(self.channels() * self.samples());
        for channel in 0..self.channels() {
            data.extend_from_slice(self.channel(channel)?);
        }
        Ok(OwnedAudioFrame {
            sample_rate: self.raw.sample_rate,
            channels: self.channels(),
            samples: self.samples(),
            timecode: self.raw.timecode,
            data,
        })
    }

    /// Describes the captured frame for sending, without copying it.
    pub fn as_send_frame(&self) -> Result<AudioFrame<'_>> {
        AudioFrame::with_channel_stride(
            self.raw.sample_rate,
            self.channels(),
            self.samples(),
            self.channel_stride(),
            self.data()?,
        )
        .map(|frame| frame.with_timecode(self.raw.timecode))
    }

    /// Gives the frame back to the runtime.
    ///
    /// # Errors
    ///
    /// [`Error::DoubleFree`] if the frame was already released.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::DoubleFree(FrameKind::Audio));
        }
        self.released = true;
        self.receiver.free_audio(&self.raw)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn ensure_held(&self) -> Result<()> {
        if self.released {
            Err(Error::FrameReleased(FrameKind::Audio))
        } else {
            Ok(())
        }
    }
}

impl Drop for CapturedAudio<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = self.release()
        {
            error!("Failed to free captured audio frame: {:?}", err);
        }
    }
}

impl fmt::Debug for CapturedAudio<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedAudio")
            .field("sample_rate", &self.raw.sample_rate)
            .field("channels", &self.raw.no_channels)
            .field("samples", &self.raw.no_samples)
            .field("timecode", &self.raw.timecode)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// A captured audio frame copied into host memory, planes packed back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedAudioFrame {
    pub sample_rate: i32,
    pub channels: usize,
    pub samples: usize,
    pub timecode: i64,
    pub data: Vec<f32>,
}

impl OwnedAudioFrame {
    pub fn as_audio_frame(&self) -> Result<AudioFrame<'_>> {
        AudioFrame::new(self.sample_rate, self.channels, self.samples, &self.data)
            .map(|frame| frame.with_timecode(self.timecode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strided_planes_are_addressed_by_stride() {
        // Two channels of three samples, planes four floats apart.
        let data = [0.0, 1.0, 2.0, -1.0, 10.0, 11.0, 12.0];
        let frame = AudioFrame::with_channel_stride(48_000, 2, 3, 4, &data).unwrap();
        assert_eq!(frame.channel_stride(), 4);
        assert_eq!(frame.as_raw().channel_stride_in_bytes, 16);
        assert_eq!(frame.channel(0), Some(&[0.0, 1.0, 2.0][..]));
        assert_eq!(frame.channel(1), Some(&[10.0, 11.0, 12.0][..]));
        assert_eq!(frame.channel(2), None);
    }

    #[test]
    fn undersized_planes_are_rejected() {
        let data = vec![0.0f32; 8 * 480 - 1];
        assert!(matches!(
            AudioFrame::new(48_000, 8, 480, &data),
            Err(Error::BufferTooSmall {
                required: 3840,
                actual: 3839
            })
        ));
    }

    #[test]
    fn invalid_geometry_is_rejected() {
        let data = [0.0f32; 16];
        assert!(matches!(
            AudioFrame::new(0, 1, 16, &data),
            Err(Error::InvalidFrame(_))
        ));
        assert!(matches!(
            AudioFrame::with_channel_stride(48_000, 2, 8, 4, &data),
            Err(Error::InvalidFrame(_))
        ));
    }
}

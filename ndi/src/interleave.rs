// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Conversions between planar and interleaved float audio.
//!
//! The conversion itself is done by the runtime. Destination sizes are checked here
//! first because the runtime writes without bounds.

use std::mem::size_of;

use crate::{AudioFrame, Error, Result, api::api, marshal};

fn ensure_len(required: usize, actual: usize) -> Result<()> {
    if actual < required {
        return Err(Error::BufferTooSmall { required, actual });
    }
    Ok(())
}

/// Interleaves `frame` into `dst`: sample `s` of channel `c` lands at
/// `dst[s * channels + c]`.
///
/// # Errors
///
/// - [`Error::BufferTooSmall`] if `dst` holds fewer than `channels * samples` floats
/// - [`Error::NotInitialized`] before [`crate::initialize`]
pub fn to_interleaved(frame: &AudioFrame<'_>, dst: &mut [f32]) -> Result<()> {
    to_interleaved_raw(frame.as_raw(), dst)
}

pub(crate) fn to_interleaved_raw(src: &ndi_sys::AudioFrameV2, dst: &mut [f32]) -> Result<()> {
    let api = api()?;
    let channels = marshal::from_c_int(src.no_channels, "channel count")?;
    let samples = marshal::from_c_int(src.no_samples, "sample count")?;
    ensure_len(channels * samples, dst.len())?;

    let mut interleaved = ndi_sys::AudioFrameInterleaved32f {
        sample_rate: src.sample_rate,
        no_channels: src.no_channels,
        no_samples: src.no_samples,
        timecode: src.timecode,
        p_data: dst.as_mut_ptr(),
    };
    unsafe { api.util_audio_to_interleaved_32f_v2(src, &mut interleaved) };
    Ok(())
}

/// De-interleaves `interleaved` into tightly packed planes in `dst`.
///
/// Reads `channels * samples` floats and writes channel `c` to
/// `dst[c * samples..(c + 1) * samples]`.
///
/// # Errors
///
/// [`Error::BufferTooSmall`] if either buffer holds fewer than `channels * samples`
/// floats.
pub fn from_interleaved(
    interleaved: &[f32],
    sample_rate: i32,
    channels: usize,
    samples: usize,
    dst: &mut [f32],
) -> Result<()> {
    let api = api()?;
    let required = channels * samples;
    ensure_len(required, interleaved.len())?;
    ensure_len(required, dst.len())?;

    let src = ndi_sys::AudioFrameInterleaved32f {
        sample_rate,
        no_channels: marshal::to_c_int(channels, "channel count")?,
        no_samples: marshal::to_c_int(samples, "sample count")?,
        timecode: ndi_sys::NDIlib_send_timecode_synthesize,
        p_data: interleaved.as_ptr().cast_mut(),
    };
    let mut planar = ndi_sys::AudioFrameV2 {
        sample_rate,
        no_channels: src.no_channels,
        no_samples: src.no_samples,
        p_data: dst.as_mut_ptr(),
        channel_stride_in_bytes: marshal::to_c_int(samples * size_of::<f32>(), "channel stride")?,
        ..Default::default()
    };
    unsafe { api.util_audio_from_interleaved_32f_v2(&src, &mut planar) };
    Ok(())
}

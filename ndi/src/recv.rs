// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Receiving video, audio and metadata from a source.

use std::{
    ptr,
    sync::{Mutex, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    CapturedAudio, CapturedMetadata, CapturedVideo, FrameKind, MetadataFrame, Result, Source,
    Tally,
    api::{NdiApiHandle, api},
    frame::{metadata::MetadataOwner, slot::CaptureSlot, timeout_ms},
    handle::{HandleKind, NativeHandle, PinnedSettings, creation_failed},
    marshal,
    source::NativeSource,
};

/// Pixel formats the runtime delivers, as "without alpha / with alpha".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorFormat {
    BgrxBgra,
    #[default]
    UyvyBgra,
    RgbxRgba,
    UyvyRgba,
    /// Whatever needs the least conversion.
    Fastest,
    /// Highest quality, possibly 16-bit formats.
    Best,
}

impl ColorFormat {
    fn to_raw(self) -> ndi_sys::RecvColorFormat {
        match self {
            ColorFormat::BgrxBgra => ndi_sys::NDIlib_recv_color_format_BGRX_BGRA,
            ColorFormat::UyvyBgra => ndi_sys::NDIlib_recv_color_format_UYVY_BGRA,
            ColorFormat::RgbxRgba => ndi_sys::NDIlib_recv_color_format_RGBX_RGBA,
            ColorFormat::UyvyRgba => ndi_sys::NDIlib_recv_color_format_UYVY_RGBA,
            ColorFormat::Fastest => ndi_sys::NDIlib_recv_color_format_fastest,
            ColorFormat::Best => ndi_sys::NDIlib_recv_color_format_best,
        }
    }
}

/// How much of the source's streams to receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bandwidth {
    MetadataOnly,
    AudioOnly,
    /// The low-resolution proxy stream.
    Lowest,
    #[default]
    Highest,
}

impl Bandwidth {
    fn to_raw(self) -> ndi_sys::RecvBandwidth {
        match self {
            Bandwidth::MetadataOnly => ndi_sys::NDIlib_recv_bandwidth_metadata_only,
            Bandwidth::AudioOnly => ndi_sys::NDIlib_recv_bandwidth_audio_only,
            Bandwidth::Lowest => ndi_sys::NDIlib_recv_bandwidth_lowest,
            Bandwidth::Highest => ndi_sys::NDIlib_recv_bandwidth_highest,
        }
    }
}

/// Settings for a [`Receiver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecvSettings {
    /// The source to connect to, usually from [`crate::Finder::current_sources`].
    pub source: Option<Source>,
    pub color_format: ColorFormat,
    pub bandwidth: Bandwidth,
    /// Deliver interlaced video as separate fields instead of merged frames.
    pub allow_video_fields: bool,
    /// Name of this receiver as shown to the sender.
    pub name: Option<String>,
}

impl Default for RecvSettings {
    fn default() -> Self {
        Self {
            source: None,
            color_format: ColorFormat::default(),
            bandwidth: Bandwidth::default(),
            allow_video_fields: true,
            name: None,
        }
    }
}

impl RecvSettings {
    pub fn for_source(source: Source) -> Self {
        Self {
            source: Some(source),
            ..Default::default()
        }
    }
}

/// Frame counters for each stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameCounters {
    pub video: i64,
    pub audio: i64,
    pub metadata: i64,
}

impl From<ndi_sys::RecvPerformance> for FrameCounters {
    fn from(raw: ndi_sys::RecvPerformance) -> Self {
        Self {
            video: raw.video_frames,
            audio: raw.audio_frames,
            metadata: raw.metadata_frames,
        }
    }
}

/// A snapshot of a receiver's performance counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub total: FrameCounters,
    pub dropped: FrameCounters,
}

/// The outcome of [`Receiver::capture`].
#[derive(Debug)]
pub enum Capture<'r> {
    /// The timeout passed without an event.
    None,
    Video(CapturedVideo<'r>),
    Audio(CapturedAudio<'r>),
    Metadata(CapturedMetadata<'r>),
    /// The source changed its settings.
    StatusChange,
    /// The connection to the source was lost.
    ConnectionLost,
}

/// Receives frames from one source.
///
/// `Receiver` is `Send + Sync`. Video, audio and metadata can be captured from
/// separate threads at the same time; captures of the same kind are serialized, and
/// only one captured frame per kind may be held at a time.
///
/// Destroying a receiver while another thread is blocked in a capture is not
/// possible in safe code: captures borrow the receiver and [`Self::destroy`] takes it
/// by value.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use ndi::{Receiver, RecvSettings, Source};
///
/// # fn main() -> Result<(), ndi::Error> {
/// ndi::initialize(None)?;
/// let receiver = Receiver::new(&RecvSettings::for_source(Source::new("HOST (Camera)")))?;
/// if let Some(frame) = receiver.capture_video(Duration::from_secs(1))? {
///     println!("{}x{} {} bytes", frame.xres(), frame.yres(), frame.data()?.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Receiver {
    api: NdiApiHandle,
    handle: NativeHandle,
    settings: RecvSettings,
    video: CaptureSlot,
    audio: CaptureSlot,
    metadata: CaptureSlot,
    connection_metadata: Mutex<Vec<String>>,
    _create: PinnedSettings<ndi_sys::RecvCreateV3>,
}

// The runtime supports one concurrent call per frame kind on a receive instance;
// the capture slots enforce exactly that.
unsafe impl Send for Receiver {}
unsafe impl Sync for Receiver {}

impl Receiver {
    /// # Errors
    ///
    /// - [`crate::Error::NotInitialized`] before [`crate::initialize`]
    /// - [`crate::Error::CreationFailed`] if the runtime returns no instance, e.g. for
    ///   a missing source
    pub fn new(settings: &RecvSettings) -> Result<Self> {
        let api = api()?;
        let source = match &settings.source {
            Some(source) => source.to_native()?,
            None => NativeSource::null(),
        };
        let name = marshal::to_optional_native_string(settings.name.as_deref())?;
        let raw = ndi_sys::RecvCreateV3 {
            source_to_connect_to: source.raw(),
            color_format: settings.color_format.to_raw(),
            bandwidth: settings.bandwidth.to_raw(),
            allow_video_fields: settings.allow_video_fields,
            p_ndi_recv_name: marshal::ptr_or_null(name.as_ref()),
        };
        let pinned = PinnedSettings::new(raw, source.into_strings().into_iter().chain(name).collect());

        let instance = unsafe { api.recv_create_v3(pinned.as_ptr()) };
        if instance.is_null() {
            return Err(creation_failed(HandleKind::Recv, settings));
        }
        debug!(
            "Created NDI receiver for {:?}",
            settings.source.as_ref().map(|source| &source.name)
        );
        Ok(Self {
            api,
            handle: NativeHandle::new(HandleKind::Recv, instance),
            settings: settings.clone(),
            video: CaptureSlot::new(FrameKind::Video),
            audio: CaptureSlot::new(FrameKind::Audio),
            metadata: CaptureSlot::new(FrameKind::Metadata),
            connection_metadata: Mutex::new(Vec::new()),
            _create: pinned,
        })
    }

    pub fn source(&self) -> Option<&Source> {
        self.settings.source.as_ref()
    }

    pub fn settings(&self) -> &RecvSettings {
        &self.settings
    }

    /// Waits up to `timeout` for a frame of any kind or a status event.
    ///
    /// Holds all three capture slots for the duration of the call, so it fails with
    /// [`crate::Error::DoubleCapture`] while any captured frame is still held.
    /// Prefer the per-kind calls when capturing from several threads.
    pub fn capture(&self, timeout: Duration) -> Result<Capture<'_>> {
        let instance = self.handle.live()?;
        let video_slot = self.video.begin()?;
        let audio_slot = self.audio.begin()?;
        let metadata_slot = self.metadata.begin()?;

        let mut video = ndi_sys::VideoFrameV2::default();
        let mut audio = ndi_sys::AudioFrameV2::default();
        let mut metadata = ndi_sys::MetadataFrame::default();
        let frame_type = unsafe {
            self.api.recv_capture_v2(
                instance,
                &mut video,
                &mut audio,
                &mut metadata,
                timeout_ms(timeout),
            )
        };

        Ok(match frame_type {
            ndi_sys::NDIlib_frame_type_video => {
                video_slot.captured();
                Capture::Video(CapturedVideo::new(self, video))
            }
            ndi_sys::NDIlib_frame_type_audio => {
                audio_slot.captured();
                Capture::Audio(CapturedAudio::new(self, audio))
            }
            ndi_sys::NDIlib_frame_type_metadata => {
                metadata_slot.captured();
                Capture::Metadata(CapturedMetadata::new(MetadataOwner::Recv(self), metadata))
            }
            other => self.event(other),
        })
    }

    /// Waits up to `timeout` for a video frame.
    ///
    /// Returns `None` on timeout and on status events.
    ///
    /// # Errors
    ///
    /// [`crate::Error::DoubleCapture`] while a previously captured video frame is held.
    pub fn capture_video(&self, timeout: Duration) -> Result<Option<CapturedVideo<'_>>> {
        let instance = self.handle.live()?;
        let slot = self.video.begin()?;
        let mut video = ndi_sys::VideoFrameV2::default();
        let frame_type = unsafe {
            self.api.recv_capture_v2(
                instance,
                &mut video,
                ptr::null_mut(),
                ptr::null_mut(),
                timeout_ms(timeout),
            )
        };
        if frame_type == ndi_sys::NDIlib_frame_type_video {
            slot.captured();
            return Ok(Some(CapturedVideo::new(self, video)));
        }
        self.event(frame_type);
        Ok(None)
    }

    /// Waits up to `timeout` for an audio frame.
    pub fn capture_audio(&self, timeout: Duration) -> Result<Option<CapturedAudio<'_>>> {
        let instance = self.handle.live()?;
        let slot = self.audio.begin()?;
        let mut audio = ndi_sys::AudioFrameV2::default();
        let frame_type = unsafe {
            self.api.recv_capture_v2(
                instance,
                ptr::null_mut(),
                &mut audio,
                ptr::null_mut(),
                timeout_ms(timeout),
            )
        };
        if frame_type == ndi_sys::NDIlib_frame_type_audio {
            slot.captured();
            return Ok(Some(CapturedAudio::new(self, audio)));
        }
        self.event(frame_type);
        Ok(None)
    }

    /// Waits up to `timeout` for a metadata frame.
    pub fn capture_metadata(&self, timeout: Duration) -> Result<Option<CapturedMetadata<'_>>> {
        let instance = self.handle.live()?;
        let slot = self.metadata.begin()?;
        let mut metadata = ndi_sys::MetadataFrame::default();
        let frame_type = unsafe {
            self.api.recv_capture_v2(
                instance,
                ptr::null_mut(),
                ptr::null_mut(),
                &mut metadata,
                timeout_ms(timeout),
            )
        };
        if frame_type == ndi_sys::NDIlib_frame_type_metadata {
            slot.captured();
            return Ok(Some(CapturedMetadata::new(
                MetadataOwner::Recv(self),
                metadata,
            )));
        }
        self.event(frame_type);
        Ok(None)
    }

    fn event(&self, frame_type: ndi_sys::FrameType) -> Capture<'_> {
        match frame_type {
            ndi_sys::NDIlib_frame_type_none => Capture::None,
            ndi_sys::NDIlib_frame_type_status_change => {
                debug!("NDI receiver status changed");
                Capture::StatusChange
            }
            ndi_sys::NDIlib_frame_type_error => {
                warn!(
                    "NDI receiver lost connection to {:?}",
                    self.source().map(|source| &source.name)
                );
                Capture::ConnectionLost
            }
            other => {
                warn!("Ignoring unexpected NDI frame type {other}");
                Capture::None
            }
        }
    }

    pub(crate) fn free_video(&self, frame: &ndi_sys::VideoFrameV2) -> Result<()> {
        let instance = self.handle.live()?;
        unsafe { self.api.recv_free_video_v2(instance, frame) };
        self.video.finish();
        Ok(())
    }

    pub(crate) fn free_audio(&self, frame: &ndi_sys::AudioFrameV2) -> Result<()> {
        let instance = self.handle.live()?;
        unsafe { self.api.recv_free_audio_v2(instance, frame) };
        self.audio.finish();
        Ok(())
    }

    pub(crate) fn free_metadata(&self, frame: &ndi_sys::MetadataFrame) -> Result<()> {
        let instance = self.handle.live()?;
        unsafe { self.api.recv_free_metadata(instance, frame) };
        self.metadata.finish();
        Ok(())
    }

    /// Total and dropped frame counts since the receiver was created.
    pub fn performance(&self) -> Result<Performance> {
        let instance = self.handle.live()?;
        let mut total = ndi_sys::RecvPerformance::default();
        let mut dropped = ndi_sys::RecvPerformance::default();
        unsafe { self.api.recv_get_performance(instance, &mut total, &mut dropped) };
        Ok(Performance {
            total: total.into(),
            dropped: dropped.into(),
        })
    }

    /// Tells the source whether it is on program or preview.
    ///
    /// Returns `false` if the runtime did not accept the update, e.g. while not
    /// connected.
    pub fn set_tally(&self, tally: Tally) -> Result<bool> {
        let instance = self.handle.live()?;
        let raw = ndi_sys::Tally::from(tally);
        Ok(unsafe { self.api.recv_set_tally(instance, &raw) })
    }

    /// Sends a metadata frame upstream to the source.
    ///
    /// Returns `false` when not connected.
    pub fn send_metadata(&self, frame: &MetadataFrame) -> Result<bool> {
        let instance = self.handle.live()?;
        Ok(unsafe { self.api.recv_send_metadata(instance, frame.as_raw()) })
    }

    /// Queues metadata sent to every source this receiver connects to.
    ///
    /// Entries are independent: each is sent on every new connection until
    /// [`Self::clear_connection_metadata`].
    pub fn add_connection_metadata(&self, frame: &MetadataFrame) -> Result<()> {
        let instance = self.handle.live()?;
        let mut queued = self
            .connection_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        unsafe { self.api.recv_add_connection_metadata(instance, frame.as_raw()) };
        queued.push(frame.data().to_string());
        Ok(())
    }

    /// Empties the connection metadata queue in one step.
    pub fn clear_connection_metadata(&self) -> Result<()> {
        let instance = self.handle.live()?;
        let mut queued = self
            .connection_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        unsafe { self.api.recv_clear_connection_metadata(instance) };
        queued.clear();
        Ok(())
    }

    /// The currently queued connection metadata, oldest first.
    pub fn connection_metadata(&self) -> Vec<String> {
        self.connection_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(test)]
    pub(crate) fn instance(&self) -> Result<ndi_sys::RecvInstance> {
        self.handle.live()
    }

    /// Explicitly destroys the receiver.
    ///
    /// Normally the receiver is destroyed automatically when dropped.
    pub fn destroy(mut self) -> Result<()> {
        self.destroy_inner()
    }

    fn destroy_inner(&mut self) -> Result<()> {
        let instance = self.handle.take()?;
        unsafe { self.api.recv_destroy(instance) };
        debug!("Destroyed NDI receiver");
        Ok(())
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        if self.handle.is_live()
            && let Err(err) = self.destroy_inner()
        {
            error!("Failed to destroy NDI receiver: {:?}", err);
        }
    }
}

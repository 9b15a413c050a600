// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Publishing a source on the network.

use std::{
    ffi::CString,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    AudioFrame, CapturedMetadata, FrameKind, MetadataFrame, OwnedVideoFrame, Result, Source, Tally,
    VideoFrame,
    api::{NdiApiHandle, api},
    frame::{metadata::MetadataOwner, slot::CaptureSlot, timeout_ms},
    handle::{HandleKind, NativeHandle, PinnedSettings, creation_failed},
    marshal,
    source::NativeSource,
};

/// Settings for a [`Sender`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendSettings {
    /// The source name; the runtime prefixes it with the machine name.
    pub name: String,
    /// Comma separated groups to publish in; `None` uses the default groups.
    pub groups: Option<String>,
    /// Pace [`Sender::send_video`] to the frame rate of the submitted frames.
    pub clock_video: bool,
    /// Pace [`Sender::send_audio`] to the sample rate of the submitted frames.
    pub clock_audio: bool,
}

impl Default for SendSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            groups: None,
            clock_video: true,
            clock_audio: true,
        }
    }
}

impl SendSettings {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Bookkeeping for the video buffer the runtime may still be reading.
///
/// Every native video call happens with this locked, so the generation always
/// names the submission the runtime actually holds.
#[derive(Default)]
struct VideoSubmit {
    /// Bumped each time the runtime lets go of the previous submission.
    generation: u64,
    /// A frame handed over with [`Sender::send_video_async_owned`].
    owned: Option<HeldVideo>,
    #[cfg(debug_assertions)]
    borrowed: Option<BorrowedVideo>,
}

impl VideoSubmit {
    /// Records that the runtime no longer reads any earlier submission.
    fn released(&mut self) -> Result<()> {
        self.generation += 1;
        self.owned = None;
        #[cfg(debug_assertions)]
        if let Some(borrowed) = self.borrowed.take() {
            return borrowed.verify();
        }
        Ok(())
    }
}

/// An owned frame and the descriptor the runtime was given for it.
///
/// The descriptor points into the heap storage of the frame and the metadata
/// string, which does not move with them.
struct HeldVideo {
    raw: Box<ndi_sys::VideoFrameV2>,
    _frame: OwnedVideoFrame,
    _metadata: Option<CString>,
}

/// Where a borrowed async frame lives and what it held when submitted.
#[cfg(debug_assertions)]
struct BorrowedVideo {
    data: *const u8,
    len: usize,
    fingerprint: u64,
}

#[cfg(debug_assertions)]
impl BorrowedVideo {
    fn new(frame: &VideoFrame<'_>) -> Self {
        let data = frame.data();
        Self {
            data: data.as_ptr(),
            len: data.len(),
            fingerprint: crate::frame::fingerprint(data),
        }
    }

    fn verify(&self) -> Result<()> {
        // The submission contract keeps the buffer alive until it is released.
        let data = unsafe { marshal::view_buffer(self.data, self.len) };
        if crate::frame::fingerprint(data) != self.fingerprint {
            return Err(crate::Error::AsyncBufferMutated);
        }
        Ok(())
    }
}

/// Publishes video, audio and metadata as an NDI source.
///
/// With clocking enabled, synchronous sends block until the runtime's clock
/// releases them, so a 50 fps stream spends about 20ms in each
/// [`Self::send_video`]. Send from a dedicated thread when that matters.
///
/// # Examples
///
/// ```no_run
/// use ndi::{FourCC, SendSettings, Sender, VideoFrame};
///
/// # fn main() -> Result<(), ndi::Error> {
/// ndi::initialize(None)?;
/// let sender = Sender::new(&SendSettings::named("Test Pattern"))?;
/// let pixels = vec![0x80u8; 1920 * 1080 * 2];
/// let frame = VideoFrame::new(1920, 1080, FourCC::Uyvy, &pixels)?.with_frame_rate(50, 1);
/// for _ in 0..50 {
///     sender.send_video(&frame)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Sender {
    api: NdiApiHandle,
    handle: NativeHandle,
    settings: SendSettings,
    metadata: CaptureSlot,
    video: Mutex<VideoSubmit>,
    connection_metadata: Mutex<Vec<String>>,
    failover: Mutex<Option<Box<NativeSource>>>,
    _create: PinnedSettings<ndi_sys::SendCreate>,
}

// The runtime's send instance is callable from any thread. Async guards borrow
// the sender, so no submission can outlive it.
unsafe impl Send for Sender {}
unsafe impl Sync for Sender {}

impl Sender {
    /// # Errors
    ///
    /// - [`crate::Error::NotInitialized`] before [`crate::initialize`]
    /// - [`crate::Error::CreationFailed`] if the runtime returns no instance, e.g. for
    ///   a name already in use
    pub fn new(settings: &SendSettings) -> Result<Self> {
        let api = api()?;
        let name = marshal::to_optional_native_string(Some(&settings.name))?;
        let groups = marshal::to_optional_native_string(settings.groups.as_deref())?;
        let pinned = PinnedSettings::new(
            ndi_sys::SendCreate {
                p_ndi_name: marshal::ptr_or_null(name.as_ref()),
                p_groups: marshal::ptr_or_null(groups.as_ref()),
                clock_video: settings.clock_video,
                clock_audio: settings.clock_audio,
            },
            name.into_iter().chain(groups).collect::<Vec<CString>>(),
        );

        let instance = unsafe { api.send_create_v2(pinned.as_ptr(), std::ptr::null()) };
        if instance.is_null() {
            return Err(creation_failed(HandleKind::Send, settings));
        }
        debug!("Created NDI sender '{}'", settings.name);
        Ok(Self {
            api,
            handle: NativeHandle::new(HandleKind::Send, instance),
            settings: settings.clone(),
            metadata: CaptureSlot::new(FrameKind::Metadata),
            video: Mutex::new(VideoSubmit::default()),
            connection_metadata: Mutex::new(Vec::new()),
            failover: Mutex::new(None),
            _create: pinned,
        })
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn groups(&self) -> Option<&str> {
        self.settings.groups.as_deref()
    }

    fn lock_video(&self) -> MutexGuard<'_, VideoSubmit> {
        self.video.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks earlier async submissions released, logging a buffer that changed
    /// while the runtime held it.
    fn superseded(&self, submit: &mut VideoSubmit) {
        if let Err(err) = submit.released() {
            error!("Async video send released with error: {:?}", err);
        }
    }

    /// Sends a video frame synchronously.
    ///
    /// The runtime has consumed the buffer when this returns. Any pending
    /// [`AsyncVideoSend`] is released by this call.
    pub fn send_video(&self, frame: &VideoFrame<'_>) -> Result<()> {
        let instance = self.handle.live()?;
        let mut submit = self.lock_video();
        unsafe { self.api.send_send_video_v2(instance, frame.as_raw()) };
        self.superseded(&mut submit);
        Ok(())
    }

    /// Sends a video frame without waiting for the runtime to consume it.
    ///
    /// The runtime keeps reading `frame`'s buffer until the next video submission on
    /// this sender or until the returned guard is dropped or flushed, whichever comes
    /// first. The guard borrows both the frame and the sender, so the buffer cannot be
    /// modified or freed, and the sender cannot be destroyed, while it is in flight.
    ///
    /// For frames built with [`VideoFrame::from_raw_parts`] the borrow checker cannot
    /// see the buffer; debug builds then compare a hash of its contents when the
    /// runtime lets go of it and report [`crate::Error::AsyncBufferMutated`] on a
    /// mismatch. A frame released by a later submission is reported in the log.
    ///
    /// [`Self::send_video_async_owned`] is the safe alternative when the buffer can be
    /// handed over.
    ///
    /// # Safety
    ///
    /// The returned guard must be dropped or flushed before the buffer is modified
    /// or freed. Leaking it, e.g. with [`std::mem::forget`], ends the borrow while the
    /// runtime may still read the buffer; after a leak the buffer must stay intact
    /// until a later submission or [`Self::flush_async_video`] on this sender.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ndi::{FourCC, SendSettings, Sender, VideoFrame};
    ///
    /// # fn main() -> Result<(), ndi::Error> {
    /// # ndi::initialize(None)?;
    /// let sender = Sender::new(&SendSettings::named("Double Buffered"))?;
    /// let buffers = [vec![0u8; 1280 * 720 * 4], vec![255u8; 1280 * 720 * 4]];
    /// let frames = [
    ///     VideoFrame::new(1280, 720, FourCC::Bgra, &buffers[0])?,
    ///     VideoFrame::new(1280, 720, FourCC::Bgra, &buffers[1])?,
    /// ];
    /// // SAFETY: both guards are dropped or flushed below.
    /// let first = unsafe { sender.send_video_async(&frames[0]) }?;
    /// // Submitting the second frame releases the first.
    /// let second = unsafe { sender.send_video_async(&frames[1]) }?;
    /// assert!(!first.is_pending());
    /// second.flush()?;
    /// # Ok(())
    /// # }
    /// ```
    pub unsafe fn send_video_async<'a>(
        &'a self,
        frame: &'a VideoFrame<'a>,
    ) -> Result<AsyncVideoSend<'a>> {
        let instance = self.handle.live()?;
        let mut submit = self.lock_video();
        #[cfg(debug_assertions)]
        let borrowed = BorrowedVideo::new(frame);
        unsafe { self.api.send_send_video_async_v2(instance, frame.as_raw()) };
        self.superseded(&mut submit);
        #[cfg(debug_assertions)]
        {
            submit.borrowed = Some(borrowed);
        }
        Ok(AsyncVideoSend {
            sender: self,
            frame,
            generation: submit.generation,
            finished: false,
        })
    }

    /// Sends an owned video frame without waiting for the runtime to consume it.
    ///
    /// The sender keeps the frame until the next video submission, a
    /// [`Self::flush_async_video`] or its own destruction.
    pub fn send_video_async_owned(&self, frame: OwnedVideoFrame) -> Result<()> {
        let instance = self.handle.live()?;
        let (raw, metadata) = frame.as_video_frame()?.into_raw_parts();
        let held = HeldVideo {
            raw: Box::new(raw),
            _frame: frame,
            _metadata: metadata,
        };
        let mut submit = self.lock_video();
        unsafe { self.api.send_send_video_async_v2(instance, &*held.raw) };
        self.superseded(&mut submit);
        submit.owned = Some(held);
        Ok(())
    }

    /// Waits until the runtime no longer references any asynchronously sent buffer.
    ///
    /// # Errors
    ///
    /// [`crate::Error::AsyncBufferMutated`] in debug builds if the released buffer
    /// changed while the runtime held it.
    pub fn flush_async_video(&self) -> Result<()> {
        let instance = self.handle.live()?;
        let mut submit = self.lock_video();
        unsafe { self.api.send_send_video_async_v2(instance, std::ptr::null()) };
        debug!("Flushed async video on '{}'", self.settings.name);
        submit.released()
    }

    /// Flushes on behalf of the guard holding `generation`, unless a later
    /// submission already released it.
    fn release_async_video(&self, generation: u64) -> Result<()> {
        let instance = self.handle.live()?;
        let mut submit = self.lock_video();
        if submit.generation != generation {
            return Ok(());
        }
        unsafe { self.api.send_send_video_async_v2(instance, std::ptr::null()) };
        submit.released()
    }

    /// Sends planar audio; blocks for the frame's duration when audio is clocked.
    pub fn send_audio(&self, frame: &AudioFrame<'_>) -> Result<()> {
        let instance = self.handle.live()?;
        unsafe { self.api.send_send_audio_v2(instance, frame.as_raw()) };
        Ok(())
    }

    pub fn send_metadata(&self, frame: &MetadataFrame) -> Result<()> {
        let instance = self.handle.live()?;
        unsafe { self.api.send_send_metadata(instance, frame.as_raw()) };
        Ok(())
    }

    /// Waits up to `timeout` for metadata sent upstream by a receiver.
    ///
    /// # Errors
    ///
    /// [`crate::Error::DoubleCapture`] while a previously captured frame is held.
    pub fn capture_metadata(&self, timeout: Duration) -> Result<Option<CapturedMetadata<'_>>> {
        let instance = self.handle.live()?;
        let slot = self.metadata.begin()?;
        let mut metadata = ndi_sys::MetadataFrame::default();
        let frame_type =
            unsafe { self.api.send_capture(instance, &mut metadata, timeout_ms(timeout)) };
        match frame_type {
            ndi_sys::NDIlib_frame_type_metadata => {
                slot.captured();
                Ok(Some(CapturedMetadata::new(
                    MetadataOwner::Send(self),
                    metadata,
                )))
            }
            ndi_sys::NDIlib_frame_type_none => Ok(None),
            other => {
                debug!("Sender '{}' capture returned frame type {other}", self.settings.name);
                Ok(None)
            }
        }
    }

    pub(crate) fn free_metadata(&self, frame: &ndi_sys::MetadataFrame) -> Result<()> {
        let instance = self.handle.live()?;
        unsafe { self.api.send_free_metadata(instance, frame) };
        self.metadata.finish();
        Ok(())
    }

    /// Returns the current tally and whether it changed within `timeout`.
    pub fn tally(&self, timeout: Duration) -> Result<(Tally, bool)> {
        let instance = self.handle.live()?;
        let mut raw = ndi_sys::Tally::default();
        let changed = unsafe { self.api.send_get_tally(instance, &mut raw, timeout_ms(timeout)) };
        Ok((raw.into(), changed))
    }

    /// Number of receivers connected, waiting up to `timeout` for at least one.
    pub fn connections(&self, timeout: Duration) -> Result<usize> {
        let instance = self.handle.live()?;
        let count = unsafe { self.api.send_get_no_connections(instance, timeout_ms(timeout)) };
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Queues metadata sent to every receiver when it connects.
    pub fn add_connection_metadata(&self, frame: &MetadataFrame) -> Result<()> {
        let instance = self.handle.live()?;
        let mut queued = self
            .connection_metadata
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        unsafe { self.api.send_add_connection_metadata(instance, frame.as_raw()) };
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
        unsafe { self.api.send_clear_connection_metadata(instance) };
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

    /// Names the source receivers switch to if this sender goes away; `None` clears
    /// it.
    pub fn set_failover(&self, source: Option<&Source>) -> Result<()> {
        let instance = self.handle.live()?;
        let native = source.map(Source::to_native).transpose()?.map(Box::new);
        let mut failover = self.failover.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = std::mem::replace(&mut *failover, native);
        let ptr = failover
            .as_deref()
            .map_or(std::ptr::null(), NativeSource::as_ptr);
        unsafe { self.api.send_set_failover(instance, ptr) };
        drop(previous);
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn instance(&self) -> Result<ndi_sys::SendInstance> {
        self.handle.live()
    }

    #[cfg(test)]
    pub(crate) fn failover_at(&self) -> Option<usize> {
        self.failover
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            .map(|native| native.as_ptr() as usize)
    }

    /// Explicitly destroys the sender.
    ///
    /// Normally the sender is destroyed automatically when dropped.
    pub fn destroy(mut self) -> Result<()> {
        self.destroy_inner()
    }

    fn destroy_inner(&mut self) -> Result<()> {
        let instance = self.handle.take()?;
        unsafe { self.api.send_destroy(instance) };
        self.lock_video().owned = None;
        debug!("Destroyed NDI sender '{}'", self.settings.name);
        Ok(())
    }
}

impl Drop for Sender {
    fn drop(&mut self) {
        if self.handle.is_live()
            && let Err(err) = self.destroy_inner()
        {
            error!("Failed to destroy NDI sender: {:?}", err);
        }
    }
}

/// A video frame the runtime may still be reading.
///
/// Dropping or [flushing](Self::flush) the guard waits for the runtime to let go of
/// the buffer, unless a later submission on the same sender already did.
#[must_use = "dropping the guard immediately waits for the frame to be consumed"]
pub struct AsyncVideoSend<'a> {
    sender: &'a Sender,
    frame: &'a VideoFrame<'a>,
    generation: u64,
    finished: bool,
}

impl<'a> AsyncVideoSend<'a> {
    /// `true` while no later video submission has released the frame.
    ///
    /// Blocks while another thread is inside a video call on the same sender.
    pub fn is_pending(&self) -> bool {
        self.sender.lock_video().generation == self.generation
    }

    pub fn frame(&self) -> &VideoFrame<'a> {
        self.frame
    }

    /// Releases the frame, waiting for the runtime if it still holds it.
    ///
    /// # Errors
    ///
    /// [`crate::Error::AsyncBufferMutated`] in debug builds if the buffer changed while
    /// the runtime held it.
    pub fn flush(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        self.sender.release_async_video(self.generation)
    }
}

impl Drop for AsyncVideoSend<'_> {
    fn drop(&mut self) {
        if !self.finished
            && let Err(err) = self.finish()
        {
            error!("Async video send released with error: {:?}", err);
        }
    }
}

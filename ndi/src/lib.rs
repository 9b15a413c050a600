// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! # NDI - Network Device Interface
//!
//! Safe, idiomatic Rust bindings for the NDI runtime, covering source discovery,
//! receiving, sending and routing of video, audio and metadata over IP.
//!
//! ## Overview
//!
//! The runtime is a vendor shared object opened at run time; nothing links against
//! it at build time. This crate binds its exports through [`ndi_sys`], then wraps
//! them with RAII handles and frame guards so that the runtime's lifecycle rules
//! are enforced before anything reaches native code.
//!
//! ### Key Concepts
//!
//! - **Runtime**: the shared object, bound once per process by [`initialize`]
//! - **Source**: a named sender on the network ([`Source`])
//! - **Handle**: a finder, receiver, sender or router owning one runtime instance
//! - **Captured frame**: runtime memory lent to the caller until it is released
//!   ([`CapturedVideo`], [`CapturedAudio`], [`CapturedMetadata`])
//! - **Outgoing frame**: a descriptor over caller memory ([`VideoFrame`],
//!   [`AudioFrame`], [`MetadataFrame`])
//!
//! ### Lifecycle Rules
//!
//! - At most one captured frame of each kind per handle; capturing another before
//!   releasing the first fails with [`Error::DoubleCapture`]
//! - A captured frame is released exactly once, explicitly or on drop
//! - Handles are destroyed exactly once, explicitly or on drop
//! - A buffer passed to [`Sender::send_video_async`] stays borrowed until the
//!   returned [`AsyncVideoSend`] guard is released; the guard must not be leaked
//! - A frame passed to [`Sender::send_video_async_owned`] is held by the sender
//!   until the next video submission or flush
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐
//! │ ndi::initialize│  (binds the runtime once)
//! └───────┬────────┘
//!         │
//!         ├─► Finder ───► Vec<Source>
//!         │
//!         ├─► Receiver ─► CapturedVideo / CapturedAudio / CapturedMetadata
//!         │
//!         ├─► Sender ───► VideoFrame / AudioFrame / MetadataFrame
//!         │          └──► AsyncVideoSend   (borrows the frame in flight)
//!         │
//!         └─► Router ───► Source           (virtual source redirect)
//! ```
//!
//! ## Examples
//!
//! ### Receiving video from the first source found
//!
//! ```no_run
//! use std::time::Duration;
//! use ndi::{FindSettings, Finder, Receiver, RecvSettings};
//!
//! # fn main() -> Result<(), ndi::Error> {
//! ndi::initialize(None)?;
//!
//! let finder = Finder::new(&FindSettings::default())?;
//! finder.wait_for_sources(Duration::from_secs(5))?;
//! let Some(source) = finder.current_sources()?.into_iter().next() else {
//!     return Ok(());
//! };
//!
//! let receiver = Receiver::new(&RecvSettings::for_source(source))?;
//! if let Some(frame) = receiver.capture_video(Duration::from_secs(1))? {
//!     println!("{}x{} {:?}", frame.xres(), frame.yres(), frame.fourcc());
//!     let _pixels = frame.data()?;
//! } // the frame goes back to the runtime here
//! # Ok(())
//! # }
//! ```
//!
//! ### Sending video without copying
//!
//! ```no_run
//! use ndi::{FourCC, SendSettings, Sender, VideoFrame};
//!
//! # fn main() -> Result<(), ndi::Error> {
//! ndi::initialize(None)?;
//! let sender = Sender::new(&SendSettings::named("Test Pattern"))?;
//!
//! let pixels = vec![128u8; 1920 * 1080 * 2];
//! let frame = VideoFrame::new(1920, 1080, FourCC::Uyvy, &pixels)?.with_frame_rate(50, 1);
//! // SAFETY: the guard is flushed below, not leaked.
//! let in_flight = unsafe { sender.send_video_async(&frame) }?;
//! // `pixels` stays borrowed until the runtime has let go of it.
//! in_flight.flush()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread Safety
//!
//! - All handles are `Send + Sync`
//! - A receiver's video, audio and metadata streams can be captured from different
//!   threads at once; the generic [`Receiver::capture`] holds all three
//! - Captured frames borrow their handle and cannot outlive it

mod api;
mod error;
mod find;
mod frame;
mod handle;
mod interleave;
mod marshal;
mod recv;
mod routing;
mod send;
mod source;

pub mod config;

#[cfg(test)]
mod fake;

pub use api::{NdiApi, initialize, initialize_with_library, is_initialized, library_path, version};
pub use error::{Error, Result};
pub use find::{FindSettings, Finder};
pub use frame::{
    AudioFrame, CapturedAudio, CapturedMetadata, CapturedVideo, FourCC, FrameFormat, FrameKind,
    FrameRate, MetadataFrame, OwnedAudioFrame, OwnedVideoFrame, TIMECODE_SYNTHESIZE, VideoFrame,
};
pub use handle::HandleKind;
pub use interleave::{from_interleaved, to_interleaved};
pub use recv::{Bandwidth, Capture, ColorFormat, FrameCounters, Performance, Receiver, RecvSettings};
pub use routing::{Router, RoutingSettings};
pub use send::{AsyncVideoSend, SendSettings, Sender};
pub use source::{Source, Tally};

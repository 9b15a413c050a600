// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Metadata frames carrying a single XML string.

use std::{ffi::CString, fmt};

use tracing::error;

use crate::{
    Error, FrameKind, Result,
    frame::TIMECODE_SYNTHESIZE,
    marshal,
    recv::Receiver,
    send::Sender,
};

/// An outgoing metadata frame owning its text.
pub struct MetadataFrame {
    raw: ndi_sys::MetadataFrame,
    data: CString,
}

impl MetadataFrame {
    /// Wraps `data`; `length` is its size in bytes, terminator excluded.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndi::MetadataFrame;
    ///
    /// # fn main() -> Result<(), ndi::Error> {
    /// let frame = MetadataFrame::new(r#"<ndi_capabilities ntk_ptz="true"/>"#)?;
    /// assert_eq!(frame.length(), 34);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(data: &str) -> Result<Self> {
        Self::from_native(marshal::to_native_string(data)?, TIMECODE_SYNTHESIZE)
    }

    fn from_native(data: CString, timecode: i64) -> Result<Self> {
        Ok(Self {
            raw: ndi_sys::MetadataFrame {
                length: marshal::to_c_int(data.as_bytes().len(), "metadata length")?,
                timecode,
                p_data: data.as_ptr().cast_mut(),
            },
            data,
        })
    }

    pub fn with_timecode(mut self, timecode: i64) -> Self {
        self.raw.timecode = timecode;
        self
    }

    pub fn data(&self) -> &str {
        self.data.to_str().unwrap_or_default()
    }

    pub fn length(&self) -> usize {
        self.data.as_bytes().len()
    }

    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    pub(crate) fn as_raw(&self) -> &ndi_sys::MetadataFrame {
        &self.raw
    }
}

impl Clone for MetadataFrame {
    fn clone(&self) -> Self {
        let data = self.data.clone();
        Self {
            raw: ndi_sys::MetadataFrame {
                p_data: data.as_ptr().cast_mut(),
                ..self.raw
            },
            data,
        }
    }
}

impl PartialEq for MetadataFrame {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data && self.raw.timecode == other.raw.timecode
    }
}

impl fmt::Debug for MetadataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataFrame")
            .field("data", &self.data())
            .field("timecode", &self.raw.timecode)
            .finish()
    }
}

/// The handle a captured metadata frame must be returned to.
#[derive(Clone, Copy)]
pub(crate) enum MetadataOwner<'a> {
    Recv(&'a Receiver),
    Send(&'a Sender),
}

/// A metadata frame owned by a receiver or sender until released.
pub struct CapturedMetadata<'a> {
    owner: MetadataOwner<'a>,
    raw: ndi_sys::MetadataFrame,
    released: bool,
}

impl<'a> CapturedMetadata<'a> {
    pub(crate) fn new(owner: MetadataOwner<'a>, raw: ndi_sys::MetadataFrame) -> Self {
        Self {
            owner,
            raw,
            released: false,
        }
    }

    /// The length the runtime reported.
    pub fn length(&self) -> usize {
        usize::try_from(self.raw.length).unwrap_or(0)
    }

    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    /// Copies the text up to its terminator.
    pub fn data(&self) -> Result<String> {
        if self.released {
            return Err(Error::FrameReleased(FrameKind::Metadata));
        }
        Ok(unsafe { marshal::from_native_string(self.raw.p_data) })
    }

    pub fn to_owned_frame(&self) -> Result<MetadataFrame> {
        Ok(MetadataFrame::new(&self.data()?)?.with_timecode(self.raw.timecode))
    }

    /// Gives the frame back to the handle that captured it.
    ///
    /// # Errors
    ///
    /// [`Error::DoubleFree`] if the frame was already released.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::DoubleFree(FrameKind::Metadata));
        }
        self.released = true;
        match self.owner {
            MetadataOwner::Recv(receiver) => receiver.free_metadata(&self.raw),
            MetadataOwner::Send(sender) => sender.free_metadata(&self.raw),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for CapturedMetadata<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = self.release()
        {
            error!("Failed to free captured metadata frame: {:?}", err);
        }
    }
}

impl fmt::Debug for CapturedMetadata<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedMetadata")
            .field("length", &self.raw.length)
            .field("timecode", &self.raw.timecode)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_counts_utf8_bytes() {
        let frame = MetadataFrame::new("<name>Kamera ü</name>").unwrap();
        assert_eq!(frame.length(), 22);
        assert_eq!(frame.as_raw().length, 22);
        assert_eq!(frame.timecode(), TIMECODE_SYNTHESIZE);
    }

    #[test]
    fn clone_points_at_its_own_text() {
        let frame = MetadataFrame::new("<a/>").unwrap().with_timecode(7);
        let copy = frame.clone();
        assert_ne!(copy.as_raw().p_data, frame.as_raw().p_data);
        drop(frame);
        assert_eq!(
            unsafe { marshal::from_native_string(copy.as_raw().p_data) },
            "<a/>"
        );
        assert_eq!(copy.timecode(), 7);
    }

    #[test]
    fn interior_nul_is_rejected() {
        assert!(matches!(
            MetadataFrame::new("<a>\0</a>"),
            Err(Error::NulString(_))
        ));
    }
}

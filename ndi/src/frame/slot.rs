// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Per-kind capture bookkeeping.
//!
//! Each handle has one slot per frame kind it can capture. A slot serializes
//! captures of its kind and remembers whether a captured frame of that kind is still
//! outstanding. Slots of different kinds are independent, so video and audio can be
//! captured from two threads at once.

use std::sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use crate::{Error, FrameKind, Result};

pub(crate) struct CaptureSlot {
    kind: FrameKind,
    capture: Mutex<()>,
    outstanding: AtomicBool,
}

impl CaptureSlot {
    pub(crate) const fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            capture: Mutex::new(()),
            outstanding: AtomicBool::new(false),
        }
    }

    /// Takes the slot for one capture call.
    ///
    /// Fails with [`Error::DoubleCapture`] while a frame of this kind is outstanding.
    pub(crate) fn begin(&self) -> Result<SlotGuard<'_>> {
        let guard = self.capture.lock().unwrap_or_else(PoisonError::into_inner);
        if self.outstanding.load(Ordering::Acquire) {
            return Err(Error::DoubleCapture(self.kind));
        }
        Ok(SlotGuard {
            slot: self,
            _guard: guard,
        })
    }

    /// Marks the outstanding frame as given back to the runtime.
    pub(crate) fn finish(&self) {
        self.outstanding.store(false, Ordering::Release);
    }

    pub(crate) fn is_outstanding(&self) -> bool {
        self.outstanding.load(Ordering::Acquire)
    }
}

pub(crate) struct SlotGuard<'a> {
    slot: &'a CaptureSlot,
    _guard: MutexGuard<'a, ()>,
}

impl SlotGuard<'_> {
    /// Records that the capture produced a frame the caller now owns.
    pub(crate) fn captured(&self) {
        self.slot.outstanding.store(true, Ordering::Release);
    }
}

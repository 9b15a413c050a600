// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Conversions between Rust values and the runtime's C representations.

use std::{
    ffi::{CStr, CString},
    marker::PhantomData,
    os::raw::c_char,
};

use crate::{Error, Result};

/// Copies `value` into a NUL-terminated string.
///
/// A single trailing NUL is accepted and not doubled; any other NUL is an error.
pub(crate) fn to_native_string(value: &str) -> Result<CString> {
    let value = value.strip_suffix('\0').unwrap_or(value);
    Ok(CString::new(value)?)
}

/// Like [`to_native_string`], but maps absent and empty strings to `None`.
///
/// The runtime reads a null pointer as "use the default", which an empty string is
/// not.
pub(crate) fn to_optional_native_string(value: Option<&str>) -> Result<Option<CString>> {
    match value {
        Some(value) if !value.is_empty() => to_native_string(value).map(Some),
        _ => Ok(None),
    }
}

/// The pointer to hand across the boundary for an optional string.
pub(crate) fn ptr_or_null(value: Option<&CString>) -> *const c_char {
    value.map_or(std::ptr::null(), |value| value.as_ptr())
}

/// Copies a runtime-owned string. Null reads as the empty string.
///
/// Invalid UTF-8 is replaced rather than rejected.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string that stays valid for the
/// duration of the call.
pub(crate) unsafe fn from_native_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_string_lossy()
        .into_owned()
}

/// Like [`from_native_string`], but null and empty read as `None`.
///
/// # Safety
///
/// Same as [`from_native_string`].
pub(crate) unsafe fn from_optional_native_string(ptr: *const c_char) -> Option<String> {
    let value = unsafe { from_native_string(ptr) };
    (!value.is_empty()).then_some(value)
}

/// Borrows `len` elements at `ptr`. Null or zero length yields an empty slice.
///
/// # Safety
///
/// Unless null, `ptr` must point at `len` initialized elements that stay valid and
/// unmodified for `'a`.
pub(crate) unsafe fn view_buffer<'a, T>(ptr: *const T, len: usize) -> &'a [T] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

/// Converts a host-side count to the runtime's `int`.
pub(crate) fn to_c_int(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidFrame(format!("{what} {value} out of range")))
}

/// Reads a runtime count, rejecting negative values.
pub(crate) fn from_c_int(value: i32, what: &str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidFrame(format!("negative {what} {value}")))
}

/// A runtime-owned array of C structs.
///
/// Elements are located as `base + index * size_of::<T>()`, the stride the runtime
/// writes them with.
pub(crate) struct NativeArray<'a, T> {
    base: *const u8,
    len: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> NativeArray<'a, T> {
    /// # Safety
    ///
    /// Unless null, `base` must point at `len` consecutive `T` that stay valid for
    /// `'a`.
    pub(crate) unsafe fn new(base: *const T, len: usize) -> Self {
        Self {
            base: base.cast(),
            len: if base.is_null() { 0 } else { len },
            _marker: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, index: usize) -> Option<&'a T> {
        if index >= self.len {
            return None;
        }
        let offset = index * std::mem::size_of::<T>();
        Some(unsafe { &*self.base.add(offset).cast::<T>() })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        (0..self.len).filter_map(|index| self.get(index))
    }
}

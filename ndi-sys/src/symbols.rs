// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Exported entry points of the runtime, bound by exact name.

use std::os::raw::{c_char, c_int};

use crate::{
    AudioFrameInterleaved32f, AudioFrameV2, FindCreate, FindInstance, FrameType, LoadError,
    LoadedApi, MetadataFrame, NdiLib, RecvCreateV3, RecvInstance, RecvPerformance, RoutingCreate,
    RoutingInstance, SendCreate, SendInstance, Source, Tally, VideoFrameV2,
};

/// Declares the symbol table.
///
/// For each entry this generates a field of [`Symbols`], its line in
/// [`Symbols::resolve`], its name in [`SYMBOL_NAMES`], and a forwarding method on
/// [`NdiLib`] so that callers write `lib.recv_capture_v2(...)`.
macro_rules! ndi_symbols {
    ($(
        $(#[$meta:meta])*
        $field:ident = $export:literal: fn($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        /// One resolved function pointer per required export.
        #[derive(Clone, Copy)]
        pub struct Symbols {
            $(pub $field: unsafe extern "C" fn($($ty),*) $(-> $ret)?,)*
        }

        /// Exact export names, in binding order.
        pub const SYMBOL_NAMES: &[&str] = &[$($export),*];

        impl Symbols {
            /// Resolves every export from `library`.
            ///
            /// # Safety
            ///
            /// The exports must have the declared signatures, and the returned pointers
            /// must not outlive `library`.
            pub unsafe fn resolve(library: &libloading::Library) -> Result<Self, LoadError> {
                Ok(Self {
                    $($field: unsafe {
                        *library
                            .get::<unsafe extern "C" fn($($ty),*) $(-> $ret)?>(
                                concat!($export, "\0").as_bytes(),
                            )
                            .map_err(|source| LoadError::SymbolMissing {
                                name: $export,
                                source,
                            })?
                    },)*
                })
            }
        }

        impl NdiLib {
            $(
                $(#[$meta])*
                #[inline]
                pub unsafe fn $field(&self, $($arg: $ty),*) $(-> $ret)? {
                    unsafe { (self.symbols().$field)($($arg),*) }
                }
            )*
        }
    };
}

ndi_symbols! {
    /// Returns a pointer to the runtime's function table, or null if unusable.
    v3_load = "NDIlib_v3_load": fn() -> *const LoadedApi;
    initialize = "NDIlib_initialize": fn() -> bool;
    version = "NDIlib_version": fn() -> *const c_char;

    util_audio_to_interleaved_32f_v2 = "NDIlib_util_audio_to_interleaved_32f_v2":
        fn(src: *const AudioFrameV2, dst: *mut AudioFrameInterleaved32f);
    util_audio_from_interleaved_32f_v2 = "NDIlib_util_audio_from_interleaved_32f_v2":
        fn(src: *const AudioFrameInterleaved32f, dst: *mut AudioFrameV2);

    /// `config` is optional JSON configuration; null selects the defaults.
    send_create_v2 = "NDIlib_send_create_v2":
        fn(settings: *const SendCreate, config: *const c_char) -> SendInstance;
    send_destroy = "NDIlib_send_destroy": fn(instance: SendInstance);
    send_send_video_v2 = "NDIlib_send_send_video_v2":
        fn(instance: SendInstance, frame: *const VideoFrameV2);
    send_send_video_async_v2 = "NDIlib_send_send_video_async_v2":
        fn(instance: SendInstance, frame: *const VideoFrameV2);
    send_send_audio_v2 = "NDIlib_send_send_audio_v2":
        fn(instance: SendInstance, frame: *const AudioFrameV2);
    send_send_metadata = "NDIlib_send_send_metadata":
        fn(instance: SendInstance, frame: *const MetadataFrame);
    send_get_tally = "NDIlib_send_get_tally":
        fn(instance: SendInstance, tally: *mut Tally, timeout_ms: u32) -> bool;
    send_capture = "NDIlib_send_capture":
        fn(instance: SendInstance, metadata: *mut MetadataFrame, timeout_ms: u32) -> FrameType;
    send_free_metadata = "NDIlib_send_free_metadata":
        fn(instance: SendInstance, metadata: *const MetadataFrame);
    send_add_connection_metadata = "NDIlib_send_add_connection_metadata":
        fn(instance: SendInstance, metadata: *const MetadataFrame);
    send_clear_connection_metadata = "NDIlib_send_clear_connection_metadata":
        fn(instance: SendInstance);
    send_set_failover = "NDIlib_send_set_failover":
        fn(instance: SendInstance, source: *const Source);
    send_get_no_connections = "NDIlib_send_get_no_connections":
        fn(instance: SendInstance, timeout_ms: u32) -> c_int;

    find_create_v2 = "NDIlib_find_create_v2": fn(settings: *const FindCreate) -> FindInstance;
    find_destroy = "NDIlib_find_destroy": fn(instance: FindInstance);
    /// The returned array stays valid until the next call or until the finder is destroyed.
    find_get_current_sources = "NDIlib_find_get_current_sources":
        fn(instance: FindInstance, count: *mut u32) -> *const Source;
    find_wait_for_sources = "NDIlib_find_wait_for_sources":
        fn(instance: FindInstance, timeout_ms: u32) -> bool;

    recv_create_v3 = "NDIlib_recv_create_v3": fn(settings: *const RecvCreateV3) -> RecvInstance;
    recv_destroy = "NDIlib_recv_destroy": fn(instance: RecvInstance);
    recv_free_video_v2 = "NDIlib_recv_free_video_v2":
        fn(instance: RecvInstance, frame: *const VideoFrameV2);
    recv_free_audio_v2 = "NDIlib_recv_free_audio_v2":
        fn(instance: RecvInstance, frame: *const AudioFrameV2);
    recv_free_metadata = "NDIlib_recv_free_metadata":
        fn(instance: RecvInstance, frame: *const MetadataFrame);
    /// Any frame pointer may be null to skip that kind.
    recv_capture_v2 = "NDIlib_recv_capture_v2":
        fn(
            instance: RecvInstance,
            video: *mut VideoFrameV2,
            audio: *mut AudioFrameV2,
            metadata: *mut MetadataFrame,
            timeout_ms: u32,
        ) -> FrameType;
    recv_get_performance = "NDIlib_recv_get_performance":
        fn(instance: RecvInstance, total: *mut RecvPerformance, dropped: *mut RecvPerformance);
    recv_set_tally = "NDIlib_recv_set_tally":
        fn(instance: RecvInstance, tally: *const Tally) -> bool;
    recv_send_metadata = "NDIlib_recv_send_metadata":
        fn(instance: RecvInstance, metadata: *const MetadataFrame) -> bool;
    recv_add_connection_metadata = "NDIlib_recv_add_connection_metadata":
        fn(instance: RecvInstance, metadata: *const MetadataFrame);
    recv_clear_connection_metadata = "NDIlib_recv_clear_connection_metadata":
        fn(instance: RecvInstance);

    routing_create = "NDIlib_routing_create":
        fn(settings: *const RoutingCreate) -> RoutingInstance;
    routing_destroy = "NDIlib_routing_destroy": fn(instance: RoutingInstance);
    routing_change = "NDIlib_routing_change":
        fn(instance: RoutingInstance, source: *const Source) -> bool;
    routing_clear = "NDIlib_routing_clear": fn(instance: RoutingInstance) -> bool;
}

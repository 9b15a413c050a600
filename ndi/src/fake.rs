// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! An in-process NDI runtime for unit tests.
//!
//! Implements every export with plain Rust behind `extern "C"` entry points and is
//! installed through [`crate::initialize_with_library`], so tests exercise the same
//! binding path as the real runtime. Receivers replay frames queued with the
//! `push_*` helpers; senders record what they were given and pace clocked sends
//! like the real runtime.

use std::{
    collections::VecDeque,
    ffi::{CStr, CString},
    os::raw::{c_char, c_int, c_void},
    ptr,
    sync::{
        Mutex, MutexGuard, Once, PoisonError,
        atomic::{AtomicI64, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use ndi_sys::{
    AudioFrameInterleaved32f, AudioFrameV2, FindCreate, FindInstance, FrameType, LoadedApi,
    MetadataFrame, NdiLib, RecvCreateV3, RecvInstance, RecvPerformance, RoutingCreate,
    RoutingInstance, SendCreate, SendInstance, Source, Symbols, Tally, VideoFrameV2,
};

use crate::{FourCC, Receiver, Router, Sender};

/// Find groups for which the fake refuses to create a finder.
pub(crate) const REJECTED_GROUP: &str = "rejected-group";
/// Sender name for which the fake refuses to create a sender.
pub(crate) const REJECTED_NAME: &str = "Rejected Sender";

pub(crate) fn install() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        crate::initialize_with_library(NdiLib::from_symbols(symbols()))
            .expect("fake runtime binds");
    });
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

unsafe fn state<'a, T>(instance: *mut c_void) -> &'a T {
    unsafe { &*instance.cast::<T>() }
}

unsafe fn string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }
}

fn into_instance<T>(state: T) -> *mut c_void {
    Box::into_raw(Box::new(state)).cast()
}

unsafe fn destroy<T>(instance: *mut c_void) {
    drop(unsafe { Box::from_raw(instance.cast::<T>()) });
}

/// Blocks like a runtime call that waits up to `timeout_ms` and finds nothing.
fn idle(timeout_ms: u32) {
    if timeout_ms > 0 {
        std::thread::sleep(Duration::from_millis(u64::from(timeout_ms.min(5))));
    }
}

/// Sleeps until the stream's next slot, then books the one after it.
fn pace(deadline: &Mutex<Option<Instant>>, period: Duration) {
    let mut next = lock(deadline);
    let now = Instant::now();
    let slot = match *next {
        Some(at) if at > now => {
            std::thread::sleep(at - now);
            at
        }
        _ => now,
    };
    *next = Some(slot + period);
}

/// Line stride the fake delivers: the packed stride rounded up to 16 bytes.
pub(crate) fn padded_stride(xres: usize, fourcc: FourCC) -> usize {
    fourcc.line_stride(xres).next_multiple_of(16)
}

/// The byte the fake writes at offset `index` of captured video.
pub(crate) fn fill_byte(index: usize) -> u8 {
    (index % 251) as u8
}

/// The value the fake writes for sample `sample` of channel `channel`.
pub(crate) fn audio_sample(channel: usize, sample: usize) -> f32 {
    channel as f32 * 1000.0 + sample as f32
}

unsafe extern "C" fn v3_load() -> *const LoadedApi {
    static TABLE: u8 = 0;
    (&raw const TABLE).cast()
}

pub(crate) unsafe extern "C" fn v3_load_unavailable() -> *const LoadedApi {
    ptr::null()
}

unsafe extern "C" fn initialize() -> bool {
    true
}

pub(crate) unsafe extern "C" fn initialize_refused() -> bool {
    false
}

unsafe extern "C" fn version() -> *const c_char {
    c"FAKE NDI 6.0.0".as_ptr()
}

unsafe extern "C" fn to_interleaved(src: *const AudioFrameV2, dst: *mut AudioFrameInterleaved32f) {
    let (src, dst) = unsafe { (&*src, &mut *dst) };
    let channels = src.no_channels as usize;
    let stride = src.channel_stride_in_bytes as usize / size_of::<f32>();
    for channel in 0..channels {
        for sample in 0..src.no_samples as usize {
            unsafe {
                *dst.p_data.add(sample * channels + channel) =
                    *src.p_data.add(channel * stride + sample);
            }
        }
    }
}

unsafe extern "C" fn from_interleaved(src: *const AudioFrameInterleaved32f, dst: *mut AudioFrameV2) {
    let (src, dst) = unsafe { (&*src, &mut *dst) };
    let channels = src.no_channels as usize;
    let stride = dst.channel_stride_in_bytes as usize / size_of::<f32>();
    for channel in 0..channels {
        for sample in 0..src.no_samples as usize {
            unsafe {
                *dst.p_data.add(channel * stride + sample) =
                    *src.p_data.add(sample * channels + channel);
            }
        }
    }
}

// Find

struct FakeFind {
    sources: Vec<Source>,
    _strings: Vec<CString>,
}

unsafe extern "C" fn find_create(settings: *const FindCreate) -> FindInstance {
    let settings = unsafe { &*settings };
    let groups = unsafe { string(settings.p_groups) };
    if groups.as_deref() == Some(REJECTED_GROUP) {
        return ptr::null_mut();
    }
    let mut listed = vec![
        ("STUDIO (Camera 1)".to_string(), Some("10.0.0.5:5961")),
        ("STUDIO (Camera 2)".to_string(), Some("10.0.0.6:5961")),
    ];
    if settings.show_local_sources {
        listed.push(("THIS-HOST (Local)".to_string(), None));
    }
    if let Some(extra) = unsafe { string(settings.p_extra_ips) } {
        listed.extend(extra.split(',').map(|ip| (format!("REMOTE ({ip})"), None)));
    }

    let mut strings = Vec::new();
    let mut sources = Vec::new();
    for (name, address) in listed {
        let name = CString::new(name).unwrap_or_default();
        let address = address.map(|a| CString::new(a).unwrap_or_default());
        sources.push(Source {
            p_ndi_name: name.as_ptr(),
            p_url_address: address.as_ref().map_or(ptr::null(), |a| a.as_ptr()),
        });
        strings.push(name);
        strings.extend(address);
    }
    into_instance(FakeFind {
        sources,
        _strings: strings,
    })
}

unsafe extern "C" fn find_destroy(instance: FindInstance) {
    unsafe { destroy::<FakeFind>(instance) }
}

unsafe extern "C" fn find_get_current_sources(instance: FindInstance, count: *mut u32) -> *const Source {
    let find = unsafe { state::<FakeFind>(instance) };
    unsafe { *count = find.sources.len() as u32 };
    find.sources.as_ptr()
}

unsafe extern "C" fn find_wait_for_sources(_instance: FindInstance, _timeout_ms: u32) -> bool {
    true
}

// Receive

/// What a fake receiver was created with.
#[derive(Debug, Clone)]
pub(crate) struct RecvSeen {
    pub(crate) source: String,
    pub(crate) address: Option<String>,
    pub(crate) color_format: c_int,
    pub(crate) bandwidth: c_int,
    pub(crate) allow_video_fields: bool,
    pub(crate) name: Option<String>,
}

enum Pending {
    Video { xres: usize, yres: usize, fourcc: FourCC },
    Audio { channels: usize, samples: usize },
    Metadata(String),
    StatusChange,
    ConnectionLost,
}

struct FakeRecv {
    seen: RecvSeen,
    pending: Mutex<VecDeque<Pending>>,
    outstanding: AtomicUsize,
    frees: AtomicUsize,
    totals: [AtomicI64; 3],
    tally: Mutex<Tally>,
    connection_metadata: Mutex<Vec<String>>,
}

impl FakeRecv {
    fn captured(&self, kind: usize) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        self.totals[kind].fetch_add(1, Ordering::SeqCst);
    }

    fn freed(&self) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.frees.fetch_add(1, Ordering::SeqCst);
    }
}

unsafe extern "C" fn recv_create(settings: *const RecvCreateV3) -> RecvInstance {
    let settings = unsafe { &*settings };
    let Some(source) = (unsafe { string(settings.source_to_connect_to.p_ndi_name) }) else {
        return ptr::null_mut();
    };
    into_instance(FakeRecv {
        seen: RecvSeen {
            source,
            address: unsafe { string(settings.source_to_connect_to.p_url_address) },
            color_format: settings.color_format,
            bandwidth: settings.bandwidth,
            allow_video_fields: settings.allow_video_fields,
            name: unsafe { string(settings.p_ndi_recv_name) },
        },
        pending: Mutex::new(VecDeque::new()),
        outstanding: AtomicUsize::new(0),
        frees: AtomicUsize::new(0),
        totals: Default::default(),
        tally: Mutex::new(Tally::default()),
        connection_metadata: Mutex::new(Vec::new()),
    })
}

unsafe extern "C" fn recv_destroy(instance: RecvInstance) {
    unsafe { destroy::<FakeRecv>(instance) }
}

unsafe extern "C" fn recv_capture(
    instance: RecvInstance,
    video: *mut VideoFrameV2,
    audio: *mut AudioFrameV2,
    metadata: *mut MetadataFrame,
    timeout_ms: u32,
) -> FrameType {
    let recv = unsafe { state::<FakeRecv>(instance) };
    let next = {
        let mut pending = lock(&recv.pending);
        pending
            .iter()
            .position(|frame| match frame {
                Pending::Video { .. } => !video.is_null(),
                Pending::Audio { .. } => !audio.is_null(),
                Pending::Metadata(_) => !metadata.is_null(),
                Pending::StatusChange | Pending::ConnectionLost => true,
            })
            .and_then(|index| pending.remove(index))
    };
    let Some(next) = next else {
        idle(timeout_ms);
        return ndi_sys::NDIlib_frame_type_none;
    };

    match next {
        Pending::Video { xres, yres, fourcc } => {
            let stride = padded_stride(xres, fourcc);
            let data: Box<[u8]> = (0..stride * yres).map(fill_byte).collect();
            unsafe {
                *video = VideoFrameV2 {
                    xres: xres as c_int,
                    yres: yres as c_int,
                    FourCC: fourcc.to_raw(),
                    frame_rate_N: 60000,
                    frame_rate_D: 1001,
                    picture_aspect_ratio: 16.0 / 9.0,
                    frame_format_type: ndi_sys::NDIlib_frame_format_type_progressive,
                    timecode: 1_000,
                    p_data: Box::into_raw(data).cast(),
                    line_stride_in_bytes: stride as c_int,
                    p_metadata: ptr::null(),
                    timestamp: ndi_sys::NDIlib_recv_timestamp_undefined,
                }
            };
            recv.captured(0);
            ndi_sys::NDIlib_frame_type_video
        }
        Pending::Audio { channels, samples } => {
            let data: Box<[f32]> = (0..channels * samples)
                .map(|i| audio_sample(i / samples, i % samples))
                .collect();
            unsafe {
                *audio = AudioFrameV2 {
                    sample_rate: 48_000,
                    no_channels: channels as c_int,
                    no_samples: samples as c_int,
                    timecode: 2_000,
                    p_data: Box::into_raw(data).cast(),
                    channel_stride_in_bytes: (samples * size_of::<f32>()) as c_int,
                    p_metadata: ptr::null(),
                    timestamp: 3_000,
                }
            };
            recv.captured(1);
            ndi_sys::NDIlib_frame_type_audio
        }
        Pending::Metadata(text) => {
            let text = CString::new(text).unwrap_or_default();
            unsafe {
                *metadata = MetadataFrame {
                    length: text.as_bytes().len() as c_int,
                    timecode: 4_000,
                    p_data: text.into_raw(),
                }
            };
            recv.captured(2);
            ndi_sys::NDIlib_frame_type_metadata
        }
        Pending::StatusChange => ndi_sys::NDIlib_frame_type_status_change,
        Pending::ConnectionLost => ndi_sys::NDIlib_frame_type_error,
    }
}

unsafe extern "C" fn recv_free_video(instance: RecvInstance, frame: *const VideoFrameV2) {
    let frame = unsafe { &*frame };
    let len = frame.line_stride_in_bytes as usize * frame.yres as usize;
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(frame.p_data, len)) });
    unsafe { state::<FakeRecv>(instance) }.freed();
}

unsafe extern "C" fn recv_free_audio(instance: RecvInstance, frame: *const AudioFrameV2) {
    let frame = unsafe { &*frame };
    let len = frame.no_channels as usize * frame.no_samples as usize;
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(frame.p_data, len)) });
    unsafe { state::<FakeRecv>(instance) }.freed();
}

unsafe extern "C" fn recv_free_metadata(instance: RecvInstance, frame: *const MetadataFrame) {
    drop(unsafe { CString::from_raw((*frame).p_data) });
    unsafe { state::<FakeRecv>(instance) }.freed();
}

unsafe extern "C" fn recv_get_performance(
    instance: RecvInstance,
    total: *mut RecvPerformance,
    dropped: *mut RecvPerformance,
) {
    let recv = unsafe { state::<FakeRecv>(instance) };
    unsafe {
        *total = RecvPerformance {
            video_frames: recv.totals[0].load(Ordering::SeqCst),
            audio_frames: recv.totals[1].load(Ordering::SeqCst),
            metadata_frames: recv.totals[2].load(Ordering::SeqCst),
        };
        *dropped = RecvPerformance::default();
    }
}

unsafe extern "C" fn recv_set_tally(instance: RecvInstance, tally: *const Tally) -> bool {
    *lock(&unsafe { state::<FakeRecv>(instance) }.tally) = unsafe { *tally };
    true
}

unsafe extern "C" fn recv_send_metadata(_instance: RecvInstance, metadata: *const MetadataFrame) -> bool {
    !metadata.is_null()
}

unsafe extern "C" fn recv_add_connection_metadata(instance: RecvInstance, metadata: *const MetadataFrame) {
    let text = unsafe { string((*metadata).p_data) }.unwrap_or_default();
    lock(&unsafe { state::<FakeRecv>(instance) }.connection_metadata).push(text);
}

unsafe extern "C" fn recv_clear_connection_metadata(instance: RecvInstance) {
    lock(&unsafe { state::<FakeRecv>(instance) }.connection_metadata).clear();
}

fn recv_state(receiver: &Receiver) -> &FakeRecv {
    unsafe { state(receiver.instance().expect("live receiver")) }
}

fn push(receiver: &Receiver, frame: Pending) {
    lock(&recv_state(receiver).pending).push_back(frame);
}

pub(crate) fn push_video(receiver: &Receiver, xres: usize, yres: usize, fourcc: FourCC) {
    push(receiver, Pending::Video { xres, yres, fourcc });
}

pub(crate) fn push_audio(receiver: &Receiver, channels: usize, samples: usize) {
    push(receiver, Pending::Audio { channels, samples });
}

pub(crate) fn push_metadata(receiver: &Receiver, text: &str) {
    push(receiver, Pending::Metadata(text.to_string()));
}

pub(crate) fn push_status_change(receiver: &Receiver) {
    push(receiver, Pending::StatusChange);
}

pub(crate) fn push_connection_lost(receiver: &Receiver) {
    push(receiver, Pending::ConnectionLost);
}

pub(crate) fn recv_settings(receiver: &Receiver) -> RecvSeen {
    recv_state(receiver).seen.clone()
}

pub(crate) fn recv_outstanding(receiver: &Receiver) -> usize {
    recv_state(receiver).outstanding.load(Ordering::SeqCst)
}

pub(crate) fn recv_frees(receiver: &Receiver) -> usize {
    recv_state(receiver).frees.load(Ordering::SeqCst)
}

pub(crate) fn recv_tally(receiver: &Receiver) -> crate::Tally {
    (*lock(&recv_state(receiver).tally)).into()
}

pub(crate) fn recv_connection_metadata(receiver: &Receiver) -> Vec<String> {
    lock(&recv_state(receiver).connection_metadata).clone()
}

// Send

struct FakeSend {
    clock_video: bool,
    clock_audio: bool,
    video_deadline: Mutex<Option<Instant>>,
    audio_deadline: Mutex<Option<Instant>>,
    video_count: AtomicUsize,
    audio_count: AtomicUsize,
    async_in_flight: Mutex<Option<usize>>,
    slow_async: Mutex<Option<(c_int, Duration)>>,
    metadata_sent: Mutex<Vec<String>>,
    pending_metadata: Mutex<VecDeque<String>>,
    metadata_frees: AtomicUsize,
    connection_metadata: Mutex<Vec<String>>,
    failover: Mutex<Option<String>>,
    failover_at: Mutex<Option<usize>>,
}

impl FakeSend {
    fn video(&self, frame: &VideoFrameV2) {
        if self.clock_video && frame.frame_rate_N > 0 && frame.frame_rate_D > 0 {
            let period = Duration::from_secs_f64(
                f64::from(frame.frame_rate_D) / f64::from(frame.frame_rate_N),
            );
            pace(&self.video_deadline, period);
        }
        self.video_count.fetch_add(1, Ordering::SeqCst);
    }
}

unsafe extern "C" fn send_create(settings: *const SendCreate, _config: *const c_char) -> SendInstance {
    let settings = unsafe { &*settings };
    if unsafe { string(settings.p_ndi_name) }.as_deref() == Some(REJECTED_NAME) {
        return ptr::null_mut();
    }
    into_instance(FakeSend {
        clock_video: settings.clock_video,
        clock_audio: settings.clock_audio,
        video_deadline: Mutex::new(None),
        audio_deadline: Mutex::new(None),
        video_count: AtomicUsize::new(0),
        audio_count: AtomicUsize::new(0),
        async_in_flight: Mutex::new(None),
        slow_async: Mutex::new(None),
        metadata_sent: Mutex::new(Vec::new()),
        pending_metadata: Mutex::new(VecDeque::new()),
        metadata_frees: AtomicUsize::new(0),
        connection_metadata: Mutex::new(Vec::new()),
        failover: Mutex::new(None),
        failover_at: Mutex::new(None),
    })
}

unsafe extern "C" fn send_destroy(instance: SendInstance) {
    unsafe { destroy::<FakeSend>(instance) }
}

unsafe extern "C" fn send_video(instance: SendInstance, frame: *const VideoFrameV2) {
    let send = unsafe { state::<FakeSend>(instance) };
    send.video(unsafe { &*frame });
    *lock(&send.async_in_flight) = None;
}

unsafe extern "C" fn send_video_async(instance: SendInstance, frame: *const VideoFrameV2) {
    let send = unsafe { state::<FakeSend>(instance) };
    if frame.is_null() {
        *lock(&send.async_in_flight) = None;
        return;
    }
    let frame = unsafe { &*frame };
    send.video(frame);
    *lock(&send.async_in_flight) = Some(frame.p_data as usize);
    let slow = *lock(&send.slow_async);
    if let Some((xres, delay)) = slow
        && frame.xres == xres
    {
        std::thread::sleep(delay);
    }
}

unsafe extern "C" fn send_audio(instance: SendInstance, frame: *const AudioFrameV2) {
    let send = unsafe { state::<FakeSend>(instance) };
    let frame = unsafe { &*frame };
    if send.clock_audio && frame.sample_rate > 0 {
        let period =
            Duration::from_secs_f64(f64::from(frame.no_samples) / f64::from(frame.sample_rate));
        pace(&send.audio_deadline, period);
    }
    send.audio_count.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn send_metadata(instance: SendInstance, frame: *const MetadataFrame) {
    let text = unsafe { string((*frame).p_data) }.unwrap_or_default();
    lock(&unsafe { state::<FakeSend>(instance) }.metadata_sent).push(text);
}

unsafe extern "C" fn send_get_tally(_instance: SendInstance, tally: *mut Tally, _timeout_ms: u32) -> bool {
    unsafe {
        *tally = Tally {
            on_program: true,
            on_preview: false,
        }
    };
    false
}

unsafe extern "C" fn send_capture(instance: SendInstance, metadata: *mut MetadataFrame, timeout_ms: u32) -> FrameType {
    let send = unsafe { state::<FakeSend>(instance) };
    let Some(text) = lock(&send.pending_metadata).pop_front() else {
        idle(timeout_ms);
        return ndi_sys::NDIlib_frame_type_none;
    };
    let text = CString::new(text).unwrap_or_default();
    unsafe {
        *metadata = MetadataFrame {
            length: text.as_bytes().len() as c_int,
            timecode: 5_000,
            p_data: text.into_raw(),
        }
    };
    ndi_sys::NDIlib_frame_type_metadata
}

unsafe extern "C" fn send_free_metadata(instance: SendInstance, frame: *const MetadataFrame) {
    drop(unsafe { CString::from_raw((*frame).p_data) });
    unsafe { state::<FakeSend>(instance) }
        .metadata_frees
        .fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn send_add_connection_metadata(instance: SendInstance, metadata: *const MetadataFrame) {
    let text = unsafe { string((*metadata).p_data) }.unwrap_or_default();
    lock(&unsafe { state::<FakeSend>(instance) }.connection_metadata).push(text);
}

unsafe extern "C" fn send_clear_connection_metadata(instance: SendInstance) {
    lock(&unsafe { state::<FakeSend>(instance) }.connection_metadata).clear();
}

unsafe extern "C" fn send_set_failover(instance: SendInstance, source: *const Source) {
    let send = unsafe { state::<FakeSend>(instance) };
    let name = if source.is_null() {
        None
    } else {
        unsafe { string((*source).p_ndi_name) }
    };
    *lock(&send.failover) = name;
    *lock(&send.failover_at) = (!source.is_null()).then_some(source as usize);
}

unsafe extern "C" fn send_get_no_connections(_instance: SendInstance, timeout_ms: u32) -> c_int {
    idle(timeout_ms);
    0
}

fn send_state(sender: &Sender) -> &FakeSend {
    unsafe { state(sender.instance().expect("live sender")) }
}

pub(crate) fn send_video_count(sender: &Sender) -> usize {
    send_state(sender).video_count.load(Ordering::SeqCst)
}

pub(crate) fn send_audio_count(sender: &Sender) -> usize {
    send_state(sender).audio_count.load(Ordering::SeqCst)
}

/// Address of the buffer the fake still holds from an async send.
pub(crate) fn send_async_in_flight(sender: &Sender) -> Option<usize> {
    *lock(&send_state(sender).async_in_flight)
}

pub(crate) fn send_metadata_sent(sender: &Sender) -> Vec<String> {
    lock(&send_state(sender).metadata_sent).clone()
}

pub(crate) fn push_send_metadata(sender: &Sender, text: &str) {
    lock(&send_state(sender).pending_metadata).push_back(text.to_string());
}

pub(crate) fn send_metadata_frees(sender: &Sender) -> usize {
    send_state(sender).metadata_frees.load(Ordering::SeqCst)
}

pub(crate) fn send_connection_metadata(sender: &Sender) -> Vec<String> {
    lock(&send_state(sender).connection_metadata).clone()
}

pub(crate) fn send_failover(sender: &Sender) -> Option<String> {
    lock(&send_state(sender).failover).clone()
}

/// Address of the source descriptor last passed as failover.
pub(crate) fn send_failover_at(sender: &Sender) -> Option<usize> {
    *lock(&send_state(sender).failover_at)
}

/// Makes async submissions of frames `xres` pixels wide stay inside the runtime
/// call for `delay` after they are recorded as in flight.
pub(crate) fn slow_async_submissions(sender: &Sender, xres: usize, delay: Duration) {
    let xres = c_int::try_from(xres).expect("test width");
    *lock(&send_state(sender).slow_async) = Some((xres, delay));
}

// Routing

struct FakeRouting {
    target: Mutex<Option<String>>,
    target_at: Mutex<Option<usize>>,
}

unsafe extern "C" fn routing_create(_settings: *const RoutingCreate) -> RoutingInstance {
    into_instance(FakeRouting {
        target: Mutex::new(None),
        target_at: Mutex::new(None),
    })
}

unsafe extern "C" fn routing_destroy(instance: RoutingInstance) {
    unsafe { destroy::<FakeRouting>(instance) }
}

unsafe extern "C" fn routing_change(instance: RoutingInstance, source: *const Source) -> bool {
    let Some(name) = (unsafe { string((*source).p_ndi_name) }) else {
        return false;
    };
    let routing = unsafe { state::<FakeRouting>(instance) };
    *lock(&routing.target) = Some(name);
    *lock(&routing.target_at) = Some(source as usize);
    true
}

unsafe extern "C" fn routing_clear(instance: RoutingInstance) -> bool {
    let routing = unsafe { state::<FakeRouting>(instance) };
    *lock(&routing.target) = None;
    *lock(&routing.target_at) = None;
    true
}

pub(crate) fn routing_target(router: &Router) -> Option<String> {
    let routing: &FakeRouting = unsafe { state(router.instance().expect("live router")) };
    lock(&routing.target).clone()
}

/// Address of the source descriptor the current route was set from.
pub(crate) fn routing_target_at(router: &Router) -> Option<usize> {
    let routing: &FakeRouting = unsafe { state(router.instance().expect("live router")) };
    *lock(&routing.target_at)
}

pub(crate) fn symbols() -> Symbols {
    Symbols {
        v3_load,
        initialize,
        version,
        util_audio_to_interleaved_32f_v2: to_interleaved,
        util_audio_from_interleaved_32f_v2: from_interleaved,
        send_create_v2: send_create,
        send_destroy,
        send_send_video_v2: send_video,
        send_send_video_async_v2: send_video_async,
        send_send_audio_v2: send_audio,
        send_send_metadata: send_metadata,
        send_get_tally,
        send_capture,
        send_free_metadata,
        send_add_connection_metadata,
        send_clear_connection_metadata,
        send_set_failover,
        send_get_no_connections,
        find_create_v2: find_create,
        find_destroy,
        find_get_current_sources,
        find_wait_for_sources,
        recv_create_v3: recv_create,
        recv_destroy,
        recv_free_video_v2: recv_free_video,
        recv_free_audio_v2: recv_free_audio,
        recv_free_metadata,
        recv_capture_v2: recv_capture,
        recv_get_performance,
        recv_set_tally,
        recv_send_metadata,
        recv_add_connection_metadata,
        recv_clear_connection_metadata,
        routing_create,
        routing_destroy,
        routing_change,
        routing_clear,
    }
}

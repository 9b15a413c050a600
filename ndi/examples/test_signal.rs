// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Sends moving color bars with a tone.
//!
//! Video goes out asynchronously while the audio of the same frame is submitted;
//! the clocked audio send paces the loop.

mod common;

use std::{f32::consts::TAU, path::PathBuf, time::Duration};

use clap::Parser;
use ndi::{AudioFrame, FourCC, MetadataFrame, SendSettings, Sender, VideoFrame};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Sends an NDI test signal")]
struct Args {
    /// Path of the NDI runtime; defaults to the platform location.
    #[arg(long, env = "NDI_RUNTIME_PATH")]
    library: Option<PathBuf>,

    /// Name of the source on the network.
    #[arg(long, default_value = "Test Signal")]
    name: String,

    #[arg(long, default_value_t = 1280)]
    width: usize,

    #[arg(long, default_value_t = 720)]
    height: usize,

    /// Frames per second.
    #[arg(long, default_value_t = 50)]
    rate: i32,

    /// Number of frames to send; 0 runs forever.
    #[arg(long, default_value_t = 500)]
    frames: u64,
}

const SAMPLE_RATE: i32 = 48_000;
const CHANNELS: usize = 2;
const TONE_HZ: f32 = 1_000.0;

const BARS: [[u8; 4]; 8] = [
    [235, 235, 235, 255],
    [16, 235, 235, 255],
    [235, 235, 16, 255],
    [16, 235, 16, 255],
    [235, 16, 235, 255],
    [16, 16, 235, 255],
    [235, 16, 16, 255],
    [16, 16, 16, 255],
];

/// Fills a BGRA buffer with bars scrolled by `offset` pixels.
fn draw_bars(buffer: &mut [u8], width: usize, offset: usize) {
    for (i, pixel) in buffer.chunks_exact_mut(4).enumerate() {
        let x = (i % width + offset) % width;
        pixel.copy_from_slice(&BARS[x * BARS.len() / width]);
    }
}

fn tone(samples: usize, start: u64) -> Vec<f32> {
    let mut planes = vec![0.0; CHANNELS * samples];
    for (channel, plane) in planes.chunks_exact_mut(samples).enumerate() {
        for (s, value) in plane.iter_mut().enumerate() {
            let t = (start + s as u64) as f32 / SAMPLE_RATE as f32;
            *value = 0.25 * (TAU * TONE_HZ * t).sin() * if channel == 0 { 1.0 } else { 0.5 };
        }
    }
    planes
}

fn main() -> Result<(), ndi::Error> {
    common::setup_logging();
    let args = Args::parse();
    common::initialize(args.library)?;

    let sender = Sender::new(&SendSettings::named(args.name.as_str()))?;
    sender.add_connection_metadata(&MetadataFrame::new(
        r#"<ndi_product long_name="ndi test signal" short_name="test signal"/>"#,
    )?)?;
    info!("Sending '{}' at {}x{}@{}", sender.name(), args.width, args.height, args.rate);

    let samples_per_frame = (SAMPLE_RATE / args.rate.max(1)) as usize;
    let mut buffer = vec![0u8; args.width * args.height * 4];
    let mut sample_clock = 0u64;
    let mut index = 0u64;
    while args.frames == 0 || index < args.frames {
        draw_bars(&mut buffer, args.width, (index as usize * 4) % args.width.max(1));

        let frame = VideoFrame::new(args.width, args.height, FourCC::Bgra, &buffer)?
            .with_frame_rate(args.rate, 1);
        // SAFETY: `in_flight` is flushed before the buffer is redrawn.
        let in_flight = unsafe { sender.send_video_async(&frame) }?;

        let planes = tone(samples_per_frame, sample_clock);
        sender.send_audio(&AudioFrame::new(SAMPLE_RATE, CHANNELS, samples_per_frame, &planes)?)?;
        sample_clock += samples_per_frame as u64;

        if index % u64::try_from(args.rate.max(1)).unwrap_or(1) == 0 {
            let (tally, _) = sender.tally(Duration::ZERO)?;
            info!(
                "frame {index}: {} connection(s), program={} preview={}",
                sender.connections(Duration::ZERO)?,
                tally.on_program,
                tally.on_preview
            );
        }
        in_flight.flush()?;
        index += 1;
    }
    sender.destroy()
}

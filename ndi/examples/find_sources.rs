// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Lists NDI sources on the network, then watches for changes.
//!
//! With `--receive`, connects to the first source found and reports what arrives.

mod common;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use ndi::{Capture, FindSettings, Finder, Receiver, RecvSettings, Source};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about = "Lists NDI sources on the network")]
struct Args {
    /// Path of the NDI runtime; defaults to the platform location.
    #[arg(long, env = "NDI_RUNTIME_PATH")]
    library: Option<PathBuf>,

    /// Comma separated groups to search.
    #[arg(long)]
    groups: Option<String>,

    /// Comma separated addresses to query directly.
    #[arg(long)]
    extra_ips: Option<String>,

    /// Skip sources running on this machine.
    #[arg(long)]
    no_local: bool,

    /// How long to keep watching, in seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// Receive from the first source found instead of watching.
    #[arg(long)]
    receive: bool,
}

fn receive(source: Source, seconds: u64) -> Result<(), ndi::Error> {
    info!("Receiving from {}", source.name);
    let receiver = Receiver::new(&RecvSettings {
        name: Some("find_sources".to_string()),
        ..RecvSettings::for_source(source)
    })?;
    let deadline = std::time::Instant::now() + Duration::from_secs(seconds);
    while std::time::Instant::now() < deadline {
        match receiver.capture(Duration::from_millis(500))? {
            Capture::Video(frame) => info!(
                "video {}x{} {:?} at {}",
                frame.xres(),
                frame.yres(),
                frame.fourcc(),
                frame.frame_rate()
            ),
            Capture::Audio(frame) => info!(
                "audio {} ch x {} samples at {} Hz",
                frame.channels(),
                frame.samples(),
                frame.sample_rate()
            ),
            Capture::Metadata(frame) => info!("metadata {}", frame.data()?),
            Capture::StatusChange => info!("status changed"),
            Capture::ConnectionLost | Capture::None => {}
        }
    }
    let performance = receiver.performance()?;
    info!("total {:?}, dropped {:?}", performance.total, performance.dropped);
    receiver.destroy()
}

fn main() -> Result<(), ndi::Error> {
    common::setup_logging();
    let args = Args::parse();
    common::initialize(args.library)?;

    let finder = Finder::new(&FindSettings {
        show_local_sources: !args.no_local,
        groups: args.groups,
        extra_ips: args.extra_ips,
    })?;

    let deadline = std::time::Instant::now() + Duration::from_secs(args.seconds);
    while std::time::Instant::now() < deadline {
        if !finder.wait_for_sources(Duration::from_secs(1))? {
            continue;
        }
        let sources = finder.current_sources()?;
        if args.receive
            && let Some(first) = sources.first()
        {
            let first = first.clone();
            finder.destroy()?;
            return receive(first, args.seconds);
        }
        info!("{} source(s)", sources.len());
        for source in sources {
            info!(
                "  {} ({})",
                source.name,
                source.address.as_deref().unwrap_or("no address")
            );
        }
    }
    finder.destroy()
}

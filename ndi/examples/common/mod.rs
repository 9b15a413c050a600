// SPDX-FileCopyrightText: 2025 2025 Contributors to the Media eXchange Layer project.
// SPDX-License-Identifier: Apache-2.0

//! Common utilities shared across examples.

use std::path::PathBuf;

/// Initializes tracing subscriber for examples.
///
/// Configures logging to stdout with an INFO level filter, respecting the
/// `RUST_LOG` environment variable for custom log levels.
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

/// Binds the runtime from `--library`, or from the platform default.
pub fn initialize(library: Option<PathBuf>) -> Result<(), ndi::Error> {
    ndi::initialize(library.as_deref())?;
    tracing::info!(
        "Using NDI {} from {}",
        ndi::version()?,
        ndi::library_path().map_or_else(|| "<in-process>".into(), |p| p.display().to_string())
    );
    Ok(())
}

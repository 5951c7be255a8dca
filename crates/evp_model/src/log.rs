// Copyright (C) Microsoft Corporation. All rights reserved.

use std::env::var_os;
use std::fs::File;
use std::io;

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::error::ModelError;
use crate::error::ModelResult;

const ENV_LOG_STDERR: &str = "EVP_MODEL_LOG_STDERR";
const ENV_LOG_FILE: &str = "EVP_MODEL_LOG_FILE";

/// Configure model logging
///
/// Installs a thread-local subscriber filtered by `RUST_LOG`, writing to
/// stderr when `EVP_MODEL_LOG_STDERR` is set and to the file named by
/// `EVP_MODEL_LOG_FILE`. Logging stops when the returned guard is dropped.
pub fn init_log() -> ModelResult<DefaultGuard> {
    let mut layers = Vec::new();

    if var_os(ENV_LOG_STDERR).is_some() {
        let layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_thread_names(true)
            .with_target(true)
            .with_writer(io::stderr)
            .boxed();
        layers.push(layer);
    }

    if let Some(path) = var_os(ENV_LOG_FILE) {
        let file = File::create(path).map_err(|e| ModelError::LogFileError(format!("{e}")))?;
        let layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_ansi(false)
            .with_thread_names(true)
            .with_target(true)
            .with_writer(file)
            .boxed();
        layers.push(layer);
    }

    let registry = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(layers);

    let guard = tracing::subscriber::set_default(registry);
    tracing::info!("evp_model: logging started");
    Ok(guard)
}

/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! File logging for the terminal browser.
//!
//! The terminal belongs to the UI, so log events go to a file. The
//! filter honours `RUST_LOG` and otherwise logs this crate at the
//! configured level and everything else at `warn`.

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use tracing::Level;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::util::TryInitError;

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("opening log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Init(#[from] TryInitError),
}

/// Default log file location.
pub fn default_log_path() -> PathBuf {
    std::env::temp_dir().join("motley.log")
}

/// A subscriber appending formatted events to `path`.
pub fn file_subscriber(
    path: &Path,
    level: Level,
) -> Result<impl Subscriber + Send + Sync + 'static, LoggingError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.to_path_buf(),
            source,
        })?;
    let layer = fmt::layer()
        .with_writer(SharedFile::new(file))
        .with_ansi(false)
        .with_target(true);
    Ok(tracing_subscriber::registry()
        .with(env_filter(level))
        .with(layer))
}

/// Install [`file_subscriber`] as the global default.
pub fn init_file_logging(path: &Path, level: Level) -> Result<(), LoggingError> {
    file_subscriber(path, level)?.try_init()?;
    Ok(())
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("warn,motley={level}"))
    })
}

#[derive(Clone)]
struct SharedFile {
    file: Arc<Mutex<File>>,
}

impl SharedFile {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }
}

struct SharedFileGuard {
    file: Arc<Mutex<File>>,
}

impl Write for SharedFileGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("log file lock poisoned"))?
            .flush()
    }
}

impl<'a> MakeWriter<'a> for SharedFile {
    type Writer = SharedFileGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedFileGuard {
            file: Arc::clone(&self.file),
        }
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid operator-supplied paths, detected before any device I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} seems to be a directory", .0.display())]
    OutputIsDirectory(PathBuf),
    #[error("{} not found", .0.display())]
    InputNotFound(PathBuf),
}

/// Failure of the receive or transmit hardware. Never retried.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("serial device: {0}")]
    Serial(#[from] serialport::Error),
    #[error("device I/O: {0}")]
    Io(#[from] io::Error),
    #[error("partial write: {written} of {expected} bytes accepted")]
    PartialWrite { written: usize, expected: usize },
    #[error("device is not open")]
    NotOpen,
    #[error("receiver state lock poisoned")]
    Poisoned,
    #[cfg(target_os = "linux")]
    #[error("gpio: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("writing {}: {source}", path.display())]
    Output { path: PathBuf, source: io::Error },
    #[error("reading {}: {source}", path.display())]
    Input { path: PathBuf, source: io::Error },
}

impl Error {
    /// Process exit code for a session that ended with this error.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Exit code for an error bubbled up to a binary's `main`.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<Error>().map_or(1, Error::exit_code)
}

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::error::{ConfigError, DeviceError, Error};
use crate::SerialLink;

/// Pause after the write so the UART can drain before the process exits.
pub const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Anything bytes can be pushed out of in a single write.
pub trait SerialSink {
    /// Write all of `data` at once, returning the number of bytes accepted.
    ///
    /// A write that accepts fewer bytes is an error, not a retry.
    fn send_data(&mut self, data: &[u8]) -> Result<usize, DeviceError>;
}

impl SerialSink for SerialLink {
    fn send_data(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        SerialLink::send_data(self, data)
    }
}

/// Read the file to transmit. Fails before any device is touched.
pub fn read_payload(path: &Path) -> Result<Vec<u8>, Error> {
    if !path.is_file() {
        return Err(ConfigError::InputNotFound(path.to_path_buf()).into());
    }
    fs::read(path).map_err(|source| Error::Input {
        path: path.to_path_buf(),
        source,
    })
}

/// Send the contents of `path` through the sink produced by `open`.
///
/// `open` only runs once the file has been read, so a missing file never
/// opens the device. Returns the number of bytes written.
pub fn send<K, F>(path: &Path, open: F, settle: Duration) -> Result<usize, Error>
where
    K: SerialSink,
    F: FnOnce() -> Result<K, DeviceError>,
{
    let payload = read_payload(path)?;
    let mut sink = open()?;
    let written = sink.send_data(&payload)?;
    log::info!("Sent {} bytes from {}", written, path.display());
    thread::sleep(settle);
    Ok(written)
}

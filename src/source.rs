use std::fmt;

use crate::error::DeviceError;

/// Dedup key of a reading: tells the capture loop whether a poll saw new data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Source-supplied receive time in microseconds, changes with every decoded code.
    Timestamp(u64),
    /// The poll returned data at all.
    Presence,
}

/// The latest unit a source holds, together with its marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reading<U> {
    pub marker: Marker,
    pub unit: U,
}

impl<U> Reading<U> {
    pub fn new(marker: Marker, unit: U) -> Self {
        Reading { marker, unit }
    }
}

/// One captured payload.
pub trait Unit {
    /// Line written to the log when the unit is captured.
    fn summary(&self) -> String;
    /// Bytes that replace the contents of the output file.
    fn contents(&self) -> Vec<u8>;
}

/// A decoded 433 MHz code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PulseCode {
    pub code: u64,
    /// Pulse length in microseconds
    pub pulse_length: u32,
    /// rc-switch protocol number (1-based)
    pub protocol: u8,
}

impl fmt::Display for PulseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{}", self.code, self.pulse_length, self.protocol)
    }
}

impl Unit for PulseCode {
    fn summary(&self) -> String {
        self.to_string()
    }
    fn contents(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

/// A raw line received over the LoRa UART.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl Unit for RawBytes {
    fn summary(&self) -> String {
        format!("Received: {}", crate::escape_bytes(&self.0))
    }
    fn contents(&self) -> Vec<u8> {
        self.0.clone()
    }
}

/// A receive channel the capture session polls.
///
/// The session acquires the source before listening and releases it once per
/// acquisition, on every exit path.
pub trait SignalSource {
    type Unit: Unit;

    /// Claim the hardware and start receiving.
    fn acquire(&mut self) -> Result<(), DeviceError>;
    /// Return the latest unit, or `None` if nothing has arrived yet.
    ///
    /// May block briefly, bounded by the device's own read timeout.
    fn poll(&mut self) -> Result<Option<Reading<Self::Unit>>, DeviceError>;
    /// Give the hardware back.
    fn release(&mut self);
}

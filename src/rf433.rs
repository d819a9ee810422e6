//! 433 MHz OOK receiver.
//!
//! The decoder turns edge timings from a cheap superheterodyne receiver into
//! rc-switch style codes. On Linux, [`GpioReceiver`] feeds it from GPIO edge
//! interrupts.

use crate::source::PulseCode;

/// Maximum number of edges recorded for a single frame.
pub const MAX_CHANGES: usize = 67;
/// Allowed deviation from the nominal pulse timing, in percent.
pub const DEFAULT_TOLERANCE: u64 = 80;

/// Gaps longer than this separate frames.
const SYNC_GAP_US: u64 = 5000;
/// Two sync gaps closer than this belong to repeats of the same frame.
const REPEAT_WINDOW_US: u64 = 200;

/// Pulse timing of one rc-switch protocol, in multiples of the base pulse length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Protocol {
    pub pulse_length: u64,
    pub sync_high: u64,
    pub sync_low: u64,
    pub zero_high: u64,
    pub zero_low: u64,
    pub one_high: u64,
    pub one_low: u64,
}

const fn protocol(
    pulse_length: u64,
    sync_high: u64,
    sync_low: u64,
    zero_high: u64,
    zero_low: u64,
    one_high: u64,
    one_low: u64,
) -> Protocol {
    Protocol {
        pulse_length,
        sync_high,
        sync_low,
        zero_high,
        zero_low,
        one_high,
        one_low,
    }
}

/// Known protocols. Protocol number `n` is `PROTOCOLS[n - 1]`.
pub const PROTOCOLS: [Protocol; 6] = [
    protocol(350, 1, 31, 1, 3, 3, 1),
    protocol(650, 1, 10, 1, 2, 2, 1),
    protocol(100, 30, 71, 4, 11, 9, 6),
    protocol(380, 1, 6, 1, 3, 3, 1),
    protocol(500, 6, 14, 1, 2, 2, 1),
    protocol(200, 1, 10, 1, 5, 1, 1),
];

/// A code recovered from the air.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub unit: PulseCode,
    pub bit_length: u32,
    /// Edge time, in microseconds, at which the frame was accepted.
    pub timestamp: u64,
}

/// Edge-timing decoder. Feed it every rising and falling edge.
#[derive(Clone, Debug)]
pub struct Decoder {
    timings: [u64; MAX_CHANGES + 1],
    change_count: usize,
    repeat_count: u32,
    last_timestamp: u64,
    tolerance: u64,
    latest: Option<Decoded>,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    pub fn with_tolerance(tolerance: u64) -> Self {
        Decoder {
            timings: [0; MAX_CHANGES + 1],
            change_count: 0,
            repeat_count: 0,
            last_timestamp: 0,
            tolerance,
            latest: None,
        }
    }

    /// Most recently decoded code, if any.
    pub fn latest(&self) -> Option<Decoded> {
        self.latest
    }

    /// Record an edge seen at `timestamp` microseconds.
    pub fn on_edge(&mut self, timestamp: u64) {
        let duration = timestamp.saturating_sub(self.last_timestamp);

        if duration > SYNC_GAP_US {
            if duration.abs_diff(self.timings[0]) < REPEAT_WINDOW_US {
                self.repeat_count += 1;
                self.change_count = self.change_count.saturating_sub(1);
                if self.repeat_count == 2 {
                    let change_count = self.change_count;
                    for (index, protocol) in PROTOCOLS.iter().enumerate() {
                        if self.decode(protocol, index as u8 + 1, change_count, timestamp) {
                            break;
                        }
                    }
                    self.repeat_count = 0;
                }
            }
            self.change_count = 0;
        }

        if self.change_count >= MAX_CHANGES {
            self.change_count = 0;
            self.repeat_count = 0;
        }
        self.timings[self.change_count] = duration;
        self.change_count += 1;
        self.last_timestamp = timestamp;
    }

    fn decode(
        &mut self,
        protocol: &Protocol,
        number: u8,
        change_count: usize,
        timestamp: u64,
    ) -> bool {
        let delay = self.timings[0] / protocol.sync_low;
        let tolerance = delay * self.tolerance / 100;
        let near = |actual: u64, multiple: u64| actual.abs_diff(delay * multiple) < tolerance;

        let mut code: u64 = 0;
        for i in (1..change_count).step_by(2) {
            let (high, low) = (self.timings[i], self.timings[i + 1]);
            if near(high, protocol.zero_high) && near(low, protocol.zero_low) {
                code <<= 1;
            } else if near(high, protocol.one_high) && near(low, protocol.one_low) {
                code = (code << 1) | 1;
            } else {
                return false;
            }
        }

        if change_count > 6 && code != 0 {
            self.latest = Some(Decoded {
                unit: PulseCode {
                    code,
                    pulse_length: delay as u32,
                    protocol: number,
                },
                bit_length: (change_count / 2) as u32,
                timestamp,
            });
            true
        } else {
            false
        }
    }
}

#[cfg(target_os = "linux")]
pub use gpio::GpioReceiver;

#[cfg(target_os = "linux")]
mod gpio {
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use rppal::gpio::{Gpio, InputPin, Trigger};

    use super::Decoder;
    use crate::error::DeviceError;
    use crate::source::{Marker, PulseCode, Reading, SignalSource};

    /// 433 MHz receiver data line wired to a GPIO pin (BCM numbering).
    pub struct GpioReceiver {
        pin: u8,
        input: Option<InputPin>,
        decoder: Arc<Mutex<Decoder>>,
    }

    impl GpioReceiver {
        pub fn new(pin: u8) -> Self {
            GpioReceiver {
                pin,
                input: None,
                decoder: Arc::new(Mutex::new(Decoder::new())),
            }
        }

        pub fn pin(&self) -> u8 {
            self.pin
        }
    }

    impl SignalSource for GpioReceiver {
        type Unit = PulseCode;

        fn acquire(&mut self) -> Result<(), DeviceError> {
            let mut input = Gpio::new()?.get(self.pin)?.into_input();
            // fresh decoder per acquisition so codes heard before a release are not replayed
            let decoder = Arc::new(Mutex::new(Decoder::new()));
            let shared = Arc::clone(&decoder);
            let epoch = Instant::now();
            input.set_async_interrupt(Trigger::Both, move |_level| {
                let now = epoch.elapsed().as_micros() as u64;
                if let Ok(mut decoder) = shared.lock() {
                    decoder.on_edge(now);
                }
            })?;
            self.decoder = decoder;
            self.input = Some(input);
            log::debug!("receiving on GPIO {}", self.pin);
            Ok(())
        }

        fn poll(&mut self) -> Result<Option<Reading<PulseCode>>, DeviceError> {
            let latest = self
                .decoder
                .lock()
                .map_err(|_| DeviceError::Poisoned)?
                .latest();
            Ok(latest.map(|d| Reading::new(Marker::Timestamp(d.timestamp), d.unit)))
        }

        fn release(&mut self) {
            if let Some(mut input) = self.input.take() {
                if let Err(e) = input.clear_async_interrupt() {
                    log::warn!("clearing GPIO {} interrupt: {}", self.pin, e);
                }
                log::debug!("released GPIO {}", self.pin);
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::thread;

        #[test]
        fn poisoned_decoder_is_a_device_error() {
            let mut receiver = GpioReceiver::new(27);
            assert_eq!(receiver.pin(), 27);
            assert!(matches!(receiver.poll(), Ok(None)));

            let shared = Arc::clone(&receiver.decoder);
            let _ = thread::spawn(move || {
                let _guard = shared.lock();
                panic!("edge handler died");
            })
            .join();

            assert!(matches!(receiver.poll(), Err(DeviceError::Poisoned)));
        }
    }
}

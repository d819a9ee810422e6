use std::io::{self, BufRead, BufReader, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

pub mod error;
pub mod logging;
pub mod operator;
pub mod output;
pub mod rf433;
pub mod session;
pub mod source;
pub mod transmit;

pub use error::{ConfigError, DeviceError, Error};
pub use session::{CancelToken, CaptureConfig, CaptureSession, Outcome};
pub use source::{Marker, PulseCode, RawBytes, Reading, SignalSource, Unit};

/// Baud rate the LoRa UART module uses when receiving.
pub const RX_BAUD_RATE: u32 = 115_200;
/// Baud rate the LoRa UART module uses when transmitting.
pub const TX_BAUD_RATE: u32 = 9_600;
/// Read timeout of the serial device.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Render bytes as an escaped byte-string literal, e.g. `b'hi\n'`.
///
/// Double quotes delimit the literal when the bytes contain `'` but no `"`.
pub fn escape_bytes(buf: &[u8]) -> String {
    let quote = if buf.contains(&b'\'') && !buf.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::with_capacity(buf.len() + 3);
    out.push('b');
    out.push(quote as char);
    for &b in buf {
        match b {
            b'\\' => out.push_str("\\\\"),
            _ if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push(quote as char);
    out
}

/// A LoRa UART module attached to a serial port, 8N1 with a 1 second read timeout.
pub struct SerialLink {
    device: String,
    baud_rate: u32,
    timeout: Duration,
    serial_fd: Option<Box<dyn SerialPort>>,
    reader: Option<BufReader<Box<dyn SerialPort>>>,
}

impl SerialLink {
    /// Create a new link at specified device path and baud rate.
    ///
    /// The device is not opened automatically!
    pub fn new(device: &str, baud_rate: u32) -> Self {
        SerialLink {
            device: device.to_string(),
            baud_rate,
            timeout: READ_TIMEOUT,
            serial_fd: None,
            reader: None,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_open(&self) -> bool {
        self.serial_fd.is_some()
    }

    /// Explicitly open serial device.
    pub fn open(&mut self) -> Result<(), DeviceError> {
        let port = serialport::new(self.device.as_str(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.timeout)
            .open()?;
        self.reader = Some(BufReader::new(port.try_clone()?));
        self.serial_fd = Some(port);
        log::debug!("opened {} at {} baud", self.device, self.baud_rate);
        Ok(())
    }

    /// Read one line from the device.
    ///
    /// Bytes received before the read timeout are returned as a partial line;
    /// an empty vector means nothing arrived.
    pub fn read_line(&mut self) -> Result<Vec<u8>, DeviceError> {
        let reader = self.reader.as_mut().ok_or(DeviceError::NotOpen)?;
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(_) => Ok(line),
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => Ok(line),
            Err(e) => Err(e.into()),
        }
    }

    /// Hand `data` to the device in a single write.
    ///
    /// Opens the device first if needed. A short write is not retried.
    pub fn send_data(&mut self, data: &[u8]) -> Result<usize, DeviceError> {
        if self.serial_fd.is_none() {
            self.open()?;
        }
        let port = self.serial_fd.as_mut().ok_or(DeviceError::NotOpen)?;
        let written = port.write(data)?;
        port.flush()?;
        if written == data.len() {
            Ok(written)
        } else {
            Err(DeviceError::PartialWrite {
                written,
                expected: data.len(),
            })
        }
    }

    /// Close the device. Safe to call when already closed.
    pub fn close(&mut self) {
        self.reader = None;
        if self.serial_fd.take().is_some() {
            log::debug!("closed {}", self.device);
        }
    }
}

impl SignalSource for SerialLink {
    type Unit = RawBytes;

    fn acquire(&mut self) -> Result<(), DeviceError> {
        if !self.is_open() {
            self.open()?;
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Reading<RawBytes>>, DeviceError> {
        let line = self.read_line()?;
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Reading::new(Marker::Presence, RawBytes(line))))
        }
    }

    fn release(&mut self) {
        self.close();
    }
}

/// Returns the default UART device for the platform.
/// It might not be present or called otherwise depending on
/// the system configuration.
pub fn default_serial_device() -> String {
    if cfg!(target_os = "macos") {
        String::from("/dev/tty.SLAB_USBtoUART")
    } else {
        String::from("/dev/ttyS0")
    }
}

/// Print information about all available serial ports on the system.
pub fn dump_all_serial_ports() {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            log::error!("Error listing serial ports: {}", e);
            return;
        }
    };
    match ports.len() {
        0 => println!("No ports found."),
        1 => println!("Found 1 port:"),
        n => println!("Found {} ports:", n),
    };
    for p in ports {
        println!("  {}", p.port_name);
        match p.port_type {
            SerialPortType::UsbPort(info) => {
                println!("    Type: USB");
                println!("    VID:{:04x} PID:{:04x}", info.vid, info.pid);
                println!(
                    "     Serial Number: {}",
                    info.serial_number.as_ref().map_or("", String::as_str)
                );
                println!(
                    "      Manufacturer: {}",
                    info.manufacturer.as_ref().map_or("", String::as_str)
                );
                println!(
                    "           Product: {}",
                    info.product.as_ref().map_or("", String::as_str)
                );
            }
            SerialPortType::BluetoothPort => println!("    Type: Bluetooth"),
            SerialPortType::PciPort => println!("    Type: PCI"),
            SerialPortType::Unknown => println!("    Type: Unknown"),
        }
    }
}

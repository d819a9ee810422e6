use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use rfcapture::{default_serial_device, transmit, DeviceError, SerialLink, TX_BAUD_RATE};

#[derive(Parser)]
#[command(name = "tx868", version, about = "Send a file over a 868 MHz LoRa UART device")]
struct Cli {
    /// File from which data will be sent
    #[arg(short, long, value_name = "INPUT_FILE")]
    file: PathBuf,

    /// Serial device of the LoRa module
    #[arg(short, long, env = "RFCAPTURE_DEVICE", default_value_t = default_serial_device())]
    device: String,

    #[arg(short, long, default_value_t = TX_BAUD_RATE)]
    baud: u32,

    /// Delay after the write before exiting, in milliseconds
    #[arg(long, default_value_t = 200)]
    settle_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    rfcapture::logging::init(cli.verbose);

    if let Err(e) = run(&cli) {
        log::error!("{:#}", e);
        process::exit(rfcapture::error::exit_code(&e));
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let open = || -> Result<SerialLink, DeviceError> {
        let mut link = SerialLink::new(&cli.device, cli.baud);
        link.open()?;
        Ok(link)
    };
    transmit::send(&cli.file, open, Duration::from_millis(cli.settle_ms))
        .with_context(|| format!("sending {}", cli.file.display()))?;
    Ok(())
}

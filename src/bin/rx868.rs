use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use rfcapture::output::OutputFile;
use rfcapture::{
    default_serial_device, dump_all_serial_ports, CaptureConfig, CaptureSession, Error, Outcome,
    SerialLink, RX_BAUD_RATE,
};

#[derive(Parser)]
#[command(name = "rx868", version, about = "Receive bytes from a 868 MHz LoRa UART device")]
struct Cli {
    /// File where data will be written
    #[arg(short, long, value_name = "PATH")]
    output_file: Option<PathBuf>,

    /// Serial device of the LoRa module
    #[arg(short, long, env = "RFCAPTURE_DEVICE", default_value_t = default_serial_device())]
    device: String,

    #[arg(short, long, default_value_t = RX_BAUD_RATE)]
    baud: u32,

    /// Exit after the first payload instead of prompting
    #[arg(long)]
    once: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 200)]
    poll_ms: u64,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    rfcapture::logging::init(cli.verbose);

    if cli.list_ports {
        dump_all_serial_ports();
        return;
    }

    let code = match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            log::error!("{:#}", e);
            rfcapture::error::exit_code(&e)
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let output = cli
        .output_file
        .map(OutputFile::new)
        .transpose()
        .map_err(Error::from)?;
    let config = CaptureConfig {
        poll_interval: Duration::from_millis(cli.poll_ms),
        interactive: !cli.once,
        ..CaptureConfig::default()
    };

    let link = SerialLink::new(&cli.device, cli.baud);
    let mut session = CaptureSession::new(link, config).with_output(output);
    let cancel = session.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("installing interrupt handler")?;

    log::info!("Reading data from {}, Ctrl+C to exit", cli.device);
    let outcome = session
        .run()
        .with_context(|| format!("capturing from {}", cli.device))?;
    log::info!("Captured {} payload(s)", outcome.captured());
    Ok(outcome)
}

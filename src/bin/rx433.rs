use std::path::PathBuf;
use std::process;

use clap::Parser;

use rfcapture::Outcome;

#[derive(Parser)]
#[command(name = "rx433", version, about = "Receives a decimal code via a 433MHz GPIO device")]
struct Cli {
    /// GPIO pin (BCM numbering)
    #[arg(short, long, env = "RFCAPTURE_GPIO", default_value_t = 27)]
    gpio: u8,

    /// File output
    #[arg(short, long, value_name = "PATH")]
    output_file: Option<PathBuf>,

    /// Ask whether to listen again after every code instead of exiting
    #[arg(long)]
    interactive: bool,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 10)]
    poll_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    rfcapture::logging::init(cli.verbose);

    let code = match run(cli) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            log::error!("{:#}", e);
            rfcapture::error::exit_code(&e)
        }
    };
    process::exit(code);
}

#[cfg(target_os = "linux")]
fn run(cli: Cli) -> anyhow::Result<Outcome> {
    use std::time::Duration;

    use anyhow::Context;
    use rfcapture::output::OutputFile;
    use rfcapture::rf433::GpioReceiver;
    use rfcapture::{CaptureConfig, CaptureSession, Error};

    let output = cli
        .output_file
        .map(OutputFile::new)
        .transpose()
        .map_err(Error::from)?;
    let config = CaptureConfig {
        poll_interval: Duration::from_millis(cli.poll_ms),
        interactive: cli.interactive,
        ..CaptureConfig::default()
    };

    let mut session = CaptureSession::new(GpioReceiver::new(cli.gpio), config).with_output(output);
    let cancel = session.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("installing interrupt handler")?;

    log::info!("Listening for codes on GPIO {}", cli.gpio);
    let outcome = session.run().context("capturing from GPIO")?;
    Ok(outcome)
}

#[cfg(not(target_os = "linux"))]
fn run(_cli: Cli) -> anyhow::Result<Outcome> {
    anyhow::bail!("GPIO capture is only supported on Linux")
}

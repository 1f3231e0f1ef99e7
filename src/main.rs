//! CLI Entry Point for co2mini
//!
//! Prints one complete reading (default) or streams every reading (`--watch`)
//! from an attached CO2 mini monitor.
//!
//! # Usage
//!
//! ```bash
//! co2mini                      # co2: 654 ppm / temp: 23
//! co2mini --format json        # {"temp":23.1,"co2":654}
//! co2mini --watch              # one line per reading until Ctrl+C
//! co2mini --simulate --watch   # no hardware required
//! ```
//!
//! Long flags are also accepted with a single dash (`-watch`, `-format=json`).
//!
//! Exit status is 0 on success and 1 on any error (message on stderr).

use anyhow::Result;
use clap::Parser;
use co2mini::acquisition::CancellationToken;
use co2mini::config::{MonitorConfig, DEFAULT_CONFIG_PATH};
use co2mini::error::AppResult;
use co2mini::hardware::{self, MockTransport, Transport};
use co2mini::logging;
use co2mini::output::OutputWriter;
use co2mini::protocol::ProtocolConfig;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "co2mini")]
#[command(about = "Read CO2 concentration and temperature from a CO2 mini monitor", long_about = None)]
struct Cli {
    /// Stream every reading instead of printing one complete value
    #[arg(long)]
    watch: bool,

    /// Output format: plain or json [default: plain]
    #[arg(long)]
    format: Option<String>,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format on stderr (pretty, compact, json)
    #[arg(long)]
    log_format: Option<String>,

    /// Read from a simulated monitor instead of real hardware
    #[arg(long)]
    simulate: bool,
}

/// Long flags that may also be spelled with a single dash.
const SINGLE_DASH_FLAGS: [&str; 6] = [
    "watch",
    "format",
    "config",
    "log-level",
    "log-format",
    "simulate",
];

/// Rewrite `-watch` / `-format=json` to their `--` forms; everything else passes through.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let Some(name) = arg.to_str().and_then(|text| text.strip_prefix('-')) else {
                return arg;
            };
            let flag = name.split('=').next().unwrap_or(name);
            if SINGLE_DASH_FLAGS.contains(&flag) {
                OsString::from(format!("--{}", name))
            } else {
                arg
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = MonitorConfig::load_from(&cli.config)?;
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(level) = cli.log_level {
        config.application.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.application.log_format = format;
    }
    config.validate()?;
    logging::init_from_config(&config)?;
    debug!(?config, "configuration loaded");

    let protocol = config.protocol()?;
    let mut sink = config.output_format()?.writer(std::io::stdout());

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_ok() {
                        info!("interrupt received, stopping");
                        cancel.cancel();
                    }
                }
                // Acquisition finished on its own.
                () = cancel.cancelled() => {}
            }
        }
    });

    if cli.simulate {
        let device = MockTransport::simulated(&protocol);
        acquire(device, &protocol, sink.as_mut(), cli.watch, cancel).await?;
    } else {
        let device = hardware::discover(&protocol.identifier)?;
        acquire(device, &protocol, sink.as_mut(), cli.watch, cancel).await?;
    }
    Ok(())
}

async fn acquire<T: Transport>(
    device: T,
    protocol: &ProtocolConfig,
    sink: &mut dyn OutputWriter,
    watch: bool,
    cancel: CancellationToken,
) -> AppResult<()> {
    info!(device = %device.describe(), watch, "starting acquisition");
    if watch {
        let delivered = co2mini::watch(device, protocol, sink, cancel).await?;
        info!(delivered, "watch finished");
    } else {
        co2mini::oneshot(device, protocol, sink, cancel).await?;
    }
    Ok(())
}

//! # NXT Telemetry
//!
//! Receive telemetry from an NXT balancing robot and print its estimated motion.
//!
//! ## Commands
//!
//! ```bash
//! # Stream from the brick until Ctrl+C
//! nxt-telemetry live --port /dev/rfcomm0
//!
//! # Rebuild the estimate from a recorded CSV log
//! nxt-telemetry --config nxt.toml replay run1.csv
//! ```

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::time::{timeout, Duration};
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use nxt_telemetry::config::{Config, LoggingConfig};
use nxt_telemetry::serial::{pump_once, EndOfStream, NxtSerial, EMPTY_READ_BACKOFF_MS, MAX_EMPTY_READS};
use nxt_telemetry::session::Session;
use nxt_telemetry::telemetry::{CsvSink, TelemetrySink, TracingSink};

/// NXT telemetry receiver
#[derive(Parser, Debug)]
#[command(name = "nxt-telemetry")]
#[command(about = "Decode NXT robot telemetry and estimate its motion", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream from the serial link until Ctrl+C
    Live {
        /// Serial device, overrides `serial.port`
        #[arg(short, long)]
        port: Option<String>,
    },

    /// Replay a record CSV log through the estimator
    Replay {
        /// Record CSV file (header `Time,Data1,...,I2C`)
        file: PathBuf,

        /// Print fixed-width tables instead of snapshot CSV
        #[arg(long)]
        text: bool,
    },
}

/// Main entry point for NXT Telemetry
///
/// # Control Flow
///
/// 1. Load configuration (file or defaults) and set up logging
/// 2. Run the selected command
///    - `live`: read the serial link, feed the session, hand every unit to
///      the sinks, stop on Ctrl+C
///    - `replay`: rebuild records and snapshots from a CSV log
/// 3. Log session totals
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    let _guard = init_logging(&config.logging)?;
    info!("NXT Telemetry v{} starting...", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Live { port } => run_live(&config, port).await,
        Commands::Replay { file, text } => run_replay(&config, &file, text),
    }
}

/// Initialize tracing with an env filter and an optional daily log file
///
/// The returned guard must stay alive for the file writer to flush.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: Level = logging
        .level
        .parse()
        .with_context(|| format!("invalid log level {:?}", logging.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let (file_layer, guard) = if logging.log_dir.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&logging.log_dir, "nxt-telemetry.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Sinks for one run: periodic status logging, plus snapshot CSV on stdout when enabled
fn build_sinks(logging: &LoggingConfig) -> Vec<Box<dyn TelemetrySink + Send>> {
    let mut sinks: Vec<Box<dyn TelemetrySink + Send>> =
        vec![Box::new(TracingSink::new(logging.status_interval))];
    if logging.echo_snapshots {
        sinks.push(Box::new(CsvSink::new(None, Some(io::stdout()))));
    }
    sinks
}

async fn run_live(config: &Config, port: Option<String>) -> Result<()> {
    let path = port.unwrap_or_else(|| config.serial.port.clone());
    let mut serial = NxtSerial::open(&path, config.serial.baud_rate)?;
    info!("NXT serial port opened at: {}", serial.device_path());

    let mut session = Session::new(config.estimator_params());
    let mut sinks = build_sinks(&config.logging);
    let mut buf = vec![0u8; config.serial.read_buffer_size];
    let read_timeout = Duration::from_millis(config.serial.timeout_ms);
    let mut eof = EndOfStream::new(MAX_EMPTY_READS);

    info!("Receiving telemetry, press Ctrl+C to exit");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = timeout(read_timeout, pump_once(&mut serial, &mut session, &mut sinks, &mut buf)) => {
                match result {
                    // Quiet link
                    Err(_) => continue,
                    Ok(Ok(_)) => {
                        if eof.observe(session.bytes_received()) {
                            warn!("Link closed after {} empty reads", eof.empty_reads());
                            break;
                        }
                        if eof.empty_reads() > 0 {
                            tokio::time::sleep(Duration::from_millis(EMPTY_READ_BACKOFF_MS)).await;
                        }
                    }
                    Ok(Err(e)) => {
                        warn!("Stopping: {}", e);
                        return Err(e.into());
                    }
                }
            }

            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    io::stdout().flush()?;
    info!(
        "Total records: {} ({} bytes discarded while resyncing)",
        session.records().len(),
        session.discarded_bytes()
    );
    Ok(())
}

fn run_replay(config: &Config, file: &Path, text: bool) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("opening {}", file.display()))?);

    let mut session = Session::new(config.estimator_params());
    let replayed = session
        .replay_csv(reader)
        .with_context(|| format!("replaying {}", file.display()))?;

    let mut stdout = io::stdout().lock();
    if text {
        write!(stdout, "{}", session.record_text())?;
        writeln!(stdout)?;
        write!(stdout, "{}", session.state_text())?;
    } else {
        let mut status = TracingSink::new(config.logging.status_interval);
        let mut csv = CsvSink::new(None, Some(&mut stdout));
        // snapshots()[0] is the initial snapshot
        for (record, snapshot) in session.records().iter().zip(session.snapshots().iter().skip(1)) {
            status.on_record(record)?;
            status.on_snapshot(snapshot)?;
            csv.on_record(record)?;
            csv.on_snapshot(snapshot)?;
        }
        csv.flush()?;
    }

    info!("Replayed {} records from {}", replayed, file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_live_with_port() {
        let cli = Cli::try_parse_from(["nxt-telemetry", "live", "--port", "/dev/ttyUSB1"]).unwrap();
        assert!(cli.config.is_none());
        match cli.command {
            Commands::Live { port } => assert_eq!(port.as_deref(), Some("/dev/ttyUSB1")),
            other => panic!("Expected live, got: {:?}", other),
        }
    }

    #[test]
    fn test_parse_replay_with_config() {
        let cli = Cli::try_parse_from(["nxt-telemetry", "--config", "nxt.toml", "replay", "run.csv", "--text"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("nxt.toml")));
        match cli.command {
            Commands::Replay { file, text } => {
                assert_eq!(file, PathBuf::from("run.csv"));
                assert!(text);
            }
            other => panic!("Expected replay, got: {:?}", other),
        }
    }

    #[test]
    fn test_replay_requires_file() {
        assert!(Cli::try_parse_from(["nxt-telemetry", "replay"]).is_err());
    }

    #[test]
    fn test_build_sinks() {
        let mut logging = LoggingConfig::default();
        assert_eq!(build_sinks(&logging).len(), 2);

        logging.echo_snapshots = false;
        assert_eq!(build_sinks(&logging).len(), 1);
    }
}

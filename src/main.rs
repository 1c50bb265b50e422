//! imu-sim — headless fake IMU serial device.
//!
//! Opens the configured serial device, waits for the host to request
//! streaming, and replays a frame log at 30 Hz until Ctrl-C.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{mpsc, Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};

use imu_sim::{
    list_ports, start_exit_code, DiagnosticToggles, ExitCodes, LogCatalog, SerialOpener,
    SessionController, SimConfig,
};

/// Fake IMU serial device simulator
#[derive(Parser, Debug)]
#[command(name = "imu-sim", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List serial ports visible on this host
    ListPorts,

    /// List frame logs in the catalog directory
    ListLogs {
        /// Catalog directory (defaults to the configured one)
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Run the simulated device until Ctrl-C
    Run {
        /// Serial device to answer on (e.g. /dev/ttyUSB0)
        #[arg(short, long)]
        device: Option<String>,

        /// Frame log to replay, by file name
        #[arg(short, long)]
        log: Option<String>,

        /// Catalog directory holding the frame logs
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Baud rate
        #[arg(long)]
        baud: Option<u32>,

        /// Trace all traffic as hex/ASCII dumps
        #[arg(long)]
        dump: bool,

        /// Corrupt the checksum bytes of every transmitted frame
        #[arg(long)]
        checksum_error: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::ListPorts => list_ports_cmd(),
        Commands::ListLogs { log_dir } => list_logs_cmd(log_dir),
        Commands::Run {
            device,
            log,
            log_dir,
            baud,
            dump,
            checksum_error,
        } => run_cmd(device, log, log_dir, baud, dump, checksum_error),
    };
    ExitCode::from(code)
}

fn load_config() -> SimConfig {
    SimConfig::load().unwrap_or_else(|e| {
        tracing::warn!("failed to load settings, using defaults: {e}");
        SimConfig::default()
    })
}

fn list_ports_cmd() -> u8 {
    match list_ports() {
        Ok(ports) if ports.is_empty() => {
            println!("no serial ports found");
            ExitCodes::SUCCESS
        }
        Ok(ports) => {
            for port in ports {
                println!("{}", port.port_name);
            }
            ExitCodes::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            ExitCodes::ERROR
        }
    }
}

fn list_logs_cmd(log_dir: Option<PathBuf>) -> u8 {
    let dir = log_dir.unwrap_or_else(|| load_config().log_dir());
    match try_list_logs(&dir) {
        Ok(()) => ExitCodes::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCodes::ERROR
        }
    }
}

fn try_list_logs(dir: &Path) -> anyhow::Result<()> {
    let entries = LogCatalog::new(dir)
        .entries()
        .with_context(|| format!("scanning frame logs in {}", dir.display()))?;
    if entries.is_empty() {
        println!("no frame logs in {}", dir.display());
    }
    for name in entries {
        println!("{name}");
    }
    Ok(())
}

fn run_cmd(
    device: Option<String>,
    log: Option<String>,
    log_dir: Option<PathBuf>,
    baud: Option<u32>,
    dump: bool,
    checksum_error: bool,
) -> u8 {
    if let Err(e) = imu_sim::config::init_directories() {
        tracing::warn!("failed to create application directories: {e}");
    }

    let mut config = load_config();
    if let Some(device) = device {
        config.device = device;
    }
    if let Some(log) = log {
        config.log_file = log;
    }
    if let Some(dir) = log_dir {
        config.log_dir = Some(dir);
    }
    if let Some(baud) = baud {
        config.baud_rate = baud;
    }

    let catalog = LogCatalog::new(config.log_dir());
    let source = match catalog.open(&config.log_file) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("{e}");
            return start_exit_code(&e.into());
        }
    };

    let toggles = Arc::new(DiagnosticToggles::new(
        dump || config.diagnostics.dump,
        checksum_error || config.diagnostics.checksum_error,
    ));
    let opener = Arc::new(SerialOpener::new(config.baud_rate));
    let mut session = SessionController::with_toggles(opener, toggles);

    if let Err(e) = session.start(&config.device, source) {
        tracing::error!("{e}");
        return start_exit_code(&e);
    }

    let (stop_tx, stop_rx) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    }) {
        tracing::error!("failed to install Ctrl-C handler: {e}");
        session.stop();
        return ExitCodes::ERROR;
    }

    tracing::info!(
        "simulating on {}; send \"{}\" to start streaming, Ctrl-C to stop",
        config.device,
        imu_sim::STREAM_COMMAND
    );
    let _ = stop_rx.recv();
    session.stop();

    ExitCodes::SUCCESS
}

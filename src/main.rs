// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// Kermit-style stop-and-wait file transfer
mod checksum;
mod config;
mod frame;
mod protocol;
mod receiver;
mod sender;
mod seq;
mod serial;
mod transport;
mod udp;

use clap::{ArgGroup, Parser, Subcommand, value_parser};
use serialport::{DataBits, Parity, StopBits};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use config::Config;
use protocol::RECV_FILE_PREFIX;
use serial::SerialTransport;
use transport::Transport;
use udp::UdpTransport;

#[derive(Parser)]
#[command(name = "minikermit")]
#[command(about = "Stop-and-wait Kermit-style file transfer over UDP or RS-232", long_about = None)]
#[command(disable_help_subcommand = true)]
#[command(group(ArgGroup::new("link").required(true).args(["udp", "serial"])))]
struct Cli {
    /// UDP port to send to, or to listen on when receiving
    #[arg(long, value_name = "PORT")]
    udp: Option<u16>,

    /// Host for the UDP link
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    #[arg(long, value_name = "DEVICE")]
    serial: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value = "9600")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name = "BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name = "BITS")]
    stop_bits: u8,

    /// Seconds to wait for each reply
    #[arg(long, default_value_t = 5, value_name = "SECS", value_parser = value_parser!(u64).range(1..))]
    timeout: u64,

    /// Attempts per packet before giving up
    #[arg(long, default_value_t = 3, value_parser = value_parser!(u32).range(1..))]
    retries: u32,

    /// Largest data chunk to send or accept
    #[arg(long, default_value_t = 250, value_name = "BYTES", value_parser = value_parser!(u8).range(1..=250))]
    max_len: u8,

    /// Receiver waits forever for the next packet once connected
    #[arg(long)]
    wait_forever: bool,

    /// Warn when the peer's sequence numbers drift from ours
    #[arg(long)]
    check_sequence: bool,

    /// Receiver recognises retransmitted packets and does not write them twice
    #[arg(long)]
    drop_duplicates: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one or more files
    Send {
        /// Files to send
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Receive files until the sender ends the transmission
    Receive {
        /// Directory to save received files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Prefix added to every received file name
        #[arg(long, default_value = RECV_FILE_PREFIX)]
        prefix: String,
    },
}

fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_serial(cli: &Cli, device: &str) -> Result<SerialTransport, String> {
    let data_bits = parse_data_bits(cli.data_bits)?;
    let parity = parse_parity(&cli.parity)?;
    let stop_bits = parse_stop_bits(cli.stop_bits)?;

    println!("Opening serial port: {}", device);
    println!("Settings: {} baud, {:?}, {:?}, {:?}", cli.baud, data_bits, parity, stop_bits);

    SerialTransport::open(device, cli.baud, data_bits, parity, stop_bits)
        .map_err(|e| format!("Failed to open serial port: {}", e))
}

fn open_transport(cli: &Cli) -> Result<Box<dyn Transport>, String> {
    if let Some(device) = &cli.serial {
        return Ok(Box::new(open_serial(cli, device)?));
    }

    let port = cli.udp.ok_or_else(|| "No link selected".to_string())?;
    let link = match cli.command {
        Commands::Send { .. } => {
            println!("Connecting to {}:{} (UDP)", cli.host, port);
            UdpTransport::establish(&cli.host, port)
        }
        Commands::Receive { .. } => UdpTransport::listen(&cli.host, port).inspect(|t| {
            if let Ok(addr) = t.local_addr() {
                println!("Listening on {} (UDP)", addr);
            }
        }),
    };
    link.map(|t| Box::new(t) as Box<dyn Transport>)
        .map_err(|e| format!("Failed to open UDP link: {}", e))
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::new();
    config.timeout = Duration::from_secs(cli.timeout);
    config.retries = cli.retries;
    config.receive_retries = if cli.wait_forever { None } else { Some(cli.retries) };
    config.max_data_len = cli.max_len;
    config.check_sequence = cli.check_sequence;
    config.drop_duplicates = cli.drop_duplicates;
    if let Commands::Receive { prefix, .. } = &cli.command {
        config.recv_prefix = prefix.clone();
    }
    config
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let transport = match open_transport(&cli) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let config = build_config(&cli);

    match cli.command {
        Commands::Send { files } => {
            println!("\nSending {} file(s)", files.len());
            if let Err(e) = send_files(transport, files, config) {
                eprintln!("Send failed: {}", e);
                eprintln!("##### ABORTING TRANSMISSION #####");
                std::process::exit(1);
            }
            println!("\nFiles sent successfully!");
        }
        Commands::Receive { output_dir, .. } => {
            println!("\nReceiving files to: {}", output_dir.display());
            if let Err(e) = receive_files(transport, output_dir, config) {
                eprintln!("Receive failed: {}", e);
                eprintln!("##### ABORTING TRANSMISSION #####");
                std::process::exit(1);
            }
            println!("\nFiles received successfully!");
        }
    }
}

fn send_files(transport: Box<dyn Transport>, files: Vec<PathBuf>, config: Config) -> Result<(), sender::SenderError> {
    use sender::{SenderFsm, Negotiate};

    if let Some(missing) = files.iter().find(|f| !f.is_file()) {
        return Err(sender::SenderError::OpenFile {
            path: missing.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a readable file"),
        });
    }

    let mut state = SenderFsm::<Negotiate>::new(transport, files, config);

    loop {
        match state.step() {
            Ok(next_state) => {
                state = next_state;
            }
            Err(sender::SenderError::TransferComplete) => {
                return Ok(());
            }
            Err(e) => {
                return Err(e);
            }
        }
    }
}

fn receive_files(transport: Box<dyn Transport>, output_dir: PathBuf, config: Config) -> Result<(), receiver::ReceiverError> {
    use receiver::{ReceiverFsm, AwaitNegotiate};

    if !output_dir.is_dir() {
        return Err(receiver::ReceiverError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Output directory not found: {}", output_dir.display()),
        )));
    }

    let mut state = ReceiverFsm::<AwaitNegotiate>::new(transport, output_dir, config);

    loop {
        match state.step() {
            Ok(next_state) => {
                state = next_state;
            }
            Err(receiver::ReceiverError::TransferComplete) => {
                return Ok(());
            }
            Err(e) => {
                return Err(e);
            }
        }
    }
}

// ============================================================================
// End-to-end Tests
// ============================================================================

//! commcheck - ECU network communication checker
//!
//! Loads a node configuration file and runs the communication model checks
//! over it: CANopen manager settings, signal to data pool resolution, message
//! layout rules and element value ranges.

mod commands;
mod config;
mod loader;
mod validator;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use ecunet_model::ProtocolKind;

use crate::config::CommcheckConfig;

#[derive(Parser)]
#[command(name = "commcheck")]
#[command(about = "ECU network communication checker", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Settings file (default: ./commcheck.toml when present)
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check over a node file
    Validate {
        /// Node configuration (.json, .yaml, .yml)
        node_file: PathBuf,

        /// Do not report CANopen devices sharing a node ID with each other
        #[arg(long)]
        no_device_to_device: bool,
    },

    /// Show the data pool elements behind one message
    Signals {
        /// Node configuration (.json, .yaml, .yml)
        node_file: PathBuf,

        /// Protocol kind: layer2, can_open_safety, eces, can_open, j1939
        #[arg(short, long)]
        protocol: ProtocolKind,

        /// CAN interface index
        #[arg(short, long, default_value_t = 0)]
        interface: u32,

        /// Message index within the Tx or Rx side
        #[arg(short, long)]
        message: u32,

        /// Look up a Tx message (default: Rx)
        #[arg(long)]
        tx: bool,
    },

    /// Print the change detection hash of every data pool and CANopen manager
    Hash {
        /// Node configuration (.json, .yaml, .yml)
        node_file: PathBuf,

        /// CRC start value (default from settings)
        #[arg(short, long)]
        seed: Option<u32>,
    },

    /// Print the signal layout rules of each protocol kind
    Policies,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Configure colored output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut settings = CommcheckConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        settings.logging.level = "debug".to_string();
    }
    settings.logging.no_color |= cli.no_color;
    common::logging::init_with_config(&settings.logging)?;

    match cli.command {
        Commands::Validate {
            node_file,
            no_device_to_device,
        } => {
            println!(
                "{} {}",
                "Validating node file:".bright_cyan(),
                node_file.display().to_string().bright_yellow()
            );
            let check_device_to_device = settings.check_device_to_device && !no_device_to_device;
            commands::validate_command(&node_file, check_device_to_device)
        },
        Commands::Signals {
            node_file,
            protocol,
            interface,
            message,
            tx,
        } => commands::signals_command(&node_file, protocol, interface, message, tx),
        Commands::Hash { node_file, seed } => {
            commands::hash_command(&node_file, seed.unwrap_or(settings.hash_seed))
        },
        Commands::Policies => {
            commands::policies_command();
            Ok(ExitCode::SUCCESS)
        },
    }
}

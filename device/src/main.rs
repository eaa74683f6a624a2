// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # bubbl Device
//!
//! Entry point for the `bubbl-device` binary. Parses CLI arguments,
//! initializes logging, opens the data directory and serves the host.
//!
//! The binary supports four subcommands:
//!
//! - `run`     : serve host commands over stdio or a serial node
//! - `init`    : provision a wallet offline
//! - `address` : print one role's Ethereum address
//! - `version` : print build version information

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, OpenOptions};
use std::io::{self, BufReader};
use std::path::Path;

use bubbl_signer::crypto::keys::Role;
use bubbl_signer::vault::WalletStore;
use bubbl_signer::{Dispatcher, StorageConfig};

use cli::{BubblDeviceCli, Commands};

fn main() -> Result<()> {
    let cli = BubblDeviceCli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Run(args) => run_device(args),
        Commands::Init(args) => init_wallet(args),
        Commands::Address(args) => print_address(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Creates the data directory if needed and returns its storage layout.
fn open_storage(data_dir: &Path) -> Result<StorageConfig> {
    fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
    Ok(StorageConfig::new(data_dir))
}

/// Serves the host until it sends `disconnect_usb` or closes the line.
fn run_device(args: cli::RunArgs) -> Result<()> {
    let config = open_storage(&args.storage.data_dir)?;
    let dispatcher = Dispatcher::new(config);

    tracing::info!(
        data_dir = %args.storage.data_dir.display(),
        wallet = dispatcher.wallet().exists(),
        "starting bubbl-device"
    );

    let served = match &args.device {
        Some(path) => {
            let port = OpenOptions::new()
                .read(true)
                .write(true)
                .open(path)
                .with_context(|| format!("failed to open serial device {}", path.display()))?;
            let reader = BufReader::new(
                port.try_clone()
                    .context("failed to duplicate serial device handle")?,
            );
            tracing::info!(device = %path.display(), "serving over serial");
            dispatcher.serve(reader, port)
        }
        None => {
            tracing::info!("serving over stdio");
            dispatcher.serve(io::stdin().lock(), io::stdout().lock())
        }
    };
    served.context("command loop failed")?;

    tracing::info!("bubbl-device stopped");
    Ok(())
}

/// Provisions a wallet and prints the summary as JSON.
fn init_wallet(args: cli::InitArgs) -> Result<()> {
    let config = open_storage(&args.storage.data_dir)?;
    let wallet = WalletStore::new(config);

    let summary = wallet
        .initialize(&args.pin, &args.name, args.new_wallet)
        .context("failed to initialize wallet")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to encode wallet summary")?
    );
    Ok(())
}

/// Prints the address of `--role`.
fn print_address(args: cli::AddressArgs) -> Result<()> {
    let role: Role = args
        .role
        .parse()
        .with_context(|| format!("unknown role {}", args.role))?;
    let wallet = WalletStore::new(StorageConfig::new(&args.storage.data_dir));
    let address = wallet
        .public_address(role)
        .with_context(|| format!("no {role} address in {}", args.storage.data_dir.display()))?;
    println!("{address}");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("bubbl-device {}", env!("CARGO_PKG_VERSION"));
    println!("rustc        {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

//! # CLI Interface
//!
//! Defines the command-line argument structure for `bubbl-device` using
//! `clap` derive. Supports four subcommands: `run`, `init`, `address`,
//! and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// bubbl signing device.
///
/// Holds a USER and an LLM secp256k1 key, signs Ethereum personal messages
/// and EIP-712 typed data for the host over a line protocol, and keeps a
/// ledger of co-signed transactions.
#[derive(Parser, Debug)]
#[command(
    name = "bubbl-device",
    about = "bubbl signing device",
    version,
    propagate_version = true
)]
pub struct BubblDeviceCli {
    /// Default log directive when `RUST_LOG` is not set.
    #[arg(
        long,
        global = true,
        env = "BUBBL_LOG",
        default_value = "bubbl_device=info,bubbl_signer=info"
    )]
    pub log_level: String,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the device binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve host commands until the host disconnects.
    Run(RunArgs),
    /// Provision a wallet without a host: generate keys, set PIN and name.
    Init(InitArgs),
    /// Print the Ethereum address of one role.
    Address(AddressArgs),
    /// Print version information and exit.
    Version,
}

/// Where the wallet lives. Shared by every subcommand that touches it.
#[derive(Args, Debug, Clone)]
pub struct DataDirArg {
    /// Directory holding keys, PIN, name, tables and the system prompt.
    #[arg(long, short = 'd', env = "BUBBL_DATA_DIR", default_value = "/sd")]
    pub data_dir: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub storage: DataDirArg,

    /// Serial device node to talk to the host over.
    ///
    /// When omitted, commands are read from stdin and replies go to stdout.
    #[arg(long, env = "BUBBL_DEVICE")]
    pub device: Option<PathBuf>,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub storage: DataDirArg,

    /// PIN that gates every signature.
    #[arg(long, env = "BUBBL_PIN")]
    pub pin: String,

    /// Display name for the wallet.
    #[arg(long, default_value = bubbl_signer::config::DEFAULT_WALLET_NAME)]
    pub name: String,

    /// Replace an existing wallet. **Destroys the old keys and ledger.**
    #[arg(long)]
    pub new_wallet: bool,
}

/// Arguments for the `address` subcommand.
#[derive(Parser, Debug)]
pub struct AddressArgs {
    #[command(flatten)]
    pub storage: DataDirArg,

    /// Role whose address to print: USER or LLM.
    #[arg(long, default_value = "USER")]
    pub role: String,
}

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use pil_crypto::HashAlgorithm;

#[derive(Parser)]
#[command(
    name = "pil",
    about = "Payout Integrity Ledger: hash-verified partner payouts and document provenance",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum HashArg {
    Blake3,
    Sha256,
}

impl From<HashArg> for HashAlgorithm {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Blake3 => HashAlgorithm::Blake3,
            HashArg::Sha256 => HashAlgorithm::Sha256,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Compute the snapshot hash of an ordered list of conversion ids
    SnapshotHash(SnapshotHashArgs),
    /// Check an ordered list of conversion ids against a snapshot hash
    VerifySnapshot(VerifySnapshotArgs),
    /// Print the effective server configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Overrides `bind_addr` from the configuration
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// JSON file of partners and conversions to preload
    #[arg(long)]
    pub fixtures: Option<PathBuf>,
}

#[derive(Args)]
pub struct SnapshotHashArgs {
    #[arg(long, value_enum, default_value = "blake3")]
    pub hash_function: HashArg,
    /// Conversion ids, in canonical order
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct VerifySnapshotArgs {
    /// Expected snapshot hash (64 lowercase hex characters)
    #[arg(long)]
    pub expected: String,
    #[arg(long, value_enum, default_value = "blake3")]
    pub hash_function: HashArg,
    /// Conversion ids, in canonical order
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from([
            "pil",
            "serve",
            "--config",
            "pil.toml",
            "--bind",
            "0.0.0.0:9000",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("pil.toml")));
            assert_eq!(args.bind, Some("0.0.0.0:9000".parse().unwrap()));
            assert!(args.fixtures.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_snapshot_hash() {
        let cli = Cli::try_parse_from(["pil", "snapshot-hash", "c1", "c2", "c3"]).unwrap();
        if let Command::SnapshotHash(args) = cli.command {
            assert_eq!(args.ids, vec!["c1", "c2", "c3"]);
            assert_eq!(args.hash_function, HashArg::Blake3);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verify_snapshot_with_sha256() {
        let cli = Cli::try_parse_from([
            "pil",
            "--format",
            "json",
            "verify-snapshot",
            "--expected",
            "abc",
            "--hash-function",
            "sha256",
            "c1",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        if let Command::VerifySnapshot(args) = cli.command {
            assert_eq!(args.expected, "abc");
            assert_eq!(HashAlgorithm::from(args.hash_function), HashAlgorithm::Sha256);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        assert!(Cli::try_parse_from(["pil", "serve", "--bind", "nowhere"]).is_err());
    }
}

use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;

use pil_crypto::{HashAlgorithm, SnapshotHasher};
use pil_ledger::{InMemoryLedgerStore, LedgerFixtures};
use pil_server::{AppState, PilServer, ServerConfig};
use pil_types::{ConversionId, Digest};

use crate::cli::{
    Cli, Command, ConfigArgs, OutputFormat, ServeArgs, SnapshotHashArgs, VerifySnapshotArgs,
};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::SnapshotHash(args) => cmd_snapshot_hash(args, &cli.format),
        Command::VerifySnapshot(args) => cmd_verify_snapshot(args, &cli.format),
        Command::Config(args) => cmd_config(args),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path).context("loading server configuration"),
        None => Ok(ServerConfig::default()),
    }
}

fn load_fixtures(path: &Path) -> anyhow::Result<LedgerFixtures> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading fixtures from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing fixtures in {}", path.display()))
}

fn parse_ids(raw: &[String]) -> anyhow::Result<Vec<ConversionId>> {
    raw.iter()
        .map(|id| ConversionId::new(id.as_str()).map_err(anyhow::Error::from))
        .collect()
}

fn snapshot(algorithm: HashAlgorithm, raw: &[String]) -> anyhow::Result<Digest> {
    let ids = parse_ids(raw)?;
    Ok(SnapshotHasher::new(algorithm.function()).hash(&ids))
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    runtime.block_on(async move {
        let store = InMemoryLedgerStore::new();
        if let Some(path) = &args.fixtures {
            let fixtures = load_fixtures(path)?;
            tracing::info!(
                partners = fixtures.partners.len(),
                conversions = fixtures.conversions.len(),
                "fixtures loaded"
            );
            store.load_fixtures(fixtures).await;
        }

        let state = AppState::in_memory(&config, store);
        println!(
            "{} PIL server on {} (hash: {})",
            "✓".green().bold(),
            config.bind_addr.to_string().bold(),
            config.hash_function.to_string().cyan()
        );
        PilServer::new(config, state).serve().await?;
        Ok::<(), anyhow::Error>(())
    })
}

fn cmd_snapshot_hash(args: SnapshotHashArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let algorithm = HashAlgorithm::from(args.hash_function);
    let digest = snapshot(algorithm, &args.ids)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "hashFunction": algorithm.to_string(),
                "conversionIds": args.ids,
                "snapshotHash": digest,
            })
        ),
        OutputFormat::Text => {
            println!("{}", digest.to_hex().yellow());
            println!("  {} ids, {}", args.ids.len().to_string().bold(), algorithm);
        }
    }
    Ok(())
}

fn cmd_verify_snapshot(args: VerifySnapshotArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let expected = Digest::from_hex(&args.expected).context("parsing --expected")?;
    let algorithm = HashAlgorithm::from(args.hash_function);
    let actual = snapshot(algorithm, &args.ids)?;
    let matches = actual == expected;

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "valid": matches, "expected": expected, "actual": actual })
        ),
        OutputFormat::Text if matches => {
            println!("{} Snapshot verified", "✓".green().bold());
        }
        OutputFormat::Text => {
            println!("{} Snapshot mismatch", "✗".red().bold());
            println!("  expected: {}", expected.to_hex().yellow());
            println!("  actual:   {}", actual.to_hex().yellow());
        }
    }
    if !matches {
        bail!("snapshot hash does not match the supplied conversion ids");
    }
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    print!("{}", toml::to_string_pretty(&config).context("rendering configuration")?);
    Ok(())
}

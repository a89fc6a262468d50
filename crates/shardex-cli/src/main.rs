use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shardex_config::{init_tracing, load_for_workspace, ShardexConfig};
use shardex_core::{AbsPathBuf, FileDigest, ProjectScheme, UriResolver};
use shardex_loader::{LoadStats, LoadedShard, ShardLoader, TombstoneReason};
use shardex_storage::{DiskShardStorage, DiskStorageFactory, IndexShard};

#[derive(Parser)]
#[command(name = "shardex", version, about = "Inspect and load persisted index shards")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load the shards of entry files and everything they depend on
    Load(LoadArgs),
    /// Print the contents of a single shard file
    Show(ShowArgs),
}

#[derive(Args)]
struct LoadArgs {
    /// Entry files (translation units); relative paths are resolved against the current directory
    #[arg(required = true)]
    entries: Vec<PathBuf>,
    /// Workspace root used for config discovery (defaults to current directory)
    #[arg(long)]
    root: Option<PathBuf>,
    /// Explicit config file; skips discovery
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ShowArgs {
    /// Path to a `.idx` shard file
    shard_file: PathBuf,
    /// Emit JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            2
        }
    };

    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Load(args) => load(args),
        Command::Show(args) => show(args),
    }
}

fn current_dir() -> Result<AbsPathBuf> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    Ok(AbsPathBuf::new(cwd)?)
}

/// The config in effect and the directory its relative paths are based on.
fn resolve_config(args: &LoadArgs, cwd: &AbsPathBuf) -> Result<(ShardexConfig, AbsPathBuf)> {
    let root = match &args.root {
        Some(root) => AbsPathBuf::absolutize(cwd, root),
        None => cwd.clone(),
    };

    let (config, path) = match &args.config {
        Some(path) => {
            let path = AbsPathBuf::absolutize(cwd, path);
            (ShardexConfig::load_from_path(&path)?, Some(path))
        }
        None => {
            let (config, path) = load_for_workspace(root.as_path())?;
            (config, path.map(AbsPathBuf::new).transpose()?)
        }
    };

    let base_dir = path.and_then(|path| path.parent()).unwrap_or(root);
    Ok((config, base_dir))
}

fn load(args: LoadArgs) -> Result<i32> {
    let cwd = current_dir()?;
    let (config, base_dir) = resolve_config(&args, &cwd)?;
    init_tracing(&config.logging);

    let mut storage_config = config.storage_config(&base_dir);
    if storage_config.project_roots.is_empty() {
        storage_config.project_roots.push(base_dir.clone());
    }
    let factory = DiskStorageFactory::new(&storage_config)
        .context("failed to set up shard storage")?;
    let resolver = UriResolver::default()
        .with_scheme(ProjectScheme::new(storage_config.project_roots.iter().cloned()));

    let entries: Vec<AbsPathBuf> = args
        .entries
        .iter()
        .map(|entry| AbsPathBuf::absolutize(&cwd, entry))
        .collect();
    tracing::debug!(
        target: "shardex.cli",
        entries = entries.len(),
        roots = storage_config.project_roots.len(),
        "loading shards"
    );

    let mut loader = ShardLoader::new(&factory).with_resolver(resolver);
    for entry in &entries {
        loader.load(entry);
    }
    let stats = loader.stats();
    let shards = loader.finish();

    let report = LoadReport {
        shards: shards.iter().map(ShardSummary::from).collect(),
        stats,
    };
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_load_report(&report);
    }

    // A missing shard for an entry file means nothing was loaded on its behalf.
    let entry_failed = shards
        .iter()
        .any(|shard| !shard.is_loaded() && entries.contains(&shard.absolute_path));
    Ok(if entry_failed { 1 } else { 0 })
}

#[derive(Serialize)]
struct LoadReport {
    shards: Vec<ShardSummary>,
    stats: LoadStats,
}

#[derive(Serialize)]
struct ShardSummary {
    path: String,
    dependent_tu: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tombstone: Option<TombstoneReason>,
    count_references: bool,
    had_errors: bool,
    includes: usize,
    payload_bytes: usize,
}

impl From<&LoadedShard> for ShardSummary {
    fn from(shard: &LoadedShard) -> Self {
        let index = shard.shard();
        Self {
            path: shard.absolute_path.to_string(),
            dependent_tu: shard.dependent_tu.to_string(),
            digest: shard.digest().map(|digest| digest.to_hex()),
            tombstone: shard.tombstone_reason(),
            count_references: shard.count_references,
            had_errors: shard.had_errors,
            includes: shard.dependencies,
            payload_bytes: index.map_or(0, |index| index.payload.len()),
        }
    }
}

fn print_load_report(report: &LoadReport) {
    for shard in &report.shards {
        match (&shard.digest, shard.tombstone) {
            (Some(digest), _) => {
                let mut flags = Vec::new();
                if shard.count_references {
                    flags.push("tu");
                }
                if shard.had_errors {
                    flags.push("errors");
                }
                println!(
                    "loaded    {} [{}] digest={} includes={} from {}",
                    shard.path,
                    flags.join(","),
                    digest,
                    shard.includes,
                    shard.dependent_tu
                );
            }
            (None, reason) => {
                let reason = reason.map(|reason| reason.to_string()).unwrap_or_default();
                println!(
                    "tombstone {} ({}) from {}",
                    shard.path, reason, shard.dependent_tu
                );
            }
        }
    }

    let stats = &report.stats;
    println!(
        "{} shards from {} entry files: {} loaded, {} tombstones, {} cache hits, {} skipped references",
        report.shards.len(),
        stats.entry_files,
        stats.fresh_loads - stats.tombstones,
        stats.tombstones,
        stats.cache_hits,
        stats.skipped_references
    );
}

#[derive(Serialize)]
struct ShardFileDump<'a> {
    source: &'a str,
    shard: &'a IndexShard,
}

fn show(args: ShowArgs) -> Result<i32> {
    let (source, shard) = read_shard(&args.shard_file)?;
    if args.json {
        let dump = ShardFileDump {
            source: &source,
            shard: &shard,
        };
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(0);
    }

    println!("source: {source}");
    println!("payload: {} bytes", shard.payload.len());
    let Some(sources) = &shard.sources else {
        println!("include graph: none");
        return Ok(0);
    };
    println!("include graph: {} sources", sources.len());
    for (identifier, node) in sources {
        let digest = if node.digest == FileDigest::ZERO {
            "-".to_owned()
        } else {
            node.digest.to_hex()
        };
        println!("  {identifier} digest={digest} flags={:?}", node.flags);
        for include in &node.direct_includes {
            println!("    -> {include}");
        }
    }
    Ok(0)
}

fn read_shard(path: &Path) -> Result<(String, IndexShard)> {
    if !path.is_file() {
        anyhow::bail!("shard file {} does not exist", path.display());
    }
    DiskShardStorage::read_shard_file(path)
        .with_context(|| format!("{} is not a readable shard file", path.display()))
}

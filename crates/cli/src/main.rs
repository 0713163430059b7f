use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use codectx_graph::{DependencyGraph, GraphAnalyzer, DEFAULT_DAMPING, DEFAULT_ITERATIONS};
use codectx_search::Retriever;
use codectx_stores::StoreBuilder;
use codectx_units::{parse_units, Unit};
use config::AppConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};

mod config;

#[derive(Parser)]
#[command(name = "codectx")]
#[command(about = "Dependency graph analysis and budgeted context retrieval over extracted code units", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Extracted units (JSON array)
    #[arg(long, global = true)]
    units: Option<PathBuf>,

    /// Saved graph snapshot, used instead of --units where a graph suffices
    #[arg(long, global = true, conflicts_with = "units")]
    graph: Option<PathBuf>,

    /// TOML config with [retrieval], [stores] and [analyzer] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Orphans, dead ends, hubs, cycles and bridges of the dependency graph
    Analyze(AnalyzeArgs),

    /// Units transitively affected by changes to the given files
    Impact(ImpactArgs),

    /// PageRank scores and importance buckets
    Importance(ImportanceArgs),

    /// Write the graph snapshot (stdout unless --output is set)
    Export(ExportArgs),

    /// Retrieve budgeted context for a natural-language query
    Query(QueryArgs),
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Override the configured hub limit
    #[arg(long)]
    hub_limit: Option<usize>,

    /// Override the configured bridge limit
    #[arg(long)]
    bridge_limit: Option<usize>,

    /// Print only the structural overview text
    #[arg(long)]
    overview: bool,
}

#[derive(Args)]
struct ImpactArgs {
    /// Changed file paths
    #[arg(required = true)]
    files: Vec<String>,

    /// Maximum reverse-dependency hops (unlimited when absent)
    #[arg(long)]
    depth: Option<usize>,
}

#[derive(Args)]
struct ImportanceArgs {
    #[arg(long, default_value_t = DEFAULT_DAMPING)]
    damping: f64,

    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,
}

#[derive(Args)]
struct ExportArgs {
    /// Snapshot destination
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct QueryArgs {
    /// Natural-language query
    query: String,

    /// Override the configured token budget
    #[arg(long)]
    budget: Option<usize>,

    /// Skip the structural overview section
    #[arg(long)]
    no_overview: bool,
}

#[derive(Serialize)]
struct ImpactOutput<'a> {
    changed_files: &'a [String],
    max_depth: Option<usize>,
    affected: Vec<String>,
}

#[derive(Serialize)]
struct ImportanceEntry {
    identifier: String,
    score: f64,
    bucket: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = AppConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Analyze(args) => run_analyze(&cli, args, config)?,
        Commands::Impact(args) => run_impact(&cli, args)?,
        Commands::Importance(args) => run_importance(&cli, args)?,
        Commands::Export(args) => run_export(&cli, args)?,
        Commands::Query(args) => run_query(&cli, args, config).await?,
    }

    Ok(())
}

fn read_units(path: &Path) -> Result<Vec<Unit>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read units {}", path.display()))?;
    let units = parse_units(&json).with_context(|| format!("Invalid units file {}", path.display()))?;
    log::info!("Loaded {} units from {}", units.len(), path.display());
    Ok(units)
}

fn require_units(cli: &Cli) -> Result<Vec<Unit>> {
    match &cli.units {
        Some(path) => read_units(path),
        None => bail!("--units <file.json> is required for this command"),
    }
}

/// Graph from a snapshot when given, else built from units
fn load_graph(cli: &Cli) -> Result<DependencyGraph> {
    if let Some(path) = &cli.graph {
        return DependencyGraph::load(path)
            .with_context(|| format!("Failed to load graph snapshot {}", path.display()));
    }
    let units = require_units(cli)?;
    Ok(DependencyGraph::from_units(&units))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_analyze(cli: &Cli, args: &AnalyzeArgs, config: AppConfig) -> Result<()> {
    let graph = load_graph(cli)?;
    let mut analyzer_config = config.analyzer;
    if let Some(limit) = args.hub_limit {
        analyzer_config.hub_limit = limit;
    }
    if let Some(limit) = args.bridge_limit {
        analyzer_config.bridge_limit = limit;
    }

    let report = GraphAnalyzer::with_config(&graph, analyzer_config).analyze();
    if args.overview {
        println!("{}", codectx_graph::StructuralOverview::render(&graph, Some(&report)));
        return Ok(());
    }
    print_json(&report)
}

fn run_impact(cli: &Cli, args: &ImpactArgs) -> Result<()> {
    let graph = load_graph(cli)?;
    let affected = graph.affected_by(&args.files, args.depth);
    if affected.is_empty() {
        log::warn!("None of the changed files map to a known unit");
    }
    print_json(&ImpactOutput {
        changed_files: &args.files,
        max_depth: args.depth,
        affected,
    })
}

fn run_importance(cli: &Cli, args: &ImportanceArgs) -> Result<()> {
    if !(0.0..=1.0).contains(&args.damping) {
        bail!("--damping must be within [0, 1] (got {})", args.damping);
    }
    let graph = load_graph(cli)?;
    let scores = graph.pagerank(args.damping, args.iterations);
    let buckets = graph.importance_buckets();

    let mut entries: Vec<ImportanceEntry> = scores
        .into_iter()
        .map(|(identifier, score)| ImportanceEntry {
            bucket: buckets
                .get(&identifier)
                .map(|b| b.as_str().to_string())
                .unwrap_or_default(),
            identifier,
            score,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    print_json(&entries)
}

fn run_export(cli: &Cli, args: &ExportArgs) -> Result<()> {
    let graph = load_graph(cli)?;
    match &args.output {
        Some(path) => {
            graph
                .save(path)
                .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
            log::info!("Snapshot written to {}", path.display());
        }
        None => println!("{}", graph.to_json()?),
    }
    Ok(())
}

async fn run_query(cli: &Cli, args: &QueryArgs, config: AppConfig) -> Result<()> {
    let units = require_units(cli)?;
    let stores = StoreBuilder::new(config.stores)
        .build()
        .context("Failed to build stores")?;
    let graph = stores.index_units(units).await.context("Indexing failed")?;

    let mut retriever = Retriever::new(&stores, config.retrieval)?;
    if !args.no_overview {
        retriever = retriever.with_graph(&graph);
    }

    let budget = args.budget.unwrap_or(retriever.config().budget);
    if budget == 0 {
        bail!("--budget must be > 0");
    }
    let result = retriever
        .retrieve_with_budget(&args.query, budget)
        .await
        .with_context(|| format!("Retrieval failed for '{}'", args.query))?;
    print_json(&result)
}

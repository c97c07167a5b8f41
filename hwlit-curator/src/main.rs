//! hwlit-curator - AI-for-hardware literature pipeline
//!
//! Subcommands:
//! - `harvest`: query arXiv and merge new papers into the collection
//! - `classify`: label papers as AI-for-hardware or not
//! - `tag`: assign subtopic tags to the positive papers
//! - `sort`: re-sort a collection by publication date

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hwlit_common::config::{load_toml_config, resolve_config_path, resolve_credentials, TomlConfig};
use hwlit_curator::services::{
    ArxivClient, ArxivClientConfig, CompletionService, EngineConfig, MergePolicy, OpenAiClient,
    RetryPolicy, DEFAULT_QUERIES,
};
use hwlit_curator::workflow::{
    self, filtered_path, labeled_path, unlabeled_path, Baseline, ClassifyOptions, DataPaths,
    HarvestOptions, TagOptions,
};

/// Command-line arguments for hwlit-curator
#[derive(Parser, Debug)]
#[command(name = "hwlit-curator")]
#[command(about = "Harvest, classify and tag AI-for-hardware papers from arXiv")]
#[command(version)]
struct Args {
    /// Bootstrap TOML file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch papers and merge them into the collection
    Harvest(HarvestArgs),
    /// Label papers with `ai_for_hw`
    Classify(ClassifyArgs),
    /// Tag positive papers with subtopics
    Tag(TagArgs),
    /// Sort a collection newest first, in place
    Sort(SortArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    /// Replace the collection with this run's results
    #[value(alias = "0")]
    Full,
    /// Prepend unseen papers to the existing collection
    #[value(alias = "1")]
    Incremental,
}

#[derive(clap::Args, Debug)]
struct HarvestArgs {
    #[arg(long, value_enum)]
    mode: Mode,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Search query; repeat to replace the built-in set
    #[arg(long = "query")]
    queries: Vec<String>,

    /// Per-query result cap
    #[arg(long)]
    max_results: Option<usize>,
}

/// Options shared by the LLM-backed stages
#[derive(clap::Args, Debug)]
struct LlmArgs {
    #[arg(long)]
    model: Option<String>,

    /// Concurrent API requests
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Key file used when OPENAI_API_KEY is unset (JSON or plain text)
    #[arg(long)]
    api_key_file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ClassifyArgs {
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Defaults to `<input stem>_labeled.json`
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Defaults to `filter_papers.json` in the output directory
    #[arg(long)]
    filtered_output: Option<PathBuf>,

    /// Labeled collection; only papers missing from it are classified
    #[arg(long)]
    diff_against: Option<PathBuf>,

    /// Re-classify papers that already carry a label (no effect with a baseline)
    #[arg(long)]
    overwrite: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(clap::Args, Debug)]
struct TagArgs {
    #[arg(short, long)]
    input: Option<PathBuf>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Re-tag every input paper, discarding the existing output
    #[arg(long)]
    overwrite: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(clap::Args, Debug)]
struct SortArgs {
    /// Defaults to the filtered collection
    #[arg(short, long)]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let loaded = load_toml_config(config_path.as_deref(), args.config.is_some())
        .context("Failed to load configuration")?;
    let config = &loaded.config;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("hwlit-curator {}", env!("CARGO_PKG_VERSION"));
    loaded.log_source();

    let paths = DataPaths::new(&config.data_dir);

    match args.command {
        Command::Harvest(cmd) => harvest(cmd, config, &paths).await,
        Command::Classify(cmd) => classify(cmd, config, &paths).await,
        Command::Tag(cmd) => tag(cmd, config, &paths).await,
        Command::Sort(cmd) => {
            let file = cmd.file.unwrap_or_else(|| paths.filtered());
            workflow::run_sort(&file)?;
            Ok(())
        }
    }
}

async fn harvest(cmd: HarvestArgs, config: &TomlConfig, paths: &DataPaths) -> Result<()> {
    let queries = if cmd.queries.is_empty() {
        DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        cmd.queries
    };
    let opts = HarvestOptions {
        output: cmd.output.unwrap_or_else(|| paths.harvested()),
        queries,
        max_results: cmd.max_results.unwrap_or(config.max_results),
        policy: match cmd.mode {
            Mode::Full => MergePolicy::FullRebuild,
            Mode::Incremental => MergePolicy::Incremental,
        },
    };

    let client = ArxivClient::with_config(ArxivClientConfig {
        retry: retry_policy(config),
        ..ArxivClientConfig::default()
    })
    .context("Failed to create arXiv client")?;
    let report = workflow::run_harvest(&client, &opts).await?;

    for failed in report.queries.iter().filter(|q| q.error.is_some()) {
        warn!(query = %failed.query, fetched = failed.fetched, "Query ended early");
    }
    info!(
        "Harvest complete: {} unique, {} new, {} in collection",
        report.harvested, report.added, report.total
    );
    Ok(())
}

async fn classify(cmd: ClassifyArgs, config: &TomlConfig, paths: &DataPaths) -> Result<()> {
    let input = cmd.input.unwrap_or_else(|| paths.harvested());
    let output = cmd.output.unwrap_or_else(|| labeled_path(&input));
    let opts = ClassifyOptions {
        filtered_output: cmd.filtered_output.unwrap_or_else(|| filtered_path(&output)),
        unlabeled_output: unlabeled_path(&input, &output),
        baseline: match cmd.diff_against {
            Some(path) => Baseline::Required(path),
            None => Baseline::IfExists(paths.labeled_baseline()),
        },
        overwrite: cmd.overwrite,
        engine: engine_config(&cmd.llm, config),
        input,
        output,
    };

    let factory = service_factory(&cmd.llm, config);
    let report = workflow::run_classify(&opts, &factory).await?;

    info!(
        "Classification complete: {} total, {} AI-for-HW ({} classified, {} failed)",
        report.total, report.positive, report.succeeded, report.failed
    );
    Ok(())
}

async fn tag(cmd: TagArgs, config: &TomlConfig, paths: &DataPaths) -> Result<()> {
    let opts = TagOptions {
        input: cmd.input.unwrap_or_else(|| paths.filtered()),
        output: cmd.output.unwrap_or_else(|| paths.tagged()),
        overwrite: cmd.overwrite,
        engine: engine_config(&cmd.llm, config),
    };

    let factory = service_factory(&cmd.llm, config);
    let report = workflow::run_tag(&opts, &factory).await?;

    info!(
        "Tagging complete: {} total, {} tagged, {} failed",
        report.total, report.succeeded, report.failed
    );
    Ok(())
}

fn engine_config(llm: &LlmArgs, config: &TomlConfig) -> EngineConfig {
    EngineConfig {
        model: llm.model.clone().unwrap_or_else(|| config.model.clone()),
        concurrency: llm.jobs.unwrap_or(config.jobs),
        retry: retry_policy(config),
    }
}

fn retry_policy(config: &TomlConfig) -> RetryPolicy {
    RetryPolicy {
        base_delay: Duration::from_secs(config.retry_backoff_secs),
        ..RetryPolicy::default()
    }
}

/// Credentials are resolved on first call, i.e. only when there is work
fn service_factory(
    llm: &LlmArgs,
    config: &TomlConfig,
) -> impl Fn() -> Result<Arc<dyn CompletionService>> + Send + Sync {
    let key_file = llm
        .api_key_file
        .clone()
        .unwrap_or_else(|| config.api_key_file.clone());
    let base_url = config.openai_base_url.clone();

    move || {
        let credentials = resolve_credentials(&key_file).context("No LLM API key available")?;
        let client = OpenAiClient::new(credentials, base_url.clone())
            .context("Failed to create LLM client")?;
        Ok(Arc::new(client) as Arc<dyn CompletionService>)
    }
}

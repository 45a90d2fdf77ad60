mod pipeline;
mod report;
mod status;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use trendscout_analysis::{
    analyze_influencers, identify_content_gaps, ArticleInput, DEFAULT_INFLUENCER_LIMIT,
};
use trendscout_browser::{CancellationToken, ChromiumSessionFactory, IdentityPool, Pacing};
use trendscout_core::{EngineConfig, TimeRange};
use trendscout_crawler::CrawlOrchestrator;

use crate::pipeline::{Analysis, TrendPipeline};

#[derive(Debug, Parser)]
#[command(name = "trendscout")]
#[command(about = "Cross-platform trend discovery through real browser sessions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl every platform and rank cross-platform trending topics
    Trends(QueryArgs),
    /// List platforms and formats the trending topics are missing
    Gaps {
        #[command(flatten)]
        query: QueryArgs,

        /// How many top topics to inspect
        #[arg(long)]
        top: Option<usize>,
    },
    /// Find authors recurring across trending topics
    Influencers {
        #[command(flatten)]
        query: QueryArgs,

        /// Maximum profiles to list
        #[arg(long, default_value_t = DEFAULT_INFLUENCER_LIMIT)]
        limit: usize,
    },
    /// Show identity pool health, platforms, browser and cache
    Status {
        /// Probe every proxy with a GET to this URL first
        #[arg(long)]
        probe_url: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// Search query; repeat for a multi-keyword analysis
    #[arg(short, long = "query", required = true)]
    queries: Vec<String>,

    /// Look-back window: 1d, 7d or 30d
    #[arg(long, default_value_t = TimeRange::Week)]
    time_range: TimeRange,

    /// Ignore and do not write the result cache
    #[arg(long)]
    no_cache: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// JSON file holding an extracted article (`{"title", "content", "url"?}`)
    #[arg(long = "article", value_name = "FILE")]
    articles: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = trendscout_core::load_engine_config_from_env()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Trends(args)) => {
            let analysis = analyze(&config, &args).await?;
            if args.json {
                report::print_json(&analysis.topics)?;
            } else {
                print!("{}", report::format_topics(&analysis.topics));
            }
        }
        Some(Commands::Gaps { query, top }) => {
            let analysis = analyze(&config, &query).await?;
            let gaps = identify_content_gaps(&analysis.topics, top.unwrap_or(config.gap_top_n));
            if query.json {
                report::print_json(&gaps)?;
            } else {
                print!("{}", report::format_gaps(&gaps));
            }
        }
        Some(Commands::Influencers { query, limit }) => {
            let analysis = analyze(&config, &query).await?;
            let profiles = analyze_influencers(&analysis.topics, limit);
            if query.json {
                report::print_json(&profiles)?;
            } else {
                print!("{}", report::format_influencers(&profiles));
            }
        }
        Some(Commands::Status { probe_url, json }) => {
            status::run_status(&config, probe_url.as_deref(), json).await?;
        }
        None => println!("trendscout: pass --help for usage"),
    }

    Ok(())
}

/// Build the crawl stack from `config` and run one analysis, cancelling the
/// in-flight crawl on Ctrl-C.
async fn analyze(config: &EngineConfig, args: &QueryArgs) -> anyhow::Result<Analysis> {
    let articles = load_articles(&args.articles)?;

    let pacing = Pacing::from_config(config);
    let factory = ChromiumSessionFactory::from_config(config, pacing.clone())?;
    tracing::info!(browser = factory.executable(), "using browser executable");
    let pool = IdentityPool::from_config(config)?;
    let orchestrator =
        CrawlOrchestrator::new(config, Arc::new(factory), Arc::new(pool), pacing);

    let mut pipeline = TrendPipeline::new(config, orchestrator)?;
    if args.no_cache {
        pipeline = pipeline.without_cache();
    }

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received; cancelling crawl");
                cancel.cancel();
            }
        })
    };

    let outcome = pipeline
        .analyze(&args.queries, args.time_range, articles, &cancel)
        .await;
    watcher.abort();

    let analysis = outcome?;
    tracing::info!(
        topics = analysis.topics.len(),
        records = analysis.records,
        cached = analysis.from_cache,
        "analysis complete"
    );
    Ok(analysis)
}

fn load_articles(paths: &[PathBuf]) -> anyhow::Result<Vec<ArticleInput>> {
    paths
        .iter()
        .map(|path| {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
            serde_json::from_str(&raw)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests;

use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ragno_analytics::config::AnalysisConfig;
use ragno_analytics::pipeline::{Algorithm, AnalysisEngine, AnalysisRequest};
use ragno_analytics::snapshot::GraphSnapshot;

#[derive(Parser)]
#[command(name = "ragno-analytics")]
#[command(about = "Rank and cluster knowledge graph snapshots")]
struct Cli {
    /// Graph snapshot JSON files. Several files are analyzed independently.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// JSON analysis config; flags below override its values.
    #[arg(long, env = "RAGNO_CONFIG")]
    config: Option<PathBuf>,

    #[arg(
        long,
        env = "ALGORITHMS",
        value_delimiter = ',',
        default_value = "statistics,kcore,centrality,ppr,communities,ranking"
    )]
    algorithms: Vec<String>,

    /// PPR seeds as `id` or `id=weight`. Defaults to the snapshot's entry points.
    #[arg(long, env = "PPR_SEEDS", value_delimiter = ',')]
    seeds: Vec<String>,

    /// JSON object of node id -> content score in [0, 1].
    #[arg(long, env = "CONTENT_SCORES")]
    content: Option<PathBuf>,

    #[arg(long, env = "PPR_ALPHA")]
    alpha: Option<f64>,

    #[arg(long, env = "PPR_MAX_ITERATIONS")]
    max_iterations: Option<usize>,

    #[arg(long, env = "PPR_THRESHOLD")]
    threshold: Option<f64>,

    #[arg(long, env = "MAX_CENTRALITY_NODES")]
    max_centrality_nodes: Option<usize>,

    #[arg(long, env = "COMMUNITY_RESOLUTION")]
    resolution: Option<f64>,

    #[arg(long, env = "MIN_COMMUNITY_SIZE")]
    min_community_size: Option<usize>,

    #[arg(long, env = "MAX_COMMUNITIES")]
    max_communities: Option<usize>,

    /// Fail on relationships that reference unknown nodes instead of dropping them.
    #[arg(long, env = "STRICT_GRAPH")]
    strict: bool,

    /// Attach explanations to ranked entries.
    #[arg(long, env = "RANKING_EXPLAIN")]
    explain: bool,

    /// Keep only the top N ranked entries.
    #[arg(long, env = "RANKING_LIMIT")]
    limit: Option<usize>,

    /// Per-snapshot deadline for centrality, PPR and community detection.
    #[arg(long, env = "TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[arg(long, env = "PRETTY_JSON")]
    pretty: bool,
}

impl Cli {
    fn analysis_config(&self) -> anyhow::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_path(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(alpha) = self.alpha {
            config.ppr.alpha = alpha;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.ppr.max_iterations = max_iterations;
        }
        if let Some(threshold) = self.threshold {
            config.ppr.convergence_threshold = threshold;
        }
        if let Some(max_nodes) = self.max_centrality_nodes {
            config.centrality.max_nodes = max_nodes;
        }
        if let Some(resolution) = self.resolution {
            config.communities.resolution = resolution;
        }
        if let Some(min_size) = self.min_community_size {
            config.communities.min_community_size = min_size;
        }
        if let Some(max_communities) = self.max_communities {
            config.communities.max_communities = max_communities;
        }
        if self.explain {
            config.ranking.explain = true;
        }
        if self.limit.is_some() {
            config.ranking.limit = self.limit;
        }
        if self.timeout_ms.is_some() {
            config.timeout_ms = self.timeout_ms;
        }

        config.validate()?;
        Ok(config)
    }

    fn request(&self) -> anyhow::Result<AnalysisRequest> {
        let algorithms = self
            .algorithms
            .iter()
            .map(|s| s.parse::<Algorithm>())
            .collect::<Result<Vec<_>, String>>()
            .map_err(|e| anyhow::anyhow!(e))?;
        let mut request = AnalysisRequest::only(&algorithms);

        if !self.seeds.is_empty() {
            request = request.with_seeds(parse_seeds(&self.seeds)?);
        }
        if let Some(path) = &self.content {
            let raw = std::fs::read_to_string(path)?;
            let content: HashMap<String, f64> = serde_json::from_str(&raw)?;
            request = request.with_content(content);
        }
        Ok(request)
    }
}

fn parse_seeds(raw: &[String]) -> anyhow::Result<HashMap<String, f64>> {
    let mut seeds = HashMap::new();
    for item in raw {
        let (id, weight) = match item.rsplit_once('=') {
            Some((id, weight)) => (id, weight.parse::<f64>()?),
            None => (item.as_str(), 1.0),
        };
        *seeds.entry(id.to_string()).or_insert(0.0) += weight;
    }
    Ok(seeds)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(&cli.log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.analysis_config()?;
    let request = cli.request()?;
    let engine = AnalysisEngine::new(config);

    let mut graphs = Vec::with_capacity(cli.inputs.len());
    for path in &cli.inputs {
        let graph = GraphSnapshot::from_path(path)?.into_graph(cli.strict)?;
        if graph.dropped_relationships() > 0 {
            tracing::warn!(
                path = %path.display(),
                dropped = graph.dropped_relationships(),
                "Relationships referencing unknown nodes were dropped"
            );
        }
        graphs.push(graph);
    }

    let output = if graphs.len() == 1 {
        let graph = Arc::new(graphs.remove(0));
        let cancel = engine.cancel_signal();

        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received SIGINT, cancelling analysis");
                interrupt.cancel();
            }
        });

        let report = engine.analyze_async(graph, request, cancel).await?;
        serde_json::to_value(&report)?
    } else {
        tracing::info!(snapshots = graphs.len(), "Analyzing snapshots in parallel");
        let reports = tokio::task::spawn_blocking(move || engine.analyze_batch(&graphs, &request))
            .await?;
        serde_json::to_value(&reports)?
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&output)?
    } else {
        serde_json::to_string(&output)?
    };
    println!("{}", rendered);

    Ok(())
}

use algo::{
    Algorithm, ConnectedComponents, DirectedModularity, GraphAlgoEngine, LabelPropagation,
    Louvain, PageRank, StronglyConnectedComponents, TriangleCount, UndirectedModularity,
};
use anyhow::{Context, Result};
use serde::Serialize;
use sna_core::config::AppConfig;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{GraphDatabase, GraphView};
use tracing::info;

#[derive(Debug, Clone)]
pub enum GraphSource {
    EdgeList(PathBuf),
    Snapshot(PathBuf),
}

impl GraphSource {
    fn open(&self) -> Result<GraphDatabase> {
        match self {
            GraphSource::EdgeList(path) => GraphDatabase::open_edge_list(path)
                .with_context(|| format!("failed to load edge list {}", path.display())),
            GraphSource::Snapshot(path) => GraphDatabase::open_snapshot(path)
                .with_context(|| format!("failed to load snapshot {}", path.display())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerSummary {
    pub layer: usize,
    pub nodes: usize,
    pub communities: usize,
    pub modularity: f64,
}

/// Everything the `analyze` command reports.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub nodes: usize,
    pub relationships: usize,
    pub louvain_layers: Vec<LayerSummary>,
    pub label_propagation_communities: usize,
    pub directed_modularity: f64,
    pub undirected_modularity: f64,
    pub triangles: u64,
    pub pagerank_sum: f64,
    pub weak_components: usize,
    pub strong_components: usize,
}

/// Runs every algorithm once against the graph in `source`, cleaning each after use,
/// then shuts the store down.
pub fn analyze(source: &GraphSource, config: &AppConfig, quiet: bool) -> Result<AnalysisReport> {
    let db = Arc::new(source.open()?);
    let report = run_suite(&db, config, quiet);
    db.shutdown();
    report
}

fn run_suite(db: &Arc<GraphDatabase>, config: &AppConfig, quiet: bool) -> Result<AnalysisReport> {
    let (nodes, relationships) = {
        let scope = db.read_scope()?;
        (scope.node_count(), scope.relationship_count())
    };
    info!("Graph has {} nodes and {} relationships", nodes, relationships);

    let engine = GraphAlgoEngine::with_config(db.clone(), &config.engine);
    if quiet {
        engine.disable_logging();
    }

    let mut louvain = Louvain::with_config(config.louvain.clone());
    engine.execute(&mut louvain)?;
    let louvain_layers: Vec<LayerSummary> = louvain
        .result()?
        .iter()
        .enumerate()
        .map(|(layer, summary)| LayerSummary {
            layer,
            nodes: summary.size(),
            communities: summary.community_count(),
            modularity: summary.modularity,
        })
        .collect();
    engine.clean(&mut louvain);

    let mut lp = LabelPropagation::with_config(config.label_propagation.clone());
    engine.execute(&mut lp)?;
    let partition = lp.result()?.clone();
    let label_propagation_communities = partition.distinct_count();
    engine.clean(&mut lp);

    let mut directed = DirectedModularity::new(partition.clone());
    engine.execute(&mut directed)?;
    let directed_modularity = *directed.result()?;
    engine.clean(&mut directed);

    let mut undirected = UndirectedModularity::new(partition);
    engine.execute(&mut undirected)?;
    let undirected_modularity = *undirected.result()?;
    engine.clean(&mut undirected);

    let mut tc = TriangleCount::new();
    engine.execute(&mut tc)?;
    let triangles = tc.global_count()?;
    engine.clean(&mut tc);

    let mut pr = PageRank::with_config(config.pagerank.clone());
    engine.execute(&mut pr)?;
    let pagerank_sum = pr.result()?.sum();
    engine.clean(&mut pr);

    let mut wcc = ConnectedComponents::new();
    engine.execute(&mut wcc)?;
    let weak_components = wcc.component_count()?;
    engine.clean(&mut wcc);

    let mut scc = StronglyConnectedComponents::new();
    engine.execute(&mut scc)?;
    let strong_components = scc.component_count()?;
    engine.clean(&mut scc);

    let metrics = engine.metrics();
    info!(
        "Ran {} algorithms (p50 {}us, p99 {}us)",
        metrics.total_runs, metrics.p50, metrics.p99
    );

    Ok(AnalysisReport {
        nodes,
        relationships,
        louvain_layers,
        label_propagation_communities,
        directed_modularity,
        undirected_modularity,
        triangles,
        pagerank_sum,
        weak_components,
        strong_components,
    })
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "The graph has {} nodes and {} relationships",
            self.nodes, self.relationships
        )?;
        for layer in &self.louvain_layers {
            writeln!(
                f,
                "Layer {}: {} nodes, {} communities (modularity {:.6})",
                layer.layer, layer.nodes, layer.communities, layer.modularity
            )?;
        }
        writeln!(
            f,
            "There are {} communities according to Label Propagation",
            self.label_propagation_communities
        )?;
        writeln!(
            f,
            "The directed modularity of this network is {}",
            self.directed_modularity
        )?;
        writeln!(
            f,
            "The undirected modularity of this network is {}",
            self.undirected_modularity
        )?;
        writeln!(f, "There are {} triangles", self.triangles)?;
        writeln!(f, "PageRank scores sum to {}", self.pagerank_sum)?;
        writeln!(f, "There are {} weakly connected components", self.weak_components)?;
        write!(
            f,
            "There are {} strongly connected components",
            self.strong_components
        )
    }
}

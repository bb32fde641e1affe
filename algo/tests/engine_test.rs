use algo::{
    Algorithm, AlgorithmKind, ConnectedComponents, EngineError, GraphAlgoEngine,
    LabelPropagation, PageRank, ProgressEvent, ProgressListener, TriangleCount,
    UndirectedModularity,
};
use sna_core::config::EngineConfig;
use sna_core::error::{ErrorCode, SnaError};
use std::sync::{Arc, Mutex};
use storage::{AdjacencyGraph, GraphDatabase};

fn social_graph() -> AdjacencyGraph {
    let mut graph = AdjacencyGraph::new();
    graph.add_edge(1, 2, "KNOWS", 1.0);
    graph.add_edge(2, 3, "KNOWS", 1.0);
    graph.add_edge(3, 1, "KNOWS", 1.0);
    graph.add_edge(3, 4, "FOLLOWS", 1.0);
    graph.add_edge(4, 5, "KNOWS", 1.0);
    graph
}

fn engine_over(graph: AdjacencyGraph) -> (Arc<GraphDatabase>, GraphAlgoEngine) {
    let db = Arc::new(GraphDatabase::from_graph(graph));
    let engine = GraphAlgoEngine::new(db.clone());
    (db, engine)
}

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<ProgressEvent>>,
}

impl ProgressListener for RecordingListener {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[test]
fn test_result_before_execute_is_invalid_state() {
    let pr = PageRank::new();
    let err = pr.result().unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    assert_eq!(err.error_code(), ErrorCode::FailedPrecondition);
}

#[test]
fn test_execute_after_shutdown_is_graph_unavailable() {
    let (db, engine) = engine_over(social_graph());
    db.shutdown();

    let mut tc = TriangleCount::new();
    let err = engine.execute(&mut tc).unwrap_err();

    assert!(matches!(err, EngineError::GraphUnavailable(_)));
    assert_eq!(err.error_code(), ErrorCode::Unavailable);
    assert!(tc.result().is_err());
}

#[test]
fn test_algorithm_failure_publishes_no_result() {
    let (_db, engine) = engine_over(social_graph());
    let partial = vec![(1, 1), (2, 1)].into_iter().collect();
    let mut modularity = UndirectedModularity::new(partial);

    let err = engine.execute(&mut modularity).unwrap_err();
    match &err {
        EngineError::AlgorithmFailure { algorithm, .. } => {
            assert_eq!(*algorithm, AlgorithmKind::UndirectedModularity);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
    assert!(modularity.result().is_err());
}

#[test]
fn test_invalid_config_is_algorithm_failure() {
    let (_db, engine) = engine_over(social_graph());
    let mut broken = PageRank::new().with_damping(2.0);

    let err = engine.execute(&mut broken).unwrap_err();
    assert!(matches!(
        err,
        EngineError::AlgorithmFailure {
            algorithm: AlgorithmKind::PageRank,
            ..
        }
    ));
    assert_eq!(err.error_code(), ErrorCode::InvalidArgument);
    assert!(broken.result().is_err());
}

#[test]
fn test_clean_twice_and_without_execute_is_harmless() {
    let (_db, engine) = engine_over(social_graph());

    let mut never_run = LabelPropagation::new();
    engine.clean(&mut never_run);
    assert!(!never_run.has_attached_state());

    let mut lp = LabelPropagation::new();
    engine.execute(&mut lp).unwrap();
    assert!(lp.has_attached_state());
    let before = lp.result().unwrap().clone();

    engine.clean(&mut lp);
    engine.clean(&mut lp);

    assert!(!lp.has_attached_state());
    assert_eq!(lp.result().unwrap(), &before);
}

#[test]
fn test_disable_logging_does_not_change_results() {
    let (_db, engine) = engine_over(social_graph());

    let mut loud = PageRank::new();
    engine.execute(&mut loud).unwrap();

    engine.disable_logging();
    assert!(!engine.logging_enabled());
    let mut quiet = PageRank::new();
    engine.execute(&mut quiet).unwrap();

    assert_eq!(loud.result().unwrap(), quiet.result().unwrap());
}

#[test]
fn test_progress_listener_sees_every_iteration() {
    let listener = Arc::new(RecordingListener::default());
    let db = Arc::new(GraphDatabase::from_graph(social_graph()));
    let engine = GraphAlgoEngine::new(db).with_progress_listener(listener.clone());
    engine.disable_logging();

    let mut pr = PageRank::new();
    engine.execute(&mut pr).unwrap();

    let events = listener.events.lock().unwrap();
    let iterations = events
        .iter()
        .filter(|event| matches!(event, ProgressEvent::Iteration { .. }))
        .count();
    assert_eq!(iterations, pr.iterations());
    let expected_end = if pr.converged() {
        ProgressEvent::Converged {
            algorithm: AlgorithmKind::PageRank,
            iterations: pr.iterations(),
        }
    } else {
        ProgressEvent::CapReached {
            algorithm: AlgorithmKind::PageRank,
            iterations: pr.iterations(),
        }
    };
    assert_eq!(events.last(), Some(&expected_end));
}

#[test]
fn test_relationship_type_configuration() {
    let db = Arc::new(GraphDatabase::from_graph(social_graph()));
    let config = EngineConfig {
        logging: false,
        relationship_types: vec!["KNOWS".to_string()],
    };
    let engine = GraphAlgoEngine::with_config(db, &config);

    let mut wcc = ConnectedComponents::new();
    engine.execute(&mut wcc).unwrap();
    let labels = wcc.result().unwrap();

    // Without the FOLLOWS bridge, {1,2,3} and {4,5} separate. Every node stays visible.
    assert_eq!(labels.len(), 5);
    assert_eq!(labels[3], 1);
    assert_eq!(labels[5], 4);
}

#[test]
fn test_metrics_track_runs_per_algorithm() {
    let (db, engine) = engine_over(social_graph());
    engine.disable_logging();

    engine.execute(&mut PageRank::new()).unwrap();
    engine.execute(&mut TriangleCount::new()).unwrap();
    engine.execute(&mut PageRank::new().with_damping(-1.0)).unwrap_err();

    let metrics = engine.metrics();
    assert_eq!(metrics.total_runs, 3);
    assert_eq!(metrics.failed_runs, 1);
    assert_eq!(metrics.runs_by_algorithm["page_rank"], 2);
    assert_eq!(metrics.runs_by_algorithm["triangle_count"], 1);
    assert_eq!(db.scopes_opened(), 3);
}

#[test]
fn test_execute_through_trait_object() {
    let (_db, engine) = engine_over(social_graph());
    let mut tc = TriangleCount::new();
    {
        let dynamic: &mut dyn Algorithm<Output = algo::ResultMap<u64>> = &mut tc;
        engine.execute(dynamic).unwrap();
    }
    assert_eq!(tc.global_count().unwrap(), 1);
}

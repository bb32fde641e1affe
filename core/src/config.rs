use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Engine-level switches. Neither changes computed results.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub logging: bool,
    /// When non-empty, algorithms only see relationships of these types.
    pub relationship_types: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            logging: true,
            relationship_types: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PageRankConfig {
    pub damping: f64,
    /// L1 distance between successive score vectors below which iteration stops.
    pub epsilon: f64,
    pub max_iterations: usize,
    /// Allowed deviation of the score sum from 1.0 before the run is rejected.
    pub sum_tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            epsilon: 1e-10,
            max_iterations: 100,
            sum_tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LabelPropagationConfig {
    pub max_rounds: usize,
}

impl Default for LabelPropagationConfig {
    fn default() -> Self {
        Self { max_rounds: 100 }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LouvainConfig {
    /// Smallest modularity improvement a single move must bring to be accepted.
    pub min_gain: f64,
    pub resolution: f64,
    /// Cap on sweeps over all nodes within one local pass.
    pub max_sweeps: usize,
    pub max_levels: usize,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            min_gain: 1e-7,
            resolution: 1.0,
            max_sweeps: 100,
            max_levels: 32,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub pagerank: PageRankConfig,
    pub label_propagation: LabelPropagationConfig,
    pub louvain: LouvainConfig,
}

impl AppConfig {
    /// Layers `config/default`, `config/{RUN_MODE}` and `SNA__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(Environment::with_prefix("SNA").separator("__"));

        builder.build()?.try_deserialize()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("SNA").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

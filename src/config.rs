//! Session configuration.
//!
//! Loaded the way the teacher loads its `Config`: `config.toml` (base) ->
//! `config.local.toml` (git-ignored local overrides) -> `HDC_`-prefixed
//! environment variables, merged with `figment`.
//!
//! ```toml
//! # config.toml
//! dimensions = 32768
//! hdc_strategy = "dense-binary"
//! reasoning_priority = "symbolicPriority"
//! closed_world_assumption = true
//! ```
//!
//! ```bash
//! HDC_DIMENSIONS=8192 HDC_MAX_PROOF_DEPTH=40 my-host-binary
//! ```

use crate::error::{CoreError, CoreResult};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Deployment profile. Does not itself change core semantics; it is carried
/// for the host's benefit (e.g. choosing stricter defaults in tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    AutoTest,
    ManualTest,
    Prod,
}

impl Default for Profile {
    fn default() -> Self {
        Profile::Prod
    }
}

/// Active HDC strategy tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HdcStrategy {
    DenseBinary,
    SparsePolynomial,
    MetricAffine,
    Exact,
}

impl std::fmt::Display for HdcStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HdcStrategy::DenseBinary => "dense-binary",
            HdcStrategy::SparsePolynomial => "sparse-polynomial",
            HdcStrategy::MetricAffine => "metric-affine",
            HdcStrategy::Exact => "exact",
        };
        write!(f, "{s}")
    }
}

/// Reasoning candidate-selection priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReasoningPriority {
    SymbolicPriority,
    HolographicPriority,
}

impl Default for ReasoningPriority {
    fn default() -> Self {
        ReasoningPriority::SymbolicPriority
    }
}

/// Index strategy recognized by the config surface. Not implemented as an
/// ANN index in-core (topK is brute-force exact search at this scale); kept
/// as a typed passthrough field so hosts embedding a future ANN layer have a
/// stable key to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStrategy {
    LshPstable,
    Simhash,
    Grid,
}

impl Default for IndexStrategy {
    fn default() -> Self {
        IndexStrategy::Grid
    }
}

/// Session configuration, as named in spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: Profile,
    pub dimensions: usize,
    pub hdc_strategy: Option<HdcStrategy>,
    pub reasoning_priority: ReasoningPriority,
    pub closed_world_assumption: bool,
    pub recursion_horizon: u8,
    pub reject_contradictions: bool,
    pub max_proof_depth: usize,
    pub max_transitive_depth: usize,
    pub index_strategy: IndexStrategy,
    pub auto_load_core: bool,
    pub core_path: Option<String>,
    pub storage_root: Option<String>,
    pub rotation_seed: u64,
    pub relation_seed: u64,
    pub lsh_seed: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration (ambient stack, §10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            profile: Profile::default(),
            dimensions: 32768,
            hdc_strategy: None,
            reasoning_priority: ReasoningPriority::default(),
            closed_world_assumption: true,
            recursion_horizon: 3,
            reject_contradictions: true,
            max_proof_depth: 20,
            max_transitive_depth: 10,
            index_strategy: IndexStrategy::default(),
            auto_load_core: true,
            core_path: None,
            storage_root: None,
            rotation_seed: 0x5EED_0001,
            relation_seed: 0x5EED_0002,
            lsh_seed: 0x5EED_0003,
            logging: LoggingConfig::default(),
        }
    }
}

const VALID_DIMENSIONS: [usize; 8] = [512, 1024, 2048, 4096, 8192, 16384, 32768, 65536];

impl Config {
    /// Load configuration from default locations, merging
    /// `config.toml` -> `config.local.toml` -> `HDC_`-prefixed env vars.
    pub fn load() -> CoreResult<Self> {
        let cfg: Config = Figment::from(figment::providers::Serialized::defaults(
            Config::default(),
        ))
        .merge(Toml::file("config.toml"))
        .merge(Toml::file("config.local.toml"))
        .merge(Env::prefixed("HDC_").split("__"))
        .extract()
        .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a specific file path (still layered with env vars).
    pub fn from_file(path: &str) -> CoreResult<Self> {
        let cfg: Config = Figment::from(figment::providers::Serialized::defaults(
            Config::default(),
        ))
        .merge(Toml::file(path))
        .merge(Env::prefixed("HDC_").split("__"))
        .extract()
        .map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Resolve the effective HDC strategy: the explicit override, or the
    /// spec-stated default rule ("exact for small geometries, dense-binary
    /// otherwise").
    #[must_use]
    pub fn resolved_strategy(&self) -> HdcStrategy {
        self.hdc_strategy.unwrap_or(if self.dimensions <= 2048 {
            HdcStrategy::Exact
        } else {
            HdcStrategy::DenseBinary
        })
    }

    /// Validate field ranges; fails fast rather than panicking downstream.
    pub fn validate(&self) -> CoreResult<()> {
        if !VALID_DIMENSIONS.contains(&self.dimensions) {
            return Err(CoreError::InvalidConfig(format!(
                "dimensions must be one of {VALID_DIMENSIONS:?}, got {}",
                self.dimensions
            )));
        }
        if !(1..=5).contains(&self.recursion_horizon) {
            return Err(CoreError::InvalidConfig(format!(
                "recursion_horizon must be in 1..=5, got {}",
                self.recursion_horizon
            )));
        }
        if self.max_proof_depth == 0 {
            return Err(CoreError::InvalidConfig(
                "max_proof_depth must be positive".into(),
            ));
        }
        if self.max_transitive_depth == 0 {
            return Err(CoreError::InvalidConfig(
                "max_transitive_depth must be positive".into(),
            ));
        }
        Ok(())
    }
}

//! # af_types (layer 0)
//!
//! Stable primitive types used across the entire framework.
//! This crate has minimal dependencies and defines the fundamental building blocks.
//!
//! ## Design principles
//! - All types are serializable (serde)
//! - All types are deterministic (no hidden state)
//! - Copy types where sensible for performance

use serde::{Deserialize, Serialize};

pub mod value;

pub use value::{MetricMap, MetricValue, ParamValue, Params};

// ============================================================================
// Time & Tick
// ============================================================================

/// A simulation tick - the fundamental unit of time in a run.
/// The engine advances tick by tick, deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    #[inline]
    pub fn next(self) -> Tick {
        Tick(self.0.saturating_add(1))
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Tick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Seed for deterministic RNG. Must be explicitly provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed(pub u64);

impl Seed {
    #[inline]
    pub fn new(seed: u64) -> Self {
        Seed(seed)
    }

    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ============================================================================
// Result types
// ============================================================================

/// Standard result type for framework operations
pub type ForgeResult<T> = Result<T, ForgeError>;

/// Errors that can occur in the framework.
///
/// Every variant carries a stable kind code (see [`ForgeError::kind_code`])
/// so structured logs and external tools can match on errors without
/// parsing messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForgeError {
    /// Scenario failed structural or semantic validation
    InvalidScenario(String),
    /// Scenario file could not be read or parsed
    ScenarioLoad(String),
    /// Pack initialization failed (fatal, before tick 0)
    PackInit(String),
    /// Artifact or checkpoint write failed (fatal)
    ArtifactWrite(String),
    /// Existing run artifacts could not be read or parsed (fatal)
    ArtifactRead(String),
    /// RNG range draw with min > max
    InvalidRange { min: i64, max: i64 },
    /// RNG pick from an empty sequence
    EmptySequence,
    /// RNG weighted pick with non-positive total weight
    ZeroWeight,
    /// Probe evaluation failed (recovered: value becomes null)
    Probe(String),
    /// Agent step failed (recovered at the step boundary)
    Agent(String),
    /// Invariant violation inside the framework itself
    Internal(String),
}

impl ForgeError {
    /// Stable machine-readable code for this error's kind.
    pub fn kind_code(&self) -> &'static str {
        match self {
            ForgeError::InvalidScenario(_) => "invalid_scenario",
            ForgeError::ScenarioLoad(_) => "scenario_load",
            ForgeError::PackInit(_) => "pack_init",
            ForgeError::ArtifactWrite(_) => "artifact_write",
            ForgeError::ArtifactRead(_) => "artifact_read",
            ForgeError::InvalidRange { .. } => "invalid_range",
            ForgeError::EmptySequence => "empty_sequence",
            ForgeError::ZeroWeight => "zero_weight",
            ForgeError::Probe(_) => "probe",
            ForgeError::Agent(_) => "agent",
            ForgeError::Internal(_) => "internal",
        }
    }

    /// Whether this error class aborts the run (process exit class 2).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ForgeError::InvalidScenario(_)
                | ForgeError::ScenarioLoad(_)
                | ForgeError::PackInit(_)
                | ForgeError::ArtifactWrite(_)
                | ForgeError::ArtifactRead(_)
                | ForgeError::Internal(_)
        )
    }
}

impl std::fmt::Display for ForgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForgeError::InvalidScenario(msg) => write!(f, "Invalid scenario: {}", msg),
            ForgeError::ScenarioLoad(msg) => write!(f, "Scenario load failed: {}", msg),
            ForgeError::PackInit(msg) => write!(f, "Pack initialization failed: {}", msg),
            ForgeError::ArtifactWrite(msg) => write!(f, "Artifact write failed: {}", msg),
            ForgeError::ArtifactRead(msg) => write!(f, "Artifact read failed: {}", msg),
            ForgeError::InvalidRange { min, max } => {
                write!(f, "Invalid range: min {} > max {}", min, max)
            }
            ForgeError::EmptySequence => write!(f, "Cannot pick from an empty sequence"),
            ForgeError::ZeroWeight => write!(f, "Weighted pick requires a positive total weight"),
            ForgeError::Probe(msg) => write!(f, "Probe failed: {}", msg),
            ForgeError::Agent(msg) => write!(f, "Agent failure: {}", msg),
            ForgeError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ForgeError {}

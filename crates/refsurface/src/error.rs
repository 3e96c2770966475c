//! Error taxonomy for the analysis engine
//!
//! Two failure modes exist. An unrecognized symbol shape is fatal to the
//! module pass that hits it and surfaces immediately; a silently-wrong
//! approximation of a public surface is worse than no output. Unresolved
//! cross-module references are *not* errors at discovery time: they are
//! collected across the whole run and reported once (see the orchestrator).

use thiserror::Error;

/// Fatal analysis errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A symbol shape the engine does not understand. Carries the qualified
    /// path of the offending item so the operator can locate it.
    #[error("unsupported construct at `{path}`: {detail}")]
    UnsupportedConstruct { path: String, detail: String },
}

impl EngineError {
    pub fn unsupported(path: impl Into<String>, detail: impl Into<String>) -> Self {
        EngineError::UnsupportedConstruct {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

/// Failure of the flags decomposition solver.
///
/// Values coverable only by overlapping members are deliberately refused:
/// the solver fails loudly instead of producing an inferior expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlagsSolveError {
    #[error("no disjoint flag covering exists for value {value:#x}")]
    Unsupported { value: u64 },
}

/// Structural problems in a universe snapshot, caught by a one-time
/// validation pass right after deserialization so the rest of the engine can
/// index into the arenas without range checks.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("type id {id} is out of range (universe has {len} types)")]
    TypeIdOutOfRange { id: u32, len: usize },

    #[error("module id {id} is out of range (universe has {len} modules)")]
    ModuleIdOutOfRange { id: u32, len: usize },

    #[error("type `{name}` is listed as a top-level type of module `{module}` but belongs to another module")]
    TopLevelTypeInWrongModule { module: String, name: String },

    #[error("duplicate module name `{0}`")]
    DuplicateModuleName(String),

    #[error("type `{name}` sits on a cyclic containment chain")]
    CyclicContainment { name: String },
}

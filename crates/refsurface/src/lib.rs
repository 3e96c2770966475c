//! refsurface: declaration closure and dependency analysis for synthesizing
//! a compilable reference surface from compiled module metadata.
//!
//! The engine decides, for every type in a module's universe, whether it must
//! be declared and why; reconstructs bit-flag expressions from raw integer
//! constants; and classifies module-to-module dependency edges so circular
//! dependencies can be broken with binary references. Text emission and
//! project-file writing consume the resulting report and live elsewhere.

pub mod analysis;
pub mod config;
pub mod error;
pub mod facts;
pub mod graph;
pub mod orchestrator;
pub mod registry;
pub mod symbols;
pub mod types;

pub use analysis::{ClosureAnalyzer, FlagsOperation, FlagsSolver, ModuleClosure, Reason};
pub use config::Config;
pub use error::{EngineError, FlagsSolveError, SnapshotError};
pub use graph::{ModuleGraph, cycle_edges};
pub use orchestrator::{AnalysisReport, run_analysis};
pub use registry::PlatformRegistry;
pub use symbols::{ModuleId, TypeId, Universe};

//! Shared type definitions for the refsurface crate
//!
//! Common aliases and small enums used across the analysis pipeline,
//! kept here to avoid circular module dependencies.

use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;
use serde::Serialize;

/// Deterministic insertion-ordered map with the fast FxHasher.
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Deterministic insertion-ordered set with the fast FxHasher.
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

/// Strength of a module-to-module reference in the generated build metadata.
///
/// Project references require the reference graph to be acyclic; binary
/// references do not, which is what makes them usable for breaking cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Strong edge: the dependency is generated alongside the dependent and
    /// referenced as a sibling project.
    Project,
    /// Weak edge: the dependency is referenced as a prebuilt binary. Chosen
    /// for every edge that participates in a cycle.
    Binary,
    /// The dependency was resolved through the platform registry rather than
    /// from the analyzed universe.
    Platform,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Project => write!(f, "project"),
            ReferenceKind::Binary => write!(f, "binary"),
            ReferenceKind::Platform => write!(f, "platform"),
        }
    }
}

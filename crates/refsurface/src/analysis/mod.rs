//! Analysis components
//!
//! The closure analyzer computes, per module, the set of types that must be
//! declared and why; the flags solver reconstructs bitwise expressions for
//! flag-enum constants. Results flow into the module graph and the final
//! report without further mutation.

pub mod closure;
pub mod flags_solver;

use bitflags::bitflags;

pub use closure::ClosureAnalyzer;
pub use flags_solver::{FlagsMember, FlagsOperation, FlagsSolver};

use crate::symbols::{ModuleId, TypeId};
use crate::types::{FxIndexMap, FxIndexSet};

bitflags! {
    /// Why a type is part of a module's declaration closure. Bits only
    /// accumulate within a pass; nothing ever clears one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Reason: u8 {
        /// Part of the externally visible surface; declared in full.
        const EXTERNALLY_VISIBLE = 1 << 0;
        /// Mentioned by a constant value; only its name must resolve.
        const REFERENCED_IN_CONSTANT = 1 << 1;
        /// Declares an attribute some symbol applies; only referenced.
        const DECLARES_USED_ATTRIBUTE = 1 << 2;
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (name, flag) in [
            ("ExternallyVisible", Reason::EXTERNALLY_VISIBLE),
            ("ReferencedInConstant", Reason::REFERENCED_IN_CONSTANT),
            ("DeclaresUsedAttribute", Reason::DECLARES_USED_ATTRIBUTE),
        ] {
            if self.contains(flag) {
                if !first {
                    write!(f, " | ")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        if first {
            write!(f, "(none)")?;
        }
        Ok(())
    }
}

/// A cross-module reference the universe has no symbols for, after the
/// platform registry declined it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MissingReference {
    /// Module name the reference claims to live in.
    pub module: String,
    /// Qualified name of the referenced type.
    pub name: String,
}

/// Identity of an attribute constructor overload: the declaring attribute
/// type and the constructor's member index within it.
pub type AttributeCtor = (TypeId, usize);

/// Everything one closure pass over a module produces. Built once, then
/// read-only.
#[derive(Debug)]
pub struct ModuleClosure {
    pub module: ModuleId,

    /// Type -> accumulated reasons. Doubles as the traversal's visited set,
    /// which is what terminates cyclic type graphs.
    pub reasons: FxIndexMap<TypeId, Reason>,

    /// Attribute constructor overloads actually invoked somewhere in the
    /// module. Overloads not in this set are never declared.
    pub used_attribute_ctors: FxIndexSet<AttributeCtor>,

    /// For each fully declared type, the member indices that belong to the
    /// emitted surface (visibility-filtered, synthesized ctors excluded).
    pub emitted_members: FxIndexMap<TypeId, Vec<usize>>,

    /// Other universe modules this module's surface references.
    pub module_deps: FxIndexSet<ModuleId>,

    /// Canonical platform modules resolved through the registry.
    pub platform_deps: FxIndexSet<String>,

    /// Unresolved external references, collected rather than fatal.
    pub missing: FxIndexSet<MissingReference>,
}

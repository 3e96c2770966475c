//! Metadata facts
//!
//! Pure predicates over symbol shapes that the closure analyzer consults:
//! whether a type can be derived from outside its module, which members are
//! part of the externally visible surface, and whether a parameterless
//! constructor is compiler-synthesized or explicitly authored.

use crate::error::EngineError;
use crate::symbols::{
    Accessibility, Member, MethodKind, MethodMember, TypeId, TypeKind, TypeSymbol, Universe,
};

/// A type is inheritable from another module when it is not sealed and at
/// least one of its instance constructors is visible to derived types.
pub fn is_inheritable(ty: &TypeSymbol) -> bool {
    if ty.kind.is_sealed() {
        return false;
    }
    if matches!(ty.kind, TypeKind::Interface) {
        // Interfaces have no constructors; "inheritable" is about the
        // protected-member surface, which interfaces do not have.
        return false;
    }
    ty.members.iter().any(|member| {
        matches!(
            member,
            Member::Method(m)
                if m.kind == MethodKind::Constructor && m.accessibility.is_visible_to_derived()
        )
    })
}

/// Whether a member participates in the externally visible surface of its
/// declaring type. Public members always do; protected members only when the
/// declaring type can actually be derived from outside.
pub fn member_is_visible(accessibility: Accessibility, declaring_type_inheritable: bool) -> bool {
    match accessibility {
        Accessibility::Public => true,
        Accessibility::Protected | Accessibility::ProtectedInternal => declaring_type_inheritable,
        Accessibility::Internal | Accessibility::Private => false,
    }
}

/// Whether a type is visible from outside its module. Nested types are capped
/// by their containers: a public nested type inside an internal container is
/// not visible.
pub fn is_visible_outside(universe: &Universe, id: TypeId) -> bool {
    let ty = universe.ty(id);
    match ty.containing_type {
        Some(container) => {
            is_visible_outside(universe, container)
                && match ty.accessibility {
                    Accessibility::Public => true,
                    Accessibility::Protected | Accessibility::ProtectedInternal => {
                        is_inheritable(universe.ty(container))
                    }
                    Accessibility::Internal | Accessibility::Private => false,
                }
        }
        None => ty.accessibility == Accessibility::Public,
    }
}

/// Origin of a parameterless instance constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtorOrigin {
    /// Implicit compiler default; never part of the declared surface.
    Synthesized,
    /// Explicitly authored; must be declared like any other member.
    Authored,
}

/// Classify a parameterless instance constructor structurally. Metadata has
/// no flag distinguishing an implicit default constructor from an authored
/// one, so the decision is made from shape alone:
///
/// - struct: a parameterless constructor is always the compiler default;
/// - class: the compiler default is the *only* constructor, carries no
///   attributes, and has the default accessibility (public, or protected on
///   an abstract class). Anything else is authored.
///
/// A parameterless constructor on a kind that cannot declare one is a hard
/// error rather than a guess.
pub fn classify_parameterless_ctor(
    universe: &Universe,
    declaring: TypeId,
    ctor: &MethodMember,
) -> Result<CtorOrigin, EngineError> {
    debug_assert!(ctor.kind == MethodKind::Constructor && ctor.parameters.is_empty());

    let ty = universe.ty(declaring);
    match &ty.kind {
        TypeKind::Struct => Ok(CtorOrigin::Synthesized),
        TypeKind::Class { is_abstract, .. } => {
            let default_accessibility = if *is_abstract {
                Accessibility::Protected
            } else {
                Accessibility::Public
            };
            let looks_synthesized = ty.constructor_count() == 1
                && ctor.attributes.is_empty()
                && ctor.accessibility == default_accessibility;
            if looks_synthesized {
                Ok(CtorOrigin::Synthesized)
            } else {
                Ok(CtorOrigin::Authored)
            }
        }
        TypeKind::Interface | TypeKind::Enum { .. } | TypeKind::Delegate => {
            Err(EngineError::unsupported(
                universe.qualified_name(declaring),
                "parameterless instance constructor on a kind that cannot declare one",
            ))
        }
    }
}

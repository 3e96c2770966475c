//! Declaration closure analyzer
//!
//! One pass per module: starting from every externally visible top-level
//! type, walk the symbol graph and record, for each type reached, why it has
//! to be declared. The reason map doubles as the visited set: re-adding a
//! reason a type already holds short-circuits the walk, which is what makes
//! cyclic type graphs (mutually referencing attributes, self-referential
//! generic constraints) terminate.
//!
//! Types in *other* modules are never traversed; the walk stops at the module
//! boundary and records a dependency edge instead. Those edges are the raw
//! material for the module graph.

use log::debug;

use crate::analysis::{MissingReference, ModuleClosure, Reason};
use crate::error::EngineError;
use crate::facts::{self, CtorOrigin};
use crate::registry::PlatformRegistry;
use crate::symbols::{
    Accessibility, AttributeApplication, ConstantValue, GenericParam, Member, MethodKind,
    MethodMember, ModuleId, Parameter, TypeId, TypeRef, TypeTarget, Universe,
};
use crate::types::{FxIndexMap, FxIndexSet};

/// Single-module closure traversal. All mutable state lives here and is
/// dropped into the [`ModuleClosure`] when the pass finishes.
pub struct ClosureAnalyzer<'a> {
    universe: &'a Universe,
    registry: &'a PlatformRegistry,
    module: ModuleId,
    reasons: FxIndexMap<TypeId, Reason>,
    used_attribute_ctors: FxIndexSet<(TypeId, usize)>,
    emitted_members: FxIndexMap<TypeId, Vec<usize>>,
    module_deps: FxIndexSet<ModuleId>,
    platform_deps: FxIndexSet<String>,
    missing: FxIndexSet<MissingReference>,
}

impl<'a> ClosureAnalyzer<'a> {
    /// Run one full closure pass over `module`.
    pub fn analyze(
        universe: &'a Universe,
        registry: &'a PlatformRegistry,
        module: ModuleId,
    ) -> Result<ModuleClosure, EngineError> {
        let mut analyzer = ClosureAnalyzer {
            universe,
            registry,
            module,
            reasons: FxIndexMap::default(),
            used_attribute_ctors: FxIndexSet::default(),
            emitted_members: FxIndexMap::default(),
            module_deps: FxIndexSet::default(),
            platform_deps: FxIndexSet::default(),
            missing: FxIndexSet::default(),
        };

        let symbol = universe.module(module);
        analyzer.visit_attributes(&symbol.attributes)?;

        for &type_id in &symbol.top_level {
            if facts::is_visible_outside(universe, type_id) {
                analyzer.visit_named_type(type_id, Reason::EXTERNALLY_VISIBLE)?;
            }
        }

        debug!(
            "module `{}`: {} types in closure, {} attribute ctors used, {} module deps, {} missing",
            symbol.name,
            analyzer.reasons.len(),
            analyzer.used_attribute_ctors.len(),
            analyzer.module_deps.len(),
            analyzer.missing.len(),
        );

        Ok(ModuleClosure {
            module,
            reasons: analyzer.reasons,
            used_attribute_ctors: analyzer.used_attribute_ctors,
            emitted_members: analyzer.emitted_members,
            module_deps: analyzer.module_deps,
            platform_deps: analyzer.platform_deps,
            missing: analyzer.missing,
        })
    }

    fn visit_named_type(&mut self, id: TypeId, reason: Reason) -> Result<(), EngineError> {
        let ty = self.universe.ty(id);

        // Cross-module boundary: record the edge, never traverse.
        if ty.module != self.module {
            self.module_deps.insert(ty.module);
            return Ok(());
        }

        let previous = self.reasons.get(&id).copied().unwrap_or_default();
        if previous.contains(reason) {
            return Ok(());
        }
        self.reasons.insert(id, previous | reason);

        // Constant and attribute references only need the name to resolve;
        // full traversal is reserved for the visible surface.
        if reason != Reason::EXTERNALLY_VISIBLE {
            return Ok(());
        }

        self.visit_attributes(&ty.attributes)?;
        self.visit_generic_params(&ty.generic_params)?;

        if let Some(base) = &ty.base {
            self.visit_type_ref(base)?;
        }
        for interface in &ty.interfaces {
            self.visit_type_ref(interface)?;
        }

        let inheritable = facts::is_inheritable(ty);
        let mut emitted = Vec::new();

        for (index, member) in ty.members.iter().enumerate() {
            if !facts::member_is_visible(self.member_accessibility(member), inheritable) {
                continue;
            }

            match member {
                Member::NestedType(nested) => {
                    // Nested types are declared on their own; the container's
                    // member list does not carry them.
                    self.visit_named_type(*nested, Reason::EXTERNALLY_VISIBLE)?;
                }
                Member::Field(field) => {
                    self.visit_attributes(&field.attributes)?;
                    self.visit_type_ref(&field.ty)?;
                    if let Some(constant) = &field.constant {
                        self.visit_constant(constant)?;
                    }
                    emitted.push(index);
                }
                Member::Event(event) => {
                    self.visit_attributes(&event.attributes)?;
                    self.visit_type_ref(&event.ty)?;
                    emitted.push(index);
                }
                Member::Property(property) => {
                    self.visit_attributes(&property.attributes)?;
                    self.visit_type_ref(&property.ty)?;
                    self.visit_parameters(&property.parameters)?;
                    emitted.push(index);
                }
                Member::Method(method) => {
                    if self.visit_method(id, method)? {
                        emitted.push(index);
                    }
                }
            }
        }

        self.emitted_members.insert(id, emitted);
        Ok(())
    }

    /// Declared accessibility of a member. Nested types carry theirs on their
    /// own symbol, not on the member entry, so they filter exactly like any
    /// other member of the container.
    fn member_accessibility(&self, member: &Member) -> Accessibility {
        match member {
            Member::Field(field) => field.accessibility,
            Member::Property(property) => property.accessibility,
            Member::Event(event) => event.accessibility,
            Member::Method(method) => method.accessibility,
            Member::NestedType(nested) => self.universe.ty(*nested).accessibility,
        }
    }

    /// Visit a method member; returns whether it belongs to the emitted
    /// surface.
    fn visit_method(
        &mut self,
        declaring: TypeId,
        method: &MethodMember,
    ) -> Result<bool, EngineError> {
        match method.kind {
            MethodKind::Ordinary
            | MethodKind::Conversion
            | MethodKind::Operator
            | MethodKind::DelegateInvoke => {
                self.visit_method_signature(method)?;
                Ok(true)
            }
            MethodKind::Constructor => {
                if method.parameters.is_empty() {
                    match facts::classify_parameterless_ctor(self.universe, declaring, method)? {
                        CtorOrigin::Synthesized => return Ok(false),
                        CtorOrigin::Authored => {}
                    }
                }
                self.visit_method_signature(method)?;
                Ok(true)
            }
            // The static constructor has no surface of its own to walk.
            MethodKind::StaticConstructor => Ok(true),
            // Accessors are declared through their property or event.
            MethodKind::Accessor => Ok(false),
        }
    }

    fn visit_method_signature(&mut self, method: &MethodMember) -> Result<(), EngineError> {
        self.visit_attributes(&method.attributes)?;
        self.visit_attributes(&method.return_attributes)?;
        self.visit_generic_params(&method.generic_params)?;
        if let Some(return_type) = &method.return_type {
            self.visit_type_ref(return_type)?;
        }
        self.visit_parameters(&method.parameters)
    }

    fn visit_generic_params(&mut self, params: &[GenericParam]) -> Result<(), EngineError> {
        for param in params {
            self.visit_attributes(&param.attributes)?;
            for constraint in &param.constraints {
                self.visit_type_ref(constraint)?;
            }
        }
        Ok(())
    }

    fn visit_parameters(&mut self, parameters: &[Parameter]) -> Result<(), EngineError> {
        for parameter in parameters {
            self.visit_attributes(&parameter.attributes)?;
            self.visit_type_ref(&parameter.ty)?;
            if let Some(default) = &parameter.default_value {
                self.visit_constant(default)?;
            }
        }
        Ok(())
    }

    fn visit_attributes(&mut self, attributes: &[AttributeApplication]) -> Result<(), EngineError> {
        for attr in attributes {
            match &attr.attribute {
                TypeTarget::Resolved(id) => {
                    // Two stages: the declaring type is referenced, and the
                    // exact overload invoked is recorded so unused overloads
                    // are never declared.
                    self.visit_named_type(*id, Reason::DECLARES_USED_ATTRIBUTE)?;

                    if let Some(ctor_index) = attr.constructor
                        && self.used_attribute_ctors.insert((*id, ctor_index))
                    {
                        let ctor = self.attribute_constructor(*id, ctor_index)?;
                        for parameter in &ctor.parameters {
                            if let Some(default) = &parameter.default_value {
                                self.visit_constant(default)?;
                            }
                        }
                    }
                }
                TypeTarget::External { module, name } => self.record_external(module, name),
            }

            for argument in &attr.arguments {
                self.visit_constant(argument)?;
            }
            for (_, argument) in &attr.named_arguments {
                self.visit_constant(argument)?;
            }
        }
        Ok(())
    }

    fn attribute_constructor(
        &self,
        attribute: TypeId,
        index: usize,
    ) -> Result<&'a MethodMember, EngineError> {
        let ty = self.universe.ty(attribute);
        match ty.members.get(index) {
            Some(Member::Method(m)) if m.kind == MethodKind::Constructor => Ok(m),
            _ => Err(EngineError::unsupported(
                self.universe.qualified_name(attribute),
                format!("attribute application names member {index} which is not a constructor"),
            )),
        }
    }

    fn visit_type_ref(&mut self, type_ref: &TypeRef) -> Result<(), EngineError> {
        match type_ref {
            TypeRef::Named { target, args } => {
                // A referenced type in this module is part of the visible
                // surface and gets the full treatment.
                self.visit_target(target, Reason::EXTERNALLY_VISIBLE)?;
                for arg in args {
                    self.visit_type_ref(arg)?;
                }
                Ok(())
            }
            TypeRef::Array(element) | TypeRef::Pointer(element) => self.visit_type_ref(element),
            TypeRef::GenericParam(_) | TypeRef::Primitive(_) => Ok(()),
        }
    }

    fn visit_constant(&mut self, value: &ConstantValue) -> Result<(), EngineError> {
        match value {
            ConstantValue::Array(items) => {
                for item in items {
                    self.visit_constant(item)?;
                }
                Ok(())
            }
            ConstantValue::Type(type_ref) => self.visit_constant_type(type_ref),
            _ => Ok(()),
        }
    }

    fn visit_constant_type(&mut self, type_ref: &TypeRef) -> Result<(), EngineError> {
        match type_ref {
            TypeRef::Named { target, args } => {
                // Enough to resolve the name, no more.
                self.visit_target(target, Reason::REFERENCED_IN_CONSTANT)?;
                for arg in args {
                    self.visit_constant_type(arg)?;
                }
                Ok(())
            }
            TypeRef::Array(element) | TypeRef::Pointer(element) => {
                self.visit_constant_type(element)
            }
            TypeRef::GenericParam(_) | TypeRef::Primitive(_) => Ok(()),
        }
    }

    fn visit_target(&mut self, target: &TypeTarget, reason: Reason) -> Result<(), EngineError> {
        match target {
            TypeTarget::Resolved(id) => self.visit_named_type(*id, reason),
            TypeTarget::External { module, name } => {
                self.record_external(module, name);
                Ok(())
            }
        }
    }

    /// One opportunistic platform-registry lookup, then report the gap.
    fn record_external(&mut self, module: &str, name: &str) {
        if let Some(platform) = self.registry.resolve(module) {
            self.platform_deps.insert(platform.to_string());
        } else {
            self.missing.insert(MissingReference {
                module: module.to_string(),
                name: name.to_string(),
            });
        }
    }
}

//! Analysis pipeline
//!
//! Drives the whole run: one closure pass per module, strictly sequential,
//! each completing before its results are consumed; then the module graph and
//! its cycle edges, which require *all* closures to be finished; finally the
//! serializable report the emitter and project writer consume. Missing
//! dependencies are collected across the entire run and surfaced once.

use anyhow::{Context, bail};
use log::{debug, info, warn};
use serde::Serialize;

use crate::analysis::{ClosureAnalyzer, FlagsSolver, ModuleClosure};
use crate::config::Config;
use crate::error::EngineError;
use crate::graph::ModuleGraph;
use crate::registry::PlatformRegistry;
use crate::symbols::{Member, TypeId, TypeKind, TypeRef, TypeTarget, Universe};
use crate::types::{FxIndexMap, ReferenceKind};

/// One declared type in a module report.
#[derive(Debug, Serialize)]
pub struct DeclaredType {
    pub name: String,
    pub reasons: String,
    /// Names of the members belonging to the emitted surface. Present only
    /// for fully declared types.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

/// A classified reference from one module to another.
#[derive(Debug, Serialize)]
pub struct ModuleReference {
    pub name: String,
    pub kind: ReferenceKind,
}

/// A pre-rendered flag-enum constant expression.
#[derive(Debug, Serialize)]
pub struct FlagExpression {
    /// `Type.field` location of the constant.
    pub location: String,
    pub rendered: String,
}

/// Per-module slice of the final report.
#[derive(Debug, Serialize)]
pub struct ModuleReport {
    pub name: String,
    pub declared_types: Vec<DeclaredType>,
    pub used_attribute_constructors: Vec<String>,
    pub references: Vec<ModuleReference>,
    pub flag_expressions: Vec<FlagExpression>,
}

/// Everything downstream consumers need: reason-tagged declarations, edge
/// classification, generation order, and the consolidated gap report.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub modules: Vec<ModuleReport>,
    pub generation_order: Vec<String>,
    pub cycle_edges: Vec<(String, String)>,
    /// Module name -> unresolved external references, as `module::type`.
    pub missing_dependencies: FxIndexMap<String, Vec<String>>,
}

/// Run the full pipeline over a validated universe.
pub fn run_analysis(
    universe: &Universe,
    registry: &PlatformRegistry,
    config: &Config,
) -> anyhow::Result<AnalysisReport> {
    // Phase one: closures, one module at a time.
    let mut closures = Vec::with_capacity(universe.modules.len());
    for module in universe.module_ids() {
        let name = &universe.module(module).name;
        debug!("analyzing module `{name}`");
        let closure = ClosureAnalyzer::analyze(universe, registry, module)
            .with_context(|| format!("analyzing module `{name}`"))?;
        closures.push(closure);
    }

    // Phase two strictly follows: cycle detection needs every closure.
    let graph = ModuleGraph::build(universe, &closures);
    if !graph.cycle_edges().is_empty() {
        info!(
            "{} dependency edge(s) participate in cycles and will use binary references",
            graph.cycle_edges().len()
        );
    }

    let mut missing_dependencies: FxIndexMap<String, Vec<String>> = FxIndexMap::default();
    for closure in &closures {
        if closure.missing.is_empty() {
            continue;
        }
        let entries = missing_dependencies
            .entry(universe.module(closure.module).name.clone())
            .or_default();
        for reference in &closure.missing {
            entries.push(format!("{}::{}", reference.module, reference.name));
        }
    }

    if !missing_dependencies.is_empty() {
        for (module, references) in &missing_dependencies {
            warn!(
                "module `{module}` has {} unresolved reference(s): {}",
                references.len(),
                references.join(", ")
            );
        }
        if config.fail_on_missing {
            bail!(
                "{} module(s) have unresolved references; supply the missing inputs",
                missing_dependencies.len()
            );
        }
    }

    let modules = closures
        .iter()
        .map(|closure| module_report(universe, closure, &graph))
        .collect::<Result<Vec<_>, EngineError>>()?;

    Ok(AnalysisReport {
        modules,
        generation_order: graph.generation_order(),
        cycle_edges: graph.cycle_edges().iter().cloned().collect(),
        missing_dependencies,
    })
}

fn module_report(
    universe: &Universe,
    closure: &ModuleClosure,
    graph: &ModuleGraph,
) -> Result<ModuleReport, EngineError> {
    let module_name = &universe.module(closure.module).name;

    let declared_types = closure
        .reasons
        .iter()
        .map(|(&type_id, &reasons)| DeclaredType {
            name: universe.qualified_name(type_id),
            reasons: reasons.to_string(),
            members: closure.emitted_members.get(&type_id).map(|indices| {
                indices
                    .iter()
                    .map(|&index| member_name(universe.ty(type_id).members.get(index)))
                    .collect()
            }),
        })
        .collect();

    let used_attribute_constructors = closure
        .used_attribute_ctors
        .iter()
        .map(|&(attribute, index)| format!("{}::ctor#{index}", universe.qualified_name(attribute)))
        .collect();

    let mut references: Vec<ModuleReference> = closure
        .module_deps
        .iter()
        .map(|&dependency| {
            let dependency_name = &universe.module(dependency).name;
            ModuleReference {
                name: dependency_name.clone(),
                kind: graph.reference_kind(module_name, dependency_name),
            }
        })
        .collect();
    references.extend(closure.platform_deps.iter().map(|name| ModuleReference {
        name: name.clone(),
        kind: ReferenceKind::Platform,
    }));

    Ok(ModuleReport {
        name: module_name.clone(),
        declared_types,
        used_attribute_constructors,
        references,
        flag_expressions: flag_expressions(universe, closure)?,
    })
}

fn member_name(member: Option<&Member>) -> String {
    match member {
        Some(Member::Field(f)) => f.name.clone(),
        Some(Member::Property(p)) => p.name.clone(),
        Some(Member::Event(e)) => e.name.clone(),
        Some(Member::Method(m)) => m.name.clone(),
        Some(Member::NestedType(_)) | None => String::new(),
    }
}

/// Pre-render every flag-enum constant in the module's declared surface that
/// needs a compound expression. A constant no disjoint cover exists for is an
/// unsupported construct, surfaced with its location.
fn flag_expressions(
    universe: &Universe,
    closure: &ModuleClosure,
) -> Result<Vec<FlagExpression>, EngineError> {
    let mut expressions = Vec::new();

    for (&type_id, indices) in &closure.emitted_members {
        for &index in indices {
            let Some(Member::Field(field)) = universe.ty(type_id).members.get(index) else {
                continue;
            };
            let Some(value) = field.constant.as_ref().and_then(|c| c.as_bits()) else {
                continue;
            };
            let Some(enum_id) = flags_enum_target(universe, &field.ty) else {
                continue;
            };
            // Enum members declaring their own value render as themselves.
            if enum_id == type_id {
                continue;
            }

            let solver = FlagsSolver::for_enum(universe, enum_id)?;
            let location = format!("{}.{}", universe.qualified_name(type_id), field.name);
            let operation = solver.solve(value).map_err(|e| {
                EngineError::unsupported(location.clone(), e.to_string())
            })?;
            // A constant matched by a single member needs no pre-rendering.
            if matches!(operation, crate::analysis::FlagsOperation::Member(_)) {
                continue;
            }
            expressions.push(FlagExpression {
                location,
                rendered: operation.to_string(),
            });
        }
    }

    Ok(expressions)
}

/// The in-universe flags enum a field's type resolves to, if any.
fn flags_enum_target(universe: &Universe, ty: &TypeRef) -> Option<TypeId> {
    let TypeRef::Named {
        target: TypeTarget::Resolved(id),
        ..
    } = ty
    else {
        return None;
    };
    match universe.ty(*id).kind {
        TypeKind::Enum { is_flags: true } => Some(*id),
        _ => None,
    }
}

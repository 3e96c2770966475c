//! End-to-end pipeline tests: closures for every module, cycle-edge
//! classification, flag rendering and the consolidated missing-dependency
//! report, driven through the public API the CLI uses.

use pretty_assertions::assert_eq;

use refsurface::config::Config;
use refsurface::orchestrator::run_analysis;
use refsurface::registry::PlatformRegistry;
use refsurface::symbols::{
    Accessibility, ConstantValue, FieldMember, Member, ModuleId, ModuleSymbol, TypeId, TypeKind,
    TypeRef, TypeSymbol, TypeTarget, Universe,
};
use refsurface::types::ReferenceKind;

fn class(module: u32, namespace: &str, name: &str) -> TypeSymbol {
    TypeSymbol {
        module: ModuleId::new(module),
        namespace: vec![namespace.to_string()],
        name: name.to_string(),
        arity: 0,
        accessibility: Accessibility::Public,
        kind: TypeKind::Class {
            is_abstract: false,
            is_sealed: false,
        },
        base: None,
        interfaces: Vec::new(),
        generic_params: Vec::new(),
        members: Vec::new(),
        attributes: Vec::new(),
        containing_type: None,
    }
}

fn field(name: &str, ty: TypeRef) -> Member {
    Member::Field(FieldMember {
        name: name.to_string(),
        accessibility: Accessibility::Public,
        ty,
        constant: None,
        attributes: Vec::new(),
    })
}

fn enum_member(enum_id: u32, name: &str, value: u64) -> Member {
    Member::Field(FieldMember {
        name: name.to_string(),
        accessibility: Accessibility::Public,
        ty: TypeRef::resolved(TypeId::new(enum_id)),
        constant: Some(ConstantValue::UInt(value)),
        attributes: Vec::new(),
    })
}

/// Three modules: `core` and `ui` depend on each other (a cycle), `util`
/// depends on `core` only. `ui` additionally references one platform module
/// and one module nobody can resolve.
fn build_universe() -> Universe {
    // type 0: Core.Widget, holds a Ui.Window field -> core depends on ui
    let mut widget = class(0, "Core", "Widget");
    widget
        .members
        .push(field("MainWindow", TypeRef::resolved(TypeId::new(3))));

    // type 1: Core.Permissions, a [Flags] enum
    let mut permissions = class(0, "Core", "Permissions");
    permissions.kind = TypeKind::Enum { is_flags: true };
    permissions.members = vec![
        enum_member(1, "Read", 1),
        enum_member(1, "Write", 2),
        enum_member(1, "Execute", 4),
        enum_member(1, "All", 7),
    ];

    // type 2: Core.Settings with a flags constant needing decomposition
    let mut settings = class(0, "Core", "Settings");
    settings.members.push(Member::Field(FieldMember {
        name: "DefaultMask".to_string(),
        accessibility: Accessibility::Public,
        ty: TypeRef::resolved(TypeId::new(1)),
        constant: Some(ConstantValue::UInt(3)),
        attributes: Vec::new(),
    }));

    // type 3: Ui.Window, derives from Core.Widget -> ui depends on core
    let mut window = class(1, "Ui", "Window");
    window.base = Some(TypeRef::resolved(TypeId::new(0)));
    window.interfaces.push(TypeRef::named(TypeTarget::External {
        module: "Vendor.Gone".to_string(),
        name: "Vendor.IThing".to_string(),
    }));
    window.members.push(field(
        "Handle",
        TypeRef::named(TypeTarget::External {
            module: "mscorlib".to_string(),
            name: "System.IntPtr".to_string(),
        }),
    ));

    // type 4: Util.Helper -> util depends on core, no cycle
    let mut helper = class(2, "Util", "Helper");
    helper
        .members
        .push(field("Target", TypeRef::resolved(TypeId::new(0))));

    let universe = Universe {
        modules: vec![
            ModuleSymbol {
                name: "core".to_string(),
                attributes: Vec::new(),
                top_level: vec![TypeId::new(0), TypeId::new(1), TypeId::new(2)],
            },
            ModuleSymbol {
                name: "ui".to_string(),
                attributes: Vec::new(),
                top_level: vec![TypeId::new(3)],
            },
            ModuleSymbol {
                name: "util".to_string(),
                attributes: Vec::new(),
                top_level: vec![TypeId::new(4)],
            },
        ],
        types: vec![widget, permissions, settings, window, helper],
    };
    universe.validate().unwrap();
    universe
}

fn analyze(universe: &Universe, config: &Config) -> anyhow::Result<refsurface::AnalysisReport> {
    let registry = PlatformRegistry::from_config(config);
    run_analysis(universe, &registry, config)
}

#[test]
fn cyclic_edges_are_demoted_to_binary_references() {
    let universe = build_universe();
    let report = analyze(&universe, &Config::default()).unwrap();

    let mut cycle_edges = report.cycle_edges.clone();
    cycle_edges.sort();
    assert_eq!(
        cycle_edges,
        vec![
            ("core".to_string(), "ui".to_string()),
            ("ui".to_string(), "core".to_string()),
        ]
    );

    let core = report.modules.iter().find(|m| m.name == "core").unwrap();
    let core_to_ui = core.references.iter().find(|r| r.name == "ui").unwrap();
    assert_eq!(core_to_ui.kind, ReferenceKind::Binary);

    let util = report.modules.iter().find(|m| m.name == "util").unwrap();
    let util_to_core = util.references.iter().find(|r| r.name == "core").unwrap();
    assert_eq!(util_to_core.kind, ReferenceKind::Project);
}

#[test]
fn generation_order_puts_dependencies_first() {
    let universe = build_universe();
    let report = analyze(&universe, &Config::default()).unwrap();

    let position = |name: &str| {
        report
            .generation_order
            .iter()
            .position(|m| m == name)
            .unwrap_or_else(|| panic!("{name} missing from generation order"))
    };
    assert!(position("core") < position("util"));
    assert_eq!(report.generation_order.len(), 3);
}

#[test]
fn platform_and_missing_references_are_split() {
    let universe = build_universe();
    let report = analyze(&universe, &Config::default()).unwrap();

    let ui = report.modules.iter().find(|m| m.name == "ui").unwrap();
    assert!(
        ui.references
            .iter()
            .any(|r| r.name == "System.Runtime" && r.kind == ReferenceKind::Platform)
    );

    assert_eq!(
        report.missing_dependencies.get("ui"),
        Some(&vec!["Vendor.Gone::Vendor.IThing".to_string()])
    );
    assert!(!report.missing_dependencies.contains_key("core"));
}

#[test]
fn fail_on_missing_turns_the_report_into_an_error() {
    let universe = build_universe();
    let config = Config {
        fail_on_missing: true,
        ..Config::default()
    };
    let error = analyze(&universe, &config).unwrap_err();
    assert!(error.to_string().contains("unresolved references"));
}

#[test]
fn configured_platform_module_absorbs_the_missing_reference() {
    let universe = build_universe();
    let mut config = Config::default();
    config.platform_modules.push("Vendor.Gone".to_string());

    let report = analyze(&universe, &config).unwrap();
    assert!(report.missing_dependencies.is_empty());

    let ui = report.modules.iter().find(|m| m.name == "ui").unwrap();
    assert!(
        ui.references
            .iter()
            .any(|r| r.name == "Vendor.Gone" && r.kind == ReferenceKind::Platform)
    );
}

#[test]
fn flags_constants_are_pre_rendered() {
    let universe = build_universe();
    let report = analyze(&universe, &Config::default()).unwrap();

    let core = report.modules.iter().find(|m| m.name == "core").unwrap();
    let expression = core
        .flag_expressions
        .iter()
        .find(|e| e.location == "Core.Settings.DefaultMask")
        .unwrap();
    assert_eq!(expression.rendered, "Read | Write");
}

#[test]
fn cross_module_types_never_enter_the_local_closure() {
    let universe = build_universe();
    let report = analyze(&universe, &Config::default()).unwrap();

    let ui = report.modules.iter().find(|m| m.name == "ui").unwrap();
    let declared: Vec<&str> = ui.declared_types.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(declared, vec!["Ui.Window"]);
}

#[test]
fn snapshot_round_trips_through_json() {
    let universe = build_universe();
    let json = serde_json::to_string(&universe).unwrap();
    let reloaded = Universe::from_json(&json).unwrap();
    assert_eq!(universe, reloaded);
}

#[test]
fn hand_written_snapshot_parses() {
    let json = r#"{
        "modules": [
            { "name": "lib", "top_level": [0] }
        ],
        "types": [
            {
                "module": 0,
                "namespace": ["Lib"],
                "name": "Widget",
                "accessibility": "public",
                "kind": { "class": { "is_abstract": false, "is_sealed": false } },
                "members": [
                    {
                        "field": {
                            "name": "Count",
                            "accessibility": "public",
                            "ty": { "primitive": "i32" }
                        }
                    }
                ]
            }
        ]
    }"#;

    let universe = Universe::from_json(json).unwrap();
    let report = analyze(&universe, &Config::default()).unwrap();
    let lib = &report.modules[0];
    assert_eq!(lib.declared_types[0].name, "Lib.Widget");
    assert_eq!(
        lib.declared_types[0].members,
        Some(vec!["Count".to_string()])
    );
}

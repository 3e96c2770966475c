//! In-memory symbol universe
//!
//! The analysis engine operates over a pre-resolved, read-only symbol graph:
//! modules, the types they declare, members, attribute applications and
//! constant values. Symbols are owned by arenas on [`Universe`] and referenced
//! by [`ModuleId`]/[`TypeId`] everywhere else; nothing in the engine mutates a
//! symbol after the snapshot is loaded.
//!
//! Snapshots are deserialized from JSON and validated once up front
//! ([`Universe::validate`]) so later arena lookups are plain indexing.

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::types::FxIndexSet;

/// Unique identifier for a module in the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Unique identifier for a type in the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(u32);

impl TypeId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Declared accessibility of a type or member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    Public,
    Protected,
    ProtectedInternal,
    Internal,
    Private,
}

impl Accessibility {
    /// Whether a member with this accessibility is reachable from a derived
    /// type declared in another module.
    pub fn is_visible_to_derived(self) -> bool {
        matches!(
            self,
            Accessibility::Public | Accessibility::Protected | Accessibility::ProtectedInternal
        )
    }
}

/// The shape of a named type, with kind-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Class { is_abstract: bool, is_sealed: bool },
    Struct,
    Interface,
    Enum { is_flags: bool },
    Delegate,
}

impl TypeKind {
    /// Structs, enums and delegates are implicitly sealed.
    pub fn is_sealed(&self) -> bool {
        match self {
            TypeKind::Class { is_sealed, .. } => *is_sealed,
            TypeKind::Struct | TypeKind::Enum { .. } | TypeKind::Delegate => true,
            TypeKind::Interface => false,
        }
    }
}

/// Built-in primitive types. References to these never create dependency
/// edges; the platform module that declares them is implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Bool,
    Char,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Str,
    Object,
    Void,
}

/// Target of a named type reference: either a type in the universe (possibly
/// in another module) or one the universe has no symbols for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeTarget {
    Resolved(TypeId),
    External { module: String, name: String },
}

/// A structural type reference as it appears in signatures, base type lists,
/// constraints and constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    Named {
        target: TypeTarget,
        #[serde(default)]
        args: Vec<TypeRef>,
    },
    Array(Box<TypeRef>),
    Pointer(Box<TypeRef>),
    GenericParam(String),
    Primitive(Primitive),
}

impl TypeRef {
    pub fn named(target: TypeTarget) -> Self {
        TypeRef::Named {
            target,
            args: Vec::new(),
        }
    }

    pub fn resolved(id: TypeId) -> Self {
        Self::named(TypeTarget::Resolved(id))
    }
}

/// A compile-time constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantValue {
    Null,
    Bool(bool),
    Char(char),
    Int(i64),
    #[serde(rename = "uint")]
    UInt(u64),
    Float(f64),
    Str(String),
    Array(Vec<ConstantValue>),
    /// A `typeof`-style constant whose value is itself a type reference.
    Type(TypeRef),
}

impl ConstantValue {
    /// Normalize an integral constant to `u64`, wrapping the sign bit the way
    /// the underlying bit pattern would. Non-integral constants yield `None`.
    pub fn as_bits(&self) -> Option<u64> {
        match self {
            ConstantValue::Int(n) => Some(*n as u64),
            ConstantValue::UInt(n) => Some(*n),
            _ => None,
        }
    }
}

/// An attribute applied to a symbol, with the resolved constructor overload
/// and its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeApplication {
    pub attribute: TypeTarget,
    /// Member index of the invoked constructor within the attribute class.
    #[serde(default)]
    pub constructor: Option<usize>,
    #[serde(default)]
    pub arguments: Vec<ConstantValue>,
    #[serde(default)]
    pub named_arguments: Vec<(String, ConstantValue)>,
}

impl AttributeApplication {
    pub fn new(attribute: TypeTarget, constructor: usize) -> Self {
        Self {
            attribute,
            constructor: Some(constructor),
            arguments: Vec::new(),
            named_arguments: Vec::new(),
        }
    }
}

/// A generic parameter with its constraint types and applied attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<TypeRef>,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
}

/// A formal parameter of a method, delegate or indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub default_value: Option<ConstantValue>,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
}

/// Method flavor. Accessors are carried for completeness but the declared
/// surface is driven by their associated property or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Ordinary,
    Constructor,
    StaticConstructor,
    Conversion,
    Operator,
    DelegateInvoke,
    Accessor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMember {
    pub name: String,
    pub accessibility: Accessibility,
    pub ty: TypeRef,
    #[serde(default)]
    pub constant: Option<ConstantValue>,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMember {
    pub name: String,
    pub accessibility: Accessibility,
    pub ty: TypeRef,
    /// Indexer parameters; empty for ordinary properties.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMember {
    pub name: String,
    pub accessibility: Accessibility,
    pub ty: TypeRef,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodMember {
    pub name: String,
    pub accessibility: Accessibility,
    pub kind: MethodKind,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// `None` means void.
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub generic_params: Vec<GenericParam>,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
    #[serde(default)]
    pub return_attributes: Vec<AttributeApplication>,
}

/// A member of a named type. Closed variant: adding a member kind must force
/// every match in the engine to be revisited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Member {
    Field(FieldMember),
    Property(PropertyMember),
    Event(EventMember),
    Method(MethodMember),
    NestedType(TypeId),
}

/// A named type declared somewhere in the universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSymbol {
    pub module: ModuleId,
    #[serde(default)]
    pub namespace: Vec<String>,
    pub name: String,
    #[serde(default)]
    pub arity: u32,
    pub accessibility: Accessibility,
    pub kind: TypeKind,
    #[serde(default)]
    pub base: Option<TypeRef>,
    #[serde(default)]
    pub interfaces: Vec<TypeRef>,
    #[serde(default)]
    pub generic_params: Vec<GenericParam>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
    #[serde(default)]
    pub containing_type: Option<TypeId>,
}

impl TypeSymbol {
    /// Number of declared instance constructors.
    pub fn constructor_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| matches!(m, Member::Method(m) if m.kind == MethodKind::Constructor))
            .count()
    }
}

/// A compiled module: its name, module-level attribute applications, and the
/// top-level types it declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSymbol {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeApplication>,
    #[serde(default)]
    pub top_level: Vec<TypeId>,
}

/// The pre-resolved universe the engine analyzes: module and type arenas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Universe {
    pub modules: Vec<ModuleSymbol>,
    pub types: Vec<TypeSymbol>,
}

impl Universe {
    /// Deserialize a universe snapshot and validate it in one step.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let universe: Universe = serde_json::from_str(json)?;
        universe.validate()?;
        Ok(universe)
    }

    pub fn ty(&self, id: TypeId) -> &TypeSymbol {
        &self.types[id.as_u32() as usize]
    }

    pub fn module(&self, id: ModuleId) -> &ModuleSymbol {
        &self.modules[id.as_u32() as usize]
    }

    pub fn module_ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len() as u32).map(ModuleId::new)
    }

    /// Dotted qualified name of a type, including containing types and a
    /// backtick arity suffix for generics.
    pub fn qualified_name(&self, id: TypeId) -> String {
        let ty = self.ty(id);

        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(type_id) = current {
            let symbol = self.ty(type_id);
            if symbol.arity > 0 {
                segments.push(format!("{}`{}", symbol.name, symbol.arity));
            } else {
                segments.push(symbol.name.clone());
            }
            current = symbol.containing_type;
        }
        segments.reverse();

        let mut out = ty.namespace.join(".");
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(&segments.join("."));
        out
    }

    /// Check every cross-reference in the snapshot once, so arena accessors
    /// can index without range checks afterwards.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut seen_names: FxIndexSet<&str> = FxIndexSet::default();
        for module in &self.modules {
            if !seen_names.insert(module.name.as_str()) {
                return Err(SnapshotError::DuplicateModuleName(module.name.clone()));
            }
            for attr in &module.attributes {
                self.check_attribute(attr)?;
            }
            for &type_id in &module.top_level {
                self.check_type_id(type_id)?;
            }
        }

        // Top-level lists must agree with the module recorded on the type.
        for (index, module) in self.modules.iter().enumerate() {
            for &type_id in &module.top_level {
                if self.ty(type_id).module.as_u32() as usize != index {
                    return Err(SnapshotError::TopLevelTypeInWrongModule {
                        module: module.name.clone(),
                        name: self.ty(type_id).name.clone(),
                    });
                }
            }
        }

        for ty in &self.types {
            self.check_module_id(ty.module)?;
            if let Some(containing) = ty.containing_type {
                self.check_type_id(containing)?;
            }
            if let Some(base) = &ty.base {
                self.check_type_ref(base)?;
            }
            for interface in &ty.interfaces {
                self.check_type_ref(interface)?;
            }
            for param in &ty.generic_params {
                self.check_generic_param(param)?;
            }
            for attr in &ty.attributes {
                self.check_attribute(attr)?;
            }
            for member in &ty.members {
                self.check_member(member)?;
            }
        }

        // Containment chains must terminate at a top-level type; a chain
        // longer than the arena has revisited some id.
        for ty in &self.types {
            let mut steps = 0;
            let mut current = ty.containing_type;
            while let Some(id) = current {
                steps += 1;
                if steps > self.types.len() {
                    return Err(SnapshotError::CyclicContainment {
                        name: ty.name.clone(),
                    });
                }
                current = self.ty(id).containing_type;
            }
        }

        Ok(())
    }

    fn check_type_id(&self, id: TypeId) -> Result<(), SnapshotError> {
        if (id.as_u32() as usize) < self.types.len() {
            Ok(())
        } else {
            Err(SnapshotError::TypeIdOutOfRange {
                id: id.as_u32(),
                len: self.types.len(),
            })
        }
    }

    fn check_module_id(&self, id: ModuleId) -> Result<(), SnapshotError> {
        if (id.as_u32() as usize) < self.modules.len() {
            Ok(())
        } else {
            Err(SnapshotError::ModuleIdOutOfRange {
                id: id.as_u32(),
                len: self.modules.len(),
            })
        }
    }

    fn check_type_ref(&self, type_ref: &TypeRef) -> Result<(), SnapshotError> {
        match type_ref {
            TypeRef::Named { target, args } => {
                if let TypeTarget::Resolved(id) = target {
                    self.check_type_id(*id)?;
                }
                for arg in args {
                    self.check_type_ref(arg)?;
                }
                Ok(())
            }
            TypeRef::Array(element) | TypeRef::Pointer(element) => self.check_type_ref(element),
            TypeRef::GenericParam(_) | TypeRef::Primitive(_) => Ok(()),
        }
    }

    fn check_constant(&self, value: &ConstantValue) -> Result<(), SnapshotError> {
        match value {
            ConstantValue::Array(items) => {
                for item in items {
                    self.check_constant(item)?;
                }
                Ok(())
            }
            ConstantValue::Type(type_ref) => self.check_type_ref(type_ref),
            _ => Ok(()),
        }
    }

    fn check_attribute(&self, attr: &AttributeApplication) -> Result<(), SnapshotError> {
        if let TypeTarget::Resolved(id) = &attr.attribute {
            self.check_type_id(*id)?;
        }
        for argument in &attr.arguments {
            self.check_constant(argument)?;
        }
        for (_, argument) in &attr.named_arguments {
            self.check_constant(argument)?;
        }
        Ok(())
    }

    fn check_generic_param(&self, param: &GenericParam) -> Result<(), SnapshotError> {
        for constraint in &param.constraints {
            self.check_type_ref(constraint)?;
        }
        for attr in &param.attributes {
            self.check_attribute(attr)?;
        }
        Ok(())
    }

    fn check_parameter(&self, parameter: &Parameter) -> Result<(), SnapshotError> {
        self.check_type_ref(&parameter.ty)?;
        if let Some(default) = &parameter.default_value {
            self.check_constant(default)?;
        }
        for attr in &parameter.attributes {
            self.check_attribute(attr)?;
        }
        Ok(())
    }

    fn check_member(&self, member: &Member) -> Result<(), SnapshotError> {
        match member {
            Member::Field(f) => {
                self.check_type_ref(&f.ty)?;
                if let Some(constant) = &f.constant {
                    self.check_constant(constant)?;
                }
                for attr in &f.attributes {
                    self.check_attribute(attr)?;
                }
                Ok(())
            }
            Member::Property(p) => {
                self.check_type_ref(&p.ty)?;
                for parameter in &p.parameters {
                    self.check_parameter(parameter)?;
                }
                for attr in &p.attributes {
                    self.check_attribute(attr)?;
                }
                Ok(())
            }
            Member::Event(e) => {
                self.check_type_ref(&e.ty)?;
                for attr in &e.attributes {
                    self.check_attribute(attr)?;
                }
                Ok(())
            }
            Member::Method(m) => {
                for parameter in &m.parameters {
                    self.check_parameter(parameter)?;
                }
                if let Some(return_type) = &m.return_type {
                    self.check_type_ref(return_type)?;
                }
                for param in &m.generic_params {
                    self.check_generic_param(param)?;
                }
                for attr in m.attributes.iter().chain(&m.return_attributes) {
                    self.check_attribute(attr)?;
                }
                Ok(())
            }
            Member::NestedType(id) => self.check_type_id(*id),
        }
    }
}

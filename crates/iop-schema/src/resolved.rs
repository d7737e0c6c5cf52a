//! # Resolved Schema
//!
//! The closed, immutable type graph produced by [`crate::resolve()`].
//!
//! ## Design
//!
//! Declared types live in three arenas (structs, unions, enums) and refer to
//! each other through typed indices. A self-referencing struct therefore
//! holds a [`StructId`], not itself, and the model stays finite and acyclic
//! in memory whatever the schema graph looks like.
//!
//! Method parameter lists are ordinary structs in the struct arena, named
//! `<interface>.<method>Args`, `...Res` and `...Exn`. The codec does not
//! need to know a struct came from a method.
//!
//! A `ResolvedSchema` is `Send + Sync` and never mutated after
//! construction; wrap it in an `Arc` and share it.

use std::collections::HashMap;

use iop_core::{PrimitiveKind, SchemaFingerprint, Value};

/// Index of a struct in the resolved schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructId(pub(crate) u32);

/// Index of a union in the resolved schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnionId(pub(crate) u32);

/// Index of an enum in the resolved schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnumId(pub(crate) u32);

/// Index of an interface in the resolved schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub(crate) u32);

/// A fully resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(PrimitiveKind),
    Enum(EnumId),
    Union(UnionId),
    Struct(StructId),
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub label: String,
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    /// Members in declaration order.
    pub members: Vec<EnumMember>,
}

impl EnumType {
    pub fn value_of(&self, label: &str) -> Option<i32> {
        self.members.iter().find(|m| m.label == label).map(|m| m.value)
    }

    pub fn label_of(&self, value: i32) -> Option<&str> {
        self.members
            .iter()
            .find(|m| m.value == value)
            .map(|m| m.label.as_str())
    }

    pub fn contains(&self, value: i32) -> bool {
        self.members.iter().any(|m| m.value == value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub tag: u16,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub name: String,
    /// Variants in ascending tag order.
    pub variants: Vec<Variant>,
}

impl UnionType {
    pub fn variant(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn variant_by_tag(&self, tag: u16) -> Option<&Variant> {
        self.variants
            .binary_search_by_key(&tag, |v| v.tag)
            .ok()
            .map(|i| &self.variants[i])
    }

    pub fn tag_of(&self, name: &str) -> Option<u16> {
        self.variant(name).map(|v| v.tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub tag: u16,
    pub ty: TypeRef,
    pub optional: bool,
    /// Default, already converted to a value of `ty`.
    pub default: Option<Value>,
}

impl Field {
    /// True if the field must be on the wire: required and without default.
    pub fn is_mandatory(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub name: String,
    /// Fields in ascending tag order.
    pub fields: Vec<Field>,
}

impl StructType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_tag(&self, tag: u16) -> Option<&Field> {
        self.fields
            .binary_search_by_key(&tag, |f| f.tag)
            .ok()
            .map(|i| &self.fields[i])
    }

    pub fn tag_of(&self, name: &str) -> Option<u16> {
        self.field(name).map(|f| f.tag)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub tag: u16,
    /// Implicit struct built from the `in` parameters.
    pub args: StructId,
    /// Implicit struct built from the `out` parameters; `None` is `void`.
    pub res: Option<StructId>,
    /// Implicit struct built from the `throw` parameters.
    pub exn: Option<StructId>,
}

impl Method {
    pub fn is_void(&self) -> bool {
        self.res.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceType {
    pub name: String,
    /// Methods in ascending tag order.
    pub methods: Vec<Method>,
}

impl InterfaceType {
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleMember {
    pub name: String,
    pub tag: u16,
    pub interface: InterfaceId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleType {
    pub name: String,
    /// Members in ascending tag order.
    pub members: Vec<ModuleMember>,
}

impl ModuleType {
    pub fn member(&self, name: &str) -> Option<&ModuleMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// The immutable resolved schema.
#[derive(Debug, Clone)]
pub struct ResolvedSchema {
    pub(crate) package: String,
    pub(crate) fingerprint: SchemaFingerprint,
    pub(crate) structs: Vec<StructType>,
    pub(crate) unions: Vec<UnionType>,
    pub(crate) enums: Vec<EnumType>,
    pub(crate) interfaces: Vec<InterfaceType>,
    pub(crate) modules: Vec<ModuleType>,
    pub(crate) types_by_name: HashMap<String, TypeRef>,
    pub(crate) interfaces_by_name: HashMap<String, InterfaceId>,
}

impl ResolvedSchema {
    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn fingerprint(&self) -> SchemaFingerprint {
        self.fingerprint
    }

    // Handles must come from this schema instance.

    pub fn struct_type(&self, id: StructId) -> &StructType {
        &self.structs[id.0 as usize]
    }

    pub fn union_type(&self, id: UnionId) -> &UnionType {
        &self.unions[id.0 as usize]
    }

    pub fn enum_type(&self, id: EnumId) -> &EnumType {
        &self.enums[id.0 as usize]
    }

    pub fn interface(&self, id: InterfaceId) -> &InterfaceType {
        &self.interfaces[id.0 as usize]
    }

    /// Look up a declared or implicit type, or a primitive, by name.
    pub fn lookup_type(&self, name: &str) -> Option<TypeRef> {
        if let Some(kind) = PrimitiveKind::from_name(name) {
            return Some(TypeRef::Primitive(kind));
        }
        self.types_by_name.get(name).cloned()
    }

    pub fn struct_id(&self, name: &str) -> Option<StructId> {
        match self.types_by_name.get(name) {
            Some(TypeRef::Struct(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn union_id(&self, name: &str) -> Option<UnionId> {
        match self.types_by_name.get(name) {
            Some(TypeRef::Union(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn enum_id(&self, name: &str) -> Option<EnumId> {
        match self.types_by_name.get(name) {
            Some(TypeRef::Enum(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn interface_by_name(&self, name: &str) -> Option<&InterfaceType> {
        self.interfaces_by_name
            .get(name)
            .map(|id| self.interface(*id))
    }

    pub fn module(&self, name: &str) -> Option<&ModuleType> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Resolve `(module, member, method)` to the interface method it names.
    pub fn route(&self, module: &str, member: &str, method: &str) -> Option<&Method> {
        let member = self.module(module)?.member(member)?;
        self.interface(member.interface).method(method)
    }

    pub fn structs(&self) -> &[StructType] {
        &self.structs
    }

    pub fn unions(&self) -> &[UnionType] {
        &self.unions
    }

    pub fn enums(&self) -> &[EnumType] {
        &self.enums
    }

    pub fn interfaces(&self) -> &[InterfaceType] {
        &self.interfaces
    }

    pub fn modules(&self) -> &[ModuleType] {
        &self.modules
    }

    /// Human-readable name of a type, e.g. `u32`, `User`, `CourseProgress[]`.
    pub fn type_name(&self, ty: &TypeRef) -> String {
        type_name_in(ty, &self.structs, &self.unions, &self.enums)
    }
}

pub(crate) fn type_name_in(
    ty: &TypeRef,
    structs: &[StructType],
    unions: &[UnionType],
    enums: &[EnumType],
) -> String {
    match ty {
        TypeRef::Primitive(kind) => kind.name().to_string(),
        TypeRef::Enum(id) => enums[id.0 as usize].name.clone(),
        TypeRef::Union(id) => unions[id.0 as usize].name.clone(),
        TypeRef::Struct(id) => structs[id.0 as usize].name.clone(),
        TypeRef::Array(inner) => format!("{}[]", type_name_in(inner, structs, unions, enums)),
    }
}

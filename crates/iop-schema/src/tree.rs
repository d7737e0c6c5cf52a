//! # Declaration Tree
//!
//! The validated schema tree handed over by the IDL front-end. Names are
//! still names here; [`crate::resolve`] turns them into links.
//!
//! ## Document Shape
//!
//! ```yaml
//! package: course
//! declarations:
//!   - kind: enum
//!     name: StdCourseType
//!     values: [{label: C}, {label: PYTHON}, {label: RUST}]
//!   - kind: struct
//!     name: User
//!     fields:
//!       - {name: id, type: u64}
//!       - {name: email, type: string, optional: true}
//!       - {name: courses, type: {array: CourseProgress}}
//! ```

use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// A whole schema package as produced by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaTree {
    /// Dotted package name.
    pub package: String,
    /// Declarations in source order.
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

/// One top-level declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    Enum(EnumDecl),
    Union(UnionDecl),
    Struct(StructDecl),
    Interface(InterfaceDecl),
    Module(ModuleDecl),
}

impl Declaration {
    pub fn name(&self) -> &str {
        match self {
            Self::Enum(d) => &d.name,
            Self::Union(d) => &d.name,
            Self::Struct(d) => &d.name,
            Self::Interface(d) => &d.name,
            Self::Module(d) => &d.name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Enum(_) => "enum",
            Self::Union(_) => "union",
            Self::Struct(_) => "struct",
            Self::Interface(_) => "interface",
            Self::Module(_) => "module",
        }
    }
}

/// A reference to a type: a primitive or declared name, or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    Named(String),
    Array { array: Box<TypeExpr> },
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn array_of(element: TypeExpr) -> Self {
        Self::Array {
            array: Box::new(element),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub values: Vec<EnumValueDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValueDecl {
    pub label: String,
    /// Explicit integer value; implicit values continue from the previous one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionDecl {
    pub name: String,
    pub variants: Vec<VariantDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reserved: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u16>,
    /// Default literal, checked against `ty` during resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FieldDecl {
    /// A required field with an implicit tag.
    pub fn new(name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            tag: None,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_tag(mut self, tag: u16) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub methods: Vec<MethodDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u16>,
    /// Request parameters; become the implicit `Args` struct.
    #[serde(rename = "in", default)]
    pub input: Vec<FieldDecl>,
    /// Response parameters; `None` means the method returns `void`.
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<FieldDecl>>,
    /// Failure parameters; become the implicit `Exn` struct.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throw: Option<Vec<FieldDecl>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub name: String,
    pub members: Vec<MemberDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDecl {
    pub name: String,
    pub interface: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u16>,
}

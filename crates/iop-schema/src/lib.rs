//! # iop-schema — Schema Model and Type Resolver
//!
//! Takes the declaration tree produced by the IDL front-end and closes it
//! into an immutable, cycle-checked [`ResolvedSchema`] that the codec and
//! dispatcher consult at call time.
//!
//! ## Pipeline
//!
//! ```text
//! JSON/YAML text
//!   -> load::TreeLoader      shape check against schema-tree.schema.json
//!   -> tree::SchemaTree      names, explicit tags, default literals
//!   -> resolve::resolve      handles, tags, typed defaults, cycle check
//!   -> ResolvedSchema        shared read-only behind an Arc
//! ```
//!
//! ## Crate Policy
//!
//! - Resolution is all-or-nothing; no partially resolved schema escapes.
//! - Depends only on `iop-core` within the workspace.

mod cycle;
mod defaults;
pub mod error;
pub mod load;
pub mod resolve;
pub mod resolved;
mod tags;
pub mod tree;

pub use error::{ResolveError, SchemaError, SchemaLoadError, ValidationViolations, Violation};
pub use load::{load_schema_file, load_tree_file, load_tree_str, TreeFormat, TreeLoader};
pub use resolve::resolve;
pub use resolved::{
    EnumId, EnumMember, EnumType, Field, InterfaceId, InterfaceType, Method, ModuleMember,
    ModuleType, ResolvedSchema, StructId, StructType, TypeRef, UnionId, UnionType, Variant,
};
pub use tree::{
    Declaration, EnumDecl, EnumValueDecl, FieldDecl, InterfaceDecl, MemberDecl, MethodDecl,
    ModuleDecl, SchemaTree, StructDecl, TypeExpr, UnionDecl, VariantDecl,
};

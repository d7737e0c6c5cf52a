//! # iop-core — Foundational Types for the IOP Stack
//!
//! This crate is the leaf of the IOP workspace. It defines the types every
//! other crate exchanges: the primitive kinds a schema can name, the value
//! tree produced and consumed by the binary codec, and the canonical byte
//! production used to fingerprint a schema.
//!
//! ## Key Design Principles
//!
//! 1. **Values are trees.** A struct value owns its field values, a union
//!    value owns its single payload, an array owns its elements. Nothing is
//!    shared and nothing is cyclic.
//!
//! 2. **Field presence is explicit.** [`FieldValue`] distinguishes a value
//!    present on the wire, an explicit null, a default filled in by the
//!    decoder, and a field that is simply absent. Collapsing these into an
//!    `Option` loses the information the compatibility rules depend on.
//!
//! 3. **Fields are keyed by tag.** Tags are the stable identity of a field on
//!    the wire; names live in the schema.
//!
//! 4. **`SchemaFingerprint` only comes from `CanonicalBytes`.** Two processes
//!    agree on a fingerprint if and only if they loaded the same declaration
//!    tree, whatever its key order or whitespace.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `iop-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod primitive;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{fingerprint, SchemaFingerprint};
pub use error::{CanonicalizationError, IopError};
pub use primitive::PrimitiveKind;
pub use value::{FieldValue, StructValue, UnionValue, Value};

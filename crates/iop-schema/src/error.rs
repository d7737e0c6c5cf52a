//! # Schema Errors
//!
//! Load-time and resolution-time failures. Both are fatal to startup: a
//! schema that fails either stage is never published.

use std::fmt;

use iop_core::CanonicalizationError;
use thiserror::Error;

/// A declaration tree could not be loaded.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// The document did not match the declaration tree shape.
    #[error("schema tree '{source_name}' failed shape validation:\n{violations}")]
    ShapeInvalid {
        source_name: String,
        violations: ValidationViolations,
    },

    /// The document could not be read or parsed.
    #[error("cannot load schema tree '{source_name}': {reason}")]
    DocumentLoad { source_name: String, reason: String },

    /// The embedded tree schema failed to compile.
    #[error("tree validator build error: {reason}")]
    ValidatorBuild { reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One shape violation with its location.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer to the violating node in the document.
    pub instance_path: String,
    /// JSON Pointer to the rule in the tree schema.
    pub schema_path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// All shape violations found in one document.
#[derive(Debug, Clone)]
pub struct ValidationViolations(pub(crate) Vec<Violation>);

impl ValidationViolations {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.0
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A declaration tree is well-shaped but not a valid schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// Two declarations share a name, or a declaration shadows a primitive.
    #[error("duplicate declaration '{name}'")]
    DuplicateDeclaration { name: String },

    /// Two members of one declaration share a name.
    #[error("'{owner}' declares member '{member}' more than once")]
    DuplicateMember { owner: String, member: String },

    #[error("'{owner}' references unknown type '{name}'")]
    UnknownType { owner: String, name: String },

    #[error("module '{module}' references unknown interface '{name}'")]
    UnknownInterface { module: String, name: String },

    /// Tag 0, or an implicit tag past the 16-bit tag space.
    #[error("'{owner}.{member}' has invalid tag {tag}")]
    InvalidTag {
        owner: String,
        member: String,
        tag: u32,
    },

    /// Two members end up with the same tag, or a member takes a reserved tag.
    #[error("'{owner}': tag {tag} of '{second}' collides with '{first}'")]
    TagCollision {
        owner: String,
        tag: u16,
        first: String,
        second: String,
    },

    #[error("enum '{owner}': value {value} of '{second}' collides with '{first}'")]
    EnumValueCollision {
        owner: String,
        value: i32,
        first: String,
        second: String,
    },

    /// An implicit enum value would pass `i32::MAX`.
    #[error("enum '{owner}': implicit value of '{label}' overflows i32")]
    EnumValueOverflow { owner: String, label: String },

    #[error("union '{name}' has no variants")]
    EmptyUnion { name: String },

    /// A type contains itself by value.
    #[error("by-value cycle: {}", .path.join(" -> "))]
    SchemaCycle { path: Vec<String> },

    #[error("default of '{owner}.{field}' does not fit type {expected}: {reason}")]
    DefaultTypeMismatch {
        owner: String,
        field: String,
        expected: String,
        reason: String,
    },

    #[error("cannot fingerprint schema tree: {0}")]
    Fingerprint(String),
}

impl From<CanonicalizationError> for ResolveError {
    fn from(err: CanonicalizationError) -> Self {
        Self::Fingerprint(err.to_string())
    }
}

/// Either stage of turning a document into a resolved schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error(transparent)]
    Load(#[from] SchemaLoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl From<SchemaError> for iop_core::IopError {
    fn from(err: SchemaError) -> Self {
        iop_core::IopError::Schema(err.to_string())
    }
}

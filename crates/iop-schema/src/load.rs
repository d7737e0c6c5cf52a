//! # Tree Loading
//!
//! Reads a declaration tree from JSON or YAML and checks its shape against
//! the embedded `schema-tree.schema.json` (Draft 2020-12) before handing it
//! to serde. Shape violations come back as structured [`Violation`]s with
//! instance and schema paths, so a malformed tree is reported in full
//! rather than at the first serde error.

use std::fmt;
use std::path::Path;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{SchemaError, SchemaLoadError, ValidationViolations, Violation};
use crate::resolve::resolve;
use crate::resolved::ResolvedSchema;
use crate::tree::SchemaTree;

const TREE_SCHEMA: &str = include_str!("../schema-tree.schema.json");

/// Document syntax of a declaration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFormat {
    Json,
    Yaml,
}

impl TreeFormat {
    /// `.yaml`/`.yml` is YAML, anything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// A compiled validator for declaration trees.
///
/// Compiling the tree schema is the expensive part; reuse one loader when
/// loading several documents.
pub struct TreeLoader {
    validator: Validator,
}

impl fmt::Debug for TreeLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeLoader").finish_non_exhaustive()
    }
}

impl TreeLoader {
    /// Compile the embedded tree schema.
    pub fn new() -> Result<Self, SchemaLoadError> {
        let schema: Value =
            serde_json::from_str(TREE_SCHEMA).map_err(|e| SchemaLoadError::ValidatorBuild {
                reason: format!("invalid tree schema JSON: {e}"),
            })?;

        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        let validator = opts
            .build(&schema)
            .map_err(|e| SchemaLoadError::ValidatorBuild {
                reason: e.to_string(),
            })?;

        Ok(Self { validator })
    }

    /// Check a parsed document against the tree schema.
    pub fn validate(&self, source_name: &str, document: &Value) -> Result<(), SchemaLoadError> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(document)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaLoadError::ShapeInvalid {
                source_name: source_name.to_string(),
                violations: ValidationViolations(violations),
            })
        }
    }

    /// Parse, validate, and deserialize a tree from text.
    pub fn load_str(
        &self,
        source_name: &str,
        text: &str,
        format: TreeFormat,
    ) -> Result<SchemaTree, SchemaLoadError> {
        let document_error = |reason: String| SchemaLoadError::DocumentLoad {
            source_name: source_name.to_string(),
            reason,
        };

        let document: Value = match format {
            TreeFormat::Yaml => serde_yaml::from_str(text)
                .map_err(|e| document_error(format!("invalid YAML: {e}")))?,
            TreeFormat::Json => serde_json::from_str(text)
                .map_err(|e| document_error(format!("invalid JSON: {e}")))?,
        };

        self.validate(source_name, &document)?;

        serde_json::from_value(document).map_err(|e| document_error(e.to_string()))
    }

    /// Load a tree from a file, picking the format from its extension.
    pub fn load_file(&self, path: &Path) -> Result<SchemaTree, SchemaLoadError> {
        let source_name = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| SchemaLoadError::DocumentLoad {
            source_name: source_name.clone(),
            reason: format!("cannot read file: {e}"),
        })?;
        let tree = self.load_str(&source_name, &text, TreeFormat::from_path(path))?;
        tracing::debug!(
            path = %path.display(),
            package = %tree.package,
            declarations = tree.declarations.len(),
            "schema tree loaded"
        );
        Ok(tree)
    }
}

/// Load a declaration tree from text with a one-off loader.
pub fn load_tree_str(text: &str, format: TreeFormat) -> Result<SchemaTree, SchemaLoadError> {
    TreeLoader::new()?.load_str("<inline>", text, format)
}

/// Load a declaration tree from a file with a one-off loader.
pub fn load_tree_file(path: impl AsRef<Path>) -> Result<SchemaTree, SchemaLoadError> {
    TreeLoader::new()?.load_file(path.as_ref())
}

/// Load and resolve a schema file in one step.
pub fn load_schema_file(path: impl AsRef<Path>) -> Result<ResolvedSchema, SchemaError> {
    let tree = load_tree_file(path)?;
    Ok(resolve(&tree)?)
}

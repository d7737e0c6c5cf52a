//! # Type Resolver
//!
//! Turns a [`SchemaTree`] into a [`ResolvedSchema`]: every name becomes a
//! typed handle, every member gets its tag, every default becomes a typed
//! value, and by-value cycles are rejected.
//!
//! ## Passes
//!
//! 1. **Declare.** Every declaration gets its arena slot, so forward and
//!    self references resolve in the next pass.
//! 2. **Resolve members.** Enums first (defaults may name their labels),
//!    then unions, structs, interfaces (which add their implicit parameter
//!    structs), then modules.
//! 3. **Check cycles** over by-value edges.
//!
//! Resolution is all-or-nothing. The first error is returned and nothing
//! else is kept.

use std::collections::{HashMap, HashSet};

use iop_core::{fingerprint, CanonicalBytes, PrimitiveKind};

use crate::cycle::check_cycles;
use crate::defaults::convert_default;
use crate::error::ResolveError;
use crate::resolved::{
    type_name_in, EnumId, EnumMember, EnumType, Field, InterfaceId, InterfaceType, Method,
    ModuleMember, ModuleType, ResolvedSchema, StructId, StructType, TypeRef, UnionId, UnionType,
    Variant,
};
use crate::tags::TagAllocator;
use crate::tree::{
    Declaration, EnumDecl, FieldDecl, InterfaceDecl, ModuleDecl, SchemaTree, StructDecl,
    TypeExpr, UnionDecl,
};

/// Resolve a declaration tree into an immutable schema.
///
/// # Errors
///
/// Returns the first [`ResolveError`] found. No partial schema is returned.
pub fn resolve(tree: &SchemaTree) -> Result<ResolvedSchema, ResolveError> {
    let fingerprint = fingerprint(&CanonicalBytes::new(tree)?);

    let mut resolver = Resolver::default();
    resolver.declare(tree)?;

    let decls = &tree.declarations;
    for decl in decls {
        if let Declaration::Enum(d) = decl {
            resolver.resolve_enum(d)?;
        }
    }
    for decl in decls {
        if let Declaration::Union(d) = decl {
            resolver.resolve_union(d)?;
        }
    }
    for decl in decls {
        if let Declaration::Struct(d) = decl {
            resolver.resolve_struct(d)?;
        }
    }
    for decl in decls {
        if let Declaration::Interface(d) = decl {
            resolver.resolve_interface(d)?;
        }
    }
    for decl in decls {
        if let Declaration::Module(d) = decl {
            resolver.resolve_module(d)?;
        }
    }

    check_cycles(&resolver.structs, &resolver.unions)?;

    let schema = ResolvedSchema {
        package: tree.package.clone(),
        fingerprint,
        structs: resolver.structs,
        unions: resolver.unions,
        enums: resolver.enums,
        interfaces: resolver.interfaces,
        modules: resolver.modules,
        types_by_name: resolver.types_by_name,
        interfaces_by_name: resolver.interfaces_by_name,
    };

    tracing::info!(
        package = %schema.package,
        structs = schema.structs.len(),
        unions = schema.unions.len(),
        enums = schema.enums.len(),
        interfaces = schema.interfaces.len(),
        modules = schema.modules.len(),
        fingerprint = %schema.fingerprint,
        "schema resolved"
    );

    Ok(schema)
}

#[derive(Default)]
struct Resolver {
    structs: Vec<StructType>,
    unions: Vec<UnionType>,
    enums: Vec<EnumType>,
    interfaces: Vec<InterfaceType>,
    modules: Vec<ModuleType>,
    types_by_name: HashMap<String, TypeRef>,
    interfaces_by_name: HashMap<String, InterfaceId>,
    declared: HashSet<String>,
}

fn check_unique<'a>(
    owner: &str,
    names: impl IntoIterator<Item = &'a str>,
) -> Result<(), ResolveError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ResolveError::DuplicateMember {
                owner: owner.to_string(),
                member: name.to_string(),
            });
        }
    }
    Ok(())
}

impl Resolver {
    fn claim_name(&mut self, name: &str) -> Result<(), ResolveError> {
        if PrimitiveKind::from_name(name).is_some() || !self.declared.insert(name.to_string()) {
            return Err(ResolveError::DuplicateDeclaration {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn declare(&mut self, tree: &SchemaTree) -> Result<(), ResolveError> {
        for decl in &tree.declarations {
            self.claim_name(decl.name())?;
            let name = decl.name().to_string();
            match decl {
                Declaration::Enum(_) => {
                    let id = EnumId(self.enums.len() as u32);
                    self.enums.push(EnumType {
                        name: name.clone(),
                        members: Vec::new(),
                    });
                    self.types_by_name.insert(name, TypeRef::Enum(id));
                }
                Declaration::Union(_) => {
                    let id = UnionId(self.unions.len() as u32);
                    self.unions.push(UnionType {
                        name: name.clone(),
                        variants: Vec::new(),
                    });
                    self.types_by_name.insert(name, TypeRef::Union(id));
                }
                Declaration::Struct(_) => {
                    let id = StructId(self.structs.len() as u32);
                    self.structs.push(StructType {
                        name: name.clone(),
                        fields: Vec::new(),
                    });
                    self.types_by_name.insert(name, TypeRef::Struct(id));
                }
                Declaration::Interface(_) => {
                    let id = InterfaceId(self.interfaces.len() as u32);
                    self.interfaces.push(InterfaceType {
                        name: name.clone(),
                        methods: Vec::new(),
                    });
                    self.interfaces_by_name.insert(name, id);
                }
                // Modules are pushed once resolved; nothing refers to them.
                Declaration::Module(_) => {}
            }
        }
        Ok(())
    }

    fn resolve_type(&self, owner: &str, expr: &TypeExpr) -> Result<TypeRef, ResolveError> {
        match expr {
            TypeExpr::Named(name) => {
                if let Some(kind) = PrimitiveKind::from_name(name) {
                    return Ok(TypeRef::Primitive(kind));
                }
                self.types_by_name
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ResolveError::UnknownType {
                        owner: owner.to_string(),
                        name: name.clone(),
                    })
            }
            TypeExpr::Array { array } => Ok(TypeRef::array_of(self.resolve_type(owner, array)?)),
        }
    }

    fn resolve_fields(
        &self,
        owner: &str,
        decls: &[FieldDecl],
        reserved: &[u16],
    ) -> Result<Vec<Field>, ResolveError> {
        check_unique(owner, decls.iter().map(|f| f.name.as_str()))?;
        let mut tags = TagAllocator::new(owner, reserved);
        let mut fields = Vec::with_capacity(decls.len());

        for decl in decls {
            let tag = tags.assign(&decl.name, decl.tag)?;
            let ty = self.resolve_type(owner, &decl.ty)?;
            let default = match &decl.default {
                Some(literal) => Some(convert_default(&self.enums, &ty, literal).map_err(
                    |reason| ResolveError::DefaultTypeMismatch {
                        owner: owner.to_string(),
                        field: decl.name.clone(),
                        expected: type_name_in(&ty, &self.structs, &self.unions, &self.enums),
                        reason,
                    },
                )?),
                None => None,
            };
            fields.push(Field {
                name: decl.name.clone(),
                tag,
                ty,
                optional: decl.optional,
                default,
            });
        }

        fields.sort_by_key(|f| f.tag);
        Ok(fields)
    }

    fn resolve_enum(&mut self, decl: &EnumDecl) -> Result<(), ResolveError> {
        check_unique(&decl.name, decl.values.iter().map(|v| v.label.as_str()))?;
        let mut by_value: HashMap<i32, &str> = HashMap::new();
        let mut members = Vec::with_capacity(decl.values.len());
        let mut next: Option<i32> = Some(0);

        for v in &decl.values {
            let value = match v.value {
                Some(explicit) => explicit,
                None => next.ok_or_else(|| ResolveError::EnumValueOverflow {
                    owner: decl.name.clone(),
                    label: v.label.clone(),
                })?,
            };
            if let Some(first) = by_value.insert(value, &v.label) {
                return Err(ResolveError::EnumValueCollision {
                    owner: decl.name.clone(),
                    value,
                    first: first.to_string(),
                    second: v.label.clone(),
                });
            }
            members.push(EnumMember {
                label: v.label.clone(),
                value,
            });
            next = value.checked_add(1);
        }

        if let Some(TypeRef::Enum(id)) = self.types_by_name.get(&decl.name) {
            self.enums[id.0 as usize].members = members;
        }
        Ok(())
    }

    fn resolve_union(&mut self, decl: &UnionDecl) -> Result<(), ResolveError> {
        if decl.variants.is_empty() {
            return Err(ResolveError::EmptyUnion {
                name: decl.name.clone(),
            });
        }
        check_unique(&decl.name, decl.variants.iter().map(|v| v.name.as_str()))?;
        let mut tags = TagAllocator::new(&decl.name, &decl.reserved);
        let mut variants = Vec::with_capacity(decl.variants.len());

        for v in &decl.variants {
            let tag = tags.assign(&v.name, v.tag)?;
            let ty = self.resolve_type(&decl.name, &v.ty)?;
            variants.push(Variant {
                name: v.name.clone(),
                tag,
                ty,
            });
        }
        variants.sort_by_key(|v| v.tag);

        if let Some(TypeRef::Union(id)) = self.types_by_name.get(&decl.name) {
            self.unions[id.0 as usize].variants = variants;
        }
        Ok(())
    }

    fn resolve_struct(&mut self, decl: &StructDecl) -> Result<(), ResolveError> {
        let fields = self.resolve_fields(&decl.name, &decl.fields, &decl.reserved)?;
        if let Some(TypeRef::Struct(id)) = self.types_by_name.get(&decl.name) {
            self.structs[id.0 as usize].fields = fields;
        }
        Ok(())
    }

    /// Add a method parameter list as a struct of its own.
    fn implicit_struct(
        &mut self,
        name: String,
        params: &[FieldDecl],
    ) -> Result<StructId, ResolveError> {
        self.claim_name(&name)?;
        let fields = self.resolve_fields(&name, params, &[])?;
        let id = StructId(self.structs.len() as u32);
        self.types_by_name.insert(name.clone(), TypeRef::Struct(id));
        self.structs.push(StructType { name, fields });
        Ok(id)
    }

    fn resolve_interface(&mut self, decl: &InterfaceDecl) -> Result<(), ResolveError> {
        check_unique(&decl.name, decl.methods.iter().map(|m| m.name.as_str()))?;
        let mut tags = TagAllocator::new(&decl.name, &[]);
        let mut methods = Vec::with_capacity(decl.methods.len());

        for m in &decl.methods {
            let tag = tags.assign(&m.name, m.tag)?;
            let prefix = format!("{}.{}", decl.name, m.name);
            let args = self.implicit_struct(format!("{prefix}Args"), &m.input)?;
            let res = match &m.output {
                Some(out) => Some(self.implicit_struct(format!("{prefix}Res"), out)?),
                None => None,
            };
            let exn = match &m.throw {
                Some(throw) => Some(self.implicit_struct(format!("{prefix}Exn"), throw)?),
                None => None,
            };
            methods.push(Method {
                name: m.name.clone(),
                tag,
                args,
                res,
                exn,
            });
        }
        methods.sort_by_key(|m| m.tag);

        if let Some(id) = self.interfaces_by_name.get(&decl.name) {
            self.interfaces[id.0 as usize].methods = methods;
        }
        Ok(())
    }

    fn resolve_module(&mut self, decl: &ModuleDecl) -> Result<(), ResolveError> {
        check_unique(&decl.name, decl.members.iter().map(|m| m.name.as_str()))?;
        let mut tags = TagAllocator::new(&decl.name, &[]);
        let mut members = Vec::with_capacity(decl.members.len());

        for m in &decl.members {
            let tag = tags.assign(&m.name, m.tag)?;
            let interface = *self.interfaces_by_name.get(&m.interface).ok_or_else(|| {
                ResolveError::UnknownInterface {
                    module: decl.name.clone(),
                    name: m.interface.clone(),
                }
            })?;
            members.push(ModuleMember {
                name: m.name.clone(),
                tag,
                interface,
            });
        }
        members.sort_by_key(|m| m.tag);

        self.modules.push(ModuleType {
            name: decl.name.clone(),
            members,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{EnumValueDecl, MemberDecl, MethodDecl, VariantDecl};
    use iop_core::Value;
    use serde_json::json;

    fn named(n: &str) -> TypeExpr {
        TypeExpr::named(n)
    }

    fn tree(declarations: Vec<Declaration>) -> SchemaTree {
        SchemaTree {
            package: "test".into(),
            declarations,
        }
    }

    fn strukt(name: &str, fields: Vec<FieldDecl>) -> Declaration {
        Declaration::Struct(StructDecl {
            name: name.into(),
            fields,
            reserved: vec![],
        })
    }

    fn course_tree() -> SchemaTree {
        tree(vec![
            Declaration::Enum(EnumDecl {
                name: "StdCourseType".into(),
                values: ["C", "PYTHON", "RUST"]
                    .iter()
                    .map(|l| EnumValueDecl {
                        label: l.to_string(),
                        value: None,
                    })
                    .collect(),
            }),
            Declaration::Union(UnionDecl {
                name: "CourseType".into(),
                variants: vec![
                    VariantDecl {
                        name: "std".into(),
                        ty: named("StdCourseType"),
                        tag: None,
                    },
                    VariantDecl {
                        name: "customId".into(),
                        ty: named("u32"),
                        tag: None,
                    },
                ],
                reserved: vec![],
            }),
            strukt(
                "CourseProgress",
                vec![
                    FieldDecl::new("type", named("CourseType")),
                    FieldDecl::new("completedSteps", named("u32")),
                ],
            ),
            Declaration::Interface(InterfaceDecl {
                name: "user".into(),
                methods: vec![MethodDecl {
                    name: "create".into(),
                    tag: None,
                    input: vec![
                        FieldDecl::new("name", named("string")),
                        FieldDecl::new("email", named("string")).optional(),
                    ],
                    output: Some(vec![FieldDecl::new("id", named("u64"))]),
                    throw: None,
                }],
            }),
            Declaration::Module(ModuleDecl {
                name: "Course".into(),
                members: vec![MemberDecl {
                    name: "user".into(),
                    interface: "user".into(),
                    tag: None,
                }],
            }),
        ])
    }

    #[test]
    fn test_resolves_course_schema() {
        let schema = resolve(&course_tree()).unwrap();
        let en = schema.enum_type(schema.enum_id("StdCourseType").unwrap());
        assert_eq!(en.value_of("RUST"), Some(2));

        let un = schema.union_type(schema.union_id("CourseType").unwrap());
        assert_eq!(un.tag_of("std"), Some(1));
        assert_eq!(un.tag_of("customId"), Some(2));

        let method = schema.route("Course", "user", "create").unwrap();
        let args = schema.struct_type(method.args);
        assert_eq!(args.name, "user.createArgs");
        assert_eq!(args.tag_of("email"), Some(2));
        assert!(args.field("email").unwrap().optional);
        assert!(!method.is_void());
        assert_eq!(
            schema.lookup_type("user.createRes"),
            method.res.map(TypeRef::Struct)
        );
    }

    #[test]
    fn test_tag_assignment_is_deterministic() {
        let t = tree(vec![strukt(
            "S",
            vec![
                FieldDecl::new("A", named("u8")),
                FieldDecl::new("B", named("u8")),
                FieldDecl::new("C", named("u8")),
            ],
        )]);
        for _ in 0..3 {
            let schema = resolve(&t).unwrap();
            let s = schema.struct_type(schema.struct_id("S").unwrap());
            let tags: Vec<_> = ["A", "B", "C"].iter().map(|n| s.tag_of(n)).collect();
            assert_eq!(tags, vec![Some(1), Some(2), Some(3)]);
        }
    }

    #[test]
    fn test_fields_are_stored_in_tag_order() {
        let t = tree(vec![strukt(
            "S",
            vec![
                FieldDecl::new("late", named("u8")).with_tag(9),
                FieldDecl::new("early", named("u8")).with_tag(2),
            ],
        )]);
        let schema = resolve(&t).unwrap();
        let s = schema.struct_type(schema.struct_id("S").unwrap());
        let names: Vec<_> = s.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn test_forward_and_self_references() {
        let t = tree(vec![
            strukt(
                "Node",
                vec![
                    FieldDecl::new("children", TypeExpr::array_of(named("Node"))),
                    FieldDecl::new("meta", named("Meta")).optional(),
                ],
            ),
            strukt("Meta", vec![FieldDecl::new("parent", named("Node")).optional()]),
        ]);
        assert!(resolve(&t).is_ok());
    }

    #[test]
    fn test_value_cycle_rejected() {
        let t = tree(vec![
            strukt("A", vec![FieldDecl::new("b", named("B"))]),
            strukt("B", vec![FieldDecl::new("a", named("A"))]),
        ]);
        assert_eq!(
            resolve(&t).unwrap_err(),
            ResolveError::SchemaCycle {
                path: vec!["A".into(), "B".into(), "A".into()]
            }
        );
    }

    #[test]
    fn test_unknown_type() {
        let t = tree(vec![strukt("S", vec![FieldDecl::new("x", named("Nope"))])]);
        assert_eq!(
            resolve(&t).unwrap_err(),
            ResolveError::UnknownType {
                owner: "S".into(),
                name: "Nope".into()
            }
        );
    }

    #[test]
    fn test_interface_is_not_a_type() {
        let mut t = course_tree();
        t.declarations
            .push(strukt("Holder", vec![FieldDecl::new("u", named("user"))]));
        assert!(matches!(
            resolve(&t).unwrap_err(),
            ResolveError::UnknownType { .. }
        ));
    }

    #[test]
    fn test_duplicate_declaration_and_primitive_shadowing() {
        let dup = tree(vec![strukt("S", vec![]), strukt("S", vec![])]);
        assert!(matches!(
            resolve(&dup).unwrap_err(),
            ResolveError::DuplicateDeclaration { .. }
        ));
        let shadow = tree(vec![strukt("u32", vec![])]);
        assert!(matches!(
            resolve(&shadow).unwrap_err(),
            ResolveError::DuplicateDeclaration { .. }
        ));
    }

    #[test]
    fn test_duplicate_field_name() {
        let t = tree(vec![strukt(
            "S",
            vec![
                FieldDecl::new("x", named("u8")),
                FieldDecl::new("x", named("u16")),
            ],
        )]);
        assert_eq!(
            resolve(&t).unwrap_err(),
            ResolveError::DuplicateMember {
                owner: "S".into(),
                member: "x".into()
            }
        );
    }

    #[test]
    fn test_explicit_tag_reused_by_implicit_is_collision() {
        let t = tree(vec![strukt(
            "S",
            vec![
                FieldDecl::new("a", named("u8")).with_tag(2),
                FieldDecl::new("b", named("u8")).with_tag(1),
                FieldDecl::new("c", named("u8")),
            ],
        )]);
        assert!(matches!(
            resolve(&t).unwrap_err(),
            ResolveError::TagCollision { tag: 2, .. }
        ));
    }

    #[test]
    fn test_reserved_tags_skipped_in_struct() {
        let t = tree(vec![Declaration::Struct(StructDecl {
            name: "S".into(),
            fields: vec![
                FieldDecl::new("a", named("u8")),
                FieldDecl::new("b", named("u8")),
            ],
            reserved: vec![2],
        })]);
        let schema = resolve(&t).unwrap();
        let s = schema.struct_type(schema.struct_id("S").unwrap());
        assert_eq!(s.tag_of("b"), Some(3));
    }

    #[test]
    fn test_defaults_are_typed() {
        let t = tree(vec![
            Declaration::Enum(EnumDecl {
                name: "E".into(),
                values: vec![
                    EnumValueDecl {
                        label: "A".into(),
                        value: Some(5),
                    },
                    EnumValueDecl {
                        label: "B".into(),
                        value: None,
                    },
                ],
            }),
            strukt(
                "S",
                vec![
                    FieldDecl::new("n", named("u16")).with_default(json!(7)),
                    FieldDecl::new("e", named("E")).with_default(json!("B")),
                ],
            ),
        ]);
        let schema = resolve(&t).unwrap();
        let s = schema.struct_type(schema.struct_id("S").unwrap());
        assert_eq!(s.field("n").unwrap().default, Some(Value::U16(7)));
        assert_eq!(s.field("e").unwrap().default, Some(Value::Enum(6)));
        assert!(!s.field("n").unwrap().is_mandatory());
    }

    #[test]
    fn test_default_type_mismatch() {
        let t = tree(vec![strukt(
            "S",
            vec![FieldDecl::new("flag", named("bool")).with_default(json!("yes"))],
        )]);
        match resolve(&t).unwrap_err() {
            ResolveError::DefaultTypeMismatch {
                owner,
                field,
                expected,
                ..
            } => {
                assert_eq!(owner, "S");
                assert_eq!(field, "flag");
                assert_eq!(expected, "bool");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_enum_value_collision() {
        let t = tree(vec![Declaration::Enum(EnumDecl {
            name: "E".into(),
            values: vec![
                EnumValueDecl {
                    label: "A".into(),
                    value: Some(1),
                },
                EnumValueDecl {
                    label: "B".into(),
                    value: Some(0),
                },
                EnumValueDecl {
                    label: "C".into(),
                    value: None,
                },
            ],
        })]);
        assert_eq!(
            resolve(&t).unwrap_err(),
            ResolveError::EnumValueCollision {
                owner: "E".into(),
                value: 1,
                first: "A".into(),
                second: "C".into(),
            }
        );
    }

    #[test]
    fn test_empty_union() {
        let t = tree(vec![Declaration::Union(UnionDecl {
            name: "U".into(),
            variants: vec![],
            reserved: vec![],
        })]);
        assert_eq!(
            resolve(&t).unwrap_err(),
            ResolveError::EmptyUnion { name: "U".into() }
        );
    }

    #[test]
    fn test_unknown_interface_in_module() {
        let t = tree(vec![Declaration::Module(ModuleDecl {
            name: "M".into(),
            members: vec![MemberDecl {
                name: "x".into(),
                interface: "missing".into(),
                tag: None,
            }],
        })]);
        assert!(matches!(
            resolve(&t).unwrap_err(),
            ResolveError::UnknownInterface { .. }
        ));
    }

    #[test]
    fn test_fingerprint_is_stable_and_content_sensitive() {
        let a = resolve(&course_tree()).unwrap();
        let b = resolve(&course_tree()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let mut changed = course_tree();
        changed.package = "other".into();
        assert_ne!(a.fingerprint(), resolve(&changed).unwrap().fingerprint());
    }

    #[test]
    fn test_resolved_schema_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResolvedSchema>();
    }
}

//! By-value cycle detection.
//!
//! A struct or union that contains itself by value, directly or through
//! other types, has no finite encoding. Edges considered: required non-array
//! struct fields of struct or union type, and union variants of struct or
//! union type. Optional fields and arrays may be empty, so they break cycles.

use crate::error::ResolveError;
use crate::resolved::{StructType, TypeRef, UnionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Node {
    Struct(u32),
    Union(u32),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

struct Graph<'a> {
    structs: &'a [StructType],
    unions: &'a [UnionType],
}

impl Graph<'_> {
    fn name(&self, node: Node) -> &str {
        match node {
            Node::Struct(i) => &self.structs[i as usize].name,
            Node::Union(i) => &self.unions[i as usize].name,
        }
    }

    fn edges(&self, node: Node) -> Vec<Node> {
        fn target(ty: &TypeRef) -> Option<Node> {
            match ty {
                TypeRef::Struct(id) => Some(Node::Struct(id.0)),
                TypeRef::Union(id) => Some(Node::Union(id.0)),
                _ => None,
            }
        }
        match node {
            Node::Struct(i) => self.structs[i as usize]
                .fields
                .iter()
                .filter(|f| !f.optional)
                .filter_map(|f| target(&f.ty))
                .collect(),
            Node::Union(i) => self.unions[i as usize]
                .variants
                .iter()
                .filter_map(|v| target(&v.ty))
                .collect(),
        }
    }

    fn mark_index(&self, node: Node) -> usize {
        match node {
            Node::Struct(i) => i as usize,
            Node::Union(i) => self.structs.len() + i as usize,
        }
    }
}

/// Fail with the first by-value cycle found, in declaration order.
pub(crate) fn check_cycles(
    structs: &[StructType],
    unions: &[UnionType],
) -> Result<(), ResolveError> {
    let graph = Graph { structs, unions };
    let mut marks = vec![Mark::Unvisited; structs.len() + unions.len()];
    let roots = (0..structs.len() as u32)
        .map(Node::Struct)
        .chain((0..unions.len() as u32).map(Node::Union));

    for root in roots {
        if marks[graph.mark_index(root)] != Mark::Unvisited {
            continue;
        }
        let mut stack = Vec::new();
        visit(&graph, root, &mut marks, &mut stack)?;
    }
    Ok(())
}

fn visit(
    graph: &Graph<'_>,
    node: Node,
    marks: &mut [Mark],
    stack: &mut Vec<Node>,
) -> Result<(), ResolveError> {
    marks[graph.mark_index(node)] = Mark::OnStack;
    stack.push(node);

    for next in graph.edges(node) {
        match marks[graph.mark_index(next)] {
            Mark::Done => {}
            Mark::OnStack => {
                let start = stack.iter().position(|n| *n == next).unwrap_or(0);
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .map(|n| graph.name(*n).to_string())
                    .collect();
                path.push(graph.name(next).to_string());
                return Err(ResolveError::SchemaCycle { path });
            }
            Mark::Unvisited => visit(graph, next, marks, stack)?,
        }
    }

    stack.pop();
    marks[graph.mark_index(node)] = Mark::Done;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolved::{Field, StructId, UnionId, Variant};
    use iop_core::PrimitiveKind;

    fn field(name: &str, tag: u16, ty: TypeRef, optional: bool) -> Field {
        Field {
            name: name.into(),
            tag,
            ty,
            optional,
            default: None,
        }
    }

    fn strukt(name: &str, fields: Vec<Field>) -> StructType {
        StructType {
            name: name.into(),
            fields,
        }
    }

    #[test]
    fn test_self_reference_by_value_is_a_cycle() {
        let structs = vec![strukt(
            "Node",
            vec![field("next", 1, TypeRef::Struct(StructId(0)), false)],
        )];
        let err = check_cycles(&structs, &[]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::SchemaCycle {
                path: vec!["Node".into(), "Node".into()]
            }
        );
    }

    #[test]
    fn test_optional_and_array_break_cycles() {
        let structs = vec![strukt(
            "Node",
            vec![
                field("next", 1, TypeRef::Struct(StructId(0)), true),
                field(
                    "children",
                    2,
                    TypeRef::array_of(TypeRef::Struct(StructId(0))),
                    false,
                ),
                field("value", 3, TypeRef::Primitive(PrimitiveKind::I32), false),
            ],
        )];
        assert!(check_cycles(&structs, &[]).is_ok());
    }

    #[test]
    fn test_cycle_through_union_reports_path() {
        let structs = vec![
            strukt("Leaf", vec![]),
            strukt(
                "Tree",
                vec![field("root", 1, TypeRef::Union(UnionId(0)), false)],
            ),
        ];
        let unions = vec![UnionType {
            name: "Item".into(),
            variants: vec![
                Variant {
                    name: "leaf".into(),
                    tag: 1,
                    ty: TypeRef::Struct(StructId(0)),
                },
                Variant {
                    name: "tree".into(),
                    tag: 2,
                    ty: TypeRef::Struct(StructId(1)),
                },
            ],
        }];
        let err = check_cycles(&structs, &unions).unwrap_err();
        assert_eq!(
            err,
            ResolveError::SchemaCycle {
                path: vec!["Tree".into(), "Item".into(), "Tree".into()]
            }
        );
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let structs = vec![
            strukt("D", vec![]),
            strukt("B", vec![field("d", 1, TypeRef::Struct(StructId(0)), false)]),
            strukt("C", vec![field("d", 1, TypeRef::Struct(StructId(0)), false)]),
            strukt(
                "A",
                vec![
                    field("b", 1, TypeRef::Struct(StructId(1)), false),
                    field("c", 2, TypeRef::Struct(StructId(2)), false),
                ],
            ),
        ];
        assert!(check_cycles(&structs, &[]).is_ok());
    }
}

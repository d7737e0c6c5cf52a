//! # Schema-Driven Encoding
//!
//! Walks a [`Value`] alongside its [`TypeRef`] and emits members through a
//! [`WireWriter`]. Shape is checked on the way: an encoder never produces
//! bytes its own decoder would reject.
//!
//! ## Top-Level Framing
//!
//! | type      | top-level bytes                     |
//! |-----------|-------------------------------------|
//! | struct    | struct body (members in tag order)  |
//! | union     | the single active member            |
//! | otherwise | one member with tag 0               |

use iop_core::{FieldValue, PrimitiveKind, StructValue, UnionValue, Value};
use iop_schema::{ResolvedSchema, StructId, TypeRef, UnionId};

use crate::error::EncodeError;
use crate::writer::WireWriter;

/// Encode `value` as a top-level payload of type `ty`.
pub fn encode(
    schema: &ResolvedSchema,
    value: &Value,
    ty: &TypeRef,
) -> Result<Vec<u8>, EncodeError> {
    let mut enc = Encoder {
        schema,
        out: WireWriter::new(),
    };
    match ty {
        TypeRef::Struct(id) => {
            let sv = value.as_struct().ok_or_else(|| enc.mismatch(ty, value))?;
            enc.struct_body(*id, sv)?;
        }
        TypeRef::Union(id) => {
            let uv = value.as_union().ok_or_else(|| enc.mismatch(ty, value))?;
            enc.union_body(*id, uv)?;
        }
        _ => enc.member(0, value, ty)?,
    }
    Ok(enc.out.into_bytes())
}

/// Encode a struct value as a top-level payload.
pub fn encode_struct(
    schema: &ResolvedSchema,
    id: StructId,
    value: &StructValue,
) -> Result<Vec<u8>, EncodeError> {
    let mut enc = Encoder {
        schema,
        out: WireWriter::new(),
    };
    enc.struct_body(id, value)?;
    Ok(enc.out.into_bytes())
}

struct Encoder<'s> {
    schema: &'s ResolvedSchema,
    out: WireWriter,
}

impl Encoder<'_> {
    fn mismatch(&self, ty: &TypeRef, value: &Value) -> EncodeError {
        let name = self.schema.type_name(ty);
        EncodeError::TypeMismatch {
            type_name: name.clone(),
            expected: name,
            found: value.kind_name(),
        }
    }

    fn too_large(&self, ty: &TypeRef, len: usize) -> EncodeError {
        EncodeError::TooLarge {
            type_name: self.schema.type_name(ty),
            len,
        }
    }

    fn struct_body(&mut self, id: StructId, value: &StructValue) -> Result<(), EncodeError> {
        let schema = self.schema;
        let st = schema.struct_type(id);

        if let Some(tag) = value.tags().find(|t| st.field_by_tag(*t).is_none()) {
            return Err(EncodeError::UnknownField {
                type_name: st.name.clone(),
                tag,
            });
        }

        for field in &st.fields {
            match value.get(field.tag) {
                FieldValue::Present(v) => self.member(field.tag, v, &field.ty)?,
                FieldValue::Null if field.optional => self.out.put_null(field.tag),
                FieldValue::Null => {
                    return Err(EncodeError::NullNotAllowed {
                        type_name: st.name.clone(),
                        field: field.name.clone(),
                        tag: field.tag,
                    })
                }
                FieldValue::Defaulted(_) | FieldValue::Absent => {
                    if field.is_mandatory() {
                        return Err(EncodeError::MissingRequiredField {
                            type_name: st.name.clone(),
                            field: field.name.clone(),
                            tag: field.tag,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn union_body(&mut self, id: UnionId, value: &UnionValue) -> Result<(), EncodeError> {
        let schema = self.schema;
        let un = schema.union_type(id);
        let variant = un
            .variant_by_tag(value.tag)
            .ok_or_else(|| EncodeError::UnknownUnionTag {
                type_name: un.name.clone(),
                tag: value.tag,
            })?;
        self.member(variant.tag, &value.value, &variant.ty)
    }

    fn member(&mut self, tag: u16, value: &Value, ty: &TypeRef) -> Result<(), EncodeError> {
        match (ty, value) {
            (TypeRef::Primitive(kind), _) => self.primitive(tag, *kind, value, ty),
            (TypeRef::Enum(id), Value::Enum(v)) => {
                let en = self.schema.enum_type(*id);
                if !en.contains(*v) {
                    return Err(EncodeError::UnknownEnumValue {
                        type_name: en.name.clone(),
                        value: *v,
                    });
                }
                self.out.put_int(tag, i128::from(*v));
                Ok(())
            }
            (TypeRef::Struct(id), Value::Struct(sv)) => {
                let block = self.out.open_block(tag);
                self.struct_body(*id, sv)?;
                let len = self.out.len();
                self.out.close_block(block).ok_or_else(|| self.too_large(ty, len))
            }
            (TypeRef::Union(id), Value::Union(uv)) => {
                let block = self.out.open_block(tag);
                self.union_body(*id, uv)?;
                let len = self.out.len();
                self.out.close_block(block).ok_or_else(|| self.too_large(ty, len))
            }
            (TypeRef::Array(element), Value::Array(items)) => {
                self.out
                    .put_repeat(tag, items.len())
                    .ok_or_else(|| self.too_large(ty, items.len()))?;
                for item in items {
                    self.member(0, item, element)?;
                }
                Ok(())
            }
            _ => Err(self.mismatch(ty, value)),
        }
    }

    fn primitive(
        &mut self,
        tag: u16,
        kind: PrimitiveKind,
        value: &Value,
        ty: &TypeRef,
    ) -> Result<(), EncodeError> {
        match (kind, value) {
            (PrimitiveKind::Bool, Value::Bool(b)) => self.out.put_int(tag, i128::from(*b)),
            (PrimitiveKind::I8, Value::I8(_))
            | (PrimitiveKind::U8, Value::U8(_))
            | (PrimitiveKind::I16, Value::I16(_))
            | (PrimitiveKind::U16, Value::U16(_))
            | (PrimitiveKind::I32, Value::I32(_))
            | (PrimitiveKind::U32, Value::U32(_))
            | (PrimitiveKind::I64, Value::I64(_))
            | (PrimitiveKind::U64, Value::U64(_)) => {
                let v = value.as_integer().ok_or_else(|| self.mismatch(ty, value))?;
                self.out.put_int(tag, v);
            }
            (PrimitiveKind::F32, Value::F32(v)) => self.out.put_f32(tag, *v),
            (PrimitiveKind::F64, Value::F64(v)) => self.out.put_f64(tag, *v),
            (PrimitiveKind::String, Value::String(s)) => self
                .out
                .put_bytes(tag, s.as_bytes())
                .ok_or_else(|| self.too_large(ty, s.len()))?,
            (PrimitiveKind::Bytes, Value::Bytes(b)) => self
                .out
                .put_bytes(tag, b)
                .ok_or_else(|| self.too_large(ty, b.len()))?,
            _ => return Err(self.mismatch(ty, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::basic_schema;

    #[test]
    fn test_matches_reference_bytes() {
        let schema = basic_schema();
        let inner = StructValue::new().with(1, true).with(5, Value::U8(b'\n'));
        let test = StructValue::new()
            .with(1, 1u32)
            .with(2, Value::Array(vec!["a".into(), "b".into()]))
            .with(4, inner);
        let bytes = encode_struct(&schema, schema.struct_id("Test").unwrap(), &test).unwrap();
        let expected = [
            0x81, 0x01, // int
            0xe2, 0x02, 0x00, 0x00, 0x00, // seq, 2 elements
            0x00, 0x02, b'a', 0x00, // "a"
            0x00, 0x02, b'b', 0x00, // "b"
            0x44, 0x04, 0x00, 0x00, 0x00, // inner, 4 bytes
            0x81, 0x01, // v1
            0x85, 0x0a, // c
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_top_level_scalar_is_tag_zero_member() {
        let schema = basic_schema();
        let bytes = encode(&schema, &Value::U32(300), &TypeRef::Primitive(PrimitiveKind::U32))
            .unwrap();
        assert_eq!(bytes, vec![0xa0, 0x2c, 0x01]);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let schema = basic_schema();
        let err = encode_struct(&schema, schema.struct_id("Test").unwrap(), &StructValue::new())
            .unwrap_err();
        assert!(matches!(
            err,
            EncodeError::MissingRequiredField { tag: 1, .. }
        ));
    }

    #[test]
    fn test_null_on_required_field_rejected() {
        let schema = basic_schema();
        let inner = StructValue::new().with_null(5);
        let err = encode_struct(&schema, schema.struct_id("Inner").unwrap(), &inner).unwrap_err();
        assert!(matches!(err, EncodeError::NullNotAllowed { tag: 5, .. }));
    }

    #[test]
    fn test_undeclared_tag_rejected() {
        let schema = basic_schema();
        let inner = StructValue::new().with(5, Value::U8(0)).with(3, true);
        let err = encode_struct(&schema, schema.struct_id("Inner").unwrap(), &inner).unwrap_err();
        assert_eq!(
            err,
            EncodeError::UnknownField {
                type_name: "Inner".into(),
                tag: 3
            }
        );
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let schema = basic_schema();
        let inner = StructValue::new().with(5, Value::U32(10));
        let err = encode_struct(&schema, schema.struct_id("Inner").unwrap(), &inner).unwrap_err();
        assert!(matches!(err, EncodeError::TypeMismatch { found: "u32", .. }));
    }

    #[test]
    fn test_explicit_null_is_marker() {
        let schema = basic_schema();
        let inner = StructValue::new().with_null(1).with(5, Value::U8(1));
        let bytes = encode_struct(&schema, schema.struct_id("Inner").unwrap(), &inner).unwrap();
        assert_eq!(bytes, vec![0x01, 0x00, 0x85, 0x01]);
    }
}

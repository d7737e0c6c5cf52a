//! Conversion of default literals into typed values.

use iop_core::{PrimitiveKind, Value};
use serde_json::Value as Json;

use crate::resolved::{EnumType, TypeRef};

/// Convert a default literal to a value of `ty`, or explain why it does not fit.
pub(crate) fn convert_default(
    enums: &[EnumType],
    ty: &TypeRef,
    literal: &Json,
) -> Result<Value, String> {
    match ty {
        TypeRef::Primitive(kind) => convert_primitive(*kind, literal),
        TypeRef::Enum(id) => {
            let en = &enums[id.0 as usize];
            match literal {
                Json::String(label) => en
                    .value_of(label)
                    .map(Value::Enum)
                    .ok_or_else(|| format!("'{label}' is not a label of {}", en.name)),
                Json::Number(n) => {
                    let v = n
                        .as_i64()
                        .and_then(|v| i32::try_from(v).ok())
                        .ok_or_else(|| format!("{n} is not an enum value"))?;
                    if en.contains(v) {
                        Ok(Value::Enum(v))
                    } else {
                        Err(format!("{v} is not a value of {}", en.name))
                    }
                }
                other => Err(format!("expected a label, found {}", json_kind(other))),
            }
        }
        TypeRef::Array(element) => match literal {
            Json::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    convert_default(enums, element, item).map_err(|e| format!("[{i}]: {e}"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(format!("expected an array, found {}", json_kind(other))),
        },
        TypeRef::Struct(_) | TypeRef::Union(_) => {
            Err("struct and union fields cannot have defaults".to_string())
        }
    }
}

fn convert_primitive(kind: PrimitiveKind, literal: &Json) -> Result<Value, String> {
    let mismatch = || format!("expected {kind}, found {}", json_kind(literal));
    match kind {
        PrimitiveKind::Bool => literal.as_bool().map(Value::Bool).ok_or_else(mismatch),
        PrimitiveKind::F32 => literal
            .as_f64()
            .map(|v| Value::F32(v as f32))
            .ok_or_else(mismatch),
        PrimitiveKind::F64 => literal.as_f64().map(Value::F64).ok_or_else(mismatch),
        PrimitiveKind::String => literal
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(mismatch),
        PrimitiveKind::Bytes => literal
            .as_str()
            .map(|s| Value::Bytes(s.as_bytes().to_vec()))
            .ok_or_else(mismatch),
        _ => {
            let v = match literal {
                Json::Number(n) => n
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| n.as_u64().map(i128::from))
                    .ok_or_else(mismatch)?,
                _ => return Err(mismatch()),
            };
            Value::from_integer(kind, v).ok_or_else(|| format!("{v} is out of range for {kind}"))
        }
    }
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

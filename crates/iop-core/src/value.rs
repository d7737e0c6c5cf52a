//! # Value Tree
//!
//! Instances of schema types. A `Value` does not know its type; the codec
//! pairs it with a resolved type at encode and decode time.
//!
//! ## Field Presence
//!
//! ```text
//!               on the wire?   carries a value?
//! Present(v)        yes             yes
//! Null              yes             no    (explicit null marker)
//! Defaulted(v)      no              yes   (filled from the schema default)
//! Absent            no              no
//! ```
//!
//! `Absent` is never stored: setting a field to `Absent` removes it, and
//! reading a tag that is not stored yields `Absent`. Two struct values that
//! differ only by absent fields therefore compare equal.

use std::collections::BTreeMap;

use crate::primitive::PrimitiveKind;

/// A typed instance of exactly one schema type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// The integer value of an enum label.
    Enum(i32),
    Union(UnionValue),
    Struct(StructValue),
    Array(Vec<Value>),
}

impl Value {
    /// Short name of the value's shape, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::I8(_) => "i8",
            Self::U8(_) => "u8",
            Self::I16(_) => "i16",
            Self::U16(_) => "u16",
            Self::I32(_) => "i32",
            Self::U32(_) => "u32",
            Self::I64(_) => "i64",
            Self::U64(_) => "u64",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Enum(_) => "enum",
            Self::Union(_) => "union",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
        }
    }

    /// Narrow an integer into the value variant of `kind`.
    ///
    /// Returns `None` if `kind` is not an integer kind or `v` is out of its
    /// range.
    pub fn from_integer(kind: PrimitiveKind, v: i128) -> Option<Value> {
        let value = match kind {
            PrimitiveKind::I8 => Self::I8(i8::try_from(v).ok()?),
            PrimitiveKind::U8 => Self::U8(u8::try_from(v).ok()?),
            PrimitiveKind::I16 => Self::I16(i16::try_from(v).ok()?),
            PrimitiveKind::U16 => Self::U16(u16::try_from(v).ok()?),
            PrimitiveKind::I32 => Self::I32(i32::try_from(v).ok()?),
            PrimitiveKind::U32 => Self::U32(u32::try_from(v).ok()?),
            PrimitiveKind::I64 => Self::I64(i64::try_from(v).ok()?),
            PrimitiveKind::U64 => Self::U64(u64::try_from(v).ok()?),
            _ => return None,
        };
        Some(value)
    }

    /// Widen any integer value to `i128`.
    pub fn as_integer(&self) -> Option<i128> {
        let v = match self {
            Self::I8(v) => *v as i128,
            Self::U8(v) => *v as i128,
            Self::I16(v) => *v as i128,
            Self::U16(v) => *v as i128,
            Self::I32(v) => *v as i128,
            Self::U32(v) => *v as i128,
            Self::I64(v) => *v as i128,
            Self::U64(v) => *v as i128,
            _ => return None,
        };
        Some(v)
    }

    /// Any non-negative integer value as `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_integer().and_then(|v| u64::try_from(v).ok())
    }

    /// Any integer value that fits `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(|v| i64::try_from(v).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F32(v) => Some(*v as f64),
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<i32> {
        match self {
            Self::Enum(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Self::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_union(&self) -> Option<&UnionValue> {
        match self {
            Self::Union(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<StructValue> for Value {
    fn from(v: StructValue) -> Self {
        Self::Struct(v)
    }
}

impl From<UnionValue> for Value {
    fn from(v: UnionValue) -> Self {
        Self::Union(v)
    }
}

/// The single active variant of a union value.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionValue {
    /// Tag of the active variant.
    pub tag: u16,
    /// Payload of the active variant.
    pub value: Box<Value>,
}

impl UnionValue {
    pub fn new(tag: u16, value: impl Into<Value>) -> Self {
        Self {
            tag,
            value: Box::new(value.into()),
        }
    }
}

/// Presence state of one struct field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Carried on the wire with a value.
    Present(Value),
    /// Carried on the wire as an explicit null (optional fields only).
    Null,
    /// Missing from the wire; the decoder filled in the schema default.
    Defaulted(Value),
    /// Missing from the wire, no default.
    Absent,
}

impl FieldValue {
    /// The usable value: present or defaulted.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Present(v) | Self::Defaulted(v) => Some(v),
            Self::Null | Self::Absent => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Present(v) | Self::Defaulted(v) => Some(v),
            Self::Null | Self::Absent => None,
        }
    }

    /// True if encoding this field emits bytes.
    pub fn is_on_wire(&self) -> bool {
        matches!(self, Self::Present(_) | Self::Null)
    }
}

/// A struct instance: field presence keyed by field tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructValue {
    fields: BTreeMap<u16, FieldValue>,
}

static ABSENT: FieldValue = FieldValue::Absent;

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`StructValue::insert`] for present values.
    pub fn with(mut self, tag: u16, value: impl Into<Value>) -> Self {
        self.insert(tag, FieldValue::Present(value.into()));
        self
    }

    /// Builder form for an explicit null.
    pub fn with_null(mut self, tag: u16) -> Self {
        self.insert(tag, FieldValue::Null);
        self
    }

    /// Set a field's presence state. `Absent` removes the field.
    pub fn insert(&mut self, tag: u16, field: FieldValue) {
        match field {
            FieldValue::Absent => {
                self.fields.remove(&tag);
            }
            other => {
                self.fields.insert(tag, other);
            }
        }
    }

    /// Presence state of a field; `Absent` if the tag is not stored.
    pub fn get(&self, tag: u16) -> &FieldValue {
        self.fields.get(&tag).unwrap_or(&ABSENT)
    }

    /// The usable value of a field (present or defaulted).
    pub fn value(&self, tag: u16) -> Option<&Value> {
        self.get(tag).value()
    }

    /// Remove a field, returning its previous state.
    pub fn take(&mut self, tag: u16) -> FieldValue {
        self.fields.remove(&tag).unwrap_or(FieldValue::Absent)
    }

    /// Stored fields in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &FieldValue)> {
        self.fields.iter().map(|(tag, field)| (*tag, field))
    }

    /// Tags of all stored (non-absent) fields, ascending.
    pub fn tags(&self) -> impl Iterator<Item = u16> + '_ {
        self.fields.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

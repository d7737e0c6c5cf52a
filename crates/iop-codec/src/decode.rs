//! # Schema-Driven Decoding
//!
//! Reads members through a [`WireReader`] and rebuilds a [`Value`] of the
//! requested type.
//!
//! ## Compatibility Rules
//!
//! - Members whose tag the struct does not declare are skipped by wire kind.
//!   A newer writer can add optional fields without breaking older readers.
//! - A declared field missing from the wire is filled from its default as
//!   [`FieldValue::Defaulted`]; without a default it stays absent if
//!   optional and fails with [`DecodeError::MissingRequiredField`] if not.
//! - Integers are accepted in any wire width and range-checked into the
//!   declared width, so widening a field is compatible for old data.
//!
//! Decoding never trusts lengths: every block is bounds-checked, array counts
//! are capped by the remaining input, and nesting is bounded by
//! [`CodecLimits::max_depth`].

use iop_core::{FieldValue, PrimitiveKind, StructValue, UnionValue, Value};
use iop_schema::{ResolvedSchema, StructId, TypeRef, UnionId};

use crate::error::DecodeError;
use crate::limits::CodecLimits;
use crate::reader::{FrameError, WireReader};
use crate::wire::{Header, WireKind};

/// Upper bound on elements reserved up front for one array.
const MAX_PREALLOC: usize = 1024;

/// Decode a top-level payload of type `ty` with default limits.
pub fn decode(schema: &ResolvedSchema, bytes: &[u8], ty: &TypeRef) -> Result<Value, DecodeError> {
    decode_with_limits(schema, bytes, ty, &CodecLimits::default())
}

/// Decode a top-level payload of type `ty`.
pub fn decode_with_limits(
    schema: &ResolvedSchema,
    bytes: &[u8],
    ty: &TypeRef,
    limits: &CodecLimits,
) -> Result<Value, DecodeError> {
    check_payload_len(bytes, limits)?;
    let dec = Decoder { schema, limits };
    let mut r = WireReader::new(bytes);
    match ty {
        TypeRef::Struct(id) => dec.struct_body(*id, &mut r, 0).map(Value::Struct),
        TypeRef::Union(id) => dec.union_body(*id, &mut r, 0).map(Value::Union),
        _ => {
            let at = r.offset();
            let header = r.read_header().map_err(|e| dec.frame(ty, e))?;
            if header.tag != 0 {
                let reason = format!("top-level member has tag {}", header.tag);
                return Err(dec.malformed(ty, at, reason));
            }
            let value = dec.member(header, &mut r, ty, 0)?;
            if !r.is_empty() {
                return Err(dec.malformed(ty, r.offset(), "trailing bytes after value"));
            }
            Ok(value)
        }
    }
}

/// Decode a top-level struct payload.
pub fn decode_struct(
    schema: &ResolvedSchema,
    id: StructId,
    bytes: &[u8],
    limits: &CodecLimits,
) -> Result<StructValue, DecodeError> {
    check_payload_len(bytes, limits)?;
    let dec = Decoder { schema, limits };
    dec.struct_body(id, &mut WireReader::new(bytes), 0)
}

fn check_payload_len(bytes: &[u8], limits: &CodecLimits) -> Result<(), DecodeError> {
    if bytes.len() > limits.max_payload_len {
        return Err(DecodeError::PayloadTooLarge {
            len: bytes.len(),
            limit: limits.max_payload_len,
        });
    }
    Ok(())
}

struct Decoder<'s> {
    schema: &'s ResolvedSchema,
    limits: &'s CodecLimits,
}

impl Decoder<'_> {
    fn malformed(&self, ty: &TypeRef, offset: usize, reason: impl Into<String>) -> DecodeError {
        DecodeError::Malformed {
            type_name: self.schema.type_name(ty),
            offset,
            reason: reason.into(),
        }
    }

    fn frame(&self, ty: &TypeRef, err: FrameError) -> DecodeError {
        self.malformed(ty, err.offset, err.reason)
    }

    fn depth_exceeded(&self, ty: &TypeRef, offset: usize) -> DecodeError {
        DecodeError::DepthExceeded {
            type_name: self.schema.type_name(ty),
            limit: self.limits.max_depth,
            offset,
        }
    }

    /// Depth of a container of type `ty` nested in one at `depth`.
    fn enter(&self, ty: &TypeRef, depth: usize, offset: usize) -> Result<usize, DecodeError> {
        if depth >= self.limits.max_depth {
            return Err(self.depth_exceeded(ty, offset));
        }
        Ok(depth + 1)
    }

    fn struct_body(
        &self,
        id: StructId,
        r: &mut WireReader<'_>,
        depth: usize,
    ) -> Result<StructValue, DecodeError> {
        let st = self.schema.struct_type(id);
        let ty = TypeRef::Struct(id);
        let mut out = StructValue::new();
        let mut last_tag: Option<u16> = None;

        while !r.is_empty() {
            let at = r.offset();
            let header = r.read_header().map_err(|e| self.frame(&ty, e))?;
            if let Some(prev) = last_tag.filter(|prev| header.tag <= *prev) {
                return Err(self.malformed(
                    &ty,
                    at,
                    format!("tag {} follows tag {prev}", header.tag),
                ));
            }
            last_tag = Some(header.tag);

            let Some(field) = st.field_by_tag(header.tag) else {
                tracing::trace!(
                    type_name = %st.name,
                    tag = header.tag,
                    offset = at,
                    "skipping unknown member"
                );
                self.skip(header, r, depth, &ty)?;
                continue;
            };
            if r.take_null(header) {
                if !field.optional {
                    return Err(self.malformed(
                        &ty,
                        at,
                        format!("null for required field '{}'", field.name),
                    ));
                }
                out.insert(field.tag, FieldValue::Null);
            } else {
                let value = self.member(header, r, &field.ty, depth)?;
                out.insert(field.tag, FieldValue::Present(value));
            }
        }

        for field in &st.fields {
            if out.get(field.tag).is_on_wire() {
                continue;
            }
            match &field.default {
                Some(default) => out.insert(field.tag, FieldValue::Defaulted(default.clone())),
                None if !field.optional => {
                    return Err(DecodeError::MissingRequiredField {
                        type_name: st.name.clone(),
                        field: field.name.clone(),
                        tag: field.tag,
                        offset: r.offset(),
                    })
                }
                None => {}
            }
        }
        Ok(out)
    }

    fn union_body(
        &self,
        id: UnionId,
        r: &mut WireReader<'_>,
        depth: usize,
    ) -> Result<UnionValue, DecodeError> {
        let un = self.schema.union_type(id);
        let ty = TypeRef::Union(id);
        let at = r.offset();
        let header = r.read_header().map_err(|e| self.frame(&ty, e))?;
        let variant = un
            .variant_by_tag(header.tag)
            .ok_or_else(|| DecodeError::UnknownUnionTag {
                type_name: un.name.clone(),
                tag: header.tag,
                offset: at,
            })?;
        let value = self.member(header, r, &variant.ty, depth)?;
        if !r.is_empty() {
            return Err(self.malformed(&ty, r.offset(), "trailing bytes after variant"));
        }
        Ok(UnionValue::new(variant.tag, value))
    }

    fn skip(
        &self,
        header: Header,
        r: &mut WireReader<'_>,
        depth: usize,
        ty: &TypeRef,
    ) -> Result<(), DecodeError> {
        let at = r.offset();
        let depth_left = self.limits.max_depth.saturating_sub(depth);
        r.skip(header.kind, depth_left).map_err(|e| match e {
            Some(e) => self.frame(ty, e),
            None => self.depth_exceeded(ty, at),
        })
    }

    /// Payload of one member whose header has been read. `depth` is the
    /// depth of the enclosing container.
    fn member(
        &self,
        header: Header,
        r: &mut WireReader<'_>,
        ty: &TypeRef,
        depth: usize,
    ) -> Result<Value, DecodeError> {
        let at = r.offset();
        match ty {
            TypeRef::Primitive(kind) => self.primitive(header, r, *kind, ty),
            TypeRef::Enum(id) => {
                let en = self.schema.enum_type(*id);
                let raw = r.read_int(header.kind).map_err(|e| self.frame(ty, e))?;
                let value = i32::try_from(raw)
                    .ok()
                    .filter(|v| en.contains(*v))
                    .ok_or_else(|| DecodeError::UnknownEnumValue {
                        type_name: en.name.clone(),
                        value: raw,
                        offset: at,
                    })?;
                Ok(Value::Enum(value))
            }
            TypeRef::Struct(id) => {
                let depth = self.enter(ty, depth, at)?;
                let mut body = r.read_block(header.kind).map_err(|e| self.frame(ty, e))?;
                self.struct_body(*id, &mut body, depth).map(Value::Struct)
            }
            TypeRef::Union(id) => {
                let depth = self.enter(ty, depth, at)?;
                let mut body = r.read_block(header.kind).map_err(|e| self.frame(ty, e))?;
                self.union_body(*id, &mut body, depth).map(Value::Union)
            }
            TypeRef::Array(element) => {
                let depth = self.enter(ty, depth, at)?;
                let count = r.read_repeat(header.kind).map_err(|e| self.frame(ty, e))?;
                // Each element takes at least two bytes; the count is untrusted.
                let mut items = Vec::with_capacity(count.min(r.remaining() / 2).min(MAX_PREALLOC));
                for _ in 0..count {
                    let item_at = r.offset();
                    let item = r.read_header().map_err(|e| self.frame(ty, e))?;
                    if item.tag != 0 {
                        return Err(self.malformed(
                            ty,
                            item_at,
                            format!("array element has tag {}", item.tag),
                        ));
                    }
                    items.push(self.member(item, r, element, depth)?);
                }
                Ok(Value::Array(items))
            }
        }
    }

    fn primitive(
        &self,
        header: Header,
        r: &mut WireReader<'_>,
        kind: PrimitiveKind,
        ty: &TypeRef,
    ) -> Result<Value, DecodeError> {
        let at = r.offset();
        let frame = |e: FrameError| self.frame(ty, e);
        let value = match kind {
            PrimitiveKind::Bool => match r.read_int(header.kind).map_err(frame)? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(self.malformed(ty, at, format!("{other} is not a bool"))),
            },
            PrimitiveKind::U64 if header.kind == WireKind::Quad => {
                Value::U64(r.read_quad(header.kind).map_err(frame)?)
            }
            PrimitiveKind::I8
            | PrimitiveKind::U8
            | PrimitiveKind::I16
            | PrimitiveKind::U16
            | PrimitiveKind::I32
            | PrimitiveKind::U32
            | PrimitiveKind::I64
            | PrimitiveKind::U64 => {
                let raw = r.read_int(header.kind).map_err(frame)?;
                Value::from_integer(kind, i128::from(raw)).ok_or_else(|| {
                    self.malformed(ty, at, format!("{raw} out of range for {}", kind.name()))
                })?
            }
            PrimitiveKind::F32 => Value::F32(r.read_f32(header.kind).map_err(frame)?),
            PrimitiveKind::F64 => Value::F64(r.read_f64(header.kind).map_err(frame)?),
            PrimitiveKind::String => {
                let bytes = r.read_bytes(header.kind).map_err(frame)?;
                let s = std::str::from_utf8(bytes)
                    .map_err(|e| self.malformed(ty, at, format!("invalid UTF-8: {e}")))?;
                Value::String(s.to_owned())
            }
            PrimitiveKind::Bytes => {
                Value::Bytes(r.read_bytes(header.kind).map_err(frame)?.to_vec())
            }
        };
        Ok(value)
    }
}

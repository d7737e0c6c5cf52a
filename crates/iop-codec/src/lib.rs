//! # iop-codec — Schema-Driven Binary Codec
//!
//! Encodes [`iop_core::Value`] trees to the tagged binary wire format and
//! back, consulting a [`iop_schema::ResolvedSchema`] for field tags, types,
//! and defaults.
//!
//! ## Layers
//!
//! ```text
//! encode / decode        schema-aware: presence rules, defaults, validation
//!   writer / reader      framing: headers, lengths, integer widths
//!     wire               header byte layout
//! ```
//!
//! The framing is self-describing: every member carries its wire kind, so a
//! reader can skip members it does not know. This is what makes adding
//! optional fields a compatible change in both directions.
//!
//! ## Crate Policy
//!
//! - Encode and decode are pure functions of (schema, value/bytes). No
//!   global state, no I/O.
//! - Decoding untrusted input never panics and never allocates more than
//!   the input can justify; see [`CodecLimits`].

pub mod decode;
pub mod encode;
pub mod error;
pub mod limits;
pub mod reader;
pub mod wire;
pub mod writer;

pub use decode::{decode, decode_struct, decode_with_limits};
pub use encode::{encode, encode_struct};
pub use error::{DecodeError, EncodeError};
pub use limits::CodecLimits;
pub use wire::{Header, WireKind};


#[cfg(test)]
mod proptests {
    use iop_core::{FieldValue, StructValue, UnionValue, Value};
    use proptest::prelude::*;

    use super::test_support::{basic_schema, course_schema, schema_from_yaml};
    use super::*;

    fn course_progress() -> impl Strategy<Value = Value> {
        let course_type = prop_oneof![
            (0i32..3).prop_map(|v| UnionValue::new(1, Value::Enum(v))),
            any::<u32>().prop_map(|v| UnionValue::new(2, v)),
        ];
        (course_type, any::<u32>()).prop_map(|(ty, steps)| {
            Value::Struct(StructValue::new().with(1, ty).with(2, steps))
        })
    }

    fn user() -> impl Strategy<Value = StructValue> {
        (
            any::<u64>(),
            "[a-zA-Z ]{0,300}",
            any::<bool>(),
            proptest::option::of(proptest::option::of("[a-z@.]{1,20}")),
            proptest::collection::vec(course_progress(), 0..4),
        )
            .prop_map(|(id, name, admin, email, courses)| {
                let mut user = StructValue::new()
                    .with(1, id)
                    .with(2, name)
                    .with(3, admin)
                    .with(5, Value::Array(courses));
                match email {
                    Some(Some(email)) => user.insert(4, FieldValue::Present(email.into())),
                    Some(None) => user.insert(4, FieldValue::Null),
                    None => {}
                }
                user
            })
    }

    const INNER_V2: &str = r#"
package: basic
declarations:
  - kind: struct
    name: Inner
    fields:
      - {name: v1, type: bool, optional: true, tag: 1}
      - {name: v2, type: bool, optional: true, tag: 4}
      - {name: c, type: u8, tag: 5}
      - {name: note, type: string, optional: true, tag: 6}
      - {name: extra, type: {array: i64}, optional: true, tag: 7}
"#;

    proptest! {
        #[test]
        fn user_round_trips(user in user()) {
            let schema = course_schema();
            let id = schema.struct_id("User").unwrap();
            let bytes = encode_struct(&schema, id, &user).unwrap();
            let decoded = decode_struct(&schema, id, &bytes, &CodecLimits::default()).unwrap();
            prop_assert_eq!(decoded, user);
        }

        #[test]
        fn encoding_is_deterministic(user in user()) {
            let schema = course_schema();
            let id = schema.struct_id("User").unwrap();
            prop_assert_eq!(
                encode_struct(&schema, id, &user).unwrap(),
                encode_struct(&schema, id, &user).unwrap()
            );
        }

        #[test]
        fn older_reader_skips_newer_fields(
            c in any::<u8>(),
            note in proptest::option::of("[a-z]{0,40}"),
            extra in proptest::collection::vec(any::<i64>(), 0..8),
        ) {
            let v1 = basic_schema();
            let v2 = schema_from_yaml(INNER_V2);
            let mut value = StructValue::new().with(5, Value::U8(c));
            if let Some(note) = note {
                value.insert(6, FieldValue::Present(note.into()));
            }
            value.insert(
                7,
                FieldValue::Present(Value::Array(extra.into_iter().map(Value::I64).collect())),
            );
            let bytes = encode_struct(&v2, v2.struct_id("Inner").unwrap(), &value).unwrap();

            let id = v1.struct_id("Inner").unwrap();
            let old = decode_struct(&v1, id, &bytes, &CodecLimits::default()).unwrap();
            prop_assert_eq!(old, StructValue::new().with(5, Value::U8(c)));
        }

        #[test]
        fn newer_reader_accepts_older_bytes(c in any::<u8>(), v1_flag in any::<bool>()) {
            let v1 = basic_schema();
            let v2 = schema_from_yaml(INNER_V2);
            let value = StructValue::new().with(1, v1_flag).with(5, Value::U8(c));
            let bytes = encode_struct(&v1, v1.struct_id("Inner").unwrap(), &value).unwrap();

            let id = v2.struct_id("Inner").unwrap();
            let new = decode_struct(&v2, id, &bytes, &CodecLimits::default()).unwrap();
            prop_assert_eq!(new.get(6), &FieldValue::Absent);
            prop_assert_eq!(new, value);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
            let schema = course_schema();
            let ty = schema.lookup_type("User").unwrap();
            let _ = decode(&schema, &bytes, &ty);
            let ty = schema.lookup_type("CourseType").unwrap();
            let _ = decode(&schema, &bytes, &ty);
        }
    }
}

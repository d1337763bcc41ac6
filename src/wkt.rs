//! Well-known wrapper types.
//!
//! The `google.protobuf` scalar wrappers get a fixed schema and decode
//! treatment instead of generic record expansion: the schema is the
//! wrapped primitive made nullable, and an encoded value is the
//! union-tagged primitive (`{"<type>": value}`) or `null`. Neither
//! direction requires the wrapper types to be registered in a pool.

use std::collections::BTreeMap;

use crate::avro::{nullable, Schema};
use crate::error::{Error, Result};
use crate::message::{DynamicMessage, FieldValue};
use crate::value::Value;

/// Field number of the single `value` field every wrapper declares.
const VALUE_FIELD: i32 = 1;

struct Wrapper {
    /// The wrapped primitive as it appears in the schema. uint32 widens to
    /// long, matching the integer table used for plain fields.
    primitive: Schema,
    /// The union tag key an encoded value carries.
    tag: &'static str,
}

fn wrapper(full_name: &str) -> Option<Wrapper> {
    let (primitive, tag) = match full_name {
        "google.protobuf.DoubleValue" => (Schema::Double, "double"),
        "google.protobuf.FloatValue" => (Schema::Float, "float"),
        "google.protobuf.Int64Value" => (Schema::Long, "long"),
        "google.protobuf.UInt64Value" => (Schema::Long, "long"),
        "google.protobuf.Int32Value" => (Schema::Int, "int"),
        "google.protobuf.UInt32Value" => (Schema::Long, "long"),
        "google.protobuf.BoolValue" => (Schema::Boolean, "boolean"),
        "google.protobuf.StringValue" => (Schema::String, "string"),
        "google.protobuf.BytesValue" => (Schema::Bytes, "bytes"),
        _ => return None,
    };
    Some(Wrapper { primitive, tag })
}

/// Whether a full name denotes a well-known wrapper type.
pub(crate) fn is_well_known(full_name: &str) -> bool {
    wrapper(full_name).is_some()
}

/// The schema for a wrapper type, if `full_name` is one.
pub(crate) fn schema(full_name: &str) -> Option<Schema> {
    wrapper(full_name).map(|w| nullable(w.primitive))
}

/// Decode an encoded wrapper value into the wrapper's `value` field.
pub(crate) fn decode(entries: &BTreeMap<String, Value>, message: &mut DynamicMessage) -> Result<()> {
    let full_name = message.full_name().to_string();
    let wrapper =
        wrapper(&full_name).ok_or_else(|| Error::UnknownType(full_name.clone()))?;
    let (tag, value) = match entries.iter().next() {
        Some(entry) if entries.len() == 1 => entry,
        _ => {
            return Err(Error::mismatch(
                format!("{full_name} encoded as {{\"{}\": ...}}", wrapper.tag),
                format!("object with {} keys", entries.len()),
            ))
        }
    };
    if tag != wrapper.tag {
        return Err(Error::mismatch(
            format!("union tag {:?}", wrapper.tag),
            format!("union tag {tag:?}"),
        ));
    }
    if value.is_null() {
        return Ok(());
    }
    let field_value = match &full_name[..] {
        "google.protobuf.DoubleValue" => match value {
            Value::Double(d) => FieldValue::Double(*d),
            other => return Err(Error::mismatch("double", other.kind_name())),
        },
        "google.protobuf.FloatValue" => match value {
            Value::Float(f) => FieldValue::Float(*f),
            other => return Err(Error::mismatch("float", other.kind_name())),
        },
        "google.protobuf.Int64Value" => FieldValue::Int64(value.int_like("long")?),
        "google.protobuf.UInt64Value" => FieldValue::Uint64(value.int_like("long")? as u64),
        "google.protobuf.Int32Value" => FieldValue::Int32(value.int_like("int")? as i32),
        "google.protobuf.UInt32Value" => FieldValue::Uint32(value.int_like("long")? as u32),
        "google.protobuf.BoolValue" => FieldValue::Bool(value.bool_like("boolean")?),
        "google.protobuf.StringValue" => FieldValue::String(value.string_like("string")?),
        "google.protobuf.BytesValue" => FieldValue::Bytes(value.bytes_like("bytes")?),
        _ => return Err(Error::UnknownType(full_name)),
    };
    message.set(VALUE_FIELD, field_value);
    Ok(())
}

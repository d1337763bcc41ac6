//! Decoding generic value trees into dynamic messages.
//!
//! The decoder walks the target message type's descriptors and interprets
//! the value tree against them; no Avro schema is consulted. The shapes it
//! unwraps (nullable fields, nullable array items, maps of nullable
//! values, named-union wrappers) are exactly the shapes inference assigns.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::descriptor::{DescriptorPool, FieldDescriptor, FieldKind, MessageDescriptor};
use crate::error::{Error, Result};
use crate::message::{DynamicMessage, FieldValue, MapKey};
use crate::value::Value;
use crate::wkt;

/// Decode `data` into `message`, mutating it in place.
///
/// `null` leaves the message untouched. On error the message may be
/// partially populated; no partial-commit semantics are promised.
pub fn decode(pool: &DescriptorPool, data: &Value, message: &mut DynamicMessage) -> Result<()> {
    debug!(message = %message.full_name(), "decoding value tree");
    decode_message(pool, data, message)
}

fn decode_message(pool: &DescriptorPool, data: &Value, message: &mut DynamicMessage) -> Result<()> {
    let entries = match data {
        Value::Null => return Ok(()),
        Value::Object(entries) => entries,
        other => {
            return Err(Error::mismatch(
                "message encoded as an object",
                other.kind_name(),
            ))
        }
    };
    if wkt::is_well_known(message.full_name()) {
        return wkt::decode(entries, message);
    }
    // A single entry keyed by the message's own full name is the union
    // wrapper a nullable record is encoded with; unwrap and retry.
    if entries.len() == 1 {
        if let Some(inner) = entries.get(message.full_name()) {
            return decode_message(pool, inner, message);
        }
    }
    let descriptor = pool
        .message(message.full_name())
        .ok_or_else(|| Error::UnknownType(message.full_name().to_string()))?;
    for (key, value) in entries {
        let field = find_field(descriptor, key).ok_or_else(|| Error::UnknownField(key.clone()))?;
        decode_field(pool, value, message, field)?;
    }
    Ok(())
}

/// Resolve an object key to a field, trying the JSON name first and the
/// declared name second, so both naming conventions decode.
fn find_field<'a>(descriptor: &'a MessageDescriptor, name: &str) -> Option<&'a FieldDescriptor> {
    descriptor
        .field_by_json_name(name)
        .or_else(|| descriptor.field_by_name(name))
}

fn decode_field(
    pool: &DescriptorPool,
    data: &Value,
    message: &mut DynamicMessage,
    field: &FieldDescriptor,
) -> Result<()> {
    if data.is_null() {
        return Ok(());
    }
    trace!(field = %field.name, "decoding field");
    if field.is_map {
        let entries = data.object_like("map")?;
        let map = decode_map(pool, entries, field)?;
        message.set(field.number, FieldValue::Map(map));
        return Ok(());
    }
    if field.is_repeated {
        let elements = data.array_like("array")?;
        let mut list = Vec::with_capacity(elements.len());
        for element in elements {
            if element.is_null() {
                // A null array item becomes a fresh zero element.
                list.push(FieldValue::zero(&field.kind));
                continue;
            }
            list.push(decode_field_kind(pool, element, field)?);
        }
        message.set(field.number, FieldValue::List(list));
        return Ok(());
    }
    let value = decode_field_kind(pool, data, field)?;
    message.set(field.number, value);
    Ok(())
}

fn decode_map(
    pool: &DescriptorPool,
    entries: &BTreeMap<String, Value>,
    field: &FieldDescriptor,
) -> Result<BTreeMap<MapKey, FieldValue>> {
    let entry_name = match &field.kind {
        FieldKind::Message(name) | FieldKind::Group(name) => name,
        other => {
            return Err(Error::UnsupportedKind {
                field: field.name.clone(),
                kind: other.name().to_string(),
            })
        }
    };
    let entry = pool
        .message(entry_name)
        .ok_or_else(|| Error::UnknownType(entry_name.clone()))?;
    let (key_field, value_field) = entry
        .map_entry_fields()
        .ok_or_else(|| Error::Parse(format!("map entry {entry_name} missing key/value fields")))?;
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        let map_key = MapKey::parse(key, &key_field.kind).ok_or_else(|| {
            Error::mismatch(key_field.kind.name(), format!("map key {key:?}"))
                .for_field(&field.name)
        })?;
        let map_value = if value.is_null() {
            FieldValue::zero(&value_field.kind)
        } else {
            decode_field_kind(pool, value, value_field)?
        };
        map.insert(map_key, map_value);
    }
    Ok(map)
}

fn decode_field_kind(
    pool: &DescriptorPool,
    data: &Value,
    field: &FieldDescriptor,
) -> Result<FieldValue> {
    match &field.kind {
        FieldKind::Message(name) | FieldKind::Group(name) => {
            let mut sub_message = DynamicMessage::new(name.clone());
            decode_message(pool, data, &mut sub_message)?;
            Ok(FieldValue::Message(sub_message))
        }
        FieldKind::String => data
            .string_like("string")
            .map(FieldValue::String)
            .map_err(|e| e.for_field(&field.name)),
        FieldKind::Bool => data
            .bool_like("boolean")
            .map(FieldValue::Bool)
            .map_err(|e| e.for_field(&field.name)),
        FieldKind::Int32 | FieldKind::Sfixed32 | FieldKind::Sint32 => data
            .int_like("int")
            .map(|i| FieldValue::Int32(i as i32))
            .map_err(|e| e.for_field(&field.name)),
        FieldKind::Int64 | FieldKind::Sfixed64 | FieldKind::Sint64 => data
            .int_like("long")
            .map(FieldValue::Int64)
            .map_err(|e| e.for_field(&field.name)),
        FieldKind::Uint32 | FieldKind::Fixed32 => data
            .int_like("long")
            .map(|i| FieldValue::Uint32(i as u32))
            .map_err(|e| e.for_field(&field.name)),
        FieldKind::Uint64 | FieldKind::Fixed64 => data
            .int_like("long")
            .map(|i| FieldValue::Uint64(i as u64))
            .map_err(|e| e.for_field(&field.name)),
        FieldKind::Bytes => data
            .bytes_like("bytes")
            .map(FieldValue::Bytes)
            .map_err(|e| e.for_field(&field.name)),
        FieldKind::Enum(name) => {
            let symbol = data
                .string_like(name)
                .map_err(|e| e.for_field(&field.name))?;
            let enum_descriptor = pool
                .enum_by_name(name)
                .ok_or_else(|| Error::UnknownType(name.clone()))?;
            // Unknown symbols map to the zero value rather than failing.
            Ok(FieldValue::Enum(
                enum_descriptor.value_by_name(&symbol).unwrap_or(0),
            ))
        }
        // Floating-point kinds require a value of the matching width;
        // integer-valued or string-encoded numbers are rejected, unlike
        // the lenient integer kinds above.
        FieldKind::Double => match data {
            Value::Double(d) => Ok(FieldValue::Double(*d)),
            other => Err(Error::mismatch("double", other.kind_name()).for_field(&field.name)),
        },
        FieldKind::Float => match data {
            Value::Float(f) => Ok(FieldValue::Float(*f)),
            other => Err(Error::mismatch("float", other.kind_name()).for_field(&field.name)),
        },
    }
}

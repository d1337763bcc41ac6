//! Dynamic message instances populated by the decoder.

use std::collections::BTreeMap;

use crate::descriptor::{FieldKind, MessageDescriptor};

/// A message instance addressed by field number.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicMessage {
    full_name: String,
    fields: BTreeMap<i32, FieldValue>,
}

impl DynamicMessage {
    /// Create an empty instance of the named message type.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Create an empty instance for a descriptor.
    pub fn for_descriptor(descriptor: &MessageDescriptor) -> Self {
        Self::new(descriptor.full_name.clone())
    }

    /// Full name of the message type this instance belongs to.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Set a field by number, replacing any previous value.
    pub fn set(&mut self, number: i32, value: FieldValue) {
        self.fields.insert(number, value);
    }

    /// Get a field value by number; unset fields return `None`.
    pub fn get(&self, number: i32) -> Option<&FieldValue> {
        self.fields.get(&number)
    }

    pub fn is_set(&self, number: i32) -> bool {
        self.fields.contains_key(&number)
    }

    /// Number of populated fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate populated (number, value) pairs in field-number order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &FieldValue)> {
        self.fields.iter().map(|(number, value)| (*number, value))
    }
}

/// A populated field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Double(f64),
    Float(f32),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Enum value by number.
    Enum(i32),
    Message(DynamicMessage),
    List(Vec<FieldValue>),
    Map(BTreeMap<MapKey, FieldValue>),
}

impl FieldValue {
    /// A freshly constructed zero value for a field kind: numeric zero,
    /// `false`, empty string/bytes, the zero enum value, or an empty
    /// message instance.
    pub fn zero(kind: &FieldKind) -> FieldValue {
        match kind {
            FieldKind::Double => FieldValue::Double(0.0),
            FieldKind::Float => FieldValue::Float(0.0),
            FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => FieldValue::Int32(0),
            FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => FieldValue::Int64(0),
            FieldKind::Uint32 | FieldKind::Fixed32 => FieldValue::Uint32(0),
            FieldKind::Uint64 | FieldKind::Fixed64 => FieldValue::Uint64(0),
            FieldKind::Bool => FieldValue::Bool(false),
            FieldKind::String => FieldValue::String(String::new()),
            FieldKind::Bytes => FieldValue::Bytes(Vec::new()),
            FieldKind::Enum(_) => FieldValue::Enum(0),
            FieldKind::Message(name) | FieldKind::Group(name) => {
                FieldValue::Message(DynamicMessage::new(name.clone()))
            }
        }
    }
}

/// A typed map key. The generic value tree carries map keys as strings;
/// they are parsed back into the entry key field's kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapKey {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    String(String),
}

impl MapKey {
    /// Parse a string key according to the map-entry key field kind.
    /// Returns `None` for unparsable keys or non-key kinds.
    pub(crate) fn parse(key: &str, kind: &FieldKind) -> Option<MapKey> {
        Some(match kind {
            FieldKind::Bool => MapKey::Bool(key.parse().ok()?),
            FieldKind::Int32 | FieldKind::Sint32 | FieldKind::Sfixed32 => {
                MapKey::Int32(key.parse().ok()?)
            }
            FieldKind::Int64 | FieldKind::Sint64 | FieldKind::Sfixed64 => {
                MapKey::Int64(key.parse().ok()?)
            }
            FieldKind::Uint32 | FieldKind::Fixed32 => MapKey::Uint32(key.parse().ok()?),
            FieldKind::Uint64 | FieldKind::Fixed64 => MapKey::Uint64(key.parse().ok()?),
            FieldKind::String => MapKey::String(key.to_string()),
            _ => return None,
        })
    }
}

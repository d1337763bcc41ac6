//! The Avro schema data model produced by inference.
//!
//! Only the subset of Avro needed as an inference target is modeled:
//! primitives, records, enums, arrays, string-keyed maps, unions, and
//! by-name references (used to terminate cyclic expansions). Serializing
//! a [`Schema`] yields the canonical Avro JSON schema document.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// An Avro schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(Record),
    Enum(Enum),
    Array { items: Box<Schema> },
    Map { values: Box<Schema> },
    Union(Vec<Schema>),
    /// A by-name reference to an already-defined record or enum.
    Ref(String),
}

/// A named record with ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub namespace: String,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
}

/// A single record field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub doc: Option<String>,
    pub schema: Schema,
}

/// A named enum with a fixed symbol list.
#[derive(Debug, Clone, PartialEq)]
pub struct Enum {
    pub name: String,
    pub namespace: String,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
}

/// Wrap `schema` in a union with `null`, marking the value as optional.
///
/// A union already led by `null` passes through unchanged, so wrapping is
/// idempotent; a union without a `null` branch gets one prepended.
pub fn nullable(schema: Schema) -> Schema {
    match schema {
        Schema::Union(branches) if branches.first() == Some(&Schema::Null) => {
            Schema::Union(branches)
        }
        Schema::Union(mut branches) => {
            branches.insert(0, Schema::Null);
            Schema::Union(branches)
        }
        other => Schema::Union(vec![Schema::Null, other]),
    }
}

impl Schema {
    fn primitive_name(&self) -> Option<&'static str> {
        match self {
            Schema::Null => Some("null"),
            Schema::Boolean => Some("boolean"),
            Schema::Int => Some("int"),
            Schema::Long => Some("long"),
            Schema::Float => Some("float"),
            Schema::Double => Some("double"),
            Schema::Bytes => Some("bytes"),
            Schema::String => Some("string"),
            _ => None,
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(name) = self.primitive_name() {
            return serializer.serialize_str(name);
        }
        match self {
            Schema::Ref(name) => serializer.serialize_str(name),
            Schema::Union(branches) => {
                let mut seq = serializer.serialize_seq(Some(branches.len()))?;
                for branch in branches {
                    seq.serialize_element(branch)?;
                }
                seq.end()
            }
            Schema::Array { items } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", items)?;
                map.end()
            }
            Schema::Map { values } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", values)?;
                map.end()
            }
            Schema::Record(record) => record.serialize(serializer),
            Schema::Enum(enumeration) => enumeration.serialize(serializer),
            _ => unreachable!("primitive handled above"),
        }
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "record")?;
        map.serialize_entry("name", &self.name)?;
        if !self.namespace.is_empty() {
            map.serialize_entry("namespace", &self.namespace)?;
        }
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        map.serialize_entry("fields", &self.fields)?;
        map.end()
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        map.serialize_entry("type", &self.schema)?;
        map.end()
    }
}

impl Serialize for Enum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "enum")?;
        map.serialize_entry("name", &self.name)?;
        if !self.namespace.is_empty() {
            map.serialize_entry("namespace", &self.namespace)?;
        }
        if let Some(doc) = &self.doc {
            map.serialize_entry("doc", doc)?;
        }
        map.serialize_entry("symbols", &self.symbols)?;
        map.end()
    }
}

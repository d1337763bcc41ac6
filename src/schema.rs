//! Avro schema inference over message descriptors.
//!
//! Leaf-first recursive descent over a message type's fields, producing
//! the Avro schema its encoded values follow. Every type is expanded in
//! full exactly once per inference call; later occurrences become by-name
//! references, which is what terminates cyclic type graphs.

use std::collections::HashSet;

use tracing::debug;

use crate::avro::{nullable, Enum, Field, Record, Schema};
use crate::descriptor::{
    DescriptorPool, EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, OneofDescriptor,
};
use crate::error::{Error, Result};
use crate::wkt;

/// Options controlling schema inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaOptions {
    /// When set, the schema for the outermost message is not wrapped
    /// nullable; nested message occurrences still are.
    pub omit_root_element: bool,
}

/// Infer the Avro schema for `message` with default options.
pub fn infer_schema(pool: &DescriptorPool, message: &MessageDescriptor) -> Result<Schema> {
    SchemaOptions::default().infer_schema(pool, message)
}

impl SchemaOptions {
    /// Infer the Avro schema for `message`.
    pub fn infer_schema(&self, pool: &DescriptorPool, message: &MessageDescriptor) -> Result<Schema> {
        debug!(message = %message.full_name, "inferring schema");
        let mut inferrer = SchemaInferrer {
            pool,
            opts: *self,
            seen: HashSet::new(),
        };
        inferrer.infer_message_schema(message, 0)
    }
}

/// One inference call's state. The seen-set lives for a single top-level
/// call; concurrent inferences never share it.
struct SchemaInferrer<'a> {
    pool: &'a DescriptorPool,
    opts: SchemaOptions,
    seen: HashSet<String>,
}

impl<'a> SchemaInferrer<'a> {
    fn infer_message_schema(
        &mut self,
        message: &MessageDescriptor,
        recursive_index: usize,
    ) -> Result<Schema> {
        if let Some(schema) = wkt::schema(&message.full_name) {
            return Ok(schema);
        }
        if self.seen.contains(&message.full_name) {
            return Ok(nullable(Schema::Ref(message.full_name.clone())));
        }
        self.seen.insert(message.full_name.clone());
        let mut record = Record {
            name: message.name.clone(),
            namespace: message.namespace().to_string(),
            doc: message.doc.clone(),
            fields: Vec::with_capacity(message.fields.len()),
        };
        for field in &message.fields {
            let mut field_schema = self.infer_field(message, field, recursive_index + 1)?;
            // Proto3 fields are always optional, so every field is made
            // nullable. Maps are the exception: an absent map is an empty
            // map, not null, and value nullability is decided inside the
            // map schema.
            if !field.is_map {
                field_schema.schema = nullable(field_schema.schema);
            }
            record.fields.push(field_schema);
        }
        if message.is_map_entry {
            return Ok(Schema::Record(record));
        }
        if self.opts.omit_root_element && recursive_index == 0 {
            return Ok(Schema::Record(record));
        }
        Ok(nullable(Schema::Record(record)))
    }

    fn infer_field(
        &mut self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
        recursive_index: usize,
    ) -> Result<Field> {
        if field.is_map {
            let map_schema = self.infer_map_schema(field, recursive_index)?;
            return Ok(Field {
                name: field.name.clone(),
                doc: field.doc.clone(),
                schema: map_schema,
            });
        }
        let kind_schema = self.infer_field_kind(field, recursive_index)?;
        if field.is_list() {
            return Ok(Field {
                name: field.name.clone(),
                doc: field.doc.clone(),
                schema: Schema::Array {
                    items: Box::new(nullable(kind_schema)),
                },
            });
        }
        if let Some(oneof) = field.oneof_index.and_then(|index| message.oneofs.get(index)) {
            return Ok(Field {
                name: field.name.clone(),
                doc: Some(oneof_doc(field.doc.as_deref(), oneof)),
                schema: nullable(kind_schema),
            });
        }
        Ok(Field {
            name: field.name.clone(),
            doc: field.doc.clone(),
            schema: kind_schema,
        })
    }

    fn infer_map_schema(&mut self, field: &FieldDescriptor, recursive_index: usize) -> Result<Schema> {
        let entry_name = match &field.kind {
            FieldKind::Message(name) | FieldKind::Group(name) => name.clone(),
            other => {
                return Err(Error::UnsupportedKind {
                    field: field.name.clone(),
                    kind: other.name().to_string(),
                })
            }
        };
        let entry = self
            .pool
            .message(&entry_name)
            .ok_or_else(|| Error::UnknownType(entry_name.clone()))?;
        let (_, value_field) = entry.map_entry_fields().ok_or_else(|| {
            Error::Parse(format!("map entry {entry_name} missing key/value fields"))
        })?;
        let value_schema = self.infer_field_kind(value_field, recursive_index)?;
        Ok(Schema::Map {
            values: Box::new(nullable(value_schema)),
        })
    }

    fn infer_field_kind(&mut self, field: &FieldDescriptor, recursive_index: usize) -> Result<Schema> {
        match &field.kind {
            FieldKind::Double => Ok(Schema::Double),
            FieldKind::Float => Ok(Schema::Float),
            FieldKind::Int32 | FieldKind::Fixed32 | FieldKind::Sfixed32 | FieldKind::Sint32 => {
                Ok(Schema::Int)
            }
            // uint32 widens to long: the unsigned range does not fit the
            // 32-bit signed schema type.
            FieldKind::Int64
            | FieldKind::Uint64
            | FieldKind::Fixed64
            | FieldKind::Sfixed64
            | FieldKind::Sint64
            | FieldKind::Uint32 => Ok(Schema::Long),
            FieldKind::Bool => Ok(Schema::Boolean),
            FieldKind::Bytes => Ok(Schema::Bytes),
            FieldKind::String => Ok(Schema::String),
            FieldKind::Enum(name) => {
                let enum_descriptor = self
                    .pool
                    .enum_by_name(name)
                    .ok_or_else(|| Error::UnknownType(name.clone()))?;
                Ok(self.infer_enum_schema(enum_descriptor))
            }
            FieldKind::Message(name) | FieldKind::Group(name) => {
                if let Some(schema) = wkt::schema(name) {
                    return Ok(schema);
                }
                let message = self
                    .pool
                    .message(name)
                    .ok_or_else(|| Error::UnknownType(name.clone()))?;
                self.infer_message_schema(message, recursive_index)
            }
        }
    }

    fn infer_enum_schema(&mut self, enum_descriptor: &EnumDescriptor) -> Schema {
        if self.seen.contains(&enum_descriptor.full_name) {
            return Schema::Ref(enum_descriptor.full_name.clone());
        }
        self.seen.insert(enum_descriptor.full_name.clone());
        Schema::Enum(Enum {
            name: enum_descriptor.name.clone(),
            namespace: enum_descriptor.namespace().to_string(),
            doc: enum_descriptor.doc.clone(),
            symbols: enum_descriptor
                .values
                .iter()
                .map(|(name, _)| name.clone())
                .collect(),
        })
    }
}

/// Append the oneof membership note to a field's doc: the encoded shape is
/// "every member nullable, at most one set", which a reader cannot see
/// from the field schema alone.
fn oneof_doc(doc: Option<&str>, oneof: &OneofDescriptor) -> String {
    let members = oneof
        .fields
        .iter()
        .map(|name| format!("* {name}"))
        .collect::<Vec<_>>()
        .join("\n");
    let note = format!("At most one will be set:\n{members}");
    match doc {
        Some(doc) if !doc.is_empty() => format!("{doc}\n\n{note}"),
        _ => note,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_of(schema: &Schema) -> &Record {
        match schema {
            Schema::Record(record) => record,
            Schema::Union(branches) => match &branches[..] {
                [Schema::Null, Schema::Record(record)] => record,
                other => panic!("expected [null, record], got {other:?}"),
            },
            other => panic!("expected record, got {other:?}"),
        }
    }

    fn field<'a>(record: &'a Record, name: &str) -> &'a Field {
        record
            .fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("field {name} not found"))
    }

    #[test]
    fn test_scalar_kind_mapping() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Scalars {
                double d = 1;
                float f = 2;
                int32 i32 = 3;
                sint32 s32 = 4;
                sfixed32 sf32 = 5;
                fixed32 f32 = 6;
                int64 i64 = 7;
                uint64 u64 = 8;
                fixed64 fx64 = 9;
                sfixed64 sf64 = 10;
                sint64 s64 = 11;
                uint32 u32 = 12;
                bool b = 13;
                bytes by = 14;
                string s = 15;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let scalars = pool.message("test.Scalars").unwrap();
        let schema = infer_schema(&pool, scalars).unwrap();
        let record = record_of(&schema);

        let expect = |name: &str, primitive: Schema| {
            assert_eq!(
                field(record, name).schema,
                Schema::Union(vec![Schema::Null, primitive]),
                "field {name}"
            );
        };
        expect("d", Schema::Double);
        expect("f", Schema::Float);
        expect("i32", Schema::Int);
        expect("s32", Schema::Int);
        expect("sf32", Schema::Int);
        // fixed32 is a 32-bit value; only uint32 widens.
        expect("f32", Schema::Int);
        expect("i64", Schema::Long);
        expect("u64", Schema::Long);
        expect("fx64", Schema::Long);
        expect("sf64", Schema::Long);
        expect("s64", Schema::Long);
        expect("u32", Schema::Long);
        expect("b", Schema::Boolean);
        expect("by", Schema::Bytes);
        expect("s", Schema::String);
    }

    #[test]
    fn test_root_wrapping_and_omit_option() {
        let proto = r#"
            syntax = "proto3";
            message Simple { bool ok = 1; }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let simple = pool.message("Simple").unwrap();

        let wrapped = infer_schema(&pool, simple).unwrap();
        assert!(matches!(&wrapped, Schema::Union(branches)
            if branches.len() == 2 && branches[0] == Schema::Null));

        let options = SchemaOptions {
            omit_root_element: true,
        };
        let unwrapped = options.infer_schema(&pool, simple).unwrap();
        assert!(matches!(unwrapped, Schema::Record(_)));
    }

    #[test]
    fn test_inference_is_idempotent() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Outer {
                message Inner { int64 n = 1; }
                Inner first = 1;
                Inner second = 2;
                repeated string names = 3;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let outer = pool.message("test.Outer").unwrap();
        let first = infer_schema(&pool, outer).unwrap();
        let second = infer_schema(&pool, outer).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_repeated_type_becomes_reference() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Pair {
                message Point { int32 x = 1; }
                Point a = 1;
                Point b = 2;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let pair = pool.message("test.Pair").unwrap();
        let schema = infer_schema(&pool, pair).unwrap();
        let record = record_of(&schema);

        // First occurrence expands in full, second is a by-name reference.
        assert!(matches!(
            &field(record, "a").schema,
            Schema::Union(branches) if matches!(branches[1], Schema::Record(_))
        ));
        assert_eq!(
            field(record, "b").schema,
            Schema::Union(vec![
                Schema::Null,
                Schema::Ref("test.Pair.Point".to_string())
            ])
        );
    }

    #[test]
    fn test_direct_cycle_terminates() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Node {
                string label = 1;
                Node child = 2;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let node = pool.message("test.Node").unwrap();
        let schema = infer_schema(&pool, node).unwrap();
        let record = record_of(&schema);
        assert_eq!(
            field(record, "child").schema,
            Schema::Union(vec![Schema::Null, Schema::Ref("test.Node".to_string())])
        );
    }

    #[test]
    fn test_indirect_cycle_terminates() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message A { B b = 1; }
            message B { A a = 1; }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let a = pool.message("test.A").unwrap();
        let schema = infer_schema(&pool, a).unwrap();
        let a_record = record_of(&schema);
        let b_record = record_of(&field(a_record, "b").schema);
        assert_eq!(
            field(b_record, "a").schema,
            Schema::Union(vec![Schema::Null, Schema::Ref("test.A".to_string())])
        );
    }

    #[test]
    fn test_list_items_are_nullable() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Batch {
                repeated int32 sizes = 1;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let batch = pool.message("test.Batch").unwrap();
        let schema = infer_schema(&pool, batch).unwrap();
        let record = record_of(&schema);
        assert_eq!(
            field(record, "sizes").schema,
            Schema::Union(vec![
                Schema::Null,
                Schema::Array {
                    items: Box::new(Schema::Union(vec![Schema::Null, Schema::Int])),
                },
            ])
        );
    }

    #[test]
    fn test_map_field_shape() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Labeled {
                map<string, int64> labels = 1;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let labeled = pool.message("test.Labeled").unwrap();
        let schema = infer_schema(&pool, labeled).unwrap();
        let record = record_of(&schema);
        // The map field itself is not nullable-wrapped; its values are.
        assert_eq!(
            field(record, "labels").schema,
            Schema::Map {
                values: Box::new(Schema::Union(vec![Schema::Null, Schema::Long])),
            }
        );
    }

    #[test]
    fn test_enum_inference_and_reuse() {
        let proto = r#"
            syntax = "proto3";
            package test;
            enum Color {
                COLOR_UNSPECIFIED = 0;
                COLOR_RED = 1;
                COLOR_BLUE = 2;
            }
            message Palette {
                Color primary = 1;
                Color secondary = 2;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let palette = pool.message("test.Palette").unwrap();
        let schema = infer_schema(&pool, palette).unwrap();
        let record = record_of(&schema);

        match &field(record, "primary").schema {
            Schema::Union(branches) => match &branches[1] {
                Schema::Enum(color) => {
                    assert_eq!(color.name, "Color");
                    assert_eq!(color.namespace, "test");
                    assert_eq!(
                        color.symbols,
                        vec!["COLOR_UNSPECIFIED", "COLOR_RED", "COLOR_BLUE"]
                    );
                }
                other => panic!("expected enum, got {other:?}"),
            },
            other => panic!("expected union, got {other:?}"),
        }
        assert_eq!(
            field(record, "secondary").schema,
            Schema::Union(vec![Schema::Null, Schema::Ref("test.Color".to_string())])
        );
    }

    #[test]
    fn test_oneof_doc_lists_members() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Event {
                oneof payload {
                    string text = 1;
                    int64 code = 2;
                }
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let event = pool.message("test.Event").unwrap();
        let schema = infer_schema(&pool, event).unwrap();
        let record = record_of(&schema);

        let expected = "At most one will be set:\n* text\n* code";
        assert_eq!(field(record, "text").doc.as_deref(), Some(expected));
        assert_eq!(field(record, "code").doc.as_deref(), Some(expected));
        // Oneof members stay nullable single fields, not tagged unions.
        assert_eq!(
            field(record, "code").schema,
            Schema::Union(vec![Schema::Null, Schema::Long])
        );
    }

    #[test]
    fn test_oneof_doc_preserves_existing_comment() {
        let oneof = OneofDescriptor {
            name: "payload".to_string(),
            fields: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            oneof_doc(Some("Chosen payload."), &oneof),
            "Chosen payload.\n\nAt most one will be set:\n* a\n* b"
        );
        assert_eq!(oneof_doc(None, &oneof), "At most one will be set:\n* a\n* b");
    }

    #[test]
    fn test_wrapper_field_schema() {
        let mut value_field = protobuf::descriptor::FieldDescriptorProto::new();
        value_field.name = Some("count".to_string());
        value_field.number = Some(1);
        value_field.type_ =
            Some(protobuf::descriptor::field_descriptor_proto::Type::TYPE_MESSAGE.into());
        value_field.type_name = Some(".google.protobuf.UInt32Value".to_string());

        let mut message = protobuf::descriptor::DescriptorProto::new();
        message.name = Some("Carrier".to_string());
        message.field.push(value_field);

        let mut file = protobuf::descriptor::FileDescriptorProto::new();
        file.name = Some("carrier.proto".to_string());
        file.package = Some("test".to_string());
        file.message_type.push(message);

        let pool = DescriptorPool::from_file_descriptors(&[file]).unwrap();
        let carrier = pool.message("test.Carrier").unwrap();
        let schema = infer_schema(&pool, carrier).unwrap();
        let record = record_of(&schema);
        // The wrapper expands to its nullable primitive, not a record; the
        // field wrap is a no-op on the already-nullable union.
        assert_eq!(
            field(record, "count").schema,
            Schema::Union(vec![Schema::Null, Schema::Long])
        );
    }

    #[test]
    fn test_fresh_seen_set_per_call() {
        let proto = r#"
            syntax = "proto3";
            package test;
            message Wrap {
                message Inner { bool ok = 1; }
                Inner inner = 1;
            }
        "#;
        let pool = DescriptorPool::parse_proto_str(proto).unwrap();
        let wrap = pool.message("test.Wrap").unwrap();
        // If the seen-set leaked across calls, the second inference would
        // degrade Inner into a reference.
        for _ in 0..2 {
            let schema = infer_schema(&pool, wrap).unwrap();
            let record = record_of(&schema);
            assert!(matches!(
                &field(record, "inner").schema,
                Schema::Union(branches) if matches!(branches[1], Schema::Record(_))
            ));
        }
    }
}

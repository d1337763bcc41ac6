//! Resolved protobuf descriptors.
//!
//! These types are a read-only, fully-resolved view over the
//! `google.protobuf.FileDescriptorProto` form: full names are computed,
//! map-entry types are flagged, oneof membership is collected, and
//! leading comments are attached from `SourceCodeInfo`. Descriptors are
//! keyed by fully-qualified name (no leading dot) in a [`DescriptorPool`].

use std::collections::{HashMap, HashSet};
use std::io::Write as _;
use std::path::Path;

use protobuf::descriptor::field_descriptor_proto::{Label, Type};
use protobuf::descriptor::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
};

use crate::error::{Error, Result};

/// Field numbers from google/protobuf/descriptor.proto, used to construct
/// SourceCodeInfo paths into the descriptor tree.
mod path {
    /// FileDescriptorProto.message_type
    pub const MESSAGE_TYPE: i32 = 4;
    /// FileDescriptorProto.enum_type
    pub const ENUM_TYPE: i32 = 5;
    /// DescriptorProto.field
    pub const FIELD: i32 = 2;
    /// DescriptorProto.nested_type
    pub const NESTED_TYPE: i32 = 3;
    /// DescriptorProto.enum_type (nested)
    pub const NESTED_ENUM_TYPE: i32 = 4;
}

/// Serialization kind of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    /// Enum field, carrying the enum type's full name.
    Enum(String),
    /// Message field, carrying the message type's full name.
    Message(String),
    /// Group field (proto2), carried through and treated as a message.
    Group(String),
}

impl FieldKind {
    fn from_proto(field: &FieldDescriptorProto, field_name: &str) -> Result<Self> {
        let raw = field
            .type_
            .ok_or_else(|| Error::Parse(format!("field {field_name} missing type")))?;
        let kind = raw.enum_value().map_err(|unknown| Error::UnsupportedKind {
            field: field_name.to_string(),
            kind: unknown.to_string(),
        })?;
        Ok(match kind {
            Type::TYPE_DOUBLE => FieldKind::Double,
            Type::TYPE_FLOAT => FieldKind::Float,
            Type::TYPE_INT32 => FieldKind::Int32,
            Type::TYPE_INT64 => FieldKind::Int64,
            Type::TYPE_UINT32 => FieldKind::Uint32,
            Type::TYPE_UINT64 => FieldKind::Uint64,
            Type::TYPE_SINT32 => FieldKind::Sint32,
            Type::TYPE_SINT64 => FieldKind::Sint64,
            Type::TYPE_FIXED32 => FieldKind::Fixed32,
            Type::TYPE_FIXED64 => FieldKind::Fixed64,
            Type::TYPE_SFIXED32 => FieldKind::Sfixed32,
            Type::TYPE_SFIXED64 => FieldKind::Sfixed64,
            Type::TYPE_BOOL => FieldKind::Bool,
            Type::TYPE_STRING => FieldKind::String,
            Type::TYPE_BYTES => FieldKind::Bytes,
            Type::TYPE_ENUM => FieldKind::Enum(referenced_type_name(field)),
            Type::TYPE_MESSAGE => FieldKind::Message(referenced_type_name(field)),
            Type::TYPE_GROUP => FieldKind::Group(referenced_type_name(field)),
        })
    }

    /// Short name of the kind, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Double => "double",
            FieldKind::Float => "float",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint32 => "uint32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Sint32 => "sint32",
            FieldKind::Sint64 => "sint64",
            FieldKind::Fixed32 => "fixed32",
            FieldKind::Fixed64 => "fixed64",
            FieldKind::Sfixed32 => "sfixed32",
            FieldKind::Sfixed64 => "sfixed64",
            FieldKind::Bool => "bool",
            FieldKind::String => "string",
            FieldKind::Bytes => "bytes",
            FieldKind::Enum(_) => "enum",
            FieldKind::Message(_) => "message",
            FieldKind::Group(_) => "group",
        }
    }
}

/// Type names in a typechecked descriptor are absolute (leading dot).
/// Pool keys have no leading dot, so strip it at conversion.
fn referenced_type_name(field: &FieldDescriptorProto) -> String {
    field
        .type_name
        .clone()
        .unwrap_or_default()
        .trim_start_matches('.')
        .to_string()
}

/// A named message type.
#[derive(Debug, Clone)]
pub struct MessageDescriptor {
    /// Fully-qualified name (e.g. `mypackage.MyMessage.Nested`).
    pub full_name: String,
    /// Simple name (the last component of the full name).
    pub name: String,
    /// Leading source comment, if any.
    pub doc: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
    /// Whether this is a synthetic map-entry type.
    pub is_map_entry: bool,
    /// Oneof declarations, with member field names in declaration order.
    pub oneofs: Vec<OneofDescriptor>,
}

impl MessageDescriptor {
    /// The full name with the trailing `.<name>` stripped.
    pub fn namespace(&self) -> &str {
        namespace_of(&self.full_name, &self.name)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_json_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.json_name == name)
    }

    /// Key (number 1) and value (number 2) fields of a map-entry type.
    pub fn map_entry_fields(&self) -> Option<(&FieldDescriptor, &FieldDescriptor)> {
        let key = self.fields.iter().find(|f| f.number == 1)?;
        let value = self.fields.iter().find(|f| f.number == 2)?;
        Some((key, value))
    }
}

/// A oneof declaration: a group of sibling fields of which at most one is
/// populated in any instance.
#[derive(Debug, Clone)]
pub struct OneofDescriptor {
    pub name: String,
    /// Member field names in declaration order.
    pub fields: Vec<String>,
}

/// A single field of a message.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    /// The JSON (lowerCamelCase) name, from the descriptor or derived.
    pub json_name: String,
    pub number: i32,
    pub kind: FieldKind,
    pub is_repeated: bool,
    /// Repeated field whose element type is a map-entry message.
    pub is_map: bool,
    /// Leading source comment, if any.
    pub doc: Option<String>,
    /// Index into the containing message's oneofs, for real (non-synthetic)
    /// oneof members.
    pub oneof_index: Option<usize>,
}

impl FieldDescriptor {
    /// Repeated but not a map.
    pub fn is_list(&self) -> bool {
        self.is_repeated && !self.is_map
    }
}

/// A named enum type.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    pub full_name: String,
    pub name: String,
    pub doc: Option<String>,
    /// (name, number) pairs in declaration order.
    pub values: Vec<(String, i32)>,
}

impl EnumDescriptor {
    pub fn namespace(&self) -> &str {
        namespace_of(&self.full_name, &self.name)
    }

    pub fn value_by_name(&self, name: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(value_name, _)| value_name == name)
            .map(|(_, number)| *number)
    }
}

fn namespace_of<'a>(full_name: &'a str, name: &str) -> &'a str {
    full_name
        .strip_suffix(name)
        .and_then(|prefix| prefix.strip_suffix('.'))
        .unwrap_or(full_name)
}

/// A registry of resolved message and enum descriptors, keyed by full name.
#[derive(Debug, Default)]
pub struct DescriptorPool {
    messages: HashMap<String, MessageDescriptor>,
    enums: HashMap<String, EnumDescriptor>,
}

impl DescriptorPool {
    /// Build a pool from file descriptor protos (e.g. `protobuf-parse`
    /// output or a decoded `FileDescriptorSet`).
    pub fn from_file_descriptors(files: &[FileDescriptorProto]) -> Result<Self> {
        // First pass: collect map-entry type names, so fields referencing
        // them can be flagged while their message is being converted.
        let mut map_entries = HashSet::new();
        for file in files {
            let prefix = package_prefix(file);
            for message in &file.message_type {
                collect_map_entries(&prefix, message, &mut map_entries);
            }
        }

        let mut pool = DescriptorPool::default();
        for file in files {
            let prefix = package_prefix(file);
            let comments = CommentMap::from_file(file);
            for (index, message) in file.message_type.iter().enumerate() {
                pool.add_message(
                    &prefix,
                    message,
                    &map_entries,
                    &comments,
                    &[path::MESSAGE_TYPE, index as i32],
                )?;
            }
            for (index, enum_type) in file.enum_type.iter().enumerate() {
                pool.add_enum(
                    &prefix,
                    enum_type,
                    &comments,
                    &[path::ENUM_TYPE, index as i32],
                )?;
            }
        }
        Ok(pool)
    }

    /// Parse `.proto` files and build a pool from the result.
    pub fn parse_proto_files(
        inputs: &[impl AsRef<Path>],
        includes: &[impl AsRef<Path>],
    ) -> Result<Self> {
        let mut parser = protobuf_parse::Parser::new();
        for input in inputs {
            parser.input(input);
        }
        for include in includes {
            parser.include(include);
        }
        let parsed = parser
            .parse_and_typecheck()
            .map_err(|e| Error::Parse(e.to_string()))?;
        Self::from_file_descriptors(&parsed.file_descriptors)
    }

    /// Parse `.proto` source text and build a pool from the result.
    pub fn parse_proto_str(content: &str) -> Result<Self> {
        let mut temp_file = tempfile::Builder::new()
            .suffix(".proto")
            .tempfile()
            .map_err(|e| Error::Parse(format!("failed to create temp file: {e}")))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| Error::Parse(format!("failed to write temp file: {e}")))?;
        let input = temp_file.path().to_path_buf();
        let include = input
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Parse("temp file has no parent directory".to_string()))?;
        Self::parse_proto_files(&[input], &[include])
    }

    /// Look up a message descriptor by full name (leading dot tolerated).
    pub fn message(&self, full_name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(full_name.trim_start_matches('.'))
    }

    /// Look up an enum descriptor by full name (leading dot tolerated).
    pub fn enum_by_name(&self, full_name: &str) -> Option<&EnumDescriptor> {
        self.enums.get(full_name.trim_start_matches('.'))
    }

    /// Full names of all registered message types.
    pub fn message_names(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    fn add_message(
        &mut self,
        prefix: &str,
        message: &DescriptorProto,
        map_entries: &HashSet<String>,
        comments: &CommentMap,
        location: &[i32],
    ) -> Result<()> {
        let name = message.name.clone().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Parse("message missing name".to_string()));
        }
        let full_name = format!("{prefix}{name}");
        let is_map_entry = message
            .options
            .as_ref()
            .map(|options| options.map_entry())
            .unwrap_or(false);

        let mut oneofs: Vec<OneofDescriptor> = message
            .oneof_decl
            .iter()
            .map(|oneof| OneofDescriptor {
                name: oneof.name.clone().unwrap_or_default(),
                fields: Vec::new(),
            })
            .collect();

        let mut fields = Vec::with_capacity(message.field.len());
        for (index, field) in message.field.iter().enumerate() {
            let field_name = field.name.clone().unwrap_or_default();
            if field_name.is_empty() {
                return Err(Error::Parse(format!(
                    "field in message {full_name} missing name"
                )));
            }
            let kind = FieldKind::from_proto(field, &field_name)?;
            let is_repeated = field.label == Some(Label::LABEL_REPEATED.into());
            let is_map = is_repeated
                && matches!(&kind, FieldKind::Message(entry) if map_entries.contains(entry));
            // Proto3 optional fields sit in synthetic single-member oneofs;
            // those are not oneofs for our purposes.
            let oneof_index = match field.oneof_index {
                Some(declared) if !field.proto3_optional.unwrap_or(false) => {
                    let declared = declared as usize;
                    if let Some(oneof) = oneofs.get_mut(declared) {
                        oneof.fields.push(field_name.clone());
                        Some(declared)
                    } else {
                        None
                    }
                }
                _ => None,
            };
            let json_name = match &field.json_name {
                Some(json_name) if !json_name.is_empty() => json_name.clone(),
                _ => derive_json_name(&field_name),
            };
            fields.push(FieldDescriptor {
                doc: comments.get(&child_path(location, path::FIELD, index)),
                name: field_name,
                json_name,
                number: field.number.unwrap_or(0),
                kind,
                is_repeated,
                is_map,
                oneof_index,
            });
        }

        self.messages.insert(
            full_name.clone(),
            MessageDescriptor {
                doc: comments.get(location),
                name,
                full_name: full_name.clone(),
                fields,
                is_map_entry,
                oneofs,
            },
        );

        let nested_prefix = format!("{full_name}.");
        for (index, nested) in message.nested_type.iter().enumerate() {
            self.add_message(
                &nested_prefix,
                nested,
                map_entries,
                comments,
                &child_path(location, path::NESTED_TYPE, index),
            )?;
        }
        for (index, enum_type) in message.enum_type.iter().enumerate() {
            self.add_enum(
                &nested_prefix,
                enum_type,
                comments,
                &child_path(location, path::NESTED_ENUM_TYPE, index),
            )?;
        }
        Ok(())
    }

    fn add_enum(
        &mut self,
        prefix: &str,
        enum_type: &EnumDescriptorProto,
        comments: &CommentMap,
        location: &[i32],
    ) -> Result<()> {
        let name = enum_type.name.clone().unwrap_or_default();
        if name.is_empty() {
            return Err(Error::Parse("enum missing name".to_string()));
        }
        let full_name = format!("{prefix}{name}");
        let values = enum_type
            .value
            .iter()
            .map(|value| {
                (
                    value.name.clone().unwrap_or_default(),
                    value.number.unwrap_or(0),
                )
            })
            .collect();
        self.enums.insert(
            full_name.clone(),
            EnumDescriptor {
                doc: comments.get(location),
                name,
                full_name,
                values,
            },
        );
        Ok(())
    }
}

fn package_prefix(file: &FileDescriptorProto) -> String {
    match file.package.as_deref() {
        Some(package) if !package.is_empty() => format!("{package}."),
        _ => String::new(),
    }
}

fn collect_map_entries(prefix: &str, message: &DescriptorProto, map_entries: &mut HashSet<String>) {
    let name = match &message.name {
        Some(name) => name,
        None => return,
    };
    let full_name = format!("{prefix}{name}");
    let is_map_entry = message
        .options
        .as_ref()
        .map(|options| options.map_entry())
        .unwrap_or(false);
    if is_map_entry {
        map_entries.insert(full_name.clone());
    }
    let nested_prefix = format!("{full_name}.");
    for nested in &message.nested_type {
        collect_map_entries(&nested_prefix, nested, map_entries);
    }
}

fn child_path(base: &[i32], tag: i32, index: usize) -> Vec<i32> {
    let mut path = base.to_vec();
    path.push(tag);
    path.push(index as i32);
    path
}

/// Derive the JSON name for a field the way protoc does: drop underscores
/// and capitalize the letter following each one.
fn derive_json_name(name: &str) -> String {
    let mut json_name = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for c in name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            json_name.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            json_name.push(c);
        }
    }
    json_name
}

/// Leading comments extracted from a file's SourceCodeInfo, indexed by
/// descriptor path.
struct CommentMap {
    comments: HashMap<Vec<i32>, String>,
}

impl CommentMap {
    fn from_file(file: &FileDescriptorProto) -> Self {
        let mut comments = HashMap::new();
        if let Some(info) = file.source_code_info.as_ref() {
            for location in &info.location {
                if let Some(leading) = &location.leading_comments {
                    let cleaned = clean_comment(leading);
                    if !cleaned.is_empty() {
                        comments.insert(location.path.clone(), cleaned);
                    }
                }
            }
        }
        Self { comments }
    }

    fn get(&self, path: &[i32]) -> Option<String> {
        self.comments.get(path).cloned()
    }
}

/// Trim comment marker residue: per-line leading/trailing whitespace and
/// leading block-comment asterisks; empty lines are dropped.
fn clean_comment(comment: &str) -> String {
    comment
        .lines()
        .map(|line| line.trim().trim_start_matches('*').trim_start().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

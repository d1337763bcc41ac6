//! Avro schemas for protobuf messages.
//!
//! This crate maps a protobuf message type to an equivalent Avro schema
//! and decodes Avro-JSON value trees back into instances of that type.
//! The two directions never call each other at runtime; they are coupled
//! by a shape contract: whatever nullability, array, map, or union shape
//! inference assigns to a field is exactly the shape decoding unwraps.
//!
//! # Architecture
//!
//! ```text
//! .proto / FileDescriptorProto → DescriptorPool ─┬→ infer_schema → avro::Schema (JSON)
//!                                                └→ decode(Value) → DynamicMessage
//! ```
//!
//! # Modules
//!
//! - [`descriptor`] - resolved message/field/enum descriptors and the pool
//! - [`schema`] - Avro schema inference over descriptors
//! - [`avro`] - the Avro schema data model
//! - [`decode`] - decoding generic value trees into dynamic messages
//! - [`message`] - dynamic message instances
//! - [`value`] - the generic decoded value tree
//!
//! # Example
//!
//! ```
//! use protoavro::{decode, infer_schema, DescriptorPool, DynamicMessage, Value};
//!
//! let pool = DescriptorPool::parse_proto_str(r#"
//!     syntax = "proto3";
//!     package demo;
//!     message User {
//!         string name = 1;
//!         int64 visits = 2;
//!     }
//! "#)?;
//! let user = pool.message("demo.User").expect("registered above");
//!
//! let schema = infer_schema(&pool, user)?;
//! let document = serde_json::to_string(&schema).expect("schema serializes");
//! assert!(document.contains("\"record\""));
//!
//! let mut message = DynamicMessage::for_descriptor(user);
//! let data = Value::from(serde_json::json!({"name": "ada", "visits": 3}));
//! decode(&pool, &data, &mut message)?;
//! # Ok::<(), protoavro::Error>(())
//! ```

pub mod avro;
pub mod decode;
pub mod descriptor;
mod error;
pub mod message;
pub mod schema;
pub mod value;
mod wkt;

pub use decode::decode;
pub use descriptor::{
    DescriptorPool, EnumDescriptor, FieldDescriptor, FieldKind, MessageDescriptor, OneofDescriptor,
};
pub use error::{Error, Result};
pub use message::{DynamicMessage, FieldValue, MapKey};
pub use schema::{infer_schema, SchemaOptions};
pub use value::Value;

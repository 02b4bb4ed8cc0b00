//! Schema registry and multi-target code generation.
//!
//! `si-registry` holds the declared schema of every system service as a
//! typed property graph and generates deterministic Protobuf definitions,
//! Rust service/model sources, and executable GraphQL documents from it.
//!
//! # Features
//!
//! - Typed property model: text, numbers, maps, code, enums, nested
//!   objects, methods, actions, and cross-object links
//! - Component / entity / entity-event object triples with standard
//!   fields and CRUD methods baked in
//! - Protobuf output with wrapper types and stable two-partition field
//!   numbering (universal from 1, custom from 1001)
//! - Generated Rust `gen/` trees for `si-{service}` crates, optionally
//!   piped through `rustfmt`
//! - GraphQL query/mutation documents built straight from the schema
//! - Idempotent writes: files are only touched when their content changes
//! - Deterministic output: byte-identical across runs
//!
//! # Usage
//!
//! ```
//! use si_registry::codegen::protobuf::ProtobufFormatter;
//!
//! let registry = si_registry::schema::application_registry()?;
//! let formatter = ProtobufFormatter::new(&registry, "kubernetes")?;
//! let proto = formatter.generate_string()?;
//! assert!(proto.starts_with("syntax = \"proto3\";"));
//! # Ok::<(), si_registry::error::Error>(())
//! ```

pub mod association;
pub mod attr_list;
pub mod case;
pub mod codegen;
pub mod error;
pub mod object;
pub mod prop;
pub mod registry;
pub mod schema;
pub mod writer;

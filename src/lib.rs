//! Metadata-driven decoding of JSON-API documents into typed domain objects.
//!
//! Supported:
//! - Scalars with coercion (numeric strings, truthy boolean tokens), timestamps
//!   against declared formats, and raw subtree passthrough.
//! - Nested objects and JSON-API resources (`type`/`id`/attributes/relationships),
//!   arrays and associative structures with preserved key order.
//! - Polymorphic families dispatched through discriminator fields.
//! - Per-group loader overrides and custom decoding callbacks.
//!
//! Hardening & policies:
//! - Depth limit on document nesting (no stack exhaustion on hostile input).
//! - Absence is never an error: missing locations decode to null, only present
//!   values of the wrong shape fail.
//! - Failures are JSON-API error objects carrying a `source.pointer` to the
//!   exact document location.
//!
//! Entry points: [`DataParser::parse_document`] / [`DataParser::parse_document_as`]
//! for direct decoding, [`CodecRegistry`] for named codecs.

pub use crate::decoded::{ArrayKey, Decoded};
pub use crate::error::{ApiError, Error, ErrorSource};
pub use crate::factory::{MetadataFactory, MetadataRegistry};
pub use crate::options::Options;
pub use crate::parser::DataParser;
pub use crate::registry::{CodecRegistry, Decoder, Encoder};

pub mod accessor;
pub mod decoded;
pub mod decoders;
pub mod error;
pub mod factory;
mod macros;
pub mod metadata;
pub mod options;
pub mod parser;
mod pointer;
pub mod registry;

//! `protogem` turns parsed proto3 descriptors into self-contained Ruby
//! classes with inline wire-format encoders and decoders.
//!
//! The input is an in-memory [`descriptor::FileDescriptor`] tree produced
//! by a `.proto` parser; the output is Ruby source text. Generated classes
//! carry the full message surface: accessors, bounds-checked mutators, a
//! keyword-argument constructor, `has_<field>?` presence predicates backed
//! by a single bitmask, `to_h`, `encode`/`_encode`, and
//! `decode`/`decode_from`. Enums become modules of integer constants with
//! `lookup`/`resolve` functions. References to `google.protobuf` wrapper
//! types and `Timestamp` resolve to the pre-written runtime classes, and
//! the generated file declares the matching `require`.
//!
//! # Example
//!
//! ```
//! use protogem::descriptor::{
//!     FieldDescriptor, FieldType, FileDescriptor, MessageDescriptor, MessageField,
//! };
//!
//! let file = FileDescriptor {
//!     package: "demo".to_string(),
//!     messages: vec![MessageDescriptor {
//!         name: "Greeting".to_string(),
//!         fields: vec![MessageField::Single(FieldDescriptor::required(
//!             "text",
//!             1,
//!             FieldType::String,
//!         ))],
//!         ..Default::default()
//!     }],
//!     ..Default::default()
//! };
//!
//! let ruby = protogem::generate(&file)?;
//! assert!(ruby.contains("class Greeting"));
//! # Ok::<(), protogem::Error>(())
//! ```

mod codegen;
mod config;
mod context;
pub mod descriptor;
mod error;
mod varint;
mod writer;

pub use config::Config;
pub use error::Error;

use descriptor::FileDescriptor;

/// Generate Ruby source for `file` with default settings.
pub fn generate(file: &FileDescriptor) -> Result<String, Error> {
    Config::new().generate(file)
}

//! Code generation from proto3 descriptors.

mod enumeration;
mod field;
mod fragments;
mod message;
mod oneof;
pub(crate) mod wellknown;

use crate::config::Config;
use crate::context::{namespace_components, GenerationContext};
use crate::descriptor::FileDescriptor;
use crate::error::Error;
use crate::writer::SourceWriter;

use enumeration::generate_enum;
use message::generate_message;

/// Generate the complete Ruby source for one file descriptor.
pub fn generate_file(config: &Config, file: &FileDescriptor) -> Result<String, Error> {
    let mut ctx = GenerationContext::new(config, file);

    // The body is rendered first so every well-known-type require is
    // recorded before the preamble is written.
    let mut body = SourceWriter::new();
    let namespace = namespace_components(file);
    for component in &namespace {
        body.push(format!("module {}", component));
        body.indent();
    }

    let mut first = true;
    for enumeration in &file.enums {
        if !first {
            body.blank();
        }
        first = false;
        generate_enum(&mut body, enumeration)?;
    }
    for message in &file.messages {
        if !first {
            body.blank();
        }
        first = false;
        generate_message(&mut ctx, &mut body, message)?;
    }

    for _ in &namespace {
        body.dedent();
        body.push("end");
    }

    let mut w = SourceWriter::new();
    w.push("# frozen_string_literal: true");
    w.blank();
    w.push("# Generated by protogem. Do not edit.");
    w.blank();
    let requires: Vec<String> = ctx.requires().map(str::to_string).collect();
    if !requires.is_empty() {
        for path in requires {
            w.push(format!("require \"{}\"", path));
        }
        w.blank();
    }
    w.push(body.finish());
    Ok(w.finish())
}

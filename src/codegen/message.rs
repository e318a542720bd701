//! Message code generation.
//!
//! Emits one self-contained Ruby class per message: static entry points,
//! nested types, accessors, bounds-checked mutators, a keyword-argument
//! constructor, presence predicates, `to_h`, the encoder, and the decoder.

use crate::context::{assign_presence_bits, GenerationContext};
use crate::descriptor::{Cardinality, MessageDescriptor, MessageField, OneofDescriptor};
use crate::error::Error;
use crate::writer::SourceWriter;

use super::enumeration::generate_enum;
use super::field::{FieldPlan, MapPlan, Sign};
use super::fragments;
use super::oneof;

/// Classified view of a whole message, built once and shared by every
/// emission pass.
pub struct MessagePlan<'a> {
    pub entries: Vec<EntryPlan<'a>>,
    /// True when every field number is <= 15, so every tag fits in one
    /// byte and the decoder reads tags with a plain `getbyte`.
    pub single_byte_tags: bool,
    /// True when the message tracks any optional fields.
    pub has_bitmask: bool,
}

pub enum EntryPlan<'a> {
    Single(FieldPlan<'a>),
    Oneof {
        group: &'a OneofDescriptor,
        members: Vec<FieldPlan<'a>>,
    },
    Map(MapPlan<'a>),
}

impl<'a> MessagePlan<'a> {
    pub fn build(
        ctx: &mut GenerationContext<'_>,
        message: &'a MessageDescriptor,
    ) -> Result<Self, Error> {
        let bits = assign_presence_bits(message)?;
        let mut entries = Vec::with_capacity(message.fields.len());
        let mut max_number = 0;

        for entry in &message.fields {
            match entry {
                MessageField::Single(field) => {
                    max_number = max_number.max(field.number);
                    let bit = bits.get(&field.number).copied();
                    entries.push(EntryPlan::Single(FieldPlan::build(
                        ctx, message, field, bit, None,
                    )?));
                }
                MessageField::Oneof(group) => {
                    let members = group
                        .fields
                        .iter()
                        .map(|field| {
                            max_number = max_number.max(field.number);
                            FieldPlan::build(ctx, message, field, None, Some(group.name.as_str()))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    entries.push(EntryPlan::Oneof { group, members });
                }
                MessageField::Map(map) => {
                    max_number = max_number.max(map.number);
                    entries.push(EntryPlan::Map(MapPlan::build(ctx, message, map)?));
                }
            }
        }

        Ok(Self {
            entries,
            single_byte_tags: max_number <= 15,
            has_bitmask: !bits.is_empty(),
        })
    }
}

/// Generate the full Ruby class for `message`, recursing into nested
/// types.
pub fn generate_message(
    ctx: &mut GenerationContext<'_>,
    w: &mut SourceWriter,
    message: &MessageDescriptor,
) -> Result<(), Error> {
    let plan = MessagePlan::build(ctx, message)?;

    w.push(format!("class {}", message.name));
    w.indent();

    w.push("def self.decode(buff)");
    w.indent();
    w.push("allocate.decode_from(buff.b, 0, buff.bytesize)");
    w.dedent();
    w.push("end");

    w.blank();
    w.push("def self.encode(obj)");
    w.indent();
    w.push("obj._encode(\"\".b)");
    w.dedent();
    w.push("end");

    for enumeration in &message.enums {
        w.blank();
        generate_enum(w, enumeration)?;
    }

    for nested in &message.messages {
        w.blank();
        generate_message(ctx, w, nested)?;
    }

    emit_readers(w, &plan);
    emit_writers(w, &plan);
    emit_initialize(w, &plan);
    emit_presence(w, &plan);
    emit_to_h(w, &plan);
    emit_encode(w, &plan);
    emit_decode(w, &plan);

    w.dedent();
    w.push("end");
    Ok(())
}

/// An enum-typed singular field reads through `lookup`, falling back to
/// the raw number for unknown values.
fn symbolic_reader(plan: &FieldPlan<'_>) -> bool {
    plan.is_enum && plan.field.cardinality != Cardinality::Repeated
}

fn emit_readers(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    let mut plain = Vec::new();
    let mut symbolic: Vec<&FieldPlan<'_>> = Vec::new();

    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) => {
                if symbolic_reader(fp) {
                    symbolic.push(fp);
                } else {
                    plain.push(fp.field.name.clone());
                }
            }
            EntryPlan::Oneof { group, members } => {
                plain.push(group.name.clone());
                for member in members {
                    if symbolic_reader(member) {
                        symbolic.push(member);
                    } else {
                        plain.push(member.field.name.clone());
                    }
                }
            }
            EntryPlan::Map(mp) => plain.push(mp.map.name.clone()),
        }
    }

    if !plain.is_empty() {
        w.blank();
        let list = plain
            .iter()
            .map(|name| format!(":{}", name))
            .collect::<Vec<_>>()
            .join(", ");
        w.push(format!("attr_reader {}", list));
    }

    for fp in symbolic {
        w.blank();
        w.push(format!("def {}", fp.field.name));
        w.indent();
        w.push(format!(
            "{}.lookup({}) || {}",
            fp.class_ref(),
            fp.ivar(),
            fp.ivar()
        ));
        w.dedent();
        w.push("end");
    }
}

/// Whether a single field's mutator needs custom logic beyond assignment.
fn plain_writer(plan: &FieldPlan<'_>) -> bool {
    plan.presence_bit.is_none() && !symbolic_reader(plan) && plan.bounds().is_none()
}

fn emit_writers(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    let mut plain = Vec::new();
    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) if plain_writer(fp) => plain.push(fp.field.name.clone()),
            EntryPlan::Map(mp) => plain.push(mp.map.name.clone()),
            _ => {}
        }
    }

    if !plain.is_empty() {
        w.blank();
        let list = plain
            .iter()
            .map(|name| format!(":{}", name))
            .collect::<Vec<_>>()
            .join(", ");
        w.push(format!("attr_writer {}", list));
    }

    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) if !plain_writer(fp) => emit_single_writer(w, fp),
            EntryPlan::Oneof { members, .. } => {
                oneof::generate_oneof_writers(w, members);
            }
            _ => {}
        }
    }
}

fn emit_single_writer(w: &mut SourceWriter, fp: &FieldPlan<'_>) {
    w.blank();
    w.push(format!("def {}=(v)", fp.field.name));
    w.indent();
    if let Some(bounds) = fp.bounds() {
        if fp.field.cardinality == Cardinality::Repeated {
            w.push("v.each do |item|");
            w.indent();
            fragments::bounds_check(w, "item", bounds);
            w.dedent();
            w.push("end");
        } else {
            fragments::bounds_check(w, "v", bounds);
        }
    }
    if let Some(bit) = fp.presence_bit {
        w.push(format!("@_bitmask |= 0x{:x}", 1u64 << bit));
    }
    if symbolic_reader(fp) {
        w.push(format!(
            "{} = {}.resolve(v) || v",
            fp.ivar(),
            fp.class_ref()
        ));
    } else {
        w.push(format!("{} = v", fp.ivar()));
    }
    w.dedent();
    w.push("end");
}

fn emit_initialize(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    let mut params = Vec::new();
    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) => {
                let default = match fp.field.cardinality {
                    Cardinality::Optional => "nil",
                    Cardinality::Repeated => "[]",
                    Cardinality::Required => fp.default_literal(),
                };
                params.push(format!("{}: {}", fp.field.name, default));
            }
            EntryPlan::Oneof { members, .. } => {
                for member in members {
                    params.push(format!("{}: nil", member.field.name));
                }
            }
            EntryPlan::Map(mp) => params.push(format!("{}: {{}}", mp.map.name)),
        }
    }

    w.blank();
    if params.is_empty() {
        w.push("def initialize");
    } else {
        w.push(format!("def initialize({})", params.join(", ")));
    }
    w.indent();
    if plan.has_bitmask {
        w.push("@_bitmask = 0");
    }

    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) => emit_initialize_single(w, fp),
            EntryPlan::Oneof { group, members } => {
                oneof::generate_oneof_constructor(w, &group.name, members);
            }
            EntryPlan::Map(mp) => w.push(format!("{} = {}", mp.ivar(), mp.map.name)),
        }
    }

    w.dedent();
    w.push("end");
}

fn emit_initialize_single(w: &mut SourceWriter, fp: &FieldPlan<'_>) {
    let name = &fp.field.name;
    match fp.field.cardinality {
        Cardinality::Optional => {
            w.push(format!("if {}.nil?", name));
            w.indent();
            w.push(format!("{} = {}", fp.ivar(), fp.default_literal()));
            w.dedent();
            w.push("else");
            w.indent();
            if let Some(bounds) = fp.bounds() {
                fragments::bounds_check(w, name, bounds);
            }
            w.push(format!(
                "@_bitmask |= 0x{:x}",
                1u64 << fp.presence_bit.unwrap_or(0)
            ));
            if fp.is_enum {
                w.push(format!(
                    "{} = {}.resolve({}) || {}",
                    fp.ivar(),
                    fp.class_ref(),
                    name,
                    name
                ));
            } else {
                w.push(format!("{} = {}", fp.ivar(), name));
            }
            w.dedent();
            w.push("end");
        }
        Cardinality::Repeated => {
            if let Some(bounds) = fp.bounds() {
                w.push(format!("{}.each do |item|", name));
                w.indent();
                fragments::bounds_check(w, "item", bounds);
                w.dedent();
                w.push("end");
            }
            w.push(format!("{} = {}", fp.ivar(), name));
        }
        Cardinality::Required => {
            if let Some(bounds) = fp.bounds() {
                fragments::bounds_check(w, name, bounds);
            }
            if fp.is_enum {
                w.push(format!(
                    "{} = {}.resolve({}) || {}",
                    fp.ivar(),
                    fp.class_ref(),
                    name,
                    name
                ));
            } else {
                w.push(format!("{} = {}", fp.ivar(), name));
            }
        }
    }
}

fn emit_presence(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    for entry in &plan.entries {
        if let EntryPlan::Single(fp) = entry {
            if let Some(bit) = fp.presence_bit {
                w.blank();
                w.push(format!("def has_{}?", fp.field.name));
                w.indent();
                w.push(format!("(@_bitmask & 0x{:x}) != 0", 1u64 << bit));
                w.dedent();
                w.push("end");
            }
        }
    }
}

fn emit_to_h(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    w.blank();
    w.push("def to_h");
    w.indent();
    w.push("result = {}");
    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) => {
                let name = &fp.field.name;
                if fp.is_message() {
                    match fp.field.cardinality {
                        Cardinality::Repeated => w.push(format!(
                            "result[:{}] = {}.map {{ |item| item.to_h }}",
                            name,
                            fp.ivar()
                        )),
                        _ => w.push(format!(
                            "result[:{}] = {}.to_h unless {}.nil?",
                            name,
                            fp.ivar(),
                            fp.ivar()
                        )),
                    }
                } else {
                    w.push(format!("result[:{}] = {}", name, fp.ivar()));
                }
            }
            EntryPlan::Oneof { group, .. } => {
                w.push(format!(
                    "result[@{}] = send(@{}) unless @{}.nil?",
                    group.name, group.name, group.name
                ));
            }
            EntryPlan::Map(mp) => {
                if mp.value.is_message() {
                    w.push(format!(
                        "result[:{}] = {}.transform_values {{ |val| val.to_h }}",
                        mp.map.name,
                        mp.ivar()
                    ));
                } else {
                    w.push(format!("result[:{}] = {}", mp.map.name, mp.ivar()));
                }
            }
        }
    }
    w.push("result");
    w.dedent();
    w.push("end");
}

fn emit_encode(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    w.blank();
    w.push("def _encode(buff)");
    w.indent();

    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) => emit_encode_single(w, fp),
            EntryPlan::Oneof { group, members } => {
                oneof::generate_oneof_encode(w, &group.name, members);
            }
            EntryPlan::Map(mp) => emit_encode_map(w, mp),
        }
        w.blank();
    }

    w.push("buff");
    w.dedent();
    w.push("end");
}

fn emit_encode_single(w: &mut SourceWriter, fp: &FieldPlan<'_>) {
    match fp.field.cardinality {
        Cardinality::Repeated => emit_encode_repeated(w, fp),
        Cardinality::Optional => {
            w.push(format!(
                "if (@_bitmask & 0x{:x}) != 0",
                1u64 << fp.presence_bit.unwrap_or(0)
            ));
            w.indent();
            w.push(format!("val = {}", fp.ivar()));
            if fp.is_message() {
                w.push("unless val.nil?");
                w.indent();
                fragments::encode_tag(w, &fp.tag_bytes());
                fragments::encode_value(w, &fp.field.ty, fp.is_enum, "val", true, "offset");
                w.dedent();
                w.push("end");
            } else {
                fragments::encode_tag(w, &fp.tag_bytes());
                fragments::encode_value(w, &fp.field.ty, fp.is_enum, "val", true, "offset");
            }
            w.dedent();
            w.push("end");
        }
        Cardinality::Required => {
            w.push(format!("val = {}", fp.ivar()));
            w.push(default_gate(fp));
            w.indent();
            fragments::encode_tag(w, &fp.tag_bytes());
            fragments::encode_value(w, &fp.field.ty, fp.is_enum, "val", false, "offset");
            w.dedent();
            w.push("end");
        }
    }
}

/// The encoder omits a plain field when its value equals the proto3
/// default for the field's type.
fn default_gate(fp: &FieldPlan<'_>) -> &'static str {
    use crate::descriptor::FieldType;

    if fp.is_enum {
        return "if val != 0";
    }
    match fp.field.ty {
        FieldType::Bool => "if val",
        FieldType::String | FieldType::Bytes => "if val.bytesize > 0",
        FieldType::Named(_) => "unless val.nil?",
        _ => "if val != 0",
    }
}

fn emit_encode_repeated(w: &mut SourceWriter, fp: &FieldPlan<'_>) {
    w.push(format!("list = {}", fp.ivar()));
    w.push("if list.length > 0");
    w.indent();

    if fp.field.packed && fp.packed_capable() {
        fragments::encode_tag(w, &fp.packed_tag_bytes());
        if let Some(width) = fragments::fixed_width(&fp.field.ty) {
            // Fixed-width payloads have a known size; no patching needed.
            w.push(format!("len = list.length * {}", width));
            fragments::encode_varint(w, "len", false);
            w.push("list.each do |item|");
            w.indent();
            fragments::encode_value(w, &fp.field.ty, fp.is_enum, "item", true, "offset");
            w.dedent();
            w.push("end");
        } else {
            fragments::begin_length_patch(w, "offset");
            w.push("list.each do |item|");
            w.indent();
            fragments::encode_value(w, &fp.field.ty, fp.is_enum, "item", true, "offset");
            w.dedent();
            w.push("end");
            fragments::end_length_patch(w, "offset");
        }
    } else {
        w.push("list.each do |item|");
        w.indent();
        fragments::encode_tag(w, &fp.element_tag_bytes());
        fragments::encode_value(w, &fp.field.ty, fp.is_enum, "item", true, "offset");
        w.dedent();
        w.push("end");
    }

    w.dedent();
    w.push("end");
}

fn emit_encode_map(w: &mut SourceWriter, mp: &MapPlan<'_>) {
    w.push(format!("map = {}", mp.ivar()));
    w.push("if map.size > 0");
    w.indent();
    w.push("map.each do |key, val|");
    w.indent();
    fragments::encode_tag(w, &mp.tag_bytes());
    fragments::begin_length_patch(w, "entry_offset");
    fragments::encode_tag(w, &mp.key.tag_bytes());
    fragments::encode_value(w, &mp.key.field.ty, false, "key", true, "offset");
    fragments::encode_tag(w, &mp.value.tag_bytes());
    fragments::encode_value(
        w,
        &mp.value.field.ty,
        mp.value.is_enum,
        "val",
        true,
        "offset",
    );
    fragments::end_length_patch(w, "entry_offset");
    w.dedent();
    w.push("end");
    w.dedent();
    w.push("end");
}

fn emit_decode(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    w.blank();
    w.push("def decode_from(buff, index, len)");
    w.indent();

    if plan.has_bitmask {
        w.push("@_bitmask = 0");
    }
    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) => {
                if fp.field.cardinality == Cardinality::Repeated {
                    w.push(format!("{} = []", fp.ivar()));
                } else {
                    w.push(format!("{} = {}", fp.ivar(), fp.default_literal()));
                }
            }
            EntryPlan::Oneof { group, members } => {
                w.push(format!("@{} = nil", group.name));
                for member in members {
                    w.push(format!("{} = {}", member.ivar(), member.default_literal()));
                }
            }
            EntryPlan::Map(mp) => w.push(format!("{} = {{}}", mp.ivar())),
        }
    }

    if plan.entries.is_empty() {
        w.push("self");
        w.dedent();
        w.push("end");
        return;
    }

    w.blank();
    w.push("return self if index >= len");
    pull_tag(w, plan);

    w.blank();
    w.push("while true");
    w.indent();
    let mut first = true;
    for entry in &plan.entries {
        match entry {
            EntryPlan::Single(fp) => match fp.field.cardinality {
                Cardinality::Repeated => {
                    if fp.packed_capable() {
                        sep(w, &mut first);
                        emit_decode_packed(w, plan, fp);
                        sep(w, &mut first);
                        emit_decode_unpacked(w, plan, fp);
                    } else {
                        sep(w, &mut first);
                        emit_decode_unpacked(w, plan, fp);
                    }
                }
                _ => {
                    sep(w, &mut first);
                    emit_decode_single(w, plan, fp);
                }
            },
            EntryPlan::Oneof { members, .. } => {
                for member in members {
                    sep(w, &mut first);
                    emit_decode_member(w, plan, member);
                }
            }
            EntryPlan::Map(mp) => {
                sep(w, &mut first);
                emit_decode_map(w, plan, mp);
            }
        }
    }
    w.dedent();
    w.push("end");

    w.dedent();
    w.push("end");
}

fn sep(w: &mut SourceWriter, first: &mut bool) {
    if *first {
        *first = false;
    } else {
        w.blank();
    }
}

/// Read the next record tag. When every field number fits in a single
/// byte the read is a plain `getbyte`; otherwise a full varint pull.
fn pull_tag(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    if plan.single_byte_tags {
        w.push("tag = buff.getbyte(index)");
        w.push("index += 1");
    } else {
        fragments::pull_varint(w, "tag", Sign::Unsigned);
    }
}

/// The standard block epilogue: bail out at the end of the range or read
/// the next tag for the following iteration.
fn next_tag(w: &mut SourceWriter, plan: &MessagePlan<'_>) {
    w.push("return self if index >= len");
    pull_tag(w, plan);
}

fn emit_decode_single(w: &mut SourceWriter, plan: &MessagePlan<'_>, fp: &FieldPlan<'_>) {
    w.push(format!("if tag == 0x{:02x}", fp.tag_value()));
    w.indent();
    fragments::pull_value(w, &fp.field.ty, fp.is_enum, fp.class_ref(), &fp.ivar());
    if let Some(bit) = fp.presence_bit {
        w.push(format!("@_bitmask |= 0x{:x}", 1u64 << bit));
    }
    next_tag(w, plan);
    w.dedent();
    w.push("end");
}

fn emit_decode_member(w: &mut SourceWriter, plan: &MessagePlan<'_>, member: &FieldPlan<'_>) {
    w.push(format!("if tag == 0x{:02x}", member.tag_value()));
    w.indent();
    fragments::pull_value(
        w,
        &member.field.ty,
        member.is_enum,
        member.class_ref(),
        &member.ivar(),
    );
    if let Some(group) = member.oneof {
        w.push(format!("@{} = :{}", group, member.field.name));
    }
    next_tag(w, plan);
    w.dedent();
    w.push("end");
}

fn emit_decode_packed(w: &mut SourceWriter, plan: &MessagePlan<'_>, fp: &FieldPlan<'_>) {
    w.push(format!("if tag == 0x{:02x}", fp.packed_tag_value()));
    w.indent();
    fragments::pull_varint(w, "value", Sign::Unsigned);
    w.push("goal = index + value");
    w.push(format!("list = {}", fp.ivar()));
    w.push("while index < goal");
    w.indent();
    fragments::pull_value(w, &fp.field.ty, fp.is_enum, fp.class_ref(), "item");
    w.push("list << item");
    w.dedent();
    w.push("end");
    next_tag(w, plan);
    w.dedent();
    w.push("end");
}

fn emit_decode_unpacked(w: &mut SourceWriter, plan: &MessagePlan<'_>, fp: &FieldPlan<'_>) {
    let tag = fp.element_tag_value();
    w.push(format!("if tag == 0x{:02x}", tag));
    w.indent();
    w.push(format!("list = {}", fp.ivar()));
    w.push("while true");
    w.indent();
    fragments::pull_value(w, &fp.field.ty, fp.is_enum, fp.class_ref(), "item");
    w.push("list << item");
    next_tag(w, plan);
    w.push(format!("break unless tag == 0x{:02x}", tag));
    w.dedent();
    w.push("end");
    w.dedent();
    w.push("end");
}

fn emit_decode_map(w: &mut SourceWriter, plan: &MessagePlan<'_>, mp: &MapPlan<'_>) {
    let tag = mp.tag_value();
    w.push(format!("if tag == 0x{:02x}", tag));
    w.indent();
    w.push(format!("map = {}", mp.ivar()));
    w.push("while true");
    w.indent();
    fragments::pull_varint(w, "_entry_len", Sign::Unsigned);
    w.push("index += 1 # key tag");
    fragments::pull_value(w, &mp.key.field.ty, false, "", "key");
    w.push("index += 1 # value tag");
    fragments::pull_value(
        w,
        &mp.value.field.ty,
        mp.value.is_enum,
        mp.value.class_ref(),
        "val",
    );
    w.push("map[key] = val");
    next_tag(w, plan);
    w.push(format!("break unless tag == 0x{:02x}", tag));
    w.dedent();
    w.push("end");
    w.dedent();
    w.push("end");
}

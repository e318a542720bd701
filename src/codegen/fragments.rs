//! Parameterized Ruby text fragments for the wire format.
//!
//! Every fragment writes straight-line Ruby into the caller's
//! [`SourceWriter`]. Scratch locals (`byte0..byte9`, `value`, `len`,
//! `byte`) are plain method locals in the emitted code and may be reused
//! freely between fragments within one method body; only length-patch
//! anchors need distinct names when patches nest.

use crate::descriptor::FieldType;
use crate::writer::SourceWriter;

use super::field::Sign;

const MASK32: &str = "0xFFFFFFFF";
const MASK64: &str = "0xFFFFFFFFFFFFFFFF";
const SIGN_BIT: &str = "0x8000000000000000";

/// Emit the unrolled 1..10-byte varint reader, assigning the decoded value
/// to `dest`. The reader inspects one byte per arm: high bit clear is
/// terminal, high bit set continues. An 11th continuation byte raises.
pub fn pull_varint(w: &mut SourceWriter, dest: &str, sign: Sign) {
    w.push(format!(
        "{} = if (byte0 = buff.getbyte(index)) < 0x80",
        dest
    ));
    w.indent();
    w.push("index += 1");
    w.push("byte0");
    w.dedent();
    for i in 1..10usize {
        w.push(format!(
            "elsif (byte{} = buff.getbyte(index + {})) < 0x80",
            i, i
        ));
        w.indent();
        w.push(format!("index += {}", i + 1));
        w.push(assemble_expr(i));
        w.dedent();
    }
    w.push("else");
    w.indent();
    w.push("raise \"varint exceeds 10 bytes\"");
    w.dedent();
    w.push("end");

    match sign {
        Sign::Unsigned => {}
        Sign::Signed64 => {
            w.push(format!(
                "{dest} = -(((~{dest}) & {MASK64}) + 1) if ({dest} & {SIGN_BIT}) != 0",
                dest = dest,
                MASK64 = MASK64,
                SIGN_BIT = SIGN_BIT,
            ));
        }
        Sign::Signed32 => {
            w.push(format!(
                "{dest} = -(((~{dest}) & {MASK32}) + 1) if ({dest} & {SIGN_BIT}) != 0",
                dest = dest,
                MASK32 = MASK32,
                SIGN_BIT = SIGN_BIT,
            ));
        }
    }
}

/// The combining expression for the arm that terminates on `byteN`.
fn assemble_expr(n: usize) -> String {
    let mut expr = format!("(byte{} << {})", n, 7 * n);
    for j in (1..n).rev() {
        expr.push_str(&format!(" | ((byte{} & 0x7F) << {})", j, 7 * j));
    }
    expr.push_str(" | (byte0 & 0x7F)");
    expr
}

/// Emit the zigzag reader: an unsigned varint pull followed by the
/// even/odd unfold.
pub fn pull_zigzag(w: &mut SourceWriter, dest: &str) {
    pull_varint(w, dest, Sign::Unsigned);
    w.push(format!("{} = if ({} & 1) == 0", dest, dest));
    w.indent();
    w.push(format!("{} >> 1", dest));
    w.dedent();
    w.push("else");
    w.indent();
    w.push(format!("-(({} + 1) >> 1)", dest));
    w.dedent();
    w.push("end");
}

/// Emit a fixed-width little-endian read.
pub fn pull_fixed(w: &mut SourceWriter, dest: &str, width: usize, directive: &str) {
    w.push(format!(
        "{} = buff.byteslice(index, {}).unpack1(\"{}\")",
        dest, width, directive
    ));
    w.push(format!("index += {}", width));
}

/// Emit a decode of one value of `ty` into `dest`, advancing `index` past
/// the consumed payload. `class_ref` names the Ruby constant for message
/// types.
pub fn pull_value(w: &mut SourceWriter, ty: &FieldType, is_enum: bool, class_ref: &str, dest: &str) {
    if is_enum {
        // Enums are int32 on the wire; unknown numbers are kept as-is.
        pull_varint(w, dest, super::field::varint_sign(ty, true));
        return;
    }
    match ty {
        FieldType::Int32 | FieldType::Int64 | FieldType::Uint32 | FieldType::Uint64 => {
            pull_varint(w, dest, super::field::varint_sign(ty, false))
        }
        FieldType::Bool => {
            pull_varint(w, dest, Sign::Unsigned);
            w.push(format!("{} = {} == 1", dest, dest));
        }
        FieldType::Sint32 | FieldType::Sint64 => pull_zigzag(w, dest),
        FieldType::Fixed32 => pull_fixed(w, dest, 4, "L<"),
        FieldType::Sfixed32 => pull_fixed(w, dest, 4, "l<"),
        FieldType::Float => pull_fixed(w, dest, 4, "e"),
        FieldType::Fixed64 => pull_fixed(w, dest, 8, "Q<"),
        FieldType::Sfixed64 => pull_fixed(w, dest, 8, "q<"),
        FieldType::Double => pull_fixed(w, dest, 8, "E"),
        FieldType::String => {
            pull_varint(w, "value", Sign::Unsigned);
            w.push(format!(
                "{} = buff.byteslice(index, value).force_encoding(Encoding::UTF_8)",
                dest
            ));
            w.push("index += value");
        }
        FieldType::Bytes => {
            pull_varint(w, "value", Sign::Unsigned);
            w.push(format!("{} = buff.byteslice(index, value)", dest));
            w.push("index += value");
        }
        FieldType::Named(_) => {
            pull_varint(w, "value", Sign::Unsigned);
            w.push(format!(
                "{} = {}.allocate.decode_from(buff, index, index + value)",
                dest, class_ref
            ));
            w.push("index += value");
        }
    }
}

/// Emit the precomputed tag bytes, one append per byte.
pub fn encode_tag(w: &mut SourceWriter, tag: &[u8]) {
    for byte in tag {
        w.push(format!("buff << 0x{:02x}", byte));
    }
}

/// Emit the varint writer for the value held in `var`. The loop shifts
/// seven bits at a time and terminates on zero; `var` is consumed.
/// Signed emission first reinterprets negatives as unsigned 64-bit
/// two's-complement, which makes them ten bytes on the wire.
pub fn encode_varint(w: &mut SourceWriter, var: &str, signed: bool) {
    if signed {
        w.push(format!("{var} = {var} & {MASK64} if {var} < 0", var = var, MASK64 = MASK64));
    }
    w.push("loop do");
    w.indent();
    w.push(format!("byte = {} & 0x7F", var));
    w.push(format!("{} >>= 7", var));
    w.push(format!("if {} == 0", var));
    w.indent();
    w.push("buff << byte");
    w.push("break");
    w.dedent();
    w.push("else");
    w.indent();
    w.push("buff << (byte | 0x80)");
    w.dedent();
    w.push("end");
    w.dedent();
    w.push("end");
}

/// Emit the zigzag fold of `var` followed by an unsigned varint write.
pub fn encode_zigzag(w: &mut SourceWriter, var: &str) {
    w.push(format!("{} = if {} >= 0", var, var));
    w.indent();
    w.push(format!("{} << 1", var));
    w.dedent();
    w.push("else");
    w.indent();
    w.push(format!("((-{}) << 1) - 1", var));
    w.dedent();
    w.push("end");
    encode_varint(w, var, false);
}

/// Reserve one byte for a length prefix whose value is only known after
/// the payload is written. `anchor` is the emitted local recording the
/// reservation index; it must be unique per nesting level.
pub fn begin_length_patch(w: &mut SourceWriter, anchor: &str) {
    w.push(format!("{} = buff.bytesize", anchor));
    w.push("buff << 0");
}

/// Patch the reserved byte once the payload is in place. Lengths above
/// 0x7F splice the extra varint bytes in after the reserved one, shifting
/// the payload right.
pub fn end_length_patch(w: &mut SourceWriter, anchor: &str) {
    w.push(format!("length = buff.bytesize - {} - 1", anchor));
    w.push("if length > 0x7F");
    w.indent();
    w.push(format!("buff.setbyte({}, (length & 0x7F) | 0x80)", anchor));
    w.push("length >>= 7");
    w.push("extra = \"\".b");
    w.push("while length > 0x7F");
    w.indent();
    w.push("extra << ((length & 0x7F) | 0x80)");
    w.push("length >>= 7");
    w.dedent();
    w.push("end");
    w.push("extra << length");
    w.push(format!("buff.bytesplice({} + 1, 0, extra)", anchor));
    w.dedent();
    w.push("else");
    w.indent();
    w.push(format!("buff.setbyte({}, length)", anchor));
    w.dedent();
    w.push("end");
}

/// Emit the value bytes (no tag) for one value of `ty` held in `var`.
///
/// `explicit_bool` selects whether bools write their actual value (set
/// optional/oneof/element contexts) or the constant `1` (a required bool
/// only encodes when true). `patch_anchor` names the reservation local
/// used for submessage values.
pub fn encode_value(
    w: &mut SourceWriter,
    ty: &FieldType,
    is_enum: bool,
    var: &str,
    explicit_bool: bool,
    patch_anchor: &str,
) {
    if is_enum {
        encode_varint(w, var, true);
        return;
    }
    match ty {
        FieldType::Int32 | FieldType::Int64 => encode_varint(w, var, true),
        FieldType::Uint32 | FieldType::Uint64 => encode_varint(w, var, false),
        FieldType::Sint32 | FieldType::Sint64 => encode_zigzag(w, var),
        FieldType::Bool => {
            if explicit_bool {
                w.push(format!("buff << ({} ? 1 : 0)", var));
            } else {
                w.push("buff << 1");
            }
        }
        FieldType::Fixed32 => encode_fixed(w, var, "L<"),
        FieldType::Sfixed32 => encode_fixed(w, var, "l<"),
        FieldType::Float => encode_fixed(w, var, "e"),
        FieldType::Fixed64 => encode_fixed(w, var, "Q<"),
        FieldType::Sfixed64 => encode_fixed(w, var, "q<"),
        FieldType::Double => encode_fixed(w, var, "E"),
        FieldType::String => {
            // ASCII strings share bytes with the source; anything else is
            // reinterpreted as its UTF-8 bytes.
            w.push(format!("{var} = {var}.b unless {var}.ascii_only?", var = var));
            w.push(format!("len = {}.bytesize", var));
            encode_varint(w, "len", false);
            w.push(format!("buff << {}", var));
        }
        FieldType::Bytes => {
            w.push(format!("len = {}.bytesize", var));
            encode_varint(w, "len", false);
            w.push(format!("buff << {}", var));
        }
        FieldType::Named(_) => {
            begin_length_patch(w, patch_anchor);
            w.push(format!("{}._encode(buff)", var));
            end_length_patch(w, patch_anchor);
        }
    }
}

fn encode_fixed(w: &mut SourceWriter, var: &str, directive: &str) {
    w.push(format!("buff << [{}].pack(\"{}\")", var, directive));
}

/// Emit the bounds guard integer mutators and the constructor share.
/// Out-of-range values raise `RangeError` before the field is touched.
pub fn bounds_check(w: &mut SourceWriter, var: &str, bounds: (&str, &str)) {
    let (min, max) = bounds;
    w.push(format!("unless {} <= {} && {} <= {}", min, var, var, max));
    w.indent();
    w.push(format!(
        "raise RangeError, \"Value must be between {} and {}\"",
        min, max
    ));
    w.dedent();
    w.push("end");
}

/// Byte width of one packed element for fixed-width wire types.
pub fn fixed_width(ty: &FieldType) -> Option<usize> {
    match ty {
        FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => Some(4),
        FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => Some(8),
        _ => None,
    }
}

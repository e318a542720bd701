//! Field classification.
//!
//! Emission is type-directed: every fragment choice (tag bytes, varint
//! signedness, default literal, bounds check) is a pure function of the
//! classified field, computed here once per message.

use crate::context::GenerationContext;
use crate::descriptor::{Cardinality, FieldDescriptor, FieldType, MapDescriptor, MessageDescriptor};
use crate::error::Error;
use crate::varint::uvarint_bytes;

/// The 3-bit wire type suffix of a field tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer: `int32`, `int64`, `uint32`, `uint64`,
    /// `sint32`, `sint64`, `bool`, enums.
    Varint = 0,
    /// 64-bit little-endian: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Length-delimited: `string`, `bytes`, messages, maps, packed
    /// repeated fields.
    Len = 2,
    /// 32-bit little-endian: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

impl WireType {
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

/// Generation-time variant of the emitted varint reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    /// Straight 64-bit assembly.
    Unsigned,
    /// Reinterpret the assembled bits as two's-complement, masked to 32
    /// bits before negation.
    Signed32,
    /// Reinterpret the assembled bits as two's-complement, 64-bit.
    Signed64,
}

/// Classified view of one plain field, ready for emission.
pub struct FieldPlan<'a> {
    pub field: &'a FieldDescriptor,
    /// Dense bit index in the presence bitmask, for optional fields.
    pub presence_bit: Option<u32>,
    /// Name of the enclosing oneof group, for members.
    pub oneof: Option<&'a str>,
    /// Set when the field's type name resolves to an enum visible at this
    /// scope.
    pub is_enum: bool,
    /// Ruby constant the emitted code references for `Named` types.
    pub class_ref: Option<String>,
    /// Wire type of this field's own tag. Packed repeated fields tag as
    /// `Len` regardless of element type.
    pub wire_type: WireType,
}

impl<'a> FieldPlan<'a> {
    pub fn build(
        ctx: &mut GenerationContext<'_>,
        message: &MessageDescriptor,
        field: &'a FieldDescriptor,
        presence_bit: Option<u32>,
        oneof: Option<&'a str>,
    ) -> Result<Self, Error> {
        let (is_enum, class_ref) = match &field.ty {
            FieldType::Named(name) => {
                if name.is_empty() {
                    return Err(Error::UnknownFieldType {
                        message: message.name.clone(),
                        field: field.name.clone(),
                        type_name: name.clone(),
                    });
                }
                let is_enum = ctx.is_visible_enum(message, name);
                (is_enum, Some(ctx.resolve_class_ref(name)))
            }
            _ => (false, None),
        };

        let element = element_wire_type(&field.ty, is_enum);
        let wire_type = if field.cardinality == Cardinality::Repeated
            && field.packed
            && element != WireType::Len
        {
            WireType::Len
        } else {
            element
        };

        Ok(Self {
            field,
            presence_bit,
            oneof,
            is_enum,
            class_ref,
            wire_type,
        })
    }

    /// The instance variable backing this field.
    pub fn ivar(&self) -> String {
        format!("@{}", self.field.name)
    }

    /// This field's tag value, `(number << 3) | wire_type`.
    pub fn tag_value(&self) -> u32 {
        tag_value(self.field.number, self.wire_type)
    }

    pub fn tag_bytes(&self) -> Vec<u8> {
        uvarint_bytes(u64::from(self.tag_value()))
    }

    /// Wire type of a single element, ignoring packing.
    pub fn element_wire(&self) -> WireType {
        element_wire_type(&self.field.ty, self.is_enum)
    }

    /// Tag for one element of an unpacked repeated field.
    pub fn element_tag_value(&self) -> u32 {
        tag_value(self.field.number, self.element_wire())
    }

    pub fn element_tag_bytes(&self) -> Vec<u8> {
        uvarint_bytes(u64::from(self.element_tag_value()))
    }

    /// Whether a repeated field of this type may use the packed encoding.
    pub fn packed_capable(&self) -> bool {
        self.element_wire() != WireType::Len
    }

    /// Tag of the packed representation (always length-delimited).
    pub fn packed_tag_value(&self) -> u32 {
        tag_value(self.field.number, WireType::Len)
    }

    pub fn packed_tag_bytes(&self) -> Vec<u8> {
        uvarint_bytes(u64::from(self.packed_tag_value()))
    }

    /// Bounds enforced by mutators and the constructor, as Ruby integer
    /// literals, for integer scalar types.
    pub fn bounds(&self) -> Option<(&'static str, &'static str)> {
        bounds(&self.field.ty)
    }

    /// Canonical proto3 default for one value of this field's type.
    pub fn default_literal(&self) -> &'static str {
        if self.is_enum {
            return "0";
        }
        match &self.field.ty {
            FieldType::Double | FieldType::Float => "0.0",
            FieldType::Bool => "false",
            FieldType::String => "\"\"",
            FieldType::Bytes => "\"\".b",
            FieldType::Named(_) => "nil",
            _ => "0",
        }
    }

    pub fn is_message(&self) -> bool {
        matches!(self.field.ty, FieldType::Named(_)) && !self.is_enum
    }

    /// The resolved Ruby constant for message/enum references.
    pub fn class_ref(&self) -> &str {
        self.class_ref.as_deref().unwrap_or_default()
    }

}

/// The varint reader variant for one value of `ty`. Enums and `int32` are
/// two's-complement 32-bit, `int64` 64-bit; everything else assembles
/// unsigned (zigzag types unfold separately after the read).
pub fn varint_sign(ty: &FieldType, is_enum: bool) -> Sign {
    if is_enum {
        return Sign::Signed32;
    }
    match ty {
        FieldType::Int32 => Sign::Signed32,
        FieldType::Int64 => Sign::Signed64,
        _ => Sign::Unsigned,
    }
}

/// Wire type of one value of `ty`, before packing is considered.
fn element_wire_type(ty: &FieldType, is_enum: bool) -> WireType {
    if is_enum {
        return WireType::Varint;
    }
    match ty {
        FieldType::Int32
        | FieldType::Int64
        | FieldType::Uint32
        | FieldType::Uint64
        | FieldType::Sint32
        | FieldType::Sint64
        | FieldType::Bool => WireType::Varint,
        FieldType::Fixed64 | FieldType::Sfixed64 | FieldType::Double => WireType::I64,
        FieldType::Fixed32 | FieldType::Sfixed32 | FieldType::Float => WireType::I32,
        FieldType::String | FieldType::Bytes | FieldType::Named(_) => WireType::Len,
    }
}

pub fn tag_value(number: u32, wire: WireType) -> u32 {
    (number << 3) | u32::from(wire.into_val())
}

/// Bounds for integer scalar mutators. Non-integer types have none.
fn bounds(ty: &FieldType) -> Option<(&'static str, &'static str)> {
    match ty {
        FieldType::Int32 | FieldType::Sint32 | FieldType::Sfixed32 => {
            Some(("-2147483648", "2147483647"))
        }
        FieldType::Uint32 | FieldType::Fixed32 => Some(("0", "4294967295")),
        FieldType::Int64 | FieldType::Sint64 | FieldType::Sfixed64 => {
            Some(("-9223372036854775808", "9223372036854775807"))
        }
        FieldType::Uint64 | FieldType::Fixed64 => Some(("0", "18446744073709551615")),
        _ => None,
    }
}

/// Classified view of a map field: the outer record plus its synthesized
/// key/value entry fields.
pub struct MapPlan<'a> {
    pub map: &'a MapDescriptor,
    pub key: FieldPlan<'a>,
    pub value: FieldPlan<'a>,
}

impl<'a> MapPlan<'a> {
    pub fn build(
        ctx: &mut GenerationContext<'_>,
        message: &MessageDescriptor,
        map: &'a MapDescriptor,
    ) -> Result<Self, Error> {
        if !valid_map_key(&map.key.ty) {
            return Err(Error::InvalidMapKey {
                message: message.name.clone(),
                field: map.name.clone(),
                key_type: format!("{:?}", map.key.ty),
            });
        }
        let key = FieldPlan::build(ctx, message, &map.key, None, None)?;
        let value = FieldPlan::build(ctx, message, &map.value, None, None)?;
        Ok(Self { map, key, value })
    }

    pub fn ivar(&self) -> String {
        format!("@{}", self.map.name)
    }

    /// The outer record tag: always length-delimited.
    pub fn tag_value(&self) -> u32 {
        tag_value(self.map.number, WireType::Len)
    }

    pub fn tag_bytes(&self) -> Vec<u8> {
        uvarint_bytes(u64::from(self.tag_value()))
    }
}

/// Proto3 map keys are restricted to integral types, bool, and string.
fn valid_map_key(ty: &FieldType) -> bool {
    matches!(
        ty,
        FieldType::Int32
            | FieldType::Int64
            | FieldType::Uint32
            | FieldType::Uint64
            | FieldType::Sint32
            | FieldType::Sint64
            | FieldType::Fixed32
            | FieldType::Fixed64
            | FieldType::Sfixed32
            | FieldType::Sfixed64
            | FieldType::Bool
            | FieldType::String
    )
}

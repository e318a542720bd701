//! Descriptor types for parsed proto3 schemas.
//!
//! These mirror the shape a `.proto` parser produces. The generator treats
//! them as immutable input; everything derived (wire types, presence bits,
//! enum classification) lives in per-message plans built during emission.

/// A parsed `.proto` file: one unit of generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileDescriptor {
    /// The dot-separated proto package, e.g. `"foo.bar"`. May be empty.
    pub package: String,
    /// Explicit Ruby namespace override, e.g. `"Foo::Bar"`. When set it is
    /// used verbatim instead of the capitalized package components.
    pub ruby_namespace: Option<String>,
    /// Top-level enum definitions, in declaration order.
    pub enums: Vec<EnumDescriptor>,
    /// Top-level message definitions, in declaration order.
    pub messages: Vec<MessageDescriptor>,
}

/// An enum definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: Vec<EnumValue>,
}

/// A single named constant of an enum.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

/// A message definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageDescriptor {
    pub name: String,
    pub enums: Vec<EnumDescriptor>,
    pub messages: Vec<MessageDescriptor>,
    /// Field entries in declaration order.
    pub fields: Vec<MessageField>,
}

/// One entry in a message's field list.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageField {
    Single(FieldDescriptor),
    Oneof(OneofDescriptor),
    Map(MapDescriptor),
}

/// A plain (non-oneof, non-map) field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    /// The field number, 1..=2^29-1.
    pub number: u32,
    pub ty: FieldType,
    pub cardinality: Cardinality,
    /// The `[packed = ...]` option. Only meaningful for repeated scalars.
    pub packed: bool,
}

impl FieldDescriptor {
    /// A plain singular field.
    pub fn required(name: impl Into<String>, number: u32, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            number,
            ty,
            cardinality: Cardinality::Required,
            packed: false,
        }
    }

    /// A field declared with the proto3 `optional` keyword.
    pub fn optional(name: impl Into<String>, number: u32, ty: FieldType) -> Self {
        Self {
            cardinality: Cardinality::Optional,
            ..Self::required(name, number, ty)
        }
    }

    /// A repeated field. `packed` selects the packed encoding for scalar
    /// element types.
    pub fn repeated(name: impl Into<String>, number: u32, ty: FieldType, packed: bool) -> Self {
        Self {
            cardinality: Cardinality::Repeated,
            packed,
            ..Self::required(name, number, ty)
        }
    }
}

/// How many values a field holds. Proto3 plain fields are `Required` in
/// the sense that they always hold a value (the type's default when never
/// assigned); `Optional` corresponds to the explicit `optional` keyword
/// and gets a presence bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Required,
    Optional,
    Repeated,
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Double,
    Float,
    Int64,
    Uint64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    Uint32,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
    /// A reference to a message or enum by name, e.g. `"Person"`,
    /// `"Outer.Inner"`, or `"google.protobuf.Timestamp"`. Whether it names
    /// an enum is resolved against the visible scope during generation.
    Named(String),
}

impl FieldType {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// True for every type except message/enum references.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Named(_))
    }
}

/// A `oneof` group. Members carry their own numbers; the group itself has
/// none.
#[derive(Debug, Clone, PartialEq)]
pub struct OneofDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

/// A map field, carrying the synthesized key/value entry fields the wire
/// format uses (numbers 1 and 2).
#[derive(Debug, Clone, PartialEq)]
pub struct MapDescriptor {
    pub name: String,
    pub number: u32,
    pub key: FieldDescriptor,
    pub value: FieldDescriptor,
}

impl MapDescriptor {
    pub fn new(name: impl Into<String>, number: u32, key: FieldType, value: FieldType) -> Self {
        Self {
            name: name.into(),
            number,
            key: FieldDescriptor::required("key", 1, key),
            value: FieldDescriptor::required("value", 2, value),
        }
    }
}

//! Generation context: type resolution, naming, and presence-bit
//! assignment.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::codegen::wellknown;
use crate::config::Config;
use crate::descriptor::{Cardinality, FileDescriptor, MessageDescriptor, MessageField};
use crate::error::Error;

/// Context threaded through code generation for one file.
pub struct GenerationContext<'a> {
    /// The configuration.
    pub config: &'a Config,
    /// Names of the file's top-level enums, for classifying `Named` field
    /// types that are not nested in the enclosing message.
    file_enums: HashSet<&'a str>,
    /// `require` paths the emitted file must declare, collected as fields
    /// reference well-known types.
    requires: BTreeSet<String>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(config: &'a Config, file: &'a FileDescriptor) -> Self {
        let file_enums = file.enums.iter().map(|e| e.name.as_str()).collect();
        Self {
            config,
            file_enums,
            requires: BTreeSet::new(),
        }
    }

    /// Whether `type_name` names an enum visible from inside `message`:
    /// either a nested enum of the message or a top-level enum of the file.
    pub fn is_visible_enum(&self, message: &MessageDescriptor, type_name: &str) -> bool {
        message.enums.iter().any(|e| e.name == type_name)
            || self.file_enums.contains(type_name)
    }

    /// Resolve a field's type reference to the Ruby constant emitted at the
    /// call site. Well-known types are rewritten to their runtime wrapper
    /// and the require recorded; everything else resolves lazily by
    /// constant path.
    pub fn resolve_class_ref(&mut self, type_name: &str) -> String {
        let trimmed = type_name.trim_start_matches('.');
        if let Some(wrapper) = wellknown::resolve(trimmed) {
            self.requires.insert(self.config.runtime_require.clone());
            return format!("{}::{}", self.config.runtime_module, wrapper);
        }
        trimmed.split('.').collect::<Vec<_>>().join("::")
    }

    /// The `require` paths recorded so far, sorted and deduplicated.
    pub fn requires(&self) -> impl Iterator<Item = &str> {
        self.requires.iter().map(String::as_str)
    }
}

/// Assign a dense bit index to every optional field of `message`, keyed by
/// field number, walking fields in declaration order.
///
/// The emitted presence bitmask is a single integer, so a message may
/// declare at most 62 optional fields.
pub fn assign_presence_bits(message: &MessageDescriptor) -> Result<BTreeMap<u32, u32>, Error> {
    let mut bits = BTreeMap::new();
    let mut next = 0u32;
    for field in &message.fields {
        if let MessageField::Single(f) = field {
            if f.cardinality == Cardinality::Optional {
                bits.insert(f.number, next);
                next += 1;
            }
        }
    }
    if next >= 63 {
        return Err(Error::OptionalFieldCapacity {
            message: message.name.clone(),
            count: next as usize,
        });
    }
    Ok(bits)
}

/// The Ruby module components the file's contents nest under.
///
/// An explicit namespace override is split on `::` and used verbatim;
/// otherwise each dot-separated package component is capitalized the way
/// Ruby's `String#capitalize` would.
pub fn namespace_components(file: &FileDescriptor) -> Vec<String> {
    if let Some(ns) = &file.ruby_namespace {
        return ns.split("::").map(str::to_string).collect();
    }
    if file.package.is_empty() {
        return Vec::new();
    }
    file.package.split('.').map(ruby_capitalize).collect()
}

/// Mirror Ruby's `String#capitalize`: first character upcased, the rest
/// downcased.
pub fn ruby_capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::descriptor::{FieldDescriptor, FieldType, OneofDescriptor};

    use super::*;

    #[test]
    fn test_ruby_capitalize() {
        assert_eq!(ruby_capitalize("foo"), "Foo");
        assert_eq!(ruby_capitalize("fooBar"), "Foobar");
        assert_eq!(ruby_capitalize("FOO"), "Foo");
        assert_eq!(ruby_capitalize(""), "");
        assert_eq!(ruby_capitalize("f"), "F");
    }

    #[test]
    fn test_namespace_from_package() {
        let file = FileDescriptor {
            package: "foo.bar_baz".to_string(),
            ..Default::default()
        };
        assert_eq!(namespace_components(&file), vec!["Foo", "Bar_baz"]);
    }

    #[test]
    fn test_namespace_override_wins() {
        let file = FileDescriptor {
            package: "foo.bar".to_string(),
            ruby_namespace: Some("My::Protos".to_string()),
            ..Default::default()
        };
        assert_eq!(namespace_components(&file), vec!["My", "Protos"]);
    }

    #[test]
    fn test_empty_package_has_no_namespace() {
        let file = FileDescriptor::default();
        assert!(namespace_components(&file).is_empty());
    }

    #[test]
    fn test_presence_bits_skip_non_optional() {
        let message = MessageDescriptor {
            name: "M".to_string(),
            fields: vec![
                MessageField::Single(FieldDescriptor::required("a", 1, FieldType::Int32)),
                MessageField::Single(FieldDescriptor::optional("b", 2, FieldType::String)),
                MessageField::Single(FieldDescriptor::repeated("c", 3, FieldType::Int32, true)),
                MessageField::Single(FieldDescriptor::optional("d", 9, FieldType::Bool)),
                MessageField::Oneof(OneofDescriptor {
                    name: "o".to_string(),
                    fields: vec![FieldDescriptor::required("e", 4, FieldType::Int32)],
                }),
            ],
            ..Default::default()
        };
        let bits = assign_presence_bits(&message).unwrap();
        assert_eq!(bits.len(), 2);
        assert_eq!(bits[&2], 0);
        assert_eq!(bits[&9], 1);
    }

    #[test]
    fn test_presence_bit_capacity() {
        let fields = (1..=63)
            .map(|n| {
                MessageField::Single(FieldDescriptor::optional(
                    format!("f{}", n),
                    n,
                    FieldType::Int32,
                ))
            })
            .collect();
        let message = MessageDescriptor {
            name: "Wide".to_string(),
            fields,
            ..Default::default()
        };
        assert!(matches!(
            assign_presence_bits(&message),
            Err(Error::OptionalFieldCapacity { count: 63, .. })
        ));
    }

    proptest! {
        /// Bit indices are dense: 0..n in declaration order, regardless of
        /// which numbers the optional fields carry.
        #[test]
        fn proptest_presence_bits_are_dense(numbers in proptest::collection::btree_set(1u32..1000, 0..62)) {
            let fields = numbers
                .iter()
                .map(|n| {
                    MessageField::Single(FieldDescriptor::optional(
                        format!("f{}", n),
                        *n,
                        FieldType::Int32,
                    ))
                })
                .collect();
            let message = MessageDescriptor {
                name: "M".to_string(),
                fields,
                ..Default::default()
            };
            let bits = assign_presence_bits(&message).unwrap();
            prop_assert_eq!(bits.len(), numbers.len());
            let mut seen: Vec<u32> = bits.values().copied().collect();
            seen.sort_unstable();
            let expect: Vec<u32> = (0..numbers.len() as u32).collect();
            prop_assert_eq!(seen, expect);
        }
    }
}

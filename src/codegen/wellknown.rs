//! Well-known-type resolution.
//!
//! Generated code never re-emits `google.protobuf` wrapper messages;
//! references to them resolve to the pre-written runtime classes instead.

/// Fully qualified proto names of the supported well-known types, paired
/// with the runtime wrapper class each resolves to.
const WELL_KNOWN: &[(&str, &str)] = &[
    ("google.protobuf.BoolValue", "BoolValue"),
    ("google.protobuf.Int32Value", "Int32Value"),
    ("google.protobuf.Int64Value", "Int64Value"),
    ("google.protobuf.UInt32Value", "UInt32Value"),
    ("google.protobuf.UInt64Value", "UInt64Value"),
    ("google.protobuf.FloatValue", "FloatValue"),
    ("google.protobuf.DoubleValue", "DoubleValue"),
    ("google.protobuf.StringValue", "StringValue"),
    ("google.protobuf.BytesValue", "BytesValue"),
    ("google.protobuf.Timestamp", "Timestamp"),
];

/// Resolve a fully qualified type name to its runtime wrapper class name,
/// or `None` when the name is not a supported well-known type.
pub fn resolve(type_name: &str) -> Option<&'static str> {
    WELL_KNOWN
        .iter()
        .find(|(proto, _)| *proto == type_name)
        .map(|(_, wrapper)| *wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_wrappers() {
        assert_eq!(resolve("google.protobuf.BoolValue"), Some("BoolValue"));
        assert_eq!(resolve("google.protobuf.Timestamp"), Some("Timestamp"));
    }

    #[test]
    fn test_rejects_other_names() {
        assert_eq!(resolve("google.protobuf.Any"), None);
        assert_eq!(resolve("Person"), None);
        assert_eq!(resolve("my.pkg.BoolValue"), None);
    }
}

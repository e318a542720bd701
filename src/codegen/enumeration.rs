//! Enum code generation.
//!
//! A proto enum becomes a Ruby module of integer constants plus two total
//! functions: `lookup` maps a number to the matching symbol and `resolve`
//! maps a symbol back to its number. Both return `nil` for unknown inputs;
//! callers decide the fallback.

use crate::descriptor::EnumDescriptor;
use crate::error::Error;
use crate::writer::SourceWriter;

pub fn generate_enum(w: &mut SourceWriter, enumeration: &EnumDescriptor) -> Result<(), Error> {
    if enumeration.values.is_empty() {
        return Err(Error::EmptyEnum {
            name: enumeration.name.clone(),
        });
    }

    w.push(format!("module {}", enumeration.name));
    w.indent();

    for value in &enumeration.values {
        w.push(format!("{} = {}", value.name, value.number));
    }

    w.blank();
    w.push("def self.lookup(val)");
    w.indent();
    for (i, value) in enumeration.values.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "elsif" };
        w.push(format!("{} val == {}", keyword, value.number));
        w.indent();
        w.push(format!(":{}", value.name));
        w.dedent();
    }
    w.push("end");
    w.dedent();
    w.push("end");

    w.blank();
    w.push("def self.resolve(val)");
    w.indent();
    for (i, value) in enumeration.values.iter().enumerate() {
        let keyword = if i == 0 { "if" } else { "elsif" };
        w.push(format!("{} val == :{}", keyword, value.name));
        w.indent();
        w.push(format!("{}", value.number));
        w.dedent();
    }
    w.push("end");
    w.dedent();
    w.push("end");

    w.dedent();
    w.push("end");
    Ok(())
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::descriptor::EnumValue;

    use super::*;

    fn value(name: &str, number: i32) -> EnumValue {
        EnumValue {
            name: name.to_string(),
            number,
        }
    }

    #[test]
    fn test_generate_enum() {
        let enumeration = EnumDescriptor {
            name: "PhoneType".to_string(),
            values: vec![value("MOBILE", 0), value("HOME", 1), value("WORK", 2)],
        };
        let mut w = SourceWriter::new();
        generate_enum(&mut w, &enumeration).unwrap();
        let expected = indoc! {r#"
            module PhoneType
              MOBILE = 0
              HOME = 1
              WORK = 2

              def self.lookup(val)
                if val == 0
                  :MOBILE
                elsif val == 1
                  :HOME
                elsif val == 2
                  :WORK
                end
              end

              def self.resolve(val)
                if val == :MOBILE
                  0
                elsif val == :HOME
                  1
                elsif val == :WORK
                  2
                end
              end
            end
        "#};
        assert_eq!(w.finish(), expected);
    }

    #[test]
    fn test_empty_enum_is_rejected() {
        let enumeration = EnumDescriptor {
            name: "Nothing".to_string(),
            values: Vec::new(),
        };
        let mut w = SourceWriter::new();
        assert!(matches!(
            generate_enum(&mut w, &enumeration),
            Err(Error::EmptyEnum { .. })
        ));
    }

    #[test]
    fn test_negative_numbers_are_preserved() {
        let enumeration = EnumDescriptor {
            name: "Signed".to_string(),
            values: vec![value("ZERO", 0), value("MINUS", -1)],
        };
        let mut w = SourceWriter::new();
        generate_enum(&mut w, &enumeration).unwrap();
        let out = w.finish();
        assert!(out.contains("MINUS = -1"));
        assert!(out.contains("elsif val == -1"));
    }
}

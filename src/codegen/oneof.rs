//! Oneof code generation.
//!
//! A oneof group is stored as one discriminator instance variable (a
//! symbol naming the active member, or `nil`) plus one slot per member.
//! Mutators set discriminator and value together; the encoder dispatches
//! on the discriminator alone.

use crate::writer::SourceWriter;

use super::field::FieldPlan;
use super::fragments;

/// Emit the member mutators for one oneof group. Each member plan carries
/// the enclosing group's name, recorded at classification time.
pub fn generate_oneof_writers(w: &mut SourceWriter, members: &[FieldPlan<'_>]) {
    for member in members {
        w.blank();
        w.push(format!("def {}=(v)", member.field.name));
        w.indent();
        if let Some(bounds) = member.bounds() {
            fragments::bounds_check(w, "v", bounds);
        }
        if let Some(group) = member.oneof {
            w.push(format!("@{} = :{}", group, member.field.name));
        }
        if member.is_enum {
            w.push(format!(
                "{} = {}.resolve(v) || v",
                member.ivar(),
                member.class_ref()
            ));
        } else {
            w.push(format!("{} = v", member.ivar()));
        }
        w.dedent();
        w.push("end");
    }
}

/// Emit the constructor section for one oneof group. Members are assigned
/// in declaration order, so when the caller passes several the last one
/// wins the discriminator.
pub fn generate_oneof_constructor(w: &mut SourceWriter, group: &str, members: &[FieldPlan<'_>]) {
    w.push(format!("@{} = nil", group));
    for member in members {
        let name = &member.field.name;
        w.push(format!("if {}.nil?", name));
        w.indent();
        w.push(format!("{} = nil", member.ivar()));
        w.dedent();
        w.push("else");
        w.indent();
        if let Some(bounds) = member.bounds() {
            fragments::bounds_check(w, name, bounds);
        }
        w.push(format!("@{} = :{}", group, name));
        if member.is_enum {
            w.push(format!(
                "{} = {}.resolve({}) || {}",
                member.ivar(),
                member.class_ref(),
                name,
                name
            ));
        } else {
            w.push(format!("{} = {}", member.ivar(), name));
        }
        w.dedent();
        w.push("end");
    }
}

/// Emit the `_encode` dispatch for one oneof group: exactly the active
/// member is written, with no default-value gate.
pub fn generate_oneof_encode(w: &mut SourceWriter, group: &str, members: &[FieldPlan<'_>]) {
    w.push(format!("case @{}", group));
    for member in members {
        w.push(format!("when :{}", member.field.name));
        w.indent();
        w.push(format!("val = {}", member.ivar()));
        fragments::encode_tag(w, &member.tag_bytes());
        fragments::encode_value(
            w,
            &member.field.ty,
            member.is_enum,
            "val",
            true,
            "offset",
        );
        w.dedent();
    }
    w.push("end");
}

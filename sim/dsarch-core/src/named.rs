use std::fmt::Display;

/// Entities with a human-readable name for reports.
///
/// An entity without an explicit name reports a synthesized
/// `<TypeName@identity>` name instead.
pub trait Named {
    fn name(&self) -> String;
}

pub(crate) fn display_name(name: &str, type_name: &str, identity: impl Display) -> String {
    if name.is_empty() {
        format!("<{type_name}@{identity}>")
    } else {
        name.to_string()
    }
}

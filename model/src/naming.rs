// Dot-qualified names for schema elements.
//
// A long name is the element name prefixed by its enclosing messages,
// e.g. "Outer.Inner.Leaf". A full name additionally carries the package.

/// One link in the chain of messages enclosing an element.
#[derive(Debug, Clone, Copy)]
pub struct Enclosing<'a> {
    pub name: &'a str,
    pub parent: Option<&'a Enclosing<'a>>,
}

impl<'a> Enclosing<'a> {
    pub fn within(name: &'a str, parent: Option<&'a Enclosing<'a>>) -> Self {
        Self { name, parent }
    }
}

/// Long name of an element; the empty string for no element at all.
pub fn long_name(element: Option<&Enclosing<'_>>) -> String {
    let Some(element) = element else {
        return String::new();
    };
    match element.parent {
        None => element.name.to_string(),
        Some(parent) => format!("{}.{}", long_name(Some(parent)), element.name),
    }
}

/// Long name of a field: `long_name(scope) + "." + name`. For extensions the
/// scope is the message that declares them, not the one they extend, so a
/// file-level extension comes out as ".name".
pub fn field_long_name(name: &str, scope: Option<&Enclosing<'_>>) -> String {
    format!("{}.{name}", long_name(scope))
}

pub fn full_name(package: &str, long_name: &str) -> String {
    qualify(package, long_name)
}

fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{name}", prefix)
    }
}

use std::collections::HashMap;

use prost_types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto};

use crate::model::TypeNames;
use crate::naming::{Enclosing, full_name, long_name};

/// A message or enum declared somewhere in the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub names: TypeNames,
    pub kind: SymbolKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Message,
    Enum { values: Vec<String> },
}

/// Every message and enum of every file handed over by the compiler, keyed by
/// fully-qualified name (without the leading dot).
///
/// Field and method types refer to other types as `.pkg.Outer.Inner`; the
/// package boundary cannot be recovered from that string alone, so names are
/// resolved here instead.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    symbols: HashMap<String, Symbol>,
}

impl SymbolIndex {
    pub fn from_files<'a>(files: impl IntoIterator<Item = &'a FileDescriptorProto>) -> Self {
        let mut index = Self::default();
        for file in files {
            index.add_file(file);
        }
        index
    }

    pub fn add_file(&mut self, file: &FileDescriptorProto) {
        let package = file.package();
        for message in &file.message_type {
            self.add_message(package, message, None);
        }
        for en in &file.enum_type {
            self.add_enum(package, en, None);
        }
    }

    fn add_message(
        &mut self,
        package: &str,
        message: &DescriptorProto,
        parent: Option<&Enclosing<'_>>,
    ) {
        let here = Enclosing::within(message.name(), parent);
        self.insert(package, &here, SymbolKind::Message);
        for nested in &message.nested_type {
            self.add_message(package, nested, Some(&here));
        }
        for en in &message.enum_type {
            self.add_enum(package, en, Some(&here));
        }
    }

    fn add_enum(
        &mut self,
        package: &str,
        en: &EnumDescriptorProto,
        parent: Option<&Enclosing<'_>>,
    ) {
        let here = Enclosing::within(en.name(), parent);
        let values = en.value.iter().map(|v| v.name().to_string()).collect();
        self.insert(package, &here, SymbolKind::Enum { values });
    }

    fn insert(&mut self, package: &str, element: &Enclosing<'_>, kind: SymbolKind) {
        let long = long_name(Some(element));
        let full = full_name(package, &long);
        let names = TypeNames {
            name: element.name.to_string(),
            long_name: long,
            full_name: full.clone(),
        };
        self.symbols.insert(full, Symbol { names, kind });
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Looks up a type reference; a leading dot is accepted.
    pub fn lookup(&self, reference: &str) -> Option<&Symbol> {
        self.symbols.get(reference.trim_start_matches('.'))
    }

    /// Names for a type reference. References the compiler did not hand us
    /// fall back to the reference itself.
    pub fn type_names(&self, reference: &str) -> TypeNames {
        if let Some(symbol) = self.lookup(reference) {
            return symbol.names.clone();
        }
        tracing::warn!(reference, "type reference not found in request");
        let full = reference.trim_start_matches('.');
        let name = full.rsplit('.').next().unwrap_or(full);
        TypeNames {
            name: name.to_string(),
            long_name: name.to_string(),
            full_name: full.to_string(),
        }
    }

    /// The constant name when `reference` is an enum declaring `value`.
    pub fn enum_value<'s>(&'s self, reference: &str, value: &str) -> Option<&'s str> {
        match &self.lookup(reference)?.kind {
            SymbolKind::Enum { values } => values
                .iter()
                .find(|v| v.as_str() == value)
                .map(String::as_str),
            SymbolKind::Message => None,
        }
    }
}

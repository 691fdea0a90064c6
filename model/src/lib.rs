mod comments;
mod index;
mod model;
pub mod naming;
mod types;

use std::fs;
use std::path::{Path, PathBuf};

use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    ServiceDescriptorProto,
};

pub use comments::{Comment, EXCLUDE_MARKER, Rule, SourceLocations, scan_header};
pub use index::{Symbol, SymbolIndex, SymbolKind};
pub use model::*;
pub use types::{UNKNOWN_DEFAULT, UNKNOWN_TYPE};

use comments::path;
use naming::{Enclosing, field_long_name, full_name, long_name};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{file}: cannot scan file comment: {source}")]
    Header {
        file: String,
        source: Box<pest::error::Error<Rule>>,
    },
}

/// Settings shared by every file of a run.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Directory that descriptor file names are relative to.
    pub source_root: PathBuf,
    /// Keep elements marked with the exclusion marker.
    pub no_exclude: bool,
}

/// Builds the document record for one file.
///
/// Returns `Ok(None)` when the file comment carries the exclusion marker.
/// The source file is read from `options.source_root` to recover the
/// file-level comment, which has no source location of its own.
pub fn build_file(
    file: &FileDescriptorProto,
    index: &SymbolIndex,
    options: &BuildOptions,
) -> Result<Option<FileRecord>, BuildError> {
    let header = read_file_comment(&options.source_root, file.name())?;
    let comment = Comment::from_text(&header, options.no_exclude);
    if comment.excluded {
        tracing::debug!(file = file.name(), "file excluded");
        return Ok(None);
    }

    let mut builder = FileBuilder {
        index,
        no_exclude: options.no_exclude,
        locations: SourceLocations::new(file),
        package: file.package(),
        messages: Vec::new(),
        enums: Vec::new(),
    };

    for (i, message) in file.message_type.iter().enumerate() {
        builder.add_message(message, &path::child(&[], path::FILE_MESSAGE, i), None);
    }
    for (i, en) in file.enum_type.iter().enumerate() {
        builder.add_enum(en, &path::child(&[], path::FILE_ENUM, i), None);
    }
    let mut services: Vec<ServiceRecord> = file
        .service
        .iter()
        .enumerate()
        .filter_map(|(i, service)| {
            builder.service(service, &path::child(&[], path::FILE_SERVICE, i))
        })
        .collect();
    let mut extensions: Vec<ExtensionRecord> = file
        .extension
        .iter()
        .enumerate()
        .filter_map(|(i, ext)| {
            builder.extension(ext, &path::child(&[], path::FILE_EXTENSION, i), None)
        })
        .collect();

    let FileBuilder {
        mut messages,
        mut enums,
        ..
    } = builder;
    messages.sort_by(|a, b| a.long_name.cmp(&b.long_name));
    enums.sort_by(|a, b| a.long_name.cmp(&b.long_name));
    services.sort_by(|a, b| a.name.cmp(&b.name));
    extensions.sort_by(|a, b| a.long_name.cmp(&b.long_name));

    tracing::debug!(
        file = file.name(),
        messages = messages.len(),
        enums = enums.len(),
        services = services.len(),
        extensions = extensions.len(),
        "built file record"
    );

    Ok(Some(FileRecord {
        name: base_name(file.name()),
        description: comment.description,
        package: file.package().to_string(),
        messages,
        enums,
        has_services: !services.is_empty(),
        services,
        has_extensions: !extensions.is_empty(),
        extensions,
    }))
}

fn read_file_comment(root: &Path, name: &str) -> Result<String, BuildError> {
    let path = root.join(name);
    let source = fs::read_to_string(&path).map_err(|source| BuildError::Io {
        path: path.clone(),
        source,
    })?;
    let text = source.strip_prefix('\u{feff}').unwrap_or(&source);
    scan_header(text).map_err(|source| BuildError::Header {
        file: name.to_string(),
        source,
    })
}

fn base_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

struct FileBuilder<'a> {
    index: &'a SymbolIndex,
    no_exclude: bool,
    locations: SourceLocations<'a>,
    package: &'a str,
    messages: Vec<MessageRecord>,
    enums: Vec<EnumRecord>,
}

impl FileBuilder<'_> {
    fn comment(&self, path: &[i32]) -> Comment {
        Comment::from_location(self.locations.get(path), self.no_exclude)
    }

    fn scoped_names(&self, element: &Enclosing<'_>) -> TypeNames {
        let long = long_name(Some(element));
        TypeNames {
            name: element.name.to_string(),
            full_name: full_name(self.package, &long),
            long_name: long,
        }
    }

    // Pushes the message, then everything nested in it, into the flat file
    // lists. An excluded message takes its nested types with it.
    fn add_message(
        &mut self,
        message: &DescriptorProto,
        at: &[i32],
        parent: Option<&Enclosing<'_>>,
    ) {
        let comment = self.comment(at);
        if comment.excluded {
            tracing::debug!(message = message.name(), "message excluded");
            return;
        }
        let here = Enclosing::within(message.name(), parent);
        let names = self.scoped_names(&here);

        let fields: Vec<FieldRecord> = message
            .field
            .iter()
            .enumerate()
            .filter_map(|(i, field)| {
                self.field(field, &path::child(at, path::MESSAGE_FIELD, i))
            })
            .collect();
        let extensions: Vec<ExtensionRecord> = message
            .extension
            .iter()
            .enumerate()
            .filter_map(|(i, ext)| {
                self.extension(ext, &path::child(at, path::MESSAGE_EXTENSION, i), Some(&here))
            })
            .collect();

        self.messages.push(MessageRecord {
            name: names.name,
            long_name: names.long_name,
            full_name: names.full_name,
            description: comment.description,
            has_fields: !fields.is_empty(),
            fields,
            has_extensions: !extensions.is_empty(),
            extensions,
        });

        for (i, nested) in message.nested_type.iter().enumerate() {
            self.add_message(nested, &path::child(at, path::MESSAGE_NESTED, i), Some(&here));
        }
        for (i, en) in message.enum_type.iter().enumerate() {
            self.add_enum(en, &path::child(at, path::MESSAGE_ENUM, i), Some(&here));
        }
    }

    fn field(&self, field: &FieldDescriptorProto, at: &[i32]) -> Option<FieldRecord> {
        let comment = self.comment(at);
        if comment.excluded {
            return None;
        }
        let ty = types::field_type(field, self.index);
        Some(FieldRecord {
            name: field.name().to_string(),
            description: comment.description,
            label: types::label_name(field.label).to_string(),
            number: field.number(),
            ty: ty.name,
            long_type: ty.long_name,
            full_type: ty.full_name,
            default_value: types::default_value(field, self.index),
        })
    }

    fn extension(
        &self,
        field: &FieldDescriptorProto,
        at: &[i32],
        scope: Option<&Enclosing<'_>>,
    ) -> Option<ExtensionRecord> {
        let comment = self.comment(at);
        if comment.excluded {
            return None;
        }
        let long = field_long_name(field.name(), scope);
        let ty = types::field_type(field, self.index);
        let mut record = ExtensionRecord {
            name: field.name().to_string(),
            full_name: full_name(self.package, long.trim_start_matches('.')),
            long_name: long,
            description: comment.description,
            label: types::label_name(field.label).to_string(),
            number: field.number(),
            ty: ty.name,
            long_type: ty.long_name,
            full_type: ty.full_name,
            default_value: types::default_value(field, self.index),
            ..Default::default()
        };
        if let Some(scope) = scope {
            record.set_scope(self.scoped_names(scope));
        }
        if !field.extendee().is_empty() {
            record.set_containing(self.index.type_names(field.extendee()));
        }
        Some(record)
    }

    fn add_enum(&mut self, en: &EnumDescriptorProto, at: &[i32], parent: Option<&Enclosing<'_>>) {
        let comment = self.comment(at);
        if comment.excluded {
            return;
        }
        let here = Enclosing::within(en.name(), parent);
        let names = self.scoped_names(&here);

        let values = en
            .value
            .iter()
            .enumerate()
            .filter_map(|(i, value)| {
                let comment = self.comment(&path::child(at, path::ENUM_VALUE, i));
                (!comment.excluded).then(|| EnumValueRecord {
                    name: value.name().to_string(),
                    number: value.number(),
                    description: comment.description,
                })
            })
            .collect();

        self.enums.push(EnumRecord {
            name: names.name,
            long_name: names.long_name,
            full_name: names.full_name,
            description: comment.description,
            values,
        });
    }

    fn service(&self, service: &ServiceDescriptorProto, at: &[i32]) -> Option<ServiceRecord> {
        let comment = self.comment(at);
        if comment.excluded {
            return None;
        }

        let methods = service
            .method
            .iter()
            .enumerate()
            .filter_map(|(i, method)| {
                let comment = self.comment(&path::child(at, path::SERVICE_METHOD, i));
                if comment.excluded {
                    return None;
                }
                let request = self.index.type_names(method.input_type());
                let response = self.index.type_names(method.output_type());
                Some(MethodRecord {
                    name: method.name().to_string(),
                    description: comment.description,
                    request_type: request.name,
                    request_long_type: request.long_name,
                    request_full_type: request.full_name,
                    response_type: response.name,
                    response_long_type: response.long_name,
                    response_full_type: response.full_name,
                    client_streaming: method.client_streaming(),
                    server_streaming: method.server_streaming(),
                })
            })
            .collect();

        Some(ServiceRecord {
            name: service.name().to_string(),
            full_name: full_name(self.package, service.name()),
            description: comment.description,
            methods,
        })
    }
}

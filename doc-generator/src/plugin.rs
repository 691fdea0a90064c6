use std::path::Path;

use prost_types::compiler::code_generator_response::{Feature, File};
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};
use protodoc_model::SymbolIndex;

use crate::driver::{DocGenerator, GenerateError, OutputFile};

/// Runs the driver over every file protoc asked for.
///
/// `source_root` is where the `.proto` files named in the request can be read
/// from; protoc runs plugins in its own working directory, so the empty path
/// is the usual value.
pub fn run(request: &CodeGeneratorRequest, source_root: &Path) -> Result<OutputFile, GenerateError> {
    let index = SymbolIndex::from_files(&request.proto_file);
    tracing::debug!(
        symbols = index.len(),
        files = request.file_to_generate.len(),
        "indexed request"
    );

    let mut generator = DocGenerator::new(source_root);
    let mut output = None;
    for name in &request.file_to_generate {
        let file = request
            .proto_file
            .iter()
            .find(|file| file.name() == name)
            .ok_or_else(|| GenerateError::MissingDescriptor(name.clone()))?;
        output = generator.generate(file, request.parameter(), &request.file_to_generate, &index)?;
    }
    output.ok_or(GenerateError::NoFiles)
}

/// Turns a request into the response protoc expects: one file on success,
/// only an error message otherwise.
pub fn generate_response(request: &CodeGeneratorRequest, source_root: &Path) -> CodeGeneratorResponse {
    match run(request, source_root) {
        Ok(output) => CodeGeneratorResponse {
            file: vec![File {
                name: Some(output.name),
                content: Some(output.content),
                ..Default::default()
            }],
            supported_features: Some(Feature::Proto3Optional as u64),
            ..Default::default()
        },
        Err(err) => {
            tracing::error!(error = %err, "generation failed");
            CodeGeneratorResponse {
                error: Some(err.to_string()),
                ..Default::default()
            }
        }
    }
}

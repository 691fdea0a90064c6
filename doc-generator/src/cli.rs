use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use prost::Message;
use prost_types::FileDescriptorSet;
use prost_types::compiler::{CodeGeneratorRequest, CodeGeneratorResponse};

use crate::plugin::generate_response;

/// Documentation generator for Protocol Buffers.
///
/// Without arguments it runs as a protoc plugin, reading a
/// `CodeGeneratorRequest` from stdin and writing the response to stdout.
#[derive(Debug, Default, Parser)]
#[command(name = "protoc-gen-doc", version, about)]
pub struct Arguments {
    /// Serialized FileDescriptorSet to document instead of reading a plugin
    /// request (build it with `protoc --include_source_info --descriptor_set_out`).
    #[arg(long, value_name = "FILE", requires = "param")]
    pub descriptor_set: Option<PathBuf>,

    /// Plugin parameter: `<TEMPLATE>,<OUT_FILENAME>[,no-exclude]`.
    #[arg(long, value_name = "PARAM")]
    pub param: Option<String>,

    /// Directory the output file is written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// Directory the `.proto` sources are read from for file comments.
    /// Defaults to the working directory.
    #[arg(long, value_name = "DIR")]
    pub proto_path: Option<PathBuf>,

    /// Files to document; defaults to every file in the descriptor set.
    #[arg(long = "file", value_name = "NAME")]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// A response was produced; any generation error travels inside it.
    Success,
    /// Standalone run whose generation failed.
    Failure,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::SUCCESS,
            ExitStatus::Failure => ExitCode::FAILURE,
        }
    }
}

pub fn run(args: Arguments) -> Result<ExitStatus> {
    let source_root = args.proto_path.clone().unwrap_or_default();
    match &args.descriptor_set {
        Some(path) => run_descriptor_set(path, &source_root, &args),
        None => run_plugin(&source_root),
    }
}

fn run_plugin(source_root: &Path) -> Result<ExitStatus> {
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("failed to read request from stdin")?;
    let request =
        CodeGeneratorRequest::decode(input.as_slice()).context("failed to decode CodeGeneratorRequest")?;

    let response = generate_response(&request, source_root);
    write_response(&response, &mut io::stdout().lock())?;
    Ok(ExitStatus::Success)
}

fn write_response(response: &CodeGeneratorResponse, out: &mut impl Write) -> Result<()> {
    out.write_all(&response.encode_to_vec())
        .and_then(|()| out.flush())
        .context("failed to write CodeGeneratorResponse to stdout")
}

fn run_descriptor_set(path: &Path, source_root: &Path, args: &Arguments) -> Result<ExitStatus> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let set = FileDescriptorSet::decode(bytes.as_slice())
        .with_context(|| format!("failed to decode FileDescriptorSet from {}", path.display()))?;

    let request = request_from_set(set, args.param.clone().unwrap_or_default(), &args.files);
    let response = generate_response(&request, source_root);
    if let Some(error) = response.error {
        eprintln!("{error}");
        return Ok(ExitStatus::Failure);
    }

    for file in &response.file {
        let target = args.out.join(file.name());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&target, file.content())
            .with_context(|| format!("failed to write {}", target.display()))?;
        tracing::info!(path = %target.display(), "wrote documentation");
    }
    Ok(ExitStatus::Success)
}

/// Builds the request protoc would send for `set`. Without explicit `files`
/// every file in the set is documented, in set order.
pub fn request_from_set(
    set: FileDescriptorSet,
    parameter: String,
    files: &[String],
) -> CodeGeneratorRequest {
    let file_to_generate = if files.is_empty() {
        set.file.iter().map(|file| file.name().to_string()).collect()
    } else {
        files.to_vec()
    };
    CodeGeneratorRequest {
        file_to_generate,
        parameter: Some(parameter),
        proto_file: set.file,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::FileDescriptorProto;

    fn set(names: &[&str]) -> FileDescriptorSet {
        FileDescriptorSet {
            file: names
                .iter()
                .map(|name| FileDescriptorProto {
                    name: Some(name.to_string()),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn no_arguments_means_plugin_mode() {
        let args = Arguments::try_parse_from(["protoc-gen-doc"]).expect("parse");
        assert!(args.descriptor_set.is_none());
        assert_eq!(args.proto_path, None);
        assert_eq!(args.out, PathBuf::from("."));
    }

    #[test]
    fn descriptor_set_requires_param() {
        assert!(Arguments::try_parse_from(["protoc-gen-doc", "--descriptor-set", "set.pb"]).is_err());
        let args = Arguments::try_parse_from([
            "protoc-gen-doc",
            "--descriptor-set",
            "set.pb",
            "--param",
            "html,index.html",
            "--file",
            "a.proto",
            "--file",
            "b.proto",
        ])
        .expect("parse");
        assert_eq!(args.param.as_deref(), Some("html,index.html"));
        assert_eq!(args.files, vec!["a.proto", "b.proto"]);
    }

    #[test]
    fn request_defaults_to_every_file() {
        let request = request_from_set(set(&["a.proto", "b.proto"]), "json,x.json".into(), &[]);
        assert_eq!(request.file_to_generate, vec!["a.proto", "b.proto"]);
        assert_eq!(request.parameter(), "json,x.json");
        assert_eq!(request.proto_file.len(), 2);
    }

    #[test]
    fn explicit_files_narrow_the_request() {
        let files = vec!["b.proto".to_string()];
        let request = request_from_set(set(&["a.proto", "b.proto"]), "json,x.json".into(), &files);
        assert_eq!(request.file_to_generate, files);
        assert_eq!(request.proto_file.len(), 2);
    }
}

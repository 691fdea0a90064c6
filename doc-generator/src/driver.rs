use std::path::PathBuf;

use prost_types::FileDescriptorProto;
use protodoc_model::{BuildError, BuildOptions, FileRecord, SymbolIndex, build_file};

use crate::config::{ConfigError, PluginConfig};
use crate::render::{RenderError, render};

/// The single artifact produced by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("no files to generate")]
    NoFiles,
    #[error("documentation was already rendered for this run")]
    AlreadyRendered,
    #[error("{0}: descriptor not found in request")]
    MissingDescriptor(String),
}

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Accumulating,
    Rendered,
}

#[derive(Debug)]
struct RunContext {
    config: PluginConfig,
    files: Vec<FileRecord>,
}

#[derive(Debug, Default)]
enum RunState {
    #[default]
    Idle,
    Accumulating(RunContext),
    Rendered,
}

/// Collects one record per generated file and renders them all together
/// when the last file of the run has been seen.
#[derive(Debug, Default)]
pub struct DocGenerator {
    source_root: PathBuf,
    state: RunState,
}

impl DocGenerator {
    pub fn new(source_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            state: RunState::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            RunState::Idle => Phase::Idle,
            RunState::Accumulating(_) => Phase::Accumulating,
            RunState::Rendered => Phase::Rendered,
        }
    }

    /// Adds `file` to the run. The parameter is only parsed on the first
    /// call; later calls reuse that configuration.
    ///
    /// Returns the rendered document once `file` is the last entry of
    /// `parsed_files`, and `None` before that.
    pub fn generate(
        &mut self,
        file: &FileDescriptorProto,
        parameter: &str,
        parsed_files: &[String],
        index: &SymbolIndex,
    ) -> Result<Option<OutputFile>, GenerateError> {
        let Some(last) = parsed_files.last() else {
            return Err(GenerateError::NoFiles);
        };

        let source_root = self.source_root.clone();
        let context = self.context(parameter, parsed_files.len())?;
        let options = BuildOptions {
            source_root,
            no_exclude: context.config.no_exclude,
        };
        if let Some(record) = build_file(file, index, &options)? {
            context.files.push(record);
        }

        if file.name() != last {
            return Ok(None);
        }

        let content = render(&context.files, &context.config.template)?;
        let name = context.config.output_file_name.clone();
        tracing::info!(
            output = %name,
            files = context.files.len(),
            bytes = content.len(),
            "rendered documentation"
        );
        self.state = RunState::Rendered;
        Ok(Some(OutputFile { name, content }))
    }

    fn context(
        &mut self,
        parameter: &str,
        capacity: usize,
    ) -> Result<&mut RunContext, GenerateError> {
        if matches!(self.state, RunState::Idle) {
            let config = PluginConfig::parse(parameter)?;
            tracing::debug!(
                template = %config.template.name(),
                output = %config.output_file_name,
                no_exclude = config.no_exclude,
                "parsed parameter"
            );
            self.state = RunState::Accumulating(RunContext {
                config,
                files: Vec::with_capacity(capacity),
            });
        }
        match &mut self.state {
            RunState::Accumulating(context) => Ok(context),
            _ => Err(GenerateError::AlreadyRendered),
        }
    }
}

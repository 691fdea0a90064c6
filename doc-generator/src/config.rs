use std::fs;
use std::io;
use std::path::PathBuf;

/// Third parameter token that keeps `@exclude`d elements in the output.
pub const EXCLUSION_OVERRIDE: &str = "no-exclude";

/// Template selector for raw JSON output.
pub const RAW_JSON: &str = "json";

/// Templates compiled into the binary, by format name.
pub const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("docbook", include_str!("../templates/docbook.jinja")),
    ("html", include_str!("../templates/html.jinja")),
    ("markdown", include_str!("../templates/markdown.jinja")),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0}")]
    Usage(String),
    #[error("{}: {source}", .path.display())]
    Template { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// No template: the document model is written as JSON.
    Json,
    Builtin {
        name: &'static str,
        source: &'static str,
    },
    File {
        path: PathBuf,
        source: String,
    },
}

impl TemplateSource {
    /// Name used in error messages and for picking the escaping mode.
    pub fn name(&self) -> String {
        match self {
            TemplateSource::Json => RAW_JSON.to_string(),
            TemplateSource::Builtin { name, .. } => name.to_string(),
            TemplateSource::File { path, .. } => path.display().to_string(),
        }
    }
}

/// Run configuration, parsed once from the plugin parameter
/// `<template>,<output file>[,no-exclude]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    pub template: TemplateSource,
    pub output_file_name: String,
    pub no_exclude: bool,
}

impl PluginConfig {
    pub fn parse(parameter: &str) -> Result<Self, ConfigError> {
        let tokens: Vec<&str> = parameter.split(',').collect();
        let (selector, output, no_exclude) = match tokens.as_slice() {
            [selector, output] => (*selector, *output, false),
            [selector, output, flag] if *flag == EXCLUSION_OVERRIDE => (*selector, *output, true),
            _ => return Err(ConfigError::Usage(usage())),
        };
        if selector.is_empty() || output.is_empty() {
            return Err(ConfigError::Usage(usage()));
        }

        Ok(Self {
            template: load_template(selector)?,
            output_file_name: output.to_string(),
            no_exclude,
        })
    }
}

/// Built-in format names, sorted.
pub fn supported_formats() -> Vec<&'static str> {
    BUILTIN_TEMPLATES.iter().map(|(name, _)| *name).collect()
}

pub fn usage() -> String {
    format!(
        "Usage: --doc_out={}|<TEMPLATE_FILENAME>,<OUT_FILENAME>[,{}]:<OUT_DIR>",
        supported_formats().join("|"),
        EXCLUSION_OVERRIDE
    )
}

fn load_template(selector: &str) -> Result<TemplateSource, ConfigError> {
    if selector == RAW_JSON {
        return Ok(TemplateSource::Json);
    }
    if let Some(&(name, source)) = BUILTIN_TEMPLATES.iter().find(|(name, _)| *name == selector) {
        return Ok(TemplateSource::Builtin { name, source });
    }
    let path = PathBuf::from(selector);
    let source = fs::read_to_string(&path).map_err(|source| ConfigError::Template {
        path: path.clone(),
        source,
    })?;
    Ok(TemplateSource::File { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_builtin_and_output() {
        let config = PluginConfig::parse("html,index.html").expect("valid parameter");
        assert_eq!(config.template.name(), "html");
        assert!(matches!(config.template, TemplateSource::Builtin { name: "html", .. }));
        assert_eq!(config.output_file_name, "index.html");
        assert!(!config.no_exclude);
    }

    #[test]
    fn parses_exclusion_override() {
        let config = PluginConfig::parse("html,index.html,no-exclude").expect("valid parameter");
        assert!(config.no_exclude);
        assert_eq!(config.output_file_name, "index.html");
    }

    #[test]
    fn json_selects_raw_output() {
        let config = PluginConfig::parse("json,doc.json").expect("valid parameter");
        assert_eq!(config.template, TemplateSource::Json);
    }

    #[test]
    fn malformed_parameters_are_usage_errors() {
        for parameter in [
            "html",
            "",
            "html,index.html,exclude",
            "html,index.html,no-exclude,extra",
            ",index.html",
            "html,",
        ] {
            let err = PluginConfig::parse(parameter).expect_err(parameter);
            assert!(matches!(err, ConfigError::Usage(_)), "{parameter}");
            assert_eq!(err.to_string(), usage());
        }
    }

    #[test]
    fn usage_lists_builtin_formats() {
        assert_eq!(
            usage(),
            "Usage: --doc_out=docbook|html|markdown|<TEMPLATE_FILENAME>,<OUT_FILENAME>[,no-exclude]:<OUT_DIR>"
        );
    }

    #[test]
    fn reads_user_template() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("custom.txt");
        fs::write(&path, "{{ files|length }}").expect("write template");

        let parameter = format!("{},out.txt", path.display());
        let config = PluginConfig::parse(&parameter).expect("valid parameter");
        assert_eq!(
            config.template,
            TemplateSource::File {
                path: path.clone(),
                source: "{{ files|length }}".to_string()
            }
        );
    }

    #[test]
    fn missing_user_template_is_reported_with_path() {
        let err = PluginConfig::parse("no/such/template.tmpl,out.txt").expect_err("missing file");
        assert!(matches!(err, ConfigError::Template { .. }));
        assert!(err.to_string().starts_with("no/such/template.tmpl: "));
    }
}

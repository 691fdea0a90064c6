use std::error::Error as _;
use std::path::Path;
use std::sync::LazyLock;

use minijinja::value::Value;
use minijinja::{AutoEscape, Environment, HtmlEscape, State, context, path_loader};
use protodoc_model::FileRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::TemplateSource;

const SCALAR_VALUE_TYPES: &str = include_str!("../templates/scalar_value_types.json");

// A line break, optional blank space, and another line break.
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n|\r|\r\n)\s*(\n|\r|\r\n)").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{0}")]
    Template(String),
    #[error("templates/scalar_value_types.json: {0}")]
    Resource(#[source] serde_json::Error),
    #[error("failed to create JSON document: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// One row of the scalar type reference table shown by the built-in templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarValueType {
    pub proto_type: String,
    pub notes: String,
    pub cpp_type: String,
    pub java_type: String,
    pub python_type: String,
}

pub fn scalar_value_types() -> Result<Vec<ScalarValueType>, RenderError> {
    serde_json::from_str(SCALAR_VALUE_TYPES).map_err(RenderError::Resource)
}

/// Renders the accumulated files with the configured template, or as JSON
/// when there is none.
pub fn render(files: &[FileRecord], template: &TemplateSource) -> Result<String, RenderError> {
    match template {
        TemplateSource::Json => serde_json::to_string_pretty(files).map_err(RenderError::Serialize),
        TemplateSource::Builtin { name, source } => render_template(files, name, source, None),
        TemplateSource::File { path, source } => {
            let name = path.display().to_string();
            render_template(files, &name, source, path.parent())
        }
    }
}

fn render_template(
    files: &[FileRecord],
    name: &str,
    source: &str,
    include_root: Option<&Path>,
) -> Result<String, RenderError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(auto_escape);
    env.add_filter("p", p);
    env.add_filter("para", para);
    env.add_filter("nobr", nobr);
    if let Some(root) = include_root {
        env.set_loader(path_loader(root));
    }

    let template = env
        .template_from_named_str(name, source)
        .map_err(|err| RenderError::Template(describe_error(name, &err)))?;
    let ctx = context! {
        files => files,
        scalar_value_types => scalar_value_types()?,
    };
    template
        .render(ctx)
        .map_err(|err| RenderError::Template(describe_error(name, &err)))
}

fn auto_escape(name: &str) -> AutoEscape {
    match name {
        "html" | "docbook" => AutoEscape::Html,
        "markdown" => AutoEscape::None,
        _ => minijinja::default_auto_escape_callback(name),
    }
}

/// One line: template, enclosing partial if any, byte offset, message.
///
/// Failures inside an included template arrive wrapped in an include error;
/// the innermost engine error carries the partial's name and span.
fn describe_error(template: &str, err: &minijinja::Error) -> String {
    let err = innermost(err);
    let mut location = template.to_string();
    if let Some(partial) = err.name().filter(|partial| *partial != template) {
        location.push_str(" in partial ");
        location.push_str(partial);
    }
    let offset = err.range().map(|range| range.start).unwrap_or(0);
    let message = match err.detail() {
        Some(detail) => format!("{}: {}", err.kind(), detail),
        None => err.kind().to_string(),
    };
    format!("{location}:{offset}: {message}")
}

fn innermost(err: &minijinja::Error) -> &minijinja::Error {
    let mut current = err;
    while let Some(cause) = current
        .source()
        .and_then(|source| source.downcast_ref::<minijinja::Error>())
    {
        current = cause;
    }
    current
}

// Filters receive content already rendered by the engine (filter blocks
// render their body first). Their markup must survive auto-escaping, so
// plain input is escaped here and the result is marked safe.
fn markup_input(state: &State, value: &Value) -> String {
    if value.is_safe() || matches!(state.auto_escape(), AutoEscape::None) {
        value.to_string()
    } else {
        HtmlEscape(&value.to_string()).to_string()
    }
}

fn wrap_paragraphs(text: &str, open: &str, close: &str) -> String {
    let separator = format!("{close}{open}");
    let paragraphs: Vec<&str> = PARAGRAPH_BREAK.split(text).collect();
    format!("{open}{}{close}", paragraphs.join(&separator))
}

/// Wraps paragraphs in `<p>` elements.
fn p(state: &State, value: Value) -> Value {
    let text = markup_input(state, &value);
    Value::from_safe_string(wrap_paragraphs(&text, "<p>", "</p>"))
}

/// Wraps paragraphs in DocBook `<para>` elements.
fn para(state: &State, value: Value) -> Value {
    let text = markup_input(state, &value);
    Value::from_safe_string(wrap_paragraphs(&text, "<para>", "</para>"))
}

/// Removes line breaks.
fn nobr(state: &State, value: Value) -> Value {
    let text = markup_input(state, &value)
        .replace("\r\n", "")
        .replace('\r', "")
        .replace('\n', "");
    Value::from_safe_string(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;

    fn sample_files() -> Vec<FileRecord> {
        vec![FileRecord {
            name: "shop.proto".into(),
            description: "Shop <API>.\n\nSecond paragraph.".into(),
            package: "shop.v1".into(),
            ..Default::default()
        }]
    }

    fn inline(name: &str, source: &str) -> TemplateSource {
        TemplateSource::File {
            path: PathBuf::from(name),
            source: source.to_string(),
        }
    }

    #[test]
    fn json_without_template() {
        let out = render(&sample_files(), &TemplateSource::Json).expect("render json");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(parsed[0]["name"], "shop.proto");
        assert_eq!(parsed[0]["package"], "shop.v1");
        assert!(parsed[0]["messages"].as_array().unwrap().is_empty());
    }

    #[test]
    fn p_filter_wraps_rendered_paragraphs() {
        let template = inline(
            "doc.html",
            "{% for f in files %}{% filter p %}{{ f.description }}{% endfilter %}{% endfor %}",
        );
        let out = render(&sample_files(), &template).expect("render");
        assert_eq!(out, "<p>Shop &lt;API&gt;.</p><p>Second paragraph.</p>");
    }

    #[test]
    fn para_filter_as_expression_filter() {
        let template = inline("doc.txt", "{{ files[0].description|para }}");
        let out = render(&sample_files(), &template).expect("render");
        assert_eq!(out, "<para>Shop <API>.</para><para>Second paragraph.</para>");
    }

    #[test]
    fn nobr_strips_line_breaks() {
        let template = inline(
            "doc.txt",
            "{% filter nobr %}a\r\nb\rc\n{{ files[0].name }}\n{% endfilter %}",
        );
        let out = render(&sample_files(), &template).expect("render");
        assert_eq!(out, "abcshop.proto");
    }

    #[test]
    fn paragraphs_split_on_blank_lines_only() {
        assert_eq!(
            wrap_paragraphs("one\ntwo\n  \nthree\r\n\r\nfour", "<p>", "</p>"),
            "<p>one\ntwo</p><p>three</p><p>four</p>"
        );
    }

    #[test]
    fn builtin_templates_render() {
        for &(name, source) in crate::config::BUILTIN_TEMPLATES {
            let out = render(&sample_files(), &TemplateSource::Builtin { name, source })
                .unwrap_or_else(|err| panic!("{name}: {err}"));
            assert!(out.contains("shop.proto"), "{name} output lacks file name");
            assert!(out.contains("sfixed64"), "{name} output lacks scalar table");
        }
    }

    #[test]
    fn html_builtin_escapes_descriptions() {
        let (name, source) = crate::config::BUILTIN_TEMPLATES
            .iter()
            .find(|(name, _)| *name == "html")
            .copied()
            .expect("html template");
        let out = render(&sample_files(), &TemplateSource::Builtin { name, source }).expect("render");
        assert!(out.contains("<p>Shop &lt;API&gt;.</p><p>Second paragraph.</p>"));
    }

    #[test]
    fn syntax_errors_name_template_and_offset() {
        let err = render(&sample_files(), &inline("broken.txt", "ok {% for %}"))
            .expect_err("syntax error");
        let message = err.to_string();
        assert!(!message.contains('\n'), "{message}");
        let (offset, rest) = message
            .strip_prefix("broken.txt:")
            .and_then(|rest| rest.split_once(": "))
            .unwrap_or_else(|| panic!("unexpected format: {message}"));
        assert!(offset.parse::<usize>().is_ok(), "{message}");
        assert!(rest.starts_with("syntax error"), "{message}");
    }

    #[test]
    fn errors_inside_partials_name_the_partial() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("part.txt"), "{{ 1 + }}").expect("write partial");
        let main = dir.path().join("main.txt");
        let template = TemplateSource::File {
            path: main.clone(),
            source: "{% include 'part.txt' %}".to_string(),
        };

        let message = render(&sample_files(), &template)
            .expect_err("partial syntax error")
            .to_string();
        let expected = format!("{} in partial part.txt:", main.display());
        assert!(message.starts_with(&expected), "{message}");
    }

    #[test]
    fn runtime_errors_inside_partials_name_the_partial() {
        let dir = tempfile::tempdir().expect("tempdir");
        let partial = "{% for x in 42 %}{{ x }}{% endfor %}";
        fs::write(dir.path().join("part.txt"), partial).expect("write partial");
        let main = dir.path().join("main.txt");
        let template = TemplateSource::File {
            path: main.clone(),
            source: "a line of leading text long enough to pass the partial {% include 'part.txt' %}"
                .to_string(),
        };

        let message = render(&sample_files(), &template)
            .expect_err("iteration over a number")
            .to_string();
        let prefix = format!("{} in partial part.txt:", main.display());
        let (offset, rest) = message
            .strip_prefix(&prefix)
            .and_then(|rest| rest.split_once(": "))
            .unwrap_or_else(|| panic!("unexpected format: {message}"));
        let offset: usize = offset.parse().unwrap_or_else(|_| panic!("{message}"));
        assert!(offset < partial.len(), "offset points into main template: {message}");
        assert!(rest.starts_with("invalid operation"), "{message}");
        assert!(!rest.contains("could not render include"), "{message}");
    }

    #[test]
    fn scalar_table_is_complete() {
        let table = scalar_value_types().expect("bundled table parses");
        let names: Vec<&str> = table.iter().map(|t| t.proto_type.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64",
                "fixed32", "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes"
            ]
        );
    }
}

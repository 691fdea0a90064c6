use std::collections::HashMap;

use pest::Parser as _;
use pest_derive::Parser;
use prost_types::FileDescriptorProto;
use prost_types::source_code_info::Location;

/// Prefix that drops an element (and everything nested in it) from the output.
pub const EXCLUDE_MARKER: &str = "@exclude";

#[derive(Parser)]
#[grammar = "resources/header.pest"] // Path relative to src
pub struct HeaderParser;

/// Documentation attached to one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Comment {
    pub description: String,
    pub excluded: bool,
}

impl Comment {
    /// Trims `text` and strips the exclusion marker. With `no_exclude` the
    /// marker is still stripped but never excludes anything.
    pub fn from_text(text: &str, no_exclude: bool) -> Self {
        let trimmed = text.trim();
        match trimmed.strip_prefix(EXCLUDE_MARKER) {
            Some(rest) => Self {
                description: rest.to_string(),
                excluded: !no_exclude,
            },
            None => Self {
                description: trimmed.to_string(),
                excluded: false,
            },
        }
    }

    /// Leading then trailing comment of a source location. Comments not
    /// written in `/** */` or `///` style are ignored.
    pub fn from_location(location: Option<&Location>, no_exclude: bool) -> Self {
        let mut text = String::new();
        if let Some(location) = location {
            for raw in [&location.leading_comments, &location.trailing_comments] {
                if let Some(doc) = raw.as_deref().and_then(doc_comment) {
                    text.push_str(&doc);
                }
            }
        }
        Self::from_text(&text, no_exclude)
    }
}

// protoc hands over comment bodies with `//` or `/*` already removed, so a
// doc comment is one whose body starts with the third character of its opener.
fn doc_comment(body: &str) -> Option<String> {
    let rest = body
        .strip_prefix('*')
        .or_else(|| body.strip_prefix('/'))?;
    let lines: Vec<&str> = rest
        .split('\n')
        .map(|line| line.strip_prefix(' ').unwrap_or(line))
        .collect();
    Some(lines.join("\n"))
}

/// Source locations of one file, keyed by descriptor path.
pub struct SourceLocations<'a> {
    by_path: HashMap<&'a [i32], &'a Location>,
}

impl<'a> SourceLocations<'a> {
    pub fn new(file: &'a FileDescriptorProto) -> Self {
        let by_path = file
            .source_code_info
            .iter()
            .flat_map(|info| info.location.iter())
            .map(|location| (location.path.as_slice(), location))
            .collect();
        Self { by_path }
    }

    pub fn get(&self, path: &[i32]) -> Option<&'a Location> {
        self.by_path.get(path).copied()
    }
}

/// Field numbers used in descriptor paths.
pub mod path {
    pub const FILE_MESSAGE: i32 = 4;
    pub const FILE_ENUM: i32 = 5;
    pub const FILE_SERVICE: i32 = 6;
    pub const FILE_EXTENSION: i32 = 7;

    pub const MESSAGE_FIELD: i32 = 2;
    pub const MESSAGE_NESTED: i32 = 3;
    pub const MESSAGE_ENUM: i32 = 4;
    pub const MESSAGE_EXTENSION: i32 = 6;

    pub const ENUM_VALUE: i32 = 2;
    pub const SERVICE_METHOD: i32 = 2;

    pub fn child(parent: &[i32], field: i32, index: usize) -> Vec<i32> {
        let mut path = Vec::with_capacity(parent.len() + 2);
        path.extend_from_slice(parent);
        path.push(field);
        path.push(index as i32);
        path
    }
}

/// Extracts the file-level documentation comment from .proto source text.
pub fn scan_header(source: &str) -> Result<String, Box<pest::error::Error<Rule>>> {
    let mut pairs = HeaderParser::parse(Rule::file_header, source).map_err(Box::new)?;
    let Some(header) = pairs.next() else {
        return Ok(String::new());
    };

    for part in header.into_inner() {
        match part.as_rule() {
            Rule::line_comments => {
                let lines: Vec<&str> = part
                    .into_inner()
                    .flat_map(|line| line.into_inner())
                    .filter(|p| p.as_rule() == Rule::line_text)
                    .map(|p| {
                        let text = p.as_str().trim_end();
                        text.strip_prefix(' ').unwrap_or(text)
                    })
                    .collect();
                return Ok(lines.join("\n"));
            }
            Rule::block_comment => {
                let body = part
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::block_text)
                    .map(|p| p.as_str())
                    .unwrap_or_default();
                return Ok(block_lines(body));
            }
            _ => {}
        }
    }
    Ok(String::new())
}

// The opener's second `*` counts as the first line's decoration, so
// "/** text" and " * text" both come out as "text".
fn block_lines(body: &str) -> String {
    let decorated = format!("*{body}");
    let lines: Vec<&str> = decorated
        .lines()
        .map(|line| {
            let line = line.trim();
            let line = line.strip_prefix('*').unwrap_or(line);
            line.strip_prefix(' ').unwrap_or(line)
        })
        .collect();
    lines.join("\n")
}

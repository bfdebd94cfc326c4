//! Template parsing and trace-recording rendering.
//!
//! The dialect is deliberately small: literal text interleaved with
//! `{{ name }}` expressions, `{{ if name }} … {{ else }} … {{ end }}`
//! conditionals, and `{{ range name }} … {{ end }}` loops over lists, with
//! `{{ . }}` as the current item. Rendering emits a [`core_trace::Trace`]
//! mapping every literal run of the output back to its byte range in the
//! template source; expression output is traced as opaque.

use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub mod parse;
pub mod render;

pub use render::{Rendered, render};

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("action opened at byte {offset} is never closed")]
    UnclosedAction { offset: usize },
    #[error("empty action at byte {offset}")]
    EmptyAction { offset: usize },
    #[error("unrecognized action {action:?} at byte {offset}")]
    UnknownAction { offset: usize, action: String },
    #[error("{{{{ end }}}} at byte {offset} closes nothing")]
    StrayEnd { offset: usize },
    #[error("{{{{ else }}}} at byte {offset} is outside an if block")]
    StrayElse { offset: usize },
    #[error("block opened at byte {offset} is missing its {{{{ end }}}}")]
    UnclosedBlock { offset: usize },
    #[error("{{{{ . }}}} used outside a range block")]
    NoCurrentItem,
    #[error("failed to read data file {path}")]
    DataRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse data file {path}")]
    DataParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("data value {key:?} must be a string or a list of strings")]
    UnsupportedValue { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

/// Name-to-value bindings a template is rendered against.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), Value::Text(value.into()));
    }

    pub fn set_list(&mut self, key: impl Into<String>, items: Vec<String>) {
        self.values.insert(key.into(), Value::List(items));
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name)? {
            Value::Text(s) => Some(s),
            Value::List(_) => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name)? {
            Value::List(items) => Some(items),
            Value::Text(_) => None,
        }
    }

    /// Conditional truthiness: present and non-empty.
    pub fn truthy(&self, name: &str) -> bool {
        match self.values.get(name) {
            Some(Value::Text(s)) => !s.is_empty(),
            Some(Value::List(items)) => !items.is_empty(),
            None => false,
        }
    }

    /// Parse a context from TOML. Only strings and arrays of strings are
    /// meaningful template values; anything else is rejected by key.
    pub fn from_toml_str(raw: &str, origin: &str) -> Result<Self, TemplateError> {
        let table: toml::Table = toml::from_str(raw).map_err(|source| TemplateError::DataParse {
            path: origin.to_string(),
            source,
        })?;
        let mut ctx = Context::new();
        for (key, value) in table {
            match value {
                toml::Value::String(s) => {
                    ctx.values.insert(key, Value::Text(s));
                }
                toml::Value::Array(items) => {
                    let mut list = Vec::with_capacity(items.len());
                    for item in items {
                        match item {
                            toml::Value::String(s) => list.push(s),
                            _ => {
                                return Err(TemplateError::UnsupportedValue { key: key.clone() });
                            }
                        }
                    }
                    ctx.values.insert(key, Value::List(list));
                }
                _ => return Err(TemplateError::UnsupportedValue { key: key.clone() }),
            }
        }
        Ok(ctx)
    }

    /// Load the context from a data file beside the template. A missing file
    /// is an empty context; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw, &path.display().to_string()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(target: "template.render", path = %path.display(), "no_data_file");
                Ok(Self::new())
            }
            Err(source) => Err(TemplateError::DataRead {
                path: path.display().to_string(),
                source,
            }),
        }
    }
}

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("document root must be a mapping")]
    NotAnObject,

    #[error("document has neither an `openapi` nor a `swagger` version field")]
    MissingVersion,

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    #[error("failed to convert Swagger 2.0 document: {0}")]
    Conversion(#[from] ConvertError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unresolved reference: {0}")]
    UnresolvedRef(String),

    #[error("circular reference detected: {0}")]
    CircularRef(String),

    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("schema referenced not found: {0}")]
    RefTargetNotFound(String),

    #[error("invalid merge reference in `{key}`: {reason}")]
    InvalidMergeRef { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("failed to expand {method} {path}: {source}")]
    Operation {
        path: String,
        method: String,
        #[source]
        source: ResolveError,
    },

    #[error("failed to expand parameters of {path}: {source}")]
    PathParameters {
        path: String,
        #[source]
        source: ResolveError,
    },

    #[error("failed to expand component schema `{name}`: {source}")]
    Component {
        name: String,
        #[source]
        source: ResolveError,
    },
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("parameter `{name}` in `{location}` cannot be represented in {target}")]
    UnsupportedParameterLocation {
        name: String,
        location: String,
        target: &'static str,
    },

    #[error("parameter `{0}` declares `content` instead of `schema`, which Swagger 2.0 cannot express")]
    ParameterContent(String),

    #[error("parameter `{0}` has no `type`")]
    MissingParameterType(String),

    #[error("unsupported type `{type_name}` on `{name}`")]
    UnsupportedType { name: String, type_name: String },

    #[error("security scheme `{name}` of type `{kind}` cannot be represented in {target}")]
    UnsupportedSecurityScheme {
        name: String,
        kind: String,
        target: &'static str,
    },

    #[error("security scheme `{name}` is missing `{field}`")]
    IncompleteSecurityScheme { name: String, field: &'static str },

    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to read JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported map key: {0}")]
    UnsupportedKey(String),

    #[error("number {0} has no JSON representation")]
    NonFiniteNumber(f64),
}

/// A structural violation, located by a dotted path such as
/// `paths./pets.get.responses.200.description`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {}", .path.join("."), .message)]
pub struct ValidationError {
    path: Vec<String>,
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            path: Vec::new(),
            message: message.into(),
        }
    }

    /// Error located at a single child segment.
    pub fn at(segment: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(message).within(segment)
    }

    /// Prefix the location with a parent segment.
    pub fn within(mut self, segment: impl Into<String>) -> Self {
        self.path.insert(0, segment.into());
        self
    }

    pub fn location(&self) -> String {
        self.path.join(".")
    }

    pub fn segments(&self) -> &[String] {
        &self.path
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("expand error: {0}")]
    Expand(#[from] ExpandError),

    #[error("invalid document: {0}")]
    Validation(#[from] ValidationError),

    #[error("conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("serialization error: {0}")]
    Format(#[from] FormatError),
}

pub mod components;
pub mod media_type;
pub mod operation;
pub mod parameter;
pub mod reference;
pub mod request_body;
pub mod response;
pub mod schema;
pub mod security;
pub mod server;
pub mod spec;

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::convert::{oas2_to_oas3, yaml};
use crate::error::ParseError;
use crate::v2::Swagger;
use spec::OpenApiSpec;

/// Vendor extensions and unmodeled keys of an object.
pub type Extensions = IndexMap<String, Value>;

/// Encoding of the source bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

/// Version and encoding of a document, as `oas3-yaml` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecProtocol {
    Oas2Json,
    Oas2Yaml,
    Oas3Json,
    Oas3Yaml,
}

impl SpecProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecProtocol::Oas2Json => "oas2-json",
            SpecProtocol::Oas2Yaml => "oas2-yaml",
            SpecProtocol::Oas3Json => "oas3-json",
            SpecProtocol::Oas3Yaml => "oas3-yaml",
        }
    }

    pub fn is_v2(&self) -> bool {
        matches!(self, SpecProtocol::Oas2Json | SpecProtocol::Oas2Yaml)
    }

    pub fn format(&self) -> SourceFormat {
        match self {
            SpecProtocol::Oas2Json | SpecProtocol::Oas3Json => SourceFormat::Json,
            SpecProtocol::Oas2Yaml | SpecProtocol::Oas3Yaml => SourceFormat::Yaml,
        }
    }
}

impl fmt::Display for SpecProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Version {
    V2,
    V3,
}

/// Load a v2 or v3 document from JSON or YAML bytes. Swagger 2.0 input is
/// converted to OpenAPI 3 before it is returned.
pub fn load_from_data(data: &[u8]) -> Result<OpenApiSpec, ParseError> {
    load_with_protocol(data).map(|(spec, _)| spec)
}

/// Like [`load_from_data`], also reporting the version and encoding the
/// document was read from. The bytes are parsed once.
pub fn load_with_protocol(data: &[u8]) -> Result<(OpenApiSpec, SpecProtocol), ParseError> {
    let (root, format) = read_root(data)?;
    let version = sniff_version(&root)?;
    let protocol = protocol_of(&version, format);
    log::debug!("loading {} document", protocol);
    let spec = match version {
        Version::V3 => serde_json::from_value(root)?,
        Version::V2 => {
            let swagger: Swagger = serde_json::from_value(root)?;
            oas2_to_oas3(&swagger)?
        }
    };
    Ok((spec, protocol))
}

/// Load a Swagger 2.0 document without converting it.
pub fn load_v2_from_data(data: &[u8]) -> Result<Swagger, ParseError> {
    let (root, _) = read_root(data)?;
    match sniff_version(&root)? {
        Version::V2 => Ok(serde_json::from_value(root)?),
        Version::V3 => Err(ParseError::UnsupportedVersion(
            root.get("openapi")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )),
    }
}

/// Report the version and encoding of a document without loading it.
pub fn detect_protocol(data: &[u8]) -> Result<SpecProtocol, ParseError> {
    let (root, format) = read_root(data)?;
    Ok(protocol_of(&sniff_version(&root)?, format))
}

fn protocol_of(version: &Version, format: SourceFormat) -> SpecProtocol {
    match (version, format) {
        (Version::V2, SourceFormat::Json) => SpecProtocol::Oas2Json,
        (Version::V2, SourceFormat::Yaml) => SpecProtocol::Oas2Yaml,
        (Version::V3, SourceFormat::Json) => SpecProtocol::Oas3Json,
        (Version::V3, SourceFormat::Yaml) => SpecProtocol::Oas3Yaml,
    }
}

/// Parse bytes as JSON, falling back to YAML, and require a mapping at the
/// root. Version fields written as YAML numbers are normalized to strings.
fn read_root(data: &[u8]) -> Result<(Value, SourceFormat), ParseError> {
    let (mut root, format) = match serde_json::from_slice::<Value>(data) {
        Ok(value) => (value, SourceFormat::Json),
        Err(_) => (yaml::yaml_slice_to_value(data)?, SourceFormat::Yaml),
    };
    let map = root.as_object_mut().ok_or(ParseError::NotAnObject)?;
    for key in ["openapi", "swagger"] {
        if let Some(Value::Number(n)) = map.get(key) {
            let text = version_text(n);
            map.insert(key.to_string(), Value::String(text));
        }
    }
    Ok((root, format))
}

fn version_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && n.is_f64() => format!("{:.1}", f),
        _ => n.to_string(),
    }
}

fn sniff_version(root: &Value) -> Result<Version, ParseError> {
    if let Some(v) = root.get("openapi") {
        let v = v.as_str().unwrap_or_default();
        if !v.starts_with("3.") {
            return Err(ParseError::UnsupportedVersion(v.to_string()));
        }
        return Ok(Version::V3);
    }
    if let Some(v) = root.get("swagger") {
        let v = v.as_str().unwrap_or_default();
        if v != "2.0" {
            return Err(ParseError::UnsupportedVersion(v.to_string()));
        }
        return Ok(Version::V2);
    }
    Err(ParseError::MissingVersion)
}

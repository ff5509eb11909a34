//! End-to-end processing: load, expand, add examples, validate, serialize.

use log::debug;
use serde::Deserialize;

use crate::convert::{oas3_to_oas2, to_json, to_json_pretty, to_yaml};
use crate::error::{FormatError, PipelineError};
use crate::example::generate_examples;
use crate::expand::{expand_components, expand_paths};
use crate::parse::{SourceFormat, load_with_protocol};
use crate::validate::validate_oas3;

/// Version of the emitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetVersion {
    V2,
    #[default]
    V3,
}

/// Encoding of the emitted document. `Auto` keeps the input's encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Auto,
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Inline `$ref` and `x-*-merge` in paths and named schemas.
    pub expand: bool,
    /// Generate request and response examples. Implies nothing about
    /// `expand`; unexpanded references produce `null` entries.
    pub examples: bool,
    pub validate: bool,
    pub target: TargetVersion,
    pub format: OutputFormat,
    /// Indent JSON output.
    pub pretty: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            expand: false,
            examples: false,
            validate: true,
            target: TargetVersion::V3,
            format: OutputFormat::Auto,
            pretty: true,
        }
    }
}

/// Run a document through the configured stages and return the serialized
/// result.
pub fn process(data: &[u8], options: &PipelineOptions) -> Result<Vec<u8>, PipelineError> {
    let (mut spec, protocol) = load_with_protocol(data)?;
    debug!("loaded {protocol}");

    if options.expand {
        debug!("expanding {} paths", spec.paths.len());
        expand_paths(&mut spec)?;
        expand_components(&mut spec)?;
    }
    if options.examples {
        debug!("generating examples");
        generate_examples(&mut spec);
    }
    if options.validate {
        debug!("validating");
        validate_oas3(&spec)?;
    }

    let format = match options.format {
        OutputFormat::Auto => protocol.format(),
        OutputFormat::Json => SourceFormat::Json,
        OutputFormat::Yaml => SourceFormat::Yaml,
    };
    debug!("writing {:?} as {format:?}", options.target);

    let bytes = match options.target {
        TargetVersion::V3 => serialize(&spec, format, options.pretty)?,
        TargetVersion::V2 => serialize(&oas3_to_oas2(&spec)?, format, options.pretty)?,
    };
    Ok(bytes)
}

fn serialize<T: serde::Serialize>(
    doc: &T,
    format: SourceFormat,
    pretty: bool,
) -> Result<Vec<u8>, FormatError> {
    match format {
        SourceFormat::Yaml => to_yaml(doc),
        SourceFormat::Json if pretty => to_json_pretty(doc),
        SourceFormat::Json => to_json(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::spec::OpenApiSpec;
    use crate::v2::Swagger;

    const PETS: &str = r##"
openapi: 3.0.3
info:
  title: Pets
  version: "1.0"
servers:
  - url: https://api.example.com/v1
paths:
  /pets:
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses:
        "201":
          description: created
components:
  schemas:
    Pet:
      type: object
      properties:
        name: {type: string}
"##;

    #[test]
    fn test_default_options_round_trip_yaml() {
        let out = process(PETS.as_bytes(), &PipelineOptions::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("openapi: 3.0.3\n"));
        assert!(text.contains("#/components/schemas/Pet"));
    }

    #[test]
    fn test_expand_and_examples() {
        let options = PipelineOptions {
            expand: true,
            examples: true,
            format: OutputFormat::Json,
            ..PipelineOptions::default()
        };
        let out = process(PETS.as_bytes(), &options).unwrap();
        let spec: OpenApiSpec = serde_json::from_slice(&out).unwrap();
        let body = serde_json::to_value(&spec.paths["/pets"].post).unwrap();
        let schema = &body["requestBody"]["content"]["application/json"]["schema"];
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["example"], r#"{"name":""}"#);
    }

    #[test]
    fn test_downgrade_to_v2() {
        let options = PipelineOptions {
            target: TargetVersion::V2,
            format: OutputFormat::Json,
            pretty: false,
            ..PipelineOptions::default()
        };
        let out = process(PETS.as_bytes(), &options).unwrap();
        assert!(!out.contains(&b'\n'));
        let swagger: Swagger = serde_json::from_slice(&out).unwrap();
        assert_eq!(swagger.swagger, "2.0");
        assert_eq!(swagger.host.as_deref(), Some("api.example.com"));
        assert_eq!(swagger.base_path.as_deref(), Some("/v1"));
    }

    #[test]
    fn test_validation_failure_is_reported() {
        let broken = PETS.replace("          description: created\n", "          content: {}\n");
        let err = process(broken.as_bytes(), &PipelineOptions::default()).unwrap_err();
        match err {
            PipelineError::Validation(e) => {
                assert_eq!(e.location(), "paths./pets.post.responses.201.description")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validation_can_be_skipped() {
        let broken = PETS.replace("          description: created\n", "          content: {}\n");
        let options = PipelineOptions {
            validate: false,
            ..PipelineOptions::default()
        };
        assert!(process(broken.as_bytes(), &options).is_ok());
    }
}

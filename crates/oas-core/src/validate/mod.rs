//! Structural validation of OpenAPI 3.x documents.
//!
//! Validation stops at the first violation. Each nested check reports its
//! error relative to the node it inspects, and callers prefix their own
//! segment on the way out, so the final location reads from the document
//! root (`paths./pets.get.responses.200.description`).

mod paths;
mod schema;
mod security;

use crate::error::ValidationError;
use crate::parse::components::Components;
use crate::parse::parameter::{Parameter, ParameterOrRef};
use crate::parse::reference::component_name;
use crate::parse::server::Server;
use crate::parse::spec::{Info, OpenApiSpec};

use security::validate_security_scheme;

type Result<T = ()> = std::result::Result<T, ValidationError>;

/// Validate a parsed v3 document.
pub fn validate_oas3(spec: &OpenApiSpec) -> Result {
    Validator::new(spec).run()
}

/// Prefix the location of a failed check.
trait Located {
    fn within(self, segment: impl Into<String>) -> Self;
}

impl<T> Located for Result<T> {
    fn within(self, segment: impl Into<String>) -> Self {
        self.map_err(|e| e.within(segment))
    }
}

/// Component sections a `$ref` may point into.
#[derive(Debug, Clone, Copy)]
enum Section {
    Schemas,
    Parameters,
    RequestBodies,
    Responses,
    Headers,
}

impl Section {
    fn as_str(self) -> &'static str {
        match self {
            Section::Schemas => "schemas",
            Section::Parameters => "parameters",
            Section::RequestBodies => "requestBodies",
            Section::Responses => "responses",
            Section::Headers => "headers",
        }
    }

    fn contains(self, components: &Components, name: &str) -> bool {
        match self {
            Section::Schemas => components.schemas.contains_key(name),
            Section::Parameters => components.parameters.contains_key(name),
            Section::RequestBodies => components.request_bodies.contains_key(name),
            Section::Responses => components.responses.contains_key(name),
            Section::Headers => components.headers.contains_key(name),
        }
    }
}

struct Validator<'a> {
    spec: &'a OpenApiSpec,
    components: Option<&'a Components>,
}

impl<'a> Validator<'a> {
    fn new(spec: &'a OpenApiSpec) -> Self {
        Self {
            spec,
            components: spec.components.as_ref(),
        }
    }

    fn run(&self) -> Result {
        if self.spec.openapi.trim().is_empty() {
            return Err(ValidationError::at(
                "openapi",
                "value of openapi must be a non-empty string",
            ));
        }
        validate_info(&self.spec.info).within("info")?;
        self.validate_paths().within("paths")?;
        self.validate_components().within("components")?;
        if let Some(requirements) = &self.spec.security {
            self.validate_security_requirements(requirements)
                .within("security")?;
        }
        for (i, server) in self.spec.servers.iter().enumerate() {
            validate_server(server)
                .within(i.to_string())
                .within("servers")?;
        }
        Ok(())
    }

    fn validate_components(&self) -> Result {
        let Some(components) = self.components else {
            return Ok(());
        };

        for (name, schema) in &components.schemas {
            check_component_key(name)
                .and_then(|()| self.validate_schema_ref(schema))
                .within(name)
                .within("schemas")?;
        }
        for (name, param) in &components.parameters {
            check_component_key(name)
                .and_then(|()| self.validate_parameter_or_ref(param))
                .within(name)
                .within("parameters")?;
        }
        for (name, body) in &components.request_bodies {
            check_component_key(name)
                .and_then(|()| self.validate_request_body_or_ref(body))
                .within(name)
                .within("requestBodies")?;
        }
        for (name, response) in &components.responses {
            check_component_key(name)
                .and_then(|()| self.validate_response_or_ref(response))
                .within(name)
                .within("responses")?;
        }
        for (name, header) in &components.headers {
            check_component_key(name)
                .and_then(|()| self.validate_header_or_ref(header))
                .within(name)
                .within("headers")?;
        }
        for name in components.examples.keys() {
            check_component_key(name)
                .within(name)
                .within("examples")?;
        }
        for (name, scheme) in &components.security_schemes {
            check_component_key(name)
                .and_then(|()| validate_security_scheme(scheme))
                .within(name)
                .within("securitySchemes")?;
        }
        Ok(())
    }

    /// A `$ref` must name an existing component of the expected section.
    fn check_ref(&self, ref_path: &str, section: Section) -> Result {
        let name = component_name(ref_path, section.as_str())
            .map_err(|e| ValidationError::at("$ref", e.to_string()))?;
        if self
            .components
            .is_some_and(|components| section.contains(components, &name))
        {
            Ok(())
        } else {
            Err(ValidationError::at(
                "$ref",
                format!("reference {ref_path:?} does not resolve to a component"),
            ))
        }
    }

    /// Follow parameter references to the inline definition, if any.
    fn resolve_parameter(&self, param: &'a ParameterOrRef) -> Option<&'a Parameter> {
        let components = self.components;
        let mut current = param;
        for _ in 0..=components.map_or(0, |c| c.parameters.len()) {
            match current {
                ParameterOrRef::Parameter(p) => return Some(p),
                ParameterOrRef::Ref { ref_path } => {
                    let name = component_name(ref_path, "parameters").ok()?;
                    current = components?.parameters.get(&name)?;
                }
            }
        }
        None
    }
}

fn validate_info(info: &Info) -> Result {
    if info.title.trim().is_empty() {
        return Err(ValidationError::at("title", "value of title must be a non-empty string"));
    }
    if info.version.trim().is_empty() {
        return Err(ValidationError::at(
            "version",
            "value of version must be a non-empty string",
        ));
    }
    if let Some(license) = &info.license
        && license.name.trim().is_empty()
    {
        return Err(ValidationError::at("name", "value of license name must be a non-empty string")
            .within("license"));
    }
    Ok(())
}

fn validate_server(server: &Server) -> Result {
    if server.url.trim().is_empty() {
        return Err(ValidationError::at("url", "value of url must be a non-empty string"));
    }
    for (name, variable) in &server.variables {
        if !variable.enum_values.is_empty() && !variable.enum_values.contains(&variable.default) {
            return Err(ValidationError::at(
                "default",
                format!("default {:?} is not one of the enumerated values", variable.default),
            )
            .within(name.as_str())
            .within("variables"));
        }
    }
    Ok(())
}

/// Component keys must match `^[a-zA-Z0-9._-]+$`.
fn check_component_key(name: &str) -> Result {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "identifier {name:?} is not supported (must match ^[a-zA-Z0-9._-]+$)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn spec(yaml: &str) -> OpenApiSpec {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    pub(super) fn location(yaml: &str) -> String {
        validate_oas3(&spec(yaml)).unwrap_err().location()
    }

    pub(super) const MINIMAL: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: "1.0"
paths:
  /pets:
    get:
      responses:
        "200":
          description: ok
"#;

    #[test]
    fn test_minimal_document_is_valid() {
        validate_oas3(&spec(MINIMAL)).unwrap();
    }

    #[test]
    fn test_empty_openapi_version() {
        let mut doc = spec(MINIMAL);
        doc.openapi.clear();
        let err = validate_oas3(&doc).unwrap_err();
        assert_eq!(err.location(), "openapi");
    }

    #[test]
    fn test_info_checks_title_before_version() {
        let mut doc = spec(MINIMAL);
        doc.info.title.clear();
        doc.info.version.clear();
        let err = validate_oas3(&doc).unwrap_err();
        assert_eq!(err.location(), "info.title");
        assert_eq!(err.to_string(), "info.title: value of title must be a non-empty string");

        doc.info.title = "Pets".into();
        assert_eq!(validate_oas3(&doc).unwrap_err().location(), "info.version");
    }

    #[test]
    fn test_license_requires_name() {
        let doc = MINIMAL.replace(
            "  version: \"1.0\"",
            "  version: \"1.0\"\n  license:\n    url: https://example.com",
        );
        assert_eq!(location(&doc), "info.license.name");
    }

    #[test]
    fn test_component_keys() {
        let doc = format!(
            "{MINIMAL}components:\n  schemas:\n    Pet.v1_x-y:\n      type: string\n    Pet Store:\n      type: string\n"
        );
        let err = validate_oas3(&spec(&doc)).unwrap_err();
        assert_eq!(err.location(), "components.schemas.Pet Store");
        assert!(err.message().contains("Pet Store"));
    }

    #[test]
    fn test_component_schema_is_validated() {
        let doc = format!(
            "{MINIMAL}components:\n  schemas:\n    Pet:\n      properties:\n        age:\n          type: int\n"
        );
        let err = validate_oas3(&spec(&doc)).unwrap_err();
        assert_eq!(err.location(), "components.schemas.Pet.properties.age.type");
        assert!(err.message().contains("unsupported type"));
    }

    #[test]
    fn test_dangling_component_reference() {
        let doc = format!(
            "{MINIMAL}components:\n  responses:\n    NotFound:\n      $ref: '#/components/responses/Missing'\n"
        );
        assert_eq!(location(&doc), "components.responses.NotFound.$ref");
    }

    #[test]
    fn test_server_url_required() {
        let doc = format!("{MINIMAL}servers:\n  - url: https://api.example.com\n  - description: nowhere\n");
        assert_eq!(location(&doc), "servers.1.url");
    }

    #[test]
    fn test_server_variable_default_in_enum() {
        let doc = format!(
            "{MINIMAL}servers:\n  - url: https://{{env}}.example.com\n    variables:\n      env:\n        default: dev\n        enum: [prod, staging]\n"
        );
        assert_eq!(location(&doc), "servers.0.variables.env.default");
    }

    #[test]
    fn test_parameter_reference_is_resolved_through_chain() {
        let doc = spec(&format!(
            "{MINIMAL}components:\n  parameters:\n    a:\n      $ref: '#/components/parameters/b'\n    b:\n      name: limit\n      in: query\n      schema:\n        type: integer\n"
        ));
        let validator = Validator::new(&doc);
        let param = ParameterOrRef::Ref {
            ref_path: "#/components/parameters/a".into(),
        };
        assert_eq!(validator.resolve_parameter(&param).map(|p| p.name.as_str()), Some("limit"));
    }

    #[test]
    fn test_parameter_reference_cycle_does_not_resolve() {
        let doc = spec(&format!(
            "{MINIMAL}components:\n  parameters:\n    a:\n      $ref: '#/components/parameters/b'\n    b:\n      $ref: '#/components/parameters/a'\n"
        ));
        let validator = Validator::new(&doc);
        let param = ParameterOrRef::Ref {
            ref_path: "#/components/parameters/a".into(),
        };
        assert!(validator.resolve_parameter(&param).is_none());
    }
}

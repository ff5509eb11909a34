use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::{Located, Result, Section, Validator};
use crate::error::ValidationError;
use crate::parse::media_type::MediaType;
use crate::parse::operation::{Operation, PathItem};
use crate::parse::parameter::{Parameter, ParameterLocation, ParameterOrRef};
use crate::parse::request_body::RequestBodyOrRef;
use crate::parse::response::{HeaderOrRef, ResponseOrRef};

impl<'a> Validator<'a> {
    pub(super) fn validate_paths(&self) -> Result {
        if self.spec.paths.is_empty() {
            return Err(ValidationError::new("paths must contain at least one path"));
        }
        let mut templates: HashMap<String, &'a str> = HashMap::new();
        for (path, item) in &self.spec.paths {
            self.validate_path_item(path, item, &mut templates)
                .within(path)?;
        }
        Ok(())
    }

    fn validate_path_item(
        &self,
        path: &'a str,
        item: &'a PathItem,
        templates: &mut HashMap<String, &'a str>,
    ) -> Result {
        if !path.starts_with('/') {
            return Err(ValidationError::new(format!(
                "path {path:?} does not start with a forward slash (/)"
            )));
        }
        let (template, placeholders) = normalize_templated_path(path);
        if let Some(other) = templates.insert(template, path) {
            return Err(ValidationError::new(format!(
                "conflicting paths {path:?} and {other:?}"
            )));
        }

        self.validate_parameter_list(&item.parameters)
            .within("parameters")?;
        for (method, op) in item.operations() {
            self.validate_operation(op, &item.parameters, &placeholders)
                .within(method.as_str())?;
        }
        Ok(())
    }

    fn validate_operation(
        &self,
        op: &'a Operation,
        shared: &'a [ParameterOrRef],
        placeholders: &[String],
    ) -> Result {
        self.validate_parameter_list(&op.parameters)
            .within("parameters")?;
        self.check_path_parameters(shared.iter().chain(&op.parameters), placeholders)
            .within("parameters")?;

        if let Some(body) = &op.request_body {
            self.validate_request_body_or_ref(body)
                .within("requestBody")?;
        }

        if op.responses.is_empty() {
            return Err(ValidationError::at(
                "responses",
                "the responses object must contain at least one response code",
            ));
        }
        for (code, response) in &op.responses {
            self.validate_response_or_ref(response)
                .within(code)
                .within("responses")?;
        }

        if let Some(requirements) = &op.security {
            self.validate_security_requirements(requirements)
                .within("security")?;
        }
        Ok(())
    }

    /// Every placeholder needs an `in: path` parameter, and every path
    /// parameter must appear in the template.
    fn check_path_parameters(
        &self,
        params: impl Iterator<Item = &'a ParameterOrRef>,
        placeholders: &[String],
    ) -> Result {
        let declared: Vec<&str> = params
            .filter_map(|p| self.resolve_parameter(p))
            .filter(|p| p.location == ParameterLocation::Path)
            .map(|p| p.name.as_str())
            .collect();

        if let Some(missing) = placeholders
            .iter()
            .find(|name| !declared.contains(&name.as_str()))
        {
            return Err(ValidationError::new(format!(
                "path parameter {missing:?} is not declared"
            )));
        }
        if let Some(extra) = declared
            .iter()
            .find(|name| !placeholders.iter().any(|p| p == *name))
        {
            return Err(ValidationError::new(format!(
                "path parameter {extra:?} does not appear in the path"
            )));
        }
        Ok(())
    }

    fn validate_parameter_list(&self, params: &'a [ParameterOrRef]) -> Result {
        let mut seen: HashSet<(ParameterLocation, &str)> = HashSet::new();
        for (i, param) in params.iter().enumerate() {
            self.validate_parameter_or_ref(param)
                .within(i.to_string())?;
            if let Some(p) = self.resolve_parameter(param)
                && !seen.insert((p.location, p.name.as_str()))
            {
                return Err(ValidationError::new(format!(
                    "more than one {:?} parameter has name {:?}",
                    p.location.as_str(),
                    p.name
                ))
                .within(i.to_string()));
            }
        }
        Ok(())
    }

    pub(super) fn validate_parameter_or_ref(&self, param: &ParameterOrRef) -> Result {
        match param {
            ParameterOrRef::Ref { ref_path } => self.check_ref(ref_path, Section::Parameters),
            ParameterOrRef::Parameter(p) => self.validate_parameter(p),
        }
    }

    fn validate_parameter(&self, param: &Parameter) -> Result {
        if param.name.is_empty() {
            return Err(ValidationError::at("name", "parameter name can't be blank"));
        }

        let location = param.location;
        let style = param
            .style
            .as_deref()
            .unwrap_or_else(|| default_style(location));
        let explode = param.explode.unwrap_or(style == "form");
        if !style_supported(location, style, explode) {
            return Err(ValidationError::at(
                "style",
                format!(
                    "{} parameter {:?} does not support style {style:?} with explode={explode}",
                    location.as_str(),
                    param.name
                ),
            ));
        }

        match (&param.schema, param.content.is_empty()) {
            (Some(_), false) => Err(ValidationError::new(
                "parameter must declare schema or content, not both",
            )),
            (None, true) => Err(ValidationError::new(
                "parameter must declare either schema or content",
            )),
            (Some(schema), true) => self.validate_schema_ref(schema).within("schema"),
            (None, false) => self.validate_content(&param.content),
        }
    }

    pub(super) fn validate_request_body_or_ref(&self, body: &RequestBodyOrRef) -> Result {
        match body {
            RequestBodyOrRef::Ref { ref_path } => {
                self.check_ref(ref_path, Section::RequestBodies)
            }
            RequestBodyOrRef::RequestBody(body) => self.validate_content(&body.content),
        }
    }

    pub(super) fn validate_response_or_ref(&self, response: &ResponseOrRef) -> Result {
        let response = match response {
            ResponseOrRef::Ref { ref_path } => {
                return self.check_ref(ref_path, Section::Responses);
            }
            ResponseOrRef::Response(response) => response,
        };
        if response.description.is_none() {
            return Err(ValidationError::at(
                "description",
                "a short description of the response is required",
            ));
        }
        for (name, header) in &response.headers {
            self.validate_header_or_ref(header)
                .within(name)
                .within("headers")?;
        }
        self.validate_content(&response.content)
    }

    pub(super) fn validate_header_or_ref(&self, header: &HeaderOrRef) -> Result {
        match header {
            HeaderOrRef::Ref { ref_path } => self.check_ref(ref_path, Section::Headers),
            HeaderOrRef::Header(header) => match &header.schema {
                Some(schema) => self.validate_schema_ref(schema).within("schema"),
                None => Ok(()),
            },
        }
    }

    fn validate_content(&self, content: &IndexMap<String, MediaType>) -> Result {
        for (media_type, media) in content {
            if let Some(schema) = &media.schema {
                self.validate_schema_ref(schema)
                    .within("schema")
                    .within(media_type)
                    .within("content")?;
            }
        }
        Ok(())
    }
}

fn default_style(location: ParameterLocation) -> &'static str {
    match location {
        ParameterLocation::Query | ParameterLocation::Cookie => "form",
        ParameterLocation::Path | ParameterLocation::Header => "simple",
    }
}

fn style_supported(location: ParameterLocation, style: &str, explode: bool) -> bool {
    match location {
        ParameterLocation::Path => matches!(style, "simple" | "label" | "matrix"),
        ParameterLocation::Query => match style {
            "form" | "spaceDelimited" | "pipeDelimited" => true,
            "deepObject" => explode,
            _ => false,
        },
        ParameterLocation::Header => style == "simple",
        ParameterLocation::Cookie => style == "form",
    }
}

/// Replace the contents of every `{name}` placeholder with `{}` (a trailing
/// `*` is kept) and return the placeholder names in order.
pub(super) fn normalize_templated_path(path: &str) -> (String, Vec<String>) {
    let mut template = String::with_capacity(path.len());
    let mut names = Vec::new();
    let mut rest = path;

    while let Some(open) = rest.find('{') {
        template.push_str(&rest[..=open]);
        let inner = &rest[open + 1..];
        let Some(close) = inner.find('}') else {
            template.push_str(inner);
            return (template, names);
        };
        let raw = &inner[..close];
        match raw.strip_suffix('*') {
            Some(name) => {
                template.push('*');
                names.push(name.to_string());
            }
            None => names.push(raw.to_string()),
        }
        template.push('}');
        rest = &inner[close + 1..];
    }
    template.push_str(rest);
    (template, names)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{MINIMAL, location, spec};
    use super::super::validate_oas3;
    use super::*;

    #[test]
    fn test_normalize_templated_path() {
        assert_eq!(
            normalize_templated_path("/pets/{petId}/toys/{toy}"),
            ("/pets/{}/toys/{}".to_string(), vec!["petId".to_string(), "toy".to_string()])
        );
        assert_eq!(
            normalize_templated_path("/files/{path*}"),
            ("/files/{*}".to_string(), vec!["path".to_string()])
        );
        assert_eq!(normalize_templated_path("/plain").0, "/plain");
        assert_eq!(normalize_templated_path("/broken/{x").0, "/broken/{x");
    }

    #[test]
    fn test_paths_must_not_be_empty() {
        let mut doc = spec(MINIMAL);
        doc.paths.clear();
        let err = validate_oas3(&doc).unwrap_err();
        assert_eq!(err.location(), "paths");
    }

    #[test]
    fn test_path_must_start_with_slash() {
        assert_eq!(location(&MINIMAL.replace("  /pets:", "  pets:")), "paths.pets");
    }

    #[test]
    fn test_conflicting_templates() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets/{id}:
    parameters:
      - {name: id, in: path, required: true, schema: {type: string}}
    get:
      responses: {"200": {description: ok}}
  /pets/{name}:
    parameters:
      - {name: name, in: path, required: true, schema: {type: string}}
    get:
      responses: {"200": {description: ok}}
"#;
        let err = validate_oas3(&spec(doc)).unwrap_err();
        assert_eq!(err.location(), "paths./pets/{name}");
        assert!(err.message().contains("conflicting"));
    }

    #[test]
    fn test_missing_response_description() {
        let doc = MINIMAL.replace("          description: ok", "          content: {}");
        assert_eq!(location(&doc), "paths./pets.get.responses.200.description");
    }

    #[test]
    fn test_operation_needs_a_response() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets:
    post:
      responses: {}
"#;
        assert_eq!(location(doc), "paths./pets.post.responses");
    }

    #[test]
    fn test_duplicate_parameters() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets:
    get:
      parameters:
        - {name: limit, in: query, schema: {type: integer}}
        - {name: limit, in: header, schema: {type: integer}}
        - {name: limit, in: query, schema: {type: string}}
      responses: {"200": {description: ok}}
"#;
        let err = validate_oas3(&spec(doc)).unwrap_err();
        assert_eq!(err.location(), "paths./pets.get.parameters.2");
        assert_eq!(err.message(), r#"more than one "query" parameter has name "limit""#);
    }

    #[test]
    fn test_duplicate_through_reference() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets:
    parameters:
      - $ref: '#/components/parameters/limit'
      - {name: limit, in: query, schema: {type: integer}}
    get:
      responses: {"200": {description: ok}}
components:
  parameters:
    limit: {name: limit, in: query, schema: {type: integer}}
"#;
        assert_eq!(location(doc), "paths./pets.parameters.1");
    }

    #[test]
    fn test_placeholder_must_be_declared() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets/{petId}:
    get:
      responses: {"200": {description: ok}}
"#;
        let err = validate_oas3(&spec(doc)).unwrap_err();
        assert_eq!(err.location(), "paths./pets/{petId}.get.parameters");
        assert!(err.message().contains("petId"));
    }

    #[test]
    fn test_placeholder_declared_at_path_level() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets/{petId}:
    parameters:
      - {name: petId, in: path, required: true, schema: {type: string}}
    get:
      responses: {"200": {description: ok}}
    delete:
      responses: {"204": {description: gone}}
"#;
        validate_oas3(&spec(doc)).unwrap();
    }

    #[test]
    fn test_path_parameter_outside_template() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets:
    get:
      parameters:
        - {name: petId, in: path, required: true, schema: {type: string}}
      responses: {"200": {description: ok}}
"#;
        assert_eq!(location(doc), "paths./pets.get.parameters");
    }

    #[test]
    fn test_parameter_schema_or_content() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets:
    get:
      parameters:
        - {name: q, in: query}
      responses: {"200": {description: ok}}
"#;
        assert_eq!(location(doc), "paths./pets.get.parameters.0");

        let both = doc.replace(
            "{name: q, in: query}",
            "{name: q, in: query, schema: {type: string}, content: {application/json: {schema: {type: string}}}}",
        );
        assert_eq!(location(&both), "paths./pets.get.parameters.0");

        let content = doc.replace(
            "{name: q, in: query}",
            "{name: q, in: query, content: {application/json: {schema: {type: array}}}}",
        );
        assert_eq!(
            location(&content),
            "paths./pets.get.parameters.0.content.application/json.schema.items"
        );
    }

    #[test]
    fn test_parameter_styles() {
        use ParameterLocation::*;
        assert!(style_supported(Query, "deepObject", true));
        assert!(!style_supported(Query, "deepObject", false));
        assert!(style_supported(Query, "pipeDelimited", false));
        assert!(style_supported(Path, "matrix", true));
        assert!(!style_supported(Path, "form", true));
        assert!(!style_supported(Header, "form", true));
        assert!(style_supported(Cookie, "form", false));

        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets:
    get:
      parameters:
        - {name: filter, in: query, style: deepObject, schema: {type: object}}
      responses: {"200": {description: ok}}
"#;
        let err = validate_oas3(&spec(doc)).unwrap_err();
        assert_eq!(err.location(), "paths./pets.get.parameters.0.style");
        assert!(err.message().contains("explode=false"));
    }

    #[test]
    fn test_request_body_schema_is_validated() {
        let doc = r#"
openapi: 3.0.3
info: {title: t, version: "1"}
paths:
  /pets:
    post:
      requestBody:
        content:
          application/json:
            schema:
              $ref: '#/components/schemas/Pet'
      responses: {"201": {description: created}}
"#;
        assert_eq!(
            location(doc),
            "paths./pets.post.requestBody.content.application/json.schema.$ref"
        );
    }
}

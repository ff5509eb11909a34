use indexmap::IndexMap;
use serde_json::Value;

use super::refs::{rewritten, v2_ref_to_v3};
use crate::error::ConvertError;
use crate::parse::components::Components;
use crate::parse::media_type::MediaType;
use crate::parse::operation::{Operation, PathItem};
use crate::parse::parameter::{Parameter, ParameterLocation, ParameterOrRef};
use crate::parse::request_body::{RequestBody, RequestBodyOrRef};
use crate::parse::response::{Header, HeaderOrRef, Response, ResponseOrRef};
use crate::parse::schema::{Schema, SchemaOrRef, SchemaType};
use crate::parse::security::{
    ApiKeyLocation, OAuthFlow, OAuthFlows, SecurityScheme, SecuritySchemeType,
};
use crate::parse::server::Server;
use crate::parse::spec::OpenApiSpec;
use crate::v2;

const TARGET: &str = "OpenAPI 3";
const DEFAULT_MEDIA_TYPE: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Convert a Swagger 2.0 document to OpenAPI 3.0.3.
pub fn oas2_to_oas3(swagger: &v2::Swagger) -> Result<OpenApiSpec, ConvertError> {
    V2ToV3 { swagger }.convert()
}

struct V2ToV3<'a> {
    swagger: &'a v2::Swagger,
}

/// Parameters of one operation, split by where they end up in 3.0.
#[derive(Default)]
struct SortedParameters {
    parameters: Vec<ParameterOrRef>,
    body: Option<BodySource>,
    form: Vec<v2::Parameter>,
}

enum BodySource {
    Inline(v2::Parameter),
    Ref(String),
}

impl V2ToV3<'_> {
    fn convert(&self) -> Result<OpenApiSpec, ConvertError> {
        let sw = self.swagger;
        let base_path = sw.base_path.as_deref().unwrap_or_default();

        let mut paths = IndexMap::new();
        for (path, item) in &sw.paths {
            let key = if base_path.is_empty() || base_path == "/" {
                path.clone()
            } else {
                format!("{}{}", base_path.trim_end_matches('/'), path)
            };
            paths.insert(key, self.convert_path_item(item)?);
        }

        let components = self.convert_components()?;
        Ok(OpenApiSpec {
            openapi: "3.0.3".to_string(),
            info: sw.info.clone(),
            servers: self.servers(),
            paths,
            components: (!components.is_empty()).then_some(components),
            security: sw.security.clone(),
            tags: sw.tags.clone(),
            external_docs: sw.external_docs.clone(),
            extensions: sw.extensions.clone(),
        })
    }

    /// One server for `basePath`, one for `host`, then one per scheme.
    fn servers(&self) -> Vec<Server> {
        let sw = self.swagger;
        let mut servers = Vec::new();
        if let Some(base_path) = sw.base_path.as_deref().filter(|b| !b.is_empty()) {
            servers.push(Server::new(base_path));
        }
        if let Some(host) = sw.host.as_deref().filter(|h| !h.is_empty()) {
            servers.push(Server::new(host));
        }
        servers.extend(sw.schemes.iter().map(Server::new));
        servers
    }

    fn convert_components(&self) -> Result<Components, ConvertError> {
        let sw = self.swagger;
        let mut components = Components::default();

        for (name, schema) in &sw.definitions {
            components
                .schemas
                .insert(name.clone(), rewritten(schema, v2_ref_to_v3)?);
        }

        for (name, param) in &sw.parameters {
            match param.location {
                v2::ParameterLocation::Body => {
                    let body = self.body_from_parameter(param, &sw.consumes)?;
                    components
                        .request_bodies
                        .insert(name.clone(), RequestBodyOrRef::RequestBody(body));
                }
                // Form parameters are inlined where they are used.
                v2::ParameterLocation::FormData => {}
                _ => {
                    components.parameters.insert(
                        name.clone(),
                        ParameterOrRef::Parameter(self.convert_parameter(param)?),
                    );
                }
            }
        }

        for (name, resp) in &sw.responses {
            components.responses.insert(
                name.clone(),
                ResponseOrRef::Response(self.convert_response(resp, &sw.produces)?),
            );
        }

        for (name, scheme) in &sw.security_definitions {
            components
                .security_schemes
                .insert(name.clone(), convert_security_scheme(name, scheme)?);
        }

        Ok(components)
    }

    fn convert_path_item(&self, item: &v2::PathItem) -> Result<PathItem, ConvertError> {
        let shared = self.sort_parameters(&item.parameters)?;
        let mut out = PathItem {
            parameters: shared.parameters,
            extensions: item.extensions.clone(),
            ..PathItem::default()
        };

        for (method, op) in item.operations() {
            let converted = self.convert_operation(op, shared.body.as_ref(), &shared.form)?;
            *out.operation_slot(method) = Some(converted);
        }
        Ok(out)
    }

    fn convert_operation(
        &self,
        op: &v2::Operation,
        shared_body: Option<&BodySource>,
        shared_form: &[v2::Parameter],
    ) -> Result<Operation, ConvertError> {
        let sw = self.swagger;
        let sorted = self.sort_parameters(&op.parameters)?;
        let consumes = media_types(&op.consumes, &sw.consumes);
        let produces = media_types(&op.produces, &sw.produces);

        let mut form: Vec<v2::Parameter> = shared_form.to_vec();
        for param in sorted.form {
            form.retain(|p| p.name != param.name);
            form.push(param);
        }

        let request_body = match sorted.body.as_ref().or(shared_body) {
            Some(BodySource::Ref(ref_path)) => Some(RequestBodyOrRef::Ref {
                ref_path: ref_path.clone(),
            }),
            Some(BodySource::Inline(param)) => Some(RequestBodyOrRef::RequestBody(
                self.body_from_parameter(param, &consumes)?,
            )),
            None if !form.is_empty() => Some(RequestBodyOrRef::RequestBody(
                self.form_body(&form, &consumes)?,
            )),
            None => None,
        };

        let mut responses = IndexMap::new();
        for (status, resp) in &op.responses {
            let converted = match resp {
                v2::ResponseOrRef::Ref { ref_path } => ResponseOrRef::Ref {
                    ref_path: v2_ref_to_v3(ref_path)?,
                },
                v2::ResponseOrRef::Response(r) => {
                    ResponseOrRef::Response(self.convert_response(r, &produces)?)
                }
            };
            responses.insert(status.clone(), converted);
        }

        if !op.schemes.is_empty() {
            log::debug!("dropping operation-level schemes {:?}", op.schemes);
        }

        Ok(Operation {
            tags: op.tags.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            external_docs: op.external_docs.clone(),
            operation_id: op.operation_id.clone(),
            parameters: sorted.parameters,
            request_body,
            responses,
            deprecated: op.deprecated,
            security: op.security.clone(),
            extensions: op.extensions.clone(),
        })
    }

    /// Split 2.0 parameters into 3.0 parameters, the body and form fields,
    /// resolving references into the top-level parameters table.
    fn sort_parameters(
        &self,
        params: &[v2::ParameterOrRef],
    ) -> Result<SortedParameters, ConvertError> {
        let mut sorted = SortedParameters::default();
        for param in params {
            match param {
                v2::ParameterOrRef::Ref { ref_path } => {
                    let name = ref_path
                        .strip_prefix("#/parameters/")
                        .ok_or_else(|| ConvertError::InvalidReference(ref_path.clone()))?;
                    let target = self
                        .swagger
                        .parameters
                        .get(name)
                        .ok_or_else(|| ConvertError::InvalidReference(ref_path.clone()))?;
                    match target.location {
                        v2::ParameterLocation::Body => {
                            sorted.body = Some(BodySource::Ref(format!(
                                "#/components/requestBodies/{}",
                                name
                            )));
                        }
                        v2::ParameterLocation::FormData => sorted.form.push(target.clone()),
                        _ => sorted.parameters.push(ParameterOrRef::Ref {
                            ref_path: v2_ref_to_v3(ref_path)?,
                        }),
                    }
                }
                v2::ParameterOrRef::Parameter(p) => match p.location {
                    v2::ParameterLocation::Body => {
                        sorted.body = Some(BodySource::Inline(p.as_ref().clone()));
                    }
                    v2::ParameterLocation::FormData => sorted.form.push(p.as_ref().clone()),
                    _ => sorted
                        .parameters
                        .push(ParameterOrRef::Parameter(self.convert_parameter(p)?)),
                },
            }
        }
        Ok(sorted)
    }

    fn convert_parameter(&self, param: &v2::Parameter) -> Result<Parameter, ConvertError> {
        let location = match param.location {
            v2::ParameterLocation::Query => ParameterLocation::Query,
            v2::ParameterLocation::Header => ParameterLocation::Header,
            v2::ParameterLocation::Path => ParameterLocation::Path,
            v2::ParameterLocation::FormData | v2::ParameterLocation::Body => {
                return Err(ConvertError::UnsupportedParameterLocation {
                    name: param.name.clone(),
                    location: format!("{:?}", param.location),
                    target: TARGET,
                });
            }
        };

        let schema = flat_schema(param)?;
        let mut out = Parameter::new(param.name.clone(), location);
        out.description = param.description.clone();
        out.required = param.required || location == ParameterLocation::Path;
        out.allow_empty_value = param.allow_empty_value;
        if schema.is_type(SchemaType::Array) {
            let (style, explode) = collection_style(param.collection_format, location);
            out.style = style.map(str::to_string);
            out.explode = explode;
        }
        out.schema = Some(SchemaOrRef::inline(schema));
        out.extensions = param.extensions.clone();
        Ok(out)
    }

    fn body_from_parameter(
        &self,
        param: &v2::Parameter,
        consumes: &[String],
    ) -> Result<RequestBody, ConvertError> {
        let schema = match &param.schema {
            Some(schema) => rewritten(schema, v2_ref_to_v3)?,
            None => SchemaOrRef::default(),
        };
        let content = media_types(consumes, &[])
            .into_iter()
            .map(|mt| (mt, MediaType::with_schema(schema.clone())))
            .collect();
        Ok(RequestBody {
            description: param.description.clone(),
            content,
            required: param.required,
        })
    }

    fn form_body(
        &self,
        form: &[v2::Parameter],
        consumes: &[String],
    ) -> Result<RequestBody, ConvertError> {
        let multipart =
            form.iter().any(v2::Parameter::is_file) || consumes.iter().any(|c| c == MULTIPART);
        let media_type = if multipart { MULTIPART } else { FORM_URLENCODED };

        let mut schema = Schema::of_type(SchemaType::Object);
        for param in form {
            let mut prop = flat_schema(param)?;
            if prop.description.is_none() {
                prop.description = param.description.clone();
            }
            schema
                .properties
                .insert(param.name.clone(), SchemaOrRef::inline(prop));
            if param.required {
                schema.required.push(param.name.clone());
            }
        }

        let mut content = IndexMap::new();
        content.insert(
            media_type.to_string(),
            MediaType::with_schema(SchemaOrRef::inline(schema)),
        );
        Ok(RequestBody {
            description: None,
            content,
            required: form.iter().any(|p| p.required),
        })
    }

    fn convert_response(
        &self,
        resp: &v2::Response,
        produces: &[String],
    ) -> Result<Response, ConvertError> {
        let mut content = IndexMap::new();
        if let Some(schema) = &resp.schema {
            let schema = rewritten(schema, v2_ref_to_v3)?;
            for mt in media_types(produces, &[]) {
                let mut media = MediaType::with_schema(schema.clone());
                media.example = resp.examples.get(&mt).cloned();
                content.insert(mt, media);
            }
            for (mt, example) in &resp.examples {
                if !content.contains_key(mt) {
                    let mut media = MediaType::with_schema(schema.clone());
                    media.example = Some(example.clone());
                    content.insert(mt.clone(), media);
                }
            }
        }

        let mut headers = IndexMap::new();
        for (name, header) in &resp.headers {
            headers.insert(name.clone(), HeaderOrRef::Header(convert_header(name, header)?));
        }

        Ok(Response {
            description: Some(resp.description.clone()),
            headers,
            content,
        })
    }
}

/// Operation-level media types win over document-level ones; JSON when
/// neither is set.
fn media_types(local: &[String], global: &[String]) -> Vec<String> {
    if !local.is_empty() {
        local.to_vec()
    } else if !global.is_empty() {
        global.to_vec()
    } else {
        vec![DEFAULT_MEDIA_TYPE.to_string()]
    }
}

fn parse_type(name: &str, type_name: &str) -> Result<SchemaType, ConvertError> {
    serde_json::from_value(Value::String(type_name.to_string())).map_err(|_| {
        ConvertError::UnsupportedType {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    })
}

/// Schema described by the flat type fields of a non-body parameter.
fn flat_schema(param: &v2::Parameter) -> Result<Schema, ConvertError> {
    let type_name = param
        .param_type
        .as_deref()
        .ok_or_else(|| ConvertError::MissingParameterType(param.name.clone()))?;

    let mut schema = if param.is_file() {
        Schema {
            format: Some("binary".to_string()),
            ..Schema::of_type(SchemaType::String)
        }
    } else {
        Schema {
            format: param.format.clone(),
            ..Schema::of_type(parse_type(&param.name, type_name)?)
        }
    };

    schema.items = param
        .items
        .as_ref()
        .map(|items| Box::new(SchemaOrRef::inline(items.as_ref().clone())));
    schema.default_value = param.default_value.clone();
    schema.enum_values = param.enum_values.clone();
    schema.maximum = param.maximum;
    schema.exclusive_maximum = param.exclusive_maximum;
    schema.minimum = param.minimum;
    schema.exclusive_minimum = param.exclusive_minimum;
    schema.max_length = param.max_length;
    schema.min_length = param.min_length;
    schema.pattern = param.pattern.clone();
    schema.max_items = param.max_items;
    schema.min_items = param.min_items;
    schema.unique_items = param.unique_items;
    schema.multiple_of = param.multiple_of;
    Ok(schema)
}

/// `collectionFormat` as a 3.0 `style`/`explode` pair.
fn collection_style(
    format: Option<v2::CollectionFormat>,
    location: ParameterLocation,
) -> (Option<&'static str>, Option<bool>) {
    let simple = matches!(location, ParameterLocation::Path | ParameterLocation::Header);
    match format {
        Some(v2::CollectionFormat::Multi) => (Some("form"), Some(true)),
        Some(v2::CollectionFormat::Ssv) => (Some("spaceDelimited"), Some(false)),
        Some(v2::CollectionFormat::Pipes) => (Some("pipeDelimited"), Some(false)),
        Some(v2::CollectionFormat::Tsv) => {
            log::warn!("collectionFormat tsv has no OpenAPI 3 style, using csv");
            (Some(if simple { "simple" } else { "form" }), Some(false))
        }
        Some(v2::CollectionFormat::Csv) | None => {
            (Some(if simple { "simple" } else { "form" }), Some(false))
        }
    }
}

fn convert_header(name: &str, header: &v2::ResponseHeader) -> Result<Header, ConvertError> {
    let ty = parse_type(name, &header.header_type)?;
    let schema = Schema {
        format: header.format.clone(),
        items: header
            .items
            .as_ref()
            .map(|items| Box::new(SchemaOrRef::inline(items.as_ref().clone()))),
        default_value: header.default_value.clone(),
        enum_values: header.enum_values.clone(),
        ..Schema::of_type(ty)
    };
    Ok(Header {
        description: header.description.clone(),
        schema: Some(SchemaOrRef::inline(schema)),
        ..Header::default()
    })
}

fn convert_security_scheme(
    name: &str,
    scheme: &v2::SecurityScheme,
) -> Result<SecurityScheme, ConvertError> {
    let mut out = match scheme.scheme_type {
        v2::SecuritySchemeType::Basic => SecurityScheme {
            scheme: Some("basic".to_string()),
            ..SecurityScheme::new(SecuritySchemeType::Http)
        },
        v2::SecuritySchemeType::ApiKey => {
            let location = match scheme.location.as_deref() {
                Some("query") => ApiKeyLocation::Query,
                Some("header") => ApiKeyLocation::Header,
                _ => {
                    return Err(ConvertError::IncompleteSecurityScheme {
                        name: name.to_string(),
                        field: "in",
                    });
                }
            };
            let key_name = scheme
                .name
                .clone()
                .ok_or_else(|| ConvertError::IncompleteSecurityScheme {
                    name: name.to_string(),
                    field: "name",
                })?;
            SecurityScheme {
                name: Some(key_name),
                location: Some(location),
                ..SecurityScheme::new(SecuritySchemeType::ApiKey)
            }
        }
        v2::SecuritySchemeType::OAuth2 => {
            let flow_kind = scheme
                .flow
                .ok_or_else(|| ConvertError::IncompleteSecurityScheme {
                    name: name.to_string(),
                    field: "flow",
                })?;
            let flow = OAuthFlow {
                authorization_url: scheme.authorization_url.clone(),
                token_url: scheme.token_url.clone(),
                refresh_url: None,
                scopes: Some(scheme.scopes.clone()),
            };
            let mut flows = OAuthFlows::default();
            match flow_kind {
                v2::OAuth2Flow::Implicit => flows.implicit = Some(flow),
                v2::OAuth2Flow::Password => flows.password = Some(flow),
                v2::OAuth2Flow::Application => flows.client_credentials = Some(flow),
                v2::OAuth2Flow::AccessCode => flows.authorization_code = Some(flow),
            }
            SecurityScheme {
                flows: Some(flows),
                ..SecurityScheme::new(SecuritySchemeType::OAuth2)
            }
        }
    };
    out.description = scheme.description.clone();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swagger(yaml: &str) -> v2::Swagger {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_collection_formats_map_to_styles() {
        assert_eq!(
            collection_style(Some(v2::CollectionFormat::Multi), ParameterLocation::Query),
            (Some("form"), Some(true))
        );
        assert_eq!(
            collection_style(None, ParameterLocation::Path),
            (Some("simple"), Some(false))
        );
        assert_eq!(
            collection_style(Some(v2::CollectionFormat::Pipes), ParameterLocation::Query),
            (Some("pipeDelimited"), Some(false))
        );
    }

    #[test]
    fn test_file_parameter_makes_multipart_body() {
        let sw = swagger(
            r#"
swagger: "2.0"
info: {title: t, version: "1"}
paths:
  /upload:
    post:
      parameters:
        - {name: file, in: formData, type: file, required: true}
        - {name: note, in: formData, type: string}
      responses:
        "200": {description: ok}
"#,
        );
        let spec = oas2_to_oas3(&sw).unwrap();
        let op = spec.paths["/upload"].post.as_ref().unwrap();
        let Some(RequestBodyOrRef::RequestBody(body)) = &op.request_body else {
            panic!("expected inline body");
        };
        let media = &body.content[MULTIPART];
        let schema = media.schema.as_ref().unwrap().as_schema().unwrap();
        assert_eq!(schema.required, vec!["file"]);
        let file = schema.properties["file"].as_schema().unwrap();
        assert_eq!(file.format.as_deref(), Some("binary"));
        assert!(body.required);
    }

    #[test]
    fn test_form_without_files_is_urlencoded() {
        let sw = swagger(
            r#"
swagger: "2.0"
info: {title: t, version: "1"}
paths:
  /login:
    post:
      parameters:
        - {name: user, in: formData, type: string}
      responses:
        "200": {description: ok}
"#,
        );
        let spec = oas2_to_oas3(&sw).unwrap();
        let op = spec.paths["/login"].post.as_ref().unwrap();
        let Some(RequestBodyOrRef::RequestBody(body)) = &op.request_body else {
            panic!("expected inline body");
        };
        assert!(body.content.contains_key(FORM_URLENCODED));
        assert!(!body.required);
    }

    #[test]
    fn test_missing_parameter_type_is_an_error() {
        let sw = swagger(
            r#"
swagger: "2.0"
info: {title: t, version: "1"}
paths:
  /a:
    get:
      parameters:
        - {name: q, in: query}
      responses:
        "200": {description: ok}
"#,
        );
        let err = oas2_to_oas3(&sw).unwrap_err();
        assert!(matches!(err, ConvertError::MissingParameterType(n) if n == "q"));
    }

    #[test]
    fn test_oauth2_application_flow_becomes_client_credentials() {
        let scheme = v2::SecurityScheme {
            flow: Some(v2::OAuth2Flow::Application),
            token_url: Some("https://auth.example.com/token".to_string()),
            ..v2::SecurityScheme::new(v2::SecuritySchemeType::OAuth2)
        };
        let out = convert_security_scheme("oauth", &scheme).unwrap();
        let flows = out.flows.unwrap();
        let flow = flows.client_credentials.unwrap();
        assert_eq!(flow.token_url.as_deref(), Some("https://auth.example.com/token"));
        assert_eq!(flow.scopes, Some(IndexMap::new()));
    }
}

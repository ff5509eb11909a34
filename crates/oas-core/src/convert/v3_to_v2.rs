use indexmap::IndexMap;

use super::refs::{rewritten, v3_ref_to_v2};
use crate::error::ConvertError;
use crate::parse::components::Components;
use crate::parse::media_type::MediaType;
use crate::parse::operation::{Operation, PathItem};
use crate::parse::parameter::{Parameter, ParameterLocation, ParameterOrRef};
use crate::parse::request_body::{RequestBody, RequestBodyOrRef};
use crate::parse::response::{Header, HeaderOrRef, Response, ResponseOrRef};
use crate::parse::schema::{SchemaOrRef, SchemaType};
use crate::parse::security::{ApiKeyLocation, OAuthFlowKind, SecurityScheme, SecuritySchemeType};
use crate::parse::spec::OpenApiSpec;
use crate::v2;

const TARGET: &str = "Swagger 2.0";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";

/// Convert an OpenAPI 3 document to Swagger 2.0.
pub fn oas3_to_oas2(spec: &OpenApiSpec) -> Result<v2::Swagger, ConvertError> {
    let empty = Components::default();
    let components = spec.components.as_ref().unwrap_or(&empty);
    V3ToV2 {
        components,
        consumes: Vec::new(),
        produces: Vec::new(),
    }
    .convert(spec)
}

struct V3ToV2<'a> {
    components: &'a Components,
    consumes: Vec<String>,
    produces: Vec<String>,
}

/// Where the servers list places the API.
#[derive(Debug, Default, PartialEq)]
struct Location {
    host: Option<String>,
    base_path: Option<String>,
    schemes: Vec<String>,
}

impl V3ToV2<'_> {
    fn convert(mut self, spec: &OpenApiSpec) -> Result<v2::Swagger, ConvertError> {
        let location = read_servers(spec);
        let base_path = location.base_path.as_deref().unwrap_or_default();

        let mut paths = IndexMap::new();
        for (path, item) in &spec.paths {
            paths.insert(strip_base_path(path, base_path), self.convert_path_item(path, item)?);
        }

        let mut definitions = IndexMap::new();
        for (name, schema) in &self.components.schemas {
            definitions.insert(name.clone(), rewritten(schema, v3_ref_to_v2)?);
        }

        let mut parameters = IndexMap::new();
        for (name, param) in &self.components.parameters {
            match param {
                ParameterOrRef::Parameter(p) => {
                    parameters.insert(name.clone(), self.convert_parameter(p)?);
                }
                ParameterOrRef::Ref { ref_path } => {
                    log::warn!("dropping aliased parameter `{}` -> {}", name, ref_path);
                }
            }
        }
        for (name, body) in &self.components.request_bodies {
            if parameters.contains_key(name) {
                log::warn!("request body `{}` replaces the parameter of the same name", name);
            }
            match body {
                RequestBodyOrRef::RequestBody(rb) => {
                    parameters.insert(name.clone(), self.body_parameter(rb)?);
                }
                RequestBodyOrRef::Ref { ref_path } => {
                    log::warn!("dropping aliased request body `{}` -> {}", name, ref_path);
                }
            }
        }

        let mut responses = IndexMap::new();
        for (name, resp) in &self.components.responses {
            match resp {
                ResponseOrRef::Response(r) => {
                    responses.insert(name.clone(), self.convert_response(r)?);
                }
                ResponseOrRef::Ref { ref_path } => {
                    log::warn!("dropping aliased response `{}` -> {}", name, ref_path);
                }
            }
        }

        let mut security_definitions = IndexMap::new();
        for (name, scheme) in &self.components.security_schemes {
            security_definitions.insert(name.clone(), convert_security_scheme(name, scheme)?);
        }

        Ok(v2::Swagger {
            swagger: "2.0".to_string(),
            info: spec.info.clone(),
            host: location.host,
            base_path: location.base_path,
            schemes: location.schemes,
            consumes: self.consumes,
            produces: self.produces,
            paths,
            definitions,
            parameters,
            responses,
            security_definitions,
            security: spec.security.clone(),
            tags: spec.tags.clone(),
            external_docs: spec.external_docs.clone(),
            extensions: spec.extensions.clone(),
        })
    }

    fn convert_path_item(&mut self, path: &str, item: &PathItem) -> Result<v2::PathItem, ConvertError> {
        let mut out = v2::PathItem {
            parameters: self.convert_parameters(&item.parameters)?,
            extensions: item.extensions.clone(),
            ..v2::PathItem::default()
        };
        for (method, op) in item.operations() {
            let converted = self.convert_operation(op)?;
            match out.operation_slot(method) {
                Some(slot) => *slot = Some(converted),
                None => log::warn!("dropping {} {}: no such method in {}", method, path, TARGET),
            }
        }
        Ok(out)
    }

    fn convert_operation(&mut self, op: &Operation) -> Result<v2::Operation, ConvertError> {
        let mut parameters = self.convert_parameters(&op.parameters)?;
        let mut consumes = Vec::new();

        match &op.request_body {
            Some(RequestBodyOrRef::Ref { ref_path }) => {
                parameters.push(v2::ParameterOrRef::Ref {
                    ref_path: v3_ref_to_v2(ref_path)?,
                });
                let name = ref_path.rsplit('/').next().unwrap_or_default();
                if let Some(RequestBodyOrRef::RequestBody(rb)) =
                    self.components.request_bodies.get(name)
                {
                    consumes.extend(rb.content.keys().cloned());
                }
            }
            Some(RequestBodyOrRef::RequestBody(rb)) => {
                consumes.extend(rb.content.keys().cloned());
                match form_fields(rb)? {
                    Some(fields) => parameters.extend(
                        fields
                            .into_iter()
                            .map(|p| v2::ParameterOrRef::Parameter(Box::new(p))),
                    ),
                    None => parameters.push(v2::ParameterOrRef::Parameter(Box::new(
                        self.body_parameter(rb)?,
                    ))),
                }
            }
            None => {}
        }

        let mut produces = Vec::new();
        let mut responses = IndexMap::new();
        for (status, resp) in &op.responses {
            let converted = match resp {
                ResponseOrRef::Ref { ref_path } => v2::ResponseOrRef::Ref {
                    ref_path: v3_ref_to_v2(ref_path)?,
                },
                ResponseOrRef::Response(r) => {
                    push_unique(&mut produces, r.content.keys());
                    v2::ResponseOrRef::Response(self.convert_response(r)?)
                }
            };
            responses.insert(status.clone(), converted);
        }

        push_unique(&mut self.consumes, consumes.iter());
        push_unique(&mut self.produces, produces.iter());

        Ok(v2::Operation {
            tags: op.tags.clone(),
            summary: op.summary.clone(),
            description: op.description.clone(),
            external_docs: op.external_docs.clone(),
            operation_id: op.operation_id.clone(),
            consumes,
            produces,
            parameters,
            responses,
            schemes: Vec::new(),
            deprecated: op.deprecated,
            security: op.security.clone(),
            extensions: op.extensions.clone(),
        })
    }

    fn convert_parameters(
        &self,
        params: &[ParameterOrRef],
    ) -> Result<Vec<v2::ParameterOrRef>, ConvertError> {
        params
            .iter()
            .map(|param| match param {
                ParameterOrRef::Ref { ref_path } => Ok(v2::ParameterOrRef::Ref {
                    ref_path: v3_ref_to_v2(ref_path)?,
                }),
                ParameterOrRef::Parameter(p) => {
                    Ok(v2::ParameterOrRef::Parameter(Box::new(self.convert_parameter(p)?)))
                }
            })
            .collect()
    }

    fn convert_parameter(&self, param: &Parameter) -> Result<v2::Parameter, ConvertError> {
        let location = match param.location {
            ParameterLocation::Query => v2::ParameterLocation::Query,
            ParameterLocation::Header => v2::ParameterLocation::Header,
            ParameterLocation::Path => v2::ParameterLocation::Path,
            ParameterLocation::Cookie => {
                return Err(ConvertError::UnsupportedParameterLocation {
                    name: param.name.clone(),
                    location: param.location.as_str().to_string(),
                    target: TARGET,
                });
            }
        };
        let schema = match &param.schema {
            Some(schema) => schema,
            None if !param.content.is_empty() => {
                return Err(ConvertError::ParameterContent(param.name.clone()));
            }
            None => return Err(ConvertError::MissingParameterType(param.name.clone())),
        };

        let mut out = flat_parameter(&param.name, location, schema)?;
        out.description = param.description.clone();
        out.required = param.required;
        out.allow_empty_value = param.allow_empty_value;
        if out.param_type.as_deref() == Some("array") {
            out.collection_format = collection_format(param);
        }
        out.extensions = param.extensions.clone();
        Ok(out)
    }

    /// A `body` parameter carrying the first media type's schema.
    fn body_parameter(&self, body: &RequestBody) -> Result<v2::Parameter, ConvertError> {
        let schema = match body.content.values().find_map(|mt| mt.schema.as_ref()) {
            Some(schema) => rewritten(schema, v3_ref_to_v2)?,
            None => SchemaOrRef::default(),
        };
        let mut param = v2::Parameter::new("body", v2::ParameterLocation::Body);
        param.description = body.description.clone();
        param.required = body.required;
        param.schema = Some(schema);
        Ok(param)
    }

    fn convert_response(&self, resp: &Response) -> Result<v2::Response, ConvertError> {
        let schema = match resp.content.values().find_map(|mt| mt.schema.as_ref()) {
            Some(schema) => Some(rewritten(schema, v3_ref_to_v2)?),
            None => None,
        };
        let examples = resp
            .content
            .iter()
            .filter_map(|(mt, media)| media.example.clone().map(|ex| (mt.clone(), ex)))
            .collect();

        let mut headers = IndexMap::new();
        for (name, header) in &resp.headers {
            match header {
                HeaderOrRef::Header(h) => {
                    headers.insert(name.clone(), convert_header(name, h)?);
                }
                HeaderOrRef::Ref { ref_path } => {
                    let target = ref_path.rsplit('/').next().unwrap_or_default();
                    match self.components.headers.get(target) {
                        Some(HeaderOrRef::Header(h)) => {
                            headers.insert(name.clone(), convert_header(name, h)?);
                        }
                        _ => return Err(ConvertError::InvalidReference(ref_path.clone())),
                    }
                }
            }
        }

        Ok(v2::Response {
            description: resp.description.clone().unwrap_or_default(),
            schema,
            headers,
            examples,
            extensions: Default::default(),
        })
    }
}

/// Split the servers list into `basePath`, `host` and `schemes`. The first
/// host and base path found win.
fn read_servers(spec: &OpenApiSpec) -> Location {
    let mut location = Location::default();
    for server in &spec.servers {
        let url = server.url.as_str();
        if url.is_empty() {
            continue;
        }
        if url.starts_with('/') {
            location.base_path.get_or_insert_with(|| url.to_string());
        } else if matches!(url, "http" | "https" | "ws" | "wss") {
            push_unique(&mut location.schemes, std::iter::once(&url.to_string()));
        } else if let Some((scheme, rest)) = url.split_once("://") {
            push_unique(&mut location.schemes, std::iter::once(&scheme.to_string()));
            let (host, path) = match rest.split_once('/') {
                Some((host, path)) => (host, format!("/{}", path)),
                None => (rest, String::new()),
            };
            if !host.is_empty() {
                location.host.get_or_insert_with(|| host.to_string());
            }
            if !path.is_empty() && path != "/" {
                location.base_path.get_or_insert(path);
            }
        } else {
            location.host.get_or_insert_with(|| url.to_string());
        }
    }
    location
}

fn strip_base_path(path: &str, base_path: &str) -> String {
    let base = base_path.trim_end_matches('/');
    if base.is_empty() {
        return path.to_string();
    }
    match path.strip_prefix(base) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => path.to_string(),
    }
}

fn push_unique<'s>(into: &mut Vec<String>, items: impl Iterator<Item = &'s String>) {
    for item in items {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

/// Form bodies become `formData` parameters, one per property of an inline
/// object schema. Anything else is a plain body.
fn form_fields(body: &RequestBody) -> Result<Option<Vec<v2::Parameter>>, ConvertError> {
    if body.content.is_empty()
        || !body
            .content
            .keys()
            .all(|mt| mt == FORM_URLENCODED || mt == MULTIPART)
    {
        return Ok(None);
    }
    let Some(schema) = body
        .content
        .values()
        .find_map(|mt: &MediaType| mt.schema.as_ref().and_then(SchemaOrRef::as_schema))
    else {
        return Ok(None);
    };

    let mut fields = Vec::new();
    for (name, prop) in &schema.properties {
        let mut param = flat_parameter(name, v2::ParameterLocation::FormData, prop)?;
        if let Some(inline) = prop.as_schema() {
            if inline.is_type(SchemaType::String) && inline.format.as_deref() == Some("binary") {
                param.param_type = Some("file".to_string());
                param.format = None;
            }
            param.description = inline.description.clone();
        }
        param.required = schema.required.contains(name);
        fields.push(param);
    }
    Ok(Some(fields))
}

/// A non-body parameter described by flat type fields.
fn flat_parameter(
    name: &str,
    location: v2::ParameterLocation,
    schema: &SchemaOrRef,
) -> Result<v2::Parameter, ConvertError> {
    let schema = match schema {
        SchemaOrRef::Schema(schema) => schema,
        SchemaOrRef::Ref { ref_path } => {
            return Err(ConvertError::UnsupportedType {
                name: name.to_string(),
                type_name: ref_path.clone(),
            });
        }
    };
    let ty = schema
        .primary_type()
        .ok_or_else(|| ConvertError::MissingParameterType(name.to_string()))?;
    if matches!(ty, SchemaType::Object | SchemaType::Null) {
        return Err(ConvertError::UnsupportedType {
            name: name.to_string(),
            type_name: type_name(ty).to_string(),
        });
    }

    let mut param = v2::Parameter::new(name, location);
    param.param_type = Some(type_name(ty).to_string());
    param.format = schema.format.clone();
    param.items = match schema.items.as_deref() {
        Some(SchemaOrRef::Schema(items)) => Some(items.clone()),
        Some(SchemaOrRef::Ref { ref_path }) => {
            return Err(ConvertError::UnsupportedType {
                name: name.to_string(),
                type_name: ref_path.clone(),
            });
        }
        None => None,
    };
    param.default_value = schema.default_value.clone();
    param.enum_values = schema.enum_values.clone();
    param.maximum = schema.maximum;
    param.exclusive_maximum = schema.exclusive_maximum;
    param.minimum = schema.minimum;
    param.exclusive_minimum = schema.exclusive_minimum;
    param.max_length = schema.max_length;
    param.min_length = schema.min_length;
    param.pattern = schema.pattern.clone();
    param.max_items = schema.max_items;
    param.min_items = schema.min_items;
    param.unique_items = schema.unique_items;
    param.multiple_of = schema.multiple_of;
    Ok(param)
}

fn type_name(ty: SchemaType) -> &'static str {
    match ty {
        SchemaType::String => "string",
        SchemaType::Number => "number",
        SchemaType::Integer => "integer",
        SchemaType::Boolean => "boolean",
        SchemaType::Array => "array",
        SchemaType::Object => "object",
        SchemaType::Null => "null",
    }
}

fn collection_format(param: &Parameter) -> Option<v2::CollectionFormat> {
    let explode = param
        .explode
        .unwrap_or(param.style.as_deref().is_none_or(|s| s == "form"));
    match param.style.as_deref() {
        Some("spaceDelimited") => Some(v2::CollectionFormat::Ssv),
        Some("pipeDelimited") => Some(v2::CollectionFormat::Pipes),
        Some("simple") => Some(v2::CollectionFormat::Csv),
        _ if param.location == ParameterLocation::Query && explode => {
            Some(v2::CollectionFormat::Multi)
        }
        _ => Some(v2::CollectionFormat::Csv),
    }
}

fn convert_header(name: &str, header: &Header) -> Result<v2::ResponseHeader, ConvertError> {
    let param = match &header.schema {
        Some(schema) => flat_parameter(name, v2::ParameterLocation::Header, schema)?,
        None => return Err(ConvertError::MissingParameterType(name.to_string())),
    };
    Ok(v2::ResponseHeader {
        description: header.description.clone(),
        header_type: param.param_type.unwrap_or_default(),
        format: param.format,
        items: param.items,
        collection_format: None,
        default_value: param.default_value,
        enum_values: param.enum_values,
        extensions: Default::default(),
    })
}

fn convert_security_scheme(
    name: &str,
    scheme: &SecurityScheme,
) -> Result<v2::SecurityScheme, ConvertError> {
    let unsupported = |kind: &str| ConvertError::UnsupportedSecurityScheme {
        name: name.to_string(),
        kind: kind.to_string(),
        target: TARGET,
    };

    let mut out = match scheme.scheme_type {
        SecuritySchemeType::ApiKey => {
            let location = match scheme.location {
                Some(ApiKeyLocation::Query) => "query",
                Some(ApiKeyLocation::Header) => "header",
                Some(ApiKeyLocation::Cookie) => return Err(unsupported("apiKey in cookie")),
                None => {
                    return Err(ConvertError::IncompleteSecurityScheme {
                        name: name.to_string(),
                        field: "in",
                    });
                }
            };
            v2::SecurityScheme {
                name: scheme.name.clone(),
                location: Some(location.to_string()),
                ..v2::SecurityScheme::new(v2::SecuritySchemeType::ApiKey)
            }
        }
        SecuritySchemeType::Http => match scheme.scheme.as_deref().map(str::to_ascii_lowercase) {
            Some(s) if s == "basic" => v2::SecurityScheme::new(v2::SecuritySchemeType::Basic),
            Some(s) if s == "bearer" => {
                log::warn!(
                    "security scheme `{}`: bearer auth becomes an `Authorization` header API key",
                    name
                );
                v2::SecurityScheme {
                    name: Some("Authorization".to_string()),
                    location: Some("header".to_string()),
                    ..v2::SecurityScheme::new(v2::SecuritySchemeType::ApiKey)
                }
            }
            Some(other) => return Err(unsupported(&format!("http/{}", other))),
            None => {
                return Err(ConvertError::IncompleteSecurityScheme {
                    name: name.to_string(),
                    field: "scheme",
                });
            }
        },
        SecuritySchemeType::OAuth2 => {
            let flows = scheme
                .flows
                .as_ref()
                .ok_or_else(|| ConvertError::IncompleteSecurityScheme {
                    name: name.to_string(),
                    field: "flows",
                })?;
            let mut iter = flows.iter();
            let (kind, flow) = iter
                .next()
                .ok_or_else(|| ConvertError::IncompleteSecurityScheme {
                    name: name.to_string(),
                    field: "flows",
                })?;
            if iter.next().is_some() {
                log::warn!(
                    "security scheme `{}`: keeping only the {} flow",
                    name,
                    kind.as_str()
                );
            }
            let v2_flow = match kind {
                OAuthFlowKind::Implicit => v2::OAuth2Flow::Implicit,
                OAuthFlowKind::Password => v2::OAuth2Flow::Password,
                OAuthFlowKind::ClientCredentials => v2::OAuth2Flow::Application,
                OAuthFlowKind::AuthorizationCode => v2::OAuth2Flow::AccessCode,
            };
            v2::SecurityScheme {
                flow: Some(v2_flow),
                authorization_url: flow.authorization_url.clone(),
                token_url: flow.token_url.clone(),
                scopes: flow.scopes.clone().unwrap_or_default(),
                ..v2::SecurityScheme::new(v2::SecuritySchemeType::OAuth2)
            }
        }
        SecuritySchemeType::OpenIdConnect | SecuritySchemeType::MutualTls => {
            return Err(unsupported(scheme.scheme_type.as_str()));
        }
    };
    out.description = scheme.description.clone();
    Ok(out)
}

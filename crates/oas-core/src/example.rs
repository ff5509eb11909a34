use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Map, Value};

use crate::parse::components::Components;
use crate::parse::media_type::MediaType;
use crate::parse::request_body::RequestBodyOrRef;
use crate::parse::response::ResponseOrRef;
use crate::parse::schema::{Schema, SchemaOrRef, SchemaType};
use crate::parse::spec::OpenApiSpec;

/// Characters escaped in form values: everything but `A-Za-z0-9-_.~`.
const FORM_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Fill in `example` on an expanded schema, rendered for `content_type`.
///
/// Nested schemas receive the raw example value; the top level receives the
/// whole tree serialized as text, JSON for JSON-like and unknown content
/// types and `key=value&...` for form bodies. A schema that already has an
/// example is left untouched.
pub fn gen_example_from_expanded_schema(content_type: &str, schema: &mut Schema) {
    if schema.example.is_some() {
        return;
    }
    let value = build_example(schema);
    let text = if is_form(content_type) {
        form_encode(&value)
    } else {
        value.to_string()
    };
    schema.example = Some(Value::String(text));
}

/// Generate examples for every inline request body and response schema,
/// using each media type as the content type.
pub fn generate_examples(spec: &mut OpenApiSpec) {
    for item in spec.paths.values_mut() {
        for (_, op) in item.operations_mut() {
            if let Some(RequestBodyOrRef::RequestBody(body)) = &mut op.request_body {
                fill_content(body.content.iter_mut());
            }
            for resp in op.responses.values_mut() {
                if let ResponseOrRef::Response(r) = resp {
                    fill_content(r.content.iter_mut());
                }
            }
        }
    }

    if let Some(Components {
        request_bodies,
        responses,
        ..
    }) = &mut spec.components
    {
        for body in request_bodies.values_mut() {
            if let RequestBodyOrRef::RequestBody(body) = body {
                fill_content(body.content.iter_mut());
            }
        }
        for resp in responses.values_mut() {
            if let ResponseOrRef::Response(r) = resp {
                fill_content(r.content.iter_mut());
            }
        }
    }
}

fn fill_content<'a>(content: impl Iterator<Item = (&'a String, &'a mut MediaType)>) {
    for (media_type, media) in content {
        if let Some(SchemaOrRef::Schema(schema)) = &mut media.schema {
            gen_example_from_expanded_schema(media_type, schema);
        }
    }
}

/// The example of a nested node, stored on it as a raw value.
fn node_example(node: &mut SchemaOrRef) -> Value {
    match node {
        SchemaOrRef::Schema(schema) => {
            if let Some(existing) = &schema.example {
                return existing.clone();
            }
            let value = build_example(schema);
            schema.example = Some(value.clone());
            value
        }
        SchemaOrRef::Ref { .. } => Value::Null,
    }
}

fn build_example(schema: &mut Schema) -> Value {
    let ty = schema.primary_type().or_else(|| {
        if !schema.properties.is_empty() {
            Some(SchemaType::Object)
        } else if schema.items.is_some() {
            Some(SchemaType::Array)
        } else {
            None
        }
    });

    match ty {
        Some(SchemaType::Boolean) => Value::Bool(true),
        Some(SchemaType::Integer | SchemaType::Number) => Value::from(0),
        Some(SchemaType::String) => Value::String(String::new()),
        Some(SchemaType::Object) => {
            let mut map = Map::new();
            for (name, prop) in schema.properties.iter_mut() {
                map.insert(name.clone(), node_example(prop));
            }
            Value::Object(map)
        }
        Some(SchemaType::Array) => {
            let item = schema
                .items
                .as_deref_mut()
                .map(node_example)
                .unwrap_or(Value::Null);
            Value::Array(vec![item])
        }
        Some(SchemaType::Null) | None => Value::Null,
    }
}

fn is_form(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    essence.eq_ignore_ascii_case(FORM_URLENCODED)
}

/// `key=value&...` in property order. Strings are used as-is, anything else
/// is JSON encoded first.
fn form_encode(value: &Value) -> String {
    let Value::Object(map) = value else {
        return value.to_string();
    };
    map.iter()
        .map(|(key, value)| {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", form_escape(key), form_escape(&raw))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn form_escape(text: &str) -> String {
    utf8_percent_encode(text, FORM_VALUE)
        .to_string()
        .replace("%20", "+")
}

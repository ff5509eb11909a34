use serde_json::Value;

use crate::error::ConvertError;
use crate::parse::schema::{SchemaOrRef, is_merge_extension};

/// Moves a `$ref` string between the Swagger 2.0 and OpenAPI 3 layouts.
pub(crate) type RefMapper = fn(&str) -> Result<String, ConvertError>;

/// `#/definitions/X` → `#/components/schemas/X` and friends. Anything else is
/// left alone.
pub(crate) fn v2_ref_to_v3(ref_path: &str) -> Result<String, ConvertError> {
    const SECTIONS: [(&str, &str); 3] = [
        ("#/definitions/", "#/components/schemas/"),
        ("#/parameters/", "#/components/parameters/"),
        ("#/responses/", "#/components/responses/"),
    ];
    for (from, to) in SECTIONS {
        if let Some(name) = ref_path.strip_prefix(from) {
            return Ok(format!("{}{}", to, name));
        }
    }
    Ok(ref_path.to_string())
}

/// `#/components/schemas/X` → `#/definitions/X` and friends. Request bodies
/// become body parameters. Sections 2.0 has no place for are an error.
pub(crate) fn v3_ref_to_v2(ref_path: &str) -> Result<String, ConvertError> {
    let Some(rest) = ref_path.strip_prefix("#/components/") else {
        return Ok(ref_path.to_string());
    };
    let (section, name) = rest
        .split_once('/')
        .ok_or_else(|| ConvertError::InvalidReference(ref_path.to_string()))?;
    let target = match section {
        "schemas" => "#/definitions/",
        "parameters" | "requestBodies" => "#/parameters/",
        "responses" => "#/responses/",
        _ => return Err(ConvertError::InvalidReference(ref_path.to_string())),
    };
    Ok(format!("{}{}", target, name))
}

/// Rewrite every reference beneath a schema node, including merge lists and
/// discriminator mappings.
pub(crate) fn rewrite_schema_refs(node: &mut SchemaOrRef, map: RefMapper) -> Result<(), ConvertError> {
    match node {
        SchemaOrRef::Ref { ref_path } => {
            *ref_path = map(ref_path)?;
        }
        SchemaOrRef::Schema(schema) => {
            for (key, value) in schema.extensions.iter_mut() {
                if !is_merge_extension(key) {
                    continue;
                }
                if let Value::Array(entries) = value {
                    for entry in entries {
                        if let Some(Value::String(target)) = entry.get_mut("$ref") {
                            *target = map(target)?;
                        }
                    }
                }
            }
            if let Some(discriminator) = &mut schema.discriminator {
                for target in discriminator.mapping.values_mut() {
                    if target.starts_with('#') {
                        *target = map(target)?;
                    }
                }
            }
            for child in schema.subschemas_mut() {
                rewrite_schema_refs(child, map)?;
            }
        }
    }
    Ok(())
}

/// A clone of `node` with its references rewritten.
pub(crate) fn rewritten(node: &SchemaOrRef, map: RefMapper) -> Result<SchemaOrRef, ConvertError> {
    let mut out = node.clone();
    rewrite_schema_refs(&mut out, map)?;
    Ok(out)
}

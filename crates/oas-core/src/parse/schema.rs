use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Extensions;

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

/// The `type` field can be a single type or an array of types. Anything else
/// is kept verbatim so validation can point at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(SchemaType),
    Multiple(Vec<SchemaType>),
    Unknown(String),
}

impl TypeSet {
    /// The first non-null type, if any.
    pub fn primary(&self) -> Option<SchemaType> {
        match self {
            TypeSet::Single(t) => Some(*t),
            TypeSet::Multiple(types) => types
                .iter()
                .copied()
                .find(|t| *t != SchemaType::Null)
                .or_else(|| types.first().copied()),
            TypeSet::Unknown(_) => None,
        }
    }

    pub fn contains(&self, ty: SchemaType) -> bool {
        match self {
            TypeSet::Single(t) => *t == ty,
            TypeSet::Multiple(types) => types.contains(&ty),
            TypeSet::Unknown(_) => false,
        }
    }
}

/// A reference or inline schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrRef {
    Ref {
        #[serde(rename = "$ref")]
        ref_path: String,
    },
    Schema(Box<Schema>),
}

impl SchemaOrRef {
    pub fn reference(ref_path: impl Into<String>) -> Self {
        SchemaOrRef::Ref {
            ref_path: ref_path.into(),
        }
    }

    pub fn inline(schema: Schema) -> Self {
        SchemaOrRef::Schema(Box::new(schema))
    }

    pub fn ref_path(&self) -> Option<&str> {
        match self {
            SchemaOrRef::Ref { ref_path } => Some(ref_path),
            SchemaOrRef::Schema(_) => None,
        }
    }

    pub fn as_schema(&self) -> Option<&Schema> {
        match self {
            SchemaOrRef::Schema(schema) => Some(schema),
            SchemaOrRef::Ref { .. } => None,
        }
    }

    pub fn as_schema_mut(&mut self) -> Option<&mut Schema> {
        match self {
            SchemaOrRef::Schema(schema) => Some(schema),
            SchemaOrRef::Ref { .. } => None,
        }
    }
}

impl Default for SchemaOrRef {
    fn default() -> Self {
        SchemaOrRef::Schema(Box::default())
    }
}

impl From<Schema> for SchemaOrRef {
    fn from(schema: Schema) -> Self {
        SchemaOrRef::inline(schema)
    }
}

/// Discriminator for polymorphic schemas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    #[serde(rename = "propertyName")]
    pub property_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
}

/// `exclusiveMinimum`/`exclusiveMaximum`: a flag in 3.0 and Swagger 2.0, a
/// bound in 3.1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    Flag(bool),
    Value(f64),
}

/// A JSON Schema object as used by OpenAPI 3.x (and Swagger 2.0 definitions).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<TypeSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    // Object properties
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaOrRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaOrRef>>,

    // Composition
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaOrRef>,

    #[serde(rename = "oneOf", default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaOrRef>,

    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaOrRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaOrRef>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    // Enum values
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    // Numeric constraints
    #[serde(rename = "multipleOf", skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<ExclusiveBound>,
    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<ExclusiveBound>,

    // String constraints
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // Array constraints
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    // Read/Write only
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,

    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    /// Vendor extensions (including `x-*-merge` references) and any keyword
    /// not modeled above.
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Schema {
    pub fn of_type(ty: SchemaType) -> Self {
        Schema {
            schema_type: Some(TypeSet::Single(ty)),
            ..Schema::default()
        }
    }

    pub fn primary_type(&self) -> Option<SchemaType> {
        self.schema_type.as_ref().and_then(TypeSet::primary)
    }

    pub fn is_type(&self, ty: SchemaType) -> bool {
        self.schema_type.as_ref().is_some_and(|t| t.contains(ty))
    }

    /// Every directly nested schema: compositions, `not`, properties, items
    /// and a schema-valued `additionalProperties`.
    pub fn subschemas(&self) -> Vec<&SchemaOrRef> {
        let mut out: Vec<&SchemaOrRef> = Vec::new();
        out.extend(&self.all_of);
        out.extend(&self.any_of);
        out.extend(&self.one_of);
        out.extend(self.not.as_deref());
        out.extend(self.properties.values());
        out.extend(self.items.as_deref());
        if let Some(AdditionalProperties::Schema(schema)) = &self.additional_properties {
            out.push(schema);
        }
        out
    }

    pub fn subschemas_mut(&mut self) -> Vec<&mut SchemaOrRef> {
        let mut out: Vec<&mut SchemaOrRef> = Vec::new();
        out.extend(&mut self.all_of);
        out.extend(&mut self.any_of);
        out.extend(&mut self.one_of);
        out.extend(self.not.as_deref_mut());
        out.extend(self.properties.values_mut());
        out.extend(self.items.as_deref_mut());
        if let Some(AdditionalProperties::Schema(schema)) = &mut self.additional_properties {
            out.push(schema);
        }
        out
    }
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<SchemaOrRef>),
}

/// Whether an extension key names a merge-reference list (`x-<name>-merge`).
pub fn is_merge_extension(key: &str) -> bool {
    key.len() > "x--merge".len() && key.starts_with("x-") && key.ends_with("-merge")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_extension_keys() {
        assert!(is_merge_extension("x-dice-merge"));
        assert!(is_merge_extension("x-a-b-merge"));
        assert!(!is_merge_extension("x--merge"));
        assert!(!is_merge_extension("x-merge"));
        assert!(!is_merge_extension("x-dice-merged"));
        assert!(!is_merge_extension("dice-merge"));
    }

    #[test]
    fn test_ref_with_siblings_parses_as_ref() {
        let parsed: SchemaOrRef =
            serde_json::from_str(r##"{"$ref": "#/components/schemas/Pet", "description": "x"}"##)
                .unwrap();
        assert_eq!(parsed.ref_path(), Some("#/components/schemas/Pet"));
    }

    #[test]
    fn test_unknown_type_is_retained() {
        let parsed: Schema = serde_json::from_str(r#"{"type": "int"}"#).unwrap();
        assert_eq!(parsed.schema_type, Some(TypeSet::Unknown("int".into())));
    }

    #[test]
    fn test_extensions_capture_vendor_keys() {
        let parsed: Schema = serde_json::from_str(
            r##"{"type": "object", "x-dice-merge": [{"$ref": "#/components/schemas/Base"}]}"##,
        )
        .unwrap();
        assert!(parsed.extensions.contains_key("x-dice-merge"));
        assert!(parsed.is_type(SchemaType::Object));
    }

    #[test]
    fn test_exclusive_bound_accepts_both_forms() {
        let v30: Schema = serde_json::from_str(r#"{"exclusiveMinimum": true}"#).unwrap();
        assert_eq!(v30.exclusive_minimum, Some(ExclusiveBound::Flag(true)));
        let v31: Schema = serde_json::from_str(r#"{"exclusiveMinimum": 3}"#).unwrap();
        assert_eq!(v31.exclusive_minimum, Some(ExclusiveBound::Value(3.0)));
    }
}

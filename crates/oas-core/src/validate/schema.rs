use super::{Located, Result, Section, Validator};
use crate::error::ValidationError;
use crate::parse::schema::{AdditionalProperties, Schema, SchemaOrRef, SchemaType, TypeSet};

impl Validator<'_> {
    pub(super) fn validate_schema_ref(&self, node: &SchemaOrRef) -> Result {
        match node {
            SchemaOrRef::Ref { ref_path } => self.check_ref(ref_path, Section::Schemas),
            SchemaOrRef::Schema(schema) => self.validate_schema(schema),
        }
    }

    fn validate_schema(&self, schema: &Schema) -> Result {
        for (keyword, list) in [
            ("oneOf", &schema.one_of),
            ("anyOf", &schema.any_of),
            ("allOf", &schema.all_of),
        ] {
            for (i, sub) in list.iter().enumerate() {
                self.validate_schema_ref(sub)
                    .within(i.to_string())
                    .within(keyword)?;
            }
        }
        if let Some(not) = &schema.not {
            self.validate_schema_ref(not).within("not")?;
        }

        if let Some(TypeSet::Unknown(name)) = &schema.schema_type {
            return Err(ValidationError::at("type", format!("unsupported type {name:?}")));
        }
        if schema.is_type(SchemaType::Array) && schema.items.is_none() {
            return Err(ValidationError::at(
                "items",
                "when schema type is 'array', schema 'items' must be non-null",
            ));
        }

        for (name, property) in &schema.properties {
            self.validate_schema_ref(property)
                .within(name)
                .within("properties")?;
        }
        if let Some(items) = &schema.items {
            self.validate_schema_ref(items).within("items")?;
        }
        if let Some(AdditionalProperties::Schema(additional)) = &schema.additional_properties {
            self.validate_schema_ref(additional)
                .within("additionalProperties")?;
        }
        Ok(())
    }
}

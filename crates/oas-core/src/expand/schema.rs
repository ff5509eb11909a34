use indexmap::IndexMap;
use serde_json::Value;

use crate::error::ResolveError;
use crate::parse::reference::ref_target_name;
use crate::parse::schema::{AdditionalProperties, Schema, SchemaOrRef, is_merge_extension};

/// Inlines `$ref` and `x-*-merge` references against the named-schemas
/// table, writing expanded components back into it as it goes.
pub struct SchemaExpander<'a> {
    schemas: &'a mut IndexMap<String, SchemaOrRef>,
    in_progress: Vec<String>,
}

impl<'a> SchemaExpander<'a> {
    pub fn new(schemas: &'a mut IndexMap<String, SchemaOrRef>) -> Self {
        Self {
            schemas,
            in_progress: Vec::new(),
        }
    }

    /// Expand a node in place. Afterwards it is inline and nothing beneath it
    /// is a reference.
    pub fn expand(&mut self, node: &mut SchemaOrRef) -> Result<(), ResolveError> {
        match node {
            SchemaOrRef::Ref { ref_path } => {
                let resolved = self.resolve(ref_path)?;
                *node = SchemaOrRef::inline(resolved);
                Ok(())
            }
            SchemaOrRef::Schema(schema) => self.expand_schema(schema),
        }
    }

    /// Expand the named component in place. Unknown names are ignored.
    pub fn expand_component(&mut self, name: &str) -> Result<(), ResolveError> {
        self.expanded_component(name).map(|_| ())
    }

    fn resolve(&mut self, ref_path: &str) -> Result<Schema, ResolveError> {
        let name = ref_target_name(ref_path);
        self.expanded_component(&name)?
            .ok_or_else(|| ResolveError::RefTargetNotFound(ref_path.to_string()))
    }

    /// An expanded copy of a component. A component already on the expansion
    /// stack yields a cycle stub instead.
    fn expanded_component(&mut self, name: &str) -> Result<Option<Schema>, ResolveError> {
        let Some(target) = self.schemas.get(name) else {
            return Ok(None);
        };

        if self.in_progress.iter().any(|n| n == name) {
            log::debug!("cutting reference cycle at schema `{}`", name);
            let mut stub = cycle_stub(target, &self.in_progress);
            self.expand_schema(&mut stub)?;
            return Ok(Some(stub));
        }

        let mut target = target.clone();
        self.in_progress.push(name.to_string());
        let result = self.expand(&mut target);
        self.in_progress.pop();
        result?;

        if let Some(slot) = self.schemas.get_mut(name) {
            *slot = target.clone();
        }
        match target {
            SchemaOrRef::Schema(schema) => Ok(Some(*schema)),
            SchemaOrRef::Ref { ref_path } => Err(ResolveError::UnresolvedRef(ref_path)),
        }
    }

    fn expand_schema(&mut self, schema: &mut Schema) -> Result<(), ResolveError> {
        self.expand_composition(&mut schema.all_of, &mut schema.properties)?;
        self.expand_composition(&mut schema.any_of, &mut schema.properties)?;
        self.expand_composition(&mut schema.one_of, &mut schema.properties)?;

        for prop in schema.properties.values_mut() {
            self.expand(prop)?;
        }
        if let Some(items) = schema.items.as_deref_mut() {
            self.expand(items)?;
        }
        if let Some(AdditionalProperties::Schema(extra)) = &mut schema.additional_properties {
            self.expand(extra)?;
        }
        if let Some(not) = schema.not.as_deref_mut() {
            self.expand(not)?;
        }

        self.apply_merges(schema)
    }

    /// Expand composition members and lift their properties into the parent.
    /// Later members overwrite earlier ones.
    fn expand_composition(
        &mut self,
        members: &mut [SchemaOrRef],
        properties: &mut IndexMap<String, SchemaOrRef>,
    ) -> Result<(), ResolveError> {
        for member in members.iter_mut() {
            self.expand(member)?;
            if let Some(resolved) = member.as_schema() {
                for (name, prop) in &resolved.properties {
                    properties.insert(name.clone(), prop.clone());
                }
            }
        }
        Ok(())
    }

    /// Consume every `x-*-merge` list. Each entry is removed from the list
    /// before its target is expanded.
    fn apply_merges(&mut self, schema: &mut Schema) -> Result<(), ResolveError> {
        let merge_keys: Vec<String> = schema
            .extensions
            .keys()
            .filter(|k| is_merge_extension(k))
            .cloned()
            .collect();

        for key in merge_keys {
            loop {
                let entry = match schema.extensions.get_mut(&key) {
                    Some(Value::Array(entries)) if entries.is_empty() => break,
                    Some(Value::Array(entries)) => entries.remove(0),
                    Some(_) => {
                        return Err(ResolveError::InvalidMergeRef {
                            key,
                            reason: "expected an array of references".to_string(),
                        });
                    }
                    None => break,
                };
                let ref_path = entry
                    .get("$ref")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ResolveError::InvalidMergeRef {
                        key: key.clone(),
                        reason: format!("entry {} has no string `$ref`", entry),
                    })?;

                let target = self.resolve(ref_path)?;
                merge_required(&mut schema.required, &target.required);
                for (name, prop) in target.properties {
                    schema.properties.insert(name, prop);
                }
            }
            schema.extensions.shift_remove(&key);
        }
        Ok(())
    }
}

/// Append names not yet present, keeping first occurrences.
fn merge_required(required: &mut Vec<String>, extra: &[String]) {
    for name in extra {
        if !required.contains(name) {
            required.push(name.clone());
        }
    }
}

/// A copy of a component for use inside its own expansion. References and
/// merge entries pointing back at an in-progress component become empty
/// schemas or are dropped; every other reference is left for normal
/// expansion.
fn cycle_stub(target: &SchemaOrRef, in_progress: &[String]) -> Schema {
    match target {
        SchemaOrRef::Ref { .. } => Schema::default(),
        SchemaOrRef::Schema(schema) => {
            let mut stub = (**schema).clone();
            cut_cycles(&mut stub, in_progress);
            stub
        }
    }
}

fn cut_cycles(schema: &mut Schema, in_progress: &[String]) {
    let points_back = |ref_path: &str| in_progress.contains(&ref_target_name(ref_path));

    for (key, value) in schema.extensions.iter_mut() {
        if !is_merge_extension(key) {
            continue;
        }
        if let Value::Array(entries) = value {
            entries.retain(|entry| {
                !entry
                    .get("$ref")
                    .and_then(Value::as_str)
                    .is_some_and(points_back)
            });
        }
    }
    schema
        .extensions
        .retain(|k, v| !is_merge_extension(k) || !matches!(v, Value::Array(e) if e.is_empty()));

    for child in schema.subschemas_mut() {
        match child {
            SchemaOrRef::Ref { ref_path } if points_back(ref_path.as_str()) => {
                *child = SchemaOrRef::default();
            }
            SchemaOrRef::Ref { .. } => {}
            SchemaOrRef::Schema(inner) => cut_cycles(inner, in_progress),
        }
    }
}

/// Whether any reference remains beneath a node.
pub fn has_references(node: &SchemaOrRef) -> bool {
    match node {
        SchemaOrRef::Ref { .. } => true,
        SchemaOrRef::Schema(schema) => {
            schema.extensions.keys().any(|k| is_merge_extension(k))
                || schema.subschemas().into_iter().any(has_references)
        }
    }
}

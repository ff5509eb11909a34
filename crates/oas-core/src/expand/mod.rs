//! Reference expansion: `$ref` and `x-*-merge` inlining for single schemas,
//! named components and whole documents.

pub mod document;
pub mod schema;

use indexmap::IndexMap;

use crate::error::{ExpandError, ResolveError};
use crate::parse::components::Components;
use crate::parse::operation::Operation;
use crate::parse::schema::SchemaOrRef;
use crate::parse::spec::OpenApiSpec;

pub use document::DocumentExpander;
pub use schema::{SchemaExpander, has_references};

/// Expand one schema in place against the document's named schemas.
pub fn expand_schema_ref(node: &mut SchemaOrRef, spec: &mut OpenApiSpec) -> Result<(), ResolveError> {
    match spec.components.as_mut() {
        Some(components) => SchemaExpander::new(&mut components.schemas).expand(node),
        None => SchemaExpander::new(&mut IndexMap::new()).expand(node),
    }
}

/// Expand every named schema in place.
pub fn expand_components(spec: &mut OpenApiSpec) -> Result<(), ExpandError> {
    let Some(components) = spec.components.as_mut() else {
        return Ok(());
    };
    let names: Vec<String> = components.schemas.keys().cloned().collect();
    let mut expander = SchemaExpander::new(&mut components.schemas);
    for name in names {
        expander
            .expand_component(&name)
            .map_err(|source| ExpandError::Component { name, source })?;
    }
    Ok(())
}

/// Expand every schema reachable from every path and operation. The first
/// failure aborts the walk.
pub fn expand_paths(spec: &mut OpenApiSpec) -> Result<(), ExpandError> {
    let mut empty = Components::default();
    let components = spec.components.as_mut().unwrap_or(&mut empty);
    let mut expander = DocumentExpander::new(components);
    for (path, item) in spec.paths.iter_mut() {
        expander.expand_path_item(path, item)?;
    }
    Ok(())
}

/// Expand a single operation against a set of components.
pub fn expand_operation(op: &mut Operation, components: &mut Components) -> Result<(), ResolveError> {
    DocumentExpander::new(components).expand_operation(op)
}

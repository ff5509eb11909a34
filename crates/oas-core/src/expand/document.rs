use std::collections::HashSet;

use indexmap::IndexMap;

use super::schema::SchemaExpander;
use crate::error::{ExpandError, ResolveError};
use crate::parse::components::Components;
use crate::parse::media_type::MediaType;
use crate::parse::operation::{Operation, PathItem};
use crate::parse::parameter::ParameterOrRef;
use crate::parse::reference::component_name;
use crate::parse::request_body::RequestBodyOrRef;
use crate::parse::response::{HeaderOrRef, ResponseOrRef};

/// Walks paths and operations, inlining referenced parameters, bodies,
/// responses and headers and expanding every schema beneath them.
pub struct DocumentExpander<'a> {
    schemas: SchemaExpander<'a>,
    parameters: &'a IndexMap<String, ParameterOrRef>,
    request_bodies: &'a IndexMap<String, RequestBodyOrRef>,
    responses: &'a IndexMap<String, ResponseOrRef>,
    headers: &'a IndexMap<String, HeaderOrRef>,
}

impl<'a> DocumentExpander<'a> {
    pub fn new(components: &'a mut Components) -> Self {
        let Components {
            schemas,
            parameters,
            request_bodies,
            responses,
            headers,
            ..
        } = components;
        Self {
            schemas: SchemaExpander::new(schemas),
            parameters,
            request_bodies,
            responses,
            headers,
        }
    }

    pub fn expand_path_item(&mut self, path: &str, item: &mut PathItem) -> Result<(), ExpandError> {
        self.expand_parameters(&mut item.parameters)
            .map_err(|source| ExpandError::PathParameters {
                path: path.to_string(),
                source,
            })?;

        for (method, op) in item.operations_mut() {
            log::debug!("expanding {} {}", method, path);
            self.expand_operation(op)
                .map_err(|source| ExpandError::Operation {
                    path: path.to_string(),
                    method: method.to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn expand_operation(&mut self, op: &mut Operation) -> Result<(), ResolveError> {
        self.expand_parameters(&mut op.parameters)?;

        if let Some(body) = &mut op.request_body {
            if let RequestBodyOrRef::Ref { ref_path } = body {
                *body = follow(ref_path, "requestBodies", self.request_bodies, |b| match b {
                    RequestBodyOrRef::Ref { ref_path } => Some(ref_path),
                    RequestBodyOrRef::RequestBody(_) => None,
                })?
                .clone();
            }
            if let RequestBodyOrRef::RequestBody(rb) = body {
                self.expand_media_types(&mut rb.content)?;
            }
        }

        for resp in op.responses.values_mut() {
            if let ResponseOrRef::Ref { ref_path } = resp {
                *resp = follow(ref_path, "responses", self.responses, |r| match r {
                    ResponseOrRef::Ref { ref_path } => Some(ref_path),
                    ResponseOrRef::Response(_) => None,
                })?
                .clone();
            }
            if let ResponseOrRef::Response(r) = resp {
                self.expand_headers(&mut r.headers)?;
                self.expand_media_types(&mut r.content)?;
            }
        }

        Ok(())
    }

    fn expand_parameters(&mut self, params: &mut [ParameterOrRef]) -> Result<(), ResolveError> {
        for param in params.iter_mut() {
            if let ParameterOrRef::Ref { ref_path } = param {
                *param = follow(ref_path, "parameters", self.parameters, |p| match p {
                    ParameterOrRef::Ref { ref_path } => Some(ref_path),
                    ParameterOrRef::Parameter(_) => None,
                })?
                .clone();
            }
            if let ParameterOrRef::Parameter(p) = param {
                if let Some(schema) = &mut p.schema {
                    self.schemas.expand(schema)?;
                }
                self.expand_media_types(&mut p.content)?;
            }
        }
        Ok(())
    }

    fn expand_headers(
        &mut self,
        headers: &mut IndexMap<String, HeaderOrRef>,
    ) -> Result<(), ResolveError> {
        for header in headers.values_mut() {
            if let HeaderOrRef::Ref { ref_path } = header {
                *header = follow(ref_path, "headers", self.headers, |h| match h {
                    HeaderOrRef::Ref { ref_path } => Some(ref_path),
                    HeaderOrRef::Header(_) => None,
                })?
                .clone();
            }
            if let HeaderOrRef::Header(h) = header {
                if let Some(schema) = &mut h.schema {
                    self.schemas.expand(schema)?;
                }
            }
        }
        Ok(())
    }

    fn expand_media_types(
        &mut self,
        content: &mut IndexMap<String, MediaType>,
    ) -> Result<(), ResolveError> {
        for media in content.values_mut() {
            if let Some(schema) = &mut media.schema {
                self.schemas.expand(schema)?;
            }
        }
        Ok(())
    }
}

/// Follow a chain of component references to an inline value.
fn follow<'t, T>(
    ref_path: &str,
    section: &str,
    table: &'t IndexMap<String, T>,
    next: impl Fn(&'t T) -> Option<&'t String>,
) -> Result<&'t T, ResolveError> {
    let mut visited = HashSet::new();
    let mut current = ref_path.to_string();
    loop {
        if !visited.insert(current.clone()) {
            return Err(ResolveError::CircularRef(current));
        }
        let name = component_name(&current, section)?;
        let target = table
            .get(&name)
            .ok_or_else(|| ResolveError::RefTargetNotFound(current.clone()))?;
        match next(target) {
            Some(inner) => current = inner.clone(),
            None => return Ok(target),
        }
    }
}

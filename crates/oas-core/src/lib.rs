//! Loading, conversion, reference expansion, example generation and
//! validation for OpenAPI 3.x and Swagger 2.0 documents.

pub mod config;
pub mod convert;
pub mod error;
pub mod example;
pub mod expand;
pub mod parse;
pub mod pipeline;
pub mod v2;
pub mod validate;

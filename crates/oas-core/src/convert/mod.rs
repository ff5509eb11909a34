//! Format conversion: Swagger 2.0 ⇄ OpenAPI 3 structure, JSON ⇄ YAML bytes
//! and deterministic marshaling.

mod marshal;
mod refs;
mod v2_to_v3;
mod v3_to_v2;
pub mod yaml;

pub use marshal::{to_json, to_json_pretty, to_yaml};
pub use v2_to_v3::oas2_to_oas3;
pub use v3_to_v2::oas3_to_oas2;
pub use yaml::{json_to_yaml, yaml_to_json, yaml_to_json_indent};

use percent_encoding::percent_decode_str;

use crate::error::ResolveError;

/// Decode a JSON Pointer segment (`~1`, `~0` and percent escapes).
pub fn decode_pointer_segment(segment: &str) -> String {
    let decoded = segment.replace("~1", "/").replace("~0", "~");
    percent_decode_str(&decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Name a `$ref` points at: its final pointer segment, decoded.
pub fn ref_target_name(ref_path: &str) -> String {
    let last = ref_path.rsplit('/').next().unwrap_or(ref_path);
    decode_pointer_segment(last)
}

/// Parse a `$ref` like `#/components/schemas/Foo` and extract the name,
/// checking that it lives in the expected section.
pub fn component_name(ref_path: &str, expected_section: &str) -> Result<String, ResolveError> {
    let stripped = ref_path
        .strip_prefix("#/components/")
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    let (section, name) = stripped
        .split_once('/')
        .ok_or_else(|| ResolveError::InvalidRefFormat(ref_path.to_string()))?;
    if section != expected_section {
        return Err(ResolveError::InvalidRefFormat(format!(
            "expected section '{}', got '{}' in {}",
            expected_section, section, ref_path
        )));
    }
    if name.is_empty() || name.contains('/') {
        return Err(ResolveError::InvalidRefFormat(ref_path.to_string()));
    }
    Ok(decode_pointer_segment(name))
}

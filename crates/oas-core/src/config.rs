use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::pipeline::{OutputFormat, PipelineOptions, TargetVersion};

/// Project configuration loaded from `.oas.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Document read when no input is given on the command line.
    pub input: PathBuf,
    /// Where processed output goes. Standard output when unset.
    pub output: Option<PathBuf>,
    pub target: TargetVersion,
    pub format: OutputFormat,
    pub pretty: bool,
    pub expand: bool,
    pub examples: bool,
    pub validate: bool,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let options = PipelineOptions::default();
        Self {
            input: PathBuf::from("openapi.yaml"),
            output: None,
            target: options.target,
            format: options.format,
            pretty: options.pretty,
            expand: options.expand,
            examples: options.examples,
            validate: options.validate,
        }
    }
}

impl ToolConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            expand: self.expand,
            examples: self.examples,
            validate: self.validate,
            target: self.target,
            format: self.format,
            pretty: self.pretty,
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".oas.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ToolConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // An empty file deserializes to unit, not a mapping.
    if content.trim().is_empty() {
        return Ok(Some(ToolConfig::default()));
    }
    let config = serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# oas configuration
input: openapi.yaml
# output: openapi.out.yaml   # standard output when unset

target: v3          # v2 | v3
format: auto        # auto | json | yaml (auto keeps the input encoding)
pretty: true        # indent JSON output

expand: false       # inline $ref and x-*-merge references
examples: false     # generate request and response examples
validate: true      # reject documents that break OpenAPI 3 structure rules
"#
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = ToolConfig::default();
        assert_eq!(config.input, PathBuf::from("openapi.yaml"));
        assert_eq!(config.output, None);
        assert_eq!(config.target, TargetVersion::V3);
        assert_eq!(config.format, OutputFormat::Auto);
        assert!(config.validate);
        assert!(!config.expand);
        assert_eq!(config.pipeline_options(), PipelineOptions::default());
    }

    #[test]
    fn test_default_content_matches_defaults() {
        let config: ToolConfig = serde_yaml_ng::from_str(default_config_content()).unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
input: specs/petstore.json
output: out/petstore.yaml
target: v2
format: yaml
expand: true
examples: true
validate: false
"#;
        let config: ToolConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.input, PathBuf::from("specs/petstore.json"));
        assert_eq!(config.output, Some(PathBuf::from("out/petstore.yaml")));
        let options = config.pipeline_options();
        assert_eq!(options.target, TargetVersion::V2);
        assert_eq!(options.format, OutputFormat::Yaml);
        assert!(options.expand && options.examples && !options.validate);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: ToolConfig = serde_yaml_ng::from_str("expand: true\n").unwrap();
        assert!(config.expand);
        // Defaults applied
        assert_eq!(config.input, PathBuf::from("openapi.yaml"));
        assert!(config.validate);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"target: v2\npretty: false\n").unwrap();
        let config = load_config(file.path()).unwrap().unwrap();
        assert_eq!(config.target, TargetVersion::V2);
        assert!(!config.pretty);
    }

    #[test]
    fn test_load_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = load_config(file.path()).unwrap().unwrap();
        assert_eq!(config, ToolConfig::default());
    }

    #[test]
    fn test_load_rejects_bad_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"target: v4\n").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse config"));
    }
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use oas_core::config::{self, CONFIG_FILE_NAME, ToolConfig};
use oas_core::convert;
use oas_core::parse::{self, SourceFormat};
use oas_core::pipeline::{self, OutputFormat, PipelineOptions, TargetVersion};
use oas_core::validate::validate_oas3;

#[derive(Parser)]
#[command(name = "oas", about = "OpenAPI 2.0/3.x document toolkit", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document between Swagger 2.0 and OpenAPI 3
    Convert {
        #[command(flatten)]
        io: IoArgs,

        /// Version to emit
        #[arg(long)]
        to: Option<Version>,

        /// Skip validation of the converted document
        #[arg(long)]
        no_validate: bool,
    },

    /// Inline `$ref` and `x-*-merge` references
    Expand {
        #[command(flatten)]
        io: IoArgs,

        /// Also generate request and response examples
        #[arg(long)]
        examples: bool,
    },

    /// Validate a document against OpenAPI 3 structure rules
    Validate {
        /// Path to the document (YAML or JSON)
        input: Option<PathBuf>,
    },

    /// Summarize a document
    Inspect {
        /// Path to the document (YAML or JSON)
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: Format,
    },

    /// Re-encode any JSON or YAML file, keeping key order
    Reformat {
        /// File to read
        input: PathBuf,

        /// Target encoding (defaults to the other one)
        #[arg(long)]
        to: Option<Format>,

        /// Write to a file instead of standard output
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Initialize a new oas configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct IoArgs {
    /// Path to the document (YAML or JSON)
    input: Option<PathBuf>,

    /// Write to a file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output encoding (defaults to the input's)
    #[arg(long)]
    format: Option<Format>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Yaml => OutputFormat::Yaml,
            Format::Json => OutputFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Version {
    V2,
    V3,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            io,
            to,
            no_validate,
        } => cmd_convert(io, to, no_validate),

        Commands::Expand { io, examples } => cmd_expand(io, examples),

        Commands::Validate { input } => cmd_validate(input),

        Commands::Inspect { input, format } => cmd_inspect(input, format),

        Commands::Reformat { input, to, output } => cmd_reformat(&input, to, output),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "oas", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn load_project_config() -> Result<ToolConfig> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    match config::load_config(&config_path)? {
        Some(cfg) => {
            log::debug!("using {}", config_path.display());
            Ok(cfg)
        }
        None => Ok(ToolConfig::default()),
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, bytes)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            if !bytes.ends_with(b"\n") {
                stdout.write_all(b"\n")?;
            }
        }
    }
    Ok(())
}

/// Run the pipeline with config values overridden by command line flags.
fn run_pipeline(
    cfg: &ToolConfig,
    io: IoArgs,
    adjust: impl FnOnce(&mut PipelineOptions),
) -> Result<()> {
    let input = io.input.unwrap_or_else(|| cfg.input.clone());
    let output = io.output.or_else(|| cfg.output.clone());

    let mut options = cfg.pipeline_options();
    if let Some(format) = io.format {
        options.format = format.into();
    }
    adjust(&mut options);

    let data = read_input(&input)?;
    let bytes = pipeline::process(&data, &options)
        .with_context(|| format!("failed to process {}", input.display()))?;
    write_output(output.as_deref(), &bytes)
}

fn cmd_convert(io: IoArgs, to: Option<Version>, no_validate: bool) -> Result<()> {
    let cfg = load_project_config()?;
    run_pipeline(&cfg, io, |options| {
        if let Some(version) = to {
            options.target = match version {
                Version::V2 => TargetVersion::V2,
                Version::V3 => TargetVersion::V3,
            };
        }
        if no_validate {
            options.validate = false;
        }
    })
}

fn cmd_expand(io: IoArgs, examples: bool) -> Result<()> {
    let cfg = load_project_config()?;
    run_pipeline(&cfg, io, |options| {
        options.expand = true;
        options.examples |= examples;
    })
}

fn cmd_validate(input: Option<PathBuf>) -> Result<()> {
    let cfg = load_project_config()?;
    let input = input.unwrap_or(cfg.input);
    let data = read_input(&input)?;

    let (spec, protocol) = parse::load_with_protocol(&data)?;
    validate_oas3(&spec).with_context(|| format!("{} is not valid", input.display()))?;

    eprintln!("Valid {} document: {}", protocol, spec.info.title);
    eprintln!("  Version: {}", spec.info.version);
    eprintln!("  Paths: {}", spec.paths.len());
    if let Some(components) = &spec.components {
        eprintln!("  Schemas: {}", components.schemas.len());
    }
    Ok(())
}

fn cmd_inspect(input: Option<PathBuf>, format: Format) -> Result<()> {
    let cfg = load_project_config()?;
    let input = input.unwrap_or(cfg.input);
    let data = read_input(&input)?;

    let (spec, protocol) = parse::load_with_protocol(&data)?;

    let operations: Vec<serde_json::Value> = spec
        .paths
        .iter()
        .flat_map(|(path, item)| {
            item.operations().map(move |(method, op)| {
                serde_json::json!({
                    "method": method.as_str(),
                    "path": path,
                    "operation_id": op.operation_id,
                    "tags": op.tags,
                })
            })
        })
        .collect();

    let components = spec.components.as_ref();
    let summary = serde_json::json!({
        "protocol": protocol.as_str(),
        "info": {
            "title": spec.info.title,
            "version": spec.info.version,
        },
        "servers": spec.servers.iter().map(|s| &s.url).collect::<Vec<_>>(),
        "schemas": components.map(|c| c.schemas.keys().collect::<Vec<_>>()).unwrap_or_default(),
        "security_schemes": components
            .map(|c| c.security_schemes.keys().collect::<Vec<_>>())
            .unwrap_or_default(),
        "operations": operations,
    });

    match format {
        Format::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn cmd_reformat(input: &Path, to: Option<Format>, output: Option<PathBuf>) -> Result<()> {
    let data = read_input(input)?;
    let source = if serde_json::from_slice::<serde_json::Value>(&data).is_ok() {
        SourceFormat::Json
    } else {
        SourceFormat::Yaml
    };
    let target = to.unwrap_or(match source {
        SourceFormat::Json => Format::Yaml,
        SourceFormat::Yaml => Format::Json,
    });

    let bytes = match (source, target) {
        (SourceFormat::Json, Format::Yaml) => convert::json_to_yaml(&data)?,
        (SourceFormat::Yaml, Format::Json) => convert::yaml_to_json_indent(&data)?,
        (SourceFormat::Json, Format::Json) => {
            let value: serde_json::Value = serde_json::from_slice(&data)?;
            serde_json::to_vec_pretty(&value)?
        }
        (SourceFormat::Yaml, Format::Yaml) => {
            let json = convert::yaml_to_json(&data)?;
            convert::json_to_yaml(&json)?
        }
    };
    write_output(output.as_deref(), &bytes)
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}

//! modgraph CLI
//!
//! Command-line interface for validating modules and printing the composed
//! GraphQL schema.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use modgraph::{
    build_schema, default_rules, enhance_modules, load_modules_auto, load_project_config,
    native_modules, validate_modules, BuildError, ModuleConfig, ProjectConfig, ValidationReport,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modgraph")]
#[command(about = "Validate GraphQL modules and print the composed schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate modules against the built-in rules
    Validate {
        /// Modules file (a module or an array of modules): path or URL
        modules: String,

        /// Currently deployed modules, for breaking change checks
        #[arg(long)]
        current: Option<String>,

        /// Project configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,

        /// Do not add the native modules (core, auth, relay)
        #[arg(long)]
        no_native: bool,
    },

    /// Build the schema and print it as SDL
    PrintSchema {
        /// Modules file (a module or an array of modules): path or URL
        modules: String,

        /// Project configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Do not add the native modules (core, auth, relay)
        #[arg(long)]
        no_native: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            modules,
            current,
            config,
            format,
            no_native,
        } => run_validate(&modules, current.as_deref(), config.as_deref(), format, no_native),
        Commands::PrintSchema {
            modules,
            config,
            output,
            no_native,
        } => run_print_schema(&modules, config.as_deref(), output, no_native),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn load_config(path: Option<&Path>) -> Result<ProjectConfig, u8> {
    match path {
        Some(path) => load_project_config(path).map_err(|e| {
            eprintln!("Error loading config: {}", e);
            e.exit_code() as u8
        }),
        None => Ok(ProjectConfig::default()),
    }
}

fn load(source: &str, no_native: bool) -> Result<Vec<ModuleConfig>, u8> {
    let modules = load_modules_auto(source).map_err(|e| {
        eprintln!("Error loading {}: {}", source, e);
        e.exit_code() as u8
    })?;
    if no_native {
        return Ok(modules);
    }

    // Native modules go first unless the file declares its own versions.
    let mut all: Vec<ModuleConfig> = native_modules()
        .into_iter()
        .filter(|native| !modules.iter().any(|m| m.id == native.id))
        .collect();
    all.extend(modules);
    Ok(all)
}

fn run_validate(
    source: &str,
    current: Option<&str>,
    config: Option<&Path>,
    format: Format,
    no_native: bool,
) -> Result<(), u8> {
    let config = load_config(config)?;
    let modules = load(source, no_native)?;
    let current = match current {
        Some(current) => load(current, no_native)?,
        None => Vec::new(),
    };

    let modules = enhance_modules(modules, &config).map_err(|e| {
        eprintln!("Error: {}", e);
        2
    })?;
    let errors = validate_modules(&modules, &current, &default_rules(), &config);
    let report = ValidationReport::new(&modules, errors);

    if format == Format::Json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| {
            eprintln!("Error serializing report: {}", e);
            2
        })?;
        println!("{}", json);
    } else {
        for result in &report.results {
            if result.errors.is_empty() {
                println!("  \x1b[32m✓\x1b[0m {}", result.module);
                continue;
            }
            println!("  \x1b[31m✗\x1b[0m {}", result.module);
            for error in &result.errors {
                println!("    \x1b[31merror\x1b[0m: {} - {}", error.path.join("."), error.message);
            }
        }
        for error in &report.project_errors {
            println!("  \x1b[31merror\x1b[0m: {} - {}", error.location(), error.message);
        }

        println!();
        if report.is_ok() {
            println!(
                "\x1b[32m✓ {} modules checked, all passed\x1b[0m",
                report.modules_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} modules checked: {} passed, {} failed ({} errors)\x1b[0m",
                report.modules_checked, report.passed, report.failed, report.errors
            );
        }
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

fn run_print_schema(
    source: &str,
    config: Option<&Path>,
    output: Option<PathBuf>,
    no_native: bool,
) -> Result<(), u8> {
    let config = load_config(config)?;
    let modules = load(source, no_native)?;

    let schema = build_schema(modules, &[], &config)
        .and_then(|builder| builder.get_schema())
        .map_err(|e| {
            match &e {
                BuildError::Validation { errors } => {
                    eprintln!("Validation failed:");
                    for error in errors {
                        eprintln!("  {}: {}", error.location(), error.message);
                    }
                }
                other => eprintln!("Error: {}", other),
            }
            e.exit_code() as u8
        })?;

    let sdl = schema.sdl();
    match output {
        Some(path) => std::fs::write(&path, sdl).map_err(|e| {
            eprintln!("Error writing to {}: {}", path.display(), e);
            3
        }),
        None => {
            print!("{}", sdl);
            Ok(())
        }
    }
}

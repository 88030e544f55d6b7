//! mmd - command-line tools for model metadata.
//!
//! Subcommands find a model's metadata directory, query it with dotted
//! keys, dump it as canonical YAML, stage a model's input files, and
//! install metadata directories under a share prefix.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use serde_yaml::{Mapping, Value};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use model_metadata::registry::{load_component, parse_entry_point};
use model_metadata::{
    find, install, stage, InstallOptions, MetadataError, ModelMetadata, ModelRef, SECTIONS,
};

#[derive(Parser, Debug)]
#[command(name = "mmd")]
#[command(about = "Model metadata tools", version)]
struct Cli {
    /// Also emit status messages to stderr (repeat for more detail)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Suppress status messages
    #[arg(long, global = true)]
    silent: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the metadata for a model
    Find {
        /// The model as an entry point, `module:ClassName`
        #[arg(value_parser = entry_point_arg)]
        entry_point: (String, String),
    },

    /// Print metadata about a model
    Query {
        /// Path to a model's metadata directory
        #[arg(value_parser = existing_dir_arg)]
        metadata: PathBuf,

        /// Name of a variable or section, in dotted notation
        #[arg(long)]
        var: Vec<String>,

        /// Query every section
        #[arg(long, conflicts_with = "var")]
        all: bool,
    },

    /// Dump a model's metadata as YAML
    Dump {
        /// A model name or path to its metadata directory
        model: String,

        /// Name of a metadata section
        #[arg(short, long)]
        section: Vec<String>,
    },

    /// Stage a model's input files
    Stage {
        /// Path to a model's metadata directory
        #[arg(value_parser = existing_dir_arg)]
        metadata: PathBuf,

        /// Where to stage files
        dest: PathBuf,

        /// Suppress printing the manifest
        #[arg(short, long)]
        quiet: bool,
    },

    /// Install model metadata files
    Install {
        /// Path to model metadata files
        #[arg(value_parser = existing_dir_arg)]
        source: PathBuf,

        /// Where to install the files
        destination: Option<PathBuf>,

        /// Install under `<prefix>/share/csdms` when no destination is given
        #[arg(long)]
        prefix: Option<PathBuf>,

        /// Name of the model (defaults to the metadata's own name)
        #[arg(long)]
        model_name: Option<String>,

        /// Install files in development mode (symlinks)
        #[arg(long)]
        develop: bool,

        /// Only display what would have been done
        #[arg(long)]
        dry_run: bool,
    },
}

fn entry_point_arg(value: &str) -> Result<(String, String), String> {
    parse_entry_point(value).map_err(|err| err.to_string())
}

fn existing_dir_arg(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("{value}: path does not exist"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.silent {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    match run(cli) {
        Ok(failures) => ExitCode::from(failures),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Command::Find { entry_point } => {
            let (module, name) = &entry_point;
            debug!("looking for metadata for {module}:{name}");
            let handle = load_component(module, name)?;
            let path = find(&ModelRef::Component(handle))?;
            println!("{}", path.display());
            Ok(0)
        }

        Command::Query { metadata, var, all } => {
            let vars: Vec<String> = if all {
                SECTIONS.iter().map(|s| s.to_string()).collect()
            } else {
                var
            };
            if vars.is_empty() && !cli.silent {
                eprintln!("nothing to query");
            }
            query_vars(&metadata, &vars, cli.silent)
        }

        Command::Dump { model, section } => {
            let path = find(&ModelRef::resolve(&model))?;
            let meta = ModelMetadata::from_path(path)?;
            if section.is_empty() {
                print!("{}", meta.dump()?);
            } else {
                for name in &section {
                    print!("{}", meta.dump_section(name)?);
                }
            }
            Ok(0)
        }

        Command::Stage {
            metadata,
            dest,
            quiet,
        } => {
            let manifest = stage(&ModelRef::from(metadata), &dest, None)?;
            if manifest.is_empty() && !cli.silent {
                eprintln!("no files to stage");
            }
            debug!("staged files in: {}", dest.display());
            if !quiet {
                for path in manifest {
                    println!("{}", path.display());
                }
            }
            Ok(0)
        }

        Command::Install {
            source,
            destination,
            prefix,
            model_name,
            develop,
            dry_run,
        } => {
            let dest = match destination {
                Some(dest) => dest,
                None => {
                    let name = match model_name {
                        Some(name) => name,
                        None => ModelMetadata::from_path(&source)?.name().to_string(),
                    };
                    match prefix {
                        Some(prefix) => prefix.join("share").join("csdms").join(name),
                        None => model_metadata::find::share_dir().join(name),
                    }
                }
            };
            install(
                &source,
                &dest,
                InstallOptions {
                    develop,
                    clobber: true,
                    dry_run,
                    silent: cli.silent,
                },
            )?;
            Ok(0)
        }
    }
}

/// Query each variable, printing found values as one YAML mapping on
/// stdout and each failure on stderr. The returned status is the number
/// of failed lookups.
fn query_vars(metadata: &std::path::Path, vars: &[String], silent: bool) -> Result<u8> {
    let meta = ModelMetadata::from_path(metadata)?;

    let mut values = Mapping::new();
    let mut failures: u8 = 0;
    for var in vars {
        match meta.get(var) {
            Ok(value) => {
                values.insert(var.as_str().into(), value.clone());
            }
            Err(MetadataError::MissingSection { name }) => {
                if !silent {
                    eprintln!("{name}: Missing section");
                }
                failures = failures.saturating_add(1);
            }
            Err(MetadataError::MissingValue { name }) => {
                if !silent {
                    eprintln!("{name}: Missing value");
                }
                failures = failures.saturating_add(1);
            }
            Err(err) => return Err(err.into()),
        }
    }

    if !values.is_empty() {
        print!(
            "{}",
            model_metadata::codec::dump_document(&Value::Mapping(values))?
        );
    }

    Ok(failures)
}

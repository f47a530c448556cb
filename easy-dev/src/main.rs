//! easy-dev CLI tool

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use console::style;
use easy_dev::commands::{
    ConfigPublishCommand, MakeCrudCommand, MakeModelRelationCommand, Project, RelationsListCommand,
    SyncModelRelationsCommand, TemplatesPublishCommand,
};
use easy_dev::{exit_code_for, observability};

#[derive(Parser)]
#[command(name = "easy-dev")]
#[command(version)]
#[command(about = "CRUD scaffolding and model relation synchronization", long_about = None)]
struct Cli {
    /// Project root directory
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    project: PathBuf,
    /// Configuration file (default: <project>/easy-dev.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate model, controller, migration and validator for an entity
    #[command(name = "make:crud")]
    MakeCrud {
        /// Entity name (`PascalCase`, e.g., `Post`, `UserProfile`)
        entity: String,
        /// Field definitions (e.g., `title:string:unique`, `body:text:nullable`)
        #[arg(value_name = "FIELD")]
        fields: Vec<String>,
        /// Comma-separated field definitions
        #[arg(long = "fields", value_name = "SPEC", value_delimiter = ',')]
        field_list: Vec<String>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Declare (or remove) a relation between two entities
    #[command(name = "make:model-relation")]
    MakeModelRelation {
        /// Declaring entity
        first: String,
        /// Related entity
        second: String,
        /// one-to-many, many-to-one, many-to-many or one-to-one
        #[arg(long = "type", value_name = "KIND")]
        kind: String,
        /// Remove the relation instead of declaring it
        #[arg(long)]
        remove: bool,
    },
    /// Rewrite the relation block of every generated model
    #[command(name = "sync:model-relations")]
    SyncModelRelations {
        /// Rewrite models edited since they were generated
        #[arg(long)]
        force: bool,
        /// Print the changes without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// List declared relations
    #[command(name = "relations:list")]
    RelationsList {
        /// Only relations of this entity
        entity: Option<String>,
    },
    /// Write the default configuration to easy-dev.toml
    #[command(name = "config:publish")]
    ConfigPublish {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Write the built-in templates for customization
    #[command(name = "templates:publish")]
    TemplatesPublish {
        /// Target directory (default: templates_path or templates/easy-dev)
        dir: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

fn run(cli: Cli) -> Result<()> {
    let open_project = || {
        Project::open(&cli.project, cli.config.as_deref()).context("Failed to load configuration")
    };

    match cli.command {
        Commands::MakeCrud {
            entity,
            mut fields,
            field_list,
            force,
        } => {
            fields.extend(field_list);
            MakeCrudCommand::new(entity, fields, force).execute(&open_project()?)?;
        }
        Commands::MakeModelRelation {
            first,
            second,
            kind,
            remove,
        } => {
            MakeModelRelationCommand::new(first, second, kind, remove).execute(&open_project()?)?;
        }
        Commands::SyncModelRelations { force, dry_run } => {
            SyncModelRelationsCommand::new(force, dry_run).execute(&open_project()?)?;
        }
        Commands::RelationsList { entity } => {
            RelationsListCommand::new(entity).execute(&open_project()?)?;
        }
        Commands::ConfigPublish { force } => {
            // Works without a readable configuration
            ConfigPublishCommand::new(force).execute(&cli.project)?;
        }
        Commands::TemplatesPublish { dir, force } => {
            TemplatesPublishCommand::new(dir, force).execute(&open_project()?)?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = observability::init(cli.verbose) {
        eprintln!("{} {err:#}", style("warning:").yellow().bold());
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("error:").red().bold());
            ExitCode::from(exit_code_for(&err))
        }
    }
}

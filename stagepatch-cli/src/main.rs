//! Stagepatch CLI
//!
//! Command-line interface for the build pipeline steps that patch generated
//! Xcode workspaces, Cocos builder settings and source constants.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use stagepatch_core::{
    add_project, compose, find_workspace_descriptor, find_xcodeproj, normalize,
    patch_builder_settings, BuilderPatch, Injector, PipelineConfig,
};

#[derive(Parser)]
#[command(name = "stagepatch")]
#[command(about = "Build pipeline helpers for composed Unity + Cocos iOS projects")]
#[command(version)]
struct Cli {
    /// Config file (default: ./stagepatch.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an Xcode workspace referencing two exported projects
    Compose {
        /// Primary project (its grandparent is the product root)
        primary: PathBuf,

        /// Secondary project
        secondary: PathBuf,
    },

    /// Rewrite absolute workspace references into container-relative ones
    Normalize {
        /// Path to contents.xcworkspacedata
        descriptor: PathBuf,

        /// Build-output directory names (replaces the configured markers)
        #[arg(short, long = "marker")]
        markers: Vec<String>,
    },

    /// Add a project to an existing workspace
    AddProject {
        /// .xcodeproj directory, or a directory containing one
        project: PathBuf,

        /// Path to contents.xcworkspacedata (default: search the workspace folder)
        #[arg(short, long)]
        descriptor: Option<PathBuf>,

        /// Product root holding the workspace folder (default: current directory)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Patch settings/builder.json and local/builder.json of a Cocos project
    BuilderSettings {
        /// Cocos project directory
        project: PathBuf,

        /// Script encryption key (xxteaKey)
        #[arg(long)]
        xxtea_key: String,
    },

    /// Inject constant values into a source file
    #[command(group(ArgGroup::new("rules_source").required(true).args(["preset", "rules"])))]
    Inject {
        /// Source file to patch
        file: PathBuf,

        /// Built-in rule set (check-status, fe2in, script-date)
        #[arg(short, long)]
        preset: Option<String>,

        /// TOML file with [[rule]] tables
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Value for a rule, as name=value (repeatable)
        #[arg(short = 's', long = "set", value_parser = parse_assignment, required = true)]
        values: Vec<(String, String)>,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout only carries results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("stagepatch=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let config = PipelineConfig::discover(cli.config.as_deref(), &cwd).context("Failed to load configuration")?;
    tracing::debug!("Workspace config: {:?}", config.workspace);

    match cli.command {
        Commands::Compose { primary, secondary } => {
            cmd_compose(&config, &primary, &secondary)?;
        }
        Commands::Normalize { descriptor, markers } => {
            cmd_normalize(&config, &descriptor, &markers)?;
        }
        Commands::AddProject {
            project,
            descriptor,
            root,
        } => {
            cmd_add_project(&config, &project, descriptor, root.unwrap_or(cwd))?;
        }
        Commands::BuilderSettings { project, xxtea_key } => {
            cmd_builder_settings(&project, xxtea_key)?;
        }
        Commands::Inject {
            file,
            preset,
            rules,
            values,
        } => {
            cmd_inject(&file, preset, rules, values)?;
        }
    }

    Ok(())
}

/// Compose the workspace
fn cmd_compose(config: &PipelineConfig, primary: &Path, secondary: &Path) -> Result<()> {
    let path = compose(primary, secondary, &config.workspace.layout).context("Failed to compose workspace")?;
    println!("Workspace created: {}", path.display());
    Ok(())
}

/// Relativize workspace references
fn cmd_normalize(config: &PipelineConfig, descriptor: &Path, markers: &[String]) -> Result<()> {
    let marker_set = config.workspace.marker_set(markers)?;
    let rewritten = normalize(descriptor, &marker_set)
        .with_context(|| format!("Failed to normalize {}", descriptor.display()))?;

    if rewritten == 0 {
        println!("No references to rewrite in {}", descriptor.display());
    } else {
        println!("Rewrote {} reference(s) in {}", rewritten, descriptor.display());
    }
    Ok(())
}

/// Add a project reference
fn cmd_add_project(
    config: &PipelineConfig,
    project: &Path,
    descriptor: Option<PathBuf>,
    root: PathBuf,
) -> Result<()> {
    let layout = &config.workspace.layout;
    let project = if project.extension().is_some_and(|ext| ext == "xcodeproj") {
        project.to_path_buf()
    } else {
        find_xcodeproj(project)?
    };
    println!("Found Xcode project: {}", project.display());

    let descriptor = match descriptor {
        Some(path) => path,
        None => find_workspace_descriptor(&root.join(&layout.folder_name), layout)?,
    };
    println!("Found workspace file: {}", descriptor.display());

    if add_project(&descriptor, &project).context("Failed to add project to workspace")? {
        println!("Project added to workspace.");
    } else {
        println!("Project already present in workspace.");
    }
    Ok(())
}

/// Patch Cocos builder settings
fn cmd_builder_settings(project: &Path, xxtea_key: String) -> Result<()> {
    let report = patch_builder_settings(project, &BuilderPatch::new(xxtea_key))?;
    println!("Updated: {}", report.settings_path.display());
    println!("Updated: {}", report.local_path.display());
    Ok(())
}

/// Inject constants into a source file
fn cmd_inject(
    file: &Path,
    preset: Option<String>,
    rules: Option<PathBuf>,
    values: Vec<(String, String)>,
) -> Result<()> {
    let injector = match (preset, rules) {
        (Some(name), _) => Injector::from_preset(&name)?,
        (None, Some(path)) => Injector::from_config_file(&path)?,
        (None, None) => anyhow::bail!("Either --preset or --rules is required"),
    };

    let values: HashMap<String, String> = values.into_iter().collect();
    let report = injector.inject_file(file, &values)?;

    for outcome in &report.outcomes {
        if outcome.replacements == 0 {
            println!("  {}: no match, unchanged", outcome.name);
        } else {
            println!("  {}: {} replacement(s)", outcome.name, outcome.replacements);
        }
    }
    if report.written {
        println!("Updated {}", file.display());
    } else {
        println!("No changes made to {}", file.display());
    }
    Ok(())
}

/// Parse `name=value`; the value may itself contain `=`
fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

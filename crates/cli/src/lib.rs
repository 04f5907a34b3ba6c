//! # meson-sigcheck
//!
//! Command-line front end: loads the signature and template catalogs,
//! sets up a scratch Meson project and runs every selected check against
//! it.
//!
//! ```text
//! CheckerConfig (defaults -> TOML -> env -> flags)
//!     │
//!     ├──> Catalog + TemplateCatalog (bundled or --catalog/--templates)
//!     │
//!     ├──> --list  ──> print signatures, no tool involved
//!     │
//!     └──> TransactionalBuildFile::create (setup once)
//!          └─> CheckOrchestrator: types, then functions
//!               └─> ResultAccumulator ──> --summarize
//! ```

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use console::style;
use sigcheck_buildfile::{BuildFileError, TransactionalBuildFile};
use sigcheck_catalog::{Callable, Catalog, TypeDescriptor};
use sigcheck_templates::TemplateCatalog;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod config;
pub mod orchestrator;
pub mod report;

pub use config::CheckerConfig;
pub use orchestrator::{CheckError, CheckOptions, CheckOrchestrator};
pub use report::{FailureSite, Reporter, ResultAccumulator};

#[derive(Parser, Debug)]
#[command(name = "meson-sigcheck")]
#[command(about = "Check a catalog of Meson function and method signatures against a real meson", long_about = None)]
#[command(version)]
struct Cli {
    /// Functions or types to check (default: all of them)
    names: Vec<String>,

    /// When checking a type, also pass it to every function and method that accepts it
    #[arg(long)]
    check_type_usages: bool,

    /// When checking a return value, also pass it to every function and method that accepts it
    #[arg(long)]
    check_returnval_usages: bool,

    /// On failure, also print the probed lines and meson output
    #[arg(short, long)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Treat meson warnings as errors
    #[arg(long)]
    warnings: bool,

    /// Describe checks by callable name, without parameter types
    #[arg(long)]
    only_function_name: bool,

    /// Print how many checks succeeded and failed
    #[arg(long)]
    summarize: bool,

    /// List the selected signatures instead of checking them
    #[arg(long)]
    list: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Signature catalog to use instead of the bundled one
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Template catalog to use instead of the bundled one
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Files copied into the generated project
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Try at most this many combinations per signature
    #[arg(long)]
    max_combinations: Option<usize>,

    /// Meson binary
    #[arg(long)]
    meson: Option<String>,

    /// Seconds before a single meson run is abandoned
    #[arg(long)]
    timeout: Option<u64>,
}

impl Cli {
    fn apply_to(&self, config: &mut CheckerConfig) {
        if let Some(meson) = &self.meson {
            config.meson = meson.clone();
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = Some(secs);
        }
        if let Some(dir) = &self.fixtures {
            config.fixtures = Some(dir.clone());
        }
        if let Some(limit) = self.max_combinations {
            config.max_combinations = Some(limit);
        }
        if let Some(path) = &self.catalog {
            config.catalog = Some(path.clone());
        }
        if let Some(path) = &self.templates {
            config.templates = Some(path.clone());
        }
        config.warnings_as_errors |= self.warnings;
        config.verbose |= self.verbose;
    }

    fn options(&self, config: &CheckerConfig) -> CheckOptions {
        CheckOptions {
            check_type_usages: self.check_type_usages,
            check_return_usages: self.check_returnval_usages,
            only_function_name: self.only_function_name,
            max_combinations: config.max_combinations,
        }
    }
}

/// Types and functions whose names appear in `names`; everything when empty
pub fn select<'c>(
    catalog: &'c Catalog,
    names: &[String],
) -> (Vec<&'c TypeDescriptor>, Vec<&'c Callable>) {
    let wanted = |name: &str| names.is_empty() || names.iter().any(|n| n == name);
    let types = catalog.types().iter().filter(|t| wanted(&t.name)).collect();
    let functions = catalog.functions().iter().filter(|f| wanted(&f.name)).collect();
    (types, functions)
}

fn print_listing(types: &[&TypeDescriptor], functions: &[&Callable]) {
    for desc in types {
        match &desc.parent {
            Some(parent) => println!("{} < {parent}", style(&desc.name).bold()),
            None => println!("{}", style(&desc.name).bold()),
        }
        for method in &desc.methods {
            for signature in &method.overloads {
                println!("    {signature}");
            }
        }
    }
    for callable in functions {
        for signature in &callable.overloads {
            println!("{signature}");
        }
    }
}

fn load_catalogs(config: &CheckerConfig) -> Result<(Catalog, TemplateCatalog)> {
    let catalog = match &config.catalog {
        Some(path) => Catalog::from_path(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::builtin().context("Bundled catalog is invalid")?,
    };
    let templates = match &config.templates {
        Some(path) => TemplateCatalog::from_path(path)
            .with_context(|| format!("Failed to load templates {}", path.display()))?,
        None => TemplateCatalog::builtin().context("Bundled templates are invalid")?,
    };
    Ok((catalog, templates))
}

/// Sets a flag on Ctrl-C; the run stops at the next probe boundary
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let signal = Arc::clone(&flag);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping after the current probe");
            signal.store(true, Ordering::SeqCst);
        }
    });
    flag
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = CheckerConfig::load(cli.config.as_deref())?;
    config.apply_env()?;
    cli.apply_to(&mut config);
    config.validate().map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    let (catalog, mut templates) = load_catalogs(&config)?;
    let (types, functions) = select(&catalog, &cli.names);
    if !cli.names.is_empty() && types.is_empty() && functions.is_empty() {
        println!(
            "No function or type found for the given name(s): '{}'",
            cli.names.join(", ")
        );
        return Ok(());
    }

    if cli.list {
        print_listing(&types, &functions);
        return Ok(());
    }

    let reporter = Reporter::new(config.verbose);
    let mut file =
        match TransactionalBuildFile::create(config.build_file_config(), Box::new(config.tool()))
            .await
        {
            Ok(file) => file,
            Err(BuildFileError::Configuration { message, stdout }) => {
                reporter.internal(&message);
                if !stdout.is_empty() {
                    println!("Something went wrong:\n{stdout}");
                }
                bail!("Could not configure the generated project");
            }
            Err(err) => return Err(err).context("Could not configure the generated project"),
        };
    // Padding between project() and the probed lines
    file.append_line("")?;
    templates.set_session_dir(file.dir());

    let results = CheckOrchestrator::new(
        &catalog,
        &templates,
        &mut file,
        reporter,
        cli.options(&config),
    )
    .with_interrupt(interrupt_flag())
    .run(&types, &functions)
    .await?;

    if cli.summarize {
        reporter.summary(&results);
    }
    Ok(())
}

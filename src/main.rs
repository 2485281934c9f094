mod config;
mod errors;
mod files;
mod json;
mod logger;
mod new;
mod swagger;

use clap::{Parser, Subcommand};
use config::Config;
use files::FsFileLoader;
use log::{debug, error, info, warn, Level, LevelFilter};
use logger::SimpleLogger;
use std::error::Error;
use std::path::{Path, PathBuf};
use swagger::dependency::DependencyAnalyzer;
use swagger::index::OperationIndex;
use test::loader::TestDefinitionLoader;
use test::template::ScenarioLogger;
use test::validation::JsonSchemaValidator;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file to use instead of ./.apiscenario
    #[arg(short, long)]
    config: Option<String>,

    /// Quiet mode suppresses all console output
    #[arg(short, long, default_value_t = false)]
    quiet: bool,

    /// Verbose mode provides more detailed console output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Trace mode provides significant console output
    #[arg(long, default_value_t = false)]
    trace: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report which resource types the examples of the given specs refer to
    Analyze {
        /// Spec files, replacing `swaggerFilePaths` from the configuration
        swagger: Vec<PathBuf>,
    },

    /// Resolve test definitions into execution plans
    Compile {
        /// Test definition files. When omitted, every .yaml/.yml file under
        /// --dir is compiled
        files: Vec<PathBuf>,

        /// Spec file to index, may be repeated
        #[arg(short, long = "swagger", name = "swagger")]
        swagger: Vec<PathBuf>,

        /// Directory searched for test definitions
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Directory the normalized definitions are written to
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a new test definition
    New {
        /// Output to console instead of saving to a file
        #[arg(short = 'o')]
        output: bool,

        /// The file name to create
        name: Option<String>,
    },
}

fn is_definition(entry: &walkdir::DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| entry.file_type().is_dir() || s.ends_with(".yaml") || s.ends_with(".yml"))
        .unwrap_or(false)
}

fn get_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_definition)
        .filter_map(|v| v.ok())
        .filter(|x| !x.file_type().is_dir())
        .map(|x| x.into_path())
        .collect()
}

fn spec_paths(cli_paths: Vec<PathBuf>, config: &Config) -> Vec<PathBuf> {
    if cli_paths.is_empty() {
        config.swagger_file_paths()
    } else {
        cli_paths
    }
}

async fn analyze(swagger: Vec<PathBuf>, config: &Config) -> Result<(), Box<dyn Error + Send + Sync>> {
    let spec_paths = spec_paths(swagger, config);
    if spec_paths.is_empty() {
        warn!("no spec files given, nothing to analyze");
        return Ok(());
    }

    let index = OperationIndex::load(&FsFileLoader, &spec_paths).await?;
    info!(
        "indexed {} operations from {} specs",
        index.operations().count(),
        spec_paths.len()
    );

    let results = DependencyAnalyzer::new(&index, config.analyzer_options())
        .analyze_dependency(&FsFileLoader)
        .await?;
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}

async fn compile(
    definitions: Vec<PathBuf>,
    swagger: Vec<PathBuf>,
    dir: PathBuf,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<bool, Box<dyn Error + Send + Sync>> {
    let spec_paths = spec_paths(swagger, config);
    if spec_paths.is_empty() {
        warn!("no spec files given, only steps with resolvable operations will compile");
    }

    let index = OperationIndex::load(&FsFileLoader, &spec_paths).await?;
    let validator = JsonSchemaValidator::new()?;
    let loader = TestDefinitionLoader::new(&index, &FsFileLoader, &validator).with_generator(&ScenarioLogger);

    let definitions = if definitions.is_empty() {
        let mut found = Vec::new();
        for path in get_files(&dir) {
            if loader.is_definition(&path).await {
                found.push(path);
            } else {
                warn!("skipping {}, not a test definition", path.display());
            }
        }
        found
    } else {
        definitions
    };
    info!("found {} test definitions", definitions.len());

    let output = output.or_else(|| config.settings.output_directory.clone().map(PathBuf::from));
    let mut all_passed = true;

    for path in definitions.iter() {
        let result = match loader.load(path).await {
            Ok(definition) => {
                debug!(
                    "{}: {} scenarios",
                    path.display(),
                    definition.test_scenarios.len()
                );
                println!("{}", serde_json::to_string_pretty(&definition)?);

                match output.as_ref().and_then(|dir| path.file_name().map(|n| dir.join(n))) {
                    Some(target) => test::file::save(&target, &definition.normalized()).await,
                    None => Ok(()),
                }
            }
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            error!("{}: {}", path.display(), e);
            all_passed = false;
            if !config.settings.continue_on_failure {
                break;
            }
        }
    }

    Ok(all_passed)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let log_level = if cli.trace {
        Level::Trace
    } else if cli.verbose {
        Level::Debug
    } else {
        Level::Info
    };

    if let Err(e) = log::set_boxed_logger(Box::new(SimpleLogger::new(log_level, cli.quiet))) {
        eprintln!("unable to create logger: {}", e);
        std::process::exit(1);
    }
    log::set_max_level(LevelFilter::Trace);

    let config = config::get_config(cli.config).await;

    match cli.command {
        Commands::New { output, name } => new::create_definition_template(output, name).await,
        Commands::Analyze { swagger } => analyze(swagger, &config).await,
        Commands::Compile {
            files,
            swagger,
            dir,
            output,
        } => {
            if !compile(files, swagger, dir, output, &config).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

//! Type-library wrapper generator CLI.
//!
//! Provides the `tlbgen` binary:
//! - `generate` runs one designator through the generation pipeline and
//!   prints a JSON summary (or the module source with `--print`)
//! - `names` prints the canonical module names of a library
//! - `clean` removes every generated module from a generation directory
//!
//! Uses the same `ModuleGenerator` as library callers, so a module
//! generated here is picked up from the store by later in-process calls.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use tlbgen_codegen::{GenSettings, GenStats, GetModuleError, ModuleGenerator};
use tlbgen_core::{parse_designator, DescriptorFileLoader, LibraryReference, Registry, StaticRegistry};
use tlbgen_storage::{FileStore, ModuleSummary};

/// Type-library wrapper generator.
#[derive(Parser)]
#[command(name = "tlbgen", about = "Generate Rust wrapper modules from type libraries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Generate (or load from cache) the module for one library.
    Generate {
        /// Library designator: a path, `clsid:{GUID}`, `{LIBID}` or
        /// `LIBID,major,minor[,lcid]`.
        designator: String,

        /// Generation directory (default: $TLBGEN_GEN_DIR or ./gen).
        #[arg(long, conflicts_with = "in_memory")]
        gen_dir: Option<PathBuf>,

        /// Generate in memory only; no files are written.
        #[arg(long)]
        in_memory: bool,

        #[command(flatten)]
        lookup: LookupArgs,

        /// Print the module source instead of a JSON summary.
        #[arg(long)]
        print: bool,
    },

    /// Print the wrapper and friendly module names of a library.
    Names {
        designator: String,

        #[command(flatten)]
        lookup: LookupArgs,
    },

    /// Remove all generated modules from a generation directory.
    Clean {
        #[arg(long)]
        gen_dir: PathBuf,
    },
}

/// Where libraries are looked up.
#[derive(Args)]
struct LookupArgs {
    /// JSON registry snapshot used for registry designators.
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Directory searched for relative library paths (repeatable).
    #[arg(long = "search-path")]
    search_paths: Vec<PathBuf>,
}

/// JSON output of `generate`.
#[derive(Serialize)]
struct GenerateReport {
    module: ModuleSummary,
    gen_dir: Option<PathBuf>,
    stats: GenStats,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Generate {
            designator,
            gen_dir,
            in_memory,
            lookup,
            print,
        } => {
            let settings = if in_memory {
                GenSettings::in_memory()
            } else {
                gen_dir
                    .map(GenSettings::with_gen_dir)
                    .unwrap_or_else(GenSettings::from_env)
            };
            run_generate(&designator, &settings, &lookup, print)
        }
        Commands::Names { designator, lookup } => run_names(&designator, &lookup),
        Commands::Clean { gen_dir } => run_clean(&gen_dir),
    };
    process::exit(exit_code);
}

/// Execute the generate subcommand.
///
/// Returns exit code: 0 = success, 1 = generation/persistence error,
/// 2 = resolution/load/parse error, 3 = I/O or argument error.
fn run_generate(designator: &str, settings: &GenSettings, lookup: &LookupArgs, print: bool) -> i32 {
    let generator = match build_generator(lookup, settings) {
        Ok(g) => g,
        Err(code) => return code,
    };
    let base_dir = std::env::current_dir().ok();
    let reference = match parse(designator, base_dir.as_deref()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    debug!("generating {:?} into {}", reference, generator.store().describe());

    let module = match generator.get_module_relative_to(&reference, base_dir.as_deref()) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code(&e);
        }
    };

    if print {
        print!("{}", module.source_text);
        return 0;
    }
    let report = GenerateReport {
        module: ModuleSummary::from(module.as_ref()),
        gen_dir: generator.gen_dir(),
        stats: generator.stats(),
    };
    print_json(&report);
    0
}

/// Execute the names subcommand.
fn run_names(designator: &str, lookup: &LookupArgs) -> i32 {
    let generator = match build_generator(lookup, &GenSettings::in_memory()) {
        Ok(g) => g,
        Err(code) => return code,
    };
    let base_dir = std::env::current_dir().ok();
    let reference = match parse(designator, base_dir.as_deref()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    match generator.names(&reference, base_dir.as_deref()) {
        Ok(names) => {
            print_json(&names);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_code(&e)
        }
    }
}

/// Execute the clean subcommand.
fn run_clean(gen_dir: &Path) -> i32 {
    if !gen_dir.is_dir() {
        print_json(&serde_json::json!({ "removed": 0 }));
        return 0;
    }
    let removed = FileStore::open(gen_dir).and_then(|store| store.clear());
    match removed {
        Ok(count) => {
            print_json(&serde_json::json!({ "removed": count }));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to clean '{}': {}", gen_dir.display(), e);
            3
        }
    }
}

fn build_generator(lookup: &LookupArgs, settings: &GenSettings) -> Result<ModuleGenerator, i32> {
    let registry: Arc<dyn Registry> = match &lookup.registry {
        Some(path) => match StaticRegistry::load(path) {
            Ok(r) => Arc::new(r),
            Err(e) => {
                eprintln!("Error: failed to read registry '{}': {}", path.display(), e);
                return Err(3);
            }
        },
        None => Arc::new(StaticRegistry::new()),
    };
    let loader = DescriptorFileLoader::new(Arc::clone(&registry))
        .with_search_paths(lookup.search_paths.clone());
    Ok(ModuleGenerator::new(registry, Arc::new(loader), settings))
}

fn parse(designator: &str, base_dir: Option<&Path>) -> Result<LibraryReference, i32> {
    parse_designator(designator, base_dir).map_err(|e| {
        eprintln!("Error: {}", e);
        2
    })
}

/// Maps a pipeline error to the process exit code.
fn exit_code(err: &GetModuleError) -> i32 {
    match err {
        GetModuleError::Resolution(_) | GetModuleError::Load(_) | GetModuleError::Parse(_) => 2,
        GetModuleError::Generation(_) | GetModuleError::Persistence(_) => 1,
    }
}

fn print_json(value: &impl Serialize) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e));
    println!("{}", json);
}

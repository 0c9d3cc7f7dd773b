use clap::{Parser, Subcommand};
use emp_experiment::batch::{run_batch, status};
use emp_experiment::config::ExperimentConfig;
use emp_experiment::store::RunStore;
use emp_experiment::unit::discover_units;
use emp_experiment::{ExperimentError, Result};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "emp-experiment")]
#[command(about = "Mutation testing and equivalent mutant detection experiment driver")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze every test program in a directory
    Run {
        /// Path to the experiment configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Directory whose subdirectories are the test programs
        #[arg(short, long)]
        programs: PathBuf,

        /// Reprocess programs that already carry the analyzed marker
        #[arg(long)]
        force: bool,

        /// Optional path to SQLite database file (default: experiment.db)
        #[arg(long, value_name = "PATH")]
        sqlite: Option<Option<PathBuf>>,
    },
    /// Show which test programs were already analyzed
    Status {
        /// Directory whose subdirectories are the test programs
        #[arg(short, long)]
        programs: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still wins over the default level
    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match cli.command {
        Commands::Run {
            config,
            programs,
            force,
            sqlite,
        } => {
            let config = ExperimentConfig::load(&config)?;

            let db_path = match sqlite {
                Some(Some(path)) => {
                    let mut full_path = PathBuf::from("db");
                    full_path.push(path);
                    Some(full_path)
                }
                Some(None) => Some(PathBuf::from("db/experiment.db")),
                None => None,
            };

            let units = discover_units(&programs)?;
            if units.is_empty() {
                return Err(ExperimentError::InvalidInput(format!(
                    "No test programs found in {}",
                    programs.display()
                )));
            }
            log::info!(
                "Found {} test programs, {} engines configured",
                units.len(),
                config.engines.len()
            );

            let mut store = match db_path {
                Some(ref path) => Some(RunStore::open(path, &config.root)?),
                None => None,
            };

            let mut orchestrator = config.build_orchestrator()?;
            let (summary, _) = run_batch(&mut orchestrator, &units, force, store.as_mut())?;

            println!("\nANALYZED: {}", summary.analyzed);
            println!(
                "FAILED: {} compile, {} workspace copy, {} mutation",
                summary.compile_failures, summary.copy_failures, summary.mutation_failures
            );
            println!("SKIPPED: {}", summary.skipped);
            println!("TOTAL MUTANTS: {}", summary.total_mutants);
        }
        Commands::Status { programs } => {
            let units = discover_units(&programs)?;
            let entries = status(&units);
            let done = entries.iter().filter(|(_, processed)| *processed).count();

            for (name, processed) in &entries {
                println!("{} {}", if *processed { "✅" } else { "⏳" }, name);
            }
            println!("\n{}/{} analyzed", done, entries.len());
        }
    }

    Ok(())
}

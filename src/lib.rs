//! # EMP Experiment
//!
//! Drives a mutation-testing experiment over a batch of test programs.
//!
//! For every program directory the pipeline:
//! - Compiles it in a transient build workspace
//! - Generates mutants with each configured mutation engine, in order
//! - Runs equivalent mutant detection on every engine that produced mutants
//! - Removes the build workspace, writes the `general_info` log and tags the
//!   program with an `already_analyzed` marker
//!
//! Compile, workspace-copy and mutation failures are contained: they are
//! appended to `failed_compile` and the batch moves on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use emp_experiment::config::ExperimentConfig;
//! use emp_experiment::unit::discover_units;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExperimentConfig::load(Path::new("experiment.json"))?;
//!     let mut orchestrator = config.build_orchestrator()?;
//!
//!     let mut all_mutants = Vec::new();
//!     for unit in discover_units(Path::new("programs"))? {
//!         if !unit.is_processed() {
//!             orchestrator.process_one(&unit, &mut all_mutants)?;
//!         }
//!     }
//!
//!     println!("{} mutants", all_mutants.len());
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod logbook;
pub mod mutant;
pub mod operators;
pub mod orchestrator;
pub mod shell;
pub mod store;
pub mod unit;
pub mod workspace;

pub use error::{ExperimentError, Result, StageFailure};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::batch::{run_batch, BatchSummary};
    pub use crate::config::ExperimentConfig;
    pub use crate::detector::EquivalenceDetector;
    pub use crate::engine::MutationEngine;
    pub use crate::error::{ExperimentError, Result, StageFailure, StageResult};
    pub use crate::mutant::Mutant;
    pub use crate::orchestrator::{Orchestrator, UnitOutcome};
    pub use crate::unit::{discover_units, TestUnit};
    pub use crate::workspace::Workspace;
}

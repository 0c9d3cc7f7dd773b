//! Per-unit pipeline: compile, mutate with every configured engine, run
//! equivalence detection, then clean up, log and tag the unit.
//!
//! Every exit path goes through the cleanup/log/tag tail. Recognized stage
//! failures ([`StageFailure`]) end the unit early and are reported in the
//! outcome. Any other error is returned once the tail has run.

use crate::detector::EquivalenceDetector;
use crate::engine::MutationEngine;
use crate::error::{Result, StageFailure};
use crate::logbook::{self, ALREADY_ANALYZED, FAILED_COMPILE, GENERAL_INFO};
use crate::mutant::Mutant;
use crate::unit::TestUnit;
use crate::workspace::{ArtifactScope, Workspace};
use chrono::{DateTime, Local};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Every engine ran; `mutants` were added to the batch sink.
    Analyzed { mutants: usize },
    Failed(StageFailure),
}

/// Collaborators for one batch. The engine list and detector are fixed at
/// construction and run in the order given.
pub struct Orchestrator {
    workspace: Box<dyn Workspace>,
    engines: Vec<Box<dyn MutationEngine>>,
    detector: Box<dyn EquivalenceDetector>,
}

impl Orchestrator {
    pub fn new(
        workspace: Box<dyn Workspace>,
        engines: Vec<Box<dyn MutationEngine>>,
        detector: Box<dyn EquivalenceDetector>,
    ) -> Self {
        Orchestrator {
            workspace,
            engines,
            detector,
        }
    }

    pub fn root_path(&self) -> &Path {
        self.workspace.root_path()
    }

    pub fn engine_names(&self) -> Vec<&str> {
        self.engines.iter().map(|e| e.name()).collect()
    }

    /// Runs the whole pipeline for `unit`, appending produced mutants to `sink`.
    ///
    /// Build artifacts are deleted, `general_info` is rewritten and the unit is
    /// tagged even when a stage returns an error. That error is then returned,
    /// otherwise the first error of the tail is.
    pub fn process_one(&mut self, unit: &TestUnit, sink: &mut Vec<Mutant>) -> Result<UnitOutcome> {
        println!("Start analysis of: {}", unit.name());
        self.clear_log_lines();

        let root = self.workspace.root_path().to_path_buf();
        let mut scope = ArtifactScope::new(self.workspace.as_mut());
        let stages = run_stages(
            &mut *scope,
            &mut self.engines,
            self.detector.as_mut(),
            unit,
            sink,
        );

        let failure_logged = match &stages {
            Ok(UnitOutcome::Failed(failure)) => {
                println!("{}", failure);
                log::warn!("{} failed at {} stage", unit.name(), failure.category());
                log_failure(&root, FAILED_COMPILE, unit)
            }
            Ok(UnitOutcome::Analyzed { .. }) => Ok(()),
            Err(e) => {
                log::error!("{} stopped: {}", unit.name(), e);
                Ok(())
            }
        };

        let released = scope.release();
        let general_info = self.log_general_info();
        let tagged = tag_as_analyzed(unit);

        let outcome = stages?;
        failure_logged?;
        released?;
        general_info?;
        tagged?;

        log::debug!("{} tagged as analyzed: {:?}", unit.name(), outcome);
        Ok(outcome)
    }

    fn clear_log_lines(&mut self) {
        self.workspace.clear_log_lines();
        for engine in &mut self.engines {
            engine.clear_log_lines();
        }
        self.detector.clear_log_lines();
    }

    /// Overwrites `general_info` with workspace, engine (in order) and detector lines.
    fn log_general_info(&self) -> Result<()> {
        let mut lines = self.workspace.log_lines();
        for engine in &self.engines {
            lines.extend(engine.log_lines());
        }
        lines.extend(self.detector.log_lines());
        logbook::write_lines(self.workspace.root_path(), GENERAL_INFO, &lines)
    }
}

fn run_stages(
    workspace: &mut dyn Workspace,
    engines: &mut [Box<dyn MutationEngine>],
    detector: &mut dyn EquivalenceDetector,
    unit: &TestUnit,
    sink: &mut Vec<Mutant>,
) -> Result<UnitOutcome> {
    if let Err(failure) = workspace.compile(unit) {
        return Ok(UnitOutcome::Failed(failure));
    }

    workspace.create_output_directory(unit)?;
    detector.setup_structure(unit)?;

    let mut produced = 0;
    for engine in engines.iter_mut() {
        engine.setup_structure(unit)?;
        if let Err(failure) = engine.mutate(unit) {
            return Ok(UnitOutcome::Failed(failure));
        }

        let mutants = engine.mutants();
        if !mutants.is_empty() {
            println!("Total mutants ({}): {}", engine.name(), mutants.len());
            detector.execute(&**engine)?;
        }

        sink.extend_from_slice(engine.mutants());
        produced += engine.mutants().len();
    }

    Ok(UnitOutcome::Analyzed { mutants: produced })
}

/// Appends one line naming the failed unit to the category log under `root`.
fn log_failure(root: &Path, category: &str, unit: &TestUnit) -> Result<()> {
    let lines = vec![format!("{} didn't compile.", unit.name())];
    logbook::append_lines(root, category, &lines)
}

fn tag_as_analyzed(unit: &TestUnit) -> Result<()> {
    let now: DateTime<Local> = Local::now();
    let lines = vec![format!("Analyzed at: {}", now.format("%d/%m/%Y %H:%M:%S"))];
    logbook::write_lines(unit.path(), ALREADY_ANALYZED, &lines)
}

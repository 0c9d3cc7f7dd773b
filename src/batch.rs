use crate::error::{Result, StageFailure};
use crate::mutant::Mutant;
use crate::orchestrator::{Orchestrator, UnitOutcome};
use crate::store::RunStore;
use crate::unit::TestUnit;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;

pub const BATCH_SUMMARY: &str = "batch_summary.json";
pub const BATCH_MUTANTS: &str = "mutants.json";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub analyzed: usize,
    pub compile_failures: usize,
    pub copy_failures: usize,
    pub mutation_failures: usize,
    pub skipped: usize,
    pub total_mutants: usize,
    pub started_at: String,
    pub finished_at: String,
}

impl BatchSummary {
    fn record(&mut self, outcome: &UnitOutcome) {
        match outcome {
            UnitOutcome::Analyzed { .. } => self.analyzed += 1,
            UnitOutcome::Failed(StageFailure::Compile(_)) => self.compile_failures += 1,
            UnitOutcome::Failed(StageFailure::WorkspaceCopy(_)) => self.copy_failures += 1,
            UnitOutcome::Failed(StageFailure::Mutation { .. }) => self.mutation_failures += 1,
        }
    }
}

/// Runs every unit through the orchestrator, one at a time. Units carrying the
/// processed marker are skipped unless `force` is set. The summary and the
/// aggregated mutants are written as JSON under the orchestrator root.
pub fn run_batch(
    orchestrator: &mut Orchestrator,
    units: &[TestUnit],
    force: bool,
    mut store: Option<&mut RunStore>,
) -> Result<(BatchSummary, Vec<Mutant>)> {
    let started: DateTime<Local> = Local::now();
    let mut summary = BatchSummary {
        started_at: started.to_rfc3339(),
        ..Default::default()
    };
    let mut all_mutants = Vec::new();

    for (i, unit) in units.iter().enumerate() {
        if !force && unit.is_processed() {
            println!("[{}/{}] Skipping {} (already analyzed)", i + 1, units.len(), unit.name());
            summary.skipped += 1;
            continue;
        }

        println!("[{}/{}] {}", i + 1, units.len(), unit.name());
        let before = all_mutants.len();
        let outcome = orchestrator.process_one(unit, &mut all_mutants)?;
        summary.record(&outcome);

        if let Some(store) = store.as_deref_mut() {
            store.record_unit(unit, &outcome, &all_mutants[before..])?;
        }
    }

    summary.total_mutants = all_mutants.len();
    summary.finished_at = Local::now().to_rfc3339();

    let root = orchestrator.root_path();
    fs::create_dir_all(root)?;
    fs::write(root.join(BATCH_SUMMARY), serde_json::to_string_pretty(&summary)?)?;
    fs::write(root.join(BATCH_MUTANTS), serde_json::to_string_pretty(&all_mutants)?)?;

    log::info!(
        "Batch finished: {} analyzed, {} failed, {} skipped, {} mutants",
        summary.analyzed,
        summary.compile_failures + summary.copy_failures + summary.mutation_failures,
        summary.skipped,
        summary.total_mutants
    );

    Ok((summary, all_mutants))
}

/// Name and processed flag of every unit, in the given order.
pub fn status(units: &[TestUnit]) -> Vec<(String, bool)> {
    units
        .iter()
        .map(|unit| (unit.name().to_string(), unit.is_processed()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, ExperimentConfig};
    use crate::logbook::{FAILED_COMPILE, GENERAL_INFO};
    use crate::unit::discover_units;
    use rusqlite::Connection;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_program(programs: &Path, name: &str, broken: bool) {
        let dir = programs.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("Calc.java"),
            "class Calc {\n    int add(int a, int b) { return a + b; }\n}\n",
        )
        .unwrap();
        if broken {
            fs::write(dir.join("BROKEN"), "").unwrap();
        }
    }

    fn config(root: &Path) -> ExperimentConfig {
        ExperimentConfig {
            root: root.to_path_buf(),
            compile_command: "test ! -e {unit}/BROKEN".to_string(),
            support_dir: None,
            source_extensions: vec!["java".to_string()],
            engines: vec![EngineConfig::Operators {
                name: "operators".to_string(),
                one_mutant_per_line: false,
            }],
            detector: Default::default(),
        }
    }

    #[test]
    fn test_run_batch_end_to_end() {
        let temp_dir = tempdir().unwrap();
        let programs = temp_dir.path().join("programs");
        let root = temp_dir.path().join("results");
        write_program(&programs, "a_ok", false);
        write_program(&programs, "b_broken", true);
        write_program(&programs, "c_done", false);
        fs::write(programs.join("c_done").join("already_analyzed"), "Analyzed at: x\n").unwrap();

        let units = discover_units(&programs).unwrap();
        let mut orchestrator = config(&root).build_orchestrator().unwrap();
        let (summary, mutants) = run_batch(&mut orchestrator, &units, false, None).unwrap();

        assert_eq!(summary.analyzed, 1);
        assert_eq!(summary.compile_failures, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.total_mutants > 0);
        assert_eq!(summary.total_mutants, mutants.len());
        assert!(mutants.iter().all(|m| m.engine == "operators"));

        assert!(units.iter().all(|u| u.is_processed()));
        assert_eq!(
            fs::read_to_string(root.join(FAILED_COMPILE)).unwrap(),
            "b_broken didn't compile.\n"
        );
        let info = fs::read_to_string(root.join(GENERAL_INFO)).unwrap();
        // Rewritten per unit; b_broken is the last one processed
        assert!(info.contains("b_broken: compilation failed"));
        assert!(!info.contains("a_ok"));
        assert!(!root.join("build").join("a_ok").exists());
        assert!(root.join("output/a_ok/equivalence/operators.json").exists());

        let saved: BatchSummary =
            serde_json::from_str(&fs::read_to_string(root.join(BATCH_SUMMARY)).unwrap()).unwrap();
        assert_eq!(saved, summary);
        let saved_mutants: Vec<Mutant> =
            serde_json::from_str(&fs::read_to_string(root.join(BATCH_MUTANTS)).unwrap()).unwrap();
        assert_eq!(saved_mutants, mutants);
    }

    #[test]
    fn test_force_reprocesses_marked_units() {
        let temp_dir = tempdir().unwrap();
        let programs = temp_dir.path().join("programs");
        let root = temp_dir.path().join("results");
        write_program(&programs, "a_ok", false);

        let units = discover_units(&programs).unwrap();
        let mut orchestrator = config(&root).build_orchestrator().unwrap();
        run_batch(&mut orchestrator, &units, false, None).unwrap();

        let (again, _) = run_batch(&mut orchestrator, &units, false, None).unwrap();
        assert_eq!(again.skipped, 1);
        assert_eq!(again.analyzed, 0);

        let (forced, _) = run_batch(&mut orchestrator, &units, true, None).unwrap();
        assert_eq!(forced.skipped, 0);
        assert_eq!(forced.analyzed, 1);
    }

    #[test]
    fn test_run_batch_records_to_store() {
        let temp_dir = tempdir().unwrap();
        let programs = temp_dir.path().join("programs");
        let root = temp_dir.path().join("results");
        write_program(&programs, "a_ok", false);
        write_program(&programs, "b_broken", true);

        let db_path = temp_dir.path().join("db").join("experiment.db");
        let mut store = RunStore::open(&db_path, &root).unwrap();
        let units = discover_units(&programs).unwrap();
        let mut orchestrator = config(&root).build_orchestrator().unwrap();
        let (summary, _) = run_batch(&mut orchestrator, &units, false, Some(&mut store)).unwrap();

        let connection = Connection::open(&db_path).unwrap();
        let units_stored: i64 = connection
            .query_row("SELECT count(*) FROM units;", [], |row| row.get(0))
            .unwrap();
        let mutants_stored: i64 = connection
            .query_row("SELECT count(*) FROM mutants;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(units_stored, 2);
        assert_eq!(mutants_stored as usize, summary.total_mutants);
    }

    #[test]
    fn test_status_lists_processed_flag() {
        let temp_dir = tempdir().unwrap();
        let programs = temp_dir.path().join("programs");
        write_program(&programs, "a", false);
        write_program(&programs, "b", false);
        fs::write(programs.join("b").join("already_analyzed"), "x").unwrap();

        let units = discover_units(&programs).unwrap();
        assert_eq!(
            status(&units),
            vec![("a".to_string(), false), ("b".to_string(), true)]
        );
    }
}

use crate::error::{ExperimentError, Result};
use crate::mutant::Mutant;
use crate::orchestrator::UnitOutcome;
use crate::unit::TestUnit;
use chrono::Local;
use rusqlite::{params, Connection};
use std::fs;
use std::path::Path;

/// SQLite record of one batch run: the run row, one row per processed unit
/// and every mutant the unit contributed to the batch.
pub struct RunStore {
    connection: Connection,
    run_id: i64,
}

impl RunStore {
    pub fn open(db_path: &Path, root: &Path) -> Result<Self> {
        println!("SQLite option: Storing run on {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let connection = Connection::open(db_path)?;
        create_schema(&connection)?;
        check_schema(&connection)?;

        let tool_version = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        connection.execute(
            "INSERT INTO runs (root, tool_version) VALUES (?1, ?2);",
            params![root.to_string_lossy(), tool_version],
        )?;
        let run_id = connection.last_insert_rowid();
        log::debug!("SQLite run id: {}", run_id);

        Ok(RunStore { connection, run_id })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    pub fn record_unit(
        &mut self,
        unit: &TestUnit,
        outcome: &UnitOutcome,
        mutants: &[Mutant],
    ) -> Result<()> {
        let (status, detail) = match outcome {
            UnitOutcome::Analyzed { .. } => ("analyzed", None),
            UnitOutcome::Failed(failure) => (failure.category(), Some(failure.to_string())),
        };
        let processed_at = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let tx = self.connection.transaction()?;
        tx.execute(
            "INSERT INTO units (run_id, name, path, status, detail, mutants, processed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                self.run_id,
                unit.name(),
                unit.path().to_string_lossy(),
                status,
                detail,
                mutants.len() as i64,
                processed_at
            ],
        )?;
        let unit_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO mutants
                     (run_id, unit_id, engine, mutant_id, original_file, path, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for mutant in mutants {
                stmt.execute(params![
                    self.run_id,
                    unit_id,
                    mutant.engine,
                    mutant.id as i64,
                    mutant.original_file.to_string_lossy(),
                    mutant.path.to_string_lossy(),
                    mutant.description
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn create_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS runs (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            root            TEXT NOT NULL,
            created_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            tool_version    TEXT
        );

        CREATE TABLE IF NOT EXISTS units (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            name            TEXT NOT NULL,
            path            TEXT NOT NULL,
            status TEXT NOT NULL
                CHECK (status IN ('analyzed','compile','workspace_copy','mutation')),
            detail          TEXT,
            mutants         INTEGER NOT NULL DEFAULT 0,
            processed_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_units_run_status ON units(run_id, status);

        CREATE TABLE IF NOT EXISTS mutants (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            run_id INTEGER NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE CASCADE,
            engine          TEXT NOT NULL,
            mutant_id       INTEGER NOT NULL,
            original_file   TEXT NOT NULL,
            path            TEXT NOT NULL,
            description     TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_mutants_unit ON mutants(unit_id);
        CREATE INDEX IF NOT EXISTS idx_mutants_engine ON mutants(engine);
        ",
    )?;
    Ok(())
}

fn check_schema(connection: &Connection) -> Result<()> {
    let table_columns: Vec<(&str, Vec<&str>)> = vec![
        ("runs", vec!["id", "root", "created_at", "tool_version"]),
        (
            "units",
            vec!["id", "run_id", "name", "path", "status", "detail", "mutants", "processed_at"],
        ),
        (
            "mutants",
            vec![
                "id",
                "run_id",
                "unit_id",
                "engine",
                "mutant_id",
                "original_file",
                "path",
                "description",
            ],
        ),
    ];

    for (table, columns) in table_columns {
        let mut stmt = connection.prepare(&format!("PRAGMA table_info({});", table))?;
        let column_names: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .filter_map(|r| r.ok())
            .collect();

        for col in columns {
            if !column_names.iter().any(|c| c == col) {
                return Err(ExperimentError::InvalidInput(format!(
                    "Database schema mismatch: missing column '{}' in table '{}'",
                    col, table
                )));
            }
        }
    }

    Ok(())
}

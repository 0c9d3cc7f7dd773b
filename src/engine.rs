use crate::error::{Result, StageFailure, StageResult};
use crate::mutant::Mutant;
use crate::operators::{get_regex_operators, should_skip_line, MutationOperator};
use crate::shell::{expand, run_shell};
use crate::unit::TestUnit;
use crate::workspace::output_dir_for;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One mutant generation strategy. Each engine owns a working directory per
/// unit and keeps the mutants of the last unit it mutated.
pub trait MutationEngine {
    fn name(&self) -> &str;
    fn setup_structure(&mut self, unit: &TestUnit) -> Result<()>;
    fn mutate(&mut self, unit: &TestUnit) -> StageResult;
    fn mutants(&self) -> &[Mutant];
    fn log_lines(&self) -> Vec<String>;
    /// Drops the lines kept for the previous unit.
    fn clear_log_lines(&mut self);
    /// Directory prepared by `setup_structure`, where mutants are written.
    fn workspace_dir(&self) -> Option<&Path>;
}

/// Shared per-unit bookkeeping for the engines in this module.
#[derive(Debug)]
struct EngineState {
    name: String,
    root: PathBuf,
    dir: Option<PathBuf>,
    mutants: Vec<Mutant>,
    log: Vec<String>,
}

impl EngineState {
    fn new(name: String, root: PathBuf) -> Self {
        EngineState {
            name,
            root,
            dir: None,
            mutants: Vec::new(),
            log: Vec::new(),
        }
    }

    fn setup(&mut self, unit: &TestUnit) -> Result<()> {
        let dir = output_dir_for(&self.root, unit).join(&self.name);
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        self.dir = Some(dir);
        self.mutants.clear();
        Ok(())
    }

    fn failure(&self, message: impl Into<String>) -> StageFailure {
        StageFailure::Mutation {
            engine: self.name.clone(),
            message: message.into(),
        }
    }

    fn require_dir(&self) -> std::result::Result<PathBuf, StageFailure> {
        self.dir
            .clone()
            .ok_or_else(|| self.failure("structure was not set up"))
    }
}

/// Built-in engine that applies the regex operator table to every source
/// file of the unit, one mutant per (line, operator) match.
pub struct OperatorEngine {
    state: EngineState,
    operators: Vec<MutationOperator>,
    extensions: Vec<String>,
    one_mutant_per_line: bool,
}

impl OperatorEngine {
    pub fn new(
        name: String,
        root: PathBuf,
        extensions: Vec<String>,
        one_mutant_per_line: bool,
    ) -> Result<Self> {
        Ok(OperatorEngine {
            state: EngineState::new(name, root),
            operators: get_regex_operators()?,
            extensions,
            one_mutant_per_line,
        })
    }

    fn mutate_file(
        &mut self,
        dir: &Path,
        unit: &TestUnit,
        relative: &Path,
    ) -> std::result::Result<(), StageFailure> {
        let source_code = fs::read_to_string(unit.path().join(relative))
            .map_err(|e| self.state.failure(format!("{}: {}", relative.display(), e)))?;
        // Each line keeps its own terminator so CRLF sources stay CRLF
        let lines: Vec<(&str, &str)> = source_code
            .split_inclusive('\n')
            .map(split_ending)
            .collect();

        for (line_idx, &(line_before_mutation, _)) in lines.iter().enumerate() {
            if should_skip_line(line_before_mutation) {
                continue;
            }

            for operator in &self.operators {
                let Some(line_mutated) = operator.apply(line_before_mutation) else {
                    continue;
                };

                let mut mutated_content = String::with_capacity(source_code.len());
                for (idx, &(body, ending)) in lines.iter().enumerate() {
                    if idx == line_idx {
                        mutated_content.push_str(&line_mutated);
                    } else {
                        mutated_content.push_str(body);
                    }
                    mutated_content.push_str(ending);
                }

                let id = self.state.mutants.len() + 1;
                let mutant_path = dir.join(id.to_string()).join(relative);
                write_mutant(&mutant_path, &mutated_content)
                    .map_err(|e| self.state.failure(format!("{}: {}", mutant_path.display(), e)))?;

                self.state.mutants.push(Mutant {
                    id,
                    engine: self.state.name.clone(),
                    original_file: relative.to_path_buf(),
                    path: mutant_path,
                    description: format!(
                        "{} line {}: '{}' -> '{}'",
                        operator.name,
                        line_idx + 1,
                        line_before_mutation.trim(),
                        line_mutated.trim()
                    ),
                });

                if self.one_mutant_per_line {
                    break;
                }
            }
        }

        Ok(())
    }
}

impl MutationEngine for OperatorEngine {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn setup_structure(&mut self, unit: &TestUnit) -> Result<()> {
        self.state.setup(unit)
    }

    fn mutate(&mut self, unit: &TestUnit) -> StageResult {
        let dir = self.state.require_dir()?;
        let sources = source_files(unit.path(), &self.extensions)
            .map_err(|e| self.state.failure(e.to_string()))?;

        for relative in &sources {
            self.mutate_file(&dir, unit, relative)?;
        }

        self.state.log.push(format!(
            "{}: {} generated {} mutants from {} source files",
            unit.name(),
            self.state.name,
            self.state.mutants.len(),
            sources.len()
        ));
        Ok(())
    }

    fn mutants(&self) -> &[Mutant] {
        &self.state.mutants
    }

    fn log_lines(&self) -> Vec<String> {
        self.state.log.clone()
    }

    fn clear_log_lines(&mut self) {
        self.state.log.clear();
    }

    fn workspace_dir(&self) -> Option<&Path> {
        self.state.dir.as_deref()
    }
}

/// Engine backed by an external mutation tool. The command gets `{unit}` and
/// `{output}` and must leave each mutant at `{output}/<id>/<relative source path>`.
pub struct CommandEngine {
    state: EngineState,
    command: String,
}

impl CommandEngine {
    pub fn new(name: String, root: PathBuf, command: String) -> Self {
        CommandEngine {
            state: EngineState::new(name, root),
            command,
        }
    }
}

impl MutationEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.state.name
    }

    fn setup_structure(&mut self, unit: &TestUnit) -> Result<()> {
        self.state.setup(unit)
    }

    fn mutate(&mut self, unit: &TestUnit) -> StageResult {
        let dir = self.state.require_dir()?;
        let command = expand(
            &self.command,
            &[("unit", unit.path()), ("output", dir.as_path())],
        );
        let output =
            run_shell(&command, Some(unit.path())).map_err(|e| self.state.failure(e))?;

        if !output.success {
            self.state.log.push(format!(
                "{}: {} failed ({})",
                unit.name(),
                self.state.name,
                output.summary()
            ));
            return Err(self.state.failure(output.summary()));
        }

        self.state.mutants = collect_mutants(&self.state.name, &dir)
            .map_err(|e| self.state.failure(e.to_string()))?;
        self.state.log.push(format!(
            "{}: {} generated {} mutants",
            unit.name(),
            self.state.name,
            self.state.mutants.len()
        ));
        Ok(())
    }

    fn mutants(&self) -> &[Mutant] {
        &self.state.mutants
    }

    fn log_lines(&self) -> Vec<String> {
        self.state.log.clone()
    }

    fn clear_log_lines(&mut self) {
        self.state.log.clear();
    }

    fn workspace_dir(&self) -> Option<&Path> {
        self.state.dir.as_deref()
    }
}

/// Splits a line produced by `split_inclusive('\n')` into its body and terminator.
fn split_ending(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}

fn write_mutant(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Source files under `dir` with one of `extensions`, relative to `dir`, sorted.
pub fn source_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| extensions.iter().any(|e| e == ext));
        if matches {
            if let Ok(relative) = entry.path().strip_prefix(dir) {
                files.push(relative.to_path_buf());
            }
        }
    }

    Ok(files)
}

/// Reads the `<id>/<relative path>` layout back into mutants, ordered by id.
fn collect_mutants(engine: &str, dir: &Path) -> Result<Vec<Mutant>> {
    let mut mutants = Vec::new();

    for entry in WalkDir::new(dir).min_depth(2) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let mut components = relative.components();
        let Some(id) = components
            .next()
            .and_then(|c| c.as_os_str().to_str())
            .and_then(|s| s.parse::<usize>().ok())
        else {
            continue;
        };

        let original_file = components.as_path().to_path_buf();
        mutants.push(Mutant {
            id,
            engine: engine.to_string(),
            description: format!("external mutant {} of {}", id, original_file.display()),
            original_file,
            path: entry.path().to_path_buf(),
        });
    }

    mutants.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.path.cmp(&b.path)));
    Ok(mutants)
}

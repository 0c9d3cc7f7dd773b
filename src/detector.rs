use crate::engine::MutationEngine;
use crate::error::{ExperimentError, Result};
use crate::unit::TestUnit;
use crate::workspace::output_dir_for;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Decides which mutants of an engine behave like the original program.
pub trait EquivalenceDetector {
    fn setup_structure(&mut self, unit: &TestUnit) -> Result<()>;
    fn execute(&mut self, engine: &dyn MutationEngine) -> Result<()>;
    fn log_lines(&self) -> Vec<String>;
    fn clear_log_lines(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Equivalent,
    Duplicated { of: usize },
    Distinct,
    Unreadable,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutantVerdict {
    pub id: usize,
    pub original_file: PathBuf,
    pub verdict: Verdict,
}

/// Flags mutants whose normalized source is identical to the original
/// (equivalent) or to an earlier mutant of the same engine (duplicated).
/// Normalization drops whitespace and, optionally, comments.
pub struct DigestDetector {
    root: PathBuf,
    strip_comments: bool,
    comment_pattern: Regex,
    unit: Option<(String, PathBuf)>,
    report_dir: Option<PathBuf>,
    log: Vec<String>,
}

impl DigestDetector {
    pub fn new(root: PathBuf, strip_comments: bool) -> Result<Self> {
        Ok(DigestDetector {
            root,
            strip_comments,
            comment_pattern: Regex::new(r"(?s)/\*.*?\*/|//[^\n]*")?,
            unit: None,
            report_dir: None,
            log: Vec::new(),
        })
    }

    fn digest_of(&self, path: &Path) -> Option<String> {
        let content = fs::read_to_string(path).ok()?;
        let content = if self.strip_comments {
            self.comment_pattern.replace_all(&content, "").into_owned()
        } else {
            content
        };
        let normalized: String = content.chars().filter(|c| !c.is_whitespace()).collect();

        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        Some(format!("{:x}", hasher.finalize()))
    }
}

impl EquivalenceDetector for DigestDetector {
    fn setup_structure(&mut self, unit: &TestUnit) -> Result<()> {
        let report_dir = output_dir_for(&self.root, unit).join("equivalence");
        fs::create_dir_all(&report_dir)?;
        self.report_dir = Some(report_dir);
        self.unit = Some((unit.name().to_string(), unit.path().to_path_buf()));
        Ok(())
    }

    fn execute(&mut self, engine: &dyn MutationEngine) -> Result<()> {
        let (Some((unit_name, unit_path)), Some(report_dir)) =
            (self.unit.clone(), self.report_dir.clone())
        else {
            return Err(ExperimentError::InvalidInput(format!(
                "equivalence detection for {} requested before setup_structure",
                engine.name()
            )));
        };

        log::debug!(
            "Checking {} mutants of {} (engine workspace: {:?})",
            engine.mutants().len(),
            engine.name(),
            engine.workspace_dir()
        );

        let mut originals: HashMap<PathBuf, Option<String>> = HashMap::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut verdicts = Vec::new();

        for mutant in engine.mutants() {
            let original = originals
                .entry(mutant.original_file.clone())
                .or_insert_with(|| self.digest_of(&unit_path.join(&mutant.original_file)))
                .clone();

            let verdict = match self.digest_of(&mutant.path) {
                None => Verdict::Unreadable,
                Some(digest) if Some(&digest) == original.as_ref() => Verdict::Equivalent,
                Some(digest) => match seen.get(&digest) {
                    Some(&first) => Verdict::Duplicated { of: first },
                    None => {
                        seen.insert(digest, mutant.id);
                        Verdict::Distinct
                    }
                },
            };

            verdicts.push(MutantVerdict {
                id: mutant.id,
                original_file: mutant.original_file.clone(),
                verdict,
            });
        }

        let equivalent = verdicts
            .iter()
            .filter(|v| v.verdict == Verdict::Equivalent)
            .count();
        let duplicated = verdicts
            .iter()
            .filter(|v| matches!(v.verdict, Verdict::Duplicated { .. }))
            .count();
        let unreadable = verdicts
            .iter()
            .filter(|v| v.verdict == Verdict::Unreadable)
            .count();

        self.log.push(format!(
            "{}: {} equivalent and {} duplicated of {} mutants from {}",
            unit_name,
            equivalent,
            duplicated,
            verdicts.len(),
            engine.name()
        ));
        if unreadable > 0 {
            self.log.push(format!(
                "{}: skipped {} unreadable mutants from {}",
                unit_name,
                unreadable,
                engine.name()
            ));
        }

        let report = serde_json::to_string_pretty(&verdicts)?;
        fs::write(report_dir.join(format!("{}.json", engine.name())), report)?;

        Ok(())
    }

    fn log_lines(&self) -> Vec<String> {
        self.log.clone()
    }

    fn clear_log_lines(&mut self) {
        self.log.clear();
    }
}

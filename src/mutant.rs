use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One generated variant of a program. The orchestrator only counts and
/// forwards these; engines and detectors are the ones that read the fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutant {
    pub id: usize,
    pub engine: String,
    /// Source file the mutant was derived from, relative to the unit directory.
    pub original_file: PathBuf,
    /// Absolute path of the mutated copy.
    pub path: PathBuf,
    pub description: String,
}

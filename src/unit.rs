use crate::error::{ExperimentError, Result};
use crate::logbook::ALREADY_ANALYZED;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One candidate program under analysis, identified by its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestUnit {
    name: String,
    path: PathBuf,
}

impl TestUnit {
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(ExperimentError::InvalidInput(format!(
                "Test unit is not a directory: {}",
                dir.display()
            )));
        }

        let path = dir.canonicalize()?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ExperimentError::InvalidInput("Invalid test unit path".to_string()))?
            .to_string();

        Ok(TestUnit { name, path })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn marker_path(&self) -> PathBuf {
        self.path.join(ALREADY_ANALYZED)
    }

    /// Whether a previous run left the processed marker in this unit.
    pub fn is_processed(&self) -> bool {
        self.marker_path().is_file()
    }
}

/// Every direct subdirectory of `programs_dir`, sorted by name.
pub fn discover_units(programs_dir: &Path) -> Result<Vec<TestUnit>> {
    let mut units = Vec::new();

    for entry in WalkDir::new(programs_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_dir() {
            units.push(TestUnit::from_dir(entry.path())?);
        }
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_discover_units_sorted_and_dirs_only() {
        let temp_dir = tempdir().unwrap();
        fs::create_dir(temp_dir.path().join("prog_b")).unwrap();
        fs::create_dir(temp_dir.path().join("prog_a")).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let units = discover_units(temp_dir.path()).unwrap();
        let names: Vec<&str> = units.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["prog_a", "prog_b"]);
        assert!(units[0].path().is_absolute());
    }

    #[test]
    fn test_processed_flag_follows_marker() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path().join("prog");
        fs::create_dir(&dir).unwrap();

        let unit = TestUnit::from_dir(&dir).unwrap();
        assert!(!unit.is_processed());

        fs::write(unit.marker_path(), "Analyzed at: now").unwrap();
        assert!(unit.is_processed());
    }

    #[test]
    fn test_from_dir_rejects_files() {
        let temp_dir = tempdir().unwrap();
        let file = temp_dir.path().join("file.java");
        fs::write(&file, "class A {}").unwrap();

        assert!(TestUnit::from_dir(&file).is_err());
    }
}

use crate::error::{Result, StageFailure, StageResult};
use crate::shell::{expand, run_shell};
use crate::unit::TestUnit;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Compiles test units and owns the batch's directory layout.
pub trait Workspace {
    fn compile(&mut self, unit: &TestUnit) -> StageResult;
    fn create_output_directory(&mut self, unit: &TestUnit) -> Result<PathBuf>;
    /// Removes the build directory of the last compiled unit, if any.
    fn delete_build_artifacts(&mut self) -> Result<()>;
    fn log_lines(&self) -> Vec<String>;
    fn clear_log_lines(&mut self);
    fn root_path(&self) -> &Path;
}

pub fn build_dir_for(root: &Path, unit: &TestUnit) -> PathBuf {
    root.join("build").join(unit.name())
}

pub fn output_dir_for(root: &Path, unit: &TestUnit) -> PathBuf {
    root.join("output").join(unit.name())
}

/// Holds a workspace while a unit's build artifacts exist. `release` deletes
/// them and reports the error; dropping without release deletes them best-effort.
pub struct ArtifactScope<'a, W: Workspace + ?Sized> {
    workspace: &'a mut W,
    released: bool,
}

impl<'a, W: Workspace + ?Sized> ArtifactScope<'a, W> {
    pub fn new(workspace: &'a mut W) -> Self {
        ArtifactScope {
            workspace,
            released: false,
        }
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.workspace.delete_build_artifacts()
    }
}

impl<W: Workspace + ?Sized> Deref for ArtifactScope<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        &*self.workspace
    }
}

impl<W: Workspace + ?Sized> DerefMut for ArtifactScope<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        &mut *self.workspace
    }
}

impl<W: Workspace + ?Sized> Drop for ArtifactScope<'_, W> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.workspace.delete_build_artifacts() {
                log::warn!("Failed to delete build artifacts: {}", e);
            }
        }
    }
}

/// Workspace that compiles each unit with a shell command template.
/// `{unit}` expands to the unit directory and `{build}` to its build directory.
pub struct CommandWorkspace {
    root: PathBuf,
    compile_command: String,
    support_dir: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    log: Vec<String>,
}

impl CommandWorkspace {
    pub fn new(root: PathBuf, compile_command: String, support_dir: Option<PathBuf>) -> Self {
        CommandWorkspace {
            root,
            compile_command,
            support_dir,
            build_dir: None,
            log: Vec::new(),
        }
    }

    fn stage_support_files(&self, build_dir: &Path) -> StageResult {
        fs::create_dir_all(build_dir).map_err(|e| {
            StageFailure::WorkspaceCopy(format!("{}: {}", build_dir.display(), e))
        })?;

        if let Some(ref support_dir) = self.support_dir {
            if !support_dir.is_dir() {
                return Err(StageFailure::WorkspaceCopy(format!(
                    "support directory not found: {}",
                    support_dir.display()
                )));
            }
            copy_tree(support_dir, build_dir).map_err(|e| {
                StageFailure::WorkspaceCopy(format!("{}: {}", support_dir.display(), e))
            })?;
        }

        Ok(())
    }
}

impl Workspace for CommandWorkspace {
    fn compile(&mut self, unit: &TestUnit) -> StageResult {
        let build_dir = build_dir_for(&self.root, unit);
        self.build_dir = Some(build_dir.clone());
        self.stage_support_files(&build_dir)?;

        let command = expand(
            &self.compile_command,
            &[("unit", unit.path()), ("build", build_dir.as_path())],
        );
        let started = Instant::now();
        let output =
            run_shell(&command, Some(unit.path())).map_err(StageFailure::Compile)?;

        if !output.success {
            self.log
                .push(format!("{}: compilation failed ({})", unit.name(), output.summary()));
            return Err(StageFailure::Compile(format!(
                "{} didn't compile: {}",
                unit.name(),
                output.summary()
            )));
        }

        self.log.push(format!(
            "{}: compiled in {} ms",
            unit.name(),
            started.elapsed().as_millis()
        ));
        Ok(())
    }

    fn create_output_directory(&mut self, unit: &TestUnit) -> Result<PathBuf> {
        let dir = output_dir_for(&self.root, unit);
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn delete_build_artifacts(&mut self) -> Result<()> {
        if let Some(dir) = self.build_dir.take() {
            if dir.exists() {
                fs::remove_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    fn log_lines(&self) -> Vec<String> {
        self.log.clone()
    }

    fn clear_log_lines(&mut self) {
        self.log.clear();
    }

    fn root_path(&self) -> &Path {
        &self.root
    }
}

/// Recursively copies every file under `src` into `dst`, keeping relative paths.
pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| anyhow::anyhow!(e))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn unit_in(dir: &Path, name: &str) -> TestUnit {
        let path = dir.join(name);
        fs::create_dir_all(&path).unwrap();
        TestUnit::from_dir(&path).unwrap()
    }

    #[test]
    fn test_compile_success_stages_support_files() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("results");
        let support = temp_dir.path().join("lib");
        fs::create_dir_all(support.join("nested")).unwrap();
        fs::write(support.join("nested/helper.jar"), "jar").unwrap();
        let unit = unit_in(temp_dir.path(), "prog1");

        let mut workspace = CommandWorkspace::new(
            root.clone(),
            "touch {build}/Main.class".to_string(),
            Some(support),
        );

        assert_eq!(workspace.compile(&unit), Ok(()));
        let build_dir = build_dir_for(&root, &unit);
        assert!(build_dir.join("Main.class").exists());
        assert!(build_dir.join("nested/helper.jar").exists());
        assert!(workspace.log_lines()[0].starts_with("prog1: compiled in"));

        workspace.delete_build_artifacts().unwrap();
        assert!(!build_dir.exists());
    }

    #[test]
    fn test_compile_failure_is_recognized() {
        let temp_dir = tempdir().unwrap();
        let unit = unit_in(temp_dir.path(), "broken");
        let mut workspace = CommandWorkspace::new(
            temp_dir.path().join("results"),
            "echo 'error: missing semicolon' 1>&2; exit 1".to_string(),
            None,
        );

        match workspace.compile(&unit) {
            Err(StageFailure::Compile(msg)) => {
                assert!(msg.contains("broken didn't compile"));
                assert!(msg.contains("missing semicolon"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_missing_support_dir_is_copy_failure() {
        let temp_dir = tempdir().unwrap();
        let unit = unit_in(temp_dir.path(), "prog");
        let mut workspace = CommandWorkspace::new(
            temp_dir.path().join("results"),
            "true".to_string(),
            Some(temp_dir.path().join("does-not-exist")),
        );

        assert!(matches!(
            workspace.compile(&unit),
            Err(StageFailure::WorkspaceCopy(_))
        ));
    }

    #[test]
    fn test_artifact_scope_deletes_on_drop() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("results");
        let unit = unit_in(temp_dir.path(), "prog");
        let mut workspace = CommandWorkspace::new(root.clone(), "true".to_string(), None);

        {
            let mut scope = ArtifactScope::new(&mut workspace);
            scope.compile(&unit).unwrap();
            assert!(build_dir_for(&root, &unit).exists());
        }

        assert!(!build_dir_for(&root, &unit).exists());
    }
}

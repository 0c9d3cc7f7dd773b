use crate::detector::DigestDetector;
use crate::engine::{CommandEngine, MutationEngine, OperatorEngine};
use crate::error::{ExperimentError, Result};
use crate::orchestrator::Orchestrator;
use crate::workspace::CommandWorkspace;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Batch root: shared logs, build artifacts and engine outputs live here.
    pub root: PathBuf,
    pub compile_command: String,
    #[serde(default)]
    pub support_dir: Option<PathBuf>,
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    #[serde(default)]
    pub engines: Vec<EngineConfig>,
    #[serde(default)]
    pub detector: DetectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineConfig {
    Operators {
        name: String,
        #[serde(default)]
        one_mutant_per_line: bool,
    },
    Command {
        name: String,
        command: String,
    },
}

impl EngineConfig {
    pub fn name(&self) -> &str {
        match self {
            EngineConfig::Operators { name, .. } | EngineConfig::Command { name, .. } => {
                name.as_str()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    #[serde(default = "default_strip_comments")]
    pub strip_comments: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            strip_comments: default_strip_comments(),
        }
    }
}

fn default_source_extensions() -> Vec<String> {
    vec!["java".to_string()]
}

fn default_strip_comments() -> bool {
    true
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ExperimentConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compile_command.trim().is_empty() {
            return Err(ExperimentError::Config(
                "compile_command must not be empty".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for engine in &self.engines {
            let name = engine.name();
            // Engine names become directory names under the unit's output dir
            if name.is_empty()
                || name.contains('/')
                || name.contains('\\')
                || name == "equivalence"
            {
                return Err(ExperimentError::Config(format!(
                    "Invalid engine name: '{}'",
                    name
                )));
            }
            if !names.insert(name) {
                return Err(ExperimentError::Config(format!(
                    "Duplicate engine name: '{}'",
                    name
                )));
            }
        }

        Ok(())
    }

    pub fn build_orchestrator(&self) -> Result<Orchestrator> {
        let workspace = CommandWorkspace::new(
            self.root.clone(),
            self.compile_command.clone(),
            self.support_dir.clone(),
        );

        let mut engines: Vec<Box<dyn MutationEngine>> = Vec::new();
        for engine in &self.engines {
            match engine {
                EngineConfig::Operators {
                    name,
                    one_mutant_per_line,
                } => engines.push(Box::new(OperatorEngine::new(
                    name.clone(),
                    self.root.clone(),
                    self.source_extensions.clone(),
                    *one_mutant_per_line,
                )?)),
                EngineConfig::Command { name, command } => engines.push(Box::new(
                    CommandEngine::new(name.clone(), self.root.clone(), command.clone()),
                )),
            }
        }

        let detector = DigestDetector::new(self.root.clone(), self.detector.strip_comments)?;

        Ok(Orchestrator::new(
            Box::new(workspace),
            engines,
            Box::new(detector),
        ))
    }
}

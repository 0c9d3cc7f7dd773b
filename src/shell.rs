use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `command` through the platform shell, capturing output.
/// Spawn failures are returned as `Err` with a readable message.
pub fn run_shell(command: &str, working_dir: Option<&Path>) -> Result<CommandOutput, String> {
    let (shell, shell_arg) = if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    };

    log::debug!("Executing command: {}", command);

    let mut cmd = Command::new(shell);
    cmd.arg(shell_arg)
        .arg(command)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = working_dir {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .map_err(|e| format!("Command execution failed: {}", e))?;

    let result = CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    log::debug!("Command exit code: {}", result.code.unwrap_or(-1));
    Ok(result)
}

/// Replaces `{key}` placeholders in a command template.
pub fn expand(template: &str, vars: &[(&str, &Path)]) -> String {
    let mut expanded = template.to_string();
    for (key, value) in vars {
        expanded = expanded.replace(&format!("{{{}}}", key), &value.to_string_lossy());
    }
    expanded
}

impl CommandOutput {
    /// Last non-empty stderr line, falling back to stdout, for one-line summaries.
    pub fn summary(&self) -> String {
        let last_line = |text: &str| {
            text.lines()
                .filter(|l| !l.trim().is_empty())
                .last()
                .map(|l| l.trim().to_string())
        };

        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or_else(|| format!("exit code {}", self.code.unwrap_or(-1)))
    }
}

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const GENERAL_INFO: &str = "general_info";
pub const FAILED_COMPILE: &str = "failed_compile";
pub const ALREADY_ANALYZED: &str = "already_analyzed";

pub fn log_path(base_path: &Path, log_name: &str) -> PathBuf {
    base_path.join(log_name)
}

/// Replaces the log with `lines`.
pub fn write_lines(base_path: &Path, log_name: &str, lines: &[String]) -> Result<()> {
    fs::create_dir_all(base_path)?;
    fs::write(log_path(base_path, log_name), render(lines))?;
    Ok(())
}

/// Adds `lines` to the end of the log, creating it if needed.
pub fn append_lines(base_path: &Path, log_name: &str, lines: &[String]) -> Result<()> {
    fs::create_dir_all(base_path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path(base_path, log_name))?;
    file.write_all(render(lines).as_bytes())?;
    Ok(())
}

fn render(lines: &[String]) -> String {
    let mut content = String::new();
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_lines_overwrites() {
        let temp_dir = tempdir().unwrap();
        write_lines(temp_dir.path(), "info", &["first".to_string()]).unwrap();
        write_lines(temp_dir.path(), "info", &["second".to_string()]).unwrap();

        let content = fs::read_to_string(temp_dir.path().join("info")).unwrap();
        assert_eq!(content, "second\n");
    }

    #[test]
    fn test_append_lines_accumulates() {
        let temp_dir = tempdir().unwrap();
        let base = temp_dir.path().join("nested");
        append_lines(&base, FAILED_COMPILE, &["a didn't compile.".to_string()]).unwrap();
        append_lines(&base, FAILED_COMPILE, &["b didn't compile.".to_string()]).unwrap();

        let content = fs::read_to_string(log_path(&base, FAILED_COMPILE)).unwrap();
        assert_eq!(content, "a didn't compile.\nb didn't compile.\n");
    }
}

use crate::error::{IoContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// One file of the finished site, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    pub fn contents_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }
}

/// Everything a successful build produced, held in memory until published.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub files: Vec<OutputFile>,
}

impl BuildOutput {
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&OutputFile> {
        let path = path.as_ref();
        self.files.iter().find(|file| file.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Writes every file into a staging directory next to `output_dir`, then
    /// swaps it into place. If writing fails the previous output is untouched.
    pub fn publish(&self, output_dir: &Path) -> Result<()> {
        let staging = sibling(output_dir, "staging");
        let previous = sibling(output_dir, "previous");

        remove_dir_if_exists(&staging)?;
        fs::create_dir_all(&staging).io_context("creating staging directory", &staging)?;

        if let Err(error) = self.write_all(&staging) {
            let _ = fs::remove_dir_all(&staging);
            return Err(error);
        }

        remove_dir_if_exists(&previous)?;
        let had_previous = output_dir.exists();
        if had_previous {
            fs::rename(output_dir, &previous).io_context("moving previous output", output_dir)?;
        }
        swap_in(&staging, output_dir, had_previous.then_some(previous.as_path()))?;
        remove_dir_if_exists(&previous)?;

        tracing::info!(
            "Published {} files to {}",
            self.files.len(),
            output_dir.display()
        );
        Ok(())
    }

    fn write_all(&self, root: &Path) -> Result<()> {
        for file in &self.files {
            let destination = root.join(&file.path);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).io_context("creating directory", parent)?;
            }
            fs::write(&destination, &file.contents).io_context("writing", &destination)?;
        }
        Ok(())
    }
}

/// Moves `staging` to `output_dir`. When that fails the previous output, if
/// any, is moved back so the site is never left missing.
fn swap_in(staging: &Path, output_dir: &Path, previous: Option<&Path>) -> Result<()> {
    let result = fs::rename(staging, output_dir).io_context("publishing output", output_dir);
    if result.is_err() {
        if let Some(previous) = previous
            && let Err(error) = fs::rename(previous, output_dir)
        {
            tracing::error!(
                "Could not restore {} from {}: {}",
                output_dir.display(),
                previous.display(),
                error
            );
        }
        let _ = fs::remove_dir_all(staging);
    }
    result
}

fn sibling(output_dir: &Path, suffix: &str) -> PathBuf {
    let name = output_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dist".to_string());
    output_dir.with_file_name(format!(".{}.{}", name, suffix))
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path).io_context("removing", path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn output() -> BuildOutput {
        BuildOutput {
            files: vec![
                OutputFile::new("index.html", "<h1>home</h1>"),
                OutputFile::new("about/index.html", "<h1>about</h1>"),
                OutputFile::new("robots.txt", "User-agent: *\n"),
            ],
        }
    }

    #[test]
    fn test_publish_writes_all_files() {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        output().publish(&dist).unwrap();

        assert_eq!(
            fs::read_to_string(dist.join("about/index.html")).unwrap(),
            "<h1>about</h1>"
        );
        assert!(dist.join("robots.txt").is_file());
        assert!(!temp.path().join(".dist.staging").exists());
    }

    #[test]
    fn test_publish_replaces_previous_output() {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(dist.join("stale")).unwrap();
        fs::write(dist.join("stale/index.html"), "old").unwrap();

        output().publish(&dist).unwrap();

        assert!(!dist.join("stale").exists());
        assert!(dist.join("index.html").is_file());
        assert!(!temp.path().join(".dist.previous").exists());
    }

    #[test]
    fn test_failed_swap_restores_previous_output() {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        let previous = temp.path().join(".dist.previous");
        fs::create_dir_all(&previous).unwrap();
        fs::write(previous.join("index.html"), "previous build").unwrap();
        let missing_staging = temp.path().join(".dist.staging");

        let error = swap_in(&missing_staging, &dist, Some(&previous)).unwrap_err();

        assert!(error.to_string().contains("publishing output"));
        assert_eq!(
            fs::read_to_string(dist.join("index.html")).unwrap(),
            "previous build"
        );
        assert!(!previous.exists());
    }

    #[test]
    fn test_get_by_path() {
        let output = output();
        assert_eq!(
            output.get("index.html").and_then(OutputFile::contents_str),
            Some("<h1>home</h1>")
        );
        assert!(output.get("missing.html").is_none());
        assert_eq!(output.len(), 3);
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Error};

/// File that receives each captured unit. Every write replaces the previous contents.
#[derive(Clone, Debug)]
pub struct OutputFile {
    path: PathBuf,
}

impl OutputFile {
    /// Validate `path` as an output target. Directories are rejected.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if path.is_dir() {
            return Err(ConfigError::OutputIsDirectory(path));
        }
        Ok(OutputFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the file with `contents`.
    pub fn write(&self, contents: &[u8]) -> Result<(), Error> {
        fs::write(&self.path, contents).map_err(|source| Error::Output {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = OutputFile::new(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::OutputIsDirectory(p) if p == dir.path()));
    }

    #[test]
    fn second_write_replaces_the_first() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputFile::new(dir.path().join("capture.txt")).unwrap();

        out.write(b"a much longer first payload").unwrap();
        out.write(b"short").unwrap();

        assert_eq!(fs::read(out.path()).unwrap(), b"short");
    }

    #[test]
    fn missing_parent_directory_surfaces_as_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let out = OutputFile::new(dir.path().join("nope").join("capture.txt")).unwrap();
        assert!(matches!(out.write(b"x"), Err(Error::Output { .. })));
    }
}

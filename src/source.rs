//! Input locators: the ways a run obtains the path of its source file.
//!
//! The pipeline only ever sees a resolved path. Interactive prompting lives
//! behind [`Prompt`], which works over any reader/writer pair so it can be
//! driven by stdin in the CLI and by byte buffers in tests.

use std::{
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::{PipelineError, Result};

pub const SOURCE_EXTENSION: &str = "csv";
const EXIT_COMMAND: &str = "exit";

pub trait SourceLocator {
    /// Returns the input path, or `None` when the operator declined to
    /// provide one.
    fn resolve_input_path(&mut self) -> Result<Option<PathBuf>>;
}

#[derive(Debug, Clone)]
pub struct FixedPath {
    path: PathBuf,
}

impl FixedPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SourceLocator for FixedPath {
    fn resolve_input_path(&mut self) -> Result<Option<PathBuf>> {
        if crate::io_utils::is_dash(&self.path) || self.path.is_file() {
            Ok(Some(self.path.clone()))
        } else {
            Ok(None)
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectoryLookup {
    dir: PathBuf,
    name: String,
}

impl DirectoryLookup {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
        }
    }
}

impl SourceLocator for DirectoryLookup {
    fn resolve_input_path(&mut self) -> Result<Option<PathBuf>> {
        Ok(candidate(&self.dir, &self.name))
    }
}

/// Asks for a file name until one resolves under `dir`. Blank answers
/// re-prompt; `exit` or end of input gives up.
pub struct Prompt<R, W> {
    dir: PathBuf,
    input: R,
    output: W,
}

impl<R, W> Prompt<R, W>
where
    R: BufRead,
    W: Write,
{
    pub fn new(dir: impl Into<PathBuf>, input: R, output: W) -> Self {
        Self {
            dir: dir.into(),
            input,
            output,
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.output, "{line}")
            .and_then(|_| self.output.flush())
            .map_err(|err| PipelineError::io("<prompt>", err))
    }
}

impl<R, W> SourceLocator for Prompt<R, W>
where
    R: BufRead,
    W: Write,
{
    fn resolve_input_path(&mut self) -> Result<Option<PathBuf>> {
        loop {
            self.write_line("Please enter a filename (or type 'exit' to quit):")?;
            let mut line = String::new();
            let read = self
                .input
                .read_line(&mut line)
                .map_err(|err| PipelineError::io("<prompt>", err))?;
            if read == 0 {
                return Ok(None);
            }
            let answer = line.trim();
            if answer.is_empty() {
                continue;
            }
            if answer == EXIT_COMMAND {
                return Ok(None);
            }
            match candidate(&self.dir, answer) {
                Some(path) => return Ok(Some(path)),
                None => {
                    debug!("No source file named '{answer}' in {:?}", self.dir);
                    self.write_line("ERROR: File not found.")?;
                }
            }
        }
    }
}

fn candidate(dir: &Path, name: &str) -> Option<PathBuf> {
    let stem = name
        .strip_suffix(&format!(".{SOURCE_EXTENSION}"))
        .unwrap_or(name);
    let path = dir.join(format!("{stem}.{SOURCE_EXTENSION}"));
    path.is_file().then_some(path)
}

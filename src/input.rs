//! Input source abstraction: file path or stdin pipe.

use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use log::debug;

/// Input source for the paginator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    /// Pick the source for a CLI input argument. `None` when there is
    /// nothing to read (no path and stdin is a terminal).
    pub fn from_arg(input: Option<&Path>) -> Option<Self> {
        if is_stdin_input(input) {
            return Some(InputSource::Stdin);
        }
        input.map(|p| InputSource::File(p.to_path_buf()))
    }

    /// Display name for reports and page titles.
    pub fn display_name(&self) -> &str {
        match self {
            InputSource::File(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("unknown"),
            InputSource::Stdin => "<stdin>",
        }
    }

    /// Stem used for output file names.
    pub fn stem(&self) -> &str {
        match self {
            InputSource::File(path) => path
                .file_stem()
                .and_then(|n| n.to_str())
                .unwrap_or("page"),
            InputSource::Stdin => "stdin",
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            InputSource::File(path) => Some(path),
            InputSource::Stdin => None,
        }
    }

    /// Read the whole input (blocking).
    pub fn read_to_string(&self) -> io::Result<String> {
        let text = match self {
            InputSource::File(path) => std::fs::read_to_string(path)?,
            InputSource::Stdin => read_all(io::stdin())?,
        };
        debug!("input: read {} bytes from {}", text.len(), self.display_name());
        Ok(text)
    }
}

/// Detect whether the given CLI input argument represents stdin.
///
/// Returns `true` if input is `Some("-")`, or if input is `None` and stdin is not a terminal.
pub fn is_stdin_input(input: Option<&Path>) -> bool {
    match input {
        Some(p) => p.as_os_str() == "-",
        None => !io::stdin().is_terminal(),
    }
}

fn read_all<R: Read>(mut reader: R) -> io::Result<String> {
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    Ok(buf)
}

use std::fmt;
use std::io;

/// Errors that can escape the editor's cooperative loop.
///
/// Only `FatalIO` ever propagates out of `main` -- every other failure mode
/// described in the design (save failures, cancelled prompts, unbound keys,
/// the quit guard) is handled in place by the component that hit it.
#[derive(Debug)]
pub enum EditorError {
    /// Terminal attribute get/set, display-size discovery, a blocking read,
    /// or the initial file open failed.
    FatalIO(String),
}

impl fmt::Display for EditorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorError::FatalIO(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<io::Error> for EditorError {
    fn from(e: io::Error) -> Self {
        EditorError::FatalIO(e.to_string())
    }
}

impl From<nix::errno::Errno> for EditorError {
    fn from(e: nix::errno::Errno) -> Self {
        EditorError::FatalIO(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EditorError>;

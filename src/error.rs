//! Error taxonomy for the scene loader (spec §7, §3 "Error record").
//!
//! The tokenizer holds at most one error; once set it is sticky (see
//! [`crate::tokenizer::Tokenizer::set_error`]). Line/column are computed
//! lazily from the byte offset only when a caller actually asks for them,
//! since the scan to find them is O(file size).

use std::fmt;
use std::path::PathBuf;

/// One diagnostic, localized to a byte offset in a specific file.
///
/// Line/column are not stored: they're expensive to compute (spec §4.D) and
/// are only worth the cost when something is actually going to print them.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub filename: PathBuf,
    pub offset: u64,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(filename: impl Into<PathBuf>, offset: u64, message: impl Into<String>) -> Self {
        ErrorRecord {
            filename: filename.into(),
            offset,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}",
            self.filename.display(),
            self.offset,
            self.message
        )
    }
}

/// Error taxonomy (spec §7): distinct kinds, not distinct Rust types, so a
/// caller can match broadly ("any syntactic error") or narrowly.
#[derive(Debug, Clone)]
pub enum PbrtError {
    /// File open failed, read failed, include depth exceeded.
    Io(ErrorRecord),
    /// Unterminated string, identifier exceeds buffer, bad numeric literal.
    Lexical(ErrorRecord),
    /// Unknown directive, directive in wrong phase, missing positional arg,
    /// mismatched brackets.
    Syntactic(ErrorRecord),
    /// Unknown enum value, wrong parameter count/type, missing required
    /// parameter, out-of-range dimension, forward reference, bad PLY header.
    Semantic(ErrorRecord),
}

impl PbrtError {
    pub fn record(&self) -> &ErrorRecord {
        match self {
            PbrtError::Io(r) | PbrtError::Lexical(r) | PbrtError::Syntactic(r) | PbrtError::Semantic(r) => r,
        }
    }

    pub fn io(filename: impl Into<PathBuf>, offset: u64, message: impl Into<String>) -> Self {
        PbrtError::Io(ErrorRecord::new(filename, offset, message))
    }

    pub fn lexical(filename: impl Into<PathBuf>, offset: u64, message: impl Into<String>) -> Self {
        PbrtError::Lexical(ErrorRecord::new(filename, offset, message))
    }

    pub fn syntactic(filename: impl Into<PathBuf>, offset: u64, message: impl Into<String>) -> Self {
        PbrtError::Syntactic(ErrorRecord::new(filename, offset, message))
    }

    pub fn semantic(filename: impl Into<PathBuf>, offset: u64, message: impl Into<String>) -> Self {
        PbrtError::Semantic(ErrorRecord::new(filename, offset, message))
    }
}

impl fmt::Display for PbrtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, record) = match self {
            PbrtError::Io(r) => ("I/O", r),
            PbrtError::Lexical(r) => ("lexical", r),
            PbrtError::Syntactic(r) => ("syntactic", r),
            PbrtError::Semantic(r) => ("semantic", r),
        };
        write!(f, "{kind} error at {record}")
    }
}

impl std::error::Error for PbrtError {}

pub type PbrtResult<T> = Result<T, PbrtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offset_and_message() {
        let e = PbrtError::syntactic("scene.pbrt", 42, "unknown directive \"Frobnicate\"");
        let s = e.to_string();
        assert!(s.contains("scene.pbrt"));
        assert!(s.contains("42"));
        assert!(s.contains("Frobnicate"));
    }
}

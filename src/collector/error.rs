//! Error type shared by all platform backends.

use crate::collector::procfs::parser::ParseError;

/// Error type for collection failures.
///
/// Backends convert their native failure codes into one of these variants;
/// raw errno values never reach the caller.
#[derive(Debug)]
pub enum CollectError {
    /// Process does not exist (never did, or exited before it could be read).
    ProcessGone(u32),
    /// I/O error reading a kernel source.
    Io(std::io::Error),
    /// Parse error in a kernel record.
    Parse(String),
    /// No backend exists for this operating system.
    Unsupported(&'static str),
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::ProcessGone(pid) => write!(f, "process {} disappeared", pid),
            CollectError::Io(e) => write!(f, "I/O error: {}", e),
            CollectError::Parse(msg) => write!(f, "parse error: {}", msg),
            CollectError::Unsupported(what) => write!(f, "unsupported on this platform: {}", what),
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CollectError {
    fn from(e: std::io::Error) -> Self {
        CollectError::Io(e)
    }
}

impl From<ParseError> for CollectError {
    fn from(e: ParseError) -> Self {
        CollectError::Parse(e.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn display_messages() {
        assert_eq!(
            CollectError::ProcessGone(42).to_string(),
            "process 42 disappeared"
        );
        assert_eq!(
            CollectError::from(ParseError::new("bad stat")).to_string(),
            "parse error: bad stat"
        );
    }

    #[test]
    fn io_error_is_exposed_as_source() {
        let err = CollectError::from(std::io::Error::other("boom"));
        assert!(err.source().is_some());
        assert!(CollectError::ProcessGone(1).source().is_none());
    }
}

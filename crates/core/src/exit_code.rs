//! Process exit codes.

use std::fmt;

/// Exit codes reported by the binary.
///
/// Stable numeric values so wrapper scripts can distinguish failure classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful completion.
    Ok = 0,
    /// Command line could not be parsed.
    Syntax = 1,
    /// Configuration file missing entries or naming unknown algorithms.
    Config = 2,
    /// A configured root or the prior archive could not be opened.
    FileSelect = 3,
    /// Filesystem I/O failure.
    FileIo = 11,
    /// Malformed archive, salt header, or index record.
    Format = 12,
    /// Cryptographic primitive failure or key-handling misuse.
    Crypto = 13,
    /// Interrupted by a signal.
    Interrupted = 20,
}

impl ExitCode {
    /// Returns the numeric process exit code.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Returns a short description used in diagnostics.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            ExitCode::Ok => "success",
            ExitCode::Syntax => "syntax or usage error",
            ExitCode::Config => "configuration error",
            ExitCode::FileSelect => "error selecting input files",
            ExitCode::FileIo => "error in file I/O",
            ExitCode::Format => "malformed archive or index",
            ExitCode::Crypto => "encryption failure",
            ExitCode::Interrupted => "interrupted by signal",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_values_are_stable() {
        assert_eq!(ExitCode::Ok.as_i32(), 0);
        assert_eq!(ExitCode::Syntax.as_i32(), 1);
        assert_eq!(ExitCode::FileIo.as_i32(), 11);
        assert_eq!(ExitCode::Interrupted.as_i32(), 20);
    }

    #[test]
    fn descriptions_are_nonempty() {
        for code in [
            ExitCode::Ok,
            ExitCode::Syntax,
            ExitCode::Config,
            ExitCode::FileSelect,
            ExitCode::FileIo,
            ExitCode::Format,
            ExitCode::Crypto,
            ExitCode::Interrupted,
        ] {
            assert!(!code.description().is_empty());
        }
    }
}

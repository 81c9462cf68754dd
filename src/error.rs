use crate::program::ProgramError;

/// Errors raised by I/O ports.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The input source has nothing left to give.
    #[error("Read EOF. Cannot continue")]
    Exhausted,

    /// An integer port was asked for a base it cannot represent.
    #[error("unsupported base {base} (allowed: {allowed})")]
    UnsupportedBase { base: u32, allowed: &'static str },

    /// The underlying reader failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that can end a run early.
///
/// Each variant maps to a distinct process exit code via
/// [`RunError::exit_code`]; only the binary turns these into an exit.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The program text failed validation.
    #[error(transparent)]
    Program(#[from] ProgramError),

    /// An input instruction (or the debugger) needed a value that will
    /// never arrive.
    #[error(transparent)]
    Input(#[from] PortError),

    /// An external interrupt arrived while running.
    #[error("Caught interrupt")]
    Interrupted,
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Program(_) => -1,
            RunError::Input(_) => -2,
            RunError::Interrupted => -3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::UnmatchedBracketKind;

    #[test]
    fn exit_codes_are_distinct() {
        let imbalance = RunError::Program(ProgramError::BracketImbalance {
            ip: 0,
            kind: UnmatchedBracketKind::TooManyOpen,
        });
        assert_eq!(imbalance.exit_code(), -1);
        assert_eq!(RunError::from(PortError::Exhausted).exit_code(), -2);
        assert_eq!(RunError::Interrupted.exit_code(), -3);
    }
}

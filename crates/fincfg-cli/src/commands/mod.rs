//! Command implementations for fincfg-cli

pub mod apply;
pub mod drift;
pub mod kinds;
pub mod validate;

pub use apply::run_apply;
pub use drift::run_drift;
pub use kinds::run_kinds;
pub use validate::run_validate;

/// How a command that ran to completion ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Nothing failed, nothing drifted
    Clean,
    /// The run finished but reported failures, invalid documents, or drift
    Findings,
}

impl ExitStatus {
    pub fn from_findings(found: bool) -> Self {
        if found { Self::Findings } else { Self::Clean }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::Findings => 1,
        }
    }
}

/// Print `value` as pretty JSON on stdout
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> crate::error::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

//! CLI-level error type: engine errors plus plain usage errors for
//! input the core library has no opinion on (CLI flag combinations,
//! string-to-enum parsing done for a nicer message before the engine
//! would otherwise reject it).

use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Engine(#[from] mnemon_core::MnemonError),

    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        CliError::Usage(message.into())
    }
}

//! Domain error types.

/// A parse error with position information for formula parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for marketsim.
#[derive(Debug, thiserror::Error)]
pub enum MarketsimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("formula error in {location}: {source}")]
    Formula {
        location: String,
        source: ParseError,
    },

    #[error("invalid trading system: {reason}")]
    SystemInvalid { reason: String },

    #[error("failed to build {series} series: {reason}")]
    Build { series: String, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("simulation run failed: {reason}")]
    Run { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MarketsimError> for std::process::ExitCode {
    fn from(err: &MarketsimError) -> Self {
        let code: u8 = match err {
            MarketsimError::Io(_) => 1,
            MarketsimError::ConfigParse { .. }
            | MarketsimError::ConfigMissing { .. }
            | MarketsimError::ConfigInvalid { .. } => 2,
            MarketsimError::Formula { .. } | MarketsimError::SystemInvalid { .. } => 3,
            MarketsimError::Build { .. } | MarketsimError::Data { .. } => 4,
            MarketsimError::Run { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

//! CLI error types.

use std::fmt;

use mart_core::{CoreError, ErrorKind};
use mart_market::MarketError;
use mart_store::StoreError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration.
    Config(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// The marketplace rejected the request.
    Market(MarketError),
    /// State file could not be loaded or saved.
    State(StoreError),
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl CliError {
    /// Taxonomy kind of a rejected request, if the marketplace produced one.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Market(e) => Some(e.kind()),
            Self::State(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Market(e) => write!(f, "{}: {e}", e.kind()),
            Self::State(e) => write!(f, "state error: {e}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Market(e) => Some(e),
            Self::State(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<MarketError> for CliError {
    fn from(err: MarketError) -> Self {
        match err {
            MarketError::Config(msg) => Self::Config(msg),
            other => Self::Market(other),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::State(err)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_errors_are_prefixed_with_kind() {
        let err = CliError::from(MarketError::validation("price must be positive"));
        assert_eq!(err.kind(), Some(ErrorKind::Validation));
        assert!(err.to_string().starts_with("validation"));
    }

    #[test]
    fn config_market_error_becomes_config() {
        let err = CliError::from(MarketError::Config("bad toml".into()));
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.to_string(), "configuration error: bad toml");
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn core_error_is_invalid_argument() {
        let err = CliError::from(CoreError::InvalidAmount("negative values not allowed".into()));
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}

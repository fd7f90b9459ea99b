use crate::config::ConfigError;
use crate::programs::tables::TablesError;
use crate::telemetry::TelemetryError;
use std::fmt;

/// Fatal conditions raised while evaluating a program.
///
/// Configuration-class variants point at a malformed program definition; the currency variant
/// is a data-class failure raised by the converter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("filter set for {kind} must declare at least one filter")]
    EmptyFilterSet { kind: &'static str },
    #[error("matches state for {kind} must declare at least one aggregation")]
    EmptyAggregationSet { kind: &'static str },
    #[error("unresolvable reference '{0}'")]
    UnresolvableReference(String),
    #[error("currency '{0}' is not present in the exchange rate table")]
    UnsupportedCurrency(String),
}

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Json(serde_json::Error),
    Tables(TablesError),
    Engine(EngineError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Json(err) => write!(f, "invalid json: {}", err),
            AppError::Tables(err) => write!(f, "reference tables error: {}", err),
            AppError::Engine(err) => write!(f, "evaluation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Tables(err) => Some(err),
            AppError::Engine(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<TablesError> for AppError {
    fn from(value: TablesError) -> Self {
        Self::Tables(value)
    }
}

impl From<EngineError> for AppError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

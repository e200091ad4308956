use thiserror::Error;

use crate::data_structures::ParseParamError;

/// Failures talking to the market-data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode provider payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("provider returned an error ({code}): {description}")]
    Api { code: String, description: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("rate limited by provider")]
    RateLimit,
    #[error("no data returned for {symbol}")]
    NoData { symbol: String },
}

/// Failures while turning a history into a chart artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{rows} rows exceed the safety threshold of {threshold}; enable allow_large_datasets to render anyway")]
    TooMuchData { rows: usize, threshold: usize },
    #[error("nothing to render")]
    EmptyChart,
    #[error("failed to write chart artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to export csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("moving average failed: {0}")]
    Analysis(#[from] tickerkit::DemoError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Param(#[from] ParseParamError),
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    pub fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key,
            message: message.into(),
        }
    }
}

/// Errors surfaced by [`crate::visualizer::TickerVisualizer::run`].
#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ConfigError),
}

impl VisualizerError {
    pub fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        VisualizerError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

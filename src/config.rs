use crate::chart::ChartStyle;
use crate::data_structures::{Interval, Period};
use crate::error::ConfigError;
use crate::yahoo::backoff_delay;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_SYMBOL: &str = "CDR.WA";
pub const DEFAULT_MOVING_AVERAGES: [usize; 2] = [4, 30];
pub const DEFAULT_ROW_THRESHOLD: usize = 10_000;
pub const MAX_MOVING_AVERAGES: usize = 7;

// What to fetch and how to draw it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub symbol: String,
    pub period: Period,
    pub interval: Interval,
    /// One overlay per window, drawn over closing prices.
    pub moving_average_windows: Vec<usize>,
    /// Adds the volume sub-panel.
    pub show_volume: bool,
    pub style: ChartStyle,
    /// Histories longer than this are refused unless `allow_large_datasets` is set.
    pub safety_row_threshold: usize,
    pub allow_large_datasets: bool,
    /// Canvas width:height.
    pub fig_ratio: (f64, f64),
    pub fig_scale: f64,
    /// Keep calendar gaps (weekends, holidays) on the time axis.
    pub show_nontrading: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            symbol: DEFAULT_SYMBOL.to_string(),
            period: Period::ThreeMonths,
            interval: Interval::OneDay,
            moving_average_windows: DEFAULT_MOVING_AVERAGES.to_vec(),
            show_volume: true,
            style: ChartStyle::Yahoo,
            safety_row_threshold: DEFAULT_ROW_THRESHOLD,
            allow_large_datasets: false,
            fig_ratio: (3.0, 2.0),
            fig_scale: 1.0,
            show_nontrading: false,
        }
    }
}

impl ChartConfig {
    /// Defaults for `symbol`, validated.
    pub fn new(symbol: &str) -> Result<Self, ConfigError> {
        Self {
            symbol: symbol.to_string(),
            ..Self::default()
        }
        .validated()
    }

    /// Normalise the symbol and check every option.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        let symbol = self.symbol.trim();
        if symbol.is_empty() {
            return Err(ConfigError::invalid("symbol", "must not be empty"));
        }
        if symbol.chars().any(char::is_whitespace) {
            return Err(ConfigError::invalid(
                "symbol",
                format!("'{}' contains whitespace", symbol),
            ));
        }
        self.symbol = symbol.to_uppercase();

        if self.moving_average_windows.len() > MAX_MOVING_AVERAGES {
            return Err(ConfigError::invalid(
                "moving_average_windows",
                format!("at most {} windows are supported", MAX_MOVING_AVERAGES),
            ));
        }
        for (idx, window) in self.moving_average_windows.iter().enumerate() {
            if *window == 0 {
                return Err(ConfigError::invalid("moving_average_windows", "windows must be at least 1"));
            }
            if self.moving_average_windows[..idx].contains(window) {
                return Err(ConfigError::invalid(
                    "moving_average_windows",
                    format!("window {} is listed twice", window),
                ));
            }
        }

        if self.safety_row_threshold == 0 {
            return Err(ConfigError::invalid("safety_row_threshold", "must be at least 1"));
        }

        let (w, h) = self.fig_ratio;
        if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
            return Err(ConfigError::invalid("fig_ratio", "both parts must be positive"));
        }
        if !(self.fig_scale.is_finite() && self.fig_scale > 0.0) {
            return Err(ConfigError::invalid("fig_scale", "must be positive"));
        }

        Ok(self)
    }

    pub fn with_moving_averages(mut self, windows: Vec<usize>) -> Self {
        self.moving_average_windows = windows;
        self
    }

    pub fn with_row_threshold(mut self, threshold: usize, allow_large_datasets: bool) -> Self {
        self.safety_row_threshold = threshold;
        self.allow_large_datasets = allow_large_datasets;
        self
    }
}

// Where the artifacts go
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `.svg`, or `.html`/`.htm` for an HTML page wrapping the SVG.
    pub path: PathBuf,
    pub csv_path: Option<PathBuf>,
    pub terminal_preview: bool,
    pub print_info: bool,
    pub tail_rows: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chart.svg"),
            csv_path: None,
            terminal_preview: false,
            print_info: true,
            tail_rows: 10,
        }
    }
}

// Provider client settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub max_retries: u32,
    /// First retry delay; each later retry doubles it.
    pub backoff_base_ms: u64,
    pub random_agent: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 30,
            rate_limit_per_minute: 30,
            max_retries: 3,
            backoff_base_ms: 1000,
            random_agent: true,
        }
    }
}

impl ProviderConfig {
    /// Limit for a single HTTP request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    /// Upper bound for one provider call: every attempt timing out plus the
    /// longest possible backoff before each retry, and a second of slack.
    pub fn fetch_budget(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let backoff: Duration = (1..=self.max_retries)
            .map(|attempt| backoff_delay(attempt, 1.0, self.backoff_base()))
            .sum();
        self.timeout()
            .saturating_mul(attempts)
            .saturating_add(backoff)
            .saturating_add(Duration::from_secs(1))
    }
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(default)]
pub struct ConfigYaml {
    pub chart: ChartConfig,
    pub output: OutputConfig,
    pub provider: ProviderConfig,
}

// Holds application-wide settings
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub chart: ChartConfig,
    pub output: OutputConfig,
    pub provider: ProviderConfig,
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    pub fn from_yaml(file_path: &str) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, ConfigError> {
        let yaml_config: ConfigYaml = serde_yaml::from_str(yaml_content)?;
        Self::from_parts(yaml_config.chart, yaml_config.output, yaml_config.provider)
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut chart = ChartConfig::default();
        let mut output = OutputConfig::default();
        let mut provider = ProviderConfig::default();

        if let Some(symbol) = lookup("TICKER_SYMBOL") {
            chart.symbol = symbol;
        }
        if let Some(period) = lookup("TICKER_PERIOD") {
            chart.period = period.parse()?;
        }
        if let Some(interval) = lookup("TICKER_INTERVAL") {
            chart.interval = interval.parse()?;
        }
        if let Some(windows) = lookup("TICKER_MAV") {
            chart.moving_average_windows = parse_windows(&windows)?;
        }
        if let Some(value) = lookup("TICKER_VOLUME") {
            chart.show_volume = parse_bool("TICKER_VOLUME", &value)?;
        }
        if let Some(style) = lookup("TICKER_STYLE") {
            chart.style = style
                .parse()
                .map_err(|message| ConfigError::invalid("TICKER_STYLE", message))?;
        }
        if let Some(value) = lookup("TICKER_ROW_THRESHOLD") {
            chart.safety_row_threshold = parse_number("TICKER_ROW_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("TICKER_ALLOW_LARGE") {
            chart.allow_large_datasets = parse_bool("TICKER_ALLOW_LARGE", &value)?;
        }
        if let Some(value) = lookup("TICKER_SHOW_NONTRADING") {
            chart.show_nontrading = parse_bool("TICKER_SHOW_NONTRADING", &value)?;
        }

        if let Some(path) = lookup("TICKER_OUTPUT") {
            output.path = PathBuf::from(path);
        }
        output.csv_path = lookup("TICKER_CSV").filter(|p| !p.is_empty()).map(PathBuf::from);
        if let Some(value) = lookup("TICKER_TERMINAL") {
            output.terminal_preview = parse_bool("TICKER_TERMINAL", &value)?;
        }
        if let Some(value) = lookup("TICKER_PRINT_INFO") {
            output.print_info = parse_bool("TICKER_PRINT_INFO", &value)?;
        }
        if let Some(value) = lookup("TICKER_TAIL_ROWS") {
            output.tail_rows = parse_number("TICKER_TAIL_ROWS", &value)?;
        }

        if let Some(url) = lookup("PROVIDER_BASE_URL") {
            provider.base_url = url;
        }
        if let Some(value) = lookup("PROVIDER_TIMEOUT_SECS") {
            provider.timeout_secs = parse_number("PROVIDER_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("PROVIDER_RATE_LIMIT") {
            provider.rate_limit_per_minute = parse_number("PROVIDER_RATE_LIMIT", &value)?;
        }
        if let Some(value) = lookup("PROVIDER_MAX_RETRIES") {
            provider.max_retries = parse_number("PROVIDER_MAX_RETRIES", &value)?;
        }
        if let Some(value) = lookup("PROVIDER_BACKOFF_MS") {
            provider.backoff_base_ms = parse_number("PROVIDER_BACKOFF_MS", &value)?;
        }

        Self::from_parts(chart, output, provider)
    }

    fn from_parts(
        chart: ChartConfig,
        output: OutputConfig,
        provider: ProviderConfig,
    ) -> Result<Self, ConfigError> {
        if provider.timeout_secs == 0 {
            return Err(ConfigError::invalid("provider.timeout_secs", "must be at least 1"));
        }
        if provider.rate_limit_per_minute == 0 {
            return Err(ConfigError::invalid(
                "provider.rate_limit_per_minute",
                "must be at least 1",
            ));
        }

        Ok(Self {
            chart: chart.validated()?,
            output,
            provider,
        })
    }
}

fn parse_windows(value: &str) -> Result<Vec<usize>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_number("TICKER_MAV", s))
        .collect()
}

fn parse_number<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", value)))
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("'{}' is not a boolean", other))),
    }
}

use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tickerkit::utils::MovingAverageSeries;
use tickerkit::Timer;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use crate::chart::{CandlestickChart, ChartRenderer, SvgRenderer, TerminalRenderer};
use crate::config::{AppConfig, ChartConfig, OutputConfig};
use crate::data_structures::PriceHistory;
use crate::error::{ProviderError, RenderError, VisualizerError};
use crate::provider::MarketDataProvider;

/// What one visualization run produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualizationReport {
    pub symbol: String,
    pub title: String,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub artifacts: Vec<PathBuf>,
}

/// Fetches one ticker and renders its chart.
pub struct TickerVisualizer<P> {
    provider: P,
    chart: ChartConfig,
    output: OutputConfig,
    fetch_timeout: Duration,
    renderers: Vec<Box<dyn ChartRenderer>>,
}

impl<P: MarketDataProvider> TickerVisualizer<P> {
    /// Renderers follow `config.output`: the SVG/HTML file, plus the terminal
    /// preview when enabled.
    pub fn new(provider: P, config: &AppConfig) -> Self {
        let mut renderers: Vec<Box<dyn ChartRenderer>> =
            vec![Box::new(SvgRenderer::new(config.output.path.clone()))];
        if config.output.terminal_preview {
            renderers.push(Box::new(TerminalRenderer::default()));
        }

        Self {
            provider,
            chart: config.chart.clone(),
            output: config.output.clone(),
            fetch_timeout: config.provider.fetch_budget(),
            renderers,
        }
    }

    pub fn with_renderers(mut self, renderers: Vec<Box<dyn ChartRenderer>>) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    #[instrument(skip(self), fields(symbol = %self.chart.symbol, provider = self.provider.name()))]
    pub async fn run(&mut self) -> Result<VisualizationReport, VisualizerError> {
        let timer = Timer::start("visualize");
        let symbol = self.chart.symbol.clone();
        let (period, interval) = (self.chart.period, self.chart.interval);

        let info = guarded(
            &symbol,
            "metadata",
            self.fetch_timeout,
            self.provider.ticker_info(&symbol),
        )
        .await?;

        let history = guarded(
            &symbol,
            "history",
            self.fetch_timeout,
            self.provider.history(&symbol, period, interval),
        )
        .await?;

        if history.is_empty() {
            return Err(VisualizerError::unavailable(
                &symbol,
                format!("no rows for period {} at interval {}", period, interval),
            ));
        }
        info!(rows = history.len(), %period, %interval, "Fetched price history");

        if self.output.print_info {
            match serde_json::to_string_pretty(&info) {
                Ok(json) => println!("{}", json),
                Err(err) => warn!(error = %err, "Could not serialize ticker info"),
            }
        }
        if self.output.tail_rows > 0 {
            print!("{}", format_tail(&history, self.output.tail_rows, interval.is_intraday()));
        }

        check_row_threshold(history.len(), &self.chart)?;

        let title = info.display_name().to_string();
        let chart = CandlestickChart::build(&title, &history, &self.chart)?;

        let mut artifacts = Vec::new();
        for renderer in &self.renderers {
            if let Some(path) = renderer.render(&chart)? {
                info!(renderer = renderer.name(), path = %path.display(), "Rendered chart");
                artifacts.push(path);
            }
        }

        if let Some(csv_path) = &self.output.csv_path {
            write_csv(csv_path, &history, &chart.moving_averages)?;
            info!(path = %csv_path.display(), "Exported rows");
            artifacts.push(csv_path.clone());
        }

        timer.log_elapsed();
        Ok(VisualizationReport {
            symbol: history.symbol.clone(),
            title,
            rows: history.len(),
            first_date: history.bars().first().map(|b| b.date),
            last_date: history.bars().last().map(|b| b.date),
            artifacts,
        })
    }
}

/// Await one provider call; failures and timeouts become `DataUnavailable`.
async fn guarded<T, F>(
    symbol: &str,
    what: &str,
    limit: Duration,
    call: F,
) -> Result<T, VisualizerError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            warn!(symbol, what, error = %err, "Provider call failed");
            Err(VisualizerError::unavailable(symbol, format!("{} request failed: {}", what, err)))
        }
        Err(_) => {
            warn!(symbol, what, timeout_ms = limit.as_millis() as u64, "Provider call timed out");
            Err(VisualizerError::unavailable(
                symbol,
                format!("{} request timed out after {:?}", what, limit),
            ))
        }
    }
}

/// Refuse histories above the safety threshold unless explicitly allowed.
pub fn check_row_threshold(rows: usize, config: &ChartConfig) -> Result<(), RenderError> {
    if rows <= config.safety_row_threshold {
        return Ok(());
    }
    if config.allow_large_datasets {
        warn!(
            rows,
            threshold = config.safety_row_threshold,
            "Rendering a history above the safety threshold"
        );
        return Ok(());
    }
    Err(RenderError::TooMuchData {
        rows,
        threshold: config.safety_row_threshold,
    })
}

/// Last `n` rows as an aligned text table.
pub fn format_tail(history: &PriceHistory, n: usize, intraday: bool) -> String {
    let stamp_width = if intraday { 16 } else { 10 };
    let mut out = format!(
        "{:<stamp_width$}  {:>10}  {:>10}  {:>10}  {:>10}  {:>12}\n",
        "Date", "Open", "High", "Low", "Close", "Volume"
    );
    for bar in history.tail(n) {
        let stamp = if intraday {
            bar.time.format("%Y-%m-%d %H:%M").to_string()
        } else {
            bar.date.to_string()
        };
        out.push_str(&format!(
            "{:<stamp_width$}  {:>10.2}  {:>10.2}  {:>10.2}  {:>10.2}  {:>12}\n",
            stamp, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    out
}

/// Write every row with its moving averages; undefined averages are left blank.
pub fn write_csv(
    path: &Path,
    history: &PriceHistory,
    moving_averages: &[MovingAverageSeries],
) -> Result<(), RenderError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = ["date", "time", "open", "high", "low", "close", "volume"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    header.extend(moving_averages.iter().map(|s| s.label()));
    writer.write_record(&header)?;

    for (idx, bar) in history.bars().iter().enumerate() {
        let mut record = vec![
            bar.date.to_string(),
            bar.time.to_rfc3339(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ];
        record.extend(moving_averages.iter().map(|series| {
            series
                .values
                .get(idx)
                .copied()
                .flatten()
                .map(|v| format!("{:.4}", v))
                .unwrap_or_default()
        }));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    debug!(path = %path.display(), rows = history.len(), "CSV written");
    Ok(())
}

//! Chart model and renderers.
//!
//! [`CandlestickChart`] is renderer-agnostic: candle geometry on a unitless x axis,
//! moving-average overlays and canvas size. Renderers turn it into an artifact.

pub mod style;
pub mod svg;
pub mod terminal;

pub use style::{ChartStyle, Palette};
pub use svg::SvgRenderer;
pub use terminal::TerminalRenderer;

use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;
use tickerkit::utils::{moving_averages, MovingAverageSeries};

use crate::config::ChartConfig;
use crate::data_structures::{Interval, PriceHistory};
use crate::error::RenderError;

const PIXELS_PER_RATIO_UNIT: f64 = 300.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub x: f64,
    pub time: DateTime<Utc>,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

#[derive(Debug, Clone)]
pub struct CandlestickChart {
    pub title: String,
    pub interval: Interval,
    pub candles: Vec<Candle>,
    pub moving_averages: Vec<MovingAverageSeries>,
    pub show_volume: bool,
    pub style: ChartStyle,
    pub width_px: u32,
    pub height_px: u32,
}

impl CandlestickChart {
    pub fn build(
        title: &str,
        history: &PriceHistory,
        config: &ChartConfig,
    ) -> Result<Self, RenderError> {
        let bars = history.bars();
        let Some(first) = bars.first() else {
            return Err(RenderError::EmptyChart);
        };

        // Bar index when gaps are hidden, else elapsed time in bar units.
        let unit = config.interval.approx_seconds() as f64;
        let candles = bars
            .iter()
            .enumerate()
            .map(|(idx, bar)| {
                let x = if config.show_nontrading {
                    (bar.time - first.time).num_seconds() as f64 / unit
                } else {
                    idx as f64
                };
                Candle {
                    x,
                    time: bar.time,
                    date: bar.date,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume,
                }
            })
            .collect();

        let moving_averages = moving_averages(&history.closes(), &config.moving_average_windows)?;

        let (ratio_w, ratio_h) = config.fig_ratio;
        let width_px = (ratio_w * PIXELS_PER_RATIO_UNIT * config.fig_scale).round().max(320.0) as u32;
        let height_px = (ratio_h * PIXELS_PER_RATIO_UNIT * config.fig_scale).round().max(200.0) as u32;

        Ok(Self {
            title: title.to_string(),
            interval: config.interval,
            candles,
            moving_averages,
            show_volume: config.show_volume,
            style: config.style,
            width_px,
            height_px,
        })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Inclusive x extent, padded by half a bar on each side.
    pub fn x_range(&self) -> (f64, f64) {
        let first = self.candles.first().map_or(0.0, |c| c.x);
        let last = self.candles.last().map_or(0.0, |c| c.x);
        (first - 0.5, last + 0.5)
    }

    /// Smallest gap between neighbouring candles; 1.0 for a single candle.
    pub fn slot_width(&self) -> f64 {
        self.candles
            .windows(2)
            .map(|pair| pair[1].x - pair[0].x)
            .filter(|gap| *gap > 0.0)
            .fold(f64::INFINITY, f64::min)
            .min(1.0)
    }

    /// Low/high across candles and overlays, padded by 5% of the span.
    pub fn price_bounds(&self) -> (f64, f64) {
        let overlay_values = self
            .moving_averages
            .iter()
            .flat_map(|series| series.values.iter().flatten().copied());
        let lows = self.candles.iter().map(|c| c.low).chain(overlay_values.clone());
        let highs = self.candles.iter().map(|c| c.high).chain(overlay_values);

        let low = lows.fold(f64::INFINITY, f64::min);
        let high = highs.fold(f64::NEG_INFINITY, f64::max);
        if !low.is_finite() || !high.is_finite() {
            return (0.0, 1.0);
        }

        let span = high - low;
        let pad = if span > 0.0 { span * 0.05 } else { high.abs().max(1.0) * 0.05 };
        (low - pad, high + pad)
    }

    pub fn max_volume(&self) -> u64 {
        self.candles.iter().map(|c| c.volume).max().unwrap_or(0)
    }

    /// `(x, value)` for every defined point of one overlay.
    pub fn overlay_points(&self, series: &MovingAverageSeries) -> Vec<(f64, f64)> {
        series
            .defined_points()
            .filter_map(|(idx, value)| self.candles.get(idx).map(|c| (c.x, value)))
            .collect()
    }
}

/// Turns a [`CandlestickChart`] into an artifact.
pub trait ChartRenderer {
    fn name(&self) -> &'static str;

    /// Returns the written path for file-based renderers.
    fn render(&self, chart: &CandlestickChart) -> Result<Option<PathBuf>, RenderError>;
}

#[cfg(test)]
pub(crate) mod testkit {
    use super::*;
    use crate::data_structures::PriceBar;
    use chrono::{Duration, TimeZone};

    /// Weekday-only daily bars with a gentle upward drift.
    pub fn daily_history(symbol: &str, rows: usize) -> PriceHistory {
        let mut time = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let mut bars = Vec::with_capacity(rows);
        let mut close = 100.0;
        while bars.len() < rows {
            let weekday = chrono::Datelike::weekday(&time);
            if weekday != chrono::Weekday::Sat && weekday != chrono::Weekday::Sun {
                let open = close;
                close = open + if bars.len() % 3 == 0 { -1.5 } else { 2.0 };
                bars.push(PriceBar {
                    time,
                    date: time.date_naive(),
                    open,
                    high: open.max(close) + 1.0,
                    low: open.min(close) - 1.0,
                    close,
                    volume: 10_000 + bars.len() as u64 * 250,
                });
            }
            time += Duration::days(1);
        }
        PriceHistory::new(symbol, bars)
    }
}

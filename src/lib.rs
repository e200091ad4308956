//! Candlestick charts for a single ticker.
//!
//! [`visualizer::TickerVisualizer`] fetches metadata and OHLCV history through a
//! [`provider::MarketDataProvider`] (the Yahoo chart endpoint by default), checks
//! the row count against the configured safety threshold and renders the chart
//! with moving-average overlays and a volume panel.

pub mod chart;
pub mod config;
pub mod data_structures;
pub mod error;
pub mod provider;
pub mod visualizer;
pub mod yahoo;

pub use config::{AppConfig, ChartConfig};
pub use error::{ProviderError, RenderError, VisualizerError};
pub use visualizer::{TickerVisualizer, VisualizationReport};

use std::path::PathBuf;
use textplots::{Chart, Plot, Shape};

use super::{CandlestickChart, ChartRenderer};
use crate::error::RenderError;

/// Braille line preview of closes and moving averages on stdout.
#[derive(Debug, Clone, Copy)]
pub struct TerminalRenderer {
    pub width: u32,
    pub height: u32,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self {
            width: 120,
            height: 30,
        }
    }
}

impl TerminalRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ChartRenderer for TerminalRenderer {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn render(&self, chart: &CandlestickChart) -> Result<Option<PathBuf>, RenderError> {
        let lines = line_series(chart);
        let Some((closes, overlays)) = lines.split_first() else {
            return Err(RenderError::EmptyChart);
        };
        if closes.is_empty() {
            return Err(RenderError::EmptyChart);
        }

        let (x_min, x_max) = chart.x_range();
        println!("{} ({} rows)", chart.title, chart.len());
        println!("{}", legend(chart));

        let close_shape = Shape::Lines(closes);
        let overlay_shapes: Vec<Shape> = overlays
            .iter()
            .filter(|points| !points.is_empty())
            .map(|points| Shape::Lines(points))
            .collect();

        let mut canvas = Chart::new(
            self.width.max(40),
            self.height.max(10),
            x_min as f32,
            x_max as f32,
        );
        let mut plot = canvas.lineplot(&close_shape);
        for shape in &overlay_shapes {
            plot = plot.lineplot(shape);
        }
        plot.display();
        println!();

        Ok(None)
    }
}

/// Close prices first, then one series per moving average.
fn line_series(chart: &CandlestickChart) -> Vec<Vec<(f32, f32)>> {
    let closes = chart
        .candles
        .iter()
        .map(|c| (c.x as f32, c.close as f32))
        .collect();

    std::iter::once(closes)
        .chain(chart.moving_averages.iter().map(|series| {
            chart
                .overlay_points(series)
                .into_iter()
                .map(|(x, y)| (x as f32, y as f32))
                .collect()
        }))
        .collect()
}

fn legend(chart: &CandlestickChart) -> String {
    let mut parts = vec!["close".to_string()];
    for series in &chart.moving_averages {
        match series.last() {
            Some(value) => parts.push(format!("{} {:.2}", series.label(), value)),
            None => parts.push(format!("{} n/a", series.label())),
        }
    }
    parts.join(" | ")
}

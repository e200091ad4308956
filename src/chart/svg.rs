use std::fs;
use std::path::PathBuf;
use tracing::debug;

use super::{CandlestickChart, ChartRenderer};
use crate::error::RenderError;

const MARGIN_LEFT: f64 = 72.0;
const MARGIN_RIGHT: f64 = 24.0;
const MARGIN_TOP: f64 = 56.0;
const MARGIN_BOTTOM: f64 = 44.0;
const PANEL_GAP: f64 = 12.0;
const PRICE_PANEL_SHARE: f64 = 0.72;
const PRICE_GRID_LINES: usize = 5;
const DATE_LABELS: usize = 6;

/// Writes the chart as a standalone SVG, or as an HTML page embedding it
/// when the path ends in `.html`/`.htm`.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    path: PathBuf,
}

impl SvgRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn wants_html(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
    }
}

impl ChartRenderer for SvgRenderer {
    fn name(&self) -> &'static str {
        if self.wants_html() { "html" } else { "svg" }
    }

    fn render(&self, chart: &CandlestickChart) -> Result<Option<PathBuf>, RenderError> {
        if chart.is_empty() {
            return Err(RenderError::EmptyChart);
        }

        let svg = to_svg(chart);
        let document = if self.wants_html() {
            to_html(chart, &svg)
        } else {
            svg
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, document.as_bytes())?;

        debug!(path = %self.path.display(), bytes = document.len(), "Chart written");
        Ok(Some(self.path.clone()))
    }
}

/// Maps chart coordinates onto one panel of the canvas.
struct Panel {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Panel {
    fn x(&self, x: f64) -> f64 {
        let span = (self.x_max - self.x_min).max(f64::EPSILON);
        self.left + (x - self.x_min) / span * (self.right - self.left)
    }

    fn y(&self, y: f64) -> f64 {
        let span = (self.y_max - self.y_min).max(f64::EPSILON);
        self.bottom - (y - self.y_min) / span * (self.bottom - self.top)
    }

    fn width(&self) -> f64 {
        self.right - self.left
    }
}

/// Render the chart as an SVG document.
pub fn to_svg(chart: &CandlestickChart) -> String {
    let palette = chart.style.palette();
    let width = f64::from(chart.width_px);
    let height = f64::from(chart.height_px);
    let (x_min, x_max) = chart.x_range();
    let (price_min, price_max) = chart.price_bounds();

    let plot_top = MARGIN_TOP;
    let plot_bottom = height - MARGIN_BOTTOM;
    let price_bottom = if chart.show_volume {
        plot_top + (plot_bottom - plot_top) * PRICE_PANEL_SHARE
    } else {
        plot_bottom
    };

    let price = Panel {
        left: MARGIN_LEFT,
        right: width - MARGIN_RIGHT,
        top: plot_top,
        bottom: price_bottom,
        x_min,
        x_max,
        y_min: price_min,
        y_max: price_max,
    };

    let slot_px = chart.slot_width() / (x_max - x_min).max(f64::EPSILON) * price.width();
    let body_width = (slot_px * 0.6).max(1.0);

    let mut out = String::with_capacity(256 + chart.len() * 160);
    out.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif" font-size="11">"#,
        w = chart.width_px,
        h = chart.height_px,
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<rect x="0" y="0" width="{}" height="{}" fill="{}"/>"#,
        chart.width_px, chart.height_px, palette.background
    ));
    out.push('\n');
    out.push_str(&format!(
        r#"<text class="title" x="{:.1}" y="{:.1}" text-anchor="middle" font-size="18" fill="{}">{}</text>"#,
        width / 2.0,
        MARGIN_TOP / 2.0 + 6.0,
        palette.text,
        escape(&chart.title)
    ));
    out.push('\n');

    // Price panel background and grid
    out.push_str(&format!(
        r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
        price.left,
        price.top,
        price.width(),
        price.bottom - price.top,
        palette.panel
    ));
    out.push('\n');
    for step in 0..=PRICE_GRID_LINES {
        let value = price_min + (price_max - price_min) * step as f64 / PRICE_GRID_LINES as f64;
        let y = price.y(value);
        out.push_str(&format!(
            r#"<line x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="{}" stroke-width="1"/>"#,
            price.left, price.right, palette.grid
        ));
        out.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="{}">{}</text>"#,
            price.left - 6.0,
            y + 4.0,
            palette.text,
            format_price(value)
        ));
        out.push('\n');
    }

    // Candles: wick first so the body sits on top
    for candle in &chart.candles {
        let up = candle.is_up();
        let cx = price.x(candle.x);
        let body_top = price.y(candle.open.max(candle.close));
        let body_bottom = price.y(candle.open.min(candle.close));
        let fill = if up { palette.up } else { palette.down };
        out.push_str(&format!(
            r#"<line class="wick" x1="{cx:.2}" y1="{:.2}" x2="{cx:.2}" y2="{:.2}" stroke="{}" stroke-width="1"/>"#,
            price.y(candle.high),
            price.y(candle.low),
            palette.wick_for(up)
        ));
        out.push_str(&format!(
            r#"<rect class="candle" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}" stroke="{}" stroke-width="0.8"/>"#,
            cx - body_width / 2.0,
            body_top,
            body_width,
            (body_bottom - body_top).max(1.0),
            fill,
            palette.wick_for(up)
        ));
        out.push('\n');
    }

    // Moving-average overlays and their legend
    for (idx, series) in chart.moving_averages.iter().enumerate() {
        let points = chart.overlay_points(series);
        let colour = palette.moving_average(idx);
        if !points.is_empty() {
            let coords: Vec<String> = points
                .iter()
                .map(|(x, y)| format!("{:.2},{:.2}", price.x(*x), price.y(*y)))
                .collect();
            out.push_str(&format!(
                r#"<polyline class="moving-average" data-window="{}" points="{}" fill="none" stroke="{}" stroke-width="1.5"/>"#,
                series.window,
                coords.join(" "),
                colour
            ));
            out.push('\n');
        }
        out.push_str(&format!(
            r#"<text class="legend" x="{:.1}" y="{:.1}" fill="{}">{}</text>"#,
            price.left + 8.0 + idx as f64 * 64.0,
            price.top + 14.0,
            colour,
            series.label()
        ));
        out.push('\n');
    }

    let mut axis_bottom = price.bottom;
    if chart.show_volume {
        let volume = Panel {
            top: price.bottom + PANEL_GAP,
            bottom: plot_bottom,
            y_min: 0.0,
            y_max: chart.max_volume().max(1) as f64,
            ..price
        };
        out.push_str(&format!(
            r#"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"/>"#,
            volume.left,
            volume.top,
            volume.width(),
            volume.bottom - volume.top,
            palette.panel
        ));
        out.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="{}">{}</text>"#,
            volume.left - 6.0,
            volume.top + 10.0,
            palette.text,
            format_volume(chart.max_volume())
        ));
        out.push('\n');
        for candle in &chart.candles {
            let top = volume.y(candle.volume as f64);
            let fill = if candle.is_up() { palette.volume_up } else { palette.volume_down };
            out.push_str(&format!(
                r#"<rect class="volume" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
                volume.x(candle.x) - body_width / 2.0,
                top,
                body_width,
                volume.bottom - top,
                fill
            ));
            out.push('\n');
        }
        axis_bottom = volume.bottom;
    }

    // Date labels under the lowest panel
    let label_format = if chart.interval.is_intraday() { "%m-%d %H:%M" } else { "%Y-%m-%d" };
    for idx in label_indices(chart.len(), DATE_LABELS) {
        let candle = &chart.candles[idx];
        out.push_str(&format!(
            r#"<text class="date" x="{:.1}" y="{:.1}" text-anchor="middle" fill="{}">{}</text>"#,
            price.x(candle.x),
            axis_bottom + 16.0,
            palette.text,
            candle.time.format(label_format)
        ));
        out.push('\n');
    }

    out.push_str("</svg>\n");
    out
}

fn to_html(chart: &CandlestickChart, svg: &str) -> String {
    let palette = chart.style.palette();
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body style=\"margin:0;background:{}\">\n{}</body>\n</html>\n",
        escape(&chart.title),
        palette.background,
        svg
    )
}

/// Up to `count` evenly spread indices into `len` items, always including the ends.
fn label_indices(len: usize, count: usize) -> Vec<usize> {
    if len == 0 || count == 0 {
        return Vec::new();
    }
    if len <= count {
        return (0..len).collect();
    }
    let mut indices: Vec<usize> = (0..count)
        .map(|i| i * (len - 1) / (count - 1).max(1))
        .collect();
    indices.dedup();
    indices
}

fn format_price(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

fn format_volume(value: u64) -> String {
    match value {
        v if v >= 1_000_000_000 => format!("{:.1}B", v as f64 / 1e9),
        v if v >= 1_000_000 => format!("{:.1}M", v as f64 / 1e6),
        v if v >= 1_000 => format!("{:.1}K", v as f64 / 1e3),
        v => v.to_string(),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::testkit::daily_history;
    use crate::config::ChartConfig;

    fn chart(rows: usize, config: &ChartConfig) -> CandlestickChart {
        CandlestickChart::build("CD Projekt S.A.", &daily_history("CDR.WA", rows), config).unwrap()
    }

    #[test]
    fn test_svg_has_one_body_and_volume_bar_per_row() {
        let svg = to_svg(&chart(40, &ChartConfig::default()));
        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches(r#"class="candle""#).count(), 40);
        assert_eq!(svg.matches(r#"class="wick""#).count(), 40);
        assert_eq!(svg.matches(r#"class="volume""#).count(), 40);
        assert!(svg.contains(r#"width="900" height="600""#));
        assert!(svg.contains("CD Projekt S.A."));
    }

    #[test]
    fn test_svg_draws_each_moving_average() {
        let svg = to_svg(&chart(40, &ChartConfig::default()));
        assert_eq!(svg.matches(r#"class="moving-average""#).count(), 2);
        assert!(svg.contains(r#"data-window="4""#));
        assert!(svg.contains(r#"data-window="30""#));
        assert!(svg.contains(">MA30<"));
    }

    #[test]
    fn test_short_history_keeps_legend_but_skips_empty_overlay() {
        let svg = to_svg(&chart(10, &ChartConfig::default()));
        assert_eq!(svg.matches(r#"class="moving-average""#).count(), 1);
        assert_eq!(svg.matches(r#"class="legend""#).count(), 2);
    }

    #[test]
    fn test_volume_panel_is_optional() {
        let config = ChartConfig {
            show_volume: false,
            ..ChartConfig::default()
        };
        let svg = to_svg(&chart(15, &config));
        assert_eq!(svg.matches(r#"class="volume""#).count(), 0);
    }

    #[test]
    fn test_title_is_escaped() {
        let mut chart = chart(5, &ChartConfig::default());
        chart.title = "AT&T <Common>".to_string();
        let svg = to_svg(&chart);
        assert!(svg.contains("AT&amp;T &lt;Common&gt;"));
        assert!(!svg.contains("AT&T"));
    }

    #[test]
    fn test_label_indices_include_both_ends() {
        assert_eq!(label_indices(3, 6), vec![0, 1, 2]);
        let picked = label_indices(61, 6);
        assert_eq!(picked.first(), Some(&0));
        assert_eq!(picked.last(), Some(&60));
        assert_eq!(picked.len(), 6);
        assert!(label_indices(0, 6).is_empty());
    }

    #[test]
    fn test_renderer_writes_svg_and_html() {
        let dir = tempfile::tempdir().unwrap();
        let chart = chart(12, &ChartConfig::default());

        let svg_path = dir.path().join("nested").join("chart.svg");
        let written = SvgRenderer::new(&svg_path).render(&chart).unwrap();
        assert_eq!(written.as_deref(), Some(svg_path.as_path()));
        assert!(fs::read_to_string(&svg_path).unwrap().starts_with("<svg"));

        let html_path = dir.path().join("chart.HTML");
        let renderer = SvgRenderer::new(&html_path);
        assert_eq!(renderer.name(), "html");
        renderer.render(&chart).unwrap();
        let html = fs::read_to_string(&html_path).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>CD Projekt S.A.</title>"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn test_volume_formatting() {
        assert_eq!(format_volume(950), "950");
        assert_eq!(format_volume(1_240_000), "1.2M");
        assert_eq!(format_volume(3_000_000_000), "3.0B");
    }
}

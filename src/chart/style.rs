use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named colour scheme for the rendered chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartStyle {
    #[default]
    Yahoo,
    Classic,
    Charles,
    Nightclouds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub panel: &'static str,
    pub grid: &'static str,
    pub text: &'static str,
    pub up: &'static str,
    pub down: &'static str,
    pub wick: Option<&'static str>,
    pub volume_up: &'static str,
    pub volume_down: &'static str,
    pub moving_averages: [&'static str; 7],
}

impl Palette {
    /// Colour for the `idx`-th overlay, cycling if there are more overlays than colours.
    pub fn moving_average(&self, idx: usize) -> &'static str {
        self.moving_averages[idx % self.moving_averages.len()]
    }

    pub fn wick_for(&self, up: bool) -> &'static str {
        self.wick.unwrap_or(if up { self.up } else { self.down })
    }
}

impl ChartStyle {
    pub const ALL: [ChartStyle; 4] = [
        ChartStyle::Yahoo,
        ChartStyle::Classic,
        ChartStyle::Charles,
        ChartStyle::Nightclouds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartStyle::Yahoo => "yahoo",
            ChartStyle::Classic => "classic",
            ChartStyle::Charles => "charles",
            ChartStyle::Nightclouds => "nightclouds",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            ChartStyle::Yahoo => Palette {
                background: "#ffffff",
                panel: "#ffffff",
                grid: "#e6e6e6",
                text: "#2b2b2b",
                up: "#00b060",
                down: "#fe3032",
                wick: None,
                volume_up: "#4dc790",
                volume_down: "#fd6b6c",
                moving_averages: [
                    "#2e6ad8", "#ff9b00", "#7e43c4", "#00a3a3", "#d6336c", "#6b8e23", "#8b5a2b",
                ],
            },
            ChartStyle::Classic => Palette {
                background: "#ffffff",
                panel: "#ffffff",
                grid: "#d0d0d0",
                text: "#000000",
                up: "#ffffff",
                down: "#000000",
                wick: Some("#000000"),
                volume_up: "#9a9a9a",
                volume_down: "#3c3c3c",
                moving_averages: [
                    "#0000ff", "#ff8c00", "#008000", "#ff0000", "#800080", "#a52a2a", "#808000",
                ],
            },
            ChartStyle::Charles => Palette {
                background: "#ffffff",
                panel: "#fbfbfb",
                grid: "#e0e0e0",
                text: "#333333",
                up: "#006340",
                down: "#a02128",
                wick: None,
                volume_up: "#007a00",
                volume_down: "#d50d18",
                moving_averages: [
                    "#1f77b4", "#ff7f0e", "#9467bd", "#17becf", "#e377c2", "#bcbd22", "#8c564b",
                ],
            },
            ChartStyle::Nightclouds => Palette {
                background: "#0a0a23",
                panel: "#0a0a23",
                grid: "#27274a",
                text: "#e0e0f0",
                up: "#ffffff",
                down: "#3e6ae1",
                wick: None,
                volume_up: "#b3b3cc",
                volume_down: "#3e6ae1",
                moving_averages: [
                    "#ffd166", "#ef476f", "#06d6a0", "#f78c6b", "#118ab2", "#c77dff", "#f5f5f5",
                ],
            },
        }
    }
}

impl fmt::Display for ChartStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ChartStyle::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = ChartStyle::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown style '{}', expected one of {}", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style_names() {
        assert_eq!("yahoo".parse::<ChartStyle>().unwrap(), ChartStyle::Yahoo);
        assert_eq!("Charles".parse::<ChartStyle>().unwrap(), ChartStyle::Charles);
        assert_eq!(ChartStyle::default(), ChartStyle::Yahoo);
        let err = "mike".parse::<ChartStyle>().unwrap_err();
        assert!(err.contains("nightclouds"));
    }

    #[test]
    fn test_moving_average_colours_cycle() {
        let palette = ChartStyle::Yahoo.palette();
        assert_eq!(palette.moving_average(0), palette.moving_average(7));
        assert_ne!(palette.moving_average(0), palette.moving_average(1));
    }

    #[test]
    fn test_classic_uses_single_wick_colour() {
        let palette = ChartStyle::Classic.palette();
        assert_eq!(palette.wick_for(true), palette.wick_for(false));
        let yahoo = ChartStyle::Yahoo.palette();
        assert_eq!(yahoo.wick_for(true), yahoo.up);
    }
}

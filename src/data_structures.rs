use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// --- Request Parameters ---

/// Lookback window accepted by the chart endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    #[default]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "2y")]
    TwoYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "max")]
    Max,
}

impl Period {
    pub const ALL: [Period; 11] = [
        Period::OneDay,
        Period::FiveDays,
        Period::OneMonth,
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::TwoYears,
        Period::FiveYears,
        Period::TenYears,
        Period::YearToDate,
        Period::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::FiveDays => "5d",
            Period::OneMonth => "1mo",
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::TwoYears => "2y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
            Period::YearToDate => "ytd",
            Period::Max => "max",
        }
    }
}

/// Sampling granularity accepted by the chart endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "2m")]
    TwoMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "60m")]
    SixtyMinutes,
    #[serde(rename = "90m")]
    NinetyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    #[default]
    OneDay,
    #[serde(rename = "5d")]
    FiveDays,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
    #[serde(rename = "3mo")]
    ThreeMonths,
}

impl Interval {
    pub const ALL: [Interval; 13] = [
        Interval::OneMinute,
        Interval::TwoMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::SixtyMinutes,
        Interval::NinetyMinutes,
        Interval::OneHour,
        Interval::OneDay,
        Interval::FiveDays,
        Interval::OneWeek,
        Interval::OneMonth,
        Interval::ThreeMonths,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::TwoMinutes => "2m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::SixtyMinutes => "60m",
            Interval::NinetyMinutes => "90m",
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::FiveDays => "5d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
            Interval::ThreeMonths => "3mo",
        }
    }

    /// Nominal bar length in seconds; months count as 30 days.
    pub fn approx_seconds(&self) -> i64 {
        const MINUTE: i64 = 60;
        const DAY: i64 = 24 * 60 * MINUTE;
        match self {
            Interval::OneMinute => MINUTE,
            Interval::TwoMinutes => 2 * MINUTE,
            Interval::FiveMinutes => 5 * MINUTE,
            Interval::FifteenMinutes => 15 * MINUTE,
            Interval::ThirtyMinutes => 30 * MINUTE,
            Interval::SixtyMinutes | Interval::OneHour => 60 * MINUTE,
            Interval::NinetyMinutes => 90 * MINUTE,
            Interval::OneDay => DAY,
            Interval::FiveDays => 5 * DAY,
            Interval::OneWeek => 7 * DAY,
            Interval::OneMonth => 30 * DAY,
            Interval::ThreeMonths => 90 * DAY,
        }
    }

    pub fn is_intraday(&self) -> bool {
        self.approx_seconds() < 24 * 60 * 60
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseParamError {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for ParseParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for ParseParamError {}

impl FromStr for Period {
    type Err = ParseParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Period::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseParamError {
                kind: "period",
                value: s.to_string(),
            })
    }
}

impl FromStr for Interval {
    type Err = ParseParamError;

    // Case matters: "1m" is a minute, "1mo" a month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Interval::ALL
            .into_iter()
            .find(|i| i.as_str() == wanted)
            .ok_or_else(|| ParseParamError {
                kind: "interval",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Provider Payloads ---

/// Instrument metadata. Fields the provider sends beyond the typed ones stay in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerInfo {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_timezone_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_market_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifty_two_week_low: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TickerInfo {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            ..Self::default()
        }
    }

    /// Long name, else short name, else the symbol.
    pub fn display_name(&self) -> &str {
        [self.long_name.as_deref(), self.short_name.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or(&self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub time: DateTime<Utc>,
    /// Calendar date at the exchange.
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Chronologically ordered bars for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    pub symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    /// Sorts by time and keeps the last bar for any repeated timestamp.
    pub fn new(symbol: &str, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by(|a, b| a.time.cmp(&b.time));

        let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match deduped.last_mut() {
                Some(last) if last.time == bar.time => *last = bar,
                _ => deduped.push(bar),
            }
        }

        Self {
            symbol: symbol.to_string(),
            bars: deduped,
        }
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Last `n` bars (fewer if the history is shorter).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(day: u32, close: f64) -> PriceBar {
        let time = Utc.with_ymd_and_hms(2024, 3, day, 8, 0, 0).unwrap();
        PriceBar {
            time,
            date: time.date_naive(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1_000 * day as u64,
        }
    }

    #[test]
    fn test_period_and_interval_round_trip_strings() {
        assert_eq!("3mo".parse::<Period>().unwrap(), Period::ThreeMonths);
        assert_eq!("YTD".parse::<Period>().unwrap(), Period::YearToDate);
        assert_eq!("1d".parse::<Interval>().unwrap(), Interval::OneDay);
        assert_eq!("1mo".parse::<Interval>().unwrap(), Interval::OneMonth);
        assert_eq!("1m".parse::<Interval>().unwrap(), Interval::OneMinute);
        assert!("3 months".parse::<Period>().is_err());
        assert!("1D".parse::<Interval>().is_err());
    }

    #[test]
    fn test_serde_uses_provider_spelling() {
        assert_eq!(serde_json::to_string(&Interval::OneWeek).unwrap(), "\"1wk\"");
        let period: Period = serde_json::from_str("\"6mo\"").unwrap();
        assert_eq!(period, Period::SixMonths);
    }

    #[test]
    fn test_defaults_match_chart_defaults() {
        assert_eq!(Period::default(), Period::ThreeMonths);
        assert_eq!(Interval::default(), Interval::OneDay);
    }

    #[test]
    fn test_intraday_detection() {
        assert!(Interval::FifteenMinutes.is_intraday());
        assert!(!Interval::OneDay.is_intraday());
    }

    #[test]
    fn test_display_name_falls_back() {
        let mut info = TickerInfo::new("CDR.WA");
        assert_eq!(info.display_name(), "CDR.WA");
        info.short_name = Some("CDPROJEKT".to_string());
        assert_eq!(info.display_name(), "CDPROJEKT");
        info.long_name = Some("CD Projekt S.A.".to_string());
        assert_eq!(info.display_name(), "CD Projekt S.A.");
    }

    #[test]
    fn test_history_sorts_and_collapses_duplicates() {
        let mut late_dup = bar(5, 42.0);
        late_dup.volume = 7;
        let history = PriceHistory::new("CDR.WA", vec![bar(5, 40.0), bar(4, 39.0), late_dup]);

        assert_eq!(history.len(), 2);
        assert_eq!(history.bars()[0].close, 39.0);
        assert_eq!(history.bars()[1].close, 42.0);
        assert_eq!(history.bars()[1].volume, 7);
    }

    #[test]
    fn test_tail_and_closes() {
        let history = PriceHistory::new("X", (1..=12).map(|d| bar(d, 10.0 + d as f64)).collect());
        assert_eq!(history.tail(10).len(), 10);
        assert_eq!(history.tail(10)[0].close, 13.0);
        assert_eq!(history.tail(50).len(), 12);
        assert_eq!(history.closes().last(), Some(&22.0));
        assert_eq!(history.tail(0).len(), 0);
    }
}

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::data_structures::{Interval, Period, PriceBar, PriceHistory, TickerInfo};
use crate::error::ProviderError;
use crate::provider::MarketDataProvider;

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

const RATE_WINDOW: Duration = Duration::from_secs(60);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

// --- Chart endpoint payload ---

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Value,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Client for the public Yahoo Finance chart endpoint.
pub struct YahooClient {
    client: Client,
    base_url: String,
    rate_limit_per_minute: u32,
    max_retries: u32,
    backoff_base: Duration,
    request_timestamps: Vec<Instant>,
    random_agent: bool,
}

impl YahooClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout()).gzip(true).build()?;

        Ok(YahooClient {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limit_per_minute: config.rate_limit_per_minute.max(1),
            max_retries: config.max_retries,
            backoff_base: config.backoff_base(),
            request_timestamps: Vec::new(),
            random_agent: config.random_agent,
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    fn user_agent(&self) -> &'static str {
        if self.random_agent {
            USER_AGENTS[rand::rng().random_range(0..USER_AGENTS.len())]
        } else {
            USER_AGENTS[0]
        }
    }

    async fn enforce_rate_limit(&mut self) {
        let now = Instant::now();
        self.request_timestamps
            .retain(|&stamp| now.duration_since(stamp) < RATE_WINDOW);

        if self.request_timestamps.len() >= self.rate_limit_per_minute as usize {
            if let Some(&oldest) = self.request_timestamps.first() {
                let wait = RATE_WINDOW.saturating_sub(now.duration_since(oldest));
                if !wait.is_zero() {
                    debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    sleep(wait + Duration::from_millis(100)).await;
                }
            }
        }

        self.request_timestamps.push(Instant::now());
    }

    /// GET the chart payload, retrying 429/5xx/transport failures with jittered backoff.
    async fn fetch_chart(
        &mut self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<String, ProviderError> {
        let url = self.chart_url(symbol);
        let mut last_error = ProviderError::InvalidResponse("no request attempted".to_string());

        for attempt in 0..=self.max_retries {
            self.enforce_rate_limit().await;

            if attempt > 0 {
                let delay = backoff_delay(attempt, rand::random::<f64>(), self.backoff_base);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying chart request");
                sleep(delay).await;
            }

            let response = self
                .client
                .get(&url)
                .query(&[
                    ("range", range),
                    ("interval", interval),
                    ("includePrePost", "false"),
                    ("events", "div,splits"),
                ])
                .header("Accept", "application/json, text/plain, */*")
                .header("Accept-Language", "en-US,en;q=0.9")
                .header("User-Agent", self.user_agent())
                .send()
                .await;

            let resp = match response {
                Ok(resp) => resp,
                Err(err) => {
                    warn!(symbol, attempt, error = %err, "Chart request failed");
                    last_error = ProviderError::Http(err);
                    continue;
                }
            };

            let status = resp.status();
            if status.is_success() {
                return Ok(resp.text().await?);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!(symbol, attempt, "Provider rate limited the request");
                last_error = ProviderError::RateLimit;
                continue;
            }
            if status.is_server_error() {
                warn!(symbol, attempt, status = status.as_u16(), "Provider server error");
                last_error = ProviderError::InvalidResponse(format!("server returned {}", status));
                continue;
            }

            // Other client errors are final; the body usually carries chart.error.
            let body = match resp.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!(symbol, status = status.as_u16(), error = %err, "Could not read error body");
                    String::new()
                }
            };
            return Err(error_from_body(symbol, status, &body));
        }

        Err(last_error)
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn ticker_info(&mut self, symbol: &str) -> Result<TickerInfo, ProviderError> {
        let body = self
            .fetch_chart(symbol, Period::FiveDays.as_str(), Interval::OneDay.as_str())
            .await?;
        let (info, _) = parse_chart(symbol, &body)?;
        Ok(info)
    }

    async fn history(
        &mut self,
        symbol: &str,
        period: Period,
        interval: Interval,
    ) -> Result<PriceHistory, ProviderError> {
        let body = self
            .fetch_chart(symbol, period.as_str(), interval.as_str())
            .await?;
        let (_, history) = parse_chart(symbol, &body)?;
        debug!(symbol, rows = history.len(), %period, %interval, "Parsed chart history");
        Ok(history)
    }
}

/// Delay before retry `attempt`: `base` doubled per earlier retry, plus
/// `jitter` (0..=1) times `base`, capped.
pub(crate) fn backoff_delay(attempt: u32, jitter: f64, base: Duration) -> Duration {
    let exponential = base.saturating_mul(1 << attempt.saturating_sub(1).min(16));
    exponential
        .saturating_add(base.mul_f64(jitter.clamp(0.0, 1.0)))
        .min(MAX_BACKOFF)
}

fn error_from_body(symbol: &str, status: StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<ChartEnvelope>(body) {
        Ok(ChartEnvelope {
            chart: ChartBody {
                error: Some(error), ..
            },
        }) => api_error(symbol, error),
        _ if status == StatusCode::NOT_FOUND => ProviderError::NoData {
            symbol: symbol.to_string(),
        },
        _ => ProviderError::InvalidResponse(format!("provider returned {}", status)),
    }
}

fn api_error(symbol: &str, error: ChartError) -> ProviderError {
    if error.code.eq_ignore_ascii_case("Not Found") {
        ProviderError::NoData {
            symbol: symbol.to_string(),
        }
    } else {
        ProviderError::Api {
            code: error.code,
            description: error.description,
        }
    }
}

/// Decode one chart payload into metadata and history.
///
/// Rows missing any of open/high/low/close are dropped and a missing volume
/// counts as zero. Dates are taken in the exchange's own time zone.
pub fn parse_chart(symbol: &str, body: &str) -> Result<(TickerInfo, PriceHistory), ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;
    if let Some(error) = envelope.chart.error {
        return Err(api_error(symbol, error));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| ProviderError::NoData {
            symbol: symbol.to_string(),
        })?;

    let mut info: TickerInfo = serde_json::from_value(result.meta)?;
    if info.symbol.trim().is_empty() {
        info.symbol = symbol.to_string();
    }

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let to_date = exchange_dates(&info);

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (idx, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&quote.open, idx),
            value_at(&quote.high, idx),
            value_at(&quote.low, idx),
            value_at(&quote.close, idx),
        ) else {
            continue;
        };

        let time = DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
            ProviderError::InvalidResponse(format!("timestamp {} out of range at index {}", ts, idx))
        })?;

        bars.push(PriceBar {
            time,
            date: to_date(time),
            open,
            high,
            low,
            close,
            volume: value_at(&quote.volume, idx).map_or(0, |v| v.max(0.0).round() as u64),
        });
    }

    let history = PriceHistory::new(&info.symbol, bars);
    Ok((info, history))
}

fn value_at(values: &[Option<f64>], idx: usize) -> Option<f64> {
    values.get(idx).copied().flatten()
}

/// Date converter for the instrument's exchange, falling back to its UTC
/// offset and then to UTC.
fn exchange_dates(info: &TickerInfo) -> Box<dyn Fn(DateTime<Utc>) -> NaiveDate> {
    if let Some(tz) = info
        .exchange_timezone_name
        .as_deref()
        .and_then(|name| name.parse::<Tz>().ok())
    {
        return Box::new(move |time| time.with_timezone(&tz).date_naive());
    }

    let offset = info
        .extra
        .get("gmtoffset")
        .and_then(Value::as_i64)
        .and_then(|secs| i32::try_from(secs).ok())
        .and_then(FixedOffset::east_opt);
    match offset {
        Some(offset) => Box::new(move |time| time.with_timezone(&offset).date_naive()),
        None => Box::new(|time| time.date_naive()),
    }
}


#[cfg(test)]
mod tests {
    use super::testkit::{http_response, spawn_silent, spawn_stub};
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::sync::atomic::Ordering;

    const CDR_FIXTURE: &str = r#"{
      "chart": {
        "result": [{
          "meta": {
            "currency": "PLN",
            "symbol": "CDR.WA",
            "exchangeName": "WSE",
            "fullExchangeName": "Warsaw",
            "instrumentType": "EQUITY",
            "exchangeTimezoneName": "Europe/Warsaw",
            "gmtoffset": 7200,
            "regularMarketPrice": 131.9,
            "fiftyTwoWeekHigh": 140.2,
            "fiftyTwoWeekLow": 88.1,
            "longName": "CD Projekt S.A.",
            "shortName": "CDPROJEKT"
          },
          "timestamp": [1717394400, 1717480800, 1717567200, 1717567200, 1717567200, 1717311600],
          "indicators": {
            "quote": [{
              "open":   [120.0, 121.5, null, 123.0, 124.0, 119.0],
              "high":   [122.0, 123.0, 124.0, 125.0, 126.5, 120.5],
              "low":    [119.5, 120.0, 121.0, 122.0, 123.5, 118.0],
              "close":  [121.0, 122.5, 123.5, 124.5, 126.0, 119.5],
              "volume": [1500, null, 1700, 1800, 1900, 1200]
            }]
          }
        }],
        "error": null
      }
    }"#;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            ..ProviderConfig::default()
        }
    }

    fn stub_config(base_url: &str, max_retries: u32) -> ProviderConfig {
        ProviderConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            max_retries,
            backoff_base_ms: 5,
            random_agent: false,
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_parse_chart_metadata() {
        let (info, _) = parse_chart("CDR.WA", CDR_FIXTURE).unwrap();
        assert_eq!(info.symbol, "CDR.WA");
        assert_eq!(info.display_name(), "CD Projekt S.A.");
        assert_eq!(info.currency.as_deref(), Some("PLN"));
        assert_eq!(info.regular_market_price, Some(131.9));
        assert_eq!(info.extra["fullExchangeName"], "Warsaw");
    }

    #[test]
    fn test_parse_chart_cleans_rows() {
        let (_, history) = parse_chart("CDR.WA", CDR_FIXTURE).unwrap();

        // Null-open row dropped, repeated timestamp keeps the last row, late row sorted first.
        assert_eq!(history.len(), 4);
        let closes = history.closes();
        assert_eq!(closes, vec![119.5, 121.0, 122.5, 126.0]);
        assert_eq!(history.bars()[2].volume, 0);
        assert!(history.bars().windows(2).all(|w| w[0].time < w[1].time));
    }

    #[test]
    fn test_parse_chart_uses_exchange_dates() {
        let (_, history) = parse_chart("CDR.WA", CDR_FIXTURE).unwrap();
        // 1717311600 is 2024-06-02 07:00 UTC, 09:00 in Warsaw.
        let first = &history.bars()[0];
        assert_eq!(first.time.hour(), 7);
        assert_eq!((first.date.month(), first.date.day()), (6, 2));

        // 22:00 UTC on 2024-06-02 is already 2024-06-03 in Warsaw.
        let late = r#"{"chart":{"result":[{"meta":{"symbol":"X","exchangeTimezoneName":"Europe/Warsaw"},
            "timestamp":[1717365600],
            "indicators":{"quote":[{"open":[1.0],"high":[1.0],"low":[1.0],"close":[1.0],"volume":[1]}]}}],"error":null}}"#;
        let (_, history) = parse_chart("X", late).unwrap();
        assert_eq!(history.bars()[0].date, NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
    }

    #[test]
    fn test_parse_chart_errors() {
        let not_found = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            parse_chart("NOPE", not_found),
            Err(ProviderError::NoData { .. })
        ));

        let bad_range = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input - interval=1m is not supported for range=max"}}}"#;
        match parse_chart("AAPL", bad_range) {
            Err(ProviderError::Api { code, description }) => {
                assert_eq!(code, "Bad Request");
                assert!(description.contains("interval=1m"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            parse_chart("AAPL", "<html>"),
            Err(ProviderError::Serialization(_))
        ));
    }

    #[test]
    fn test_parse_chart_without_rows_is_empty_history() {
        let empty = r#"{"chart":{"result":[{"meta":{"symbol":"CDR.WA"},"indicators":{"quote":[{}]}}],"error":null}}"#;
        let (info, history) = parse_chart("CDR.WA", empty).unwrap();
        assert_eq!(info.symbol, "CDR.WA");
        assert!(history.is_empty());
    }

    #[test]
    fn test_error_from_body_status_fallbacks() {
        assert!(matches!(
            error_from_body("X", StatusCode::NOT_FOUND, ""),
            ProviderError::NoData { .. }
        ));
        assert!(matches!(
            error_from_body("X", StatusCode::FORBIDDEN, "denied"),
            ProviderError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let second = Duration::from_secs(1);
        assert_eq!(backoff_delay(1, 0.0, second), Duration::from_secs(1));
        assert_eq!(backoff_delay(3, 0.5, second), Duration::from_millis(4_500));
        assert_eq!(backoff_delay(20, 1.0, second), MAX_BACKOFF);
        assert_eq!(backoff_delay(2, 0.0, Duration::from_millis(10)), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_yahoo_client_creation() {
        let client = YahooClient::new(&test_config()).unwrap();
        assert_eq!(client.chart_url("CDR.WA"), "http://127.0.0.1:9/v8/finance/chart/CDR.WA");
        assert_eq!(client.name(), "yahoo");
    }

    #[tokio::test]
    async fn test_rate_limit_records_requests() {
        let mut client = YahooClient::new(&test_config()).unwrap();
        client.enforce_rate_limit().await;
        client.enforce_rate_limit().await;
        assert_eq!(client.request_timestamps.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_chart_retries_rate_limit_and_server_errors() {
        let (base_url, hits) = spawn_stub(vec![
            http_response("429 Too Many Requests", ""),
            http_response("503 Service Unavailable", ""),
            http_response("200 OK", CDR_FIXTURE),
        ])
        .await;
        let mut client = YahooClient::new(&stub_config(&base_url, 3)).unwrap();

        let history = client
            .history("CDR.WA", Period::ThreeMonths, Interval::OneDay)
            .await
            .unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_chart_gives_up_after_max_retries() {
        let (base_url, hits) = spawn_stub(vec![http_response("503 Service Unavailable", "")]).await;
        let mut client = YahooClient::new(&stub_config(&base_url, 2)).unwrap();

        match client.ticker_info("CDR.WA").await {
            Err(ProviderError::InvalidResponse(message)) => assert!(message.contains("503")),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fetch_chart_surfaces_last_error() {
        let (base_url, hits) = spawn_stub(vec![
            http_response("502 Bad Gateway", ""),
            http_response("429 Too Many Requests", ""),
        ])
        .await;
        let mut client = YahooClient::new(&stub_config(&base_url, 1)).unwrap();

        let err = client.ticker_info("CDR.WA").await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimit));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_chart_client_errors_are_final() {
        let not_found = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let (base_url, hits) = spawn_stub(vec![http_response("404 Not Found", not_found)]).await;
        let mut client = YahooClient::new(&stub_config(&base_url, 3)).unwrap();
        let err = client.ticker_info("NOPE").await.unwrap_err();
        assert!(matches!(err, ProviderError::NoData { ref symbol } if symbol == "NOPE"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let bad_range = r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid input - interval=1m is not supported for range=max"}}}"#;
        let (base_url, hits) = spawn_stub(vec![http_response("400 Bad Request", bad_range)]).await;
        let mut client = YahooClient::new(&stub_config(&base_url, 3)).unwrap();
        match client.history("AAPL", Period::Max, Interval::OneMinute).await {
            Err(ProviderError::Api { code, .. }) => assert_eq!(code, "Bad Request"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_chart_retries_hung_requests() {
        let (base_url, hits) = spawn_silent().await;
        let config = ProviderConfig {
            timeout_secs: 1,
            ..stub_config(&base_url, 1)
        };
        let mut client = YahooClient::new(&config).unwrap();

        let err = client.ticker_info("CDR.WA").await.unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}

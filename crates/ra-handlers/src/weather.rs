//! `weather` action handler (spec §4.8).

use chrono::{DateTime, Utc};
use ra_core::payload::WebActionPayload;
use ra_error::RezError;
use ra_http::RequestConfig;
use serde::Deserialize;

use crate::{ActionHandler, HandlerContext};

/// Default number of forecast days summarized when `payload.arguments`
/// omits `days` (spec §4.8: "first `2·days` periods, default `days=2`").
const DEFAULT_DAYS: u32 = 2;

/// Hostname the HTTP allowlist must carry for the weather handler to ever
/// succeed (spec §4.2: "seeded with at least `api.weather.gov`").
pub const WEATHER_API_HOST: &str = "api.weather.gov";

#[derive(Debug, Deserialize)]
struct ForecastDocument {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Deserialize)]
struct ForecastPeriod {
    name: String,
    temperature: i64,
    #[serde(rename = "temperatureUnit")]
    temperature_unit: String,
    #[serde(default, rename = "temperatureTrend")]
    temperature_trend: Option<String>,
    #[serde(rename = "windSpeed")]
    wind_speed: String,
    #[serde(rename = "windDirection")]
    wind_direction: String,
    #[serde(rename = "detailedForecast")]
    detailed_forecast: String,
    #[serde(rename = "startTime")]
    #[allow(dead_code)]
    start_time: DateTime<Utc>,
}

/// Fetches and summarizes a National Weather Service-shaped forecast
/// document (spec §4.8). The request is unauthenticated; `payload.url`
/// must already have been produced from a trusted source (the MCP tool
/// descriptor or a scheduler-originated directive) — the handler performs
/// no further trust decision on it beyond the allowlist the HTTP client
/// enforces.
pub struct WeatherHandler;

#[async_trait::async_trait]
impl ActionHandler for WeatherHandler {
    async fn execute(&self, ctx: &HandlerContext, payload: &WebActionPayload) -> Result<Vec<String>, RezError> {
        if payload.url.is_empty() {
            return Err(RezError::validation("weather action requires payload.url"));
        }
        validate_forecast_url(&payload.url)?;

        let days = payload
            .argument("days")
            .and_then(serde_json::Value::as_u64)
            .map(|d| d as u32)
            .unwrap_or(DEFAULT_DAYS);

        let mut req = RequestConfig::get(&payload.url);
        req.timeout = Some(ctx.deadline.remaining());
        let resp = ctx.http.execute(req).await?;
        let doc: ForecastDocument = resp.json()?;

        Ok(vec![format_forecast(doc, days)])
    }
}

/// Validates that `url` has the shape `https://<host>/gridpoints/<office>/<x>,<y>/forecast`
/// (spec §9 open question 1: the tool-level contract accepts a caller-supplied
/// forecast URL, so the handler pins its shape tightly rather than trusting the
/// MCP host). The allowlist check in `ra-http` still runs independently; this
/// is a belt-and-suspenders validation error, not a replacement for it.
fn validate_forecast_url(raw: &str) -> Result<(), RezError> {
    let url = url::Url::parse(raw).map_err(|e| RezError::validation(format!("malformed forecast url: {e}")))?;
    if url.scheme() != "https" {
        return Err(RezError::validation("forecast url must use https"));
    }
    let segments: Vec<&str> = url.path_segments().map(Iterator::collect).unwrap_or_default();
    let [gridpoints, office, coords, forecast] = segments.as_slice() else {
        return Err(RezError::validation(
            "forecast url must match https://<host>/gridpoints/<office>/<x>,<y>/forecast",
        ));
    };
    if *gridpoints != "gridpoints" || *forecast != "forecast" {
        return Err(RezError::validation(
            "forecast url must match https://<host>/gridpoints/<office>/<x>,<y>/forecast",
        ));
    }
    if office.is_empty() || !office.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RezError::validation("forecast url office segment must be alphanumeric"));
    }
    let Some((x, y)) = coords.split_once(',') else {
        return Err(RezError::validation("forecast url grid coordinates must be '<x>,<y>'"));
    };
    if x.is_empty() || y.is_empty() || !x.chars().all(|c| c.is_ascii_digit()) || !y.chars().all(|c| c.is_ascii_digit()) {
        return Err(RezError::validation("forecast url grid coordinates must be numeric"));
    }
    Ok(())
}

fn format_forecast(doc: ForecastDocument, days: u32) -> String {
    let take = (2 * days).max(1) as usize;
    let mut summary = String::new();
    for period in doc.properties.periods.into_iter().take(take) {
        if !summary.is_empty() {
            summary.push('\n');
        }
        let trend = period.temperature_trend.as_deref().unwrap_or("steady");
        summary.push_str(&format!(
            "- {}: {}°{} ({trend}), wind {} {}\n  {}",
            period.name, period.temperature, period.temperature_unit, period.wind_speed, period.wind_direction,
            period.detailed_forecast,
        ));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use ra_cancel::{CancellationToken, Deadline};
    use ra_catalog::Catalog;
    use ra_http::{Allowlist, HttpClient};
    use ra_oauth::OAuthClient;
    use ra_secrets::SecretsCache;
    use std::sync::Arc;
    use std::time::Duration;

    struct NoSecrets;

    #[async_trait::async_trait]
    impl ra_secrets::SecretStore for NoSecrets {
        async fn fetch(&self, _name: &str) -> Result<serde_json::Value, RezError> {
            Err(RezError::internal("no secrets in this test"))
        }
    }

    fn context() -> HandlerContext {
        let http = Arc::new(HttpClient::new(Allowlist::new(), ra_retry::RetryPolicy::default()).unwrap());
        let secrets = Arc::new(SecretsCache::new(Arc::new(NoSecrets)));
        HandlerContext {
            oauth: Arc::new(OAuthClient::new(http.clone(), secrets)),
            http,
            catalog: Arc::new(Catalog::default()),
            deadline: Deadline::from_now(Duration::from_secs(30)),
            cancel: CancellationToken::new(),
        }
    }

    fn sample_doc(periods: usize) -> ForecastDocument {
        serde_json::from_value(serde_json::json!({
            "properties": {
                "periods": (0..periods).map(|i| serde_json::json!({
                    "name": format!("Period {i}"),
                    "temperature": 60 + i as i64,
                    "temperatureUnit": "F",
                    "temperatureTrend": null,
                    "windSpeed": "5 mph",
                    "windDirection": "NW",
                    "detailedForecast": "Sunny.",
                    "startTime": "2026-07-28T08:00:00Z",
                })).collect::<Vec<_>>()
            }
        }))
        .unwrap()
    }

    // -- 1. default days=2 summarizes the first 4 periods ---------------------
    #[test]
    fn default_window_takes_four_periods() {
        let summary = format_forecast(sample_doc(8), DEFAULT_DAYS);
        assert_eq!(summary.matches("- Period").count(), 4);
    }

    // -- 2. a custom days value changes the window -----------------------------
    #[test]
    fn custom_days_changes_window() {
        let summary = format_forecast(sample_doc(8), 1);
        assert_eq!(summary.matches("- Period").count(), 2);
    }

    // -- 3. fewer periods than the window are all included ---------------------
    #[test]
    fn short_forecast_includes_all_available_periods() {
        let summary = format_forecast(sample_doc(1), DEFAULT_DAYS);
        assert_eq!(summary.matches("- Period").count(), 1);
    }

    // -- 4. empty url is a permanent validation error, no network involved -----
    #[tokio::test]
    async fn empty_url_is_validation_error() {
        let ctx = context();
        let payload = WebActionPayload::builder("weather").build();
        let err = WeatherHandler.execute(&ctx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }

    // -- 5. well-shaped forecast urls pass the shape check ----------------------
    #[test]
    fn accepts_wellformed_forecast_url() {
        assert!(validate_forecast_url("https://api.weather.gov/gridpoints/TOP/31,80/forecast").is_ok());
    }

    // -- 6. a caller-supplied SSRF-style url is rejected before any network call -
    #[test]
    fn rejects_url_not_matching_forecast_shape() {
        assert!(validate_forecast_url("https://169.254.169.254/latest/meta-data/").is_err());
        assert!(validate_forecast_url("https://api.weather.gov/gridpoints/TOP/31,80/somethingelse").is_err());
        assert!(validate_forecast_url("https://api.weather.gov/gridpoints/TOP/forecast").is_err());
        assert!(validate_forecast_url("not a url").is_err());
    }

    // -- 7. handler rejects a malformed forecast url before touching the network -
    #[tokio::test]
    async fn execute_rejects_malformed_forecast_url() {
        let ctx = context();
        let payload = WebActionPayload::builder("weather")
            .url("https://evil.example/not-a-forecast")
            .build();
        let err = WeatherHandler.execute(&ctx, &payload).await.unwrap_err();
        assert_eq!(err.kind(), ra_error::ErrorKind::Validation);
    }
}

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::AppState;

const DEFAULT_LOCATION: &str = "Accra";

#[derive(Debug, Default, Deserialize)]
pub struct WeatherQuery {
    pub location: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub temperature: i64,
    pub humidity: i64,
    pub description: String,
    pub wind_speed: i64,
    pub rainfall: i64,
}

impl WeatherReport {
    /// Served whenever the upstream provider fails, instead of an error.
    pub fn fallback() -> Self {
        WeatherReport {
            temperature: 28,
            humidity: 72,
            description: "sunny".to_string(),
            wind_speed: 15,
            rainfall: 0,
        }
    }
}

#[derive(Debug, Error)]
enum UpstreamError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(u16),
}

#[derive(Debug, Deserialize)]
struct UpstreamWeather {
    main: UpstreamMain,
    #[serde(default)]
    weather: Vec<UpstreamCondition>,
    wind: UpstreamWind,
    #[serde(default)]
    rain: Option<UpstreamRain>,
}

#[derive(Debug, Deserialize)]
struct UpstreamMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct UpstreamCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct UpstreamRain {
    #[serde(rename = "1h", default)]
    one_hour: Option<f64>,
}

fn to_report(upstream: UpstreamWeather) -> WeatherReport {
    WeatherReport {
        temperature: upstream.main.temp.round() as i64,
        humidity: upstream.main.humidity.round() as i64,
        description: upstream
            .weather
            .first()
            .map(|c| c.description.clone())
            .unwrap_or_default(),
        // Upstream reports m/s; the widget wants km/h.
        wind_speed: (upstream.wind.speed * 3.6).round() as i64,
        rainfall: upstream
            .rain
            .and_then(|r| r.one_hour)
            .map(|mm| mm.round() as i64)
            .unwrap_or(0),
    }
}

async fn fetch_weather(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    location: &str,
) -> Result<WeatherReport, UpstreamError> {
    let response = client
        .get(format!("{}/data/2.5/weather", base_url))
        .query(&[
            ("q", format!("{},GH", location)),
            ("appid", api_key.to_string()),
            ("units", "metric".to_string()),
        ])
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(UpstreamError::Status(response.status().as_u16()));
    }
    let payload: UpstreamWeather = response.json().await?;
    Ok(to_report(payload))
}

pub async fn weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Json<WeatherReport> {
    let location = query
        .location
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
    match fetch_weather(
        &state.http,
        &state.config.weather_base_url,
        &state.config.weather_api_key,
        &location,
    )
    .await
    {
        Ok(report) => Json(report),
        Err(err) => {
            log::warn!("weather upstream failed for {}: {}", location, err);
            Json(WeatherReport::fallback())
        }
    }
}

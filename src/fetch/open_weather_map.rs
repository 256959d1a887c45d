/*
Current conditions from the OpenWeatherMap "current weather" endpoint:
https://openweathermap.org/current

Failed requests still come back as JSON with a `cod` field, which is a number
on success and frequently a string ("404") otherwise.
*/

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use derive_more::Display;
use futures::future::join_all;
use log::{debug, info};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Normality, Observation, SeasonalBaseline, Season, Units};

const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ApiError {
    #[display(fmt = "OpenWeatherMap rejected the API key")]
    InvalidApiKey,
    #[display(fmt = "OpenWeatherMap returned {}: {}", code, message)]
    Unavailable { code: u16, message: String },
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub city: String,
    pub temperature: f64, // in `units`
    pub units: Units,
    pub observed_at: DateTime<Utc>,
    pub utc_offset_seconds: i32,
}

impl CurrentWeather {
    pub fn celsius(&self) -> f64 {
        self.units.to_celsius(self.temperature)
    }

    pub fn local_time(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds)?;
        Some(self.observed_at.with_timezone(&offset))
    }

    /// Season at the city's own calendar date. Falls back to UTC if the
    /// reported offset is out of range.
    pub fn local_season(&self) -> Season {
        match self.local_time() {
            Some(t) => Season::of(&t),
            None => Season::of(&self.observed_at),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    cod: Value,
    message: Option<Value>,
    name: Option<String>,
    main: Option<RawMain>,
    dt: Option<i64>,
    timezone: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawMain {
    temp: f64,
}

fn status_code(cod: &Value) -> Option<u16> {
    match cod {
        Value::Number(n) => n.as_u64().and_then(|c| u16::try_from(c).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Parses a response body. `city` is used when the response doesn't name one.
pub fn parse_response(body: &str, city: &str, units: Units) -> Result<CurrentWeather> {
    let resp: RawResponse =
        serde_json::from_str(body).context("OpenWeatherMap response was not valid JSON")?;

    let code = status_code(&resp.cod)
        .ok_or(anyhow!("OpenWeatherMap response had an unreadable cod: {}", resp.cod))?;

    match code {
        200 => {}
        401 => return Err(ApiError::InvalidApiKey.into()),
        _ => {
            let message = match resp.message {
                Some(Value::String(s)) => s,
                Some(v) => v.to_string(),
                None => String::new(),
            };
            return Err(ApiError::Unavailable { code, message }.into());
        }
    }

    let main = resp
        .main
        .ok_or(anyhow!("main did not exist in OpenWeatherMap response."))?;
    let dt = resp
        .dt
        .ok_or(anyhow!("dt did not exist in OpenWeatherMap response."))?;
    let observed_at = DateTime::<Utc>::from_timestamp(dt, 0)
        .ok_or(anyhow!("Observation time {dt} is out of range"))?;

    Ok(CurrentWeather {
        city: resp.name.unwrap_or_else(|| city.to_string()),
        temperature: main.temp,
        units,
        observed_at,
        utc_offset_seconds: resp.timezone.unwrap_or(0),
    })
}

fn request_url(api_key: &str, city: &str, units: Units) -> Result<Url> {
    let units = units.to_string();
    let url = Url::parse_with_params(
        CURRENT_WEATHER_URL,
        &[("q", city), ("appid", api_key), ("units", units.as_str())],
    )?;
    Ok(url)
}

async fn fetch_with(client: &Client, api_key: &str, city: &str, units: Units) -> Result<CurrentWeather> {
    let url = request_url(api_key, city, units)?;

    let resp = client.get(url).send().await?;
    let status = resp.status();
    let text = resp.text().await?;

    debug!("OpenWeatherMap answered {status} for {city}");

    let weather = parse_response(&text, city, units)?;
    info!("{city}: {:.1} {} at {}", weather.temperature, units, weather.observed_at);

    Ok(weather)
}

/// Fetches the current reading for one city. No retries.
pub async fn current_weather(api_key: &str, city: &str, units: Units) -> Result<CurrentWeather> {
    fetch_with(&Client::new(), api_key, city, units).await
}

/// Fetches several cities concurrently; results come back in input order.
pub async fn current_weather_many(
    api_key: &str,
    cities: &[&str],
    units: Units,
) -> Vec<(String, Result<CurrentWeather>)> {
    let client = Client::new();

    let results = join_all(cities.iter().map(|city| fetch_with(&client, api_key, city, units))).await;

    cities.iter().map(|c| c.to_string()).zip(results).collect()
}

/// A live reading weighed against the city's seasonal history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub weather: CurrentWeather,
    pub season: Season,
    pub baseline: Option<SeasonalBaseline>,
    pub normality: Normality,
}

impl Assessment {
    /// `city` is the name used in `history`, which may differ from the name
    /// the API reports.
    pub fn new(weather: CurrentWeather, city: &str, history: &[Observation]) -> Assessment {
        let season = weather.local_season();
        let baseline = SeasonalBaseline::compute(history, city, season);
        let normality = match &baseline {
            Some(b) => b.classify(weather.celsius()),
            None => Normality::Indeterminate,
        };

        Assessment {
            weather,
            season,
            baseline,
            normality,
        }
    }
}

pub async fn assess_current(
    api_key: &str,
    city: &str,
    history: &[Observation],
    units: Units,
) -> Result<Assessment> {
    let weather = current_weather(api_key, city, units).await?;
    Ok(Assessment::new(weather, city, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::*;
    use chrono::TimeZone;

    const MOSCOW_OK: &str = r#"{
        "coord": {"lon": 37.6156, "lat": 55.7522},
        "weather": [{"id": 600, "main": "Snow", "description": "light snow", "icon": "13n"}],
        "base": "stations",
        "main": {"temp": -10.0, "feels_like": -15.2, "pressure": 1021, "humidity": 86},
        "dt": 1704067200,
        "timezone": 10800,
        "id": 524901,
        "name": "Moscow",
        "cod": 200
    }"#;

    #[test]
    fn parses_success() {
        let w = parse_response(MOSCOW_OK, "moscow", Units::Metric).unwrap();
        assert_eq!(w.city, "Moscow");
        assert_eq!(w.temperature, -10.0);
        assert_eq!(w.celsius(), -10.0);
        assert_eq!(w.observed_at, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(w.utc_offset_seconds, 10800);
        assert_eq!(w.local_season(), Season::Winter);
    }

    #[test]
    fn bad_key() {
        let body = r#"{"cod": 401, "message": "Invalid API key. Please see https://openweathermap.org/faq#error401 for more info."}"#;
        let err = parse_response(body, "Moscow", Units::Metric).unwrap_err();
        assert_eq!(err.downcast_ref::<ApiError>(), Some(&ApiError::InvalidApiKey));
    }

    #[test]
    fn string_cod() {
        let body = r#"{"cod": "404", "message": "city not found"}"#;
        let err = parse_response(body, "Atlantis", Units::Metric).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ApiError>(),
            Some(&ApiError::Unavailable { code: 404, message: "city not found".into() })
        );

        let body = r#"{"cod": "401", "message": "nope"}"#;
        let err = parse_response(body, "Moscow", Units::Metric).unwrap_err();
        assert_eq!(err.downcast_ref::<ApiError>(), Some(&ApiError::InvalidApiKey));
    }

    #[test]
    fn malformed_bodies() {
        assert!(parse_response("<html>502</html>", "Moscow", Units::Metric).is_err());
        assert!(parse_response(r#"{"cod": 200}"#, "Moscow", Units::Metric).is_err());
        assert!(parse_response(r#"{"cod": null}"#, "Moscow", Units::Metric).is_err());
    }

    #[test]
    fn local_date_picks_season() {
        // 2023-11-30 22:00 UTC is already December 1st in UTC+3
        let w = CurrentWeather {
            city: "Moscow".into(),
            temperature: 0.0,
            units: Units::Metric,
            observed_at: Utc.with_ymd_and_hms(2023, 11, 30, 22, 0, 0).unwrap(),
            utc_offset_seconds: 3 * 3600,
        };
        assert_eq!(w.local_season(), Season::Winter);

        let w = CurrentWeather { utc_offset_seconds: 0, ..w };
        assert_eq!(w.local_season(), Season::Autumn);

        let w = CurrentWeather { utc_offset_seconds: 200_000, ..w };
        assert_eq!(w.local_time(), None);
        assert_eq!(w.local_season(), Season::Autumn);
    }

    #[test]
    fn request_url_is_encoded() {
        let url = request_url("k3y", "Rio de Janeiro", Units::Imperial).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openweathermap.org/data/2.5/weather?q=Rio+de+Janeiro&appid=k3y&units=imperial"
        );
    }

    #[test]
    fn assessment_against_history() {
        let history = daily("Moscow", day(2020, 1, 10), &[-5., -3., -4., -6., -5.]);
        let weather = parse_response(MOSCOW_OK, "Moscow", Units::Metric).unwrap();

        let a = Assessment::new(weather.clone(), "Moscow", &history);
        assert_eq!(a.season, Season::Winter);
        assert_eq!(a.normality, Normality::Abnormal);
        assert_eq!(a.baseline.as_ref().map(|b| b.samples), Some(5));

        let mild = CurrentWeather { temperature: -4.0, ..weather.clone() };
        assert_eq!(Assessment::new(mild, "Moscow", &history).normality, Normality::Normal);

        // imperial readings are converted before comparing: 24.8 °F is -4 °C
        let imperial = CurrentWeather { temperature: 24.8, units: Units::Imperial, ..weather.clone() };
        assert_eq!(Assessment::new(imperial, "Moscow", &history).normality, Normality::Normal);

        let a = Assessment::new(weather, "Atlantis", &history);
        assert_eq!(a.normality, Normality::Indeterminate);
        assert!(a.baseline.is_none());
    }
}

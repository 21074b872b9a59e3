use serde::Deserialize;
use serde_json::Value;

use crate::routes::AdviceRequest;
use crate::theme::{classify_theme, SunTimes, Theme};

// Mirror of the provider payload. Every field may be absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Payload {
    name: Option<String>,
    main: Option<PayloadMain>,
    weather: Option<Vec<PayloadCondition>>,
    wind: Option<PayloadWind>,
    sys: Option<PayloadSys>,
    timezone: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PayloadMain {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PayloadCondition {
    main: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PayloadWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PayloadSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

/// The fields of a weather payload the UI actually reads.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    pub city_name: String,
    pub temperature_celsius: Option<f64>,
    pub condition_main: String,
    pub condition_description: String,
    pub humidity_percent: Option<f64>,
    pub wind_speed_mps: Option<f64>,
    pub sun: Option<SunTimes>,
}

impl WeatherSummary {
    /// Reads a pass-through payload. Fields of the wrong type are treated as
    /// missing instead of failing the whole payload.
    pub fn from_payload(payload: &Value) -> Self {
        let payload = Payload::deserialize(payload).unwrap_or_else(|_| lenient(payload));
        let condition = payload.weather.and_then(|w| w.into_iter().next()).unwrap_or_default();
        let main = payload.main.unwrap_or_default();
        let sys = payload.sys.unwrap_or_default();

        let sun = match (sys.sunrise, sys.sunset) {
            (Some(sunrise), Some(sunset)) => Some(SunTimes {
                sunrise,
                sunset,
                timezone_offset: payload.timezone.unwrap_or(0),
            }),
            _ => None,
        };

        Self {
            city_name: payload.name.unwrap_or_default(),
            temperature_celsius: main.temp,
            condition_main: condition.main.unwrap_or_default(),
            condition_description: condition.description.unwrap_or_default(),
            humidity_percent: main.humidity,
            wind_speed_mps: payload.wind.and_then(|w| w.speed),
            sun,
        }
    }

    pub fn theme(&self) -> Theme {
        classify_theme(&self.condition_main, &self.condition_description)
    }

    /// The body for an advice request; `None` without a temperature.
    pub fn advice_request(&self) -> Option<AdviceRequest> {
        let temp = self.temperature_celsius?;
        Some(AdviceRequest {
            city: self.city_name.clone(),
            temp,
            description: self.condition_description.clone(),
            wind_speed: self.wind_speed_mps.unwrap_or(0.0),
        })
    }
}

// Field-by-field fallback for payloads where some value has an unexpected type.
fn lenient(value: &Value) -> Payload {
    fn part<T: for<'de> Deserialize<'de>>(value: Option<&Value>) -> Option<T> {
        value.and_then(|v| T::deserialize(v).ok())
    }

    let condition = value
        .get("weather")
        .and_then(|w| w.get(0))
        .map(|c| PayloadCondition {
            main: part(c.get("main")),
            description: part(c.get("description")),
        });

    Payload {
        name: part(value.get("name")),
        main: value.get("main").map(|m| PayloadMain {
            temp: part(m.get("temp")),
            humidity: part(m.get("humidity")),
        }),
        weather: condition.map(|c| vec![c]),
        wind: value.get("wind").map(|w| PayloadWind {
            speed: part(w.get("speed")),
        }),
        sys: value.get("sys").map(|s| PayloadSys {
            sunrise: part(s.get("sunrise")),
            sunset: part(s.get("sunset")),
        }),
        timezone: part(value.get("timezone")),
    }
}

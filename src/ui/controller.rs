use chrono::{DateTime, Utc};
use serde_json::Value;

use super::api::ApiClient;
use super::summary::WeatherSummary;
use crate::routes::AdviceRequest;
use crate::theme::{icon_for, is_daytime_at, Icon, Theme};

const INCOMPLETE_WEATHER: &str = "Données météo incomplètes, impossible de demander un conseil";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    LoadingWeather,
    WeatherShown,
    WeatherError,
    LoadingAdvice,
    AdviceShown,
    AdviceError,
}

#[derive(Debug, Clone)]
pub struct WeatherReport {
    pub payload: Value,
    pub summary: WeatherSummary,
}

/// Handed out when a weather lookup starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherTicket {
    lookup: u64,
    pub city: String,
}

/// Handed out when an advice request starts; ties the answer to the weather
/// report it was asked for.
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceTicket {
    report: u64,
    pub request: AdviceRequest,
}

/// What the screen shows for the current weather report.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherView {
    pub city: String,
    pub temperature: Option<i64>,
    pub description: String,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub theme: Theme,
    pub icon: Icon,
    pub is_day: bool,
}

/// Client-side state for one lookup session.
///
/// Each operation is split into a `begin_*` step, run before the request
/// goes out, and a `finish_*` step that applies the answer. Whichever weather
/// answer arrives last is the one shown. Every change of the shown report
/// clears the advice, and advice answers asked for an earlier report are
/// dropped.
#[derive(Debug, Default)]
pub struct Controller {
    weather: Option<WeatherReport>,
    advice: Option<String>,
    error: Option<String>,
    loading_weather: bool,
    loading_advice: bool,
    // Latest lookup started
    lookup: u64,
    // Bumped whenever the shown report is replaced or cleared
    report: u64,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.loading_weather {
            return Phase::LoadingWeather;
        }
        if self.weather.is_none() {
            return if self.error.is_some() {
                Phase::WeatherError
            } else {
                Phase::Idle
            };
        }
        if self.loading_advice {
            Phase::LoadingAdvice
        } else if self.advice.is_some() {
            Phase::AdviceShown
        } else if self.error.is_some() {
            Phase::AdviceError
        } else {
            Phase::WeatherShown
        }
    }

    pub fn weather(&self) -> Option<&WeatherReport> {
        self.weather.as_ref()
    }

    pub fn advice(&self) -> Option<&str> {
        self.advice.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading_weather(&self) -> bool {
        self.loading_weather
    }

    pub fn is_loading_advice(&self) -> bool {
        self.loading_advice
    }

    pub fn can_request_advice(&self) -> bool {
        self.weather.is_some() && !self.loading_weather && !self.loading_advice
    }

    /// Starts a lookup for the trimmed city, or returns `None` for a blank
    /// name. Clears the previous report, advice and error.
    pub fn begin_weather_lookup(&mut self, city: &str) -> Option<WeatherTicket> {
        let city = city.trim();
        if city.is_empty() {
            return None;
        }

        self.lookup += 1;
        self.loading_weather = true;
        self.replace_report(None);
        self.error = None;
        Some(WeatherTicket {
            lookup: self.lookup,
            city: city.to_string(),
        })
    }

    /// Applies a weather answer. The loading flag stays up while a newer
    /// lookup is still outstanding.
    pub fn finish_weather(&mut self, ticket: WeatherTicket, result: Result<Value, String>) {
        if ticket.lookup == self.lookup {
            self.loading_weather = false;
        }
        match result {
            Ok(payload) => {
                let summary = WeatherSummary::from_payload(&payload);
                self.replace_report(Some(WeatherReport { payload, summary }));
                self.error = None;
            }
            Err(message) => {
                tracing::warn!("Weather lookup failed for {}: {}", ticket.city, message);
                self.replace_report(None);
                self.error = Some(message);
            }
        }
    }

    fn replace_report(&mut self, weather: Option<WeatherReport>) {
        self.report += 1;
        self.weather = weather;
        self.advice = None;
        self.loading_advice = false;
    }

    pub fn begin_advice(&mut self) -> Option<AdviceTicket> {
        if !self.can_request_advice() {
            return None;
        }
        let request = self.weather.as_ref()?.summary.advice_request();

        self.advice = None;
        match request {
            Some(request) => {
                self.loading_advice = true;
                self.error = None;
                Some(AdviceTicket {
                    report: self.report,
                    request,
                })
            }
            None => {
                self.error = Some(INCOMPLETE_WEATHER.to_string());
                None
            }
        }
    }

    pub fn finish_advice(&mut self, ticket: AdviceTicket, result: Result<String, String>) {
        if ticket.report != self.report {
            tracing::debug!("Dropping advice for a replaced weather report");
            return;
        }

        self.loading_advice = false;
        match result {
            Ok(advice) => {
                self.advice = Some(advice);
                self.error = None;
            }
            Err(message) => {
                tracing::warn!("Advice request failed: {}", message);
                self.advice = None;
                self.error = Some(message);
            }
        }
    }

    /// Fetches weather for `city`. Loading state is always cleared afterwards.
    pub async fn submit_city(&mut self, api: &ApiClient, city: &str) {
        let Some(ticket) = self.begin_weather_lookup(city) else {
            return;
        };
        let result = api.weather(&ticket.city).await.map_err(|e| e.user_message());
        self.finish_weather(ticket, result);
    }

    pub async fn request_advice(&mut self, api: &ApiClient) {
        let Some(ticket) = self.begin_advice() else {
            return;
        };
        let result = api
            .advice(&ticket.request)
            .await
            .map_err(|e| e.user_message());
        self.finish_advice(ticket, result);
    }

    pub fn view(&self) -> Option<WeatherView> {
        self.view_at(Utc::now())
    }

    /// Theme and day/night are recomputed on every call.
    pub fn view_at(&self, now: DateTime<Utc>) -> Option<WeatherView> {
        let summary = &self.weather.as_ref()?.summary;
        let theme = summary.theme();
        let is_day = is_daytime_at(summary.sun.as_ref(), now);

        Some(WeatherView {
            city: summary.city_name.clone(),
            temperature: summary.temperature_celsius.map(|t| t.round() as i64),
            description: summary.condition_description.clone(),
            humidity: summary.humidity_percent,
            wind_speed: summary.wind_speed_mps,
            theme,
            icon: icon_for(theme, is_day),
            is_day,
        })
    }
}

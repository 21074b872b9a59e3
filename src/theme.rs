//! Display theme and icon selection for a weather report.
//!
//! Everything here is pure: the same input always gives the same answer, and
//! nothing is cached between renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Clear,
    Clouds,
    Rain,
    Snow,
    Mist,
    Storm,
    Default,
}

/// Ordered keyword table, English and French. The first row with a keyword
/// contained in the condition text wins.
const THEME_KEYWORDS: &[(Theme, &[&str])] = &[
    (Theme::Clear, &["clear", "soleil", "ciel dégagé"]),
    (Theme::Storm, &["storm", "thunder", "orage"]),
    (Theme::Snow, &["snow", "neige"]),
    (Theme::Rain, &["rain", "drizzle", "pluie", "bruine"]),
    (Theme::Mist, &["mist", "fog", "haze", "brume", "brouillard"]),
    (Theme::Clouds, &["cloud", "nuage", "couvert"]),
];

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Clear => "clear",
            Theme::Clouds => "clouds",
            Theme::Rain => "rain",
            Theme::Snow => "snow",
            Theme::Mist => "mist",
            Theme::Storm => "storm",
            Theme::Default => "default",
        }
    }
}

pub fn classify_theme(condition_main: &str, condition_description: &str) -> Theme {
    let text = format!(
        "{} {}",
        condition_main.to_lowercase(),
        condition_description.to_lowercase()
    );

    THEME_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(theme, _)| *theme)
        .unwrap_or(Theme::Default)
}

/// Sunrise/sunset as reported by the provider, with the city's UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    pub sunrise: i64,
    pub sunset: i64,
    pub timezone_offset: i64,
}

pub fn is_daytime(sun: Option<&SunTimes>) -> bool {
    is_daytime_at(sun, Utc::now())
}

/// Day iff `sunrise <= now + offset < sunset`. Without sun times it is day.
pub fn is_daytime_at(sun: Option<&SunTimes>, now: DateTime<Utc>) -> bool {
    match sun {
        Some(sun) => {
            let local_now = now.timestamp() + sun.timezone_offset;
            sun.sunrise <= local_now && local_now < sun.sunset
        }
        None => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    Sun,
    Moon,
    PartlyCloudy,
    Cloudy,
    Rain,
    Snow,
    Mist,
    Storm,
    Thermometer,
}

impl Icon {
    pub fn emoji(&self) -> &'static str {
        match self {
            Icon::Sun => "☀️",
            Icon::Moon => "🌙",
            Icon::PartlyCloudy => "⛅",
            Icon::Cloudy => "☁️",
            Icon::Rain => "🌧️",
            Icon::Snow => "❄️",
            Icon::Mist => "🌫️",
            Icon::Storm => "⛈️",
            Icon::Thermometer => "🌡️",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Icon::Sun => "sun",
            Icon::Moon => "moon",
            Icon::PartlyCloudy => "partly-cloudy",
            Icon::Cloudy => "cloudy",
            Icon::Rain => "rain",
            Icon::Snow => "snow",
            Icon::Mist => "mist",
            Icon::Storm => "storm",
            Icon::Thermometer => "thermometer",
        }
    }
}

pub fn icon_for(theme: Theme, is_day: bool) -> Icon {
    match (theme, is_day) {
        (Theme::Clear, true) => Icon::Sun,
        (Theme::Clear, false) => Icon::Moon,
        (Theme::Clouds, true) => Icon::PartlyCloudy,
        (Theme::Clouds, false) => Icon::Cloudy,
        (Theme::Rain, _) => Icon::Rain,
        (Theme::Snow, _) => Icon::Snow,
        (Theme::Mist, _) => Icon::Mist,
        (Theme::Storm, _) => Icon::Storm,
        (Theme::Default, true) => Icon::Thermometer,
        (Theme::Default, false) => Icon::Moon,
    }
}

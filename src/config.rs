use anyhow::{anyhow, Context};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub allowed_origins: AllowedOrigins,
    pub trust_proxy: bool,
    pub rate_limit_window: Duration,
    pub rate_limit_max: u32,
    pub provider_timeout: Duration,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_current_path: String,
    pub weather_lang: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub advice_max_tokens: u32,
    pub advice_temperature: f32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Required keys
    /// must be present and non-blank; numeric settings must parse.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| get(key).ok_or_else(|| anyhow!("{} not set", key));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            port: parse_or(get("PORT"), "PORT", 5000)?,
            allowed_origins: AllowedOrigins::parse(&or_default("CORS_ORIGIN", "*")),
            trust_proxy: parse_or(get("TRUST_PROXY"), "TRUST_PROXY", false)?,
            rate_limit_window: Duration::from_secs(parse_or(
                get("RATE_LIMIT_WINDOW_SECS"),
                "RATE_LIMIT_WINDOW_SECS",
                15 * 60,
            )?),
            rate_limit_max: parse_or(get("RATE_LIMIT_MAX"), "RATE_LIMIT_MAX", 100)?,
            provider_timeout: Duration::from_secs(parse_or(
                get("PROVIDER_TIMEOUT_SECS"),
                "PROVIDER_TIMEOUT_SECS",
                30,
            )?),
            openweather_api_key: required("OPENWEATHER_KEY")?,
            openweather_base_url: or_default(
                "OPENWEATHER_BASE_URL",
                "https://api.openweathermap.org",
            ),
            openweather_current_path: or_default("OPENWEATHER_CURRENT_PATH", "/data/2.5/weather"),
            weather_lang: or_default("WEATHER_LANG", "fr"),
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_base_url: or_default(
                "OPENAI_BASE_URL",
                "https://api.openai.com/v1/chat/completions",
            ),
            openai_model: or_default("OPENAI_MODEL", "gpt-4.1-mini"),
            advice_max_tokens: parse_or(get("ADVICE_MAX_TOKENS"), "ADVICE_MAX_TOKENS", 80)?,
            advice_temperature: parse_or(get("ADVICE_TEMPERATURE"), "ADVICE_TEMPERATURE", 0.7)?,
        };

        if config.rate_limit_window.is_zero() {
            return Err(anyhow!("RATE_LIMIT_WINDOW_SECS must be greater than zero"));
        }
        if config.rate_limit_max == 0 {
            return Err(anyhow!("RATE_LIMIT_MAX must be greater than zero"));
        }

        Ok(config)
    }

    pub fn weather_url(&self) -> String {
        format!(
            "{}{}",
            self.openweather_base_url.trim_end_matches('/'),
            self.openweather_current_path
        )
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, value)),
        None => Ok(default),
    }
}

/// Shows only the first characters of a secret, for startup logs.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{}…", visible)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_required_keys() {
        let config =
            Config::from_lookup(lookup(&[("OPENWEATHER_KEY", "ow"), ("OPENAI_API_KEY", "sk")]))
                .unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.allowed_origins, AllowedOrigins::Any);
        assert_eq!(config.rate_limit_window, Duration::from_secs(900));
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.weather_lang, "fr");
        assert_eq!(config.advice_max_tokens, 80);
        assert_eq!(
            config.weather_url(),
            "https://api.openweathermap.org/data/2.5/weather"
        );
    }

    #[test]
    fn test_missing_keys_refuse_startup() {
        assert!(Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")])).is_err());
        assert!(Config::from_lookup(lookup(&[("OPENWEATHER_KEY", "ow")])).is_err());
        assert!(Config::from_lookup(lookup(&[
            ("OPENWEATHER_KEY", "   "),
            ("OPENAI_API_KEY", "sk")
        ]))
        .is_err());
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let result = Config::from_lookup(lookup(&[
            ("OPENWEATHER_KEY", "ow"),
            ("OPENAI_API_KEY", "sk"),
            ("PORT", "eighty"),
        ]));
        assert!(result.is_err());

        let result = Config::from_lookup(lookup(&[
            ("OPENWEATHER_KEY", "ow"),
            ("OPENAI_API_KEY", "sk"),
            ("RATE_LIMIT_MAX", "0"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_origin_list() {
        let config = Config::from_lookup(lookup(&[
            ("OPENWEATHER_KEY", "ow"),
            ("OPENAI_API_KEY", "sk"),
            ("CORS_ORIGIN", "http://localhost:5173, https://meteo.example"),
        ]))
        .unwrap();

        assert_eq!(
            config.allowed_origins,
            AllowedOrigins::List(vec![
                "http://localhost:5173".to_string(),
                "https://meteo.example".to_string()
            ])
        );
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdef123"), "abcd…");
        assert_eq!(mask_secret("ab"), "ab…");
    }
}

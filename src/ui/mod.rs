//! Client side: talks to the relay and tracks what the screen shows.

pub mod api;
pub mod controller;
pub mod summary;

pub use api::{ApiClient, ClientError};
pub use controller::{AdviceTicket, Controller, Phase, WeatherReport, WeatherTicket, WeatherView};
pub use summary::WeatherSummary;

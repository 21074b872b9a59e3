pub mod ai;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod theme;
pub mod ui;
pub mod weather;

pub use config::Config;
pub use routes::{create_router, AppState};

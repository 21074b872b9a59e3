//! Terminal front-end for the weather relay.
//!
//! Type a city to look it up, `/conseil` for a tip about the city shown,
//! `/quitter` to leave.

use std::env;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weather_advice_server::ui::{ApiClient, Controller, Phase};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_advice_server=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let base_url = env::var("WEATHER_API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());
    let api = ApiClient::new(&base_url)?;
    let mut controller = Controller::new();

    println!("Météo + IA ({})", base_url);
    println!("Entre une ville (ex: Paris), /conseil pour un conseil IA, /quitter pour sortir.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quitter" | "/quit" => break,
            "/conseil" => {
                if !controller.can_request_advice() {
                    println!("Cherche d'abord la météo d'une ville.");
                    continue;
                }
                println!("Conseil IA en cours...");
                controller.request_advice(&api).await;
            }
            "" => continue,
            city => {
                println!("Chargement...");
                controller.submit_city(&api, city).await;
            }
        }
        render(&controller);
    }

    Ok(())
}

fn render(controller: &Controller) {
    if let Some(error) = controller.error() {
        println!("⚠️  {}", error);
    }

    if let Some(view) = controller.view() {
        println!();
        println!("{} {}", view.icon.emoji(), view.city);
        let description = if view.description.is_empty() {
            "—"
        } else {
            view.description.as_str()
        };
        match view.temperature {
            Some(t) => println!("   {}°C, {}", t, description),
            None => println!("   {}", description),
        }
        let humidity = view
            .humidity
            .map(|h| format!("{}%", h))
            .unwrap_or_else(|| "—".to_string());
        let wind = view
            .wind_speed
            .map(|w| format!("{} m/s", w))
            .unwrap_or_else(|| "—".to_string());
        println!("   💧 Humidité : {}   💨 Vent : {}", humidity, wind);
        println!(
            "   thème {} ({})",
            view.theme.as_str(),
            if view.is_day { "jour" } else { "nuit" }
        );
    }

    if controller.phase() == Phase::AdviceShown {
        if let Some(advice) = controller.advice() {
            println!();
            println!("💡 Conseil IA");
            println!("   {}", advice);
        }
    }
    println!();
}

#[tokio::main]
async fn main() {
    if let Err(err) = app::run().await {
        eprintln!("housing-survey-api failed: {}", err);
        std::process::exit(1);
    }
}

mod api;
mod app;
mod auth;
mod dto;
mod error;
mod models;
mod repositories;
mod services;
mod telemetry;
mod usecases;

//! Subscription tracking service
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for the user CRUD API
//! - Cadence scheduler driving subscription checks and monthly traffic resets
//! - Tokio for async runtime

mod checkpoint;
mod clock;
mod entity;
mod error;
mod jobs;
mod model;
mod prelude;
mod server;
mod state;
mod sv;

use std::{env, net::SocketAddr};

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  checkpoint::FileCheckpoint,
  clock::SystemClock,
  jobs::{Scheduler, SubscriptionCheck, TrafficReset},
  prelude::*,
  state::{AppState, Config},
};

#[tokio::main]
async fn main() {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
      "subtrack=debug,tower_http=debug,sea_orm=warn".into()
    }))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let db_url = env::var("DATABASE_URL")
    .unwrap_or_else(|_| "sqlite:users.db?mode=rwc".into());
  let token = env::var("API_TOKEN").expect("API_TOKEN not set");

  let mut config = Config { token, ..Config::default() };
  if let Ok(path) = env::var("RESET_CHECKPOINT") {
    config.checkpoint_path = path;
  }

  info!("Starting subscription tracker v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(&db_url, config).await);

  let clock = Arc::new(SystemClock);
  let check = SubscriptionCheck::new(app.clone(), clock.clone());
  let reset = TrafficReset::new(
    app.clone(),
    clock,
    Arc::new(FileCheckpoint::new(&app.config.checkpoint_path)),
  );

  let mut scheduler = Scheduler::new();
  scheduler.register(
    "check_subscriptions",
    &app.config.check_cadence,
    move || {
      let check = check.clone();
      async move { check.run().await }
    },
  );
  scheduler.register("reset_traffic", &app.config.reset_cadence, move || {
    let reset = reset.clone();
    async move { reset.run().await }
  });
  scheduler.start();

  let port: u16 =
    env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8082);
  let addr = SocketAddr::from(([0, 0, 0, 0], port));

  let listener =
    tokio::net::TcpListener::bind(addr).await.expect("Failed to bind");
  info!("HTTP server listening on {addr}");

  axum::serve(listener, server::router(app))
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .expect("Server error");

  scheduler.stop();
}

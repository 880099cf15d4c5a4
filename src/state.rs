use migration::{Migrator, MigratorTrait};
use tokio::sync::Mutex;

use crate::{prelude::*, sv};

#[derive(Debug, Clone)]
pub struct Config {
  /// Bearer token required on every `/users` route.
  pub token: String,
  pub checkpoint_path: String,
  pub check_cadence: String,
  pub reset_cadence: String,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      token: String::new(),
      checkpoint_path: String::from("last_reset_time.txt"),
      check_cadence: String::from("1day"),

      // only how often the reset engine gets to look; the engine itself
      // enforces once-per-month
      reset_cadence: String::from("7days"),
    }
  }
}

pub struct Services<'a> {
  pub users: sv::Users<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  write: Mutex<()>,
}

impl AppState {
  pub async fn new(db_url: &str, config: Config) -> Self {
    info!("Connecting to database...");
    let db =
      Database::connect(db_url).await.expect("Failed to connect to database");

    info!("Running migrations...");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    let state = Self { db, config, write: Mutex::new(()) };

    state
      .sv()
      .users
      .cleanup_orphaned_subscriptions()
      .await
      .expect("Failed to clean up orphaned subscriptions");

    state
  }

  pub fn sv(&self) -> Services<'_> {
    Services { users: sv::Users::new(&self.db, &self.write) }
  }
}

//! Monthly traffic reset gated by a durable checkpoint

use super::with_deadline;
use crate::{
  checkpoint::Checkpoint, clock::Clock, prelude::*, state::AppState,
};

/// Resets every account's traffic counter once per calendar month. The
/// checkpoint decides whether a month boundary was crossed, so repeated
/// runs and restarts within the same month stay no-ops.
#[derive(Clone)]
pub struct TrafficReset {
  app: Arc<AppState>,
  clock: Arc<dyn Clock>,
  checkpoint: Arc<dyn Checkpoint>,
}

impl TrafficReset {
  pub fn new(
    app: Arc<AppState>,
    clock: Arc<dyn Clock>,
    checkpoint: Arc<dyn Checkpoint>,
  ) -> Self {
    Self { app, clock, checkpoint }
  }

  pub async fn run(&self) {
    let now = self.clock.now();

    let last = match self.checkpoint.load().await {
      Ok(last) => last,
      Err(err) => {
        error!("Failed to read last reset time: {err}");
        return;
      }
    };

    let Some(last) = last else {
      // first run ever: start the monthly cycle here, nothing to reset
      if let Err(err) = self.checkpoint.save(now).await {
        error!("Failed to bootstrap last reset time: {err}");
      }
      return;
    };

    if (last.year(), last.month()) == (now.year(), now.month()) {
      return;
    }

    info!("Month changed, resetting traffic for all users");
    self.reset_all().await;

    match self.checkpoint.save(now).await {
      Ok(()) => info!("Updated last reset time"),
      Err(err) => error!("Failed to update last reset time: {err}"),
    }
  }

  async fn reset_all(&self) {
    let sv = self.app.sv();

    let usernames = match with_deadline(sv.users.all_usernames()).await {
      Ok(usernames) => usernames,
      Err(err) => {
        error!("Failed to get all users: {err}");
        return;
      }
    };

    for username in usernames {
      if let Err(err) = with_deadline(sv.users.reset_traffic(&username)).await
      {
        error!("Failed to reset traffic for user {username}: {err}");
      }
    }
  }
}

//! Daily pass that lines subscription status up with its validity window

use super::with_deadline;
use crate::{
  clock::Clock,
  entity::Status,
  model::{SubscriptionUpdate, epoch},
  prelude::*,
  state::AppState,
};

/// Advances every account's subscription status relative to the injected
/// clock. Accounts are handled independently; one failure never stops
/// the pass.
#[derive(Clone)]
pub struct SubscriptionCheck {
  app: Arc<AppState>,
  clock: Arc<dyn Clock>,
}

impl SubscriptionCheck {
  pub fn new(app: Arc<AppState>, clock: Arc<dyn Clock>) -> Self {
    Self { app, clock }
  }

  pub async fn run(&self) {
    let sv = self.app.sv();

    let usernames = match with_deadline(sv.users.all_usernames()).await {
      Ok(usernames) => usernames,
      Err(err) => {
        error!("Failed to fetch usernames: {err}");
        return;
      }
    };

    let now = self.clock.now().naive_utc();

    for username in usernames {
      let user = match with_deadline(sv.users.user(&username)).await {
        Ok(Some(user)) => user,
        Ok(None) => continue,
        Err(err) => {
          error!("Failed to get user {username}: {err}");
          continue;
        }
      };

      let mut sub = user.subscription;

      // end_date equal to now transitions nothing in either direction
      if sub.status == Status::Inactive && sub.end_date > now {
        sub.status = Status::Active;
      } else if sub.status == Status::Active && sub.end_date < now {
        info!("Subscription expired for user {username}, deactivating");
        sub.status = Status::Inactive;
        sub.end_date = epoch();
      } else {
        continue;
      }

      let fields = SubscriptionUpdate {
        status: sub.status,
        duration: sub.duration,
        start_date: sub.start_date,
        end_date: sub.end_date,
      };
      if let Err(err) =
        with_deadline(sv.users.update_subscription(&username, &fields)).await
      {
        error!("Failed to update subscription for user {username}: {err}");
      }
    }
  }
}

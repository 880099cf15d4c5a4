use chrono::NaiveDateTime as DateTime;
use serde::{Deserialize, Serialize};

use crate::entity::{Status, subscription};

/// Joined account record: one user and the subscription it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub username: String,
  pub chat_id: i64,
  pub traffic: f64,
  pub subscription: Subscription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
  pub id: i64,
  pub status: Status,
  pub duration: String,
  pub start_date: DateTime,
  pub end_date: DateTime,
}

impl From<subscription::Model> for Subscription {
  fn from(model: subscription::Model) -> Self {
    Self {
      id: model.id,
      status: model.status,
      duration: model.duration,
      start_date: model.start_date,
      end_date: model.end_date,
    }
  }
}

/// Payload for user creation. Subscription fields fall back to defaults
/// (inactive, "month", start = now, end = epoch) when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub username: String,
  #[serde(default)]
  pub chat_id: i64,
  #[serde(default)]
  pub subscription: Option<SubscriptionUpdate>,
}

/// Full replacement of the four mutable subscription fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubscriptionUpdate {
  pub status: Status,
  pub duration: String,
  pub start_date: DateTime,
  pub end_date: DateTime,
}

#[derive(Debug, Deserialize)]
pub struct TrafficUpdate {
  pub traffic: f64,
}

/// Marker written to `end_date` when no validity window is set.
pub fn epoch() -> DateTime {
  chrono::DateTime::UNIX_EPOCH.naive_utc()
}

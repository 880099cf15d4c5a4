use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use serde::Serialize;

use crate::{
  model::{NewUser, SubscriptionUpdate, TrafficUpdate, User},
  prelude::*,
  state::AppState,
};

#[derive(Debug, Serialize)]
pub struct Message {
  pub message: String,
}

impl Message {
  fn new(message: impl Into<String>) -> Self {
    Self { message: message.into() }
  }
}

pub async fn health() -> &'static str {
  "ok"
}

pub async fn create_user(
  State(app): State<Arc<AppState>>,
  Json(req): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
  let user = app.sv().users.create(&req).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

pub async fn user(
  State(app): State<Arc<AppState>>,
  Path(username): Path<String>,
) -> Result<Json<User>> {
  match app.sv().users.user(&username).await? {
    Some(user) => Ok(Json(user)),
    None => Err(Error::UserNotFound),
  }
}

pub async fn update_subscription(
  State(app): State<Arc<AppState>>,
  Path(username): Path<String>,
  Json(req): Json<SubscriptionUpdate>,
) -> Result<Json<Message>> {
  app.sv().users.update_subscription(&username, &req).await?;
  Ok(Json(Message::new("Subscription updated")))
}

pub async fn delete_user(
  State(app): State<Arc<AppState>>,
  Path(username): Path<String>,
) -> Result<Json<Message>> {
  let sv = app.sv();
  if !sv.users.exists(&username).await? {
    return Err(Error::UserNotFound);
  }

  sv.users.delete(&username).await?;
  Ok(Json(Message::new("User deleted")))
}

pub async fn exists(
  State(app): State<Arc<AppState>>,
  Path(username): Path<String>,
) -> Result<Json<json::Value>> {
  let exists = app.sv().users.exists(&username).await?;
  Ok(Json(json::json!({ "exists": exists })))
}

pub async fn subscription_status(
  State(app): State<Arc<AppState>>,
  Path(username): Path<String>,
) -> Result<Json<json::Value>> {
  let status = app.sv().users.subscription_status(&username).await?;
  Ok(Json(json::json!({ "subscription_status": status })))
}

pub async fn update_traffic(
  State(app): State<Arc<AppState>>,
  Path(username): Path<String>,
  Json(req): Json<TrafficUpdate>,
) -> Result<Json<Message>> {
  let sv = app.sv();
  if !sv.users.exists(&username).await? {
    return Err(Error::UserNotFound);
  }

  sv.users.update_traffic(&username, req.traffic).await?;
  Ok(Json(Message::new("Traffic updated")))
}

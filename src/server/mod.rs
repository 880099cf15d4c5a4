//! HTTP transport over the store

mod handlers;

use std::sync::Arc;

use axum::{
  Router,
  extract::{Request, State},
  http::{StatusCode, header},
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

use crate::{prelude::*, state::AppState};

pub fn router(app: Arc<AppState>) -> Router {
  let users = Router::new()
    .route("/", post(handlers::create_user))
    .route(
      "/{username}",
      get(handlers::user)
        .put(handlers::update_subscription)
        .delete(handlers::delete_user),
    )
    .route("/{username}/subscription", get(handlers::subscription_status))
    .route("/{username}/exists", get(handlers::exists))
    .route("/{username}/traffic", put(handlers::update_traffic))
    .layer(middleware::from_fn_with_state(app.clone(), auth));

  Router::new()
    .route("/health", get(handlers::health))
    .nest("/users", users)
    .layer(
      ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
        CorsLayer::new()
          .allow_origin(Any)
          .allow_methods(Any)
          .allow_headers(Any),
      ),
    )
    .with_state(app)
}

async fn auth(
  State(app): State<Arc<AppState>>,
  request: Request,
  next: Next,
) -> Response {
  let token = request
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok());

  let expected = format!("Bearer {}", app.config.token);
  if token != Some(expected.as_str()) {
    warn!(
      "Rejected request with incorrect API token: {} {}",
      request.method(),
      request.uri()
    );
    let body = json::json!({ "success": false, "error": "Unauthorized" });
    return (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response();
  }

  next.run(request).await
}

use crate::error::Error;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    subscribers: usize,
}

/// GET the liveness of the broker and its current subscriber count
pub(crate) async fn health_check(
    State(app_state): State<AppState>,
) -> Result<impl IntoResponse, Error> {
    let subscribers = app_state.broker.subscriber_count().await?;

    Ok((
        StatusCode::OK,
        Json(HealthStatus {
            status: "healthy",
            subscribers,
        }),
    ))
}

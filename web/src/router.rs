use crate::error::{Error, Result};
use crate::{controller::health_check_controller, stream::handler, AppState};
use axum::{routing::get, Router};

pub const HEALTH_PATH: &str = "/health";

/// Fails when the configured stream path would shadow another route.
pub fn define_routes(app_state: AppState) -> Result<Router> {
    let stream_path = normalize_path(app_state.config.stream_path());
    if stream_path == HEALTH_PATH {
        return Err(Error::route_conflict(stream_path));
    }

    Ok(Router::new()
        .merge(health_routes(app_state.clone()))
        .merge(stream_routes(&stream_path, app_state)))
}

fn health_routes(app_state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_check_controller::health_check))
        .with_state(app_state)
}

fn stream_routes(stream_path: &str, app_state: AppState) -> Router {
    Router::new()
        .route(stream_path, get(handler::sse_handler))
        .with_state(app_state)
}

// Router::route panics on paths without a leading slash.
fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

use std::sync::Arc;

use axum::extract::State;
use hyper::StatusCode;
use prometheus::{Encoder, TextEncoder};

use crate::state::AppState;

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Vec<u8>, StatusCode> {
    let metric_families = state.metrics.registry.gather();
    let mut buf = Vec::new();

    if let Err(err) = TextEncoder::new().encode(&metric_families, &mut buf) {
        error!(?err, "Failed to encode metrics");

        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(buf)
}

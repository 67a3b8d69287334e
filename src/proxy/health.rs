//! Health endpoint

use crate::infrastructure::log_messages::responses;
use crate::proxy::error_response::ErrorResponse;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Seconds since the gateway started
    pub uptime: f64,
    pub message: String,
    /// Epoch milliseconds at report time
    pub timestamp: i64,
}

impl HealthReport {
    pub fn since(started: Instant) -> Self {
        Self {
            uptime: started.elapsed().as_secs_f64(),
            message: responses::HEALTH_OK.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

impl IntoResponse for HealthReport {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(_) => ErrorResponse::new(responses::HEALTH_UNAVAILABLE)
                .into_response_with_status(StatusCode::SERVICE_UNAVAILABLE),
        }
    }
}

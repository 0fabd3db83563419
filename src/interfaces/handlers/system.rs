use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use humantime::format_duration;
use serde::Serialize;
use std::time::Duration;

use crate::constants::START_TIME;

#[derive(Serialize)]
struct HealthCheckResponse {
    success: bool,
    message: &'static str,
    timestamp: String,
    uptime: String,
}

/// Liveness only. Never touches the mail transport or the rate limit store.
#[get("/health")]
pub async fn health_check() -> impl Responder {
    let now_utc = Utc::now();
    let uptime = now_utc.signed_duration_since(*START_TIME);
    let uptime = format_duration(Duration::from_secs(uptime.num_seconds().max(0) as u64));

    HttpResponse::Ok().json(HealthCheckResponse {
        success: true,
        message: "API is running",
        timestamp: now_utc.to_rfc3339(),
        uptime: uptime.to_string(),
    })
}

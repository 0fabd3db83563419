use actix_web::HttpResponse;

use crate::constants::NOT_FOUND_MESSAGE;

/// Fallback for every unmatched route.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "success": false,
        "message": NOT_FOUND_MESSAGE
    }))
}

use actix_web::{web, HttpResponse};

use crate::{entities::contact::ContactRequest, errors::AppError, AppState};

/// `POST /api/contact`. Rate limiting is applied by the route's middleware
/// before the body is even parsed.
pub async fn send_contact_message(
    state: web::Data<AppState>,
    form: web::Json<ContactRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.contact_handler
        .submit_contact_message(form.into_inner())
        .await
        .map_err(|e| e.with_details(state.expose_error_details))?;

    Ok(HttpResponse::Ok().json(response))
}

use std::net::TcpListener;

use actix_cors::Cors;
use actix_web::{
    dev::{Server, ServiceResponse},
    http::{header, Method, StatusCode},
    middleware::{Compress, DefaultHeaders, ErrorHandlerResponse, ErrorHandlers, NormalizePath},
    web, App, HttpServer,
};
use tracing_actix_web::TracingLogger;

use crate::{constants::record_start_time, errors::AppError, routes::configure_routes, settings::AppConfig, AppState};

/// Builds the CORS policy from the configured client URL(s).
pub fn cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allowed_headers([header::CONTENT_TYPE, header::ACCEPT])
        .supports_credentials()
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }

    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((header::X_CONTENT_TYPE_OPTIONS, "nosniff"))
        .add((header::X_FRAME_OPTIONS, "DENY"))
        .add((header::REFERRER_POLICY, "no-referrer"))
}

/// Rewrites bare 500s into the JSON envelope. Responses that already carry
/// a JSON body (an `AppError`) pass through untouched.
fn internal_error_envelope<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let is_json = res
        .response()
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));

    if is_json {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    let detail = res.response().error().map(|e| e.to_string());
    let expose = res
        .request()
        .app_data::<web::Data<AppState>>()
        .is_some_and(|state| state.expose_error_details);

    tracing::error!(path = %res.request().path(), detail = ?detail, "Unhandled server error");

    let (req, _) = res.into_parts();
    let response = AppError::InternalError(detail).with_details(expose).to_http_response();
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

/// Binds the full middleware stack and routes to `listener`.
pub fn run(
    listener: TcpListener,
    state: web::Data<AppState>,
    config: &AppConfig,
) -> std::io::Result<Server> {
    record_start_time();
    let origins = config.cors_origins();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, internal_error_envelope))
            .wrap(NormalizePath::trim())
            .wrap(Compress::default())
            .wrap(security_headers())
            .wrap(cors(&origins))
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .listen(listener)?
    .workers(config.worker_count.max(1))
    .run();

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, test::TestRequest, HttpResponse};

    async fn rewrite(response: HttpResponse) -> serde_json::Value {
        let res = ServiceResponse::new(TestRequest::default().to_http_request(), response);
        let ErrorHandlerResponse::Response(res) = internal_error_envelope(res).unwrap() else {
            panic!("expected an immediate response");
        };
        let bytes = to_bytes(res.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[actix_rt::test]
    async fn bare_500_becomes_json_envelope() {
        let body = rewrite(HttpResponse::InternalServerError().body("boom")).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("error").is_none());
    }

    #[actix_rt::test]
    async fn json_500_passes_through() {
        let body = rewrite(AppError::DispatchError(None).to_http_response()).await;
        assert_eq!(body["message"], crate::constants::DISPATCH_FAILED_MESSAGE);
    }
}

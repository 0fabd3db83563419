use actix_web::web;

use crate::{
    handlers::{contact, json_error::not_found, system},
    middlewares::rate_limit::RateLimit,
};

/// Everything under `/api` shares the general limiter; the contact form adds
/// its own, tighter one.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(RateLimit::api())
            .service(system::health_check)
            .service(
                web::resource("/contact")
                    .wrap(RateLimit::contact())
                    .route(web::post().to(contact::send_contact_message))
                    .default_service(web::to(not_found))
            )
            .default_service(web::to(not_found))
    );
}

use std::sync::Arc;

use humantime::format_duration;

mod domain;
mod interfaces;
mod infrastructure;
pub mod client;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;
pub mod server;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, middlewares, routes};
pub use infrastructure::{limiter, mail, utils};

use constants::API_RATE_LIMITED_MESSAGE;
use limiter::rate_limiter::{RateLimitPolicy, RateLimiter, SharedRateLimitStore};
use mail::{
    dispatcher::{MailDispatcher, MailerSettings},
    transport::SharedMailTransport,
};
use use_cases::contact::ContactHandler;

pub struct AppState {
    pub contact_handler: AppContactHandler,
    pub api_limiter: RateLimiter,
    pub contact_limiter: RateLimiter,
    pub trust_x_forwarded_for: bool,
    pub expose_error_details: bool,
}

pub type AppContactHandler = ContactHandler<SharedMailTransport>;

impl AppState {
    pub fn new(
        config: &settings::AppConfig,
        transport: SharedMailTransport,
        store: SharedRateLimitStore,
    ) -> Self {
        let dispatcher = MailDispatcher::new(transport, MailerSettings::from(config));

        let api_limiter = RateLimiter::new(
            Arc::clone(&store),
            RateLimitPolicy::new(config.rate_limit_max_requests, config.api_window()),
            "api",
            API_RATE_LIMITED_MESSAGE,
        );

        let contact_limiter = RateLimiter::new(
            store,
            RateLimitPolicy::new(config.contact_rate_limit_max_requests, config.contact_window()),
            "contact",
            format!(
                "Too many contact form submissions. Please try again in {}.",
                format_duration(config.contact_window())
            ),
        );

        AppState {
            contact_handler: ContactHandler::new(dispatcher),
            api_limiter,
            contact_limiter,
            trust_x_forwarded_for: config.trust_x_forwarded_for,
            expose_error_details: config.expose_error_details(),
        }
    }
}

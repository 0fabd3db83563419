use actix_web::{
    body::BoxBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{HeaderName, HeaderValue, RETRY_AFTER},
        Method,
    },
    web, Error,
};
use futures_util::future::{ok, Ready, LocalBoxFuture};
use std::{rc::Rc, task::{Context, Poll}, time::Duration};

use crate::{
    errors::AppError,
    limiter::rate_limiter::{RateLimitDecision, RateLimiter},
    utils::get_client_ip::get_client_ip,
    AppState,
};

/// Which of the application's limiters guards the wrapped service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimiterKind {
    Api,
    Contact,
}

impl LimiterKind {
    fn select(self, state: &AppState) -> &RateLimiter {
        match self {
            LimiterKind::Api => &state.api_limiter,
            LimiterKind::Contact => &state.contact_limiter,
        }
    }
}

/// Rejects requests over the selected limiter's quota with 429 before any
/// extractor or handler runs. When `method` is set, only requests with that
/// method are counted; everything else passes straight through.
pub struct RateLimit {
    pub kind: LimiterKind,
    pub method: Option<Method>,
}

impl RateLimit {
    pub fn api() -> Self {
        RateLimit { kind: LimiterKind::Api, method: None }
    }

    /// Only submissions count against the contact quota.
    pub fn contact() -> Self {
        RateLimit { kind: LimiterKind::Contact, method: Some(Method::POST) }
    }
}

impl<S> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(RateLimitService {
            service: Rc::new(service),
            kind: self.kind,
            method: self.method.clone(),
        })
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    kind: LimiterKind,
    method: Option<Method>,
}

impl<S> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<BoxBody>, Error = Error> + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let kind = self.kind;
        let counted = match &self.method {
            Some(method) => req.method() == method,
            None => req.method() != Method::OPTIONS,
        };

        Box::pin(async move {
            if !counted {
                return service.call(req).await;
            }

            let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
                tracing::error!("AppState missing in rate limit middleware");
                return Ok(req.into_response(AppError::InternalError(None).to_http_response()));
            };

            let limiter = kind.select(&state);
            let client = get_client_ip(req.request(), state.trust_x_forwarded_for);
            let decision = limiter.check(&client).await;

            match decision {
                RateLimitDecision::Allowed { limit, remaining, reset_after } => {
                    let mut res = service.call(req).await?;
                    // A nested limiter already reported its own quota.
                    if !res.headers().contains_key(RATELIMIT_LIMIT) {
                        insert_rate_headers(res.headers_mut(), limit, remaining, reset_after);
                    }
                    Ok(res)
                }
                RateLimitDecision::Limited { limit, retry_after } => {
                    tracing::warn!(
                        limiter = limiter.namespace(),
                        client = %client,
                        path = %req.path(),
                        "Rate limit exceeded"
                    );
                    let mut response =
                        AppError::RateLimited(limiter.message().to_string()).to_http_response();
                    let headers = response.headers_mut();
                    insert_rate_headers(headers, limit, 0, retry_after);
                    headers.insert(RETRY_AFTER, HeaderValue::from(ceil_secs(retry_after)));
                    Ok(req.into_response(response))
                }
            }
        })
    }
}

const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs();
    if duration.subsec_nanos() > 0 { secs + 1 } else { secs }
}

fn insert_rate_headers(
    headers: &mut actix_web::http::header::HeaderMap,
    limit: u64,
    remaining: u64,
    reset_after: Duration,
) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(ceil_secs(reset_after)));
}

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;

pub static START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Pins `START_TIME` to now if nothing has read it yet. Call once at startup.
pub fn record_start_time() -> DateTime<Utc> {
    *Lazy::force(&START_TIME)
}

pub const CONTACT_ACCEPTED_MESSAGE: &str = "Message sent successfully! I'll get back to you soon.";
pub const DISPATCH_FAILED_MESSAGE: &str = "Failed to send message. Please try again later.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";
pub const NOT_FOUND_MESSAGE: &str = "Endpoint not found";
pub const API_RATE_LIMITED_MESSAGE: &str = "Too many requests from this IP, please try again later.";

pub const OWNER_SUBJECT_PREFIX: &str = "Portfolio Contact: ";
pub const AUTO_REPLY_SUBJECT: &str = "Thank you for reaching out!";

/// Upper bound for JSON request bodies.
pub const JSON_BODY_LIMIT: usize = 16 * 1024;

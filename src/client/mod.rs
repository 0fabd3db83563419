//! Browser-side counterpart of the contact endpoint: an HTTP client and the
//! submission form state it drives.

pub mod form;
pub mod http;

pub use form::{ContactFormState, FormField, FormStatus};
pub use http::{ClientBuildError, ContactClient, SubmitFailure};

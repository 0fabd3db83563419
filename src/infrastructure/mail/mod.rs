pub mod dispatcher;
pub mod smtp;
pub mod transport;

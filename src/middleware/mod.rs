//! Tower middleware for outbound API calls

mod logging;

pub use logging::LoggingMiddleware;

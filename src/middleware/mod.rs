pub mod body_limit;
pub mod logging;
pub mod metrics;

pub use body_limit::BodyLimit;
pub use logging::RequestLogging;
pub use metrics::MetricsMiddleware;

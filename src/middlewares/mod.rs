pub mod method_override;
pub mod request_logging;

pub use method_override::MethodOverride;
pub use request_logging::{RequestId, RequestLogging};

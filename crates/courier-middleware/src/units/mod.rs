//! The six chain units.
//!
//! Listed here in chain order (outermost first):
//!
//! 1. [`error_handling`] - Convert escaped failures and panics into envelopes
//! 2. [`logging`] - Record method, target, outcome and duration
//! 3. [`cors`] - Answer preflights, add `Access-Control-*` headers
//! 4. [`authentication`] - Validate bearer tokens, attach identity
//! 5. [`rate_limit`] - Fixed-window request budget per client key
//! 6. [`json`] - Parse JSON request bodies, encode structured responses

pub mod authentication;
pub mod cors;
pub mod error_handling;
pub mod json;
pub mod logging;
pub mod rate_limit;

// Re-export main types
pub use authentication::AuthenticationUnit;
pub use cors::{AllowedOrigins, CorsUnit};
pub use error_handling::ErrorHandlingUnit;
pub use json::JsonUnit;
pub use logging::LoggingUnit;
pub use rate_limit::{RateLimitBuilder, RateLimitUnit};

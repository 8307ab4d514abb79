//! # Courier Middleware
//!
//! The ordered middleware chain every inbound request traverses before it
//! reaches the command router.
//!
//! ## Chain Order
//!
//! ```text
//! Request → ErrorHandling → Logging → CORS → Authentication → RateLimit → JSON → Router
//!                                                                                  ↓
//! Response ← ErrorHandling ← Logging ← CORS ← Authentication ← RateLimit ← JSON ←──┘
//! ```
//!
//! | Stage | Unit           | Purpose                                           |
//! |-------|----------------|---------------------------------------------------|
//! | 1     | ErrorHandling  | Turn any escaped failure into a JSON envelope     |
//! | 2     | Logging        | Record method, target, outcome and duration       |
//! | 3     | CORS           | Answer preflights, tag responses with CORS headers|
//! | 4     | Authentication | Attach caller identity from a bearer token        |
//! | 5     | RateLimit      | Bound requests per client per window              |
//! | 6     | JSON           | Parse request bodies, encode structured responses |
//!
//! Units are a closed set ([`Unit`]); the order is checked once when the
//! [`Chain`] is built and never re-derived per request.
//!
//! ## Example
//!
//! ```
//! use courier_middleware::{Chain, Stage};
//!
//! let chain = Chain::with_defaults();
//! assert_eq!(chain.stages(), Stage::all().to_vec());
//! assert_eq!(chain.stage_names()[0], "error_handling");
//! ```

#![doc(html_root_url = "https://docs.rs/courier-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod store;
pub mod unit;
pub mod units;

// Re-export main types at crate root
pub use chain::{Chain, ChainBuildError, ChainBuilder, Stage};
pub use context::RequestContext;
pub use store::{InMemoryRateLimitStore, RateLimitEntry, RateLimitStore};
pub use unit::{BoxFuture, Next, PipelineResult, Unit};

//! # Courier Core
//!
//! Core types shared by every Courier crate.
//!
//! This crate provides the foundational types used throughout Courier:
//!
//! - [`Envelope`] - The uniform `{success, data|error}` response shape
//! - [`GatewayError`] / [`ErrorKind`] - The shared error taxonomy and its HTTP mapping
//! - [`CallerIdentity`] - Who is calling (authenticated user or anonymous)
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Body`], [`Request`], [`Response`] - HTTP types flowing through the chain
//! - [`Clock`] - Injectable source of epoch seconds

#![doc(html_root_url = "https://docs.rs/courier-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod clock;
mod envelope;
mod error;
mod identity;
mod request_id;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use envelope::Envelope;
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use identity::CallerIdentity;
pub use request_id::RequestId;
pub use types::{Body, Request, Response, ResponseExt, APPLICATION_JSON};

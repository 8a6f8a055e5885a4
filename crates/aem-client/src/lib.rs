//! Authenticated HTTP executor for Adobe Experience Manager.
//!
//! Every AEM operation is described as a [`RequestDescriptor`] and run through
//! [`AemClient::execute`], which:
//!
//! - resolves the path against the configured base URL
//! - attaches the `Authorization` header from the configured credential provider
//! - attaches the `CSRF-Token` header to mutating requests when a token is available
//! - maps non-success statuses to [`Error::UpstreamRequest`]
//!
//! Success bodies are returned as [`Payload::Json`] when the response declares
//! a JSON content type, otherwise as [`Payload::Text`].

mod client;
pub mod csrf;
mod error;
pub mod request;

pub use client::{AemClient, ClientBuilder};
pub use csrf::{SECURITY_TOKEN_HEADER, SECURITY_TOKEN_PATH, SecurityTokenCache};
pub use error::{Error, Result};
pub use request::{Payload, RequestBody, RequestDescriptor};

// Re-exported so callers can build descriptors without a direct reqwest dependency.
pub use reqwest::Method;

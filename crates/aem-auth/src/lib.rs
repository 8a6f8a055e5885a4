//! Credential management for AEM requests.
//!
//! # Components
//!
//! - [`credential`]: the `Basic`/`Bearer` credential value and its header form
//! - [`exchange`]: client-credentials token exchange and expiry computation
//! - [`provider`]: providers per auth mode, including coalesced bearer refresh
//! - [`clock`]: injectable time source for expiry decisions

pub mod clock;
pub mod credential;
pub mod error;
pub mod exchange;
pub mod provider;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use credential::Credential;
pub use error::{AuthError, Result};
pub use exchange::{ClientCredentials, EXPIRY_SAFETY_MARGIN_SECS, TokenResponse};
pub use provider::{
    BasicProvider, ClientCredentialsProvider, CredentialProvider, SharedCredentialProvider,
    StaticTokenProvider, create_credential_provider,
};

//! Reddit OAuth authorization for the retention sweeper
//!
//! Covers the interactive code flow and the token endpoint. Every token
//! endpoint call goes through the shared [`rate_gate::RateGate`].
//!
//! Authorization flow:
//! 1. `state::generate_state()` produces the correlation secret
//! 2. `authorize::build_authorization_url()` embeds it as `state`
//! 3. `callback::CallbackListener` captures the single browser redirect and
//!    checks the echoed `state`
//! 4. `token::TokenExchanger::exchange_code()` turns the code into a
//!    `Credential`
//! 5. `credentials::CredentialStore` persists it keyed by username
//!
//! `authorize::await_authorization()` wires steps 1-3 together.

pub mod app;
pub mod authorize;
pub mod callback;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod state;
pub mod token;

pub use app::OAuthApp;
pub use authorize::{await_authorization, build_authorization_url};
pub use callback::{AuthorizationOutcome, AuthorizationResult, CallbackListener};
pub use constants::*;
pub use credentials::{Credential, CredentialStore};
pub use error::{Error, Result};
pub use state::generate_state;
pub use token::{TokenExchanger, TokenResponse};

//! Shared types for the retention sweeper workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;

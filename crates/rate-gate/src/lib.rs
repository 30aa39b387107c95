//! Adaptive single-slot admission gate for outbound API calls
//!
//! Every request to the platform, whether a token exchange, a listing page
//! or a delete, passes through one shared [`RateGate`]. The gate admits one
//! caller at a time and releases the next admission only after the current
//! caller reports the response's rate-limit headers. When the reported
//! budget drops under the configured headroom, the next admission waits out
//! the reported reset delay plus a safety margin.
//!
//! Call protocol:
//! 1. `gate.acquire().await?` returns an [`Admission`]
//! 2. Send the request
//! 3. `admission.report(response.headers())?` as soon as a response arrives,
//!    before inspecting status or body
//!
//! Dropping an `Admission` without reporting (transport failure, no response)
//! releases the slot immediately with no pacing decision.

pub mod budget;
pub mod error;
pub mod gate;

pub use budget::{RESET_HEADER, REMAINING_HEADER, RateBudget};
pub use error::{Error, Result};
pub use gate::{Admission, DEFAULT_HEADROOM, DEFAULT_SAFETY_MARGIN, GateConfig, RateGate};

//! Rate budget parsed from response headers

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::{Error, Result};

/// Requests left in the current window.
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Seconds until the current window resets.
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Live view of the platform quota as of the latest response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateBudget {
    /// Requests left in the current window. The platform reports this as a
    /// decimal (e.g. `"598.0"`).
    pub remaining: f64,
    /// Delay until the window resets.
    pub reset: Duration,
}

impl RateBudget {
    /// Parse both rate-limit headers. Either header missing or not a
    /// non-negative finite number is an error.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let remaining = parse_header(headers, REMAINING_HEADER)?;
        let reset = parse_header(headers, RESET_HEADER)?;
        let reset = Duration::try_from_secs_f64(reset).map_err(|_| Error::MalformedHeader {
            header: RESET_HEADER,
            value: reset.to_string(),
        })?;
        Ok(Self { remaining, reset })
    }

    /// Whether the budget is low enough that the next admission must wait.
    pub fn below(&self, headroom: f64) -> bool {
        self.remaining < headroom
    }
}

fn parse_header(headers: &HeaderMap, name: &'static str) -> Result<f64> {
    let raw = headers.get(name).ok_or(Error::MissingHeader(name))?;
    let malformed = || Error::MalformedHeader {
        header: name,
        value: String::from_utf8_lossy(raw.as_bytes()).into_owned(),
    };
    let value: f64 = raw
        .to_str()
        .map_err(|_| malformed())?
        .trim()
        .parse()
        .map_err(|_| malformed())?;
    if !value.is_finite() || value < 0.0 {
        return Err(malformed());
    }
    Ok(value)
}

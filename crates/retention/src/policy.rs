//! Per-kind retention windows
//!
//! A window is either `forever` or a duration written as one or more
//! `<number><unit>` pairs (`24h`, `720h`, `1h30m`, `1.5h`). Units: `h`, `m`,
//! `s`, `ms`.

use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// How long entries of one kind are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    Forever,
    For(Duration),
}

impl FromStr for Retention {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "forever" => Ok(Retention::Forever),
            other => parse_duration(other).map(Retention::For),
        }
    }
}

impl Retention {
    /// Unix-second cutoff: entries created before it are expired.
    /// `None` for `Forever`.
    pub fn cutoff(&self, now: SystemTime) -> Option<i64> {
        match self {
            Retention::Forever => None,
            Retention::For(keep) => {
                let now = now
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs() as i64;
                Some(now.saturating_sub(i64::try_from(keep.as_secs()).unwrap_or(i64::MAX)))
            }
        }
    }
}

/// Retention windows for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub comments: Retention,
    pub posts: Retention,
}

/// Cutoffs derived from a policy at a fixed instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cutoffs {
    pub comments: Option<i64>,
    pub posts: Option<i64>,
}

impl RetentionPolicy {
    pub fn parse(comment_duration: &str, post_duration: &str) -> Result<Self> {
        Ok(Self {
            comments: comment_duration.parse()?,
            posts: post_duration.parse()?,
        })
    }

    /// Nothing would ever be deleted.
    pub fn keeps_everything(&self) -> bool {
        self.comments == Retention::Forever && self.posts == Retention::Forever
    }

    pub fn cutoffs(&self, now: SystemTime) -> Cutoffs {
        Cutoffs {
            comments: self.comments.cutoff(now),
            posts: self.posts.cutoff(now),
        }
    }
}

/// Parse a duration such as `24h`, `90m` or `1h30m15s`.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |why: &str| Error::InvalidDuration(format!("{input:?}: {why}"));

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid("missing unit"))?;
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let value: f64 = rest[..number_len]
            .parse()
            .map_err(|_| invalid("bad number"))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let seconds_per_unit = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            unit => return Err(invalid(&format!("unknown unit {unit:?}"))),
        };
        rest = &rest[unit_len..];
        total += value * seconds_per_unit;
    }

    Duration::try_from_secs_f64(total).map_err(|_| invalid("out of range"))
}

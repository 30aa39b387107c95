//! Single-slot admission gate
//!
//! One permit exists. `acquire` hands it out (FIFO, via tokio's fair
//! semaphore) and the permit travels inside the [`Admission`] until the
//! holder reports the response headers. If the reported budget is under the
//! headroom, a cool-down task keeps holding the permit for the reset delay
//! plus the safety margin, so the reporting caller is never blocked but the
//! next caller is.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::HeaderMap;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info};

use crate::budget::RateBudget;
use crate::error::{Error, Result};

/// Default headroom: pause once fewer than this many requests remain.
pub const DEFAULT_HEADROOM: f64 = 5.0;

/// Default margin added to the reported reset delay.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(5);

/// Pacing parameters for a [`RateGate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateConfig {
    /// Pause admissions when `remaining < headroom`.
    pub headroom: f64,
    /// Extra wait on top of the reported reset delay.
    pub safety_margin: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            headroom: DEFAULT_HEADROOM,
            safety_margin: DEFAULT_SAFETY_MARGIN,
        }
    }
}

struct Inner {
    slot: Arc<Semaphore>,
    config: GateConfig,
    last_budget: Mutex<Option<RateBudget>>,
}

/// Process-wide admission gate. Cloning is cheap and every clone shares the
/// same slot.
#[derive(Clone)]
pub struct RateGate {
    inner: Arc<Inner>,
}

impl RateGate {
    pub fn new(config: GateConfig) -> Self {
        debug!(
            headroom = config.headroom,
            safety_margin_secs = config.safety_margin.as_secs_f64(),
            "rate gate initialized"
        );
        Self {
            inner: Arc::new(Inner {
                slot: Arc::new(Semaphore::new(1)),
                config,
                last_budget: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> GateConfig {
        self.inner.config
    }

    /// Wait for the slot.
    ///
    /// Returns `Error::Closed` once any caller has reported unusable
    /// rate-limit headers.
    pub async fn acquire(&self) -> Result<Admission> {
        let permit = self
            .inner
            .slot
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Closed)?;
        metrics::counter!("rate_gate_admissions_total").increment(1);
        Ok(Admission {
            permit,
            inner: self.inner.clone(),
        })
    }

    /// Budget reported by the most recent response, if any.
    pub fn last_budget(&self) -> Option<RateBudget> {
        *self
            .inner
            .last_budget
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_closed(&self) -> bool {
        self.inner.slot.is_closed()
    }
}

/// Proof of admission. Holds the gate's only slot until reported or dropped.
#[must_use = "an admission holds the gate until it is reported or dropped"]
pub struct Admission {
    permit: OwnedSemaphorePermit,
    inner: Arc<Inner>,
}

impl Admission {
    /// Feed back the response headers and release the slot.
    ///
    /// Must be called from within a tokio runtime: when the budget is low the
    /// slot is handed to a cool-down task instead of being released here.
    /// Unusable headers close the gate for every caller.
    pub fn report(self, headers: &HeaderMap) -> Result<RateBudget> {
        let Admission { permit, inner } = self;

        let budget = match RateBudget::from_headers(headers) {
            Ok(budget) => budget,
            Err(e) => {
                error!(error = %e, "unusable rate-limit headers, closing rate gate");
                inner.slot.close();
                return Err(e);
            }
        };

        *inner
            .last_budget
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(budget);

        if budget.below(inner.config.headroom) {
            let pause = budget.reset + inner.config.safety_margin;
            info!(
                remaining = budget.remaining,
                reset_secs = budget.reset.as_secs_f64(),
                pause_secs = pause.as_secs_f64(),
                "rate budget under headroom, pausing admissions"
            );
            metrics::counter!("rate_gate_cooldowns_total").increment(1);
            tokio::spawn(async move {
                tokio::time::sleep(pause).await;
                drop(permit);
                debug!("rate gate cool-down finished");
            });
        } else {
            debug!(remaining = budget.remaining, "rate budget ok");
            drop(permit);
        }

        Ok(budget)
    }
}

//! Stock around advice that re-runs the rest of the chain on failure.

use std::num::NonZeroU32;

use tracing::{debug, warn};

use crate::application::{
    error::InvocationResult,
    services::{advice::AroundAdvice, chain::ProceedingJoinPoint},
};
use crate::domain::{DomainError, Value};

/// Attempts used when a marker carries no usable count.
pub const DEFAULT_MAX_ATTEMPTS: NonZeroU32 = NonZeroU32::MIN.saturating_add(2);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Policy {
    Fixed(NonZeroU32),
    /// Read the count from the marker bound to `capture`, e.g.
    /// `@annotation(retry)` with `@Retry(4)`.
    FromMarker { capture: String, default: NonZeroU32 },
}

/// Retries the rest of the chain immediately, up to `max_attempts` calls in
/// total. The first success is returned; if every attempt fails, the last
/// failure propagates unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryAdvice {
    policy: Policy,
}

impl RetryAdvice {
    /// Fixed attempt count. `max_attempts` counts the first call and must be
    /// at least 1.
    pub fn new(max_attempts: i64) -> Result<Self, DomainError> {
        u32::try_from(max_attempts)
            .ok()
            .and_then(NonZeroU32::new)
            .map(|n| Self {
                policy: Policy::Fixed(n),
            })
            .ok_or(DomainError::InvalidRetryPolicy {
                attempts: max_attempts,
            })
    }

    /// Attempt count taken from the integer value of the marker bound to
    /// `capture`, falling back to [`DEFAULT_MAX_ATTEMPTS`].
    pub fn from_marker(capture: impl Into<String>) -> Self {
        Self {
            policy: Policy::FromMarker {
                capture: capture.into(),
                default: DEFAULT_MAX_ATTEMPTS,
            },
        }
    }

    fn max_attempts(&self, pjp: &ProceedingJoinPoint<'_>) -> u32 {
        match &self.policy {
            Policy::Fixed(n) => n.get(),
            Policy::FromMarker { capture, default } => pjp
                .bindings()
                .marker(capture)
                .and_then(|m| m.value.as_ref())
                .and_then(Value::as_int)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n >= 1)
                .unwrap_or(default.get()),
        }
    }
}

impl AroundAdvice for RetryAdvice {
    fn around(&self, pjp: &ProceedingJoinPoint<'_>) -> InvocationResult<Value> {
        let max_attempts = self.max_attempts(pjp);
        let mut attempt = 1;
        loop {
            debug!(join_point = %pjp, attempt, max_attempts, "Retry attempt");
            match pjp.proceed() {
                Ok(value) => return Ok(value),
                Err(error) if attempt < max_attempts => {
                    debug!(join_point = %pjp, attempt, %error, "Attempt failed, retrying");
                    attempt += 1;
                }
                Err(error) => {
                    warn!(join_point = %pjp, attempts = attempt, %error, "Retries exhausted");
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_and_negative_attempts_are_rejected() {
        assert!(matches!(
            RetryAdvice::new(0),
            Err(DomainError::InvalidRetryPolicy { attempts: 0 })
        ));
        assert!(RetryAdvice::new(-2).is_err());
        assert!(RetryAdvice::new(1).is_ok());
    }
}

//! Stock aspects: trace, log, transaction and retry.
//!
//! Each writes what it does to a shared [`Journal`] as well as to `tracing`,
//! so tests and the CLI can observe the exact interleaving of advice and real
//! calls.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use weft_core::{
    application::{AdviceDefinition, RetryAdvice},
    domain::{DomainError, TypeName},
};

/// Capture name the marker-driven retry binds its marker to.
pub const RETRY_CAPTURE: &str = "retry";

/// An append-only, shareable record of advice activity.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// The advice kinds a manifest can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinAdvice {
    Trace,
    Log,
    Transaction,
    Retry,
}

impl BuiltinAdvice {
    pub const ALL: [BuiltinAdvice; 4] = [Self::Trace, Self::Log, Self::Transaction, Self::Retry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Log => "log",
            Self::Transaction => "transaction",
            Self::Retry => "retry",
        }
    }
}

impl fmt::Display for BuiltinAdvice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuiltinAdvice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!("unknown advice '{s}', expected one of: trace, log, transaction, retry")
            })
    }
}

/// Before advice: `[trace] <signature> args=[..]`.
pub fn trace(journal: &Journal, name: &str, pointcut: &str) -> AdviceDefinition {
    let journal = journal.clone();
    AdviceDefinition::before(name, pointcut, move |jp| {
        let args: Vec<String> = jp.args().iter().map(ToString::to_string).collect();
        let entry = format!("[trace] {} args=[{}]", jp, args.join(", "));
        info!("{entry}");
        journal.record(entry);
        Ok(())
    })
}

/// Around advice: `[log] <signature>` before proceeding.
pub fn log(journal: &Journal, name: &str, pointcut: &str) -> AdviceDefinition {
    let journal = journal.clone();
    AdviceDefinition::around(name, pointcut, move |pjp| {
        let entry = format!("[log] {pjp}");
        info!("{entry}");
        journal.record(entry);
        pjp.proceed()
    })
}

/// Around advice: begin, then commit or rollback, then release.
pub fn transaction(journal: &Journal, name: &str, pointcut: &str) -> AdviceDefinition {
    let journal = journal.clone();
    AdviceDefinition::around(name, pointcut, move |pjp| {
        let step = |what: &str| {
            let entry = format!("[tx] {what} {pjp}");
            info!("{entry}");
            journal.record(entry);
        };
        step("begin");
        let outcome = pjp.proceed();
        match &outcome {
            Ok(_) => step("commit"),
            Err(_) => step("rollback"),
        }
        step("release");
        outcome
    })
}

/// Around advice retrying the rest of the chain.
///
/// With `max_attempts` the count is fixed. Without it the count is read from
/// the marker of type `marker` bound as `retry`, e.g. `@Retry(4)`, and the
/// pointcut defaults to `@annotation(retry)`.
pub fn retry(
    name: &str,
    pointcut: Option<&str>,
    max_attempts: Option<i64>,
    marker: Option<&TypeName>,
) -> Result<AdviceDefinition, DomainError> {
    match (max_attempts, marker) {
        (Some(attempts), _) => {
            let pointcut = pointcut.ok_or_else(|| {
                DomainError::InvalidSignature(format!(
                    "retry advice '{name}' with a fixed count needs a pointcut"
                ))
            })?;
            Ok(AdviceDefinition::around_with(
                name,
                pointcut,
                RetryAdvice::new(attempts)?,
            ))
        }
        (None, Some(marker)) => {
            let pointcut = pointcut
                .map(str::to_owned)
                .unwrap_or_else(|| format!("@annotation({RETRY_CAPTURE})"));
            Ok(AdviceDefinition::around_with(
                name,
                pointcut,
                RetryAdvice::from_marker(RETRY_CAPTURE),
            )
            .capture(RETRY_CAPTURE, marker))
        }
        (None, None) => Err(DomainError::InvalidSignature(format!(
            "retry advice '{name}' needs max_attempts or a marker type"
        ))),
    }
}

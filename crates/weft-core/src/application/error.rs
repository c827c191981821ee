//! Application layer errors.
//!
//! [`ApplicationError`] covers wiring failures: building proxies, casting
//! them, looking things up in the registry. [`InvocationError`] is what the
//! caller of a proxied method sees when the call itself fails.

use thiserror::Error;

use crate::domain::{AdviceId, AspectId, Fault, ProxyId, TypeName};
use crate::error::ErrorCategory;

/// Errors that occur while assembling advice, chains and proxies.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplicationError {
    /// A proxy cannot be built for the requested type and mode.
    #[error("Cannot proxy '{type_name}': {reason}")]
    ProxyConstruction { type_name: String, reason: String },

    /// The handle does not present the requested type.
    #[error("Proxy {proxy} cannot be treated as '{requested}'")]
    ProxyCast { proxy: String, requested: String },

    /// A replacement target has a different concrete type.
    #[error("Replacement target is '{found}', expected '{expected}'")]
    TargetMismatch { expected: String, found: String },

    /// The registry lock was poisoned by a panicking writer.
    #[error("Advice registry is unavailable")]
    RegistryLock,

    #[error("No advice registered as {id}")]
    UnknownAdvice { id: AdviceId },

    #[error("No aspect registered as {id}")]
    UnknownAspect { id: AspectId },

    /// A [`crate::application::ProxySlot`] was bound twice.
    #[error("Self-reference slot is already bound")]
    SelfProxyAlreadyBound,
}

impl ApplicationError {
    pub(crate) fn construction(type_name: &TypeName, reason: impl Into<String>) -> Self {
        Self::ProxyConstruction {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Get user-actionable suggestions.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::ProxyConstruction { type_name, .. } => vec![
                format!("Check how '{}' is declared in the catalog", type_name),
                "Subclass mode needs a non-final concrete type with a free constructor".into(),
                "Interface mode needs contracts the target implements".into(),
            ],
            Self::ProxyCast { .. } => vec![
                "Interface-mode proxies expose only their contracts".into(),
                "Use subclass mode to treat the proxy as the concrete type".into(),
            ],
            Self::TargetMismatch { expected, .. } => {
                vec![format!("Replace the target with another '{}'", expected)]
            }
            Self::RegistryLock => vec![
                "An advice body panicked while the registry was being updated".into(),
                "Rebuild the weaver".into(),
            ],
            Self::UnknownAdvice { .. } | Self::UnknownAspect { .. } => {
                vec!["The id may already have been unregistered".into()]
            }
            Self::SelfProxyAlreadyBound => {
                vec!["Each target instance gets exactly one proxy reference".into()]
            }
        }
    }

    /// Get error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProxyConstruction { .. }
            | Self::ProxyCast { .. }
            | Self::TargetMismatch { .. }
            | Self::SelfProxyAlreadyBound => ErrorCategory::Validation,
            Self::UnknownAdvice { .. } | Self::UnknownAspect { .. } => ErrorCategory::NotFound,
            Self::RegistryLock => ErrorCategory::Internal,
        }
    }
}

/// The failure a caller observes from a proxied call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvocationError {
    /// The real method raised `fault`.
    #[error("{method} threw {fault}")]
    TargetInvocation { method: String, fault: Fault },

    /// An advice body raised `fault`. An error already in flight when it did
    /// is kept in `suppressed`.
    #[error("advice '{advice}' threw {fault}")]
    AdviceExecution {
        advice: String,
        fault: Fault,
        #[source]
        suppressed: Option<Box<InvocationError>>,
    },

    /// The method exists on the target but the handle does not expose it.
    #[error("{method} is not exposed by proxy {proxy}")]
    NotExposed { method: String, proxy: ProxyId },

    #[error("'{type_name}' has no method matching {method}")]
    NoSuchMethod { type_name: String, method: String },

    /// A [`crate::application::ProxySlot`] was used after its proxy was dropped
    /// or before it was bound.
    #[error("proxy reference is not available")]
    ProxyReleased,
}

impl InvocationError {
    /// The exception carried by this error, if it carries one.
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::TargetInvocation { fault, .. } | Self::AdviceExecution { fault, .. } => {
                Some(fault)
            }
            _ => None,
        }
    }

    /// The error this one replaced, if any.
    pub fn suppressed(&self) -> Option<&InvocationError> {
        match self {
            Self::AdviceExecution { suppressed, .. } => suppressed.as_deref(),
            _ => None,
        }
    }

    /// Rethrow this error from inside a target body, e.g. after calling
    /// through a [`crate::application::ProxySlot`]. Errors without a fault
    /// become an `IllegalStateException`.
    pub fn into_fault(self) -> Fault {
        match self {
            Self::TargetInvocation { fault, .. } | Self::AdviceExecution { fault, .. } => fault,
            other => Fault::illegal_state(other.to_string()),
        }
    }

    pub(crate) fn advice(advice: &str, fault: Fault, suppressed: Option<InvocationError>) -> Self {
        Self::AdviceExecution {
            advice: advice.to_owned(),
            fault,
            suppressed: suppressed.map(Box::new),
        }
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::NotExposed { .. } => vec![
                "Interface-mode proxies expose only contract methods".into(),
                "Subclass-mode proxies expose only public methods".into(),
            ],
            Self::NoSuchMethod { .. } => {
                vec!["Check the method name and argument types against the catalog".into()]
            }
            Self::ProxyReleased => vec!["Bind the slot before the first call".into()],
            _ => Vec::new(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TargetInvocation { .. } | Self::AdviceExecution { .. } => ErrorCategory::Runtime,
            Self::NotExposed { .. } | Self::ProxyReleased => ErrorCategory::Validation,
            Self::NoSuchMethod { .. } => ErrorCategory::NotFound,
        }
    }
}

/// Result of a proxied call.
pub type InvocationResult<T> = Result<T, InvocationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn suppressed_error_is_the_source() {
        let first = InvocationError::TargetInvocation {
            method: "a.B.save()".into(),
            fault: Fault::illegal_state("boom"),
        };
        let second = InvocationError::advice("after", Fault::runtime("late"), Some(first.clone()));
        assert_eq!(second.suppressed(), Some(&first));
        assert!(second.source().is_some());
        assert_eq!(second.fault().map(Fault::message), Some("late"));
    }
}

use std::fmt;

use crate::domain::value_objects::TypeName;

/// An exception raised by a target method or an advice body.
///
/// `kind` names a catalog type (normally a `Throwable` subtype) so that
/// after-throwing filters can select faults by assignability.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    kind: TypeName,
    message: String,
}

impl Fault {
    pub fn new(kind: impl Into<TypeName>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// `RuntimeException` with the given message.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new("RuntimeException", message)
    }

    /// `IllegalStateException` with the given message.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::new("IllegalStateException", message)
    }

    pub fn kind(&self) -> &TypeName {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.simple_name(), self.message)
    }
}

impl std::error::Error for Fault {}

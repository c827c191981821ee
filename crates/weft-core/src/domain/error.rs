use thiserror::Error;

/// Root domain error type.
///
/// All errors are:
/// - Cloneable (registration is often retried after a fix)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Pointcut language
    // ========================================================================
    /// A pointcut expression could not be parsed or bound.
    ///
    /// `position` is the byte offset of `fragment` inside `expression`.
    #[error("pointcut syntax error at {position} near '{fragment}': {message}")]
    PointcutSyntax {
        expression: String,
        position: usize,
        fragment: String,
        message: String,
    },

    #[error("Named pointcut '{name}' is already defined")]
    DuplicatePointcut { name: String },

    // ========================================================================
    // Type catalog
    // ========================================================================
    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Type '{name}' is already registered")]
    DuplicateType { name: String },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid type descriptor '{name}': {reason}")]
    InvalidTypeDescriptor { name: String, reason: String },

    // ========================================================================
    // Advice configuration
    // ========================================================================
    #[error("Retry needs at least one attempt, got {attempts}")]
    InvalidRetryPolicy { attempts: i64 },
}

impl DomainError {
    pub(crate) fn syntax(
        expression: &str,
        position: usize,
        fragment: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::PointcutSyntax {
            expression: expression.to_owned(),
            position,
            fragment: fragment.into(),
            message: message.into(),
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::PointcutSyntax {
                expression,
                position,
                ..
            } => vec![
                format!("In: {}", expression),
                format!("    {}^", " ".repeat(*position)),
                "Designators: execution, within, args, this, target, @annotation, @within, @target"
                    .into(),
                "Combine with &&, || and !; reference named pointcuts as name()".into(),
            ],
            Self::UnknownType { name } => vec![
                format!("'{}' is not in the type catalog", name),
                "Use the fully qualified name, e.g. hello.aop.member.MemberService".into(),
                "Add the type to a catalog manifest (see: weft match --help)".into(),
            ],
            Self::DuplicatePointcut { name } => vec![
                format!("Rename one of the '{}' definitions", name),
            ],
            Self::InvalidRetryPolicy { .. } => vec![
                "maxAttempts counts the first call, so the minimum is 1".into(),
            ],
            _ => vec!["See documentation for more details".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PointcutSyntax { .. }
            | Self::DuplicatePointcut { .. }
            | Self::InvalidSignature(_)
            | Self::InvalidTypeDescriptor { .. }
            | Self::InvalidRetryPolicy { .. } => ErrorCategory::Validation,
            Self::UnknownType { .. } => ErrorCategory::NotFound,
            Self::DuplicateType { .. } => ErrorCategory::Conflict,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
}

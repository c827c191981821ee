//! CLI error handling.
//!
//! Provides structured errors with:
//! - User-friendly messages
//! - Actionable suggestions
//! - Exit code mapping
//! - Source-annotated diagnostics for pointcut syntax errors

use std::error::Error as _;
use std::fmt::Write as _;

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, SourceSpan};
use owo_colors::OwoColorize;
use thiserror::Error;

use weft_core::domain::DomainError;
use weft_core::error::{ErrorCategory as CoreCategory, WeftError};

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input that clap could not catch.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// `plan` was given something other than `Type.method`.
    #[error("Invalid join point '{spec}': expected <Type>.<method>")]
    InvalidJoinPoint { spec: String },

    #[error("Type '{type_name}' is not in the catalog")]
    TypeNotFound { type_name: String },

    #[error("No method '{method}' on {type_name}")]
    MethodNotFound {
        type_name: String,
        method: String,
        candidates: Vec<String>,
    },

    #[error("Unknown configuration key '{key}'")]
    UnknownConfigKey { key: String },

    /// A configuration file could not be read, parsed or written.
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An error from the weaving engine or its adapters.
    #[error("{0}")]
    Core(#[from] WeftError),

    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Feature not available: {feature}")]
    FeatureNotAvailable { feature: &'static str },
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}

impl CliError {
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidInput { message, .. } => vec![
                format!("Check your input: {message}"),
                "Use --help for usage information".into(),
            ],

            Self::InvalidJoinPoint { .. } => vec![
                "Give the fully qualified type and the method name".into(),
                "Example: weft plan hello.aop.order.OrderServiceImpl.orderItem".into(),
            ],

            Self::TypeNotFound { .. } => vec![
                "Add a catalog manifest describing the type: --catalog <DIR>".into(),
                "List known types with: weft match 'execution(* *(..))' --all".into(),
            ],

            Self::MethodNotFound { candidates, .. } => {
                if candidates.is_empty() {
                    vec!["The type declares and inherits no methods".into()]
                } else {
                    let mut out = vec!["Available methods:".to_owned()];
                    out.extend(candidates.iter().map(|c| format!("  \u{2022} {c}")));
                    out
                }
            }

            Self::UnknownConfigKey { .. } => vec![
                "Run `weft config list` to see every key".into(),
                "Keys are dotted paths, e.g. proxy.mode or catalog.paths".into(),
            ],

            Self::ConfigError { message, .. } => vec![
                format!("Configuration issue: {message}"),
                format!(
                    "Check your config file at {}",
                    crate::config::AppConfig::config_path().display()
                ),
                "Use 'weft init' to create a default config".into(),
            ],

            Self::Core(core) => core.suggestions(),

            Self::IoError { message, .. } => vec![
                format!("I/O operation failed: {message}"),
                "Check file permissions".into(),
                "Ensure the parent directory exists".into(),
            ],

            Self::Cancelled => vec!["No changes were made".into()],

            Self::FeatureNotAvailable { feature } => vec![format!(
                "Rebuild with the feature enabled: cargo install weft-cli --features {feature}"
            )],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. }
            | Self::InvalidJoinPoint { .. }
            | Self::UnknownConfigKey { .. }
            | Self::Cancelled => ErrorCategory::UserError,
            Self::TypeNotFound { .. } | Self::MethodNotFound { .. } => ErrorCategory::NotFound,
            Self::ConfigError { .. } | Self::FeatureNotAvailable { .. } => {
                ErrorCategory::Configuration
            }
            Self::Core(core) => match core.category() {
                CoreCategory::Validation | CoreCategory::Conflict => ErrorCategory::UserError,
                CoreCategory::NotFound => ErrorCategory::NotFound,
                CoreCategory::Configuration => ErrorCategory::Configuration,
                CoreCategory::Runtime | CoreCategory::Internal => ErrorCategory::Internal,
            },
            Self::IoError { .. } => ErrorCategory::Internal,
        }
    }

    /// Exit code to pass to the OS.
    ///
    /// | Category      | Code |
    /// |---------------|------|
    /// | User error    |  2   |
    /// | Not found     |  3   |
    /// | Configuration |  4   |
    /// | Internal      |  1   |
    pub fn exit_code(&self) -> u8 {
        match self.category() {
            ErrorCategory::UserError => 2,
            ErrorCategory::NotFound => 3,
            ErrorCategory::Configuration => 4,
            ErrorCategory::Internal => 1,
        }
    }

    /// A source-annotated diagnostic, for errors that point into an expression.
    pub fn diagnostic(&self) -> Option<PointcutDiagnostic> {
        match self {
            Self::Core(WeftError::Domain(DomainError::PointcutSyntax {
                expression,
                position,
                fragment,
                message,
            })) => Some(PointcutDiagnostic::new(expression, *position, fragment, message)),
            _ => None,
        }
    }

    pub fn format_colored(&self, verbose: bool) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "\n{} {}\n\n  {}\n",
            "\u{2717}".red().bold(),
            "Error:".red().bold(),
            self.to_string().red()
        );

        if let Some(report) = self.diagnostic().map(|d| d.render(true)) {
            let _ = write!(out, "\n{report}");
        }

        if verbose {
            let mut source = self.source();
            while let Some(err) = source {
                let _ = write!(out, "\n  {} {}\n", "\u{2192}".dimmed(), err.to_string().dimmed());
                source = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            let _ = writeln!(out, "\n{}", "Suggestions:".yellow().bold());
            for suggestion in suggestions {
                let _ = writeln!(out, "  {suggestion}");
            }
        }

        if !verbose {
            let _ = writeln!(
                out,
                "\n{} {}",
                "\u{2139}".blue(),
                "Use -v / --verbose for more details.".dimmed()
            );
        }
        out
    }

    /// Plain-text version of [`Self::format_colored`].
    pub fn format_plain(&self, verbose: bool) -> String {
        let mut out = format!("\nError: {self}\n");

        if let Some(report) = self.diagnostic().map(|d| d.render(false)) {
            let _ = write!(out, "\n{report}");
        }

        if verbose {
            let mut source = self.source();
            while let Some(err) = source {
                let _ = writeln!(out, "  Caused by: {err}");
                source = err.source();
            }
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\nSuggestions:\n");
            for s in &suggestions {
                let _ = writeln!(out, "  {s}");
            }
        }

        if !verbose {
            out.push_str("\nUse -v / --verbose for more details.\n");
        }
        out
    }

    pub fn log(&self) {
        match self.category() {
            ErrorCategory::UserError => tracing::warn!("User error: {}", self),
            ErrorCategory::NotFound => tracing::warn!("Not found: {}", self),
            ErrorCategory::Configuration => tracing::error!("Configuration error: {}", self),
            ErrorCategory::Internal => tracing::error!("Internal error: {}", self),
        }
        if let Some(source) = self.source() {
            tracing::debug!("Caused by: {}", source);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    UserError,
    NotFound,
    Configuration,
    Internal,
}

// ── Pointcut diagnostics ──────────────────────────────────────────────────────

/// A pointcut syntax error with a label under the offending text.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(
    code(weft::pointcut::syntax),
    help("designators: execution, within, args, this, target, @annotation, @within, @target, @args, or a named pointcut()")
)]
pub struct PointcutDiagnostic {
    message: String,
    #[source_code]
    expression: String,
    #[label("here")]
    span: SourceSpan,
}

impl PointcutDiagnostic {
    pub fn new(expression: &str, position: usize, fragment: &str, message: &str) -> Self {
        let start = position.min(expression.len());
        let len = fragment.len().min(expression.len() - start);
        Self {
            message: message.to_owned(),
            expression: expression.to_owned(),
            span: (start, len).into(),
        }
    }

    pub fn render(&self, color: bool) -> String {
        let theme = if color {
            GraphicalTheme::unicode()
        } else {
            GraphicalTheme::unicode_nocolor()
        };
        let mut out = String::new();
        match GraphicalReportHandler::new_themed(theme).render_report(&mut out, self) {
            Ok(()) => out,
            Err(_) => format!("{}\n", self.message),
        }
    }
}

// ── IntoCli trait ─────────────────────────────────────────────────────────────

/// Converts foreign errors into [`CliError`] with a context message.
pub trait IntoCli<T> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IntoCli<T> for Result<T, std::io::Error> {
    fn with_cli_context<F, S>(self, f: F) -> CliResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| CliError::IoError {
            message: f().into(),
            source: e,
        })
    }
}

//! The pointcut language: parsing, validation and matching.
//!
//! A [`Pointcut`] is parsed once, against a [`TypeCatalog`], and is immutable
//! afterwards. Matching has two forms:
//!
//! - [`Pointcut::evaluate`] with no runtime information gives a [`Verdict`]
//!   that is `Dynamic` when the answer depends on argument values, the proxy
//!   or the target. [`Pointcut::matches`] is "could match": everything but
//!   `Never`.
//! - [`Pointcut::bindings`] runs against a concrete call and collects the
//!   values captured for the advice body.

mod ast;
mod context;
mod lexer;
mod library;
mod matcher;
mod parser;
mod pattern;

use std::fmt;
use std::sync::Arc;

pub use context::{Binding, Bindings, ProxyShape, RuntimeContext, Verdict};
pub use library::PointcutLibrary;
pub use pattern::TypePattern;

use crate::domain::{
    entities::{Signature, TypeCatalog},
    error::DomainError,
    value_objects::TypeName,
};
use ast::Expr;
use matcher::Evaluator;
use parser::ParseScope;

/// A parsed, validated pointcut expression.
#[derive(Debug, Clone)]
pub struct Pointcut {
    source: Arc<str>,
    expr: Arc<Expr>,
    captures: Arc<[(String, TypeName)]>,
}

impl Pointcut {
    /// Parse an expression without captures or named references.
    pub fn parse(text: &str, catalog: &TypeCatalog) -> Result<Self, DomainError> {
        Self::parse_with(text, catalog, &[], &PointcutLibrary::new())
    }

    /// Parse with declared captures `(name, type)` and a library of named
    /// pointcuts to resolve `name()` references against.
    pub fn parse_with(
        text: &str,
        catalog: &TypeCatalog,
        captures: &[(String, TypeName)],
        library: &PointcutLibrary,
    ) -> Result<Self, DomainError> {
        for (_, ty) in captures {
            catalog.require(ty)?;
        }
        let scope = ParseScope {
            catalog,
            captures,
            library,
        };
        let expr = parser::parse(text, &scope)?;
        Ok(Self {
            source: Arc::from(text.trim()),
            expr: Arc::new(expr),
            captures: captures.into(),
        })
    }

    /// The expression as written (trimmed).
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn has_captures(&self) -> bool {
        !self.captures.is_empty()
    }

    /// Declared captures in declaration order.
    pub fn captures(&self) -> &[(String, TypeName)] {
        &self.captures
    }

    pub fn evaluate(
        &self,
        catalog: &TypeCatalog,
        signature: &Signature,
        runtime: RuntimeContext<'_>,
    ) -> Verdict {
        Evaluator {
            catalog,
            signature,
            runtime,
        }
        .evaluate(&self.expr)
    }

    /// Static match: `true` unless the pointcut can never select `signature`.
    pub fn matches(&self, catalog: &TypeCatalog, signature: &Signature) -> bool {
        !self
            .evaluate(catalog, signature, RuntimeContext::new())
            .is_never()
    }

    /// Match against a concrete call and collect captured values.
    ///
    /// Returns `None` when the call does not match.
    pub fn bindings(
        &self,
        catalog: &TypeCatalog,
        signature: &Signature,
        runtime: RuntimeContext<'_>,
    ) -> Option<Bindings> {
        let evaluator = Evaluator {
            catalog,
            signature,
            runtime,
        };
        if evaluator.evaluate(&self.expr).is_never() {
            return None;
        }
        let mut out = Bindings::new();
        evaluator.bind(&self.expr, &mut out);
        Some(out)
    }

    /// Indented tree with named references expanded.
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.expr.write_tree(&mut out, 0);
        out
    }

    pub(crate) fn expr(&self) -> Arc<Expr> {
        Arc::clone(&self.expr)
    }
}

/// Canonical form: normalized spacing, minimal parentheses.
impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

impl PartialEq for Pointcut {
    fn eq(&self, other: &Self) -> bool {
        self.expr == other.expr
    }
}

impl PointcutLibrary {
    /// Add a named pointcut. Its body may reference earlier definitions.
    pub fn add(&mut self, name: &str, pointcut: &Pointcut) -> Result<(), DomainError> {
        if !is_identifier(name) {
            return Err(DomainError::syntax(
                name,
                0,
                name,
                "named pointcuts need an identifier name",
            ));
        }
        if pointcut.has_captures() {
            return Err(DomainError::syntax(
                pointcut.source(),
                0,
                name,
                "named pointcuts cannot declare captures",
            ));
        }
        self.define(name, pointcut.source(), pointcut.expr())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

//! Named pointcuts that other expressions reference as `name()`.

use std::sync::Arc;

use crate::domain::{error::DomainError, pointcut::ast::Expr};

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    source: String,
    expr: Arc<Expr>,
}

/// Named pointcut definitions in definition order.
///
/// A definition may reference earlier ones, so references always resolve to
/// an already-parsed tree and cycles cannot form.
#[derive(Debug, Clone, Default)]
pub struct PointcutLibrary {
    entries: Vec<Entry>,
}

impl PointcutLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn define(
        &mut self,
        name: &str,
        source: &str,
        expr: Arc<Expr>,
    ) -> Result<(), DomainError> {
        if self.contains(name) {
            return Err(DomainError::DuplicatePointcut { name: name.into() });
        }
        self.entries.push(Entry {
            name: name.into(),
            source: source.into(),
            expr,
        });
        Ok(())
    }

    pub(crate) fn resolve(&self, name: &str) -> Option<Arc<Expr>> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| Arc::clone(&e.expr))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// `(name, source text)` pairs in definition order.
    pub fn definitions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.source.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

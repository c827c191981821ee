//! Filesystem-based aspect loader.
//!
//! Aspect manifests name built-in advices and the pointcuts they apply to.
//! Named pointcuts are defined before any aspect in the same load, so every
//! manifest may refer to pointcuts from any other.
//!
//! # Manifest format
//!
//! ```toml
//! [[pointcuts]]
//! name       = "allOrder"
//! expression = "execution(* hello.aop.order..*(..))"
//!
//! [[aspects]]
//! name  = "TxAspect"
//! order = 1
//!
//! [[aspects.advice]]
//! kind     = "transaction"             # trace | log | transaction | retry
//! pointcut = "allOrder() && execution(* *..*Service.*(..))"
//!
//! [[aspects]]
//! name = "RetryAspect"
//!
//! [[aspects.advice]]
//! kind   = "retry"
//! marker = "hello.aop.exam.annotation.Retry"   # attempts from the marker value
//! # max_attempts = 3                           # or a fixed count
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use weft_core::{
    application::{AdviceDefinition, Weaver, ports::AspectSource},
    domain::{AspectId, DomainError, TypeName},
    error::WeftResult,
};

use crate::builtin_aspects::{self, BuiltinAdvice, Journal};
use crate::manifest::{self, ManifestError};

// ── Manifest types ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AspectManifest {
    #[serde(default)]
    pub pointcuts: Vec<PointcutEntry>,
    #[serde(default)]
    pub aspects: Vec<AspectEntry>,
}

/// One `[[pointcuts]]` table.
#[derive(Debug, Deserialize, Clone)]
pub struct PointcutEntry {
    pub name: String,
    pub expression: String,
}

/// One `[[aspects]]` table.
#[derive(Debug, Deserialize, Clone)]
pub struct AspectEntry {
    pub name: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub advice: Vec<AdviceEntry>,
}

/// One `[[aspects.advice]]` table.
#[derive(Debug, Deserialize, Clone)]
pub struct AdviceEntry {
    pub kind: String,
    /// Defaults to `<aspect>.<kind>`.
    pub name: Option<String>,
    pub pointcut: Option<String>,
    /// Retry only: fixed attempt count.
    pub max_attempts: Option<i64>,
    /// Retry only: marker type carrying the attempt count.
    pub marker: Option<String>,
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Installs the aspects described under one or more manifest roots.
#[derive(Debug, Clone)]
pub struct FilesystemAspectLoader {
    roots: Vec<PathBuf>,
    journal: Journal,
}

impl FilesystemAspectLoader {
    pub fn new(root: impl Into<PathBuf>, journal: Journal) -> Self {
        Self::with_roots([root.into()], journal)
    }

    pub fn with_roots(roots: impl IntoIterator<Item = impl Into<PathBuf>>, journal: Journal) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            journal,
        }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Every readable manifest under the roots. Unparseable files are skipped
    /// with a warning.
    #[instrument(skip(self), fields(roots = self.roots.len()))]
    pub fn load_all(&self) -> Result<Vec<AspectManifest>, ManifestError> {
        let mut manifests = Vec::new();
        for root in &self.roots {
            for path in manifest::discover(root)? {
                match manifest::read::<AspectManifest>(&path) {
                    Ok(m) => {
                        debug!(
                            file = %path.display(),
                            pointcuts = m.pointcuts.len(),
                            aspects = m.aspects.len(),
                            "Aspect manifest loaded"
                        );
                        manifests.push(m);
                    }
                    Err(e) => warn!(file = %path.display(), error = %e, "Skipping aspect manifest"),
                }
            }
        }
        Ok(manifests)
    }
}

impl AspectSource for FilesystemAspectLoader {
    fn install(&self, weaver: &Weaver) -> WeftResult<Vec<AspectId>> {
        let manifests = self.load_all()?;

        for pointcut in manifests.iter().flat_map(|m| &m.pointcuts) {
            weaver.define_pointcut(&pointcut.name, &pointcut.expression)?;
        }

        let mut installed = Vec::new();
        for aspect in manifests.iter().flat_map(|m| &m.aspects) {
            let id = weaver.aspect(&aspect.name, aspect.order)?;
            for entry in &aspect.advice {
                weaver.register(id, definition(&self.journal, &aspect.name, entry)?)?;
            }
            info!(aspect = %aspect.name, order = aspect.order, advices = aspect.advice.len(), "Aspect installed");
            installed.push(id);
        }
        Ok(installed)
    }
}

fn definition(journal: &Journal, aspect: &str, entry: &AdviceEntry) -> WeftResult<AdviceDefinition> {
    let kind: BuiltinAdvice = entry
        .kind
        .parse()
        .map_err(|message: String| DomainError::InvalidSignature(format!("aspect '{aspect}': {message}")))?;
    let name = entry
        .name
        .clone()
        .unwrap_or_else(|| format!("{aspect}.{kind}"));

    let pointcut = || {
        entry.pointcut.as_deref().ok_or_else(|| {
            DomainError::InvalidSignature(format!("advice '{name}' has no pointcut"))
        })
    };
    let definition = match kind {
        BuiltinAdvice::Trace => builtin_aspects::trace(journal, &name, pointcut()?),
        BuiltinAdvice::Log => builtin_aspects::log(journal, &name, pointcut()?),
        BuiltinAdvice::Transaction => builtin_aspects::transaction(journal, &name, pointcut()?),
        BuiltinAdvice::Retry => {
            let marker = entry.marker.as_deref().map(TypeName::new);
            builtin_aspects::retry(
                &name,
                entry.pointcut.as_deref(),
                entry.max_attempts,
                marker.as_ref(),
            )?
        }
    };
    Ok(definition)
}

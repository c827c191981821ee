//! Filesystem-based type catalog loader.
//!
//! Reads `*.toml` manifests describing the types and methods that pointcuts
//! are matched against.
//!
//! # Manifest format
//!
//! ```toml
//! [[types]]
//! name          = "hello.aop.order.OrderServiceImpl"
//! kind          = "concrete"          # concrete | contract | marker | primitive
//! supertypes    = ["hello.aop.order.OrderService"]
//! final         = false               # optional
//! instantiation = "free"              # free | constructor-only
//! markers       = [{ kind = "hello.aop.exam.annotation.Trace" }]
//!
//! [[types.methods]]
//! name       = "orderItem"
//! params     = ["String"]
//! returns    = "String"               # default "void"
//! throws     = ["IllegalStateException"]
//! visibility = "public"               # public | protected | package | private
//! final      = false
//! markers    = [{ kind = "hello.aop.exam.annotation.Retry", value = 4 }]
//! ```
//!
//! A file that cannot be read or describes an invalid type is skipped with a
//! `WARN` log; the other files still load.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use weft_core::{
    application::ports::CatalogSource,
    domain::{
        Instantiation, Marker, Signature, TypeCatalog, TypeDescriptor, TypeKind, Value, Visibility,
    },
    error::WeftResult,
};

use crate::manifest::{self, ManifestError};

// ── Manifest types ────────────────────────────────────────────────────────────

/// Deserialised representation of one catalog manifest file.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogManifest {
    #[serde(default)]
    pub types: Vec<TypeEntry>,
}

/// One `[[types]]` table.
#[derive(Debug, Deserialize, Clone)]
pub struct TypeEntry {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKind,
    #[serde(default)]
    pub supertypes: Vec<String>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub instantiation: Instantiation,
    #[serde(default)]
    pub markers: Vec<MarkerEntry>,
    #[serde(default)]
    pub methods: Vec<MethodEntry>,
}

/// One `[[types.methods]]` table.
#[derive(Debug, Deserialize, Clone)]
pub struct MethodEntry {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    pub returns: Option<String>,
    #[serde(default)]
    pub throws: Vec<String>,
    pub visibility: Option<String>,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub markers: Vec<MarkerEntry>,
}

/// An inline marker: `{ kind = "a.Retry", value = 4 }`.
#[derive(Debug, Deserialize, Clone)]
pub struct MarkerEntry {
    pub kind: String,
    pub value: Option<toml::Value>,
}

// ── Loader ────────────────────────────────────────────────────────────────────

/// Loads [`TypeDescriptor`]s from one or more manifest roots.
///
/// # Example
///
/// ```no_run
/// use weft_adapters::FilesystemCatalogLoader;
///
/// let loader = FilesystemCatalogLoader::new("./catalog");
/// let catalog = loader.build_catalog(true)?;
/// println!("{} types", catalog.len());
/// # Ok::<(), weft_core::error::WeftError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemCatalogLoader {
    roots: Vec<PathBuf>,
}

impl FilesystemCatalogLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
        }
    }

    /// A loader over several roots, read in the given order.
    pub fn with_roots(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Load every readable manifest under the roots.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::NotFound`] if a root does not exist, or
    /// [`ManifestError::Walk`] if a directory cannot be listed. Individual
    /// files that fail are skipped with a warning.
    #[instrument(skip(self), fields(roots = self.roots.len()))]
    pub fn load_all(&self) -> Result<Vec<TypeDescriptor>, ManifestError> {
        let mut descriptors = Vec::new();
        for root in &self.roots {
            for path in manifest::discover(root)? {
                match load_file(&path) {
                    Ok(mut loaded) => {
                        debug!(file = %path.display(), count = loaded.len(), "Catalog manifest loaded");
                        descriptors.append(&mut loaded);
                    }
                    Err(e) => {
                        // One bad file must not block the rest.
                        warn!(file = %path.display(), error = %e, "Skipping catalog manifest");
                    }
                }
            }
        }
        Ok(descriptors)
    }

    /// A validated catalog of everything under the roots, on top of the
    /// builtin types when `include_builtins` is set.
    pub fn build_catalog(&self, include_builtins: bool) -> WeftResult<TypeCatalog> {
        let mut catalog = if include_builtins {
            TypeCatalog::with_builtins()
        } else {
            TypeCatalog::new()
        };
        catalog.register_all(self.load()?)?;
        catalog.validate()?;
        info!(types = catalog.len(), "Type catalog ready");
        Ok(catalog)
    }
}

impl CatalogSource for FilesystemCatalogLoader {
    fn load(&self) -> WeftResult<Vec<TypeDescriptor>> {
        Ok(self.load_all()?)
    }
}

fn load_file(path: &Path) -> Result<Vec<TypeDescriptor>, ManifestError> {
    let manifest: CatalogManifest = manifest::read(path)?;
    manifest
        .types
        .into_iter()
        .map(|entry| {
            let name = entry.name.clone();
            to_descriptor(entry).map_err(|message| ManifestError::Invalid {
                path: path.to_path_buf(),
                message: format!("type '{name}': {message}"),
            })
        })
        .collect()
}

fn to_descriptor(entry: TypeEntry) -> Result<TypeDescriptor, String> {
    let mut builder = TypeDescriptor::builder(entry.name.as_str())
        .kind(entry.kind)
        .final_type(entry.is_final)
        .instantiation(entry.instantiation);
    for supertype in entry.supertypes {
        builder = builder.supertype(supertype);
    }
    for marker in entry.markers {
        builder = builder.marker(to_marker(marker)?);
    }
    for method in entry.methods {
        let mut sig = Signature::builder(method.name)
            .params(method.params)
            .final_method(method.is_final);
        if let Some(returns) = method.returns {
            sig = sig.returns(returns);
        }
        for throws in method.throws {
            sig = sig.throws(throws);
        }
        if let Some(visibility) = method.visibility {
            let visibility: Visibility = visibility.parse().map_err(|e| format!("{e}"))?;
            sig = sig.visibility(visibility);
        }
        for marker in method.markers {
            sig = sig.marker(to_marker(marker)?);
        }
        builder = builder.method(sig);
    }
    builder.build().map_err(|e| e.to_string())
}

fn to_marker(entry: MarkerEntry) -> Result<Marker, String> {
    match entry.value {
        None => Ok(Marker::new(entry.kind)),
        Some(raw) => Ok(Marker::with_value(entry.kind, to_value(raw)?)),
    }
}

/// Marker values are scalars or arrays of scalars.
fn to_value(raw: toml::Value) -> Result<Value, String> {
    match raw {
        toml::Value::String(s) => Ok(Value::Str(s)),
        toml::Value::Integer(i) => Ok(Value::Int(i)),
        toml::Value::Float(f) => Ok(Value::Float(f)),
        toml::Value::Boolean(b) => Ok(Value::Bool(b)),
        toml::Value::Array(items) => items
            .into_iter()
            .map(to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Err(format!("unsupported marker value: {other}")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

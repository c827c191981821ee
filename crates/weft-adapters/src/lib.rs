//! Infrastructure adapters for Weft.
//!
//! This crate implements the ports defined in `weft-core::application::ports`.
//! It contains all file I/O and the stock aspects.

pub mod aspect_loader;
pub mod builtin_aspects;
pub mod catalog_loader;
pub mod manifest;
pub mod target;

// Re-export commonly used adapters
pub use aspect_loader::FilesystemAspectLoader;
pub use builtin_aspects::{BuiltinAdvice, Journal};
pub use catalog_loader::FilesystemCatalogLoader;
pub use manifest::ManifestError;
pub use target::FnTarget;

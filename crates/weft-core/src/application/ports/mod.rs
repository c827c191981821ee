//! Application ports (traits) for collaborators outside the core.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: called by the core, implemented elsewhere
//!   - `Target`: the real object a proxy wraps
//!   - `CatalogSource`: type descriptors for the catalog
//!   - `AspectSource`: declarative aspect definitions
//!
//! - **Driving (Input) Ports**: the `Weaver` and `ProxyHandle` services
//!   themselves; the CLI calls them directly.

pub mod output;

pub use output::{AspectSource, CatalogSource, Target};

#[cfg(test)]
pub use output::MockTarget;

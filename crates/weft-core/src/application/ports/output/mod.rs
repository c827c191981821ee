//! Driven (output) ports - implemented outside the core.
//!
//! The `weft-adapters` crate provides implementations.

use crate::application::services::Weaver;
use crate::domain::{AspectId, Fault, Signature, TypeDescriptor, TypeName, Value};
use crate::error::WeftResult;

/// The real object behind a proxy.
///
/// Implemented by:
/// - `weft_adapters::target::FnTarget` (closure per method)
/// - any user type that dispatches on `method.name()`
///
/// `invoke` is the target's own method body. Calls it makes to other methods
/// of the same object go straight to those bodies and are never intercepted;
/// see [`crate::application::ProxySlot`] for routing them through the proxy.
#[cfg_attr(test, mockall::automock)]
pub trait Target: Send + Sync {
    /// Concrete runtime type of this object.
    fn type_name(&self) -> &TypeName;

    /// Execute `method` with `args`. `method` is always declared on (or
    /// inherited by) [`Target::type_name`].
    fn invoke(&self, method: &Signature, args: &[Value]) -> Result<Value, Fault>;
}

/// Port for loading type descriptors into a catalog.
///
/// Implemented by:
/// - `weft_adapters::catalog_loader::FilesystemCatalogLoader`
pub trait CatalogSource: Send + Sync {
    /// Every descriptor this source knows about. Sources skip entries they
    /// cannot read rather than failing the whole load.
    fn load(&self) -> WeftResult<Vec<TypeDescriptor>>;
}

/// Port for declaring aspects on a weaver.
///
/// Implemented by:
/// - `weft_adapters::aspect_loader::FilesystemAspectLoader`
pub trait AspectSource: Send + Sync {
    /// Define named pointcuts and register aspects; returns the new aspects.
    fn install(&self, weaver: &Weaver) -> WeftResult<Vec<AspectId>>;
}

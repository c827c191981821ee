pub mod catalog;
pub mod fault;
pub mod signature;
pub mod type_descriptor;

pub use catalog::TypeCatalog;
pub use fault::Fault;
pub use signature::{Signature, SignatureBuilder};
pub use type_descriptor::{Instantiation, TypeDescriptor, TypeDescriptorBuilder, TypeKind};

//! Target implementations backed by closures.

mod fn_target;

pub use fn_target::FnTarget;

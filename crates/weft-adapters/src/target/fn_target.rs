use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;

use weft_core::{
    application::ports::Target,
    domain::{Fault, Signature, TypeName, Value},
};

type MethodBody = Arc<dyn Fn(&[Value]) -> Result<Value, Fault> + Send + Sync>;

/// A [`Target`] whose methods are closures keyed by method name.
///
/// Overloads share a body; dispatch is on the name only. Calling a method
/// with no body raises `UnsupportedOperationException`.
///
/// ```
/// use weft_adapters::FnTarget;
/// use weft_core::domain::Value;
///
/// let target = FnTarget::new("hello.aop.order.OrderRepository")
///     .method("save", |args| match args.first().and_then(Value::as_str) {
///         Some("ex") => Err(weft_core::domain::Fault::illegal_state("boom")),
///         _ => Ok(Value::str("ok")),
///     });
/// assert!(target.has_method("save"));
/// ```
#[derive(Clone)]
pub struct FnTarget {
    type_name: TypeName,
    methods: HashMap<String, MethodBody>,
}

impl FnTarget {
    pub fn new(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            methods: HashMap::new(),
        }
    }

    /// Set the body of `name`, replacing any earlier one.
    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Fault> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(body));
        self
    }

    /// A body that returns `value` regardless of arguments.
    pub fn returning(self, name: impl Into<String>, value: Value) -> Self {
        self.method(name, move |_| Ok(value.clone()))
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }
}

impl Target for FnTarget {
    fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    fn invoke(&self, method: &Signature, args: &[Value]) -> Result<Value, Fault> {
        trace!(target_type = %self.type_name, method = method.name(), "Invoking target body");
        match self.methods.get(method.name()) {
            Some(body) => body(args),
            None => Err(Fault::new(
                "UnsupportedOperationException",
                format!("{} has no body for {}", self.type_name.simple_name(), method.name()),
            )),
        }
    }
}

impl fmt::Debug for FnTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("FnTarget")
            .field("type_name", &self.type_name)
            .field("methods", &names)
            .finish()
    }
}

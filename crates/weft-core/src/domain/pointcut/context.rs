//! What a pointcut is evaluated against beyond the static signature, and what
//! evaluation produces.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::domain::{
    entities::{TypeCatalog, catalog::OBJECT},
    value_objects::{Marker, ProxyMode, TypeName, Value},
};

// ── Verdict ───────────────────────────────────────────────────────────────────

/// Three-valued match outcome.
///
/// `Dynamic` means the answer depends on information not supplied yet
/// (argument values, proxy shape or target type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Always,
    Dynamic,
    Never,
}

impl Verdict {
    pub const fn from_bool(matched: bool) -> Self {
        if matched { Self::Always } else { Self::Never }
    }

    pub const fn is_never(self) -> bool {
        matches!(self, Self::Never)
    }

    pub const fn negate(self) -> Self {
        match self {
            Self::Always => Self::Never,
            Self::Never => Self::Always,
            Self::Dynamic => Self::Dynamic,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Always => "always",
            Self::Dynamic => "dynamic",
            Self::Never => "never",
        })
    }
}

// ── ProxyShape ────────────────────────────────────────────────────────────────

/// The externally visible type of a proxy, which `this(..)` tests against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyShape {
    mode: ProxyMode,
    concrete: TypeName,
    contracts: Vec<TypeName>,
}

impl ProxyShape {
    pub fn new(mode: ProxyMode, concrete: TypeName, contracts: Vec<TypeName>) -> Self {
        Self {
            mode,
            concrete,
            contracts,
        }
    }

    pub const fn mode(&self) -> ProxyMode {
        self.mode
    }

    /// The wrapped implementation type.
    pub fn concrete(&self) -> &TypeName {
        &self.concrete
    }

    pub fn contracts(&self) -> &[TypeName] {
        &self.contracts
    }

    /// `true` if callers may treat the proxy as an instance of `ty`.
    ///
    /// Interface-mode proxies are instances of their contracts only; subclass
    /// proxies are also instances of the concrete type and its supertypes.
    pub fn is_instance_of(&self, catalog: &TypeCatalog, ty: &TypeName) -> bool {
        let via_contract = self
            .contracts
            .iter()
            .any(|c| catalog.is_assignable(c, ty));
        match self.mode {
            ProxyMode::Interface => via_contract || ty.as_str() == OBJECT,
            ProxyMode::Subclass => via_contract || catalog.is_assignable(&self.concrete, ty),
        }
    }

    /// Runtime class name of the proxy, e.g. `a.OrderService$$WeftProxy`.
    pub fn display_name(&self) -> String {
        match self.mode {
            ProxyMode::Subclass => format!("{}$$WeftProxy", self.concrete),
            ProxyMode::Interface => {
                let names: Vec<&str> = self.contracts.iter().map(TypeName::simple_name).collect();
                format!("$Proxy[{}]", names.join(", "))
            }
        }
    }
}

// ── RuntimeContext ────────────────────────────────────────────────────────────

/// Dynamic join point information. Every part is optional; missing parts turn
/// the predicates that need them into [`Verdict::Dynamic`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeContext<'a> {
    pub proxy: Option<&'a ProxyShape>,
    pub target: Option<&'a TypeName>,
    pub args: Option<&'a [Value]>,
}

impl<'a> RuntimeContext<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proxy(mut self, proxy: &'a ProxyShape) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_target(mut self, target: &'a TypeName) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_args(mut self, args: &'a [Value]) -> Self {
        self.args = Some(args);
        self
    }
}

// ── Bindings ──────────────────────────────────────────────────────────────────

/// A value captured by a pointcut for an advice body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Binding {
    /// From `args(..)`.
    Value(Value),
    /// From `@annotation(..)`, `@within(..)` or `@target(..)`.
    Marker(Marker),
    /// From `this(..)`: the proxy the call came through, by runtime class
    /// name. The join point resolves it to the handle itself.
    This(TypeName),
    /// From `target(..)`: the wrapped object, by runtime type.
    Target(TypeName),
}

/// Capture name to bound value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bindings(BTreeMap<String, Binding>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: impl Into<String>, binding: Binding) {
        self.0.insert(name.into(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.0.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.0.get(name) {
            Some(Binding::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn marker(&self, name: &str) -> Option<&Marker> {
        match self.0.get(name) {
            Some(Binding::Marker(m)) => Some(m),
            _ => None,
        }
    }

    /// Runtime type of the object bound by `this(name)` or `target(name)`.
    pub fn reference(&self, name: &str) -> Option<&TypeName> {
        match self.0.get(name) {
            Some(Binding::This(t) | Binding::Target(t)) => Some(t),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

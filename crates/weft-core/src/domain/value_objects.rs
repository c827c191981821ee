//! Domain value objects: type names, visibility, phases, proxy modes, runtime
//! values and markers.
//!
//! # Design
//!
//! These are plain value types with equality by value and no identity of their
//! own. Anything that needs the type hierarchy (assignability, inherited
//! methods) goes through [`crate::domain::TypeCatalog`] instead.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

// ── TypeName ──────────────────────────────────────────────────────────────────

/// A fully qualified type name such as `hello.aop.member.MemberService`.
///
/// Built-in types (`String`, `Object`, `int`, ...) live in the root namespace
/// and have a single segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment: `MemberService` for `hello.aop.member.MemberService`.
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }

    /// Dot-separated path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TypeName {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&TypeName> for TypeName {
    fn from(value: &TypeName) -> Self {
        value.clone()
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for TypeName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TypeName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

// ── Visibility ────────────────────────────────────────────────────────────────

/// Access level of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Package,
    Private,
}

impl Visibility {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Package => "package",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "protected" => Ok(Self::Protected),
            "package" | "default" => Ok(Self::Package),
            "private" => Ok(Self::Private),
            other => Err(DomainError::InvalidSignature(format!(
                "unknown visibility: {other}"
            ))),
        }
    }
}

// ── Phase ─────────────────────────────────────────────────────────────────────

/// When an advice runs relative to the real call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Around,
    Before,
    After,
    AfterReturning,
    AfterThrowing,
}

impl Phase {
    /// Ordering inside one aspect: lower runs first.
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Around => 0,
            Self::Before => 1,
            Self::After => 2,
            Self::AfterReturning => 3,
            Self::AfterThrowing => 4,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Around => "around",
            Self::Before => "before",
            Self::After => "after",
            Self::AfterReturning => "after-returning",
            Self::AfterThrowing => "after-throwing",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "around" => Ok(Self::Around),
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "after-returning" | "returning" => Ok(Self::AfterReturning),
            "after-throwing" | "throwing" => Ok(Self::AfterThrowing),
            other => Err(DomainError::InvalidSignature(format!("unknown phase: {other}"))),
        }
    }
}

// ── ProxyMode ─────────────────────────────────────────────────────────────────

/// How a proxy presents itself to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Only the listed contracts are visible; never castable to the concrete type.
    #[default]
    Interface,
    /// A specialization of the concrete type; castable to it and its contracts.
    Subclass,
}

impl ProxyMode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Interface => "interface",
            Self::Subclass => "subclass",
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interface" | "jdk" => Ok(Self::Interface),
            "subclass" | "cglib" => Ok(Self::Subclass),
            other => Err(DomainError::InvalidSignature(format!(
                "unknown proxy mode: {other}"
            ))),
        }
    }
}

// ── Identifiers ───────────────────────────────────────────────────────────────

/// Identifier handed out by the advice registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AdviceId(pub(crate) u64);

impl fmt::Display for AdviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "advice#{}", self.0)
    }
}

/// Identifier of a registered aspect group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AspectId(pub(crate) u64);

impl fmt::Display for AspectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aspect#{}", self.0)
    }
}

/// Identity of one proxy handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProxyId(Uuid);

impl ProxyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProxyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Value ─────────────────────────────────────────────────────────────────────

/// A runtime argument or return value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Unit,
    Bool(bool),
    Int(i64),
    Long(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Object(ObjectValue),
}

/// An instance of a catalog type, carried by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectValue {
    pub type_name: TypeName,
    pub fields: BTreeMap<String, Value>,
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    pub fn object(type_name: impl Into<TypeName>) -> Self {
        Self::Object(ObjectValue {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        })
    }

    /// Name of the catalog type this value is an instance of. `Null` has none.
    pub fn runtime_type(&self) -> Option<TypeName> {
        let name = match self {
            Self::Null => return None,
            Self::Unit => "void",
            Self::Bool(_) => "Boolean",
            Self::Int(_) => "Integer",
            Self::Long(_) => "Long",
            Self::Float(_) => "Double",
            Self::Str(_) => "String",
            Self::List(_) => "List",
            Self::Object(o) => return Some(o.type_name.clone()),
        };
        Some(TypeName::new(name))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) | Self::Long(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Unit => f.write_str("()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Long(i) => write!(f, "{i}L"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(o) => {
                write!(f, "{}{{", o.type_name.simple_name())?;
                for (i, (k, v)) in o.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

// ── Marker ────────────────────────────────────────────────────────────────────

/// An annotation-like tag attached to a method or a type.
///
/// `kind` names a marker type in the catalog, so marker patterns can match by
/// assignability. The optional `value` is the single named slot that
/// `@annotation(capture)` style bindings hand to advice bodies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub kind: TypeName,
    pub value: Option<Value>,
}

impl Marker {
    pub fn new(kind: impl Into<TypeName>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
        }
    }

    pub fn with_value(kind: impl Into<TypeName>, value: impl Into<Value>) -> Self {
        Self {
            kind: kind.into(),
            value: Some(value.into()),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.kind.simple_name())?;
        if let Some(v) = &self.value {
            write!(f, "({v})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_name_simple_name() {
        let t = TypeName::new("hello.aop.member.MemberService");
        assert_eq!(t.simple_name(), "MemberService");
        assert_eq!(TypeName::new("String").simple_name(), "String");
        assert_eq!(t.segments().count(), 4);
    }

    #[test]
    fn phase_precedence_follows_declared_order() {
        let phases = [
            Phase::Around,
            Phase::Before,
            Phase::After,
            Phase::AfterReturning,
            Phase::AfterThrowing,
        ];
        assert!(phases.windows(2).all(|w| w[0].precedence() < w[1].precedence()));
    }

    #[test]
    fn phase_parses_aliases() {
        assert_eq!("after_returning".parse::<Phase>().unwrap(), Phase::AfterReturning);
        assert_eq!("THROWING".parse::<Phase>().unwrap(), Phase::AfterThrowing);
        assert!("during".parse::<Phase>().is_err());
    }

    #[test]
    fn proxy_mode_parses() {
        assert_eq!("cglib".parse::<ProxyMode>().unwrap(), ProxyMode::Subclass);
        assert_eq!("Interface".parse::<ProxyMode>().unwrap(), ProxyMode::Interface);
    }

    #[test]
    fn value_runtime_types() {
        assert_eq!(Value::str("a").runtime_type().unwrap().as_str(), "String");
        assert_eq!(Value::Int(1).runtime_type().unwrap().as_str(), "Integer");
        assert_eq!(Value::Long(1).runtime_type().unwrap().as_str(), "Long");
        assert!(Value::Null.runtime_type().is_none());
        assert_eq!(
            Value::object("shop.Order").runtime_type().unwrap().as_str(),
            "shop.Order"
        );
    }

    #[test]
    fn value_display_is_unquoted() {
        let v = Value::List(vec![Value::str("a"), Value::Int(2)]);
        assert_eq!(v.to_string(), "[a, 2]");
    }

    #[test]
    fn marker_display() {
        let m = Marker::with_value("app.Retry", 4i64);
        assert_eq!(m.to_string(), "@Retry(4)");
    }
}

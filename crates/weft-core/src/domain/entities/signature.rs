//! The `Signature` entity: a static description of one callable member.
//!
//! Signatures are built once per declared method (normally through
//! [`crate::domain::TypeDescriptor::builder`]) and then shared read-only as
//! `Arc<Signature>` by matchers, chains and proxies.
//!
//! Identity is `(declaring type, name, parameter types)`: a type cannot declare
//! two members with the same name and parameter list, so that triple is what
//! `Eq`/`Hash` use. Return type, markers and the rest are descriptive.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::domain::{
    error::DomainError,
    value_objects::{Marker, TypeName, Visibility},
};

/// Static description of a method.
#[derive(Debug, Clone)]
pub struct Signature {
    declaring_type: TypeName,
    name: String,
    parameter_types: Vec<TypeName>,
    return_type: TypeName,
    exceptions: Vec<TypeName>,
    visibility: Visibility,
    markers: Vec<Marker>,
    is_final: bool,
}

impl Signature {
    /// Start building a signature for a method called `name`.
    pub fn builder(name: impl Into<String>) -> SignatureBuilder {
        SignatureBuilder::new(name)
    }

    pub fn declaring_type(&self) -> &TypeName {
        &self.declaring_type
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn parameter_types(&self) -> &[TypeName] {
        &self.parameter_types
    }
    pub fn return_type(&self) -> &TypeName {
        &self.return_type
    }
    pub fn exceptions(&self) -> &[TypeName] {
        &self.exceptions
    }
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
    pub const fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Same name and parameter list, regardless of declaring type.
    ///
    /// This is the override relation: a subtype method with the same shape
    /// replaces the supertype one.
    pub fn same_shape(&self, other: &Signature) -> bool {
        self.name == other.name && self.parameter_types == other.parameter_types
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.declaring_type == other.declaring_type && self.same_shape(other)
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.declaring_type.hash(state);
        self.name.hash(state);
        self.parameter_types.hash(state);
    }
}

/// `String hello.aop.member.MemberServiceImpl.hello(String)`
impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}.{}(",
            self.return_type.simple_name(),
            self.declaring_type,
            self.name
        )?;
        for (i, p) in self.parameter_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(p.simple_name())?;
        }
        f.write_str(")")
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Builder for [`Signature`].
///
/// The declaring type may be left unset when the builder is handed to
/// [`crate::domain::TypeDescriptorBuilder::method`], which fills it in.
#[derive(Debug, Clone)]
pub struct SignatureBuilder {
    declaring_type: Option<TypeName>,
    name: String,
    parameter_types: Vec<TypeName>,
    return_type: TypeName,
    exceptions: Vec<TypeName>,
    visibility: Visibility,
    markers: Vec<Marker>,
    is_final: bool,
}

impl SignatureBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            declaring_type: None,
            name: name.into(),
            parameter_types: Vec::new(),
            return_type: TypeName::new("void"),
            exceptions: Vec::new(),
            visibility: Visibility::Public,
            markers: Vec::new(),
            is_final: false,
        }
    }

    pub fn declared_by(mut self, ty: impl Into<TypeName>) -> Self {
        self.declaring_type = Some(ty.into());
        self
    }

    pub fn param(mut self, ty: impl Into<TypeName>) -> Self {
        self.parameter_types.push(ty.into());
        self
    }

    pub fn params<I, T>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TypeName>,
    {
        self.parameter_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn returns(mut self, ty: impl Into<TypeName>) -> Self {
        self.return_type = ty.into();
        self
    }

    pub fn throws(mut self, ty: impl Into<TypeName>) -> Self {
        self.exceptions.push(ty.into());
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn final_method(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub(crate) fn declaring_type_or(mut self, ty: &TypeName) -> Self {
        if self.declaring_type.is_none() {
            self.declaring_type = Some(ty.clone());
        }
        self
    }

    pub fn build(self) -> Result<Signature, DomainError> {
        let declaring_type = self.declaring_type.ok_or_else(|| {
            DomainError::InvalidSignature(format!("method '{}' has no declaring type", self.name))
        })?;

        if !is_identifier(&self.name) {
            return Err(DomainError::InvalidSignature(format!(
                "'{}' is not a valid method name",
                self.name
            )));
        }

        Ok(Signature {
            declaring_type,
            name: self.name,
            parameter_types: self.parameter_types,
            return_type: self.return_type,
            exceptions: self.exceptions,
            visibility: self.visibility,
            markers: self.markers,
            is_final: self.is_final,
        })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

//! `TypeDescriptor`: everything the engine knows about one type.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::signature::{Signature, SignatureBuilder},
    error::DomainError,
    value_objects::{Marker, TypeName},
};

/// What sort of type a descriptor describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// An instantiable implementation type.
    #[default]
    Concrete,
    /// An abstract contract (interface); interface-mode proxies expose these.
    Contract,
    /// A marker (annotation) type.
    Marker,
    /// A primitive such as `int`; never assignable to `Object`.
    Primitive,
}

/// How instances of a concrete type can be created.
///
/// Subclass-mode proxies synthesize an instance without running the type's
/// declared constructors; `ConstructorOnly` types forbid that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instantiation {
    #[default]
    Free,
    ConstructorOnly,
}

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: TypeName,
    kind: TypeKind,
    supertypes: Vec<TypeName>,
    markers: Vec<Marker>,
    methods: Vec<Arc<Signature>>,
    is_final: bool,
    instantiation: Instantiation,
}

impl TypeDescriptor {
    pub fn builder(name: impl Into<TypeName>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name.into())
    }

    pub fn concrete(name: impl Into<TypeName>) -> TypeDescriptorBuilder {
        Self::builder(name).kind(TypeKind::Concrete)
    }

    pub fn contract(name: impl Into<TypeName>) -> TypeDescriptorBuilder {
        Self::builder(name).kind(TypeKind::Contract)
    }

    pub fn marker(name: impl Into<TypeName>) -> TypeDescriptorBuilder {
        Self::builder(name).kind(TypeKind::Marker)
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }
    pub fn supertypes(&self) -> &[TypeName] {
        &self.supertypes
    }
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
    /// Methods declared directly on this type (not inherited ones).
    pub fn methods(&self) -> &[Arc<Signature>] {
        &self.methods
    }
    pub const fn is_final(&self) -> bool {
        self.is_final
    }
    pub const fn instantiation(&self) -> Instantiation {
        self.instantiation
    }

    pub fn method(&self, name: &str, params: &[TypeName]) -> Option<&Arc<Signature>> {
        self.methods
            .iter()
            .find(|m| m.name() == name && m.parameter_types() == params)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

pub struct TypeDescriptorBuilder {
    name: TypeName,
    kind: TypeKind,
    supertypes: Vec<TypeName>,
    markers: Vec<Marker>,
    methods: Vec<SignatureBuilder>,
    is_final: bool,
    instantiation: Instantiation,
}

impl TypeDescriptorBuilder {
    fn new(name: TypeName) -> Self {
        Self {
            name,
            kind: TypeKind::default(),
            supertypes: Vec::new(),
            markers: Vec::new(),
            methods: Vec::new(),
            is_final: false,
            instantiation: Instantiation::default(),
        }
    }

    pub fn kind(mut self, kind: TypeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn supertype(mut self, ty: impl Into<TypeName>) -> Self {
        self.supertypes.push(ty.into());
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Declare a method; its declaring type defaults to this type.
    pub fn method(mut self, method: SignatureBuilder) -> Self {
        self.methods.push(method);
        self
    }

    pub fn final_type(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    pub fn instantiation(mut self, instantiation: Instantiation) -> Self {
        self.instantiation = instantiation;
        self
    }

    pub fn build(self) -> Result<TypeDescriptor, DomainError> {
        let invalid = |reason: String| DomainError::InvalidTypeDescriptor {
            name: self.name.to_string(),
            reason,
        };

        if self.name.as_str().is_empty() || self.name.segments().any(str::is_empty) {
            return Err(invalid("type name has an empty segment".into()));
        }
        if self.supertypes.contains(&self.name) {
            return Err(invalid("a type cannot be its own supertype".into()));
        }
        if self.kind == TypeKind::Primitive && !self.supertypes.is_empty() {
            return Err(invalid("primitives have no supertypes".into()));
        }

        let mut methods: Vec<Arc<Signature>> = Vec::with_capacity(self.methods.len());
        for builder in self.methods {
            let sig = builder.declaring_type_or(&self.name).build()?;
            if sig.declaring_type() != &self.name {
                return Err(invalid(format!(
                    "method '{}' is declared by '{}'",
                    sig.name(),
                    sig.declaring_type()
                )));
            }
            if methods.iter().any(|m| m.same_shape(&sig)) {
                return Err(invalid(format!("method '{}' is declared twice", sig)));
            }
            methods.push(Arc::new(sig));
        }

        Ok(TypeDescriptor {
            name: self.name,
            kind: self.kind,
            supertypes: self.supertypes,
            markers: self.markers,
            methods,
            is_final: self.is_final,
            instantiation: self.instantiation,
        })
    }
}

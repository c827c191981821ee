//! The type catalog: the queryable stand-in for runtime reflection.
//!
//! Matchers never inspect live objects; every question about the type
//! hierarchy ("is `String` a `Serializable`?", "does `MemberService` declare
//! `hello(String)`?", "which markers does this type carry?") is answered here.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::domain::{
    entities::{
        signature::Signature,
        type_descriptor::{TypeDescriptor, TypeKind},
    },
    error::DomainError,
    value_objects::{Marker, TypeName, Value},
};

/// Name of the universal reference supertype.
pub const OBJECT: &str = "Object";

#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<TypeName, TypeDescriptor>,
}

impl TypeCatalog {
    /// An empty catalog. Most callers want [`TypeCatalog::with_builtins`].
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog preloaded with the language-level types every model needs.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        for descriptor in builtin_types() {
            // Builtin names are unique by construction.
            catalog
                .types
                .insert(descriptor.name().clone(), descriptor);
        }
        catalog
    }

    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), DomainError> {
        if self.types.contains_key(descriptor.name()) {
            return Err(DomainError::DuplicateType {
                name: descriptor.name().to_string(),
            });
        }
        self.types.insert(descriptor.name().clone(), descriptor);
        Ok(())
    }

    pub fn register_all(
        &mut self,
        descriptors: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Result<(), DomainError> {
        descriptors.into_iter().try_for_each(|d| self.register(d))
    }

    /// Check that every referenced supertype is known.
    pub fn validate(&self) -> Result<(), DomainError> {
        for descriptor in self.types.values() {
            if let Some(missing) = descriptor
                .supertypes()
                .iter()
                .find(|s| !self.types.contains_key(*s))
            {
                return Err(DomainError::UnknownType {
                    name: missing.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &TypeName) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        self.types.contains_key(name)
    }

    pub fn require(&self, name: &TypeName) -> Result<&TypeDescriptor, DomainError> {
        self.get(name).ok_or_else(|| DomainError::UnknownType {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All descriptors, sorted by name for stable output.
    pub fn types(&self) -> Vec<&TypeDescriptor> {
        let mut all: Vec<_> = self.types.values().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    fn is_primitive(&self, name: &TypeName) -> bool {
        self.get(name)
            .is_some_and(|d| d.kind() == TypeKind::Primitive)
    }

    /// Every transitive supertype of `name`, nearest first. Excludes `name`.
    pub fn ancestors(&self, name: &TypeName) -> Vec<TypeName> {
        let mut seen: HashSet<TypeName> = HashSet::from([name.clone()]);
        let mut order = Vec::new();
        let mut queue: VecDeque<TypeName> = VecDeque::from([name.clone()]);

        while let Some(current) = queue.pop_front() {
            let Some(descriptor) = self.get(&current) else {
                continue;
            };
            for parent in descriptor.supertypes() {
                if seen.insert(parent.clone()) {
                    order.push(parent.clone());
                    queue.push_back(parent.clone());
                }
            }
        }
        order
    }

    /// `true` if a value of type `from` can be used where `to` is expected.
    ///
    /// Reflexive; every non-primitive type is assignable to `Object`; otherwise
    /// follows declared supertypes transitively. No boxing.
    pub fn is_assignable(&self, from: &TypeName, to: &TypeName) -> bool {
        if from == to {
            return true;
        }
        if to.as_str() == OBJECT {
            return !self.is_primitive(from);
        }
        self.ancestors(from).contains(to)
    }

    /// [`TypeCatalog::is_assignable`], also letting a primitive stand for its
    /// boxed form (`int` for `Integer`).
    pub fn is_assignable_boxing(&self, from: &TypeName, to: &TypeName) -> bool {
        self.is_assignable(from, to)
            || boxed(from.as_str()).is_some_and(|b| self.is_assignable(&TypeName::new(b), to))
    }

    /// Declared plus inherited methods of `name`. Subtype declarations override
    /// supertype ones with the same shape.
    pub fn methods_of(&self, name: &TypeName) -> Vec<Arc<Signature>> {
        let mut methods: Vec<Arc<Signature>> = Vec::new();
        let lineage = std::iter::once(name.clone()).chain(self.ancestors(name));

        for ty in lineage {
            let Some(descriptor) = self.get(&ty) else {
                continue;
            };
            for m in descriptor.methods() {
                if !methods.iter().any(|known| known.same_shape(m)) {
                    methods.push(Arc::clone(m));
                }
            }
        }
        methods
    }

    /// The method `name(params)` as seen on `ty`, inherited or declared.
    pub fn find_method(
        &self,
        ty: &TypeName,
        name: &str,
        params: &[TypeName],
    ) -> Option<Arc<Signature>> {
        self.methods_of(ty)
            .into_iter()
            .find(|m| m.name() == name && m.parameter_types() == params)
    }

    /// Whether `ty` itself declares a member with the same shape as `method`.
    pub fn declares_method(&self, ty: &TypeName, method: &Signature) -> bool {
        self.get(ty)
            .is_some_and(|d| d.methods().iter().any(|m| m.same_shape(method)))
    }

    /// Markers declared directly on a type.
    pub fn markers_of(&self, ty: &TypeName) -> &[Marker] {
        self.get(ty).map(TypeDescriptor::markers).unwrap_or(&[])
    }

    /// `true` if `value` may be passed for a parameter declared as `param`.
    ///
    /// `null` fits any reference type; boxed values fit their primitive, and
    /// integral values widen to `long` and `double`.
    pub fn accepts(&self, param: &TypeName, value: &Value) -> bool {
        match value.runtime_type() {
            Some(runtime) => self.conforms(&runtime, param),
            None => !self.is_primitive(param),
        }
    }

    /// `true` if a value whose runtime type is `runtime` satisfies `declared`:
    /// plain assignability, or unboxing into a primitive.
    pub fn conforms(&self, runtime: &TypeName, declared: &TypeName) -> bool {
        self.is_assignable(runtime, declared) || unboxes(runtime.as_str(), declared.as_str())
    }

    /// Runtime type of `value` once it sits in a slot declared as `declared`.
    ///
    /// A primitive slot boxes to its wrapper, so `3` passed for a `long`
    /// parameter is a `Long`. Reference slots keep the value's own type.
    pub fn runtime_type_in(&self, declared: &TypeName, value: &Value) -> Option<TypeName> {
        let runtime = value.runtime_type()?;
        match boxed(declared.as_str()) {
            Some(wrapper) if self.conforms(&runtime, declared) => Some(TypeName::new(wrapper)),
            _ => Some(runtime),
        }
    }
}

fn boxed(primitive: &str) -> Option<&'static str> {
    match primitive {
        "int" => Some("Integer"),
        "long" => Some("Long"),
        "double" => Some("Double"),
        "boolean" => Some("Boolean"),
        _ => None,
    }
}

/// Wrapper types a primitive slot takes values of, widening included.
fn unboxes(runtime: &str, primitive: &str) -> bool {
    matches!(
        (primitive, runtime),
        ("int", "Integer")
            | ("long", "Integer" | "Long")
            | ("double", "Integer" | "Long" | "Double")
            | ("boolean", "Boolean")
    )
}

fn builtin_types() -> Vec<TypeDescriptor> {
    fn reference(name: &str, kind: TypeKind, supertypes: &[&str], is_final: bool) -> TypeDescriptor {
        supertypes
            .iter()
            .fold(TypeDescriptor::builder(name).kind(kind), |b, s| b.supertype(*s))
            .final_type(is_final)
            .build()
            .unwrap_or_else(|e| unreachable!("builtin type '{name}' is malformed: {e}"))
    }

    use TypeKind::{Concrete, Contract, Primitive};
    vec![
        reference(OBJECT, Concrete, &[], false),
        reference("Serializable", Contract, &[], false),
        reference("Comparable", Contract, &[], false),
        reference("CharSequence", Contract, &[], false),
        reference(
            "String",
            Concrete,
            &["Serializable", "Comparable", "CharSequence"],
            true,
        ),
        reference("Number", Concrete, &["Serializable"], false),
        reference("Integer", Concrete, &["Number", "Comparable"], true),
        reference("Long", Concrete, &["Number", "Comparable"], true),
        reference("Double", Concrete, &["Number", "Comparable"], true),
        reference("Boolean", Concrete, &["Serializable", "Comparable"], true),
        reference("List", Contract, &[], false),
        reference("void", Primitive, &[], true),
        reference("int", Primitive, &[], true),
        reference("long", Primitive, &[], true),
        reference("double", Primitive, &[], true),
        reference("boolean", Primitive, &[], true),
        reference("Throwable", Concrete, &["Serializable"], false),
        reference("Exception", Concrete, &["Throwable"], false),
        reference("RuntimeException", Concrete, &["Exception"], false),
        reference("IllegalStateException", Concrete, &["RuntimeException"], false),
        reference("IllegalArgumentException", Concrete, &["RuntimeException"], false),
        reference(
            "UnsupportedOperationException",
            Concrete,
            &["RuntimeException"],
            false,
        ),
    ]
}

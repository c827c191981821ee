//! The proxy layer: handles that route calls through interceptor chains.
//!
//! A [`ProxyHandle`] wraps one target object. Calls made through the handle
//! run the chain for the called method; the real call at the centre of the
//! chain goes straight to [`Target::invoke`], so anything the target does to
//! itself from there is not intercepted. A target that needs its internal
//! calls advised can hold a [`ProxySlot`] and call through it instead.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use tracing::{debug, info, trace};

use crate::application::{
    error::{ApplicationError, InvocationError, InvocationResult},
    ports::Target,
    services::{
        chain::{Call, Chain},
        weaver::Weaver,
    },
};
use crate::domain::{
    Instantiation, ProxyId, ProxyMode, ProxyShape, Signature, TypeCatalog, TypeKind, TypeName,
    Value, Visibility,
};
use crate::error::WeftResult;

/// A method callable through a handle.
#[derive(Debug, Clone)]
struct Exposed {
    /// As the caller sees it (the contract's declaration in interface mode).
    visible: Arc<Signature>,
    /// What the target executes; also the join point signature.
    implementation: Arc<Signature>,
    /// Final methods on subclass proxies cannot be overridden and skip advice.
    intercept: bool,
}

struct ProxyInner {
    id: ProxyId,
    shape: ProxyShape,
    weaver: Weaver,
    target: RwLock<Arc<dyn Target>>,
    exposed: Vec<Exposed>,
    chains: RwLock<HashMap<Arc<Signature>, Arc<Chain>>>,
}

/// An interception wrapper around one target. Cheap to clone; clones share
/// the target and the chain cache.
#[derive(Clone)]
pub struct ProxyHandle {
    inner: Arc<ProxyInner>,
}

impl ProxyHandle {
    pub(crate) fn build(
        weaver: Weaver,
        target: Arc<dyn Target>,
        mode: ProxyMode,
        visible: &[TypeName],
    ) -> WeftResult<Self> {
        let catalog = weaver.catalog();
        let concrete = target.type_name().clone();
        catalog.require(&concrete)?;

        let (contracts, exposed) = match mode {
            ProxyMode::Interface => interface_layout(catalog, &concrete, visible)?,
            ProxyMode::Subclass => subclass_layout(catalog, &concrete, visible)?,
        };

        let inner = ProxyInner {
            id: ProxyId::new(),
            shape: ProxyShape::new(mode, concrete, contracts),
            weaver,
            target: RwLock::new(target),
            exposed,
            chains: RwLock::new(HashMap::new()),
        };
        info!(
            proxy = %inner.id,
            mode = %mode,
            class = %inner.shape.display_name(),
            methods = inner.exposed.len(),
            "Proxy created"
        );
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn id(&self) -> ProxyId {
        self.inner.id
    }

    pub fn shape(&self) -> &ProxyShape {
        &self.inner.shape
    }

    pub fn mode(&self) -> ProxyMode {
        self.inner.shape.mode()
    }

    /// Methods callable through this handle, as callers see them.
    pub fn methods(&self) -> impl Iterator<Item = &Arc<Signature>> {
        self.inner.exposed.iter().map(|e| &e.visible)
    }

    /// `true` if the handle may be treated as an instance of `ty`.
    pub fn is_instance_of(&self, ty: &TypeName) -> bool {
        self.inner
            .shape
            .is_instance_of(self.inner.weaver.catalog(), ty)
    }

    /// Treat the handle as `ty`. Interface-mode proxies cannot become their
    /// concrete type.
    pub fn cast(&self, ty: impl Into<TypeName>) -> Result<ProxyView, ApplicationError> {
        let ty = ty.into();
        if !self.is_instance_of(&ty) {
            return Err(ApplicationError::ProxyCast {
                proxy: self.inner.shape.display_name(),
                requested: ty.to_string(),
            });
        }
        Ok(ProxyView {
            handle: self.clone(),
            as_type: ty,
        })
    }

    /// Call `method` by name. Overloads are picked by argument count and by
    /// whether each value fits the parameter type.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> InvocationResult<Value> {
        let exposed = self.select(method, &args)?;
        self.dispatch(exposed, args)
    }

    fn dispatch(&self, exposed: &Exposed, args: Vec<Value>) -> InvocationResult<Value> {
        let target = self.target();
        let implementation = &exposed.implementation;

        if !exposed.intercept {
            trace!(proxy = %self.inner.id, method = %implementation, "Final method, calling target directly");
            return target
                .invoke(implementation, &args)
                .map_err(|fault| InvocationError::TargetInvocation {
                    method: implementation.to_string(),
                    fault,
                });
        }

        let chain = self.chain(implementation);
        let call = Call {
            catalog: self.inner.weaver.catalog(),
            handle: self,
            target: target.as_ref(),
        };
        chain.execute(&call, args)
    }

    /// Swap the wrapped object for another of the same concrete type. Cached
    /// chains for this handle are dropped.
    pub fn replace_target(&self, target: Arc<dyn Target>) -> Result<(), ApplicationError> {
        let expected = self.inner.shape.concrete();
        if target.type_name() != expected {
            return Err(ApplicationError::TargetMismatch {
                expected: expected.to_string(),
                found: target.type_name().to_string(),
            });
        }
        *self
            .inner
            .target
            .write()
            .unwrap_or_else(PoisonError::into_inner) = target;
        self.inner
            .chains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!(proxy = %self.inner.id, "Target replaced, chain cache cleared");
        Ok(())
    }

    /// The chain for `implementation`, built on first use and rebuilt when
    /// the registry has changed since. Concurrent builders race; the last
    /// insert wins and every racer gets a complete chain.
    pub fn chain(&self, implementation: &Arc<Signature>) -> Arc<Chain> {
        let version = self.inner.weaver.registry().version();
        {
            let chains = self
                .inner
                .chains
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(chain) = chains.get(implementation)
                && chain.version() == version
            {
                return Arc::clone(chain);
            }
        }

        let target_type = self.target().type_name().clone();
        let chain = Arc::new(self.inner.weaver.build_chain(
            implementation,
            &self.inner.shape,
            &target_type,
        ));
        self.inner
            .chains
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Arc::clone(implementation), Arc::clone(&chain));
        chain
    }

    /// Number of cached chains.
    pub fn cached_chains(&self) -> usize {
        self.inner
            .chains
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn target(&self) -> Arc<dyn Target> {
        Arc::clone(
            &self
                .inner
                .target
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn select(&self, method: &str, args: &[Value]) -> InvocationResult<&Exposed> {
        let catalog = self.inner.weaver.catalog();
        if let Some(exposed) = self
            .inner
            .exposed
            .iter()
            .find(|e| fits(catalog, &e.visible, method, args))
        {
            return Ok(exposed);
        }

        let concrete = self.inner.shape.concrete();
        match catalog
            .methods_of(concrete)
            .into_iter()
            .find(|m| fits(catalog, m, method, args))
        {
            Some(hidden) => Err(InvocationError::NotExposed {
                method: hidden.to_string(),
                proxy: self.inner.id,
            }),
            None => Err(InvocationError::NoSuchMethod {
                type_name: self.inner.shape.display_name(),
                method: format!("{method}/{}", args.len()),
            }),
        }
    }

    /// The exposed entry for a method of the same shape as `declared`.
    fn exposed_as(&self, declared: &Signature) -> Option<&Exposed> {
        self.inner
            .exposed
            .iter()
            .find(|e| e.visible.same_shape(declared))
    }
}

/// `true` if `sig` is `method` and every value fits its parameter type.
fn fits(catalog: &TypeCatalog, sig: &Signature, method: &str, args: &[Value]) -> bool {
    sig.name() == method
        && sig.arity() == args.len()
        && sig
            .parameter_types()
            .iter()
            .zip(args)
            .all(|(param, value)| catalog.accepts(param, value))
}

impl fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("id", &self.inner.id)
            .field("class", &self.inner.shape.display_name())
            .field("methods", &self.inner.exposed.len())
            .finish()
    }
}

/// Contracts the proxy presents, and how visible methods map to the target.
type Layout = (Vec<TypeName>, Vec<Exposed>);

/// Contract supertypes of `concrete`, nearest first.
fn contracts_of(catalog: &TypeCatalog, concrete: &TypeName) -> Vec<TypeName> {
    catalog
        .ancestors(concrete)
        .into_iter()
        .filter(|t| {
            catalog
                .get(t)
                .is_some_and(|d| d.kind() == TypeKind::Contract)
        })
        .collect()
}

fn interface_layout(
    catalog: &TypeCatalog,
    concrete: &TypeName,
    visible: &[TypeName],
) -> WeftResult<Layout> {
    let contracts = if visible.is_empty() {
        contracts_of(catalog, concrete)
    } else {
        visible.to_vec()
    };
    if contracts.is_empty() {
        return Err(ApplicationError::construction(
            concrete,
            "interface mode needs at least one contract to expose",
        )
        .into());
    }

    let mut exposed: Vec<Exposed> = Vec::new();
    for contract in &contracts {
        let descriptor = catalog.require(contract)?;
        if descriptor.kind() != TypeKind::Contract {
            return Err(ApplicationError::construction(
                concrete,
                format!("'{contract}' is not a contract"),
            )
            .into());
        }
        if !catalog.is_assignable(concrete, contract) {
            return Err(ApplicationError::construction(
                concrete,
                format!("target does not implement '{contract}'"),
            )
            .into());
        }
        for declared in catalog.methods_of(contract) {
            if exposed.iter().any(|e| e.visible.same_shape(&declared)) {
                continue;
            }
            let implementation = catalog
                .find_method(concrete, declared.name(), declared.parameter_types())
                .ok_or_else(|| {
                    ApplicationError::construction(
                        concrete,
                        format!("no implementation of {declared}"),
                    )
                })?;
            exposed.push(Exposed {
                visible: declared,
                implementation,
                intercept: true,
            });
        }
    }
    Ok((contracts, exposed))
}

fn subclass_layout(
    catalog: &TypeCatalog,
    concrete: &TypeName,
    visible: &[TypeName],
) -> WeftResult<Layout> {
    let descriptor = catalog.require(concrete)?;
    if descriptor.kind() != TypeKind::Concrete {
        return Err(ApplicationError::construction(
            concrete,
            format!("subclass mode needs a concrete type, found {:?}", descriptor.kind()),
        )
        .into());
    }
    if descriptor.is_final() {
        return Err(ApplicationError::construction(concrete, "type is final").into());
    }
    if descriptor.instantiation() == Instantiation::ConstructorOnly {
        return Err(ApplicationError::construction(
            concrete,
            "no way to create an instance without the declared constructor arguments",
        )
        .into());
    }
    if let Some(foreign) = visible.iter().find(|v| !catalog.is_assignable(concrete, v)) {
        return Err(ApplicationError::construction(
            concrete,
            format!("'{foreign}' is not a supertype"),
        )
        .into());
    }

    let exposed = catalog
        .methods_of(concrete)
        .into_iter()
        .filter(|m| m.visibility() == Visibility::Public)
        .map(|m| Exposed {
            intercept: !m.is_final(),
            visible: Arc::clone(&m),
            implementation: m,
        })
        .collect();
    Ok((contracts_of(catalog, concrete), exposed))
}

// ── ProxyView ─────────────────────────────────────────────────────────────────

/// A handle seen through one of the types it presents. Only that type's
/// methods are callable.
#[derive(Debug, Clone)]
pub struct ProxyView {
    handle: ProxyHandle,
    as_type: TypeName,
}

impl ProxyView {
    pub fn type_name(&self) -> &TypeName {
        &self.as_type
    }

    pub fn handle(&self) -> &ProxyHandle {
        &self.handle
    }

    /// Call `method` as declared on the viewed type. Overloads the type does
    /// not declare are not reachable, even if the handle exposes them.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> InvocationResult<Value> {
        let catalog = self.handle.inner.weaver.catalog();
        let Some(declared) = catalog
            .methods_of(&self.as_type)
            .into_iter()
            .find(|m| fits(catalog, m, method, &args))
        else {
            return Err(InvocationError::NoSuchMethod {
                type_name: self.as_type.to_string(),
                method: format!("{method}/{}", args.len()),
            });
        };
        match self.handle.exposed_as(&declared) {
            Some(exposed) => self.handle.dispatch(exposed, args),
            None => Err(InvocationError::NotExposed {
                method: declared.to_string(),
                proxy: self.handle.id(),
            }),
        }
    }
}

// ── ProxySlot ─────────────────────────────────────────────────────────────────

/// A late-bound reference from a target to its own proxy.
///
/// The target is built first and holds an unbound slot; once the proxy
/// exists, [`ProxySlot::bind`] connects them. The slot holds the proxy weakly,
/// so target and proxy do not keep each other alive.
#[derive(Clone, Default)]
pub struct ProxySlot {
    cell: Arc<OnceLock<Weak<ProxyInner>>>,
}

impl ProxySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&self, proxy: &ProxyHandle) -> Result<(), ApplicationError> {
        self.cell
            .set(Arc::downgrade(&proxy.inner))
            .map_err(|_| ApplicationError::SelfProxyAlreadyBound)
    }

    pub fn is_bound(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The proxy, if bound and still alive.
    pub fn get(&self) -> InvocationResult<ProxyHandle> {
        self.cell
            .get()
            .and_then(Weak::upgrade)
            .map(|inner| ProxyHandle { inner })
            .ok_or(InvocationError::ProxyReleased)
    }
}

impl fmt::Debug for ProxySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySlot")
            .field("bound", &self.is_bound())
            .finish()
    }
}

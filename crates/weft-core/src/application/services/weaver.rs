//! The weaver: one explicit owner for the catalog, the named pointcuts and
//! the advice registry.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument};

use crate::application::{
    error::ApplicationError,
    ports::{AspectSource, Target},
    services::{
        advice::{AdviceDefinition, AdviceDraft},
        chain::Chain,
        proxy::ProxyHandle,
        registry::AdviceRegistry,
    },
};
use crate::domain::{
    AdviceId, AspectId, DomainError, Phase, Pointcut, PointcutLibrary, ProxyMode, ProxyShape,
    RuntimeContext, Signature, TypeCatalog, TypeName,
};
use crate::error::WeftResult;

struct WeaverInner {
    catalog: Arc<TypeCatalog>,
    library: RwLock<PointcutLibrary>,
    registry: AdviceRegistry,
}

/// Entry point of the engine. Cheap to clone; clones share state.
///
/// ```rust,ignore
/// let weaver = Weaver::new(catalog);
/// weaver.define_pointcut("allOrder", "execution(* hello.aop.order..*(..))")?;
/// let tx = weaver.aspect("TxAspect", 1)?;
/// weaver.register(tx, AdviceDefinition::around("doTransaction", "allOrder()", |pjp| pjp.proceed()))?;
/// let proxy = weaver.wrap(target, ProxyMode::Subclass, &[])?;
/// ```
#[derive(Clone)]
pub struct Weaver {
    inner: Arc<WeaverInner>,
}

impl Weaver {
    /// A weaver over `catalog`. The catalog is fixed for the weaver's
    /// lifetime.
    pub fn new(catalog: TypeCatalog) -> Self {
        Self::with_catalog(Arc::new(catalog))
    }

    pub fn with_catalog(catalog: Arc<TypeCatalog>) -> Self {
        Self {
            inner: Arc::new(WeaverInner {
                catalog,
                library: RwLock::new(PointcutLibrary::new()),
                registry: AdviceRegistry::new(),
            }),
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.inner.catalog
    }

    pub fn registry(&self) -> &AdviceRegistry {
        &self.inner.registry
    }

    /// Snapshot of the named pointcuts.
    pub fn library(&self) -> PointcutLibrary {
        self.inner
            .library
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── pointcuts ─────────────────────────────────────────────────────────

    /// Define a named pointcut usable as `name()` in later expressions.
    pub fn define_pointcut(&self, name: &str, expression: &str) -> WeftResult<()> {
        let pointcut = self.parse(expression)?;
        let mut library = self
            .inner
            .library
            .write()
            .map_err(|_| ApplicationError::RegistryLock)?;
        library.add(name, &pointcut)?;
        debug!(name, pointcut = %pointcut, "Named pointcut defined");
        Ok(())
    }

    /// Parse `expression` against this weaver's catalog and named pointcuts.
    pub fn parse(&self, expression: &str) -> WeftResult<Pointcut> {
        self.parse_with(expression, &[])
    }

    pub fn parse_with(
        &self,
        expression: &str,
        captures: &[(String, TypeName)],
    ) -> WeftResult<Pointcut> {
        let library = self
            .inner
            .library
            .read()
            .map_err(|_| ApplicationError::RegistryLock)?;
        Ok(Pointcut::parse_with(
            expression,
            &self.inner.catalog,
            captures,
            &library,
        )?)
    }

    // ── registry ──────────────────────────────────────────────────────────

    pub fn aspect(&self, name: impl Into<String>, order: i32) -> WeftResult<AspectId> {
        self.inner.registry.add_aspect(name, order)
    }

    /// Parse and register an advice. A malformed pointcut fails here, never
    /// at call time.
    #[instrument(skip(self, definition), fields(advice = %definition.name()))]
    pub fn register(&self, aspect: AspectId, definition: AdviceDefinition) -> WeftResult<AdviceId> {
        let AdviceDefinition {
            name,
            pointcut,
            body,
            captures,
            outcome_type,
        } = definition;

        if let Some(ty) = &outcome_type {
            if !matches!(body.phase(), Phase::AfterReturning | Phase::AfterThrowing) {
                return Err(DomainError::InvalidSignature(format!(
                    "advice '{name}': an outcome type only applies to after-returning and after-throwing advice"
                ))
                .into());
            }
            self.inner.catalog.require(ty)?;
        }

        let pointcut = self.parse_with(&pointcut, &captures)?;
        self.inner.registry.register(
            aspect,
            AdviceDraft {
                name,
                pointcut,
                body,
                outcome_type,
            },
        )
    }

    pub fn unregister(&self, id: AdviceId) -> WeftResult<()> {
        self.inner.registry.unregister(id)
    }

    pub fn remove_aspect(&self, id: AspectId) -> WeftResult<usize> {
        self.inner.registry.remove_aspect(id)
    }

    /// Let `source` define pointcuts and aspects on this weaver.
    pub fn install(&self, source: &dyn AspectSource) -> WeftResult<Vec<AspectId>> {
        source.install(self)
    }

    // ── chains and proxies ────────────────────────────────────────────────

    /// Resolve the chain for `signature` called through a proxy of `shape`
    /// wrapping an object of type `target`.
    pub fn build_chain(
        &self,
        signature: &Arc<Signature>,
        shape: &ProxyShape,
        target: &TypeName,
    ) -> Chain {
        let runtime = RuntimeContext::new().with_proxy(shape).with_target(target);
        let resolution = self
            .inner
            .registry
            .resolve(&self.inner.catalog, signature, runtime);
        debug!(
            join_point = %signature,
            advices = resolution.advices.len(),
            version = resolution.version,
            "Chain built"
        );
        Chain::new(Arc::clone(signature), resolution)
    }

    /// The chain a proxy of `shape` would run for `signature`, without
    /// executing anything.
    pub fn plan(&self, signature: &Arc<Signature>, shape: &ProxyShape) -> Chain {
        self.build_chain(signature, shape, shape.concrete())
    }

    /// The proxy shape `wrap` would produce, without a target.
    pub fn shape_for(
        &self,
        concrete: &TypeName,
        mode: ProxyMode,
        visible: &[TypeName],
    ) -> WeftResult<ProxyShape> {
        let placeholder = Arc::new(Placeholder(concrete.clone()));
        let handle = ProxyHandle::build(self.clone(), placeholder, mode, visible)?;
        Ok(handle.shape().clone())
    }

    /// Wrap `target` in a proxy. `visible` lists the contracts to expose in
    /// interface mode (all implemented contracts when empty), or extra
    /// supertypes to check in subclass mode.
    #[instrument(skip(self, target), fields(target = %target.type_name()))]
    pub fn wrap(
        &self,
        target: Arc<dyn Target>,
        mode: ProxyMode,
        visible: &[TypeName],
    ) -> WeftResult<ProxyHandle> {
        ProxyHandle::build(self.clone(), target, mode, visible)
    }
}

impl fmt::Debug for Weaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Weaver")
            .field("types", &self.inner.catalog.len())
            .field("registry_version", &self.inner.registry.version())
            .finish()
    }
}

/// Stands in for a target when only the proxy layout is wanted.
struct Placeholder(TypeName);

impl Target for Placeholder {
    fn type_name(&self) -> &TypeName {
        &self.0
    }

    fn invoke(
        &self,
        method: &Signature,
        _args: &[crate::domain::Value],
    ) -> Result<crate::domain::Value, crate::domain::Fault> {
        Err(crate::domain::Fault::new(
            "UnsupportedOperationException",
            format!("{method} called on a layout placeholder"),
        ))
    }
}

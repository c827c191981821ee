//! The advice registry: aspects, their advices, and resolution order.
//!
//! State is an immutable [`Snapshot`] behind an `RwLock<Arc<_>>`. Every
//! mutation copies the snapshot, bumps its version and swaps it in, so a chain
//! that is already executing keeps the snapshot it was built from while new
//! calls see the version change and rebuild.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::application::{
    error::ApplicationError,
    services::advice::{Advice, AdviceDraft},
};
use crate::domain::{AdviceId, AspectId, RuntimeContext, Signature, TypeCatalog, Verdict};
use crate::error::WeftResult;

/// A named group of advices sharing one order key. Lower orders wrap higher
/// ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aspect {
    pub(crate) id: AspectId,
    pub(crate) name: String,
    pub(crate) order: i32,
    pub(crate) seq: u64,
}

impl Aspect {
    pub fn id(&self) -> AspectId {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn order(&self) -> i32 {
        self.order
    }
}

/// One consistent view of the registry.
#[derive(Debug, Default)]
pub struct Snapshot {
    version: u64,
    aspects: Vec<Arc<Aspect>>,
    advices: Vec<Arc<Advice>>,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn aspects(&self) -> &[Arc<Aspect>] {
        &self.aspects
    }

    pub fn advices(&self) -> &[Arc<Advice>] {
        &self.advices
    }

    pub fn aspect(&self, id: AspectId) -> Option<&Arc<Aspect>> {
        self.aspects.iter().find(|a| a.id == id)
    }

    fn next(&self) -> Self {
        Self {
            version: self.version + 1,
            aspects: self.aspects.clone(),
            advices: self.advices.clone(),
        }
    }
}

/// An advice selected for a join point, with its owning aspect and the
/// static verdict of its pointcut.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub aspect: Arc<Aspect>,
    pub advice: Arc<Advice>,
    pub verdict: Verdict,
}

/// Matching advices in execution order, from one registry version.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub version: u64,
    pub advices: Vec<Resolved>,
}

#[derive(Debug, Default)]
pub struct AdviceRegistry {
    state: RwLock<Arc<Snapshot>>,
    next_id: AtomicU64,
}

impl AdviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state. Writers only ever swap a complete snapshot in, so a
    /// poisoned lock still guards a consistent value and readers use it.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Snapshot) -> Result<T, ApplicationError>,
    ) -> WeftResult<T> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| ApplicationError::RegistryLock)?;
        let mut next = guard.next();
        let out = change(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }

    /// Register an aspect group. Aspects with equal `order` keep registration
    /// order.
    pub fn add_aspect(&self, name: impl Into<String>, order: i32) -> WeftResult<AspectId> {
        let seq = self.next_id();
        let aspect = Aspect {
            id: AspectId(seq),
            name: name.into(),
            order,
            seq,
        };
        let id = aspect.id;
        self.mutate(|s| {
            info!(aspect = %aspect.name, order, "Aspect registered");
            s.aspects.push(Arc::new(aspect));
            Ok(id)
        })
    }

    pub fn register(&self, aspect: AspectId, draft: AdviceDraft) -> WeftResult<AdviceId> {
        let seq = self.next_id();
        let advice = Advice {
            id: AdviceId(seq),
            aspect,
            name: draft.name,
            pointcut: draft.pointcut,
            body: draft.body,
            outcome_type: draft.outcome_type,
            seq,
        };
        let id = advice.id;
        let version = self.mutate(move |s| {
            if s.aspect(aspect).is_none() {
                return Err(ApplicationError::UnknownAspect { id: aspect });
            }
            info!(
                advice = %advice.name,
                phase = %advice.phase(),
                pointcut = %advice.pointcut,
                "Advice registered"
            );
            s.advices.push(Arc::new(advice));
            Ok(s.version)
        })?;
        debug!(%id, version, "Registry version bumped");
        Ok(id)
    }

    pub fn unregister(&self, id: AdviceId) -> WeftResult<()> {
        self.mutate(|s| {
            let before = s.advices.len();
            s.advices.retain(|a| a.id != id);
            if s.advices.len() == before {
                return Err(ApplicationError::UnknownAdvice { id });
            }
            info!(%id, "Advice unregistered");
            Ok(())
        })
    }

    /// Remove an aspect and every advice it owns. Returns how many advices
    /// went with it.
    pub fn remove_aspect(&self, id: AspectId) -> WeftResult<usize> {
        self.mutate(|s| {
            if s.aspect(id).is_none() {
                return Err(ApplicationError::UnknownAspect { id });
            }
            s.aspects.retain(|a| a.id != id);
            let before = s.advices.len();
            s.advices.retain(|a| a.aspect != id);
            let removed = before - s.advices.len();
            info!(%id, removed, "Aspect removed");
            Ok(removed)
        })
    }

    /// Every advice whose pointcut can match, in execution order.
    pub fn resolve(
        &self,
        catalog: &TypeCatalog,
        signature: &Signature,
        runtime: RuntimeContext<'_>,
    ) -> Resolution {
        let snapshot = self.snapshot();
        let mut advices: Vec<Resolved> = snapshot
            .advices
            .iter()
            .filter_map(|advice| {
                let verdict = advice.pointcut.evaluate(catalog, signature, runtime);
                if verdict.is_never() {
                    return None;
                }
                let aspect = snapshot.aspect(advice.aspect)?;
                Some(Resolved {
                    aspect: Arc::clone(aspect),
                    advice: Arc::clone(advice),
                    verdict,
                })
            })
            .collect();
        advices.sort_by(execution_order);
        warn_same_phase(&advices, signature);

        Resolution {
            version: snapshot.version,
            advices,
        }
    }
}

/// Aspect order, then aspect registration, then phase precedence. Advice
/// sequence is only a stable tiebreak; see [`warn_same_phase`].
fn execution_order(a: &Resolved, b: &Resolved) -> Ordering {
    (a.aspect.order, a.aspect.seq, a.advice.phase().precedence(), a.advice.seq).cmp(&(
        b.aspect.order,
        b.aspect.seq,
        b.advice.phase().precedence(),
        b.advice.seq,
    ))
}

/// Two advices of the same phase in one aspect have no defined relative
/// order. They run in registration order today; callers must not rely on it.
fn warn_same_phase(advices: &[Resolved], signature: &Signature) {
    for pair in advices.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.aspect.id == b.aspect.id && a.advice.phase() == b.advice.phase() {
            warn!(
                aspect = %a.aspect.name,
                phase = %a.advice.phase(),
                first = %a.advice.name,
                second = %b.advice.name,
                join_point = %signature,
                "Relative order of same-phase advices in one aspect is unspecified; split them into ordered aspects"
            );
        }
    }
}

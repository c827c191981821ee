//! Advice: a body tagged with a phase and bound to a pointcut.

use std::fmt;
use std::sync::Arc;

use crate::application::{
    error::{InvocationError, InvocationResult},
    services::chain::{JoinPoint, ProceedingJoinPoint},
};
use crate::domain::{AdviceId, AspectId, Fault, Phase, Pointcut, TypeName, Value};

/// Body of an around advice.
///
/// The advice decides whether, how often and with which arguments the rest
/// of the chain runs, by calling [`ProceedingJoinPoint::proceed`] zero or more
/// times. Not calling it short-circuits the chain and the real method.
pub trait AroundAdvice: Send + Sync {
    fn around(&self, pjp: &ProceedingJoinPoint<'_>) -> InvocationResult<Value>;
}

impl<F> AroundAdvice for F
where
    F: Fn(&ProceedingJoinPoint<'_>) -> InvocationResult<Value> + Send + Sync,
{
    fn around(&self, pjp: &ProceedingJoinPoint<'_>) -> InvocationResult<Value> {
        self(pjp)
    }
}

pub type JoinPointFn = Arc<dyn Fn(&JoinPoint<'_>) -> Result<(), Fault> + Send + Sync>;
pub type ReturningFn = Arc<dyn Fn(&JoinPoint<'_>, &Value) -> Result<(), Fault> + Send + Sync>;
pub type ThrowingFn =
    Arc<dyn Fn(&JoinPoint<'_>, &InvocationError) -> Result<(), Fault> + Send + Sync>;

/// The executable part of an advice. The variant is the phase.
#[derive(Clone)]
pub enum AdviceBody {
    Around(Arc<dyn AroundAdvice>),
    Before(JoinPointFn),
    After(JoinPointFn),
    AfterReturning(ReturningFn),
    AfterThrowing(ThrowingFn),
}

impl AdviceBody {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Around(_) => Phase::Around,
            Self::Before(_) => Phase::Before,
            Self::After(_) => Phase::After,
            Self::AfterReturning(_) => Phase::AfterReturning,
            Self::AfterThrowing(_) => Phase::AfterThrowing,
        }
    }
}

impl fmt::Debug for AdviceBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AdviceBody::{}", self.phase())
    }
}

/// A registered advice.
#[derive(Debug, Clone)]
pub struct Advice {
    pub(crate) id: AdviceId,
    pub(crate) aspect: AspectId,
    pub(crate) name: String,
    pub(crate) pointcut: Pointcut,
    pub(crate) body: AdviceBody,
    pub(crate) outcome_type: Option<TypeName>,
    pub(crate) seq: u64,
}

impl Advice {
    pub fn id(&self) -> AdviceId {
        self.id
    }
    pub fn aspect(&self) -> AspectId {
        self.aspect
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn phase(&self) -> Phase {
        self.body.phase()
    }
    pub fn pointcut(&self) -> &Pointcut {
        &self.pointcut
    }
    /// Return-value or fault filter for after-returning / after-throwing.
    pub fn outcome_type(&self) -> Option<&TypeName> {
        self.outcome_type.as_ref()
    }
}

/// An advice ready for the registry: pointcut parsed, captures validated.
#[derive(Debug, Clone)]
pub struct AdviceDraft {
    pub name: String,
    pub pointcut: Pointcut,
    pub body: AdviceBody,
    pub outcome_type: Option<TypeName>,
}

/// What callers hand to [`crate::application::Weaver::register`].
///
/// ```rust,ignore
/// let def = AdviceDefinition::before("doTrace", "execution(* *(..)) && args(arg, ..)", |jp| {
///     println!("{:?}", jp.bindings().value("arg"));
///     Ok(())
/// })
/// .capture("arg", "String");
/// ```
#[derive(Debug, Clone)]
pub struct AdviceDefinition {
    pub(crate) name: String,
    pub(crate) pointcut: String,
    pub(crate) body: AdviceBody,
    pub(crate) captures: Vec<(String, TypeName)>,
    pub(crate) outcome_type: Option<TypeName>,
}

impl AdviceDefinition {
    fn new(name: impl Into<String>, pointcut: impl Into<String>, body: AdviceBody) -> Self {
        Self {
            name: name.into(),
            pointcut: pointcut.into(),
            body,
            captures: Vec::new(),
            outcome_type: None,
        }
    }

    pub fn around(
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&ProceedingJoinPoint<'_>) -> InvocationResult<Value> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, pointcut, AdviceBody::Around(Arc::new(body)))
    }

    /// Around advice implemented by a type rather than a closure, such as
    /// [`crate::application::RetryAdvice`].
    pub fn around_with(
        name: impl Into<String>,
        pointcut: impl Into<String>,
        advice: impl AroundAdvice + 'static,
    ) -> Self {
        Self::new(name, pointcut, AdviceBody::Around(Arc::new(advice)))
    }

    pub fn before(
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&JoinPoint<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, pointcut, AdviceBody::Before(Arc::new(body)))
    }

    /// Runs whatever the outcome, before after-returning / after-throwing.
    pub fn after(
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&JoinPoint<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, pointcut, AdviceBody::After(Arc::new(body)))
    }

    pub fn after_returning(
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&JoinPoint<'_>, &Value) -> Result<(), Fault> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, pointcut, AdviceBody::AfterReturning(Arc::new(body)))
    }

    pub fn after_throwing(
        name: impl Into<String>,
        pointcut: impl Into<String>,
        body: impl Fn(&JoinPoint<'_>, &InvocationError) -> Result<(), Fault> + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, pointcut, AdviceBody::AfterThrowing(Arc::new(body)))
    }

    /// Declare a capture variable the pointcut must bind.
    pub fn capture(mut self, name: impl Into<String>, ty: impl Into<TypeName>) -> Self {
        self.captures.push((name.into(), ty.into()));
        self
    }

    /// Only run for return values (after-returning) or faults (after-throwing)
    /// assignable to `ty`.
    pub fn outcome_type(mut self, ty: impl Into<TypeName>) -> Self {
        self.outcome_type = Some(ty.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pointcut(&self) -> &str {
        &self.pointcut
    }

    pub fn phase(&self) -> Phase {
        self.body.phase()
    }
}

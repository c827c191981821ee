//! Interceptor chains: the ordered advices for one join point, and their
//! execution.
//!
//! A chain runs as an onion. Around advices wrap the call from the outermost
//! (lowest aspect order) inward; each continues by calling
//! [`ProceedingJoinPoint::proceed`]. Inside the innermost around:
//!
//! ```text
//! before*  ->  real call  ->  after* (always)  ->  after-returning* | after-throwing*
//! ```
//!
//! An error raised by an after advice replaces the error in flight and keeps
//! it as `suppressed`. Pointcuts whose static verdict was `Dynamic` are
//! re-checked per call against the arguments at that depth.

use std::fmt;
use std::sync::Arc;

use crate::application::{
    error::{InvocationError, InvocationResult},
    ports::Target,
    services::{
        advice::{Advice, AdviceBody, AroundAdvice},
        proxy::ProxyHandle,
        registry::{Resolution, Resolved},
    },
};
use crate::domain::{
    Binding, Bindings, Fault, Phase, ProxyShape, RuntimeContext, Signature, TypeCatalog, TypeName,
    Value, Verdict,
};

// ── JoinPoint ─────────────────────────────────────────────────────────────────

/// What a non-around advice body sees of the call.
#[derive(Clone, Copy)]
pub struct JoinPoint<'a> {
    signature: &'a Signature,
    args: &'a [Value],
    bindings: &'a Bindings,
    handle: &'a ProxyHandle,
    target: &'a dyn Target,
}

impl<'a> JoinPoint<'a> {
    /// The implementation method being executed.
    pub fn signature(&self) -> &'a Signature {
        self.signature
    }
    pub fn args(&self) -> &'a [Value] {
        self.args
    }
    /// Values bound to this advice's captures.
    pub fn bindings(&self) -> &'a Bindings {
        self.bindings
    }
    /// The proxy the call came through. Calls made on it are intercepted.
    pub fn this(&self) -> &'a ProxyHandle {
        self.handle
    }
    /// The wrapped object. Calls made on it bypass interception.
    pub fn target(&self) -> &'a dyn Target {
        self.target
    }
    /// Shape of the proxy the call came through.
    pub fn proxy(&self) -> &'a ProxyShape {
        self.handle.shape()
    }
    /// Runtime type of the wrapped object.
    pub fn target_type(&self) -> &'a TypeName {
        self.target.type_name()
    }
    /// The proxy bound by `this(name)`.
    pub fn bound_this(&self, name: &str) -> Option<&'a ProxyHandle> {
        matches!(self.bindings.get(name), Some(Binding::This(_))).then_some(self.handle)
    }
    /// The wrapped object bound by `target(name)`.
    pub fn bound_target(&self, name: &str) -> Option<&'a dyn Target> {
        matches!(self.bindings.get(name), Some(Binding::Target(_))).then_some(self.target)
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("signature", &self.signature.to_string())
            .field("args", &self.args)
            .field("bindings", &self.bindings)
            .field("proxy", &self.handle.id())
            .field("target", self.target.type_name())
            .finish()
    }
}

/// `execution(String a.b.OrderService.orderItem(String))`
impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution({})", self.signature)
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// Environment of one proxied call.
pub(crate) struct Call<'a> {
    pub catalog: &'a TypeCatalog,
    pub handle: &'a ProxyHandle,
    pub target: &'a dyn Target,
}

/// The compiled plan for one join point: matched advices in execution order.
#[derive(Debug, Clone)]
pub struct Chain {
    signature: Arc<Signature>,
    version: u64,
    links: Vec<Resolved>,
}

impl Chain {
    pub(crate) fn new(signature: Arc<Signature>, resolution: Resolution) -> Self {
        Self {
            signature,
            version: resolution.version,
            links: resolution.advices,
        }
    }

    pub fn signature(&self) -> &Arc<Signature> {
        &self.signature
    }

    /// Registry version this chain was built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn links(&self) -> &[Resolved] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// `true` if any advice is only selected after checking the call.
    pub fn has_dynamic_links(&self) -> bool {
        self.links.iter().any(|l| l.verdict == Verdict::Dynamic)
    }

    pub(crate) fn execute(&self, call: &Call<'_>, args: Vec<Value>) -> InvocationResult<Value> {
        let arounds = self
            .links
            .iter()
            .filter_map(|link| match &link.advice.body {
                AdviceBody::Around(body) => Some((link, &**body)),
                _ => None,
            })
            .collect();
        let invocation = Invocation {
            chain: self,
            call,
            arounds,
        };
        invocation.dispatch(0, args)
    }
}

struct Invocation<'a> {
    chain: &'a Chain,
    call: &'a Call<'a>,
    arounds: Vec<(&'a Resolved, &'a dyn AroundAdvice)>,
}

impl Invocation<'_> {
    /// Bindings for `link` if it applies to this call.
    fn active(&self, link: &Resolved, args: &[Value]) -> Option<Bindings> {
        let pointcut = &link.advice.pointcut;
        if link.verdict == Verdict::Always && !pointcut.has_captures() {
            return Some(Bindings::new());
        }
        let runtime = RuntimeContext::new()
            .with_proxy(self.call.handle.shape())
            .with_target(self.call.target.type_name())
            .with_args(args);
        pointcut.bindings(self.call.catalog, &self.chain.signature, runtime)
    }

    fn join_point<'j>(&'j self, args: &'j [Value], bindings: &'j Bindings) -> JoinPoint<'j> {
        JoinPoint {
            signature: &self.chain.signature,
            args,
            bindings,
            handle: self.call.handle,
            target: self.call.target,
        }
    }

    /// Run the chain from the around advice at `from` inward.
    fn dispatch(&self, from: usize, args: Vec<Value>) -> InvocationResult<Value> {
        for (index, (link, advice)) in self.arounds.iter().enumerate().skip(from) {
            if let Some(bindings) = self.active(link, &args) {
                let pjp = ProceedingJoinPoint {
                    invocation: self,
                    next: index + 1,
                    args,
                    bindings,
                    advice: &link.advice,
                };
                return advice.around(&pjp);
            }
        }
        self.core(args)
    }

    fn core(&self, args: Vec<Value>) -> InvocationResult<Value> {
        let active: Vec<(&Resolved, Bindings)> = self
            .chain
            .links
            .iter()
            .filter(|link| link.advice.phase() != Phase::Around)
            .filter_map(|link| self.active(link, &args).map(|b| (link, b)))
            .collect();

        let mut outcome = self.before_and_call(&active, &args);

        for (link, bindings) in &active {
            if let AdviceBody::After(body) = &link.advice.body
                && let Err(fault) = body(&self.join_point(&args, bindings))
            {
                outcome = Err(InvocationError::advice(
                    &link.advice.name,
                    fault,
                    outcome.err(),
                ));
            }
        }

        match outcome {
            Ok(value) => {
                for (link, bindings) in &active {
                    if let AdviceBody::AfterReturning(body) = &link.advice.body
                        && self.returns_match(&link.advice, &value)
                    {
                        body(&self.join_point(&args, bindings), &value).map_err(|fault| {
                            InvocationError::advice(&link.advice.name, fault, None)
                        })?;
                    }
                }
                Ok(value)
            }
            Err(mut error) => {
                for (link, bindings) in &active {
                    if let AdviceBody::AfterThrowing(body) = &link.advice.body
                        && self.throws_match(&link.advice, &error)
                        && let Err(fault) = body(&self.join_point(&args, bindings), &error)
                    {
                        error = InvocationError::advice(&link.advice.name, fault, Some(error));
                    }
                }
                Err(error)
            }
        }
    }

    fn before_and_call(
        &self,
        active: &[(&Resolved, Bindings)],
        args: &[Value],
    ) -> InvocationResult<Value> {
        for (link, bindings) in active {
            if let AdviceBody::Before(body) = &link.advice.body {
                body(&self.join_point(args, bindings))
                    .map_err(|fault| InvocationError::advice(&link.advice.name, fault, None))?;
            }
        }
        let signature = &self.chain.signature;
        self.call
            .target
            .invoke(signature, args)
            .map_err(|fault| InvocationError::TargetInvocation {
                method: signature.to_string(),
                fault,
            })
    }

    /// `null` and `void` results satisfy every return filter. Primitive
    /// results are boxed per the declared return type, so an `int` method
    /// satisfies `int`, `Integer` and `Number` filters.
    fn returns_match(&self, advice: &Advice, value: &Value) -> bool {
        let Some(expected) = advice.outcome_type() else {
            return true;
        };
        let catalog = self.call.catalog;
        match catalog.runtime_type_in(self.chain.signature.return_type(), value) {
            None => true,
            Some(actual) if actual.as_str() == "void" => true,
            Some(actual) => catalog.conforms(&actual, expected),
        }
    }

    fn throws_match(&self, advice: &Advice, error: &InvocationError) -> bool {
        match advice.outcome_type() {
            None => true,
            Some(expected) => error
                .fault()
                .is_some_and(|f| self.call.catalog.is_assignable(f.kind(), expected)),
        }
    }
}

// ── ProceedingJoinPoint ───────────────────────────────────────────────────────

/// What an around advice sees: the join point plus the rest of the chain.
pub struct ProceedingJoinPoint<'a> {
    invocation: &'a Invocation<'a>,
    next: usize,
    args: Vec<Value>,
    bindings: Bindings,
    advice: &'a Advice,
}

impl ProceedingJoinPoint<'_> {
    /// Run the rest of the chain with the current arguments. May be called
    /// any number of times.
    pub fn proceed(&self) -> InvocationResult<Value> {
        self.invocation.dispatch(self.next, self.args.clone())
    }

    /// Run the rest of the chain with replacement arguments. They must fit
    /// the method's parameter types.
    pub fn proceed_with(&self, args: Vec<Value>) -> InvocationResult<Value> {
        let signature = self.signature();
        let catalog = self.invocation.call.catalog;
        let fits = args.len() == signature.arity()
            && signature
                .parameter_types()
                .iter()
                .zip(&args)
                .all(|(param, value)| catalog.accepts(param, value));
        if !fits {
            return Err(self.fail(Fault::new(
                "IllegalArgumentException",
                format!("arguments do not fit {signature}"),
            )));
        }
        self.invocation.dispatch(self.next, args)
    }

    pub fn signature(&self) -> &Signature {
        &self.invocation.chain.signature
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn join_point(&self) -> JoinPoint<'_> {
        self.invocation.join_point(&self.args, &self.bindings)
    }

    /// Name of the advice being executed.
    pub fn advice_name(&self) -> &str {
        &self.advice.name
    }

    /// An error for a fault raised by the advice itself.
    pub fn fail(&self, fault: Fault) -> InvocationError {
        InvocationError::advice(&self.advice.name, fault, None)
    }
}

impl fmt::Debug for ProceedingJoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceedingJoinPoint")
            .field("signature", &self.signature().to_string())
            .field("advice", &self.advice.name)
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Display for ProceedingJoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution({})", self.signature())
    }
}

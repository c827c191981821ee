//! Application services: the advice registry, interceptor chains and the
//! proxies that run them, all owned by a [`Weaver`].

pub mod advice;
pub mod chain;
pub mod proxy;
pub mod registry;
pub mod retry;
pub mod weaver;

pub use advice::{Advice, AdviceBody, AdviceDefinition, AdviceDraft, AroundAdvice};
pub use chain::{Chain, JoinPoint, ProceedingJoinPoint};
pub use proxy::{ProxyHandle, ProxySlot, ProxyView};
pub use registry::{AdviceRegistry, Aspect, Resolution, Resolved, Snapshot};
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryAdvice};
pub use weaver::Weaver;

//! Application layer for Weft.
//!
//! This layer contains:
//! - **Services**: the weaver, advice registry, chains and proxies
//! - **Ports**: traits for the real objects behind proxies and for loading
//!   catalogs and aspects
//! - **Errors**: wiring errors and the errors proxied calls return
//!
//! Pointcut parsing and matching live in `crate::domain`; this layer decides
//! when they run and in what order advice executes.

pub mod error;
pub mod ports;
pub mod services;

pub use services::{
    Advice, AdviceDefinition, AdviceRegistry, AroundAdvice, Aspect, Chain, JoinPoint,
    ProceedingJoinPoint, ProxyHandle, ProxySlot, ProxyView, RetryAdvice, Weaver,
};

pub use ports::{AspectSource, CatalogSource, Target};

pub use error::{ApplicationError, InvocationError, InvocationResult};

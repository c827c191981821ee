//! Weft Core - method interception for a modelled object world.
//!
//! This crate provides the domain and application layers of Weft: a
//! signature model, a pointcut language, an advice registry, interceptor
//! chains and the proxies that run them.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │             weft-cli (CLI)              │
//! │      check / match / plan commands      │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Application Services            │
//! │  (Weaver, AdviceRegistry, ProxyHandle)  │
//! │     chain building and execution        │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Application Ports (Traits)       │
//! │ (Target, CatalogSource, AspectSource)   │
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │      weft-adapters (Infrastructure)     │
//! │  (FnTarget, filesystem loaders, stock   │
//! │   trace/log/transaction/retry aspects)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │         Domain Layer (Pure Logic)       │
//! │ (TypeCatalog, Signature, Pointcut)      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use weft_core::prelude::*;
//!
//! let weaver = Weaver::new(catalog);
//! let tx = weaver.aspect("TxAspect", 1)?;
//! weaver.register(
//!     tx,
//!     AdviceDefinition::around("doTransaction", "execution(* hello.aop.order..*Service.*(..))", |pjp| {
//!         let result = pjp.proceed();
//!         // commit or roll back
//!         result
//!     }),
//! )?;
//!
//! let proxy = weaver.wrap(target, ProxyMode::Interface, &[])?;
//! proxy.invoke("orderItem", vec![Value::from("itemA")])?;
//! ```

pub mod domain;

pub mod application;

pub mod error;

/// Public API - what external crates should use.
pub mod prelude {
    pub use crate::application::{
        AdviceDefinition, AroundAdvice, InvocationError, InvocationResult, JoinPoint,
        ProceedingJoinPoint, ProxyHandle, ProxySlot, RetryAdvice, Weaver,
        ports::{AspectSource, CatalogSource, Target},
    };
    pub use crate::domain::{
        Fault, Marker, Phase, Pointcut, ProxyMode, Signature, TypeCatalog, TypeDescriptor,
        TypeKind, TypeName, Value, Visibility,
    };
    pub use crate::error::{WeftError, WeftResult};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! End-to-end weaving: aspect ordering, proxy modes, self-calls and retry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, OnceLock};
use std::thread;

use weft_core::application::{
    AdviceDefinition, ApplicationError, InvocationError, ProxyHandle, ProxySlot, RetryAdvice,
    Target, Weaver,
};
use weft_core::domain::{
    AdviceId, Fault, Instantiation, Marker, ProxyMode, Signature, TypeCatalog, TypeDescriptor,
    TypeName, Value,
};
use weft_core::error::WeftError;

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: impl Into<String>) {
    log.lock().unwrap().push(entry.into());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ── fixture ─────────────────────────────────────────────────────────────────

const ORDER_SERVICE: &str = "hello.aop.order.OrderService";
const ORDER_SERVICE_IMPL: &str = "hello.aop.order.OrderServiceImpl";
const ORDER_REPOSITORY: &str = "hello.aop.order.OrderRepository";
const RETRY: &str = "hello.aop.exam.annotation.Retry";
const CALL_SERVICE: &str = "hello.aop.internalcall.CallService";
const INTERNAL_SERVICE: &str = "hello.aop.internalcall.InternalService";

fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::with_builtins();
    catalog
        .register_all([
            TypeDescriptor::marker(RETRY).build().unwrap(),
            TypeDescriptor::contract(ORDER_SERVICE)
                .method(Signature::builder("orderItem").param("String").returns("String"))
                .build()
                .unwrap(),
            TypeDescriptor::concrete(ORDER_SERVICE_IMPL)
                .supertype(ORDER_SERVICE)
                .method(Signature::builder("orderItem").param("String").returns("String"))
                .method(Signature::builder("audit").returns("String"))
                .method(
                    Signature::builder("checksum")
                        .returns("String")
                        .final_method(true),
                )
                .build()
                .unwrap(),
            TypeDescriptor::concrete(ORDER_REPOSITORY)
                .method(
                    Signature::builder("save")
                        .param("String")
                        .returns("String")
                        .marker(Marker::with_value(RETRY, 4i64)),
                )
                .build()
                .unwrap(),
            TypeDescriptor::concrete(CALL_SERVICE)
                .method(Signature::builder("external"))
                .method(Signature::builder("internal"))
                .build()
                .unwrap(),
            TypeDescriptor::concrete(INTERNAL_SERVICE)
                .method(Signature::builder("internal"))
                .build()
                .unwrap(),
            TypeDescriptor::concrete("hello.aop.order.Sealed")
                .final_type(true)
                .build()
                .unwrap(),
            TypeDescriptor::concrete("hello.aop.order.Wired")
                .instantiation(Instantiation::ConstructorOnly)
                .build()
                .unwrap(),
        ])
        .unwrap();
    catalog.validate().unwrap();
    catalog
}

/// Records each call and answers by method name.
struct OrderServiceImpl {
    ty: TypeName,
    log: Log,
}

impl OrderServiceImpl {
    fn new(log: &Log) -> Arc<Self> {
        Arc::new(Self {
            ty: TypeName::new(ORDER_SERVICE_IMPL),
            log: Arc::clone(log),
        })
    }
}

impl Target for OrderServiceImpl {
    fn type_name(&self) -> &TypeName {
        &self.ty
    }

    fn invoke(&self, method: &Signature, args: &[Value]) -> Result<Value, Fault> {
        record(&self.log, format!("call {}", method.name()));
        match (method.name(), args) {
            ("orderItem", [Value::Str(item)]) if item == "ex" => {
                Err(Fault::illegal_state("exception raised"))
            }
            ("orderItem", [item]) => Ok(Value::str(format!("ordered {item}"))),
            ("audit", []) => Ok(Value::str("audited")),
            ("checksum", []) => Ok(Value::str("c0ffee")),
            (other, _) => Err(Fault::new(
                "UnsupportedOperationException",
                format!("no method {other}"),
            )),
        }
    }
}

// ── ordering ────────────────────────────────────────────────────────────────

#[test]
fn lower_order_wraps_higher_order() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let order_only = "execution(* hello.aop.order..*(..))";

    // Registered in reverse so only `order` decides nesting.
    let log_aspect = weaver.aspect("LogAspect", 2).unwrap();
    let tx_aspect = weaver.aspect("TxAspect", 1).unwrap();

    let l = log.clone();
    weaver
        .register(
            log_aspect,
            AdviceDefinition::around("doLog", order_only, move |pjp| {
                record(&l, "log before");
                let out = pjp.proceed();
                record(&l, "log after");
                out
            }),
        )
        .unwrap();
    let l = log.clone();
    weaver
        .register(
            tx_aspect,
            AdviceDefinition::around("doTransaction", order_only, move |pjp| {
                record(&l, "tx begin");
                let out = pjp.proceed();
                match &out {
                    Ok(_) => record(&l, "tx commit"),
                    Err(_) => record(&l, "tx rollback"),
                }
                record(&l, "tx release");
                out
            }),
        )
        .unwrap();

    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Interface, &[])
        .unwrap();
    proxy.invoke("orderItem", vec![Value::str("itemA")]).unwrap();
    assert_eq!(
        entries(&log),
        [
            "tx begin",
            "log before",
            "call orderItem",
            "log after",
            "tx commit",
            "tx release"
        ]
    );

    log.lock().unwrap().clear();
    let err = proxy
        .invoke("orderItem", vec![Value::str("ex")])
        .unwrap_err();
    assert_eq!(
        err.fault().map(|f| f.message().to_owned()),
        Some("exception raised".to_owned())
    );
    assert_eq!(
        entries(&log),
        [
            "tx begin",
            "log before",
            "call orderItem",
            "log after",
            "tx rollback",
            "tx release"
        ]
    );
}

#[test]
fn removing_an_aspect_takes_effect_on_the_next_call() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let aspect = weaver.aspect("LogAspect", 0).unwrap();
    let l = log.clone();
    weaver
        .register(
            aspect,
            AdviceDefinition::before("doLog", "execution(* orderItem(..))", move |jp| {
                record(&l, format!("log {jp}"));
                Ok(())
            }),
        )
        .unwrap();

    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Interface, &[])
        .unwrap();
    proxy.invoke("orderItem", vec![Value::str("a")]).unwrap();
    assert_eq!(weaver.remove_aspect(aspect).unwrap(), 1);
    proxy.invoke("orderItem", vec![Value::str("b")]).unwrap();

    assert_eq!(
        entries(&log),
        [
            "log execution(String hello.aop.order.OrderServiceImpl.orderItem(String))",
            "call orderItem",
            "call orderItem"
        ]
    );
}

// ── proxy modes ─────────────────────────────────────────────────────────────

#[test]
fn interface_proxy_cannot_become_the_concrete_type() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Interface, &[])
        .unwrap();

    assert!(proxy.is_instance_of(&TypeName::new(ORDER_SERVICE)));
    assert!(proxy.is_instance_of(&TypeName::new("Object")));
    assert!(matches!(
        proxy.cast(ORDER_SERVICE_IMPL),
        Err(ApplicationError::ProxyCast { .. })
    ));

    let view = proxy.cast(ORDER_SERVICE).unwrap();
    assert_eq!(
        view.invoke("orderItem", vec![Value::str("itemA")]).unwrap(),
        Value::str("ordered itemA")
    );

    // `audit` exists on the target but not on the contract.
    assert!(matches!(
        proxy.invoke("audit", vec![]),
        Err(InvocationError::NotExposed { .. })
    ));
}

#[test]
fn subclass_proxy_is_both_concrete_type_and_contract() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Subclass, &[])
        .unwrap();

    assert!(proxy.cast(ORDER_SERVICE_IMPL).is_ok());
    assert!(proxy.cast(ORDER_SERVICE).is_ok());
    assert_eq!(proxy.invoke("audit", vec![]).unwrap(), Value::str("audited"));
    assert!(matches!(
        proxy.invoke("missing", vec![]),
        Err(InvocationError::NoSuchMethod { .. })
    ));
}

#[test]
fn final_methods_bypass_advice_on_subclass_proxies() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let aspect = weaver.aspect("Trace", 0).unwrap();
    let l = log.clone();
    weaver
        .register(
            aspect,
            AdviceDefinition::before("trace", "execution(* hello.aop.order..*(..))", move |jp| {
                record(&l, format!("trace {}", jp.signature().name()));
                Ok(())
            }),
        )
        .unwrap();

    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Subclass, &[])
        .unwrap();
    proxy.invoke("checksum", vec![]).unwrap();
    proxy.invoke("audit", vec![]).unwrap();
    assert_eq!(
        entries(&log),
        ["call checksum", "trace audit", "call audit"]
    );
}

struct Plain(TypeName);

impl Target for Plain {
    fn type_name(&self) -> &TypeName {
        &self.0
    }

    fn invoke(&self, _: &Signature, _: &[Value]) -> Result<Value, Fault> {
        Ok(Value::Unit)
    }
}

fn construction_error(weaver: &Weaver, ty: &str, mode: ProxyMode) -> bool {
    matches!(
        weaver.wrap(Arc::new(Plain(TypeName::new(ty))), mode, &[]),
        Err(WeftError::Application(
            ApplicationError::ProxyConstruction { .. }
        ))
    )
}

#[test]
fn proxies_that_cannot_be_built_are_rejected() {
    let weaver = Weaver::new(catalog());
    assert!(construction_error(&weaver, "hello.aop.order.Sealed", ProxyMode::Subclass));
    assert!(construction_error(&weaver, "hello.aop.order.Wired", ProxyMode::Subclass));
    // No contracts to expose.
    assert!(construction_error(&weaver, ORDER_REPOSITORY, ProxyMode::Interface));
    assert!(!construction_error(&weaver, ORDER_REPOSITORY, ProxyMode::Subclass));
}

#[test]
fn replacing_the_target_requires_the_same_type() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Interface, &[])
        .unwrap();
    proxy.invoke("orderItem", vec![Value::str("a")]).unwrap();
    assert_eq!(proxy.cached_chains(), 1);

    assert!(matches!(
        proxy.replace_target(Arc::new(Plain(TypeName::new(ORDER_REPOSITORY)))),
        Err(ApplicationError::TargetMismatch { .. })
    ));
    proxy.replace_target(OrderServiceImpl::new(&log)).unwrap();
    assert_eq!(proxy.cached_chains(), 0);
}

// ── self-calls ──────────────────────────────────────────────────────────────

/// `external` calls `internal` on the same object, either directly or through
/// a slot holding its own proxy.
struct CallService {
    ty: TypeName,
    log: Log,
    slot: Option<ProxySlot>,
}

impl CallService {
    fn internal(&self) -> Result<Value, Fault> {
        record(&self.log, "call internal");
        Ok(Value::Unit)
    }
}

impl Target for CallService {
    fn type_name(&self) -> &TypeName {
        &self.ty
    }

    fn invoke(&self, method: &Signature, _: &[Value]) -> Result<Value, Fault> {
        match method.name() {
            "external" => {
                record(&self.log, "call external");
                match &self.slot {
                    None => self.internal(),
                    Some(slot) => slot
                        .get()
                        .and_then(|proxy| proxy.invoke("internal", vec![]))
                        .map_err(InvocationError::into_fault),
                }
            }
            "internal" => self.internal(),
            other => Err(Fault::runtime(format!("no method {other}"))),
        }
    }
}

fn traced_weaver(log: &Log) -> Weaver {
    let weaver = Weaver::new(catalog());
    let aspect = weaver.aspect("CallLog", 0).unwrap();
    let l = log.clone();
    weaver
        .register(
            aspect,
            AdviceDefinition::before(
                "doLog",
                "execution(* hello.aop.internalcall..*.*(..))",
                move |jp| {
                    record(&l, format!("aop {}", jp.signature().name()));
                    Ok(())
                },
            ),
        )
        .unwrap();
    weaver
}

#[test]
fn direct_self_call_is_not_intercepted() {
    let log = Log::default();
    let weaver = traced_weaver(&log);
    let target = Arc::new(CallService {
        ty: TypeName::new(CALL_SERVICE),
        log: log.clone(),
        slot: None,
    });
    let proxy = weaver.wrap(target, ProxyMode::Subclass, &[]).unwrap();

    proxy.invoke("external", vec![]).unwrap();
    assert_eq!(
        entries(&log),
        ["aop external", "call external", "call internal"]
    );
}

#[test]
fn self_call_through_slot_is_intercepted() {
    let log = Log::default();
    let weaver = traced_weaver(&log);
    let slot = ProxySlot::new();
    let target = Arc::new(CallService {
        ty: TypeName::new(CALL_SERVICE),
        log: log.clone(),
        slot: Some(slot.clone()),
    });
    let proxy = weaver.wrap(target, ProxyMode::Subclass, &[]).unwrap();
    slot.bind(&proxy).unwrap();
    assert!(matches!(
        slot.bind(&proxy),
        Err(ApplicationError::SelfProxyAlreadyBound)
    ));

    proxy.invoke("external", vec![]).unwrap();
    assert_eq!(
        entries(&log),
        ["aop external", "call external", "aop internal", "call internal"]
    );
}

#[test]
fn unbound_slot_fails_the_call() {
    let log = Log::default();
    let weaver = traced_weaver(&log);
    let target = Arc::new(CallService {
        ty: TypeName::new(CALL_SERVICE),
        log: log.clone(),
        slot: Some(ProxySlot::new()),
    });
    let proxy = weaver.wrap(target, ProxyMode::Subclass, &[]).unwrap();

    let err = proxy.invoke("external", vec![]).unwrap_err();
    assert_eq!(
        err.fault().map(|f| f.kind().as_str().to_owned()),
        Some("IllegalStateException".to_owned())
    );
}

/// Calls `internal` on a separate collaborator instead of on itself.
struct SplitCallService {
    ty: TypeName,
    log: Log,
    internal: ProxyHandle,
}

impl Target for SplitCallService {
    fn type_name(&self) -> &TypeName {
        &self.ty
    }

    fn invoke(&self, _: &Signature, _: &[Value]) -> Result<Value, Fault> {
        record(&self.log, "call external");
        self.internal
            .invoke("internal", vec![])
            .map_err(InvocationError::into_fault)
    }
}

#[test]
fn split_collaborator_is_intercepted() {
    let log = Log::default();
    let weaver = traced_weaver(&log);
    let internal = weaver
        .wrap(
            Arc::new(CallService {
                ty: TypeName::new(INTERNAL_SERVICE),
                log: log.clone(),
                slot: None,
            }),
            ProxyMode::Subclass,
            &[],
        )
        .unwrap();
    let external = weaver
        .wrap(
            Arc::new(SplitCallService {
                ty: TypeName::new(CALL_SERVICE),
                log: log.clone(),
                internal,
            }),
            ProxyMode::Subclass,
            &[],
        )
        .unwrap();

    external.invoke("external", vec![]).unwrap();
    assert_eq!(
        entries(&log),
        ["aop external", "call external", "aop internal", "call internal"]
    );
}

// ── retry ───────────────────────────────────────────────────────────────────

struct FlakyRepository {
    ty: TypeName,
    calls: AtomicUsize,
    failures: usize,
}

impl Target for FlakyRepository {
    fn type_name(&self) -> &TypeName {
        &self.ty
    }

    fn invoke(&self, _: &Signature, args: &[Value]) -> Result<Value, Fault> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= self.failures {
            return Err(Fault::illegal_state(format!("failure {n}")));
        }
        Ok(Value::str(format!("saved {}", args[0])))
    }
}

fn retrying_weaver() -> Weaver {
    let weaver = Weaver::new(catalog());
    let aspect = weaver.aspect("RetryAspect", 0).unwrap();
    weaver
        .register(
            aspect,
            AdviceDefinition::around_with(
                "doRetry",
                "@annotation(retry)",
                RetryAdvice::from_marker("retry"),
            )
            .capture("retry", RETRY),
        )
        .unwrap();
    weaver
}

fn repository(failures: usize) -> Arc<FlakyRepository> {
    Arc::new(FlakyRepository {
        ty: TypeName::new(ORDER_REPOSITORY),
        calls: AtomicUsize::new(0),
        failures,
    })
}

#[test]
fn retry_reads_attempts_from_the_marker() {
    let weaver = retrying_weaver();
    let target = repository(3);
    let proxy = weaver
        .wrap(target.clone(), ProxyMode::Subclass, &[])
        .unwrap();

    assert_eq!(
        proxy.invoke("save", vec![Value::str("data")]).unwrap(),
        Value::str("saved data")
    );
    assert_eq!(target.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn exhausted_retry_propagates_the_last_failure() {
    let weaver = retrying_weaver();
    let target = repository(10);
    let proxy = weaver
        .wrap(target.clone(), ProxyMode::Subclass, &[])
        .unwrap();

    let err = proxy.invoke("save", vec![Value::str("data")]).unwrap_err();
    assert!(matches!(err, InvocationError::TargetInvocation { .. }));
    assert_eq!(err.fault().map(Fault::message), Some("failure 4"));
    assert_eq!(target.calls.load(Ordering::SeqCst), 4);
}

#[test]
fn invalid_registrations_fail_up_front() {
    let weaver = Weaver::new(catalog());
    let aspect = weaver.aspect("Broken", 0).unwrap();

    let syntax = weaver.register(
        aspect,
        AdviceDefinition::before("broken", "execution(* *(..)", |_| Ok(())),
    );
    assert!(matches!(syntax, Err(WeftError::Domain(_))));

    let misplaced_filter = weaver.register(
        aspect,
        AdviceDefinition::before("filtered", "execution(* *(..))", |_| Ok(()))
            .outcome_type("String"),
    );
    assert!(matches!(misplaced_filter, Err(WeftError::Domain(_))));

    let unbound_capture = weaver.register(
        aspect,
        AdviceDefinition::before("capture", "execution(* *(..))", |_| Ok(()))
            .capture("retry", RETRY),
    );
    assert!(unbound_capture.is_err());
    assert!(weaver.registry().snapshot().advices().is_empty());
}

// ── receiver references ─────────────────────────────────────────────────────

#[test]
fn this_and_target_captures_hand_over_the_objects() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let aspect = weaver.aspect("Audit", 0).unwrap();

    let l = log.clone();
    weaver
        .register(
            aspect,
            AdviceDefinition::after_returning(
                "auditAfterOrder",
                "execution(* orderItem(..)) && this(service) && target(impl)",
                move |jp, _| {
                    assert!(jp.bound_this("impl").is_none());
                    let implementation = jp.bound_target("impl").expect("target bound");
                    record(&l, format!("target {}", implementation.type_name()));

                    let proxy = jp.bound_this("service").expect("proxy bound");
                    let audited = proxy
                        .invoke("audit", vec![])
                        .map_err(|e| Fault::runtime(e.to_string()))?;
                    record(&l, format!("{audited} via {}", proxy.shape().display_name()));
                    Ok(())
                },
            )
            .capture("service", ORDER_SERVICE)
            .capture("impl", ORDER_SERVICE_IMPL),
        )
        .unwrap();
    let l = log.clone();
    weaver
        .register(
            aspect,
            AdviceDefinition::before("traceAudit", "execution(* audit(..))", move |_| {
                record(&l, "advised audit");
                Ok(())
            }),
        )
        .unwrap();

    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Subclass, &[])
        .unwrap();
    proxy.invoke("orderItem", vec![Value::str("a")]).unwrap();

    assert_eq!(
        entries(&log),
        [
            "call orderItem",
            "target hello.aop.order.OrderServiceImpl",
            "advised audit",
            "call audit",
            "audited via hello.aop.order.OrderServiceImpl$$WeftProxy"
        ]
    );
}

// ── primitives ──────────────────────────────────────────────────────────────

const COUNTER: &str = "hello.aop.calc.Counter";

fn counter_weaver() -> Weaver {
    let mut catalog = TypeCatalog::with_builtins();
    catalog
        .register(
            TypeDescriptor::concrete(COUNTER)
                .method(Signature::builder("add").param("int").returns("int"))
                .method(Signature::builder("widen").param("long").returns("long"))
                .build()
                .unwrap(),
        )
        .unwrap();
    Weaver::new(catalog)
}

struct Counter {
    ty: TypeName,
}

impl Target for Counter {
    fn type_name(&self) -> &TypeName {
        &self.ty
    }

    fn invoke(&self, method: &Signature, args: &[Value]) -> Result<Value, Fault> {
        match (method.name(), args) {
            ("add", [Value::Int(n)]) => Ok(Value::Int(n + 1)),
            ("widen", [n]) => n
                .as_int()
                .map(Value::Long)
                .ok_or_else(|| Fault::new("IllegalArgumentException", "not integral")),
            (other, _) => Err(Fault::new("UnsupportedOperationException", other)),
        }
    }
}

fn counter() -> Arc<Counter> {
    Arc::new(Counter {
        ty: TypeName::new(COUNTER),
    })
}

#[test]
fn args_capture_binds_primitive_arguments() {
    let weaver = counter_weaver();
    let log = Log::default();
    let aspect = weaver.aspect("Amounts", 0).unwrap();
    let l = log.clone();
    weaver
        .register(
            aspect,
            AdviceDefinition::before("amount", "execution(* add(..)) && args(n)", move |jp| {
                record(&l, format!("n={}", jp.bindings().value("n").expect("n bound")));
                Ok(())
            })
            .capture("n", "int"),
        )
        .unwrap();

    let proxy = weaver.wrap(counter(), ProxyMode::Subclass, &[]).unwrap();
    assert_eq!(proxy.invoke("add", vec![Value::Int(3)]).unwrap(), Value::Int(4));
    assert_eq!(proxy.invoke("add", vec![Value::Int(9)]).unwrap(), Value::Int(10));
    assert_eq!(entries(&log), ["n=3", "n=9"]);
}

#[test]
fn long_parameters_box_to_long() {
    let weaver = counter_weaver();
    let log = Log::default();
    let aspect = weaver.aspect("Boxing", 0).unwrap();
    for ty in ["Long", "Number", "Integer"] {
        let l = log.clone();
        weaver
            .register(
                aspect,
                AdviceDefinition::before(
                    format!("as{ty}"),
                    format!("execution(* widen(..)) && args({ty})"),
                    move |_| {
                        record(&l, ty);
                        Ok(())
                    },
                ),
            )
            .unwrap();
    }

    let proxy = weaver.wrap(counter(), ProxyMode::Subclass, &[]).unwrap();
    assert_eq!(proxy.invoke("widen", vec![Value::Int(5)]).unwrap(), Value::Long(5));
    assert_eq!(entries(&log), ["Long", "Number"]);
}

#[test]
fn returning_filter_accepts_boxed_primitive_results() {
    let weaver = counter_weaver();
    let log = Log::default();
    let aspect = weaver.aspect("Results", 0).unwrap();
    for ty in ["int", "Number", "String"] {
        let l = log.clone();
        weaver
            .register(
                aspect,
                AdviceDefinition::after_returning(
                    format!("returns {ty}"),
                    "execution(* add(..))",
                    move |_, value| {
                        record(&l, format!("{ty}:{value}"));
                        Ok(())
                    },
                )
                .outcome_type(ty),
            )
            .unwrap();
    }

    let proxy = weaver.wrap(counter(), ProxyMode::Subclass, &[]).unwrap();
    proxy.invoke("add", vec![Value::Int(1)]).unwrap();
    assert_eq!(entries(&log), ["int:2", "Number:2"]);
}

// ── concurrency ─────────────────────────────────────────────────────────────

fn order_item(weaver: &Weaver) -> Arc<Signature> {
    weaver
        .catalog()
        .find_method(
            &TypeName::new(ORDER_SERVICE_IMPL),
            "orderItem",
            &[TypeName::new("String")],
        )
        .unwrap()
}

#[test]
fn concurrent_first_calls_all_run_the_complete_chain() {
    const THREADS: usize = 8;

    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let advised = Arc::new(AtomicUsize::new(0));
    let tx = weaver.aspect("TxAspect", 1).unwrap();
    let logging = weaver.aspect("LogAspect", 2).unwrap();

    let a = Arc::clone(&advised);
    weaver
        .register(
            tx,
            AdviceDefinition::around("doTransaction", "execution(* orderItem(..))", move |pjp| {
                a.fetch_add(1, Ordering::SeqCst);
                pjp.proceed()
            }),
        )
        .unwrap();
    let a = Arc::clone(&advised);
    weaver
        .register(
            logging,
            AdviceDefinition::before("doLog", "execution(* orderItem(..))", move |_| {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .unwrap();

    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Interface, &[])
        .unwrap();
    assert_eq!(proxy.cached_chains(), 0);

    let start = Barrier::new(THREADS);
    thread::scope(|scope| {
        for i in 0..THREADS {
            let (proxy, start) = (proxy.clone(), &start);
            scope.spawn(move || {
                start.wait();
                let item = format!("item{i}");
                let out = proxy.invoke("orderItem", vec![Value::str(&item)]).unwrap();
                assert_eq!(out, Value::str(format!("ordered {item}")));
            });
        }
    });

    assert_eq!(advised.load(Ordering::SeqCst), 2 * THREADS);
    assert_eq!(proxy.cached_chains(), 1);
    let chain = proxy.chain(&order_item(&weaver));
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.version(), weaver.registry().version());
}

#[test]
fn unregistering_mid_call_finishes_on_the_running_chain() {
    let weaver = Weaver::new(catalog());
    let log = Log::default();
    let aspect = weaver.aspect("OneShot", 0).unwrap();

    let own_id: Arc<OnceLock<AdviceId>> = Arc::default();
    let (w, id, l) = (weaver.clone(), Arc::clone(&own_id), log.clone());
    let one_shot = weaver
        .register(
            aspect,
            AdviceDefinition::around("oneShot", "execution(* orderItem(..))", move |pjp| {
                record(&l, "oneShot");
                if let Some(id) = id.get() {
                    w.unregister(*id)
                        .map_err(|e| pjp.fail(Fault::runtime(e.to_string())))?;
                }
                pjp.proceed()
            }),
        )
        .unwrap();
    own_id.set(one_shot).unwrap();
    let l = log.clone();
    weaver
        .register(
            aspect,
            AdviceDefinition::before("trace", "execution(* orderItem(..))", move |_| {
                record(&l, "trace");
                Ok(())
            }),
        )
        .unwrap();

    let proxy = weaver
        .wrap(OrderServiceImpl::new(&log), ProxyMode::Interface, &[])
        .unwrap();
    let version = weaver.registry().version();

    assert_eq!(
        proxy.invoke("orderItem", vec![Value::str("a")]).unwrap(),
        Value::str("ordered a")
    );
    assert_eq!(weaver.registry().version(), version + 1);
    assert_eq!(
        proxy.invoke("orderItem", vec![Value::str("b")]).unwrap(),
        Value::str("ordered b")
    );

    assert_eq!(
        entries(&log),
        ["oneShot", "trace", "call orderItem", "trace", "call orderItem"]
    );
    let chain = proxy.chain(&order_item(&weaver));
    assert_eq!(chain.version(), version + 1);
    assert_eq!(chain.len(), 1);
}

// ── narrowed views ──────────────────────────────────────────────────────────

const PRICING: &str = "hello.aop.shop.Pricing";
const BULK_PRICING: &str = "hello.aop.shop.BulkPricing";
const SHOP: &str = "hello.aop.shop.Shop";

struct Shop {
    ty: TypeName,
}

impl Target for Shop {
    fn type_name(&self) -> &TypeName {
        &self.ty
    }

    fn invoke(&self, method: &Signature, args: &[Value]) -> Result<Value, Fault> {
        match args {
            [Value::Str(item)] => Ok(Value::str(format!("price of {item}"))),
            [Value::Int(n)] => Ok(Value::str(format!("price of {n} units"))),
            _ => Err(Fault::new("UnsupportedOperationException", method.name())),
        }
    }
}

#[test]
fn view_only_reaches_overloads_of_its_own_type() {
    let mut catalog = TypeCatalog::with_builtins();
    catalog
        .register_all([
            TypeDescriptor::contract(PRICING)
                .method(Signature::builder("quote").param("String").returns("String"))
                .build()
                .unwrap(),
            TypeDescriptor::contract(BULK_PRICING)
                .method(Signature::builder("quote").param("int").returns("String"))
                .build()
                .unwrap(),
            TypeDescriptor::concrete(SHOP)
                .supertype(PRICING)
                .supertype(BULK_PRICING)
                .method(Signature::builder("quote").param("String").returns("String"))
                .method(Signature::builder("quote").param("int").returns("String"))
                .build()
                .unwrap(),
        ])
        .unwrap();
    let weaver = Weaver::new(catalog);
    let proxy = weaver
        .wrap(
            Arc::new(Shop {
                ty: TypeName::new(SHOP),
            }),
            ProxyMode::Interface,
            &[],
        )
        .unwrap();

    assert_eq!(
        proxy.invoke("quote", vec![Value::Int(3)]).unwrap(),
        Value::str("price of 3 units")
    );

    let pricing = proxy.cast(PRICING).unwrap();
    assert_eq!(
        pricing.invoke("quote", vec![Value::str("tea")]).unwrap(),
        Value::str("price of tea")
    );
    assert!(matches!(
        pricing.invoke("quote", vec![Value::Int(3)]),
        Err(InvocationError::NoSuchMethod { .. })
    ));
}

//! Pointcut behaviour through the public API.

use std::sync::Arc;

use weft_core::application::Weaver;
use weft_core::domain::{
    DomainError, Marker, Pointcut, ProxyMode, ProxyShape, RuntimeContext, Signature,
    TypeCatalog, TypeDescriptor, TypeName, Value, Verdict,
};
use weft_core::error::WeftError;

const SERVICE: &str = "hello.aop.member.MemberService";
const SERVICE_IMPL: &str = "hello.aop.member.MemberServiceImpl";
const METHOD_AOP: &str = "hello.aop.member.annotation.MethodAop";

fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::with_builtins();
    catalog
        .register_all([
            TypeDescriptor::marker(METHOD_AOP).build().unwrap(),
            TypeDescriptor::contract(SERVICE)
                .method(Signature::builder("hello").param("String").returns("String"))
                .build()
                .unwrap(),
            TypeDescriptor::concrete(SERVICE_IMPL)
                .supertype(SERVICE)
                .method(
                    Signature::builder("hello")
                        .param("String")
                        .returns("String")
                        .marker(Marker::with_value(METHOD_AOP, "test value")),
                )
                .method(Signature::builder("ping"))
                .method(Signature::builder("store").param("Object"))
                .build()
                .unwrap(),
        ])
        .unwrap();
    catalog
}

fn method(c: &TypeCatalog, name: &str, params: &[&str]) -> Arc<Signature> {
    let params: Vec<TypeName> = params.iter().copied().map(TypeName::new).collect();
    c.find_method(&TypeName::new(SERVICE_IMPL), name, &params)
        .unwrap()
}

fn via<'a>(shape: &'a ProxyShape, target: &'a TypeName) -> RuntimeContext<'a> {
    RuntimeContext::new().with_proxy(shape).with_target(target)
}

fn matches(c: &TypeCatalog, expr: &str, sig: &Signature) -> bool {
    Pointcut::parse(expr, c).unwrap().matches(c, sig)
}

#[test]
fn any_method_and_no_arg_patterns() {
    let c = catalog();
    let hello = method(&c, "hello", &["String"]);
    let ping = method(&c, "ping", &[]);

    assert!(matches(&c, "execution(* *(..))", &hello));
    assert!(matches(&c, "execution(* *(..))", &ping));
    assert!(matches(&c, "execution(* *())", &ping));
    assert!(!matches(&c, "execution(* *())", &hello));
}

#[test]
fn matching_is_repeatable() {
    let c = catalog();
    let hello = method(&c, "hello", &["String"]);
    let pointcut = Pointcut::parse("execution(* hello.aop..*(String, ..))", &c).unwrap();
    let first = pointcut.evaluate(&c, &hello, RuntimeContext::new());
    for _ in 0..10 {
        assert_eq!(pointcut.evaluate(&c, &hello, RuntimeContext::new()), first);
    }
    assert_eq!(first, Verdict::Always);
}

#[test]
fn args_accept_supertypes_where_execution_does_not() {
    let c = catalog();
    let hello = method(&c, "hello", &["String"]);
    assert!(matches(&c, "args(Object)", &hello));
    assert!(matches(&c, "args(Serializable)", &hello));
    assert!(!matches(&c, "execution(* *(Object))", &hello));
    assert!(matches(&c, "execution(* *(String))", &hello));
}

#[test]
fn args_use_runtime_types_of_actual_values() {
    let c = catalog();
    let store = method(&c, "store", &["Object"]);
    let pointcut = Pointcut::parse("args(String)", &c).unwrap();

    assert_eq!(
        pointcut.evaluate(&c, &store, RuntimeContext::new()),
        Verdict::Dynamic
    );
    let text = [Value::str("a string")];
    let number = [Value::Int(1)];
    assert_eq!(
        pointcut.evaluate(&c, &store, RuntimeContext::new().with_args(&text)),
        Verdict::Always
    );
    assert_eq!(
        pointcut.evaluate(&c, &store, RuntimeContext::new().with_args(&number)),
        Verdict::Never
    );
}

#[test]
fn within_is_exact_but_execution_accepts_declaring_supertype() {
    let c = catalog();
    let hello = method(&c, "hello", &["String"]);
    assert!(!matches(&c, &format!("within({SERVICE})"), &hello));
    assert!(matches(&c, &format!("within({SERVICE_IMPL})"), &hello));
    assert!(matches(&c, &format!("execution(* {SERVICE}.*(..))"), &hello));

    // `ping` is not declared on the contract.
    let ping = method(&c, "ping", &[]);
    assert!(!matches(&c, &format!("execution(* {SERVICE}.*(..))"), &ping));
}

#[test]
fn marker_capture_binds_the_marker_value() {
    let c = catalog();
    let hello = method(&c, "hello", &["String"]);
    let captures = [("aop".to_owned(), TypeName::new(METHOD_AOP))];
    let pointcut = Pointcut::parse_with(
        "execution(* hello.aop..*(..)) && @annotation(aop)",
        &c,
        &captures,
        &Default::default(),
    )
    .unwrap();

    let bindings = pointcut
        .bindings(&c, &hello, RuntimeContext::new())
        .unwrap();
    let marker = bindings.marker("aop").unwrap();
    assert_eq!(marker.value, Some(Value::str("test value")));
}

#[test]
fn this_and_target_depend_on_proxy_shape() {
    let c = catalog();
    let hello = method(&c, "hello", &["String"]);
    let interface = ProxyShape::new(
        ProxyMode::Interface,
        TypeName::new(SERVICE_IMPL),
        vec![TypeName::new(SERVICE)],
    );
    let subclass = ProxyShape::new(
        ProxyMode::Subclass,
        TypeName::new(SERVICE_IMPL),
        vec![TypeName::new(SERVICE)],
    );
    let target = TypeName::new(SERVICE_IMPL);

    let this_impl = Pointcut::parse(&format!("this({SERVICE_IMPL})"), &c).unwrap();
    let target_impl = Pointcut::parse(&format!("target({SERVICE_IMPL})"), &c).unwrap();

    assert_eq!(
        this_impl.evaluate(&c, &hello, via(&interface, &target)),
        Verdict::Never
    );
    assert_eq!(
        this_impl.evaluate(&c, &hello, via(&subclass, &target)),
        Verdict::Always
    );
    assert_eq!(
        target_impl.evaluate(&c, &hello, via(&interface, &target)),
        Verdict::Always
    );
    assert_eq!(this_impl.evaluate(&c, &hello, RuntimeContext::new()), Verdict::Dynamic);
}

#[test]
fn unknown_reference_reports_its_position() {
    let weaver = Weaver::new(catalog());
    let err = weaver.parse("execution(* *(..)) && missing()").unwrap_err();
    match err {
        WeftError::Domain(DomainError::PointcutSyntax {
            position, fragment, ..
        }) => {
            assert_eq!(position, 22);
            assert_eq!(fragment, "missing");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wildcards_are_rejected_in_this() {
    let c = catalog();
    let err = Pointcut::parse("this(hello.aop..*)", &c).unwrap_err();
    assert!(matches!(err, DomainError::PointcutSyntax { .. }));
}

#[test]
fn named_pointcuts_compose() {
    let weaver = Weaver::new(catalog());
    weaver
        .define_pointcut("allMember", "execution(* hello.aop.member..*(..))")
        .unwrap();
    weaver
        .define_pointcut("helloOnly", "execution(* hello(..))")
        .unwrap();

    let combined = weaver.parse("allMember() && helloOnly()").unwrap();
    let c = weaver.catalog();
    assert!(combined.matches(c, &method(c, "hello", &["String"])));
    assert!(!combined.matches(c, &method(c, "ping", &[])));

    let duplicate = weaver.define_pointcut("allMember", "execution(* *(..))");
    assert!(matches!(
        duplicate,
        Err(WeftError::Domain(DomainError::DuplicatePointcut { .. }))
    ));
}

#[test]
fn primitive_parameters_bind_at_runtime() {
    let mut c = catalog();
    c.register(
        TypeDescriptor::concrete("hello.aop.calc.Counter")
            .method(Signature::builder("add").param("int").returns("int"))
            .build()
            .unwrap(),
    )
    .unwrap();
    let add = c
        .find_method(
            &TypeName::new("hello.aop.calc.Counter"),
            "add",
            &[TypeName::new("int")],
        )
        .unwrap();
    let captures = [("n".to_owned(), TypeName::new("int"))];
    let pointcut = Pointcut::parse_with("args(n)", &c, &captures, &Default::default()).unwrap();

    assert_eq!(
        pointcut.evaluate(&c, &add, RuntimeContext::new()),
        Verdict::Always
    );
    let args = [Value::Int(3)];
    let bindings = pointcut
        .bindings(&c, &add, RuntimeContext::new().with_args(&args))
        .unwrap();
    assert_eq!(bindings.value("n"), Some(&Value::Int(3)));

    let boxed = Pointcut::parse("args(Integer)", &c).unwrap();
    assert_eq!(
        boxed.evaluate(&c, &add, RuntimeContext::new().with_args(&args)),
        Verdict::Always
    );
}

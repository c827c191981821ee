//! Core domain layer for Weft.
//!
//! Pure, synchronous logic: the signature model, the type catalog that stands
//! in for runtime reflection, and the pointcut language. Nothing here knows
//! about advice execution or proxies; those live in the application layer.
//!
//! ## Rules
//!
//! - **No I/O**: catalogs are built by adapters and handed in
//! - **Immutable after construction**: signatures and parsed pointcuts are
//!   shared as `Arc`s and never change
//! - **Validation up front**: a pointcut that parses can always be matched

pub mod entities;
pub mod error;
pub mod pointcut;
pub mod value_objects;

pub use entities::{
    Fault, Instantiation, Signature, SignatureBuilder, TypeCatalog, TypeDescriptor,
    TypeDescriptorBuilder, TypeKind,
};
pub use error::{DomainError, ErrorCategory};
pub use pointcut::{
    Binding, Bindings, Pointcut, PointcutLibrary, ProxyShape, RuntimeContext, TypePattern, Verdict,
};
pub use value_objects::{
    AdviceId, AspectId, Marker, ObjectValue, Phase, ProxyId, ProxyMode, TypeName, Value, Visibility,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TypeName {
        TypeName::new(s)
    }

    /// `MemberService` / `MemberServiceImpl` with a class-level and a
    /// method-level marker.
    fn member_catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::with_builtins();
        catalog
            .register_all([
                TypeDescriptor::marker("hello.aop.member.annotation.ClassAop")
                    .build()
                    .unwrap(),
                TypeDescriptor::marker("hello.aop.member.annotation.MethodAop")
                    .build()
                    .unwrap(),
                TypeDescriptor::contract("hello.aop.member.MemberService")
                    .method(Signature::builder("hello").param("String").returns("String"))
                    .build()
                    .unwrap(),
                TypeDescriptor::concrete("hello.aop.member.MemberServiceImpl")
                    .supertype("hello.aop.member.MemberService")
                    .marker(Marker::new("hello.aop.member.annotation.ClassAop"))
                    .method(
                        Signature::builder("hello")
                            .param("String")
                            .returns("String")
                            .marker(Marker::with_value(
                                "hello.aop.member.annotation.MethodAop",
                                "test value",
                            )),
                    )
                    .method(Signature::builder("internal").param("String").returns("String"))
                    .build()
                    .unwrap(),
            ])
            .unwrap();
        catalog.validate().unwrap();
        catalog
    }

    fn method(c: &TypeCatalog, name: &str) -> std::sync::Arc<Signature> {
        c.find_method(&t("hello.aop.member.MemberServiceImpl"), name, &[t("String")])
            .unwrap()
    }

    fn matches(c: &TypeCatalog, expr: &str, name: &str) -> bool {
        Pointcut::parse(expr, c).unwrap().matches(c, &method(c, name))
    }

    // ========================================================================
    // execution
    // ========================================================================

    #[test]
    fn exact_execution_match() {
        let c = member_catalog();
        assert!(matches(
            &c,
            "execution(public String hello.aop.member.MemberServiceImpl.hello(String))",
            "hello"
        ));
    }

    #[test]
    fn all_wildcards_match_everything() {
        let c = member_catalog();
        assert!(matches(&c, "execution(* *(..))", "hello"));
        assert!(matches(&c, "execution(* *(..))", "internal"));
    }

    #[test]
    fn name_globs() {
        let c = member_catalog();
        assert!(matches(&c, "execution(* hel*(..))", "hello"));
        assert!(matches(&c, "execution(* *el*(..))", "hello"));
        assert!(!matches(&c, "execution(* nono(..))", "hello"));
    }

    #[test]
    fn package_patterns() {
        let c = member_catalog();
        assert!(matches(&c, "execution(* hello.aop.member.*.*(..))", "hello"));
        assert!(!matches(&c, "execution(* hello.aop.*.*(..))", "hello"));
        assert!(matches(&c, "execution(* hello.aop..*.*(..))", "hello"));
        assert!(matches(&c, "execution(* hello.aop.member..*.*(..))", "hello"));
    }

    #[test]
    fn supertype_pattern_only_covers_declared_members() {
        let c = member_catalog();
        let expr = "execution(* hello.aop.member.MemberService.*(..))";
        assert!(matches(&c, expr, "hello"));
        assert!(!matches(&c, expr, "internal"));
    }

    #[test]
    fn parameter_patterns() {
        let c = member_catalog();
        assert!(matches(&c, "execution(* *(String))", "hello"));
        assert!(!matches(&c, "execution(* *())", "hello"));
        assert!(matches(&c, "execution(* *(*))", "hello"));
        assert!(!matches(&c, "execution(* *(*, *))", "hello"));
        assert!(matches(&c, "execution(* *(String, ..))", "hello"));
    }

    // ========================================================================
    // within / args / markers
    // ========================================================================

    #[test]
    fn within_does_not_see_supertypes() {
        let c = member_catalog();
        assert!(matches(&c, "within(hello.aop.member.MemberServiceImpl)", "hello"));
        assert!(matches(&c, "within(hello.aop..*)", "hello"));
        assert!(!matches(&c, "within(hello.aop.member.MemberService)", "hello"));
    }

    #[test]
    fn args_static_uses_assignability() {
        let c = member_catalog();
        assert!(matches(&c, "args(String)", "hello"));
        assert!(matches(&c, "args(Object)", "hello"));
        assert!(matches(&c, "args(Serializable)", "hello"));
        assert!(!matches(&c, "args()", "hello"));
        assert!(matches(&c, "args(..)", "hello"));
        assert!(matches(&c, "args(*)", "hello"));
        assert!(matches(&c, "args(String, ..)", "hello"));
        assert!(!matches(&c, "args(Integer)", "hello"));
    }

    #[test]
    fn execution_params_do_not_use_assignability() {
        let c = member_catalog();
        assert!(!matches(&c, "execution(* *(Object))", "hello"));
    }

    #[test]
    fn method_and_type_markers() {
        let c = member_catalog();
        assert!(matches(&c, "@annotation(hello.aop.member.annotation.MethodAop)", "hello"));
        assert!(!matches(&c, "@annotation(hello.aop.member.annotation.MethodAop)", "internal"));
        assert!(matches(&c, "@within(hello.aop.member.annotation.ClassAop)", "internal"));
    }

    #[test]
    fn target_marker_needs_runtime_target() {
        let c = member_catalog();
        let p = Pointcut::parse("@target(hello.aop.member.annotation.ClassAop)", &c).unwrap();
        let sig = method(&c, "hello");
        assert_eq!(p.evaluate(&c, &sig, RuntimeContext::new()), Verdict::Dynamic);

        let target = t("hello.aop.member.MemberServiceImpl");
        assert_eq!(
            p.evaluate(&c, &sig, RuntimeContext::new().with_target(&target)),
            Verdict::Always
        );
    }

    #[test]
    fn marker_capture_binds_marker_value() {
        let c = member_catalog();
        let captures = vec![(
            "aop".to_string(),
            t("hello.aop.member.annotation.MethodAop"),
        )];
        let p = Pointcut::parse_with(
            "execution(* hello(..)) && @annotation(aop)",
            &c,
            &captures,
            &PointcutLibrary::new(),
        )
        .unwrap();
        let args = [Value::str("helloA")];
        let bindings = p
            .bindings(&c, &method(&c, "hello"), RuntimeContext::new().with_args(&args))
            .unwrap();
        assert_eq!(
            bindings.marker("aop").and_then(|m| m.value.clone()),
            Some(Value::str("test value"))
        );
    }

    // ========================================================================
    // this / target
    // ========================================================================

    #[test]
    fn this_depends_on_proxy_shape() {
        let c = member_catalog();
        let sig = method(&c, "hello");
        let p = Pointcut::parse("this(hello.aop.member.MemberServiceImpl)", &c).unwrap();

        let interface = ProxyShape::new(
            ProxyMode::Interface,
            t("hello.aop.member.MemberServiceImpl"),
            vec![t("hello.aop.member.MemberService")],
        );
        let subclass = ProxyShape::new(
            ProxyMode::Subclass,
            t("hello.aop.member.MemberServiceImpl"),
            vec![],
        );
        assert_eq!(
            p.evaluate(&c, &sig, RuntimeContext::new().with_proxy(&interface)),
            Verdict::Never
        );
        assert_eq!(
            p.evaluate(&c, &sig, RuntimeContext::new().with_proxy(&subclass)),
            Verdict::Always
        );
    }

    #[test]
    fn target_sees_the_real_object() {
        let c = member_catalog();
        let sig = method(&c, "hello");
        let p = Pointcut::parse("target(hello.aop.member.MemberService)", &c).unwrap();
        let target = t("hello.aop.member.MemberServiceImpl");
        assert_eq!(
            p.evaluate(&c, &sig, RuntimeContext::new().with_target(&target)),
            Verdict::Always
        );
    }

    #[test]
    fn negation_and_disjunction() {
        let c = member_catalog();
        assert!(matches(
            &c,
            "within(hello.aop..*) && !execution(* internal(..))",
            "hello"
        ));
        assert!(!matches(
            &c,
            "within(hello.aop..*) && !execution(* internal(..))",
            "internal"
        ));
        assert!(matches(&c, "execution(* nope(..)) || within(hello..*)", "internal"));
    }
}

//! Evaluation of parsed pointcuts against a join point.
//!
//! Static designators (`execution`, `within`, `@annotation`, `@within`) are
//! decided from the signature and catalog alone. `args` consults argument
//! values when present and otherwise reports whether the declared types make
//! a match certain, possible or impossible. `this`, `target` and `@target`
//! need the proxy shape / target type.

use crate::domain::{
    entities::{Signature, TypeCatalog},
    pointcut::{
        ast::{ArgPattern, Capture, ExecutionPattern, Expr, TypeRef},
        context::{Binding, Bindings, RuntimeContext, Verdict},
        pattern::{glob, match_params, TypePattern},
    },
    value_objects::{Marker, TypeName},
};

pub(crate) struct Evaluator<'a> {
    pub catalog: &'a TypeCatalog,
    pub signature: &'a Signature,
    pub runtime: RuntimeContext<'a>,
}

impl Evaluator<'_> {
    /// Short-circuits left to right.
    pub fn evaluate(&self, expr: &Expr) -> Verdict {
        match expr {
            Expr::And(l, r) => {
                let left = self.evaluate(l);
                if left.is_never() {
                    return Verdict::Never;
                }
                both(left, self.evaluate(r))
            }
            Expr::Or(l, r) => {
                let left = self.evaluate(l);
                if left == Verdict::Always {
                    return Verdict::Always;
                }
                match (left, self.evaluate(r)) {
                    (_, Verdict::Always) => Verdict::Always,
                    (Verdict::Never, Verdict::Never) => Verdict::Never,
                    _ => Verdict::Dynamic,
                }
            }
            Expr::Not(inner) => self.evaluate(inner).negate(),
            Expr::Execution(pattern) => Verdict::from_bool(self.execution(pattern)),
            Expr::Within(pattern) => Verdict::from_bool(pattern.matches(self.signature.declaring_type())),
            Expr::Args(items) => self.args(items),
            Expr::MethodMarker(r) => {
                Verdict::from_bool(self.marker_in(self.signature.markers(), r.ty()).is_some())
            }
            Expr::WithinMarker(r) => {
                let markers = self.catalog.markers_of(self.signature.declaring_type());
                Verdict::from_bool(self.marker_in(markers, r.ty()).is_some())
            }
            Expr::TargetMarker(r) => match self.runtime.target {
                Some(target) => {
                    let markers = self.catalog.markers_of(target);
                    Verdict::from_bool(self.marker_in(markers, r.ty()).is_some())
                }
                None => Verdict::Dynamic,
            },
            Expr::This(r) => match self.runtime.proxy {
                Some(proxy) => Verdict::from_bool(proxy.is_instance_of(self.catalog, r.ty())),
                None => Verdict::Dynamic,
            },
            Expr::Target(r) => match self.runtime.target {
                Some(target) => Verdict::from_bool(self.catalog.is_assignable(target, r.ty())),
                None => Verdict::Dynamic,
            },
            Expr::Reference { body, .. } => self.evaluate(body),
        }
    }

    fn execution(&self, p: &ExecutionPattern) -> bool {
        let sig = self.signature;
        if p.visibility.is_some_and(|v| v != sig.visibility()) {
            return false;
        }
        if !p.returns.matches(sig.return_type())
            || !glob(&p.name, sig.name())
            || !match_params(&p.params, sig.parameter_types())
        {
            return false;
        }
        let throws_ok = p
            .throws
            .iter()
            .all(|t| sig.exceptions().iter().any(|e| t.matches(e)));
        if !throws_ok {
            return false;
        }
        p.declaring
            .as_ref()
            .is_none_or(|declaring| self.declaring_matches(declaring))
    }

    /// The declaring-type segment accepts the declaring type itself, or any
    /// supertype that declares a member of the same shape.
    fn declaring_matches(&self, pattern: &TypePattern) -> bool {
        let declaring = self.signature.declaring_type();
        if pattern.matches(declaring) {
            return true;
        }
        self.catalog.ancestors(declaring).iter().any(|ancestor| {
            pattern.matches(ancestor) && self.catalog.declares_method(ancestor, self.signature)
        })
    }

    fn args(&self, items: &[ArgPattern]) -> Verdict {
        match self.runtime.args {
            Some(values) => {
                let params = self.signature.parameter_types();
                let runtime: Vec<Option<TypeName>> = values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| match params.get(i) {
                        Some(declared) => self.catalog.runtime_type_in(declared, value),
                        None => value.runtime_type(),
                    })
                    .collect();
                match_args(items, &runtime, &|ty, actual: &Option<TypeName>| match actual {
                    Some(actual) => Verdict::from_bool(self.catalog.conforms(actual, ty)),
                    None => Verdict::Never,
                })
            }
            None => match_args(items, self.signature.parameter_types(), &|ty, declared| {
                if self.catalog.is_assignable_boxing(declared, ty)
                    || self.catalog.conforms(declared, ty)
                {
                    Verdict::Always
                } else if self.catalog.is_assignable(ty, declared) {
                    // A subtype of the declared parameter may arrive at runtime.
                    Verdict::Dynamic
                } else {
                    Verdict::Never
                }
            }),
        }
    }

    fn marker_in<'m>(&self, markers: &'m [Marker], ty: &TypeName) -> Option<&'m Marker> {
        markers
            .iter()
            .find(|m| self.catalog.is_assignable(&m.kind, ty))
    }

    // ── bindings ──────────────────────────────────────────────────────────

    /// Collect capture values. Captures only occur under `&&` (the parser
    /// rejects them elsewhere), so every capture on the tree is reachable.
    pub fn bind(&self, expr: &Expr, out: &mut Bindings) {
        match expr {
            Expr::And(l, r) => {
                self.bind(l, out);
                self.bind(r, out);
            }
            Expr::Reference { body, .. } => self.bind(body, out),
            Expr::Args(items) => {
                let Some(values) = self.runtime.args else {
                    return;
                };
                for (k, item) in items.iter().enumerate() {
                    if let ArgPattern::Capture(c) = item
                        && let Some(value) = arg_position(items, k, values.len())
                            .and_then(|i| values.get(i))
                    {
                        out.insert(&c.name, Binding::Value(value.clone()));
                    }
                }
            }
            Expr::MethodMarker(TypeRef::Capture(c)) => {
                self.bind_marker(self.signature.markers(), c, out);
            }
            Expr::WithinMarker(TypeRef::Capture(c)) => {
                let markers = self.catalog.markers_of(self.signature.declaring_type());
                self.bind_marker(markers, c, out);
            }
            Expr::TargetMarker(TypeRef::Capture(c)) => {
                if let Some(target) = self.runtime.target {
                    self.bind_marker(self.catalog.markers_of(target), c, out);
                }
            }
            Expr::This(TypeRef::Capture(c)) => {
                if let Some(proxy) = self.runtime.proxy {
                    out.insert(&c.name, Binding::This(TypeName::new(proxy.display_name())));
                }
            }
            Expr::Target(TypeRef::Capture(c)) => {
                if let Some(target) = self.runtime.target {
                    out.insert(&c.name, Binding::Target(target.clone()));
                }
            }
            _ => {}
        }
    }

    fn bind_marker(&self, markers: &[Marker], capture: &Capture, out: &mut Bindings) {
        if let Some(marker) = self.marker_in(markers, &capture.ty) {
            out.insert(&capture.name, Binding::Marker(marker.clone()));
        }
    }
}

fn both(left: Verdict, right: Verdict) -> Verdict {
    match (left, right) {
        (_, Verdict::Never) | (Verdict::Never, _) => Verdict::Never,
        (Verdict::Always, Verdict::Always) => Verdict::Always,
        _ => Verdict::Dynamic,
    }
}

/// Positional match of an `args(..)` list; `test` judges one element.
fn match_args<T>(
    items: &[ArgPattern],
    xs: &[T],
    test: &dyn Fn(&TypeName, &T) -> Verdict,
) -> Verdict {
    match items.split_first() {
        None => Verdict::from_bool(xs.is_empty()),
        Some((ArgPattern::Rest, rest)) => {
            let mut best = Verdict::Never;
            for skip in 0..=xs.len() {
                match match_args(rest, &xs[skip..], test) {
                    Verdict::Always => return Verdict::Always,
                    Verdict::Dynamic => best = Verdict::Dynamic,
                    Verdict::Never => {}
                }
            }
            best
        }
        Some((ArgPattern::One, rest)) => match xs.split_first() {
            Some((_, tail)) => match_args(rest, tail, test),
            None => Verdict::Never,
        },
        Some((ArgPattern::Type(ty) | ArgPattern::Capture(Capture { ty, .. }), rest)) => {
            match xs.split_first() {
                Some((x, tail)) => {
                    let head = test(ty, x);
                    if head.is_never() {
                        Verdict::Never
                    } else {
                        both(head, match_args(rest, tail, test))
                    }
                }
                None => Verdict::Never,
            }
        }
    }
}

/// Argument index an `args(..)` element refers to. Elements after a `..`
/// count from the end.
fn arg_position(items: &[ArgPattern], k: usize, arg_count: usize) -> Option<usize> {
    match items.iter().position(|i| matches!(i, ArgPattern::Rest)) {
        Some(rest) if k > rest => arg_count.checked_sub(items.len() - k),
        _ => Some(k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_positions_after_rest_count_from_end() {
        let items = vec![ArgPattern::Rest, ArgPattern::One, ArgPattern::One];
        assert_eq!(arg_position(&items, 2, 5), Some(4));
        assert_eq!(arg_position(&items, 1, 5), Some(3));

        let items = vec![ArgPattern::One, ArgPattern::Rest];
        assert_eq!(arg_position(&items, 0, 3), Some(0));
    }

    #[test]
    fn conjunction_table() {
        use Verdict::*;
        assert_eq!(both(Always, Always), Always);
        assert_eq!(both(Always, Dynamic), Dynamic);
        assert_eq!(both(Dynamic, Never), Never);
    }
}

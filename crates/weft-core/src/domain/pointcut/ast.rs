//! Parsed pointcut trees and their canonical rendering.

use std::fmt;
use std::sync::Arc;

use crate::domain::{
    pointcut::pattern::{ParamPattern, TypePattern},
    value_objects::{TypeName, Visibility},
};

/// A capture variable: a bare identifier that binds a value for the advice
/// body and restricts the match to its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Capture {
    pub name: String,
    pub ty: TypeName,
    /// Byte offset in the source expression, for diagnostics.
    pub position: usize,
}

/// Operand of `this`, `target` and the `@` designators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TypeRef {
    Type(TypeName),
    Capture(Capture),
}

impl TypeRef {
    /// The type the operand is tested against.
    pub fn ty(&self) -> &TypeName {
        match self {
            Self::Type(t) => t,
            Self::Capture(c) => &c.ty,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(t) => write!(f, "{t}"),
            Self::Capture(c) => f.write_str(&c.name),
        }
    }
}

/// One element of an `args(...)` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ArgPattern {
    One,
    Rest,
    Type(TypeName),
    Capture(Capture),
}

impl fmt::Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("*"),
            Self::Rest => f.write_str(".."),
            Self::Type(t) => write!(f, "{t}"),
            Self::Capture(c) => f.write_str(&c.name),
        }
    }
}

/// `[visibility] returnType [declaringType.]name(params) [throws ...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExecutionPattern {
    pub visibility: Option<Visibility>,
    pub returns: TypePattern,
    pub declaring: Option<TypePattern>,
    pub name: String,
    pub params: Vec<ParamPattern>,
    pub throws: Vec<TypePattern>,
}

impl fmt::Display for ExecutionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.visibility {
            write!(f, "{v} ")?;
        }
        write!(f, "{} ", self.returns)?;
        if let Some(d) = &self.declaring {
            write!(f, "{d}.")?;
        }
        write!(f, "{}(", self.name)?;
        write_list(f, &self.params)?;
        f.write_str(")")?;
        if !self.throws.is_empty() {
            f.write_str(" throws ")?;
            write_list(f, &self.throws)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Execution(ExecutionPattern),
    Within(TypePattern),
    Args(Vec<ArgPattern>),
    /// `@annotation(..)`: marker on the method.
    MethodMarker(TypeRef),
    /// `@within(..)`: marker on the declaring type.
    WithinMarker(TypeRef),
    /// `@target(..)`: marker on the runtime target type.
    TargetMarker(TypeRef),
    This(TypeRef),
    Target(TypeRef),
    /// A named pointcut, expanded at parse time.
    Reference { name: String, body: Arc<Expr> },
}

impl Expr {
    fn precedence(&self) -> u8 {
        match self {
            Self::Or(..) => 1,
            Self::And(..) => 2,
            _ => 3,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }

    /// Visit every capture in the tree with whether it sits under `||` or `!`.
    pub fn for_each_capture<'a>(&'a self, guarded: bool, visit: &mut impl FnMut(&'a Capture, bool)) {
        match self {
            Self::And(l, r) => {
                l.for_each_capture(guarded, visit);
                r.for_each_capture(guarded, visit);
            }
            Self::Or(l, r) => {
                l.for_each_capture(true, visit);
                r.for_each_capture(true, visit);
            }
            Self::Not(e) => e.for_each_capture(true, visit),
            Self::Args(items) => {
                for item in items {
                    if let ArgPattern::Capture(c) = item {
                        visit(c, guarded);
                    }
                }
            }
            Self::MethodMarker(r)
            | Self::WithinMarker(r)
            | Self::TargetMarker(r)
            | Self::This(r)
            | Self::Target(r) => {
                if let TypeRef::Capture(c) = r {
                    visit(c, guarded);
                }
            }
            Self::Reference { body, .. } => body.for_each_capture(guarded, visit),
            Self::Execution(_) | Self::Within(_) => {}
        }
    }

    /// Render with named references expanded, one node per line.
    pub fn write_tree(&self, out: &mut String, depth: usize) {
        let pad = "  ".repeat(depth);
        match self {
            Self::And(l, r) => {
                out.push_str(&format!("{pad}&&\n"));
                l.write_tree(out, depth + 1);
                r.write_tree(out, depth + 1);
            }
            Self::Or(l, r) => {
                out.push_str(&format!("{pad}||\n"));
                l.write_tree(out, depth + 1);
                r.write_tree(out, depth + 1);
            }
            Self::Not(e) => {
                out.push_str(&format!("{pad}!\n"));
                e.write_tree(out, depth + 1);
            }
            Self::Reference { name, body } => {
                out.push_str(&format!("{pad}{name}()\n"));
                body.write_tree(out, depth + 1);
            }
            leaf => out.push_str(&format!("{pad}{leaf}\n")),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(l, r) => {
                l.write_operand(f, 2)?;
                f.write_str(" && ")?;
                r.write_operand(f, 2)
            }
            Self::Or(l, r) => {
                l.write_operand(f, 1)?;
                f.write_str(" || ")?;
                r.write_operand(f, 1)
            }
            Self::Not(e) => {
                f.write_str("!")?;
                e.write_operand(f, 3)
            }
            Self::Execution(p) => write!(f, "execution({p})"),
            Self::Within(p) => write!(f, "within({p})"),
            Self::Args(items) => {
                f.write_str("args(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Self::MethodMarker(r) => write!(f, "@annotation({r})"),
            Self::WithinMarker(r) => write!(f, "@within({r})"),
            Self::TargetMarker(r) => write!(f, "@target({r})"),
            Self::This(r) => write!(f, "this({r})"),
            Self::Target(r) => write!(f, "target({r})"),
            Self::Reference { name, .. } => write!(f, "{name}()"),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

//! Name and type patterns with `*` and `..` wildcards.
//!
//! - `*` inside a segment matches any run of characters in that segment;
//!   a lone `*` type pattern matches every type.
//! - `..` between segments matches zero or more whole segments; a trailing
//!   `..` is read as `..*`.

use std::fmt;

use crate::domain::value_objects::TypeName;

// ── glob ──────────────────────────────────────────────────────────────────────

/// Single-segment wildcard match: `*` matches any (possibly empty) run.
pub(crate) fn glob(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&b| b == b'*')
}

// ── TypePattern ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Element {
    Segment(String),
    Ellipsis,
}

/// A dotted type pattern such as `hello.aop..*Service*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePattern {
    elements: Vec<Element>,
}

impl TypePattern {
    /// Parse a pattern. The error is a human-readable reason.
    pub(crate) fn parse(text: &str) -> Result<Self, String> {
        if text.is_empty() {
            return Err("empty type pattern".into());
        }
        if text.contains("...") {
            return Err("'...' is not a wildcard; use '..'".into());
        }
        if text.starts_with('.') && !text.starts_with("..") {
            return Err("type pattern cannot start with '.'".into());
        }

        let mut elements = Vec::new();
        let mut rest = text;
        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix("..") {
                elements.push(Element::Ellipsis);
                rest = after;
                continue;
            }
            if let Some(after) = rest.strip_prefix('.') {
                rest = after;
                if rest.is_empty() {
                    return Err("type pattern cannot end with '.'".into());
                }
                continue;
            }
            let end = rest.find('.').unwrap_or(rest.len());
            let segment = &rest[..end];
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '*' | '[' | ']'))
            {
                return Err(format!("invalid segment '{segment}'"));
            }
            elements.push(Element::Segment(segment.to_owned()));
            rest = &rest[end..];
        }

        if elements.last() == Some(&Element::Ellipsis) {
            elements.push(Element::Segment("*".into()));
        }
        Ok(Self { elements })
    }

    /// `true` for the lone `*`.
    pub fn is_any(&self) -> bool {
        matches!(self.elements.as_slice(), [Element::Segment(s)] if s == "*")
    }

    /// `true` if the pattern contains no wildcard at all.
    pub fn is_exact(&self) -> bool {
        self.elements.iter().all(|e| match e {
            Element::Segment(s) => !s.contains('*'),
            Element::Ellipsis => false,
        })
    }

    pub fn matches(&self, name: &TypeName) -> bool {
        if self.is_any() {
            return true;
        }
        let segments: Vec<&str> = name.segments().collect();
        match_elements(&self.elements, &segments)
    }
}

fn match_elements(elements: &[Element], segments: &[&str]) -> bool {
    match elements.split_first() {
        None => segments.is_empty(),
        Some((Element::Ellipsis, rest)) => {
            (0..=segments.len()).any(|skip| match_elements(rest, &segments[skip..]))
        }
        Some((Element::Segment(p), rest)) => segments
            .split_first()
            .is_some_and(|(s, tail)| glob(p, s) && match_elements(rest, tail)),
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut previous_was_segment = false;
        for element in &self.elements {
            match element {
                Element::Ellipsis => {
                    f.write_str("..")?;
                    previous_was_segment = false;
                }
                Element::Segment(s) => {
                    if previous_was_segment {
                        f.write_str(".")?;
                    }
                    f.write_str(s)?;
                    previous_was_segment = true;
                }
            }
        }
        Ok(())
    }
}

// ── Parameter lists ───────────────────────────────────────────────────────────

/// One element of an `execution(...)` parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ParamPattern {
    /// `*`: exactly one parameter of any type.
    One,
    /// `..`: zero or more parameters of any type.
    Rest,
    /// A type pattern matched against the declared parameter type by name.
    Type(TypePattern),
}

impl ParamPattern {
    pub fn parse(text: &str) -> Result<Self, String> {
        match text {
            "*" => Ok(Self::One),
            ".." => Ok(Self::Rest),
            other => TypePattern::parse(other).map(Self::Type),
        }
    }
}

impl fmt::Display for ParamPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => f.write_str("*"),
            Self::Rest => f.write_str(".."),
            Self::Type(t) => write!(f, "{t}"),
        }
    }
}

/// Structural match of a parameter pattern list against declared types.
pub(crate) fn match_params(patterns: &[ParamPattern], params: &[TypeName]) -> bool {
    match patterns.split_first() {
        None => params.is_empty(),
        Some((ParamPattern::Rest, rest)) => {
            (0..=params.len()).any(|skip| match_params(rest, &params[skip..]))
        }
        Some((ParamPattern::One, rest)) => {
            !params.is_empty() && match_params(rest, &params[1..])
        }
        Some((ParamPattern::Type(t), rest)) => params
            .split_first()
            .is_some_and(|(p, tail)| t.matches(p) && match_params(rest, tail)),
    }
}

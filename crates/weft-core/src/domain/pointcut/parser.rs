//! Recursive-descent parser for the pointcut language.
//!
//! ```text
//! or      := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | primary
//! primary := '(' or ')'
//!          | 'execution' '(' execution ')'
//!          | 'within' '(' type-pattern ')'
//!          | 'args' '(' [arg (',' arg)*] ')'
//!          | ('this' | 'target') '(' type-ref ')'
//!          | '@' ('annotation' | 'within' | 'target') '(' type-ref ')'
//!          | name '(' ')'                      -- named pointcut
//! ```
//!
//! All validation happens here: once an expression parses, matching it can
//! never fail.

use std::sync::Arc;

use crate::domain::{
    entities::TypeCatalog,
    error::DomainError,
    pointcut::{
        ast::{ArgPattern, Capture, ExecutionPattern, Expr, TypeRef},
        lexer::{Token, TokenKind, tokenize},
        library::PointcutLibrary,
        pattern::{ParamPattern, TypePattern},
    },
    value_objects::{TypeName, Visibility},
};

/// Everything a parse may consult.
pub(crate) struct ParseScope<'a> {
    pub catalog: &'a TypeCatalog,
    /// Capture names declared by the advice, with their declared types.
    pub captures: &'a [(String, TypeName)],
    pub library: &'a PointcutLibrary,
}

pub(crate) fn parse(src: &str, scope: &ParseScope<'_>) -> Result<Expr, DomainError> {
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(DomainError::syntax(src, 0, "", "empty pointcut expression"));
    }

    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        scope,
    };
    let expr = parser.or()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error_at(extra, "unexpected input after expression"));
    }

    check_captures(src, &expr, scope.captures)?;
    Ok(expr)
}

struct Parser<'s, 'a> {
    src: &'s str,
    tokens: Vec<Token>,
    pos: usize,
    scope: &'a ParseScope<'a>,
}

impl Parser<'_, '_> {
    // ── token plumbing ────────────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> DomainError {
        DomainError::syntax(
            self.src,
            token.start,
            &self.src[token.start..token.end],
            message,
        )
    }

    fn error_at_end(&self, message: impl Into<String>) -> DomainError {
        DomainError::syntax(self.src, self.src.len(), "<end>", message)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, DomainError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.error_at(&token, format!("expected {what}"))),
            None => Err(self.error_at_end(format!("expected {what}"))),
        }
    }

    fn expect_word(&mut self, what: &str) -> Result<(String, Token), DomainError> {
        match self.advance() {
            Some(token) => match token.word() {
                Some(w) => Ok((w.to_owned(), token)),
                None => Err(self.error_at(&token, format!("expected {what}"))),
            },
            None => Err(self.error_at_end(format!("expected {what}"))),
        }
    }

    // ── boolean structure ─────────────────────────────────────────────────

    fn or(&mut self) -> Result<Expr, DomainError> {
        let mut left = self.and()?;
        while self.peek_kind() == Some(&TokenKind::Or) {
            self.advance();
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, DomainError> {
        let mut left = self.unary()?;
        while self.peek_kind() == Some(&TokenKind::And) {
            self.advance();
            let right = self.unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, DomainError> {
        if self.peek_kind() == Some(&TokenKind::Not) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, DomainError> {
        let Some(token) = self.advance() else {
            return Err(self.error_at_end("expected a pointcut designator"));
        };

        match &token.kind {
            TokenKind::LParen => {
                let inner = self.or()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            TokenKind::At => self.marker_designator(),
            TokenKind::Word(word) => match word.as_str() {
                "execution" => {
                    self.expect(TokenKind::LParen, "'(' after execution")?;
                    let pattern = self.execution()?;
                    self.expect(TokenKind::RParen, "')' closing execution")?;
                    Ok(Expr::Execution(pattern))
                }
                "within" => {
                    self.expect(TokenKind::LParen, "'(' after within")?;
                    let (text, at) = self.expect_word("type pattern")?;
                    let pattern =
                        TypePattern::parse(&text).map_err(|m| self.error_at(&at, m))?;
                    self.expect(TokenKind::RParen, "')' closing within")?;
                    Ok(Expr::Within(pattern))
                }
                "args" => {
                    self.expect(TokenKind::LParen, "'(' after args")?;
                    let items = self.args()?;
                    Ok(Expr::Args(items))
                }
                "this" | "target" => {
                    let designator = word.clone();
                    self.expect(TokenKind::LParen, "'('")?;
                    let operand = self.type_ref(&designator)?;
                    self.expect(TokenKind::RParen, "')'")?;
                    Ok(if designator == "this" {
                        Expr::This(operand)
                    } else {
                        Expr::Target(operand)
                    })
                }
                _ => self.reference(&token),
            },
            _ => Err(self.error_at(&token, "expected a pointcut designator")),
        }
    }

    // ── designators ───────────────────────────────────────────────────────

    fn marker_designator(&mut self) -> Result<Expr, DomainError> {
        let (name, at) = self.expect_word("annotation, within or target after '@'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let operand = self.type_ref(&format!("@{name}"))?;
        self.expect(TokenKind::RParen, "')'")?;

        match name.as_str() {
            "annotation" => Ok(Expr::MethodMarker(operand)),
            "within" => Ok(Expr::WithinMarker(operand)),
            "target" => Ok(Expr::TargetMarker(operand)),
            other => Err(self.error_at(&at, format!("unknown designator '@{other}'"))),
        }
    }

    fn reference(&mut self, name_token: &Token) -> Result<Expr, DomainError> {
        let name = name_token.word().unwrap_or_default().to_owned();
        let Some(body) = self.scope.library.resolve(&name) else {
            return Err(self.error_at(
                name_token,
                format!("unknown designator or named pointcut '{name}'"),
            ));
        };
        self.expect(TokenKind::LParen, "'(' after pointcut name")?;
        self.expect(TokenKind::RParen, "')': named pointcuts take no arguments")?;
        Ok(Expr::Reference { name, body })
    }

    fn execution(&mut self) -> Result<ExecutionPattern, DomainError> {
        let (first, first_at) = self.expect_word("return type pattern")?;
        let is_visibility = matches!(
            first.as_str(),
            "public" | "protected" | "private" | "package"
        );
        let (visibility, returns_text, returns_at) = if is_visibility {
            let visibility = first
                .parse::<Visibility>()
                .map_err(|e| self.error_at(&first_at, e.to_string()))?;
            let (text, at) = self.expect_word("return type pattern")?;
            (Some(visibility), text, at)
        } else {
            (None, first, first_at)
        };
        let returns =
            TypePattern::parse(&returns_text).map_err(|m| self.error_at(&returns_at, m))?;

        let (member, member_at) = self.expect_word("method name pattern")?;
        let (declaring_text, name) = split_member(&member);
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '*'))
        {
            return Err(self.error_at(&member_at, "invalid method name pattern"));
        }
        let declaring = declaring_text
            .map(TypePattern::parse)
            .transpose()
            .map_err(|m| self.error_at(&member_at, m))?;

        self.expect(TokenKind::LParen, "'(' opening the parameter list")?;
        let mut params = Vec::new();
        if self.peek_kind() == Some(&TokenKind::RParen) {
            self.advance();
        } else {
            loop {
                let (text, at) = self.expect_word("parameter pattern")?;
                params.push(ParamPattern::parse(&text).map_err(|m| self.error_at(&at, m))?);
                match self.advance() {
                    Some(t) if t.kind == TokenKind::Comma => continue,
                    Some(t) if t.kind == TokenKind::RParen => break,
                    Some(t) => return Err(self.error_at(&t, "expected ',' or ')'")),
                    None => return Err(self.error_at_end("unterminated parameter list")),
                }
            }
        }

        let mut throws = Vec::new();
        if self.peek().and_then(Token::word) == Some("throws") {
            self.advance();
            loop {
                let (text, at) = self.expect_word("exception type pattern")?;
                throws.push(TypePattern::parse(&text).map_err(|m| self.error_at(&at, m))?);
                if self.peek_kind() == Some(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        Ok(ExecutionPattern {
            visibility,
            returns,
            declaring,
            name: name.to_owned(),
            params,
            throws,
        })
    }

    fn args(&mut self) -> Result<Vec<ArgPattern>, DomainError> {
        let mut items = Vec::new();
        if self.peek_kind() == Some(&TokenKind::RParen) {
            self.advance();
            return Ok(items);
        }
        loop {
            let (text, at) = self.expect_word("argument pattern")?;
            let item = match text.as_str() {
                ".." => ArgPattern::Rest,
                "*" => ArgPattern::One,
                _ => match self.type_ref_from(&text, &at, "args")? {
                    TypeRef::Type(t) => ArgPattern::Type(t),
                    TypeRef::Capture(c) => ArgPattern::Capture(c),
                },
            };
            items.push(item);
            match self.advance() {
                Some(t) if t.kind == TokenKind::Comma => continue,
                Some(t) if t.kind == TokenKind::RParen => break,
                Some(t) => return Err(self.error_at(&t, "expected ',' or ')'")),
                None => return Err(self.error_at_end("unterminated args list")),
            }
        }
        Ok(items)
    }

    fn type_ref(&mut self, designator: &str) -> Result<TypeRef, DomainError> {
        let (text, at) = self.expect_word("a type name or capture")?;
        self.type_ref_from(&text, &at, designator)
    }

    /// Resolve an operand naming exactly one type: a declared capture or a
    /// catalog type. Wildcards are rejected.
    fn type_ref_from(
        &self,
        text: &str,
        at: &Token,
        designator: &str,
    ) -> Result<TypeRef, DomainError> {
        if text.contains('*') || text.contains("..") {
            return Err(self.error_at(
                at,
                format!("wildcards are not allowed in {designator}(); name exactly one type"),
            ));
        }

        if let Some((name, ty)) = self.scope.captures.iter().find(|(n, _)| n == text) {
            return Ok(TypeRef::Capture(Capture {
                name: name.clone(),
                ty: ty.clone(),
                position: at.start,
            }));
        }

        let ty = TypeName::new(text);
        if !self.scope.catalog.contains(&ty) {
            return Err(self.error_at(at, format!("unknown type '{text}'")));
        }
        Ok(TypeRef::Type(ty))
    }
}

/// Split `a.b.C.name` into declaring-type pattern and method-name pattern.
///
/// A `..` right before the method name stays with the type pattern, so
/// `hello.aop..*` gives `(Some("hello.aop.."), "*")`.
fn split_member(word: &str) -> (Option<&str>, &str) {
    match word.rfind('.') {
        None => (None, word),
        Some(i) => {
            let declaring_end = if i > 0 && word.as_bytes()[i - 1] == b'.' {
                i + 1
            } else {
                i
            };
            (Some(&word[..declaring_end]), &word[i + 1..])
        }
    }
}

fn check_captures(
    src: &str,
    expr: &Expr,
    declared: &[(String, TypeName)],
) -> Result<(), DomainError> {
    let mut bound: Vec<&str> = Vec::new();
    let mut failure: Option<DomainError> = None;

    expr.for_each_capture(false, &mut |capture, guarded| {
        if failure.is_some() {
            return;
        }
        let fragment = capture.name.as_str();
        if guarded {
            failure = Some(DomainError::syntax(
                src,
                capture.position,
                fragment,
                "captures cannot be bound under '||' or '!'",
            ));
        } else if bound.contains(&fragment) {
            failure = Some(DomainError::syntax(
                src,
                capture.position,
                fragment,
                "capture is bound more than once",
            ));
        } else {
            bound.push(fragment);
        }
    });

    if let Some(err) = failure {
        return Err(err);
    }

    match declared.iter().find(|(name, _)| !bound.contains(&name.as_str())) {
        Some((name, _)) => Err(DomainError::syntax(
            src,
            0,
            name.as_str(),
            format!("capture '{name}' is declared but never bound"),
        )),
        None => Ok(()),
    }
}

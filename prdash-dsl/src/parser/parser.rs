//! Parser implementation

use super::ast::*;
use crate::lexer::*;
use chrono::NaiveDate;
use thiserror::Error;

// ============================================================================
// PARSE ERROR
// ============================================================================

/// Errors raised while parsing filter text. Parsing stops at the first one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("{message}, found {found} at {offset}")]
    Syntax {
        message: String,
        found: String,
        offset: usize,
    },
}

impl ParseError {
    /// Byte offset the error points at.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::Lex(err) => err.offset(),
            ParseError::Syntax { offset, .. } => *offset,
        }
    }
}

// ============================================================================
// PARSER
// ============================================================================

/// Recursive-descent parser with one token of lookahead.
///
/// ```text
/// Expr      := Or
/// Or        := And ('or' And)*
/// And       := Unary ('and' Unary)*
/// Unary     := ('not' | '!') Unary | Primary
/// Primary   := '(' Expr ')' | Predicate
/// Predicate := IDENT (CompareOp Value | ['not'] 'in' Membership)
/// Membership:= '[' (Value (',' Value)*)? ']' | last(...)
/// ```
pub struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a parser and scan the first token.
    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token()?;
        Ok(Self {
            source,
            lexer,
            current,
        })
    }

    /// Parse a complete filter; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        if !self.is_at_end() {
            return Err(self.error("unexpected token"));
        }
        Ok(expr)
    }

    pub(crate) fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_or_expr()
    }

    pub(crate) fn parse_or_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and_expr()?;

        while self.check(&TokenKind::Or) {
            self.advance()?;
            let right = self.parse_and_expr()?;
            left = Expr::or(left, right);
        }

        Ok(left)
    }

    pub(crate) fn parse_and_expr(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        while self.check(&TokenKind::And) {
            self.advance()?;
            let right = self.parse_unary()?;
            left = Expr::and(left, right);
        }

        Ok(left)
    }

    pub(crate) fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Not) || self.check(&TokenKind::Bang) {
            self.advance()?;
            let inner = self.parse_unary()?;
            return Ok(Expr::not(inner));
        }
        self.parse_primary()
    }

    pub(crate) fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LParen) {
            self.advance()?;
            let expr = self.parse_expr()?;
            self.expect(TokenKind::RParen, "expected ')'")?;
            return Ok(expr);
        }
        self.parse_predicate()
    }

    pub(crate) fn parse_predicate(&mut self) -> Result<Expr, ParseError> {
        let field = match &self.current.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => return Err(self.error("expected field identifier")),
        };
        self.advance()?;

        match &self.current.kind {
            TokenKind::Not => {
                self.advance()?;
                self.expect(TokenKind::In, "expected 'in' after 'not'")?;
                self.parse_membership(field, MembershipOp::NotIn)
            }
            TokenKind::In => {
                self.advance()?;
                self.parse_membership(field, MembershipOp::In)
            }
            kind => match compare_op(kind) {
                Some(op) => {
                    self.advance()?;
                    let value = self.parse_value()?;
                    Ok(Predicate::compare(field, op, value).into())
                }
                None => Err(self.error("expected operator")),
            },
        }
    }

    pub(crate) fn parse_membership(
        &mut self,
        field: String,
        op: MembershipOp,
    ) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::LBracket) {
            self.advance()?;
            let mut values = Vec::new();
            while !self.check(&TokenKind::RBracket) {
                values.push(self.parse_value()?);
                if self.check(&TokenKind::Comma) {
                    self.advance()?;
                } else if !self.check(&TokenKind::RBracket) {
                    return Err(self.error("expected ',' or ']'"));
                }
            }
            self.advance()?;
            return Ok(Predicate::membership(field, op, values).into());
        }

        let token = self.current.clone();
        let value = self.parse_value()?;
        if !matches!(value, Value::Function(_)) {
            return Err(self.error_at(&token, &format!("expected list after '{}'", op.as_str())));
        }
        Ok(Predicate {
            field,
            op: PredicateOp::Membership(op),
            operand: Operand::Single(value),
        }
        .into())
    }

    pub(crate) fn parse_value(&mut self) -> Result<Value, ParseError> {
        let token = self.advance()?;
        match &token.kind {
            TokenKind::String(s) => Ok(Value::String(s.clone())),
            TokenKind::Bool(b) => Ok(Value::Bool(*b)),
            TokenKind::Number(lit) => lit
                .parse::<i64>()
                .map(Value::Number)
                .map_err(|_| self.error_at(&token, "invalid number")),
            TokenKind::Date(lit) => parse_date(lit)
                .map(Value::Date)
                .ok_or_else(|| self.error_at(&token, "invalid date")),
            TokenKind::Duration(lit) => parse_duration(lit)
                .map(Value::Duration)
                .ok_or_else(|| self.error_at(&token, "invalid duration")),
            TokenKind::Ident(name) if name.eq_ignore_ascii_case("last") => {
                self.parse_function(name.to_lowercase())
            }
            TokenKind::Ident(_) => Err(self.error_at(&token, "expected value, got identifier")),
            _ => Err(self.error_at(&token, "expected value")),
        }
    }

    pub(crate) fn parse_function(&mut self, name: String) -> Result<Value, ParseError> {
        self.expect(TokenKind::LParen, &format!("expected '(' after '{}'", name))?;
        let token = self.current.clone();
        let arg = match self.parse_value()? {
            Value::Duration(d) => d,
            _ => return Err(self.error_at(&token, &format!("expected duration for '{}'", name))),
        };
        self.expect(TokenKind::RParen, "expected ')' after function")?;
        Ok(Value::Function(FunctionValue { name, arg }))
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    /// Consume the current token and scan the next one.
    pub(crate) fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, msg: &str) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.error(msg))
        }
    }

    pub(crate) fn error(&self, msg: &str) -> ParseError {
        self.error_at(&self.current, msg)
    }

    pub(crate) fn error_at(&self, token: &Token, msg: &str) -> ParseError {
        let found = match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("{:?}", &self.source[token.span.start..token.span.end]),
        };
        ParseError::Syntax {
            message: msg.to_string(),
            found,
            offset: token.span.start,
        }
    }
}

fn compare_op(kind: &TokenKind) -> Option<CompareOp> {
    match kind {
        TokenKind::Eq => Some(CompareOp::Eq),
        TokenKind::Ne => Some(CompareOp::Ne),
        TokenKind::Gt => Some(CompareOp::Gt),
        TokenKind::Ge => Some(CompareOp::Ge),
        TokenKind::Lt => Some(CompareOp::Lt),
        TokenKind::Le => Some(CompareOp::Le),
        _ => None,
    }
}

/// Parse a `YYYY-MM-DD` date lexeme.
fn parse_date(lit: &str) -> Option<NaiveDate> {
    if lit.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(lit, "%Y-%m-%d").ok()
}

/// Parse a duration lexeme such as `7d` or `-2h`.
fn parse_duration(lit: &str) -> Option<DurationValue> {
    let unit = DurationUnit::from_suffix(lit.chars().last()?)?;
    let amount = lit[..lit.len() - 1].parse::<i64>().ok()?;
    Some(DurationValue::new(amount, unit))
}

/// Parse filter text into an expression tree.
pub fn parse_filter(source: &str) -> Result<Expr, ParseError> {
    Parser::new(source)?.parse()
}

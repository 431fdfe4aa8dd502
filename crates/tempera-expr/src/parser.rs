//! Recursive descent / Pratt parser for the expression sub-language.

use crate::ast::{BinaryOp, Expr, ForSpec, Stmt, UnaryOp};
use crate::error::ExprError;
use crate::lexer::{tokenize, Token, TokenKind};
use smol_str::SmolStr;

/// Parses a single expression. Trailing input is an error.
pub fn parse_expr(source: &str) -> Result<Expr, ExprError> {
    let mut parser = Parser::new(source);
    let expr = parser.expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

/// Parses a semicolon-separated statement sequence.
pub fn parse_stmts(source: &str) -> Result<Vec<Stmt>, ExprError> {
    let mut parser = Parser::new(source);
    let stmts = parser.statements()?;
    parser.expect_eof()?;
    Ok(stmts)
}

/// Parses the clauses of a `for` attribute: either C-style
/// `init; cond; update` (any clause may be empty) or a bare condition
/// expression.
pub fn parse_for_spec(source: &str) -> Result<ForSpec, ExprError> {
    let mut parser = Parser::new(source);
    let first = parser.for_clause()?;

    if parser.eat(TokenKind::Semi) && !parser.check(TokenKind::Eof) {
        let cond_clause = parser.for_clause()?;
        parser.expect(TokenKind::Semi)?;
        let update = parser.for_clause()?;
        parser.expect_eof()?;
        let cond = match cond_clause.into_iter().next() {
            None => None,
            Some(Stmt::Expr(cond)) => Some(cond),
            Some(Stmt::Let(..)) => {
                return Err(ExprError::syntax(
                    "the second 'for' clause must be a condition expression",
                    0,
                ))
            }
        };
        return Ok(ForSpec {
            init: first,
            cond,
            update,
        });
    }

    parser.expect_eof()?;
    match first.into_iter().next() {
        Some(Stmt::Expr(cond)) => Ok(ForSpec {
            init: Vec::new(),
            cond: Some(cond),
            update: Vec::new(),
        }),
        Some(Stmt::Let(..)) => Err(ExprError::syntax(
            "a single 'for' clause must be a condition expression",
            0,
        )),
        None => Err(ExprError::syntax("empty 'for' attribute", 0)),
    }
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
        }
    }

    // === Token helpers ===

    fn current(&self) -> &Token {
        // tokenize always appends Eof, so the last token is a safe fallback
        self.tokens
            .get(self.pos)
            .unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn current_text(&self) -> &'src str {
        let token = self.current();
        &self.source[token.start..token.end]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ExprError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(kind.name()))
        }
    }

    fn expect_eof(&mut self) -> Result<(), ExprError> {
        if self.check(TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    fn unexpected(&self, expected: &str) -> ExprError {
        ExprError::syntax(
            format!(
                "expected {}, found {}",
                expected,
                self.current_kind().name()
            ),
            self.current().start,
        )
    }

    // === Statements ===

    fn statements(&mut self) -> Result<Vec<Stmt>, ExprError> {
        let mut stmts = Vec::new();
        loop {
            while self.eat(TokenKind::Semi) {}
            if self.check(TokenKind::Eof) {
                break;
            }
            stmts.push(self.statement()?);
            if !self.check(TokenKind::Semi) && !self.check(TokenKind::Eof) {
                return Err(self.unexpected("';' or end of statement"));
            }
        }
        Ok(stmts)
    }

    /// One clause of a `for` attribute: a single statement, or empty.
    fn for_clause(&mut self) -> Result<Vec<Stmt>, ExprError> {
        if self.check(TokenKind::Semi) || self.check(TokenKind::Eof) {
            return Ok(Vec::new());
        }
        Ok(vec![self.statement()?])
    }

    fn statement(&mut self) -> Result<Stmt, ExprError> {
        if self.eat(TokenKind::Let) {
            if !self.check(TokenKind::Ident) {
                return Err(self.unexpected("identifier after 'let'"));
            }
            let name = SmolStr::new(self.current_text());
            self.advance();
            let init = if self.eat(TokenKind::Assign) {
                Some(self.expression()?)
            } else {
                None
            };
            Ok(Stmt::Let(name, init))
        } else {
            Ok(Stmt::Expr(self.expression()?))
        }
    }

    // === Expressions, lowest precedence first ===

    fn expression(&mut self) -> Result<Expr, ExprError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.ternary()?;
        if self.check(TokenKind::Assign) {
            let Expr::Ident(name) = lhs else {
                return Err(ExprError::InvalidAssignmentTarget);
            };
            self.advance();
            let rhs = self.assignment()?;
            return Ok(Expr::Assign(name, Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.logical_or()?;
        if self.eat(TokenKind::Question) {
            let then = self.assignment()?;
            self.expect(TokenKind::Colon)?;
            let otherwise = self.assignment()?;
            return Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then),
                Box::new(otherwise),
            ));
        }
        Ok(cond)
    }

    fn logical_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.logical_and()?;
        while self.eat(TokenKind::OrOr) {
            let rhs = self.logical_and()?;
            lhs = Expr::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn logical_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.equality()?;
        while self.eat(TokenKind::AndAnd) {
            let rhs = self.equality()?;
            lhs = Expr::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.current_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat(TokenKind::Bang) {
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat(TokenKind::Minus) {
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.unary()?)));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.primary()?;
        loop {
            match self.current_kind() {
                TokenKind::Dot => {
                    self.advance();
                    if !self.check(TokenKind::Ident) {
                        return Err(self.unexpected("property name after '.'"));
                    }
                    let name = SmolStr::new(self.current_text());
                    self.advance();
                    expr = Expr::Member(Box::new(expr), name);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RParen) {
                        loop {
                            args.push(self.expression()?);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    expr = Expr::Call(Box::new(expr), args);
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let increment = self.check(TokenKind::PlusPlus);
                    let Expr::Ident(name) = expr else {
                        return Err(ExprError::InvalidAssignmentTarget);
                    };
                    self.advance();
                    expr = if increment {
                        Expr::PostIncrement(name)
                    } else {
                        Expr::PostDecrement(name)
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.current_kind() {
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null)
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::Number => {
                let text = self.current_text();
                let value = text.parse::<f64>().map_err(|_| {
                    ExprError::syntax(format!("invalid number: {text}"), self.current().start)
                })?;
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::DoubleQuoted | TokenKind::SingleQuoted => {
                let raw = self.current_text();
                let value = unescape(&raw[1..raw.len() - 1]);
                self.advance();
                Ok(Expr::Str(value))
            }
            TokenKind::Ident => {
                let name = SmolStr::new(self.current_text());
                self.advance();
                Ok(Expr::Ident(name))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(TokenKind::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::Array(items))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                if !self.check(TokenKind::RBrace) {
                    loop {
                        let key = match self.current_kind() {
                            TokenKind::Ident => SmolStr::new(self.current_text()),
                            TokenKind::DoubleQuoted | TokenKind::SingleQuoted => {
                                let raw = self.current_text();
                                SmolStr::new(unescape(&raw[1..raw.len() - 1]))
                            }
                            _ => return Err(self.unexpected("object key")),
                        };
                        self.advance();
                        self.expect(TokenKind::Colon)?;
                        let value = self.expression()?;
                        entries.push((key, value));
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RBrace)?;
                Ok(Expr::Object(entries))
            }
            _ => Err(self.unexpected("an expression")),
        }
    }
}

/// Resolves backslash escapes inside a string literal body.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_precedence() {
        let expr = parse_expr("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Number(1.0)),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Number(2.0)),
                    Box::new(Expr::Number(3.0)),
                )),
            )
        );
    }

    #[test]
    fn test_member_chain() {
        let expr = parse_expr("user.name.length").unwrap();
        assert_eq!(
            expr,
            Expr::Member(
                Box::new(Expr::Member(
                    Box::new(Expr::Ident("user".into())),
                    "name".into()
                )),
                "length".into()
            )
        );
    }

    #[test]
    fn test_object_literal() {
        let expr = parse_expr("{x: 1, y: 'two'}").unwrap();
        assert_eq!(
            expr,
            Expr::Object(vec![
                ("x".into(), Expr::Number(1.0)),
                ("y".into(), Expr::Str("two".into())),
            ])
        );
    }

    #[test]
    fn test_for_spec_c_style() {
        let spec = parse_for_spec("let i=0;i<3;i++").unwrap();
        assert_eq!(spec.init.len(), 1);
        assert!(spec.cond.is_some());
        assert_eq!(spec.update, vec![Stmt::Expr(Expr::PostIncrement("i".into()))]);
    }

    #[test]
    fn test_for_spec_condition_only() {
        let spec = parse_for_spec("n > 0").unwrap();
        assert!(spec.init.is_empty());
        assert!(spec.cond.is_some());
        assert!(spec.update.is_empty());
    }

    #[test]
    fn test_for_spec_empty_init() {
        let spec = parse_for_spec("; n > 0; n--").unwrap();
        assert!(spec.init.is_empty());
        assert!(spec.cond.is_some());
        assert_eq!(spec.update, vec![Stmt::Expr(Expr::PostDecrement("n".into()))]);
    }

    #[test]
    fn test_for_spec_empty_cond_and_update() {
        let spec = parse_for_spec("let i = 0;;").unwrap();
        assert_eq!(spec.init.len(), 1);
        assert!(spec.cond.is_none());
        assert!(spec.update.is_empty());
    }

    #[test]
    fn test_for_spec_two_clauses_rejected() {
        assert!(parse_for_spec("let i = 0; i < 3").is_err());
    }

    #[test]
    fn test_statements() {
        let stmts = parse_stmts("let x = 1; x = x + 2;").unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(matches!(stmts[0], Stmt::Let(_, Some(_))));
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_expr("1 2").is_err());
    }

    #[test]
    fn test_assignment_target_checked() {
        assert!(matches!(
            parse_expr("1 = 2"),
            Err(ExprError::InvalidAssignmentTarget)
        ));
        assert!(matches!(
            parse_expr("a.b = 2"),
            Err(ExprError::InvalidAssignmentTarget)
        ));
        assert!(matches!(
            parse_expr("a.b++"),
            Err(ExprError::InvalidAssignmentTarget)
        ));
    }

    #[test]
    fn test_ternary() {
        let expr = parse_expr("ok ? 'y' : 'n'").unwrap();
        assert!(matches!(expr, Expr::Ternary(..)));
    }
}

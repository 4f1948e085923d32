//! Recursive-descent parser
//!
//! Precedence, loosest first: `?:`, `||`, `&&`, relations (`== != < <= > >= in`),
//! `+ -`, `* / %`, unary `! -`, then member access, indexing and calls.

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::error::{EvalError, EvalResult};
use super::lexer::{Spanned, Token, tokenize};
use invr_domain::value::Value;

/// Parse expression text into a syntax tree
pub fn parse(source: &str) -> EvalResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expression()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(EvalError::syntax(
            format!("unexpected token {other:?} after expression"),
            parser.offset(),
        )),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .map_or(&Token::Eof, |s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map_or(0, |s| s.pos)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> EvalResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvalError::syntax(
                format!("expected {what}, found {:?}", self.peek()),
                self.offset(),
            ))
        }
    }

    fn expression(&mut self) -> EvalResult<Expr> {
        let condition = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then_branch = self.expression()?;
        self.expect(&Token::Colon, "':' in conditional")?;
        let else_branch = self.expression()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn or(&mut self) -> EvalResult<Expr> {
        let mut left = self.and()?;
        while self.eat(&Token::Or) {
            let right = self.and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn and(&mut self) -> EvalResult<Expr> {
        let mut left = self.relation()?;
        while self.eat(&Token::And) {
            let right = self.relation()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn relation(&mut self) -> EvalResult<Expr> {
        let mut left = self.additive()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                Token::In => BinaryOp::In,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.additive()?;
            left = binary(op, left, right);
        }
    }

    fn additive(&mut self) -> EvalResult<Expr> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = binary(op, left, right);
        }
    }

    fn multiplicative(&mut self) -> EvalResult<Expr> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = binary(op, left, right);
        }
    }

    fn unary(&mut self) -> EvalResult<Expr> {
        let op = match self.peek() {
            Token::Not => UnaryOp::Not,
            Token::Minus => UnaryOp::Neg,
            _ => return self.member(),
        };
        self.pos += 1;
        let operand = self.unary()?;
        if let (UnaryOp::Neg, Expr::Literal(Value::Number(n))) = (op, &operand) {
            return Ok(Expr::Literal(Value::Number(-*n)));
        }
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn member(&mut self) -> EvalResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let field = self.ident("field name after '.'")?;
                if self.eat(&Token::LParen) {
                    let args = self.arguments(&Token::RParen)?;
                    expr = Expr::Call {
                        target: Some(Box::new(expr)),
                        function: field,
                        args,
                    };
                } else {
                    expr = Expr::Select {
                        operand: Box::new(expr),
                        field,
                    };
                }
            } else if self.eat(&Token::LBracket) {
                let index = self.expression()?;
                self.expect(&Token::RBracket, "']'")?;
                expr = Expr::Index {
                    operand: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> EvalResult<Expr> {
        let offset = self.offset();
        match self.advance() {
            Token::Number(n) => Ok(Expr::Literal(Value::Number(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::True => Ok(Expr::Literal(Value::Bool(true))),
            Token::False => Ok(Expr::Literal(Value::Bool(false))),
            Token::Null => Ok(Expr::Literal(Value::Null)),
            Token::Ident(name) => {
                if self.eat(&Token::LParen) {
                    let args = self.arguments(&Token::RParen)?;
                    Ok(Expr::Call {
                        target: None,
                        function: name,
                        args,
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(&Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::LBracket => Ok(Expr::List(self.arguments(&Token::RBracket)?)),
            Token::LBrace => self.map_literal(),
            Token::Eof => Err(EvalError::syntax("unexpected end of expression", offset)),
            other => Err(EvalError::syntax(format!("unexpected token {other:?}"), offset)),
        }
    }

    /// Comma-separated expressions up to `close`; trailing comma allowed
    fn arguments(&mut self, close: &Token) -> EvalResult<Vec<Expr>> {
        let mut args = Vec::new();
        if self.eat(close) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(close) {
                return Ok(args);
            }
            self.expect(&Token::Comma, "',' or closing delimiter")?;
            if self.eat(close) {
                return Ok(args);
            }
        }
    }

    fn map_literal(&mut self) -> EvalResult<Expr> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(Expr::Map(entries));
        }
        loop {
            let key = self.expression()?;
            self.expect(&Token::Colon, "':' in map literal")?;
            let value = self.expression()?;
            entries.push((key, value));
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Map(entries));
            }
            self.expect(&Token::Comma, "',' or '}'")?;
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Map(entries));
            }
        }
    }

    fn ident(&mut self, what: &str) -> EvalResult<String> {
        let offset = self.offset();
        match self.advance() {
            Token::Ident(name) => Ok(name),
            // keywords are valid field names after a dot
            Token::In => Ok("in".to_string()),
            Token::Null => Ok("null".to_string()),
            Token::True => Ok("true".to_string()),
            Token::False => Ok("false".to_string()),
            other => Err(EvalError::syntax(
                format!("expected {what}, found {other:?}"),
                offset,
            )),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

//! OCL parser
//!
//! Recursive descent with precedence climbing for binary operators.
//! Supports navigation, operation and collection calls, iterators,
//! collection literals, `if` and `let`.

use crate::ast::*;
use crate::lexer::{Token, tokenize};
use mogwai_core::{Error, Result};
use tracing::trace;

/// Parse an OCL expression
pub fn parse(input: &str) -> Result<OclExpression> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::new(tokens, input.len());
    let expr = parser.parse_expression()?;
    if let Some((token, span)) = parser.peek_spanned() {
        return Err(Error::Parse(format!(
            "unexpected {} at {} after complete expression",
            token.describe(),
            span
        )));
    }
    trace!("Parsed OCL expression: {}", expr);
    Ok(expr)
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>, end: usize) -> Self {
        Self { tokens, pos: 0, end }
    }

    fn parse_expression(&mut self) -> Result<OclExpression> {
        match self.peek() {
            Some(Token::Let) => self.parse_let(),
            _ => self.parse_binary(1),
        }
    }

    fn parse_let(&mut self) -> Result<OclExpression> {
        let start = self.expect(&Token::Let)?;
        let variable = self.expect_identifier()?;
        if self.consume(&Token::Colon) {
            self.parse_type_name()?;
        }
        self.expect(&Token::Equals)?;
        let value = self.parse_expression()?;
        self.expect(&Token::In)?;
        let body = self.parse_expression()?;
        let span = start.to(body.span);
        Ok(OclExpression::new(
            OclKind::Let {
                variable,
                value: Box::new(value),
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<OclExpression> {
        let mut left = self.parse_unary()?;

        while let Some(op) = self.peek().and_then(binary_op) {
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary(precedence + 1)?;
            let span = left.span.to(right.span);
            left = OclExpression::new(
                OclKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<OclExpression> {
        let op = match self.peek() {
            Some(Token::Not) => OclUnaryOp::Not,
            Some(Token::Minus) => OclUnaryOp::Minus,
            _ => return self.parse_postfix(),
        };
        let start = self.advance_span();
        let operand = self.parse_unary()?;
        let span = start.to(operand.span);
        Ok(OclExpression::new(
            OclKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> Result<OclExpression> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.consume(&Token::Dot) {
                let name = self.expect_identifier()?;
                if !self.consume(&Token::LParen) {
                    let span = expr.span.to(self.previous_span());
                    expr = OclExpression::new(
                        OclKind::Navigation {
                            source: Box::new(expr),
                            feature: name,
                        },
                        span,
                    );
                    continue;
                }
                let arguments = self.parse_arguments()?;
                let span = expr.span.to(self.previous_span());
                expr = operation_call(expr, name, arguments, span);
            } else if self.consume(&Token::Arrow) {
                let name = self.expect_identifier()?;
                self.expect(&Token::LParen)?;
                expr = match IteratorKind::from_name(&name) {
                    Some(kind) => self.parse_iterator(expr, kind)?,
                    None => {
                        let arguments = self.parse_arguments()?;
                        let span = expr.span.to(self.previous_span());
                        OclExpression::new(
                            OclKind::CollectionCall {
                                source: Box::new(expr),
                                name,
                                arguments,
                            },
                            span,
                        )
                    }
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// Parse `v | body)` or `body)` after `->name(`
    fn parse_iterator(&mut self, source: OclExpression, kind: IteratorKind) -> Result<OclExpression> {
        let declares_variable = matches!(
            (self.peek_at(0), self.peek_at(1)),
            (Some(Token::Identifier(_)), Some(Token::Pipe | Token::Colon))
        );
        let variable = if declares_variable {
            let name = self.expect_identifier()?;
            if self.consume(&Token::Colon) {
                self.parse_type_name()?;
            }
            self.expect(&Token::Pipe)?;
            Some(name)
        } else {
            None
        };

        let body = self.parse_expression()?;
        let end = self.expect(&Token::RParen)?;
        let span = source.span.to(end);
        Ok(OclExpression::new(
            OclKind::Iterator {
                source: Box::new(source),
                kind,
                variable,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// Parse `a, b)` after an opening parenthesis
    fn parse_arguments(&mut self) -> Result<Vec<OclExpression>> {
        let mut arguments = Vec::new();
        if self.consume(&Token::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.consume(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Ok(arguments);
        }
    }

    fn parse_primary(&mut self) -> Result<OclExpression> {
        let Some((token, span)) = self.peek_spanned() else {
            return Err(Error::Parse(format!(
                "unexpected end of input at {}",
                self.end
            )));
        };
        let (token, span) = (token.clone(), span);

        let literal = match &token {
            Token::Integer(i) => Some(OclLiteral::Integer(*i)),
            Token::Real(r) => Some(OclLiteral::Real(*r)),
            Token::String(s) => Some(OclLiteral::String(s.clone())),
            Token::True => Some(OclLiteral::Boolean(true)),
            Token::False => Some(OclLiteral::Boolean(false)),
            Token::Null => Some(OclLiteral::Null),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(OclExpression::new(OclKind::Literal(literal), span));
        }

        match token {
            Token::LParen => {
                self.advance();
                let mut inner = self.parse_expression()?;
                let end = self.expect(&Token::RParen)?;
                inner.span = span.to(end);
                Ok(inner)
            }
            Token::If => self.parse_if(),
            Token::Identifier(name) => {
                self.advance();
                if self.consume(&Token::Bang) {
                    let class = self.expect_identifier()?;
                    let span = span.to(self.previous_span());
                    return Ok(OclExpression::new(
                        OclKind::TypeReference {
                            metamodel: Some(name),
                            name: class,
                        },
                        span,
                    ));
                }
                if let Some(kind) = CollectionKind::from_name(&name) {
                    if self.consume(&Token::LBrace) {
                        return self.parse_collection(kind, span);
                    }
                }
                Ok(OclExpression::new(OclKind::Variable(name), span))
            }
            other => Err(Error::Parse(format!(
                "unexpected {} at {}",
                other.describe(),
                span
            ))),
        }
    }

    fn parse_collection(&mut self, kind: CollectionKind, start: Span) -> Result<OclExpression> {
        let mut items = Vec::new();
        if !self.consume(&Token::RBrace) {
            loop {
                items.push(self.parse_expression()?);
                if self.consume(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RBrace)?;
                break;
            }
        }
        let span = start.to(self.previous_span());
        Ok(OclExpression::new(OclKind::Collection { kind, items }, span))
    }

    fn parse_if(&mut self) -> Result<OclExpression> {
        let start = self.expect(&Token::If)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::Then)?;
        let then_branch = self.parse_expression()?;
        self.expect(&Token::Else)?;
        let else_branch = self.parse_expression()?;
        let end = self.expect(&Token::Endif)?;
        Ok(OclExpression::new(
            OclKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            start.to(end),
        ))
    }

    /// Type annotations are accepted and ignored: `T`, `MM!T`, `Set(T)`
    fn parse_type_name(&mut self) -> Result<()> {
        self.expect_identifier()?;
        if self.consume(&Token::Bang) {
            self.expect_identifier()?;
        }
        if self.consume(&Token::LParen) {
            self.parse_type_name()?;
            self.expect(&Token::RParen)?;
        }
        Ok(())
    }

    // ========== Token Helpers ==========

    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn peek_spanned(&self) -> Option<(&Token, Span)> {
        self.tokens.get(self.pos).map(|(t, s)| (t, *s))
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_span(&mut self) -> Span {
        let span = self.current_span();
        self.advance();
        span
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or(Span::new(self.end, self.end))
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, s)| *s)
            .unwrap_or_default()
    }

    fn consume(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span> {
        match self.peek_spanned() {
            Some((token, span)) if token == expected => {
                self.advance();
                Ok(span)
            }
            Some((token, span)) => Err(Error::Parse(format!(
                "expected {} at {}, found {}",
                expected.describe(),
                span,
                token.describe()
            ))),
            None => Err(Error::Parse(format!(
                "expected {} at {}, found end of input",
                expected.describe(),
                self.end
            ))),
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.peek_spanned() {
            Some((Token::Identifier(name), _)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            Some((token, span)) => Err(Error::Parse(format!(
                "expected identifier at {}, found {}",
                span,
                token.describe()
            ))),
            None => Err(Error::Parse(format!(
                "expected identifier at {}, found end of input",
                self.end
            ))),
        }
    }
}

fn binary_op(token: &Token) -> Option<OclBinaryOp> {
    Some(match token {
        Token::Equals => OclBinaryOp::Equal,
        Token::NotEquals => OclBinaryOp::NotEqual,
        Token::LessThan => OclBinaryOp::Less,
        Token::LessEquals => OclBinaryOp::LessOrEqual,
        Token::GreaterThan => OclBinaryOp::Greater,
        Token::GreaterEquals => OclBinaryOp::GreaterOrEqual,
        Token::And => OclBinaryOp::And,
        Token::Or => OclBinaryOp::Or,
        Token::Implies => OclBinaryOp::Implies,
        Token::Plus => OclBinaryOp::Add,
        Token::Minus => OclBinaryOp::Subtract,
        Token::Star => OclBinaryOp::Multiply,
        Token::Slash => OclBinaryOp::Divide,
        _ => return None,
    })
}

/// `T.allInstances()` and `MM!T.allInstances()` become class extents
fn operation_call(
    source: OclExpression,
    name: String,
    arguments: Vec<OclExpression>,
    span: Span,
) -> OclExpression {
    if name == "allInstances" && arguments.is_empty() {
        match source.kind {
            OclKind::Variable(class) => {
                return OclExpression::new(
                    OclKind::AllInstances {
                        metamodel: None,
                        class,
                    },
                    span,
                );
            }
            OclKind::TypeReference { metamodel, name } => {
                return OclExpression::new(OclKind::AllInstances { metamodel, class: name }, span);
            }
            kind => {
                let source = OclExpression::new(kind, source.span);
                return OclExpression::new(
                    OclKind::OperationCall {
                        source: Box::new(source),
                        name,
                        arguments,
                    },
                    span,
                );
            }
        }
    }
    OclExpression::new(
        OclKind::OperationCall {
            source: Box::new(source),
            name,
            arguments,
        },
        span,
    )
}

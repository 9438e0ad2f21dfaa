//! OCL lexer using logos

use crate::ast::Span;
use logos::Logos;
use mogwai_core::{Error, Result};

/// OCL tokens
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // Keywords
    #[token("and")]
    And,

    #[token("or")]
    Or,

    #[token("not")]
    Not,

    #[token("implies")]
    Implies,

    #[token("if")]
    If,

    #[token("then")]
    Then,

    #[token("else")]
    Else,

    #[token("endif")]
    Endif,

    #[token("let")]
    Let,

    #[token("in")]
    In,

    #[token("true")]
    True,

    #[token("false")]
    False,

    #[token("null")]
    #[token("OclUndefined")]
    Null,

    // Symbols
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(".")]
    Dot,

    #[token("->")]
    Arrow,

    #[token("|")]
    Pipe,

    #[token("!")]
    Bang,

    #[token(":")]
    Colon,

    #[token("=")]
    Equals,

    #[token("<>")]
    NotEquals,

    #[token("<")]
    LessThan,

    #[token("<=")]
    LessEquals,

    #[token(">")]
    GreaterThan,

    #[token(">=")]
    GreaterEquals,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Integer(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Real(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| unescape(lex.slice()))]
    String(String),

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Identifier(String),

    // Comment (skip)
    #[regex(r"--[^\n]*", logos::skip)]
    LineComment,
}

impl Token {
    /// Human-readable form used in parse errors
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(i) => format!("integer {}", i),
            Token::Real(r) => format!("real {}", r),
            Token::String(s) => format!("string {:?}", s),
            Token::Identifier(name) => format!("identifier `{}`", name),
            other => format!("{:?}", other),
        }
    }
}

/// Strip the quotes of a string literal and resolve its escapes
fn unescape(quoted: &str) -> String {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
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

/// Tokenize an OCL expression, keeping the byte range of every token
pub fn tokenize(input: &str) -> Result<Vec<(Token, Span)>> {
    let mut lexer = Token::lexer(input);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = Span::from(lexer.span());
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(Error::Parse(format!(
                    "unexpected input {:?} at {}",
                    lexer.slice(),
                    span
                )));
            }
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_select_expression() {
        let tokens = kinds("Families!Member.allInstances()->select(m | m.age >= 18)");

        assert_eq!(tokens[0], Token::Identifier("Families".into()));
        assert_eq!(tokens[1], Token::Bang);
        assert!(tokens.contains(&Token::Arrow));
        assert!(tokens.contains(&Token::Pipe));
        assert!(tokens.contains(&Token::GreaterEquals));
        assert!(tokens.contains(&Token::Integer(18)));
    }

    #[test]
    fn test_keywords_and_identifiers() {
        let tokens = kinds("not a and band or order implies x");
        assert_eq!(
            tokens,
            vec![
                Token::Not,
                Token::Identifier("a".into()),
                Token::And,
                Token::Identifier("band".into()),
                Token::Or,
                Token::Identifier("order".into()),
                Token::Implies,
                Token::Identifier("x".into()),
            ]
        );
    }

    #[test]
    fn test_literals() {
        let tokens = kinds(r#"1.75 42 'it\'s' "two" null OclUndefined"#);
        assert!(matches!(tokens[0], Token::Real(f) if (f - 1.75).abs() < 1e-9));
        assert_eq!(tokens[1], Token::Integer(42));
        assert_eq!(tokens[2], Token::String("it's".into()));
        assert_eq!(tokens[3], Token::String("two".into()));
        assert_eq!(tokens[4], Token::Null);
        assert_eq!(tokens[5], Token::Null);
    }

    #[test]
    fn test_comments_and_minus() {
        let tokens = kinds("a - b -- trailing note\n-> c");
        assert_eq!(
            tokens,
            vec![
                Token::Identifier("a".into()),
                Token::Minus,
                Token::Identifier("b".into()),
                Token::Arrow,
                Token::Identifier("c".into()),
            ]
        );
    }

    #[test]
    fn test_spans() {
        let tokens = tokenize("x <> 5").unwrap();
        assert_eq!(tokens[1], (Token::NotEquals, Span::new(2, 4)));
        assert_eq!(tokens[2].1, Span::new(5, 6));
    }

    #[test]
    fn test_unexpected_character() {
        assert!(matches!(tokenize("a # b"), Err(Error::Parse(_))));
    }
}

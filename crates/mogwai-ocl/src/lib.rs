//! Mogwai OCL front end
//!
//! Expression trees for the OCL/ATL query subset, with a logos lexer and
//! a recursive descent parser producing them.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{
    CollectionKind, IteratorKind, OclBinaryOp, OclExpression, OclKind, OclLiteral, OclUnaryOp,
    Span,
};
pub use lexer::{Token, tokenize};
pub use parser::parse;

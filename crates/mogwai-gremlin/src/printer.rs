//! Gremlin script printer
//!
//! Renders a sealed script as Gremlin-Groovy text. Output depends only on
//! the tree and the print options: no reordering, no normalization.

use crate::expression::{Expression, Literal};
use crate::instruction::{Closure, Instruction, StepCall};
use crate::script::Script;
use serde::{Deserialize, Serialize};

/// Text layout options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    /// Statement terminator
    pub separator: String,

    /// Emitted after each top-level statement
    pub line_break: String,

    /// Terminate the last top-level statement too
    pub trailing_separator: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            separator: ";".to_string(),
            line_break: "\n".to_string(),
            trailing_separator: true,
        }
    }
}

impl PrintOptions {
    pub fn with_separator<S: Into<String>>(mut self, separator: S) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_line_break<S: Into<String>>(mut self, line_break: S) -> Self {
        self.line_break = line_break.into();
        self
    }

    pub fn with_trailing_separator(mut self, trailing: bool) -> Self {
        self.trailing_separator = trailing;
        self
    }
}

/// Deterministic script serializer
#[derive(Debug, Clone, Default)]
pub struct Printer {
    options: PrintOptions,
}

impl Printer {
    pub fn new(options: PrintOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PrintOptions {
        &self.options
    }

    /// Render a whole script
    pub fn print(&self, script: &Script) -> String {
        let mut out = String::new();
        let last = script.len().saturating_sub(1);
        for (index, instruction) in script.iter().enumerate() {
            self.write_instruction(&mut out, instruction);
            if index < last || self.options.trailing_separator {
                out.push_str(&self.options.separator);
                out.push_str(&self.options.line_break);
            }
        }
        out
    }

    /// Render one instruction without its terminator
    pub fn print_instruction(&self, instruction: &Instruction) -> String {
        let mut out = String::new();
        self.write_instruction(&mut out, instruction);
        out
    }

    pub fn print_expression(&self, expr: &Expression) -> String {
        let mut out = String::new();
        write_expression(&mut out, expr);
        out
    }

    fn write_instruction(&self, out: &mut String, instruction: &Instruction) {
        match instruction {
            Instruction::Step(step) => write_step(out, step),
            Instruction::Closure(closure) => self.write_closure(out, closure),
            Instruction::Expression(expr) => write_expression(out, expr),
        }
    }

    fn write_closure(&self, out: &mut String, closure: &Closure) {
        out.push_str(closure.name());
        out.push('{');
        for statement in closure.body() {
            out.push(' ');
            self.write_instruction(out, statement);
            out.push_str(&self.options.separator);
        }
        out.push_str(" }");
    }
}

fn write_step(out: &mut String, step: &StepCall) {
    out.push_str(step.name());
    out.push('(');
    for (index, argument) in step.arguments().iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        write_expression(out, argument);
    }
    out.push(')');
}

fn write_expression(out: &mut String, expr: &Expression) {
    match expr {
        Expression::Literal(literal) => write_literal(out, literal),
        Expression::Variable(variable) => out.push_str(variable.name()),
        Expression::Property { target, name } => {
            write_operand(out, target, needs_group(target));
            out.push('.');
            out.push_str(name);
        }
        Expression::List(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_expression(out, item);
            }
            out.push(']');
        }
        Expression::Unary { op, operand } => {
            out.push_str(op.token());
            write_operand(out, operand, needs_group(operand));
        }
        Expression::Binary { op, left, right } => {
            let precedence = op.precedence();
            let group_left = matches!(
                left.as_ref(),
                Expression::Binary { op: inner, .. } if inner.precedence() < precedence
            );
            let group_right = matches!(
                right.as_ref(),
                Expression::Binary { op: inner, .. } if inner.precedence() <= precedence
            );
            write_operand(out, left, group_left);
            out.push(' ');
            out.push_str(op.token());
            out.push(' ');
            write_operand(out, right, group_right);
        }
    }
}

fn write_operand(out: &mut String, expr: &Expression, grouped: bool) {
    if grouped {
        out.push('(');
        write_expression(out, expr);
        out.push(')');
    } else {
        write_expression(out, expr);
    }
}

/// Operands of prefix and postfix forms that would otherwise bind wrongly
fn needs_group(expr: &Expression) -> bool {
    match expr {
        Expression::Binary { .. } | Expression::Unary { .. } => true,
        Expression::Literal(Literal::Integer(i)) => *i < 0,
        Expression::Literal(Literal::Float(f)) => f.is_sign_negative(),
        _ => false,
    }
}

fn write_literal(out: &mut String, literal: &Literal) {
    match literal {
        Literal::Null => out.push_str("null"),
        Literal::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Literal::Integer(i) => out.push_str(&i.to_string()),
        Literal::Float(f) => out.push_str(&format_float(*f)),
        Literal::String(s) => {
            out.push('"');
            for c in s.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    '\r' => out.push_str("\\r"),
                    c => out.push(c),
                }
            }
            out.push('"');
        }
    }
}

fn format_float(f: f64) -> String {
    let text = f.to_string();
    if f.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Container, ScriptBuilder};
    use crate::expression::{BinaryOperator, UnaryOperator, VariableReference};
    use proptest::prelude::*;

    fn lit(i: i64) -> Box<Expression> {
        Box::new(Expression::Literal(Literal::Integer(i)))
    }

    fn var(name: &str) -> Box<Expression> {
        Box::new(Expression::Variable(VariableReference::new(name)))
    }

    fn bin(op: BinaryOperator, left: Box<Expression>, right: Box<Expression>) -> Box<Expression> {
        Box::new(Expression::Binary { op, left, right })
    }

    fn select_script() -> Script {
        let mut b = ScriptBuilder::new();
        let input = b.variable("input");
        let v = b.step("V", vec![input]).unwrap();
        let label = b.literal("Person");
        let has_label = b.step("hasLabel", vec![label]).unwrap();
        let filter = b.closure("filter", Some("e"));
        let e = b.variable("e");
        let attr = b.property(e, "attr").unwrap();
        let one = b.literal(1i64);
        let eq = b.binary(BinaryOperator::Equality, attr, one).unwrap();
        let stmt = b.expression(eq).unwrap();
        b.append(Container::Closure(filter), stmt).unwrap();
        for id in [v, has_label, filter] {
            b.append(Container::Script, id).unwrap();
        }
        b.finish().unwrap()
    }

    #[test]
    fn test_print_script_terminates_every_statement() {
        assert_eq!(
            select_script().to_text(),
            "V(input);\nhasLabel(\"Person\");\nfilter{ e.attr == 1; };\n"
        );
    }

    #[test]
    fn test_print_without_trailing_separator() {
        let printer = Printer::new(PrintOptions::default().with_trailing_separator(false));
        assert_eq!(
            printer.print(&select_script()),
            "V(input);\nhasLabel(\"Person\");\nfilter{ e.attr == 1; }"
        );
    }

    #[test]
    fn test_print_chained_layout() {
        let printer = Printer::new(
            PrintOptions::default()
                .with_separator(".")
                .with_line_break("")
                .with_trailing_separator(false),
        );
        assert_eq!(
            printer.print(&select_script()),
            "V(input).hasLabel(\"Person\").filter{ e.attr == 1. }"
        );
    }

    #[test]
    fn test_print_empty_script_and_closure() {
        assert_eq!(Printer::default().print(&Script::default()), "");

        let mut b = ScriptBuilder::new();
        let closure = b.closure("sideEffect", None);
        b.append(Container::Script, closure).unwrap();
        assert_eq!(b.finish().unwrap().to_text(), "sideEffect{ };\n");
    }

    #[test]
    fn test_print_difference() {
        let expr = bin(BinaryOperator::Difference, lit(3), lit(5));
        assert_eq!(expr.to_string(), "3 != 5");
    }

    #[test]
    fn test_parentheses_follow_precedence() {
        // (a || b) && c
        let expr = bin(
            BinaryOperator::And,
            bin(BinaryOperator::Or, var("a"), var("b")),
            var("c"),
        );
        assert_eq!(expr.to_string(), "(a || b) && c");

        // a && b || c needs none
        let expr = bin(
            BinaryOperator::Or,
            bin(BinaryOperator::And, var("a"), var("b")),
            var("c"),
        );
        assert_eq!(expr.to_string(), "a && b || c");

        // a - (b - c) keeps its grouping
        let expr = bin(
            BinaryOperator::Subtract,
            var("a"),
            bin(BinaryOperator::Subtract, var("b"), var("c")),
        );
        assert_eq!(expr.to_string(), "a - (b - c)");

        let expr = bin(
            BinaryOperator::Subtract,
            bin(BinaryOperator::Subtract, var("a"), var("b")),
            var("c"),
        );
        assert_eq!(expr.to_string(), "a - b - c");
    }

    #[test]
    fn test_unary_and_property_grouping() {
        let not = Expression::Unary {
            op: UnaryOperator::Not,
            operand: bin(BinaryOperator::Equality, var("x"), lit(1)),
        };
        assert_eq!(not.to_string(), "!(x == 1)");

        let negate = Expression::Unary {
            op: UnaryOperator::Negate,
            operand: lit(-2),
        };
        assert_eq!(negate.to_string(), "-(-2)");

        let nav = Expression::Property {
            target: bin(BinaryOperator::Union, var("a"), var("b")),
            name: "size".to_string(),
        };
        assert_eq!(nav.to_string(), "(a | b).size");
    }

    #[test]
    fn test_literals() {
        let printer = Printer::default();
        let cases = [
            (Literal::Null, "null"),
            (Literal::Boolean(true), "true"),
            (Literal::Integer(-7), "-7"),
            (Literal::Float(2.0), "2.0"),
            (Literal::Float(0.5), "0.5"),
            (Literal::from("say \"hi\" \\ bye"), r#""say \"hi\" \\ bye""#),
        ];
        for (literal, expected) in cases {
            assert_eq!(printer.print_expression(&Expression::Literal(literal)), expected);
        }

        let list = Expression::List(vec![*lit(1), *var("x")]);
        assert_eq!(printer.print_expression(&list), "[1, x]");
    }

    #[test]
    fn test_print_options_json_defaults() {
        let options: PrintOptions = serde_json::from_str(r#"{"trailing_separator": false}"#).unwrap();
        assert_eq!(options.separator, ";");
        assert!(!options.trailing_separator);
    }

    proptest! {
        #[test]
        fn prop_binary_operand_order_preserved(
            index in 0..BinaryOperator::ALL.len(),
            a in any::<i64>(),
            b in any::<i64>(),
        ) {
            let op = BinaryOperator::ALL[index];
            let expr = bin(op, lit(a), lit(b));
            prop_assert_eq!(expr.to_string(), format!("{} {} {}", a, op.token(), b));
        }

        #[test]
        fn prop_printing_is_deterministic(
            names in proptest::collection::vec("[a-z][a-z0-9]{0,6}", 1..8),
            trailing in any::<bool>(),
        ) {
            let mut b = ScriptBuilder::new();
            for name in &names {
                let arg = b.variable(name.clone());
                let step = b.step(name.clone(), vec![arg]).unwrap();
                b.append(Container::Script, step).unwrap();
            }
            let script = b.finish().unwrap();
            let printer = Printer::new(PrintOptions::default().with_trailing_separator(trailing));

            let first = printer.print(&script);
            prop_assert_eq!(&first, &printer.print(&script.clone()));

            // statements come out in append order
            let rendered: Vec<String> = names.iter().map(|n| format!("{}({})", n, n)).collect();
            let mut expected = rendered.join(";\n");
            if trailing {
                expected.push_str(";\n");
            }
            prop_assert_eq!(first, expected);
        }
    }
}

//! OCL to Gremlin translation
//!
//! Walks a parsed OCL expression and lowers it into a script through a
//! `ScriptBuilder`. Every node becomes either a traversal (steps appended
//! to the script) or a single value expression. Translation is
//! all-or-nothing: on failure the builder is dropped with everything it
//! allocated.

use crate::binder::INPUT;
use crate::metamodel::Metamodel;
use mogwai_core::{Error, Result};
use mogwai_gremlin::{
    BinaryOperator, Container, ExpressionId, IMPLICIT_PARAMETER, Literal, Script, ScriptBuilder,
    UnaryOperator,
};
use mogwai_ocl::{IteratorKind, OclBinaryOp, OclExpression, OclKind, OclLiteral, OclUnaryOp};
use tracing::debug;

/// Translate an expression against a metamodel with default settings
pub fn translate(expr: &OclExpression, metamodel: &Metamodel) -> Result<Script> {
    Translator::new(metamodel).translate(expr)
}

/// Where a node is being lowered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// Top level: traversals append to the script
    Root,
    /// Right operand of a binary operator or argument of a collection call
    Operand,
    /// Body of an iterator closure
    Body,
}

/// Result of lowering one node
#[derive(Debug, Clone)]
enum Lowered {
    /// Steps were appended; `class` is the element type when known
    Traversal { class: Option<String> },
    Value(ExpressionId),
}

/// Iterator whose body is being lowered
#[derive(Debug, Clone)]
struct IteratorScope {
    /// Declared iterator variable; `None` for an implicit iterator
    variable: Option<String>,
    /// Element type of the iterated traversal when known
    class: Option<String>,
}

/// Lowers OCL expressions into Gremlin scripts
#[derive(Debug)]
pub struct Translator<'m> {
    metamodel: &'m Metamodel,
    check_invariants: bool,
}

impl<'m> Translator<'m> {
    pub fn new(metamodel: &'m Metamodel) -> Self {
        Self {
            metamodel,
            check_invariants: true,
        }
    }

    /// Builder: enable or disable the tree check after translation
    pub fn check_invariants(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    /// Translate an expression into a sealed script
    pub fn translate(&self, expr: &OclExpression) -> Result<Script> {
        debug!("Translating {}", expr.describe());

        let mut lowering = Lowering {
            metamodel: self.metamodel,
            builder: ScriptBuilder::new(),
            iterator: None,
        };
        if let Lowered::Value(value) = lowering.lower(expr, Context::Root)? {
            let statement = lowering.builder.expression(value)?;
            lowering.builder.append(Container::Script, statement)?;
        }

        let builder = lowering.builder;
        if self.check_invariants {
            builder.check_tree()?;
        }
        let script = builder.finish()?;
        if self.check_invariants {
            script.validate()?;
        }

        debug!("Translated into {} instructions", script.len());
        Ok(script)
    }
}

struct Lowering<'m> {
    metamodel: &'m Metamodel,
    builder: ScriptBuilder,
    iterator: Option<IteratorScope>,
}

impl Lowering<'_> {
    fn lower(&mut self, expr: &OclExpression, context: Context) -> Result<Lowered> {
        match &expr.kind {
            OclKind::Literal(literal) => {
                Ok(Lowered::Value(self.builder.literal(lower_literal(literal))))
            }
            OclKind::Variable(name) => self.lower_variable(expr, name),
            OclKind::Collection { items, .. } => {
                let items = items
                    .iter()
                    .map(|item| self.lower_value(item, Context::Operand.within(context)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Lowered::Value(self.builder.list(items)?))
            }
            OclKind::AllInstances { class, .. } => self.lower_all_instances(expr, class, context),
            OclKind::Navigation { source, feature } => {
                match self.lower(source, context)? {
                    Lowered::Traversal { class } => self.lower_navigation(class, feature),
                    Lowered::Value(target) => {
                        Ok(Lowered::Value(self.builder.property(target, feature.as_str())?))
                    }
                }
            }
            OclKind::CollectionCall {
                source,
                name,
                arguments,
            } => self.lower_collection_call(expr, source, name, arguments, context),
            OclKind::Iterator {
                source,
                kind,
                variable,
                body,
            } => self.lower_iterator(expr, source, *kind, variable.as_deref(), body, context),
            OclKind::Binary { op, left, right } => {
                let left = self.lower(left, context)?;
                let right = self.lower_value(right, Context::Operand.within(context))?;
                match left {
                    Lowered::Value(left) => Ok(Lowered::Value(self.combine(*op, left, right)?)),
                    Lowered::Traversal { .. } => {
                        let it = self.builder.variable(IMPLICIT_PARAMETER);
                        let value = self.combine(*op, it, right)?;
                        self.transform(value)
                    }
                }
            }
            OclKind::Unary { op, operand } => {
                let op = lower_unary_op(*op);
                match self.lower(operand, context)? {
                    Lowered::Value(operand) => Ok(Lowered::Value(self.builder.unary(op, operand)?)),
                    Lowered::Traversal { .. } => {
                        let it = self.builder.variable(IMPLICIT_PARAMETER);
                        let value = self.builder.unary(op, it)?;
                        self.transform(value)
                    }
                }
            }
            OclKind::OperationCall { name, .. } => Err(Error::translation(
                expr.describe(),
                format!("operation `{}` has no lowering", name),
            )),
            OclKind::TypeReference { .. } => Err(Error::translation(
                expr.describe(),
                "a type reference is only supported as the source of allInstances()",
            )),
            OclKind::If { .. } => Err(Error::translation(
                expr.describe(),
                "if expressions have no lowering",
            )),
            OclKind::Let { .. } => Err(Error::translation(
                expr.describe(),
                "let expressions have no lowering",
            )),
        }
    }

    /// Lower an identifier
    ///
    /// `it` is the closure parameter of the printed script, so a user
    /// variable may only use that name as a declared iterator variable.
    /// Inside an implicit iterator a bare feature name reads that feature
    /// of the current element.
    fn lower_variable(&mut self, expr: &OclExpression, name: &str) -> Result<Lowered> {
        let scope = self.iterator.as_ref();
        if name == IMPLICIT_PARAMETER
            && scope.and_then(|s| s.variable.as_deref()) != Some(IMPLICIT_PARAMETER)
        {
            return Err(Error::translation(
                expr.describe(),
                format!("`{}` is reserved for the implicit iterator", IMPLICIT_PARAMETER),
            ));
        }

        let implicit_feature = match scope {
            Some(IteratorScope {
                variable: None,
                class,
            }) => {
                name != "self"
                    && (self.metamodel.is_empty()
                        || self.metamodel.feature(class.as_deref(), name).is_some())
            }
            _ => false,
        };
        if implicit_feature {
            let it = self.builder.variable(IMPLICIT_PARAMETER);
            return Ok(Lowered::Value(self.builder.property(it, name)?));
        }
        Ok(Lowered::Value(self.builder.variable(name)))
    }

    /// Lower a node that must produce a value
    fn lower_value(&mut self, expr: &OclExpression, context: Context) -> Result<ExpressionId> {
        match self.lower(expr, context)? {
            Lowered::Value(value) => Ok(value),
            Lowered::Traversal { .. } => Err(Error::translation(
                expr.describe(),
                "expected a value but the expression produces a traversal",
            )),
        }
    }

    // ========== Traversals ==========

    fn lower_all_instances(
        &mut self,
        expr: &OclExpression,
        class: &str,
        context: Context,
    ) -> Result<Lowered> {
        match context {
            Context::Root => {}
            Context::Operand => {
                return Err(Error::translation(
                    expr.describe(),
                    "a traversal cannot be used as an operand",
                ));
            }
            Context::Body => {
                return Err(Error::translation(
                    expr.describe(),
                    "a traversal cannot be nested inside an iterator body",
                ));
            }
        }
        if !self.metamodel.is_empty() && !self.metamodel.has_class(class) {
            return Err(Error::translation(
                expr.describe(),
                format!("unknown class `{}`", class),
            ));
        }

        let graph = self.builder.variable(INPUT);
        self.append_step("V", vec![graph])?;
        let label = self.builder.literal(class);
        self.append_step("hasLabel", vec![label])?;
        Ok(Lowered::Traversal {
            class: Some(class.to_string()),
        })
    }

    fn lower_navigation(&mut self, class: Option<String>, feature: &str) -> Result<Lowered> {
        let reference = self
            .metamodel
            .feature(class.as_deref(), feature)
            .filter(|f| f.is_reference())
            .map(|f| f.target.clone());
        let name = self.builder.literal(feature);
        match reference {
            Some(target) => {
                self.append_step("out", vec![name])?;
                Ok(Lowered::Traversal { class: target })
            }
            None => {
                self.append_step("values", vec![name])?;
                Ok(Lowered::Traversal { class: None })
            }
        }
    }

    fn lower_collection_call(
        &mut self,
        expr: &OclExpression,
        source: &OclExpression,
        name: &str,
        arguments: &[OclExpression],
        context: Context,
    ) -> Result<Lowered> {
        match self.lower(source, context)? {
            Lowered::Traversal { class } => {
                let (step, keeps_class) = match name {
                    "size" => ("count", false),
                    "isEmpty" => ("isEmpty", false),
                    "notEmpty" => ("hasNext", false),
                    "asSet" => ("dedup", true),
                    "first" => ("limit", true),
                    _ => {
                        return Err(Error::translation(
                            expr.describe(),
                            format!("`->{}` is not supported on a traversal", name),
                        ));
                    }
                };
                expect_arguments(expr, name, arguments, 0)?;
                let arguments = if step == "limit" {
                    vec![self.builder.literal(1i64)]
                } else {
                    Vec::new()
                };
                self.append_step(step, arguments)?;
                Ok(Lowered::Traversal {
                    class: if keeps_class { class } else { None },
                })
            }
            Lowered::Value(source) => {
                let op = match name {
                    "union" | "including" => BinaryOperator::Union,
                    "intersection" => BinaryOperator::Intersection,
                    _ => {
                        return Err(Error::translation(
                            expr.describe(),
                            format!("`->{}` is not supported on a value", name),
                        ));
                    }
                };
                expect_arguments(expr, name, arguments, 1)?;
                let mut argument =
                    self.lower_value(&arguments[0], Context::Operand.within(context))?;
                if name == "including" {
                    argument = self.builder.list(vec![argument])?;
                }
                Ok(Lowered::Value(self.builder.binary(op, source, argument)?))
            }
        }
    }

    fn lower_iterator(
        &mut self,
        expr: &OclExpression,
        source: &OclExpression,
        kind: IteratorKind,
        variable: Option<&str>,
        body: &OclExpression,
        context: Context,
    ) -> Result<Lowered> {
        let class = match self.lower(source, context)? {
            Lowered::Traversal { class } => class,
            Lowered::Value(_) => {
                return Err(Error::translation(
                    expr.describe(),
                    format!("`->{}` requires a collection source", kind.name()),
                ));
            }
        };

        let closure_name = match kind {
            IteratorKind::Collect => "transform",
            _ => "filter",
        };
        let closure = self.builder.closure(closure_name, variable);

        let outer = self.iterator.replace(IteratorScope {
            variable: variable.map(str::to_string),
            class,
        });
        let body = self.lower_value(body, Context::Body);
        let class = std::mem::replace(&mut self.iterator, outer).and_then(|scope| scope.class);
        let mut predicate = body?;
        if matches!(kind, IteratorKind::Reject | IteratorKind::ForAll) {
            predicate = self.builder.unary(UnaryOperator::Not, predicate)?;
        }
        let statement = self.builder.expression(predicate)?;
        self.builder.append(Container::Closure(closure), statement)?;
        self.builder.append(Container::Script, closure)?;

        match kind {
            IteratorKind::Select | IteratorKind::Reject => Ok(Lowered::Traversal { class }),
            IteratorKind::Collect => Ok(Lowered::Traversal { class: None }),
            IteratorKind::Exists => {
                self.append_step("hasNext", Vec::new())?;
                Ok(Lowered::Traversal { class: None })
            }
            IteratorKind::ForAll => {
                self.append_step("isEmpty", Vec::new())?;
                Ok(Lowered::Traversal { class: None })
            }
        }
    }

    // ========== Helpers ==========

    fn append_step(&mut self, name: &str, arguments: Vec<ExpressionId>) -> Result<()> {
        let step = self.builder.step(name, arguments)?;
        self.builder.append(Container::Script, step)
    }

    /// Wrap a value computed from `it` into a transform closure
    fn transform(&mut self, value: ExpressionId) -> Result<Lowered> {
        let closure = self.builder.closure("transform", None);
        let statement = self.builder.expression(value)?;
        self.builder.append(Container::Closure(closure), statement)?;
        self.builder.append(Container::Script, closure)?;
        Ok(Lowered::Traversal { class: None })
    }

    fn combine(
        &mut self,
        op: OclBinaryOp,
        left: ExpressionId,
        right: ExpressionId,
    ) -> Result<ExpressionId> {
        let op = match op {
            OclBinaryOp::Implies => {
                let negated = self.builder.unary(UnaryOperator::Not, left)?;
                return self.builder.binary(BinaryOperator::Or, negated, right);
            }
            OclBinaryOp::Equal => BinaryOperator::Equality,
            OclBinaryOp::NotEqual => BinaryOperator::Difference,
            OclBinaryOp::Less => BinaryOperator::Less,
            OclBinaryOp::LessOrEqual => BinaryOperator::LessOrEqual,
            OclBinaryOp::Greater => BinaryOperator::Greater,
            OclBinaryOp::GreaterOrEqual => BinaryOperator::GreaterOrEqual,
            OclBinaryOp::And => BinaryOperator::And,
            OclBinaryOp::Or => BinaryOperator::Or,
            OclBinaryOp::Add => BinaryOperator::Add,
            OclBinaryOp::Subtract => BinaryOperator::Subtract,
            OclBinaryOp::Multiply => BinaryOperator::Multiply,
            OclBinaryOp::Divide => BinaryOperator::Divide,
        };
        self.builder.binary(op, left, right)
    }
}

impl Context {
    /// Nested contexts keep the stricter iterator-body restriction
    fn within(self, outer: Context) -> Context {
        if outer == Context::Body {
            Context::Body
        } else {
            self
        }
    }
}

fn lower_literal(literal: &OclLiteral) -> Literal {
    match literal {
        OclLiteral::Null => Literal::Null,
        OclLiteral::Boolean(b) => Literal::Boolean(*b),
        OclLiteral::Integer(i) => Literal::Integer(*i),
        OclLiteral::Real(r) => Literal::Float(*r),
        OclLiteral::String(s) => Literal::String(s.clone()),
    }
}

fn lower_unary_op(op: OclUnaryOp) -> UnaryOperator {
    match op {
        OclUnaryOp::Not => UnaryOperator::Not,
        OclUnaryOp::Minus => UnaryOperator::Negate,
    }
}

fn expect_arguments(
    expr: &OclExpression,
    name: &str,
    arguments: &[OclExpression],
    count: usize,
) -> Result<()> {
    if arguments.len() != count {
        return Err(Error::translation(
            expr.describe(),
            format!(
                "`->{}` takes {} argument(s), got {}",
                name,
                count,
                arguments.len()
            ),
        ));
    }
    Ok(())
}

//! Traversal interpreter
//!
//! Executes sealed Gremlin scripts over the stores bound in an
//! `Environment`. The traverser stream is an ordered list of values;
//! each top-level instruction maps the current stream to the next one.

use crate::store::{Binding, Environment, ModelStore};
use mogwai_core::{Direction, ElementRef, Error, Label, ModelElement, Result, Value};
use mogwai_gremlin::{
    BinaryOperator, Closure, Expression, IMPLICIT_PARAMETER, Instruction, Script, StepCall,
    UnaryOperator,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::trace;

/// Names bound by enclosing closures, innermost last
type Scope = Vec<(String, Value)>;

/// Interpreter for sealed scripts
pub struct TraversalMachine<'a> {
    environment: &'a Environment,
}

impl<'a> TraversalMachine<'a> {
    pub fn new(environment: &'a Environment) -> Self {
        Self { environment }
    }

    /// Run a script and return its final traverser stream
    pub fn run(&self, script: &Script) -> Result<Vec<Value>> {
        let mut scope = Scope::new();
        self.run_block(script.instructions(), Vec::new(), &mut scope)
    }

    fn run_block(
        &self,
        instructions: &[Instruction],
        mut stream: Vec<Value>,
        scope: &mut Scope,
    ) -> Result<Vec<Value>> {
        for instruction in instructions {
            stream = match instruction {
                Instruction::Step(step) => self.apply_step(step, stream, scope)?,
                Instruction::Closure(closure) => self.apply_closure(closure, stream, scope)?,
                Instruction::Expression(expr) => vec![self.evaluate(expr, scope)?],
            };
        }
        Ok(stream)
    }

    // ========== Closures ==========

    fn apply_closure(
        &self,
        closure: &Closure,
        stream: Vec<Value>,
        scope: &mut Scope,
    ) -> Result<Vec<Value>> {
        if !matches!(closure.name(), "filter" | "transform" | "sideEffect") {
            return Err(Error::Execution(format!(
                "unsupported closure {}{{}}",
                closure.name()
            )));
        }

        let mut output = Vec::new();
        for traverser in stream {
            scope.push((closure.bound_name().to_string(), traverser.clone()));
            let result = self.run_block(closure.body(), vec![traverser.clone()], scope);
            scope.pop();
            let result = result?;

            match closure.name() {
                "filter" => {
                    if filter_outcome(&result)? {
                        output.push(traverser);
                    }
                }
                "transform" => {
                    for value in result {
                        match value {
                            Value::List(items) => output.extend(items),
                            other => output.push(other),
                        }
                    }
                }
                _ => output.push(traverser),
            }
        }

        trace!("Applied {}{{}} -> {} traversers", closure.name(), output.len());
        Ok(output)
    }

    // ========== Steps ==========

    fn apply_step(&self, step: &StepCall, stream: Vec<Value>, scope: &mut Scope) -> Result<Vec<Value>> {
        let output = match step.name() {
            "V" => {
                expect_arity(step, 1, 1)?;
                let store = self.store_argument(step, 0)?;
                store
                    .elements()?
                    .into_iter()
                    .map(|e| Value::Element(e.reference))
                    .collect()
            }
            "inject" => {
                let mut stream = stream;
                for argument in step.arguments() {
                    stream.push(self.evaluate(argument, scope)?);
                }
                stream
            }
            "hasLabel" => {
                let labels = step
                    .arguments()
                    .iter()
                    .map(|a| self.string_value(step, a, scope))
                    .collect::<Result<Vec<_>>>()?;
                let mut kept = Vec::new();
                for traverser in stream {
                    let element = self.resolve(&traverser, step)?;
                    if labels.iter().any(|l| element.has_label_name(l)) {
                        kept.push(traverser);
                    }
                }
                kept
            }
            "has" => {
                expect_arity(step, 2, 2)?;
                let key = self.string_value(step, &step.arguments()[0], scope)?;
                let expected = self.evaluate(&step.arguments()[1], scope)?;
                let mut kept = Vec::new();
                for traverser in stream {
                    let element = self.resolve(&traverser, step)?;
                    if element.get_property(&key).is_some_and(|v| v.loose_eq(&expected)) {
                        kept.push(traverser);
                    }
                }
                kept
            }
            "out" | "in" | "both" => {
                expect_arity(step, 0, 1)?;
                let direction = match step.name() {
                    "out" => Direction::Outgoing,
                    "in" => Direction::Incoming,
                    _ => Direction::Both,
                };
                let label = match step.arguments().first() {
                    Some(argument) => Some(self.string_value(step, argument, scope)?),
                    None => None,
                };
                let mut next = Vec::new();
                for traverser in &stream {
                    let reference = element_ref(traverser, step)?;
                    let store = self.store_of(reference)?;
                    for id in store.adjacent(reference.element, direction, label.as_deref())? {
                        next.push(Value::Element(ElementRef::new(reference.store, id)));
                    }
                }
                next
            }
            "values" => {
                expect_arity(step, 1, 1)?;
                let key = self.string_value(step, &step.arguments()[0], scope)?;
                let mut next = Vec::new();
                for traverser in &stream {
                    match self.resolve(traverser, step)?.get_property(&key) {
                        Some(Value::List(items)) => next.extend(items.iter().cloned()),
                        Some(value) => next.push(value.clone()),
                        None => {}
                    }
                }
                next
            }
            "dedup" => {
                expect_arity(step, 0, 0)?;
                dedup(stream)
            }
            "count" => {
                expect_arity(step, 0, 0)?;
                vec![Value::Integer(stream.len() as i64)]
            }
            "limit" => {
                expect_arity(step, 1, 1)?;
                let limit = match self.evaluate(&step.arguments()[0], scope)? {
                    Value::Integer(n) if n >= 0 => n as usize,
                    other => {
                        return Err(Error::Execution(format!(
                            "limit() expects a non-negative integer, got {}",
                            other
                        )));
                    }
                };
                let mut stream = stream;
                stream.truncate(limit);
                stream
            }
            "hasNext" => {
                expect_arity(step, 0, 0)?;
                vec![Value::Boolean(!stream.is_empty())]
            }
            "isEmpty" => {
                expect_arity(step, 0, 0)?;
                vec![Value::Boolean(stream.is_empty())]
            }
            "addV" => {
                expect_arity(step, 2, 2)?;
                let store = self.store_argument(step, 0)?;
                let label = self.string_value(step, &step.arguments()[1], scope)?;
                let element = store.create_element(&[Label::new(label)])?;
                vec![Value::Element(element.reference)]
            }
            "property" => {
                expect_arity(step, 2, 2)?;
                let key = self.string_value(step, &step.arguments()[0], scope)?;
                for traverser in &stream {
                    let reference = element_ref(traverser, step)?;
                    scope.push((IMPLICIT_PARAMETER.to_string(), traverser.clone()));
                    let value = self.evaluate(&step.arguments()[1], scope);
                    scope.pop();
                    self.store_of(reference)?
                        .set_property(reference.element, &key, value?)?;
                }
                stream
            }
            other => {
                return Err(Error::Execution(format!("unsupported step {}()", other)));
            }
        };

        trace!("Applied {}() -> {} traversers", step.name(), output.len());
        Ok(output)
    }

    /// A step argument naming a bound store handle
    fn store_argument(&self, step: &StepCall, index: usize) -> Result<&'a Arc<dyn ModelStore>> {
        match step.arguments().get(index) {
            Some(Expression::Variable(variable)) => {
                self.environment.store(variable.name()).ok_or_else(|| {
                    Error::Execution(format!(
                        "{}() expects a store handle, `{}` is not one",
                        step.name(),
                        variable.name()
                    ))
                })
            }
            _ => Err(Error::Execution(format!(
                "{}() expects a store handle as argument {}",
                step.name(),
                index + 1
            ))),
        }
    }

    fn string_value(&self, step: &StepCall, argument: &Expression, scope: &Scope) -> Result<String> {
        match self.evaluate(argument, scope)? {
            Value::String(s) => Ok(s),
            other => Err(Error::Execution(format!(
                "{}() expects a string argument, got {}",
                step.name(),
                other
            ))),
        }
    }

    /// The bound store that handed out `reference`
    fn store_of(&self, reference: ElementRef) -> Result<&'a Arc<dyn ModelStore>> {
        self.environment.store_by_id(reference.store).ok_or_else(|| {
            Error::Execution(format!("element {} belongs to no bound store", reference))
        })
    }

    fn resolve(&self, value: &Value, step: &StepCall) -> Result<ModelElement> {
        let reference = element_ref(value, step)?;
        self.lookup(reference)
    }

    fn lookup(&self, reference: ElementRef) -> Result<ModelElement> {
        self.store_of(reference)?
            .lookup(reference.element)?
            .ok_or_else(|| Error::Execution(format!("element {} not found", reference)))
    }

    // ========== Expressions ==========

    fn evaluate(&self, expr: &Expression, scope: &Scope) -> Result<Value> {
        match expr {
            Expression::Literal(literal) => Ok(literal.to_value()),
            Expression::Variable(variable) => self.variable(variable.name(), scope),
            Expression::Property { target, name } => {
                let target = self.evaluate(target, scope)?;
                self.navigate(&target, name)
            }
            Expression::List(items) => items
                .iter()
                .map(|item| self.evaluate(item, scope))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Expression::Unary { op, operand } => {
                let value = self.evaluate(operand, scope)?;
                evaluate_unary(*op, value)
            }
            Expression::Binary { op, left, right } => match op {
                BinaryOperator::And => {
                    if !truth(*op, self.evaluate(left, scope)?)? {
                        return Ok(Value::Boolean(false));
                    }
                    Ok(Value::Boolean(truth(*op, self.evaluate(right, scope)?)?))
                }
                BinaryOperator::Or => {
                    if truth(*op, self.evaluate(left, scope)?)? {
                        return Ok(Value::Boolean(true));
                    }
                    Ok(Value::Boolean(truth(*op, self.evaluate(right, scope)?)?))
                }
                _ => {
                    let left = self.evaluate(left, scope)?;
                    let right = self.evaluate(right, scope)?;
                    evaluate_binary(*op, &left, &right)
                }
            },
        }
    }

    fn variable(&self, name: &str, scope: &Scope) -> Result<Value> {
        if let Some((_, value)) = scope.iter().rev().find(|(bound, _)| bound == name) {
            return Ok(value.clone());
        }
        match self.environment.get(name) {
            Some(Binding::Value(value)) => Ok(value.clone()),
            Some(Binding::Store(_)) => Err(Error::Execution(format!(
                "store handle `{}` cannot be used as a value",
                name
            ))),
            None => Err(Error::Execution(format!("unbound variable `{}`", name))),
        }
    }

    /// Attribute value, else outgoing reference targets, else null
    fn navigate(&self, target: &Value, feature: &str) -> Result<Value> {
        match target {
            Value::Null => Ok(Value::Null),
            Value::List(items) => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    match self.navigate(item, feature)? {
                        Value::List(inner) => mapped.extend(inner),
                        other => mapped.push(other),
                    }
                }
                Ok(Value::List(mapped))
            }
            Value::Element(reference) => {
                let element = self.lookup(*reference)?;
                if let Some(value) = element.get_property(feature) {
                    return Ok(value.clone());
                }
                let targets = self.store_of(*reference)?.adjacent(
                    reference.element,
                    Direction::Outgoing,
                    Some(feature),
                )?;
                let mut targets: Vec<Value> = targets
                    .into_iter()
                    .map(|id| Value::Element(ElementRef::new(reference.store, id)))
                    .collect();
                Ok(match targets.len() {
                    0 => Value::Null,
                    1 => targets.remove(0),
                    _ => Value::List(targets),
                })
            }
            other => Err(Error::Execution(format!(
                "cannot navigate `{}` on {} value {}",
                feature,
                other.type_name(),
                other
            ))),
        }
    }
}

fn expect_arity(step: &StepCall, min: usize, max: usize) -> Result<()> {
    let count = step.arguments().len();
    if count < min || count > max {
        return Err(Error::Execution(format!(
            "{}() takes {} arguments, got {}",
            step.name(),
            if min == max {
                min.to_string()
            } else {
                format!("{} to {}", min, max)
            },
            count
        )));
    }
    Ok(())
}

fn element_ref(value: &Value, step: &StepCall) -> Result<ElementRef> {
    value.as_element().ok_or_else(|| {
        Error::Execution(format!(
            "{}() expects elements, got {} value {}",
            step.name(),
            value.type_name(),
            value
        ))
    })
}

fn filter_outcome(result: &[Value]) -> Result<bool> {
    match result {
        [] => Ok(false),
        [Value::Boolean(b)] => Ok(*b),
        other => Err(Error::Execution(format!(
            "filter closure must yield a boolean, got {}",
            Value::List(other.to_vec())
        ))),
    }
}

fn truth(op: BinaryOperator, value: Value) -> Result<bool> {
    value.as_boolean().ok_or_else(|| {
        Error::Execution(format!(
            "`{}` expects booleans, got {} value {}",
            op,
            value.type_name(),
            value
        ))
    })
}

/// Order-preserving removal of duplicates
fn dedup<I: IntoIterator<Item = Value>>(values: I) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for value in values {
        if !out.iter().any(|seen| seen.loose_eq(&value)) {
            out.push(value);
        }
    }
    out
}

fn evaluate_unary(op: UnaryOperator, value: Value) -> Result<Value> {
    match (op, value) {
        (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOperator::Negate, Value::Integer(i)) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| Error::Execution("integer overflow".to_string())),
        (UnaryOperator::Negate, Value::Float(f)) => Ok(Value::Float(-f)),
        (op, value) => Err(Error::Execution(format!(
            "`{}` cannot be applied to {} value {}",
            op,
            value.type_name(),
            value
        ))),
    }
}

fn evaluate_binary(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOperator::Equality => Ok(Value::Boolean(left.loose_eq(right))),
        BinaryOperator::Difference => Ok(Value::Boolean(!left.loose_eq(right))),
        BinaryOperator::Less
        | BinaryOperator::LessOrEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterOrEqual => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Boolean(false));
            }
            let ordering = left.compare(right).ok_or_else(|| mismatch(op, left, right))?;
            Ok(Value::Boolean(match op {
                BinaryOperator::Less => ordering == Ordering::Less,
                BinaryOperator::LessOrEqual => ordering != Ordering::Greater,
                BinaryOperator::Greater => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOperator::And | BinaryOperator::Or => {
            let l = truth(op, left.clone())?;
            let r = truth(op, right.clone())?;
            Ok(Value::Boolean(if op == BinaryOperator::And {
                l && r
            } else {
                l || r
            }))
        }
        BinaryOperator::Add => match (left, right) {
            (Value::String(_), _) | (_, Value::String(_)) => {
                Ok(Value::String(format!("{}{}", text(left), text(right))))
            }
            (Value::List(a), Value::List(b)) => {
                Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
            }
            _ => arithmetic(op, left, right),
        },
        BinaryOperator::Subtract | BinaryOperator::Multiply => arithmetic(op, left, right),
        BinaryOperator::Divide => match (left.as_float(), right.as_float()) {
            (Some(_), Some(divisor)) if divisor == 0.0 => {
                Err(Error::Execution("division by zero".to_string()))
            }
            (Some(dividend), Some(divisor)) => Ok(Value::Float(dividend / divisor)),
            _ => Err(mismatch(op, left, right)),
        },
        BinaryOperator::Union => {
            let (a, b) = lists(op, left, right)?;
            Ok(Value::List(dedup(a.iter().chain(b.iter()).cloned())))
        }
        BinaryOperator::Intersection => {
            let (a, b) = lists(op, left, right)?;
            Ok(Value::List(dedup(
                a.iter().filter(|x| b.iter().any(|y| x.loose_eq(y))).cloned(),
            )))
        }
    }
}

fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value> {
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        let result = match op {
            BinaryOperator::Add => a.checked_add(*b),
            BinaryOperator::Subtract => a.checked_sub(*b),
            _ => a.checked_mul(*b),
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| Error::Execution("integer overflow".to_string()));
    }
    match (left.as_float(), right.as_float()) {
        (Some(a), Some(b)) => Ok(Value::Float(match op {
            BinaryOperator::Add => a + b,
            BinaryOperator::Subtract => a - b,
            _ => a * b,
        })),
        _ => Err(mismatch(op, left, right)),
    }
}

fn lists<'v>(op: BinaryOperator, left: &'v Value, right: &'v Value) -> Result<(&'v [Value], &'v [Value])> {
    match (left.as_list(), right.as_list()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(mismatch(op, left, right)),
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn mismatch(op: BinaryOperator, left: &Value, right: &Value) -> Error {
    Error::Execution(format!(
        "`{}` cannot be applied to {} and {}",
        op,
        left.type_name(),
        right.type_name()
    ))
}

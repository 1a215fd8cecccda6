//! Tree-walking interpreter
//!
//! Evaluates a checked [`Program`] statement by statement. Every call resolves
//! through the receiver's dispatch table, so the body that runs is always the
//! most specific override for the receiver's concrete class. `return` travels
//! back as [`Flow::Returning`] and stops at the frame it was raised in.

use crate::error::{InterpreterError, RuntimeResult, StackEntry};
use crate::frame::Frame;
use crate::heap::{Heap, HeapResult, InstanceData, InstanceId, Value};
use crate::primitives::{self, PrimitiveError};
use compiler::{ClassId, ClassRegistry, MethodId, MethodKey, MethodKind, Program};
use log::{debug, info, trace};
use num_bigint::BigInt;
use parser::{Expr, ExprKind, Ident, Operator, Span, Stmt, StmtKind};
use smallvec::SmallVec;
use source_map::SourceLocation;
use std::io::Write;

/// Default limit on nested calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

/// Stack left before a call or expression moves to a fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    /// Nested calls allowed before the run fails with "call stack overflow"
    pub max_call_depth: usize,
    /// Instances the heap may hold, the two Booleans included
    pub max_instances: u32,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_instances: u32::MAX,
        }
    }
}

/// How a statement sequence finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Completed,
    /// A `return` ran; the payload is the returned value (`None` for a bare `return;`)
    Returning(Value),
}

type Args = SmallVec<[Value; 4]>;

pub struct Interpreter<'p, W: Write> {
    program: &'p Program,
    heap: Heap,
    frames: Vec<Frame>,
    out: W,
    options: InterpreterOptions,
}

impl<'p, W: Write> Interpreter<'p, W> {
    pub fn new(program: &'p Program, out: W) -> Self {
        Self::with_options(program, out, InterpreterOptions::default())
    }

    pub fn with_options(program: &'p Program, out: W, options: InterpreterOptions) -> Self {
        Self {
            program,
            heap: Heap::with_limit(program.builtins, options.max_instances),
            frames: Vec::new(),
            out,
            options,
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn registry(&self) -> &'p ClassRegistry {
        &self.program.registry
    }

    /// Execute the main program to completion or to the first failure
    pub fn run(&mut self) -> RuntimeResult<()> {
        let program = self.program;
        info!("interpreting {} top-level statements", program.main.len());

        let receiver = self
            .instantiate(program.builtins.object)
            .map_err(|e| InterpreterError::fault(e.to_string()))?;
        self.frames.clear();
        self.frames.push(Frame::main(receiver, program.main_file));

        let result = self.exec_block(&program.main);
        self.out
            .flush()
            .map_err(|e| InterpreterError::fault(format!("cannot write to standard output: {}", e)))?;
        match result? {
            Flow::Completed => {}
            Flow::Returning(_) => {
                return Err(self.fail("return statement is not allowed in main program", None))
            }
        }
        self.frames.pop();
        info!("program finished with {} live instances", self.heap.len());
        Ok(())
    }

    fn frame(&self) -> RuntimeResult<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| InterpreterError::fault("no active frame"))
    }

    fn frame_mut(&mut self) -> RuntimeResult<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| InterpreterError::fault("no active frame"))
    }

    fn locate(&self, span: Span) -> Option<SourceLocation> {
        self.frames.last().map(|frame| span.at(frame.file))
    }

    fn set_location(&mut self, span: Span) {
        if let Some(frame) = self.frames.last_mut() {
            frame.location = Some(span.at(frame.file));
        }
    }

    /// Snapshot of the live frames, innermost first
    fn stack_trace(&self) -> Vec<StackEntry> {
        let registry = self.registry();
        self.frames
            .iter()
            .rev()
            .map(|frame| StackEntry {
                frame: frame.method.map(|id| {
                    let method = registry.method(id);
                    format!("{}.{}", registry.class_name(method.owner), method.key)
                }),
                location: frame.location,
            })
            .collect()
    }

    fn fail(&self, message: impl Into<String>, location: Option<SourceLocation>) -> InterpreterError {
        self.attach(InterpreterError::fault(message), location)
    }

    fn attach(&self, mut error: InterpreterError, location: Option<SourceLocation>) -> InterpreterError {
        error.location = location;
        error.stack_trace = self.stack_trace();
        error
    }

    fn instantiate(&mut self, class: ClassId) -> HeapResult<InstanceId> {
        let registry = self.registry();
        let fields = registry.instance_fields(class);
        self.heap
            .new_object(class, fields.iter().map(|field| field.name.as_str()))
    }

    /// Turn an exhausted heap into a fault at `location`
    fn allocated(&self, id: HeapResult<InstanceId>, location: Option<SourceLocation>) -> RuntimeResult<Value> {
        id.map(Some).map_err(|e| self.fail(e.to_string(), location))
    }

    fn exec_block(&mut self, stmts: &[Stmt]) -> RuntimeResult<Flow> {
        for stmt in stmts {
            if let Flow::Returning(value) = self.exec_stmt(stmt)? {
                return Ok(Flow::Returning(value));
            }
        }
        Ok(Flow::Completed)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> RuntimeResult<Flow> {
        self.set_location(stmt.span);
        match &stmt.kind {
            StmtKind::VarDecl { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval(expr)?,
                    None => None,
                };
                self.frame_mut()?.bind(name.name.as_str(), value);
            }
            StmtKind::Assign { name, value } => {
                let value = self.eval(value)?;
                if !self.frame_mut()?.assign(&name.name, value) {
                    let location = self.locate(name.span);
                    return Err(self.fail(format!("undefined variable {}", name.name), location));
                }
            }
            StmtKind::FieldAssign { field, value } => {
                let value = self.eval(value)?;
                let receiver = self.frame()?.receiver;
                match &mut self.heap.get_mut(receiver).data {
                    InstanceData::Object(fields) if fields.contains_key(&field.name) => {
                        fields.insert(field.name.clone(), value);
                    }
                    _ => {
                        let location = self.locate(field.span);
                        return Err(self.fail(format!("undefined field {}", field.name), location));
                    }
                }
            }
            StmtKind::While { cond, body } => loop {
                if !self.condition(cond)? {
                    break;
                }
                if let Flow::Returning(value) = self.exec_block(body)? {
                    return Ok(Flow::Returning(value));
                }
                self.set_location(stmt.span);
            },
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                if self.condition(cond)? {
                    return self.exec_block(then_body);
                }
                if let Some(else_body) = else_body {
                    return self.exec_block(else_body);
                }
            }
            StmtKind::Return(value) => {
                if self.frame()?.is_main() {
                    let location = self.locate(stmt.span);
                    return Err(self.fail("return statement is not allowed in main program", location));
                }
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => None,
                };
                return Ok(Flow::Returning(value));
            }
            StmtKind::Call(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(Flow::Completed)
    }

    /// Evaluate an `if`/`while` test
    fn condition(&mut self, cond: &Expr) -> RuntimeResult<bool> {
        let value = self.eval(cond)?;
        self.expect_bool(value, cond.span)
    }

    fn expect_bool(&self, value: Value, span: Span) -> RuntimeResult<bool> {
        let Some(id) = value else {
            return Err(self.fail("expression is null", self.locate(span)));
        };
        self.heap
            .as_bool(id)
            .ok_or_else(|| self.fail("expression is not boolean", self.locate(span)))
    }

    /// Evaluate one expression, growing the host stack when it runs low
    pub fn eval(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match &expr.kind {
            ExprKind::Integer(digits) => {
                let value: BigInt = digits.parse().map_err(|_| {
                    self.fail(format!("invalid integer literal {}", digits), self.locate(expr.span))
                })?;
                let id = self.heap.integer(value);
                self.allocated(id, self.locate(expr.span))
            }
            ExprKind::Float(value) => {
                let id = self.heap.float(*value);
                self.allocated(id, self.locate(expr.span))
            }
            ExprKind::String(text) => {
                let id = self.heap.string(text);
                self.allocated(id, self.locate(expr.span))
            }
            ExprKind::True => Ok(Some(self.heap.boolean(true))),
            ExprKind::False => Ok(Some(self.heap.boolean(false))),
            ExprKind::Null => Ok(None),
            ExprKind::SelfRef => Ok(Some(self.frame()?.receiver)),
            ExprKind::Var(name) => match self.frame()?.get(&name.name) {
                Some(value) => Ok(value),
                None => Err(self.fail(
                    format!("undefined variable {}", name.name),
                    self.locate(name.span),
                )),
            },
            ExprKind::Field(name) => self.read_field(name),
            ExprKind::New(class) => {
                let registry = self.registry();
                let Some(id) = registry.get(&class.name) else {
                    return Err(self.fail(
                        format!("class {} has not yet been defined", class.name),
                        self.locate(class.span),
                    ));
                };
                if registry.class(id).is_value_class() {
                    return Err(self.fail("invalid use of new operator", self.locate(expr.span)));
                }
                let instance = self.instantiate(id);
                self.allocated(instance, self.locate(expr.span))
            }
            ExprKind::Not(operand) => {
                let value = self.eval(operand)?;
                let flag = self.expect_bool(value, expr.span)?;
                Ok(Some(self.heap.boolean(!flag)))
            }
            ExprKind::Is { left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                Ok(Some(self.heap.boolean(left == right)))
            }
            ExprKind::Isa { expr: inner, class } => {
                let value = self.eval(inner)?;
                let registry = self.registry();
                let Some(required) = registry.get(&class.name) else {
                    return Err(self.fail(
                        format!("class {} has not yet been defined", class.name),
                        self.locate(class.span),
                    ));
                };
                let holds = match value {
                    None => true,
                    Some(id) => registry.isa(self.heap.class_of(id), required),
                };
                Ok(Some(self.heap.boolean(holds)))
            }
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, left, right, expr.span),
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let target = self.eval(receiver)?;
                self.set_location(method.span);
                let Some(target) = target else {
                    return Err(self.fail(
                        format!("receiver of {} method is null", method.name),
                        self.locate(method.span),
                    ));
                };
                self.call_named(target, method, args)
            }
            ExprKind::SelfCall { method, args } => {
                let target = self.frame()?.receiver;
                self.call_named(target, method, args)
            }
        }
    }

    fn read_field(&self, name: &Ident) -> RuntimeResult<Value> {
        let receiver = self.frame()?.receiver;
        match &self.heap.get(receiver).data {
            InstanceData::Object(fields) => fields.get(&name.name).copied().ok_or_else(|| {
                self.fail(format!("undefined field {}", name.name), self.locate(name.span))
            }),
            _ => Err(self.fail(
                format!("undefined field {}", name.name),
                self.locate(name.span),
            )),
        }
    }

    fn eval_binary(&mut self, op: Operator, left: &Expr, right: &Expr, span: Span) -> RuntimeResult<Value> {
        let left = self.eval(left)?;
        let right = self.eval(right)?;
        self.set_location(span);
        let location = self.locate(span);

        if op.is_equality() {
            let (Some(l), Some(r)) = (left, right) else {
                let same = left == right;
                let holds = if op == Operator::Eq { same } else { !same };
                return Ok(Some(self.heap.boolean(holds)));
            };
            return self.call_operator(op, l, r, location);
        }

        if op.is_ordering() {
            let Some(l) = left else {
                return Err(self.fail("left member cannot be null", location));
            };
            let Some(r) = right else {
                return Err(self.fail("right member cannot be null", location));
            };
            if primitives::is_number(&self.heap, l) {
                if !primitives::is_number(&self.heap, r) {
                    return Err(self.fail("right member must be Integer or Float", location));
                }
                let ordering = primitives::compare_numbers(&self.heap, l, r);
                let holds = primitives::apply_ordering(op, ordering);
                return Ok(Some(self.heap.boolean(holds)));
            }
            return self.call_operator(op, l, r, location);
        }

        let Some(l) = left else {
            return Err(self.fail(format!("left argument of {} method is null", op), location));
        };
        let Some(r) = right else {
            return Err(self.fail(format!("right argument of {} method is null", op), location));
        };
        self.call_operator(op, l, r, location)
    }

    fn call_operator(
        &mut self,
        op: Operator,
        left: InstanceId,
        right: InstanceId,
        location: Option<SourceLocation>,
    ) -> RuntimeResult<Value> {
        let class = self.heap.class_of(left);
        let key = MethodKey::Operator(op);
        let Some(method) = self.registry().dispatch(class, &key) else {
            return Err(self.fail(
                format!("class {} has no method {}", self.registry().class_name(class), op),
                location,
            ));
        };
        let mut args = Args::new();
        args.push(Some(right));
        self.invoke(method, left, args, location)
    }

    fn call_named(&mut self, receiver: InstanceId, method: &Ident, args: &[Expr]) -> RuntimeResult<Value> {
        let location = self.locate(method.span);
        let class = self.heap.class_of(receiver);
        let registry = self.registry();
        let Some(id) = registry.dispatch(class, &MethodKey::named(method.name.as_str())) else {
            return Err(self.fail(
                format!("class {} has no method {}", registry.class_name(class), method.name),
                location,
            ));
        };
        trace!("{}.{} dispatches to {}", registry.class_name(class), method.name, id);

        let expected = registry.method(id).params.len();
        if expected != args.len() {
            return Err(self.fail(
                format!("method {} expects {} arguments", method.name, expected),
                location,
            ));
        }

        let mut values = Args::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        self.set_location(method.span);
        self.invoke(id, receiver, values, location)
    }

    /// Run `id` on `receiver` in a fresh frame
    fn invoke(
        &mut self,
        id: MethodId,
        receiver: InstanceId,
        args: Args,
        call_site: Option<SourceLocation>,
    ) -> RuntimeResult<Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || {
            self.invoke_inner(id, receiver, args, call_site)
        })
    }

    fn invoke_inner(
        &mut self,
        id: MethodId,
        receiver: InstanceId,
        args: Args,
        call_site: Option<SourceLocation>,
    ) -> RuntimeResult<Value> {
        if self.frames.len() > self.options.max_call_depth {
            return Err(self.fail("call stack overflow", call_site));
        }
        let registry = self.registry();
        let method = registry.method(id);
        let mut frame = Frame::method(receiver, id, method.file());
        for (param, value) in method.params.iter().zip(args.iter()) {
            frame.bind(param.name.as_str(), *value);
        }
        debug!(
            "enter {}.{} at depth {}",
            registry.class_name(method.owner),
            method.key,
            self.frames.len()
        );
        self.frames.push(frame);

        let result = match &method.kind {
            MethodKind::User(body) => self.exec_block(body).map(|flow| match flow {
                Flow::Returning(value) => value,
                Flow::Completed => None,
            }),
            MethodKind::Primitive(primitive) => {
                primitives::invoke(*primitive, &mut self.heap, &mut self.out, receiver, &args)
                    .map_err(|error| self.primitive_failure(error, call_site))
            }
        };

        self.frames.pop();
        result
    }

    fn primitive_failure(&self, error: PrimitiveError, call_site: Option<SourceLocation>) -> InterpreterError {
        let error = match error {
            PrimitiveError::Abort(message) => InterpreterError::abort(message),
            other => InterpreterError::fault(other.to_string()),
        };
        self.attach(error, call_site)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compiler::compile_mino_source;
    use diagnostics::SourceMap;

    fn run(source: &str) -> (RuntimeResult<()>, String) {
        let mut source_map = SourceMap::new();
        let program = compile_mino_source(&mut source_map, "unit.mino", source)
            .unwrap_or_else(|e| panic!("program should check: {}", e));
        let mut interpreter = Interpreter::new(&program, Vec::new());
        let result = interpreter.run();
        let output = String::from_utf8(interpreter.into_output()).unwrap();
        (result, output)
    }

    #[test]
    fn test_prints_in_order() {
        let (result, output) = run(r#""one".to_system_out(); "two".to_system_out();"#);
        assert!(result.is_ok());
        assert_eq!(output, "one\ntwo\n");
    }

    #[test]
    fn test_return_unwinds_nested_blocks() {
        let (result, output) = run(
            r#"
class Finder {
    fun first_over(limit: Integer): Integer {
        var i: Integer = 0;
        while (true) {
            if (i > limit) { return i; }
            i = i + 1;
        }
        return 0 - 1;
    }
}
var f: Finder = new Finder;
f.first_over(3).to_s().to_system_out();
"#,
        );
        assert!(result.is_ok(), "{:?}", result);
        assert_eq!(output, "4\n");
    }

    #[test]
    fn test_call_depth_limit() {
        let mut source_map = SourceMap::new();
        let program = compile_mino_source(
            &mut source_map,
            "deep.mino",
            "class Deep { fun down(): Integer { return down(); } } var d: Deep = new Deep; d.down();",
        )
        .unwrap();
        let options = InterpreterOptions {
            max_call_depth: 50,
            ..InterpreterOptions::default()
        };
        let mut interpreter = Interpreter::with_options(&program, Vec::new(), options);
        let error = interpreter.run().unwrap_err();
        assert_eq!(error.message, "call stack overflow");
        assert_eq!(error.stack_trace.len(), 51);
        assert_eq!(error.stack_trace.last().and_then(|e| e.frame.clone()), None);
    }

    #[test]
    fn test_heap_limit_is_a_fault() {
        let mut source_map = SourceMap::new();
        let program = compile_mino_source(
            &mut source_map,
            "many.mino",
            "class Box { }\nvar b: Box;\nwhile (true) {\n    b = new Box;\n}",
        )
        .unwrap();
        let options = InterpreterOptions {
            max_instances: 64,
            ..InterpreterOptions::default()
        };
        let mut interpreter = Interpreter::with_options(&program, Vec::new(), options);
        let error = interpreter.run().unwrap_err();
        assert_eq!(error.message, "heap exhausted after 64 instances");
        assert_eq!(interpreter.heap().len(), 64);
        let location = error.location.unwrap();
        assert_eq!(source_map.get_file(location.file).unwrap().offset_to_line_col(location.start).0, 4);
    }
}

//! Native bodies of `primitive` methods
//!
//! The interpreter resolves the receiver's dispatch table as for any call and
//! lands here when the winning entry is a [`Primitive`]. Arguments are
//! already evaluated; the caller attaches the location and stack trace to any
//! failure.

use crate::heap::{Heap, HeapExhausted, InstanceData, InstanceId, Value};
use compiler::Primitive;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use parser::Operator;
use std::cmp::Ordering;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrimitiveError {
    #[error("right argument is not {0}")]
    BadArgument(&'static str),
    #[error("division by zero")]
    DivisionByZero,
    #[error("abort argument is null")]
    NullAbortMessage,
    #[error("abort argument is not String")]
    AbortMessageNotString,
    /// Program-requested termination; the payload is the user message
    #[error("ABORT: {0}")]
    Abort(String),
    #[error("receiver of {0} is not a {1}")]
    BadReceiver(&'static str, &'static str),
    #[error("primitive expects {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("cannot write to standard output: {0}")]
    Output(String),
    #[error(transparent)]
    Heap(#[from] HeapExhausted),
}

/// Numeric payload of an Integer or Float instance
enum Number {
    Integer(BigInt),
    Float(f32),
}

impl Number {
    fn of(heap: &Heap, value: Value) -> Option<Number> {
        match &heap.get(value?).data {
            InstanceData::Integer(n) => Some(Number::Integer(n.clone())),
            InstanceData::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    fn to_f32(&self) -> f32 {
        match self {
            Number::Integer(n) => n.to_f32().unwrap_or(f32::NAN),
            Number::Float(f) => *f,
        }
    }
}

/// Java-compatible rendering: `2.5`, `3.0`, `1.0E10`, `NaN`, `Infinity`
pub fn float_to_string(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        let text = value.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        let text = format!("{:e}", value);
        match text.split_once('e') {
            Some((mantissa, exponent)) if mantissa.contains('.') => {
                format!("{}E{}", mantissa, exponent)
            }
            Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
            None => text,
        }
    }
}

/// Text used when a value is appended to a String
fn display_for_concat(heap: &Heap, value: InstanceId) -> Option<String> {
    match &heap.get(value).data {
        InstanceData::Integer(n) => Some(n.to_string()),
        InstanceData::Float(f) => Some(float_to_string(*f)),
        InstanceData::String(s) => Some(s.clone()),
        InstanceData::Boolean(b) => Some(b.to_string()),
        InstanceData::Object(_) => None,
    }
}

fn floored_float_mod(left: f32, right: f32) -> f32 {
    left - right * (left / right).floor()
}

fn float_arith(op: Operator, left: f32, right: f32) -> Result<f32, PrimitiveError> {
    Ok(match op {
        Operator::Plus => left + right,
        Operator::Minus => left - right,
        Operator::Mult => left * right,
        Operator::Div if right == 0.0 => return Err(PrimitiveError::DivisionByZero),
        Operator::Div => left / right,
        Operator::Modul if right == 0.0 => return Err(PrimitiveError::DivisionByZero),
        Operator::Modul => floored_float_mod(left, right),
        _ => return Err(PrimitiveError::BadReceiver("operator", "arithmetic operator")),
    })
}

fn integer_receiver(heap: &Heap, receiver: InstanceId) -> Result<BigInt, PrimitiveError> {
    match &heap.get(receiver).data {
        InstanceData::Integer(n) => Ok(n.clone()),
        _ => Err(PrimitiveError::BadReceiver("Integer method", "Integer")),
    }
}

fn float_receiver(heap: &Heap, receiver: InstanceId) -> Result<f32, PrimitiveError> {
    match &heap.get(receiver).data {
        InstanceData::Float(f) => Ok(*f),
        _ => Err(PrimitiveError::BadReceiver("Float method", "Float")),
    }
}

fn string_receiver(heap: &Heap, receiver: InstanceId) -> Result<String, PrimitiveError> {
    heap.as_str(receiver)
        .map(str::to_string)
        .ok_or(PrimitiveError::BadReceiver("String method", "String"))
}

fn integer_arith(
    heap: &mut Heap,
    op: Operator,
    receiver: InstanceId,
    arg: Value,
) -> Result<InstanceId, PrimitiveError> {
    let left = integer_receiver(heap, receiver)?;
    if op == Operator::Plus {
        if let Some(text) = arg.and_then(|id| heap.as_str(id)) {
            let joined = format!("{}{}", left, text);
            return Ok(heap.string(&joined)?);
        }
    }
    let right = match (op, Number::of(heap, arg)) {
        (_, Some(Number::Integer(n))) => n,
        (Operator::Plus | Operator::Minus | Operator::Mult, Some(Number::Float(f))) => {
            let left = Number::Integer(left).to_f32();
            return Ok(heap.float(float_arith(op, left, f)?)?);
        }
        (Operator::Plus, _) => return Err(PrimitiveError::BadArgument("Integer, Float nor String")),
        (Operator::Minus | Operator::Mult, _) => {
            return Err(PrimitiveError::BadArgument("Integer nor Float"))
        }
        _ => return Err(PrimitiveError::BadArgument("Integer")),
    };
    let result = match op {
        Operator::Plus => left + right,
        Operator::Minus => left - right,
        Operator::Mult => left * right,
        Operator::Div | Operator::Modul if right.is_zero() => {
            return Err(PrimitiveError::DivisionByZero)
        }
        Operator::Div => left / right,
        Operator::Modul => left.mod_floor(&right),
        _ => return Err(PrimitiveError::BadReceiver("operator", "arithmetic operator")),
    };
    Ok(heap.integer(result)?)
}

fn float_op(
    heap: &mut Heap,
    op: Operator,
    receiver: InstanceId,
    arg: Value,
) -> Result<InstanceId, PrimitiveError> {
    let left = float_receiver(heap, receiver)?;
    if op == Operator::Plus {
        if let Some(text) = arg.and_then(|id| heap.as_str(id)) {
            let joined = format!("{}{}", float_to_string(left), text);
            return Ok(heap.string(&joined)?);
        }
    }
    let right = match Number::of(heap, arg) {
        Some(number) => number.to_f32(),
        None if op == Operator::Plus => {
            return Err(PrimitiveError::BadArgument("Integer, Float nor String"))
        }
        None => return Err(PrimitiveError::BadArgument("Integer nor Float")),
    };
    Ok(heap.float(float_arith(op, left, right)?)?)
}

/// Value comparison with Integer to Float widening; `None` for non-numbers
fn numeric_cmp(left: &Number, right: &Number) -> Option<Ordering> {
    match (left, right) {
        (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(b)),
        _ => left.to_f32().partial_cmp(&right.to_f32()),
    }
}

/// Ordering between two numeric instances, as used by `< <= > >=`
pub fn compare_numbers(heap: &Heap, left: InstanceId, right: InstanceId) -> Option<Ordering> {
    let left = Number::of(heap, Some(left))?;
    let right = Number::of(heap, Some(right))?;
    numeric_cmp(&left, &right)
}

pub fn is_number(heap: &Heap, value: InstanceId) -> bool {
    matches!(
        heap.get(value).data,
        InstanceData::Integer(_) | InstanceData::Float(_)
    )
}

fn numeric_equality(heap: &Heap, receiver: InstanceId, arg: Value) -> bool {
    let left = Number::of(heap, Some(receiver));
    let right = Number::of(heap, arg);
    match (left, right) {
        (Some(l), Some(r)) => numeric_cmp(&l, &r) == Some(Ordering::Equal),
        _ => false,
    }
}

fn ordering_holds(op: Operator, ordering: Ordering) -> bool {
    match op {
        Operator::Lt => ordering == Ordering::Less,
        Operator::Le => ordering != Ordering::Greater,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::Ge => ordering != Ordering::Less,
        Operator::Eq => ordering == Ordering::Equal,
        _ => ordering != Ordering::Equal,
    }
}

/// `op` applied to an already computed ordering
pub fn apply_ordering(op: Operator, ordering: Option<Ordering>) -> bool {
    ordering.is_some_and(|ordering| ordering_holds(op, ordering))
}

/// Run a native method body
pub fn invoke(
    primitive: Primitive,
    heap: &mut Heap,
    out: &mut dyn Write,
    receiver: InstanceId,
    args: &[Value],
) -> Result<Value, PrimitiveError> {
    if args.len() != primitive.arity() {
        return Err(PrimitiveError::Arity {
            expected: primitive.arity(),
            found: args.len(),
        });
    }
    let arg = args.first().copied().flatten();

    let result = match primitive {
        Primitive::Abort => {
            let message = arg.ok_or(PrimitiveError::NullAbortMessage)?;
            let text = heap
                .as_str(message)
                .ok_or(PrimitiveError::AbortMessageNotString)?;
            return Err(PrimitiveError::Abort(text.to_string()));
        }
        Primitive::Identity(op) => {
            let same = arg == Some(receiver);
            heap.boolean(if op == Operator::Eq { same } else { !same })
        }
        Primitive::NumericEquality(op) => {
            let equal = numeric_equality(heap, receiver, arg);
            heap.boolean(if op == Operator::Eq { equal } else { !equal })
        }
        Primitive::IntegerArith(op) => integer_arith(heap, op, receiver, arg)?,
        Primitive::FloatArith(op) => float_op(heap, op, receiver, arg)?,
        Primitive::IntegerToS => {
            let text = integer_receiver(heap, receiver)?.to_string();
            heap.string(&text)?
        }
        Primitive::FloatToS => {
            let text = float_to_string(float_receiver(heap, receiver)?);
            heap.string(&text)?
        }
        Primitive::StringConcat => {
            let left = string_receiver(heap, receiver)?;
            let right = arg
                .and_then(|id| display_for_concat(heap, id))
                .ok_or(PrimitiveError::BadArgument("Integer, Float, Boolean nor String"))?;
            heap.string(&(left + &right))?
        }
        Primitive::StringOrdering(op) => {
            let left = string_receiver(heap, receiver)?;
            let right = arg
                .and_then(|id| heap.as_str(id))
                .ok_or(PrimitiveError::BadArgument("String"))?;
            let holds = ordering_holds(op, left.as_str().cmp(right));
            heap.boolean(holds)
        }
        Primitive::StringPrint => {
            let text = string_receiver(heap, receiver)?;
            writeln!(out, "{}", text).map_err(|e| PrimitiveError::Output(e.to_string()))?;
            return Ok(None);
        }
    };
    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compiler::{BuiltinClasses, ClassId};

    fn heap() -> Heap {
        Heap::new(BuiltinClasses {
            object: ClassId::from_raw(0),
            boolean: ClassId::from_raw(1),
            integer: ClassId::from_raw(2),
            float: ClassId::from_raw(3),
            string: ClassId::from_raw(4),
        })
    }

    fn call(heap: &mut Heap, primitive: Primitive, receiver: InstanceId, args: &[Value]) -> Result<Value, PrimitiveError> {
        let mut out = Vec::new();
        invoke(primitive, heap, &mut out, receiver, args)
    }

    fn int(heap: &mut Heap, n: i64) -> InstanceId {
        heap.integer(BigInt::from(n)).unwrap()
    }

    #[test]
    fn test_integer_arithmetic() {
        let mut heap = heap();
        let seven = int(&mut heap, 7);
        let two = int(&mut heap, 2);
        let minus_seven = int(&mut heap, -7);
        let cases = [
            (Operator::Plus, seven, 9),
            (Operator::Minus, seven, 5),
            (Operator::Mult, seven, 14),
            (Operator::Div, seven, 3),
            (Operator::Modul, seven, 1),
            (Operator::Modul, minus_seven, 1),
            (Operator::Div, minus_seven, -3),
        ];
        for (op, left, expected) in cases {
            let result = call(&mut heap, Primitive::IntegerArith(op), left, &[Some(two)]).unwrap();
            assert_eq!(result, Some(int(&mut heap, expected)), "{:?}", op);
        }
    }

    #[test]
    fn test_integer_division_by_zero() {
        let mut heap = heap();
        let one = int(&mut heap, 1);
        let zero = int(&mut heap, 0);
        let error = call(&mut heap, Primitive::IntegerArith(Operator::Div), one, &[Some(zero)]).unwrap_err();
        assert_eq!(error, PrimitiveError::DivisionByZero);
        assert_eq!(error.to_string(), "division by zero");
    }

    #[test]
    fn test_integer_plus_string_concatenates() {
        let mut heap = heap();
        let one = int(&mut heap, 1);
        let text = heap.string("a").unwrap();
        let result = call(&mut heap, Primitive::IntegerArith(Operator::Plus), one, &[Some(text)]).unwrap();
        assert_eq!(result, Some(heap.string("1a").unwrap()));
    }

    #[test]
    fn test_integer_division_requires_integer() {
        let mut heap = heap();
        let one = int(&mut heap, 1);
        let half = heap.float(0.5).unwrap();
        let error = call(&mut heap, Primitive::IntegerArith(Operator::Div), one, &[Some(half)]).unwrap_err();
        assert_eq!(error.to_string(), "right argument is not Integer");
        let widened = call(&mut heap, Primitive::IntegerArith(Operator::Mult), one, &[Some(half)]).unwrap();
        assert_eq!(widened, Some(heap.float(0.5).unwrap()));
    }

    #[test]
    fn test_float_arithmetic_promotes_integers() {
        let mut heap = heap();
        let x = heap.float(2.5).unwrap();
        let two = int(&mut heap, 2);
        let sum = call(&mut heap, Primitive::FloatArith(Operator::Plus), x, &[Some(two)]).unwrap();
        assert_eq!(sum, Some(heap.float(4.5).unwrap()));
        let quotient = call(&mut heap, Primitive::FloatArith(Operator::Div), x, &[Some(two)]).unwrap();
        assert_eq!(quotient, Some(heap.float(1.25).unwrap()));
        let zero = heap.float(0.0).unwrap();
        let error = call(&mut heap, Primitive::FloatArith(Operator::Div), x, &[Some(zero)]).unwrap_err();
        assert_eq!(error, PrimitiveError::DivisionByZero);
    }

    #[test]
    fn test_string_concat_renders_values() {
        let mut heap = heap();
        let a = heap.string("a").unwrap();
        let one = int(&mut heap, 1);
        let step = call(&mut heap, Primitive::StringConcat, a, &[Some(one)]).unwrap().unwrap();
        let x = heap.float(2.5).unwrap();
        let done = call(&mut heap, Primitive::StringConcat, step, &[Some(x)]).unwrap();
        assert_eq!(done, Some(heap.string("a12.5").unwrap()));
        let yes = heap.boolean(true);
        let flag = call(&mut heap, Primitive::StringConcat, a, &[Some(yes)]).unwrap();
        assert_eq!(flag, Some(heap.string("atrue").unwrap()));
    }

    #[test]
    fn test_numeric_equality_widens() {
        let mut heap = heap();
        let two = int(&mut heap, 2);
        let two_f = heap.float(2.0).unwrap();
        let text = heap.string("2").unwrap();
        let eq = call(&mut heap, Primitive::NumericEquality(Operator::Eq), two, &[Some(two_f)]).unwrap();
        assert_eq!(eq, Some(heap.boolean(true)));
        let ne = call(&mut heap, Primitive::NumericEquality(Operator::NotEq), two, &[Some(text)]).unwrap();
        assert_eq!(ne, Some(heap.boolean(true)));
    }

    #[test]
    fn test_abort_messages() {
        let mut heap = heap();
        let object = heap.new_object(ClassId::from_raw(0), []).unwrap();
        let text = heap.string("bye").unwrap();
        let one = int(&mut heap, 1);
        assert_eq!(
            call(&mut heap, Primitive::Abort, object, &[Some(text)]),
            Err(PrimitiveError::Abort("bye".to_string()))
        );
        assert_eq!(
            call(&mut heap, Primitive::Abort, object, &[None]),
            Err(PrimitiveError::NullAbortMessage)
        );
        assert_eq!(
            call(&mut heap, Primitive::Abort, object, &[Some(one)]),
            Err(PrimitiveError::AbortMessageNotString)
        );
    }

    #[test]
    fn test_print_writes_a_line() {
        let mut heap = heap();
        let text = heap.string("hello").unwrap();
        let mut out = Vec::new();
        let result = invoke(Primitive::StringPrint, &mut heap, &mut out, text, &[]).unwrap();
        assert_eq!(result, None);
        assert_eq!(String::from_utf8(out).unwrap(), "hello\n");
    }

    #[test]
    fn test_float_rendering() {
        assert_eq!(float_to_string(2.5), "2.5");
        assert_eq!(float_to_string(3.0), "3.0");
        assert_eq!(float_to_string(-0.25), "-0.25");
        assert_eq!(float_to_string(1e10), "1.0E10");
        assert_eq!(float_to_string(f32::INFINITY), "Infinity");
    }

    #[test]
    fn test_string_ordering() {
        let mut heap = heap();
        let a = heap.string("apple").unwrap();
        let b = heap.string("banana").unwrap();
        let lt = call(&mut heap, Primitive::StringOrdering(Operator::Lt), a, &[Some(b)]).unwrap();
        assert_eq!(lt, Some(heap.boolean(true)));
        let ge = call(&mut heap, Primitive::StringOrdering(Operator::Ge), a, &[Some(b)]).unwrap();
        assert_eq!(ge, Some(heap.boolean(false)));
    }

    #[test]
    fn test_results_need_heap_room() {
        let mut heap = Heap::with_limit(
            BuiltinClasses {
                object: ClassId::from_raw(0),
                boolean: ClassId::from_raw(1),
                integer: ClassId::from_raw(2),
                float: ClassId::from_raw(3),
                string: ClassId::from_raw(4),
            },
            4,
        );
        let one = int(&mut heap, 1);
        let two = int(&mut heap, 2);
        assert_eq!(
            call(&mut heap, Primitive::IntegerArith(Operator::Mult), two, &[Some(two)]),
            Err(PrimitiveError::Heap(HeapExhausted(4)))
        );
        // An interned result still fits
        assert_eq!(
            call(&mut heap, Primitive::IntegerArith(Operator::Plus), one, &[Some(one)]),
            Ok(Some(two))
        );
    }
}

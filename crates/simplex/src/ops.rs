//! Native implementations of the built-in methods.
//!
//! [`apply_builtin`] is the execution side of every `MethodImpl::Builtin`
//! entry in the registry: it dispatches structurally on the receiver value
//! and the method name. The analyzer has already selected a signature, so a
//! combination falling through the match is an internal invariant breach.

use std::rc::Rc;

use simplex_geom::Solid;

use crate::{
    error::{EvalResult, SimplexError},
    types::Type,
    value::{Value, VectorValue},
};

/// Structural equality between two values.
///
/// Numbers compare within their own type (`1 == 1.0` is false), strings and
/// points by content, vectors element-wise, and records, closures, and
/// solids by reference identity.
pub(crate) fn eq_values(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Float(l), Value::Float(r)) => l == r,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        (Value::Vector(l), Value::Vector(r)) => {
            if Rc::ptr_eq(l, r) {
                return true;
            }
            let (l, r) = (l.borrow(), r.borrow());
            l.values.len() == r.values.len() && l.values.iter().zip(r.values.iter()).all(|(a, b)| eq_values(a, b))
        }
        (Value::Record(l), Value::Record(r)) => Rc::ptr_eq(l, r),
        (Value::Closure(l), Value::Closure(r)) => Rc::ptr_eq(l, r),
        (Value::Builtin(l), Value::Builtin(r)) => l == r,
        (Value::Solid(l), Value::Solid(r)) => Rc::ptr_eq(l, r),
        (Value::Polygon(l), Value::Polygon(r)) => l == r,
        (Value::Point(l), Value::Point(r)) => l == r,
        _ => false,
    }
}

fn division_by_zero() -> SimplexError {
    SimplexError::evaluation("division by zero")
}

fn overflow(op: &str) -> SimplexError {
    SimplexError::evaluation(format!("integer overflow in `{op}`"))
}

fn ordering_value(ordering: std::cmp::Ordering) -> Value {
    Value::Int(ordering as i64)
}

fn float_ordering(l: f64, r: f64) -> EvalResult<Value> {
    l.partial_cmp(&r)
        .map(ordering_value)
        .ok_or_else(|| SimplexError::evaluation("cannot order NaN"))
}

fn int_arith(op: &str, l: i64, r: i64) -> EvalResult<Value> {
    let result = match op {
        "plus" => l.checked_add(r),
        "minus" => l.checked_sub(r),
        "times" => l.checked_mul(r),
        "div" => {
            if r == 0 {
                return Err(division_by_zero());
            }
            l.checked_div(r)
        }
        "mod" => {
            if r == 0 {
                return Err(division_by_zero());
            }
            l.checked_rem(r)
        }
        "pow" => {
            if r < 0 {
                return Err(SimplexError::evaluation("negative exponent in integer `pow`"));
            }
            u32::try_from(r).ok().and_then(|exp| l.checked_pow(exp))
        }
        _ => return Err(internal_miss(&Type::int(), op)),
    };
    result.map(Value::Int).ok_or_else(|| overflow(op))
}

fn float_arith(op: &str, l: f64, r: f64) -> EvalResult<Value> {
    let result = match op {
        "plus" => l + r,
        "minus" => l - r,
        "times" => l * r,
        "div" => l / r,
        "mod" => l % r,
        "pow" => l.powf(r),
        _ => return Err(internal_miss(&Type::float(), op)),
    };
    Ok(Value::Float(result))
}

fn internal_miss(target: &Type, method: &str) -> SimplexError {
    SimplexError::internal(format!("no builtin implementation for `{target}.{method}`"))
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(*v),
        Value::Int(v) => Some(*v as f64),
        _ => None,
    }
}

/// Runs a built-in method against its receiver.
///
/// `args` are fully evaluated, in order. Arity and types were selected
/// through the registry, so mismatches here raise `Internal`.
pub(crate) fn apply_builtin(target: &Value, method: &str, args: &[Value]) -> EvalResult<Value> {
    // eq is uniform across every type that defines it.
    if method == "eq" {
        let other = args.first().ok_or_else(|| internal_miss(&target.value_type(), "eq"))?;
        return Ok(Value::Bool(eq_values(target, other)));
    }
    match target {
        Value::Int(l) => int_method(*l, method, args),
        Value::Float(l) => float_method(*l, method, args),
        Value::Bool(l) => match method {
            "not" => Ok(Value::Bool(!l)),
            _ => Err(internal_miss(&Type::boolean(), method)),
        },
        Value::Str(l) => string_method(l, method, args),
        Value::Vector(l) => vector_method(&l.borrow(), method, args),
        Value::Point(l) => point_method(*l, method, args),
        Value::Solid(l) => solid_method(l, method, args),
        Value::Polygon(l) => polygon_method(l, method, args),
        _ => Err(internal_miss(&target.value_type(), method)),
    }
}

fn int_method(l: i64, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (method, args) {
        ("neg", []) => l.checked_neg().map(Value::Int).ok_or_else(|| overflow("neg")),
        ("to_float", []) => Ok(Value::Float(l as f64)),
        ("compare", [Value::Int(r)]) => Ok(ordering_value(l.cmp(r))),
        ("compare", [Value::Float(r)]) => float_ordering(l as f64, *r),
        (op, [Value::Int(r)]) => int_arith(op, l, *r),
        (op, [Value::Float(r)]) => float_arith(op, l as f64, *r),
        _ => Err(internal_miss(&Type::int(), method)),
    }
}

fn float_method(l: f64, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (method, args) {
        ("neg", []) => Ok(Value::Float(-l)),
        ("sqrt", []) => {
            if l < 0.0 {
                return Err(SimplexError::evaluation("sqrt of a negative number"));
            }
            Ok(Value::Float(l.sqrt()))
        }
        ("compare", [r]) => {
            let r = as_float(r).ok_or_else(|| internal_miss(&Type::float(), "compare"))?;
            float_ordering(l, r)
        }
        (op, [r]) => {
            let r = as_float(r).ok_or_else(|| internal_miss(&Type::float(), op))?;
            float_arith(op, l, r)
        }
        _ => Err(internal_miss(&Type::float(), method)),
    }
}

fn string_method(l: &Rc<str>, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (method, args) {
        ("plus", [Value::Str(r)]) => Ok(Value::string(&format!("{l}{r}"))),
        ("times", [Value::Int(count)]) => {
            let count = usize::try_from(*count)
                .map_err(|_| SimplexError::evaluation("string repeat count must be non-negative"))?;
            Ok(Value::string(&l.repeat(count)))
        }
        ("compare", [Value::Str(r)]) => Ok(ordering_value(l.as_ref().cmp(r.as_ref()))),
        ("sub", [Value::Int(index)]) => {
            let ch = usize::try_from(*index).ok().and_then(|i| l.chars().nth(i));
            match ch {
                Some(ch) => Ok(Value::string(&ch.to_string())),
                None => Err(SimplexError::evaluation(format!(
                    "string index {index} out of range for length {}",
                    l.chars().count()
                ))),
            }
        }
        ("length", []) => Ok(Value::Int(l.chars().count() as i64)),
        _ => Err(internal_miss(&Type::string(), method)),
    }
}

fn vector_method(l: &VectorValue, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (method, args) {
        ("sub", [Value::Int(index)]) => usize::try_from(*index)
            .ok()
            .and_then(|i| l.values.get(i).cloned())
            .ok_or_else(|| {
                SimplexError::evaluation(format!(
                    "vector index {index} out of range for length {}",
                    l.values.len()
                ))
            }),
        ("plus", [Value::Vector(r)]) => {
            let r = r.borrow();
            let mut values = l.values.clone();
            values.extend(r.values.iter().cloned());
            // An empty left operand typed [Any] adopts the right element type.
            let elem = if l.elem.is_any() && !r.elem.is_any() {
                r.elem.clone()
            } else {
                l.elem.clone()
            };
            Ok(Value::vector_of(elem, values))
        }
        ("length", []) => Ok(Value::Int(l.values.len() as i64)),
        _ => Err(internal_miss(&Type::vector(l.elem.clone()), method)),
    }
}

fn point_method(l: simplex_geom::Vec3, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (method, args) {
        ("plus", [Value::Point(r)]) => Ok(Value::Point(l + *r)),
        ("minus", [Value::Point(r)]) => Ok(Value::Point(l - *r)),
        ("times", [r]) => {
            let factor = as_float(r).ok_or_else(|| internal_miss(&Type::point(), "times"))?;
            Ok(Value::Point(l * factor))
        }
        ("x", []) => Ok(Value::Float(l.x)),
        ("y", []) => Ok(Value::Float(l.y)),
        ("z", []) => Ok(Value::Float(l.z)),
        _ => Err(internal_miss(&Type::point(), method)),
    }
}

fn three_floats(args: &[Value]) -> Option<(f64, f64, f64)> {
    match args {
        [a, b, c] => Some((as_float(a)?, as_float(b)?, as_float(c)?)),
        _ => None,
    }
}

fn solid_method(l: &Rc<Solid>, method: &str, args: &[Value]) -> EvalResult<Value> {
    let solid = |s: Solid| Ok(Value::Solid(Rc::new(s)));
    match (method, args) {
        ("move", _) => {
            let (dx, dy, dz) = three_floats(args).ok_or_else(|| internal_miss(&Type::solid(), "move"))?;
            solid(l.translate(dx, dy, dz))
        }
        ("rotate", _) => {
            let (rx, ry, rz) = three_floats(args).ok_or_else(|| internal_miss(&Type::solid(), "rotate"))?;
            solid(l.rotate_deg(rx, ry, rz))
        }
        ("scale", _) => {
            let (sx, sy, sz) = three_floats(args).ok_or_else(|| internal_miss(&Type::solid(), "scale"))?;
            solid(l.scale(sx, sy, sz))
        }
        ("union", [Value::Solid(r)]) => solid(l.union(r)),
        ("intersect", [Value::Solid(r)]) => solid(l.intersect(r)),
        ("difference", [Value::Solid(r)]) => solid(l.difference(r)),
        ("bounds", []) => {
            let (min, max) = match l.bounds() {
                Some(bounds) => (bounds.min, bounds.max),
                None => (simplex_geom::Vec3::ZERO, simplex_geom::Vec3::ZERO),
            };
            Ok(Value::vector_of(
                Type::point(),
                vec![Value::Point(min), Value::Point(max)],
            ))
        }
        _ => Err(internal_miss(&Type::solid(), method)),
    }
}

fn polygon_method(l: &Rc<simplex_geom::Polygon2>, method: &str, args: &[Value]) -> EvalResult<Value> {
    match (method, args) {
        ("area", []) => Ok(Value::Float(l.area())),
        ("extrude", [height]) => {
            let height = as_float(height).ok_or_else(|| internal_miss(&Type::polygon(), "extrude"))?;
            if height <= 0.0 {
                return Err(SimplexError::evaluation("extrude height must be positive"));
            }
            Ok(Value::Solid(Rc::new(l.extrude(height))))
        }
        ("move", [dx, dy]) => {
            let (dx, dy) = (
                as_float(dx).ok_or_else(|| internal_miss(&Type::polygon(), "move"))?,
                as_float(dy).ok_or_else(|| internal_miss(&Type::polygon(), "move"))?,
            );
            Ok(Value::Polygon(Rc::new(l.translate(dx, dy))))
        }
        _ => Err(internal_miss(&Type::polygon(), method)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn int(v: i64) -> Value {
        Value::Int(v)
    }

    #[test]
    fn integer_arithmetic() {
        assert!(matches!(apply_builtin(&int(3), "plus", &[int(4)]), Ok(Value::Int(7))));
        assert!(matches!(apply_builtin(&int(3), "times", &[int(0)]), Ok(Value::Int(0))));
        assert!(matches!(apply_builtin(&int(2), "pow", &[int(10)]), Ok(Value::Int(1024))));
    }

    /// Mixed arithmetic dispatches on the left operand and promotes to Float.
    #[test]
    fn mixed_arithmetic_promotes() {
        let result = apply_builtin(&int(3), "plus", &[Value::Float(0.5)]).expect("promotes");
        assert!(matches!(result, Value::Float(v) if (v - 3.5).abs() < 1e-12));
    }

    #[test]
    fn division_by_zero_message() {
        let err = apply_builtin(&int(1), "div", &[int(0)]).expect_err("division by zero");
        assert_eq!(err.kind, ErrorKind::Evaluation);
        assert_eq!(err.message, "division by zero");
        let err = apply_builtin(&int(1), "mod", &[int(0)]).expect_err("mod by zero");
        assert_eq!(err.message, "division by zero");
    }

    #[test]
    fn integer_overflow_is_an_evaluation_error() {
        let err = apply_builtin(&int(i64::MAX), "plus", &[int(1)]).expect_err("overflow");
        assert_eq!(err.kind, ErrorKind::Evaluation);
    }

    /// `compare` returns a three-way integer.
    #[test]
    fn compare_is_three_way() {
        assert!(matches!(apply_builtin(&int(1), "compare", &[int(2)]), Ok(Value::Int(-1))));
        assert!(matches!(apply_builtin(&int(2), "compare", &[int(2)]), Ok(Value::Int(0))));
        assert!(matches!(apply_builtin(&int(3), "compare", &[int(2)]), Ok(Value::Int(1))));
    }

    #[test]
    fn nan_comparison_fails() {
        let err = apply_builtin(&Value::Float(f64::NAN), "compare", &[Value::Float(1.0)]).expect_err("NaN");
        assert_eq!(err.kind, ErrorKind::Evaluation);
    }

    #[test]
    fn string_operations() {
        let hello = Value::string("hello");
        assert!(matches!(
            apply_builtin(&hello, "plus", &[Value::string(" world")]),
            Ok(Value::Str(s)) if &*s == "hello world"
        ));
        assert!(matches!(apply_builtin(&hello, "length", &[]), Ok(Value::Int(5))));
        assert!(matches!(
            apply_builtin(&hello, "sub", &[int(1)]),
            Ok(Value::Str(s)) if &*s == "e"
        ));
        assert!(apply_builtin(&hello, "sub", &[int(99)]).is_err());
    }

    #[test]
    fn vector_concat_and_index() {
        let left = Value::vector_of(Type::int(), vec![int(1), int(2)]);
        let right = Value::vector_of(Type::int(), vec![int(3)]);
        let joined = apply_builtin(&left, "plus", &[right]).expect("concat");
        assert_eq!(joined.to_string(), "[1, 2, 3]");
        assert!(matches!(apply_builtin(&joined, "sub", &[int(2)]), Ok(Value::Int(3))));
        let err = apply_builtin(&joined, "sub", &[int(-1)]).expect_err("negative index");
        assert_eq!(err.kind, ErrorKind::Evaluation);
    }

    #[test]
    fn eq_distinguishes_numeric_types() {
        assert!(matches!(
            apply_builtin(&int(1), "eq", &[Value::Float(1.0)]),
            Ok(Value::Bool(false))
        ));
        assert!(matches!(apply_builtin(&int(1), "eq", &[int(1)]), Ok(Value::Bool(true))));
    }

    #[test]
    fn vector_eq_is_elementwise() {
        let a = Value::vector_of(Type::int(), vec![int(1), int(2)]);
        let b = Value::vector_of(Type::int(), vec![int(1), int(2)]);
        assert!(matches!(apply_builtin(&a, "eq", &[b]), Ok(Value::Bool(true))));
    }

    #[test]
    fn solid_move_shifts_bounds() {
        let cube = Value::Solid(Rc::new(simplex_geom::cuboid(1.0, 1.0, 1.0)));
        let moved = apply_builtin(&cube, "move", &[Value::Float(1.0), Value::Float(0.0), Value::Float(0.0)])
            .expect("moves");
        let bounds = apply_builtin(&moved, "bounds", &[]).expect("bounds");
        assert_eq!(bounds.to_string(), "[point(1.0, 0.0, 0.0), point(2.0, 1.0, 1.0)]");
    }

    #[test]
    fn point_accessors() {
        let p = Value::Point(simplex_geom::Vec3::new(1.0, 2.0, 3.0));
        assert!(matches!(apply_builtin(&p, "y", &[]), Ok(Value::Float(v)) if v == 2.0));
    }
}

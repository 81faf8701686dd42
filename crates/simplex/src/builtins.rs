//! Built-in functions preloaded into the root environment.
//!
//! Each variant is one function; strum's `Display` gives the surface name
//! and `EnumIter` lets the driver install the whole set by iteration.

use std::rc::Rc;

use simplex_geom::Vec3;
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    env::{EnvArena, EnvId},
    error::{EvalResult, SimplexError},
    types::Type,
    value::Value,
};

/// A built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Builtin {
    // geometry constructors
    Cuboid,
    Sphere,
    Cylinder,
    Point,
    Polygon,
    // math
    Sqrt,
    Sin,
    Cos,
    Tan,
    Atan2,
    Log,
    Exp,
    Abs,
    Floor,
    Ceil,
    Min,
    Max,
    Pi,
    // conversions
    ToFloat,
    ToInt,
    ToString,
}

impl Builtin {
    /// The function type this builtin exposes to the analyzer.
    #[must_use]
    pub fn function_type(self) -> Type {
        let float = Type::float;
        match self {
            Self::Cuboid => Type::function(vec![vec![float(), float(), float()]], Type::solid()),
            Self::Sphere => Type::function(vec![vec![float()]], Type::solid()),
            Self::Cylinder => Type::function(vec![vec![float(), float()]], Type::solid()),
            Self::Point => Type::function(vec![vec![float(), float(), float()]], Type::point()),
            Self::Polygon => Type::function(vec![vec![Type::vector(Type::point())]], Type::polygon()),
            Self::Sqrt | Self::Sin | Self::Cos | Self::Tan | Self::Log | Self::Exp | Self::Abs | Self::Floor | Self::Ceil => {
                Type::function(vec![vec![float()]], float())
            }
            Self::Atan2 | Self::Min | Self::Max => Type::function(vec![vec![float(), float()]], float()),
            Self::Pi => Type::function(vec![vec![]], float()),
            Self::ToFloat => Type::function(vec![vec![Type::int()]], float()),
            Self::ToInt => Type::function(vec![vec![float()]], Type::int()),
            Self::ToString => Type::function(vec![vec![Type::any()]], Type::string()),
        }
    }

    /// Installs every builtin into the root environment: declared type first,
    /// then the callable value, mirroring the two-pass install.
    pub fn install_all(envs: &mut EnvArena, root: EnvId) {
        for builtin in Self::iter() {
            let name = builtin.to_string();
            envs.declare_type(root, &name, builtin.function_type())
                .expect("builtin names are unique");
            envs.add_value(root, &name, Value::Builtin(builtin))
                .expect("builtin value matches its declared type");
        }
    }

    /// Applies the builtin to already-evaluated arguments.
    ///
    /// Arity and argument types were checked statically; the numeric helpers
    /// below re-check dynamically so a breach surfaces as `Evaluation`
    /// rather than a panic.
    pub fn call(self, args: &[Value]) -> EvalResult<Value> {
        match self {
            Self::Cuboid => {
                let (l, w, h) = (float_arg(self, args, 0)?, float_arg(self, args, 1)?, float_arg(self, args, 2)?);
                check_positive_dimension(self, &[l, w, h])?;
                Ok(Value::Solid(Rc::new(simplex_geom::cuboid(l, w, h))))
            }
            Self::Sphere => {
                let r = float_arg(self, args, 0)?;
                check_positive_dimension(self, &[r])?;
                Ok(Value::Solid(Rc::new(simplex_geom::sphere(r))))
            }
            Self::Cylinder => {
                let (r, h) = (float_arg(self, args, 0)?, float_arg(self, args, 1)?);
                check_positive_dimension(self, &[r, h])?;
                Ok(Value::Solid(Rc::new(simplex_geom::cylinder(r, h))))
            }
            Self::Point => Ok(Value::Point(Vec3::new(
                float_arg(self, args, 0)?,
                float_arg(self, args, 1)?,
                float_arg(self, args, 2)?,
            ))),
            Self::Polygon => {
                let points = points_arg(self, args, 0)?;
                let outline: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
                let polygon = simplex_geom::Polygon2::new(outline)
                    .ok_or_else(|| SimplexError::evaluation("polygon requires at least three vertices"))?;
                Ok(Value::Polygon(Rc::new(polygon)))
            }
            Self::Sqrt => {
                let v = float_arg(self, args, 0)?;
                if v < 0.0 {
                    return Err(SimplexError::evaluation("sqrt of a negative number"));
                }
                Ok(Value::Float(v.sqrt()))
            }
            Self::Sin => Ok(Value::Float(float_arg(self, args, 0)?.sin())),
            Self::Cos => Ok(Value::Float(float_arg(self, args, 0)?.cos())),
            Self::Tan => Ok(Value::Float(float_arg(self, args, 0)?.tan())),
            Self::Atan2 => Ok(Value::Float(float_arg(self, args, 0)?.atan2(float_arg(self, args, 1)?))),
            Self::Log => {
                let v = float_arg(self, args, 0)?;
                if v <= 0.0 {
                    return Err(SimplexError::evaluation("log of a non-positive number"));
                }
                Ok(Value::Float(v.ln()))
            }
            Self::Exp => Ok(Value::Float(float_arg(self, args, 0)?.exp())),
            Self::Abs => Ok(Value::Float(float_arg(self, args, 0)?.abs())),
            Self::Floor => Ok(Value::Float(float_arg(self, args, 0)?.floor())),
            Self::Ceil => Ok(Value::Float(float_arg(self, args, 0)?.ceil())),
            Self::Min => Ok(Value::Float(float_arg(self, args, 0)?.min(float_arg(self, args, 1)?))),
            Self::Max => Ok(Value::Float(float_arg(self, args, 0)?.max(float_arg(self, args, 1)?))),
            Self::Pi => Ok(Value::Float(std::f64::consts::PI)),
            Self::ToFloat => match args.first() {
                Some(Value::Int(v)) => Ok(Value::Float(*v as f64)),
                Some(Value::Float(v)) => Ok(Value::Float(*v)),
                _ => Err(bad_argument(self, "Int")),
            },
            Self::ToInt => {
                let v = float_arg(self, args, 0)?;
                if !v.is_finite() || v >= i64::MAX as f64 || v <= i64::MIN as f64 {
                    return Err(SimplexError::evaluation(format!(
                        "cannot convert {} to Int",
                        crate::value::float_repr(v)
                    )));
                }
                Ok(Value::Int(v.trunc() as i64))
            }
            Self::ToString => {
                let value = args
                    .first()
                    .ok_or_else(|| SimplexError::parameter_count(self, args.len()))?;
                Ok(Value::string(&value.to_string()))
            }
        }
    }
}

fn bad_argument(builtin: Builtin, expected: &str) -> SimplexError {
    SimplexError::evaluation(format!("`{builtin}` expects a {expected} argument"))
}

/// Extracts a float argument, promoting Int for robustness.
fn float_arg(builtin: Builtin, args: &[Value], index: usize) -> EvalResult<f64> {
    match args.get(index) {
        Some(Value::Float(v)) => Ok(*v),
        Some(Value::Int(v)) => Ok(*v as f64),
        Some(_) => Err(bad_argument(builtin, "Float")),
        None => Err(SimplexError::parameter_count(builtin, args.len())),
    }
}

fn points_arg(builtin: Builtin, args: &[Value], index: usize) -> EvalResult<Vec<Vec3>> {
    match args.get(index) {
        Some(Value::Vector(v)) => v
            .borrow()
            .values
            .iter()
            .map(|value| match value {
                Value::Point(p) => Ok(*p),
                _ => Err(bad_argument(builtin, "[Point]")),
            })
            .collect(),
        Some(_) => Err(bad_argument(builtin, "[Point]")),
        None => Err(SimplexError::parameter_count(builtin, args.len())),
    }
}

fn check_positive_dimension(builtin: Builtin, dims: &[f64]) -> EvalResult<()> {
    if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
        return Err(SimplexError::evaluation(format!(
            "`{builtin}` dimensions must be positive and finite"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_snake_case() {
        assert_eq!(Builtin::ToFloat.to_string(), "to_float");
        assert_eq!(Builtin::Cuboid.to_string(), "cuboid");
    }

    #[test]
    fn install_all_binds_every_builtin() {
        let mut envs = EnvArena::new();
        let root = envs.root();
        Builtin::install_all(&mut envs, root);
        for builtin in Builtin::iter() {
            assert!(envs.lookup_value(root, &builtin.to_string()).is_ok());
        }
    }

    #[test]
    fn cuboid_rejects_non_positive_dimensions() {
        let err = Builtin::Cuboid
            .call(&[Value::Float(1.0), Value::Float(0.0), Value::Float(1.0)])
            .expect_err("zero width");
        assert_eq!(err.kind, crate::error::ErrorKind::Evaluation);
    }

    #[test]
    fn to_int_truncates() {
        let v = Builtin::ToInt.call(&[Value::Float(3.9)]).expect("converts");
        assert!(matches!(v, Value::Int(3)));
    }

    #[test]
    fn to_string_uses_canonical_printer() {
        let v = Builtin::ToString.call(&[Value::Float(2.0)]).expect("prints");
        assert!(matches!(v, Value::Str(s) if &*s == "2.0"));
    }

    #[test]
    fn sqrt_of_negative_is_an_evaluation_error() {
        let err = Builtin::Sqrt.call(&[Value::Float(-1.0)]).expect_err("negative");
        assert_eq!(err.kind, crate::error::ErrorKind::Evaluation);
    }
}

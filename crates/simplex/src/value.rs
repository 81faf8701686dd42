//! Runtime values.
//!
//! `Value` is a flat sum type: small primitives are stored inline, while
//! aggregates (vectors, records, closures) and geometry handles are shared
//! behind `Rc`. Records and vectors carry interior mutability because field
//! updates mutate in place; evaluation is single-threaded so there are no
//! aliasing hazards.

use std::{cell::RefCell, fmt, rc::Rc};

use simplex_geom::{Polygon2, Solid, Vec3};

use crate::{
    ast::{Field, Param},
    builtins::Builtin,
    env::EnvId,
    types::Type,
};

/// Runtime descriptor for a user-declared data type.
///
/// Fields are stored in declaration order; records index into them by
/// position. Descriptors are registered once during static install and live
/// for the whole run.
#[derive(Debug)]
pub struct DataDescriptor {
    pub name: Rc<str>,
    pub fields: Vec<Field>,
}

impl DataDescriptor {
    /// Index of the named field, if any.
    #[must_use]
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == field)
    }

    /// The nominal type this descriptor defines.
    #[must_use]
    pub fn as_type(&self) -> Type {
        Type::Simple(Rc::clone(&self.name))
    }
}

/// A vector value: the element type plus the elements.
#[derive(Debug)]
pub struct VectorValue {
    pub elem: Type,
    pub values: Vec<Value>,
}

/// A data record: its descriptor plus one slot per field, in declaration
/// order. Records have reference identity; cloning the `Rc` aliases the
/// same record.
#[derive(Debug)]
pub struct RecordValue {
    pub descriptor: Rc<DataDescriptor>,
    pub fields: RefCell<Vec<Value>>,
}

/// The code a closure runs when called.
#[derive(Debug, Clone)]
pub enum ClosureBody {
    Function(Rc<crate::ast::FunctionDef>),
    Lambda(Rc<crate::ast::LambdaDef>),
}

/// A first-class callable capturing its defining environment.
#[derive(Debug)]
pub struct ClosureValue {
    /// Definition name, if any; lambdas are anonymous.
    pub name: Option<String>,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: ClosureBody,
    /// The environment the closure was created in. Captured environments are
    /// shared through the arena, never cloned.
    pub env: EnvId,
}

impl ClosureValue {
    #[must_use]
    pub fn function_type(&self) -> Type {
        Type::function(
            vec![self.params.iter().map(|p| p.declared.clone()).collect()],
            self.ret.clone(),
        )
    }
}

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Rc<str>),
    Vector(Rc<RefCell<VectorValue>>),
    Record(Rc<RecordValue>),
    Closure(Rc<ClosureValue>),
    /// A built-in function installed in the root environment.
    Builtin(Builtin),
    /// Opaque handle into the geometry kernel.
    Solid(Rc<Solid>),
    Polygon(Rc<Polygon2>),
    Point(Vec3),
}

impl Value {
    /// Builds a vector value from elements; the element type of an empty
    /// vector defaults to `Any`.
    #[must_use]
    pub fn vector_of(elem: Type, values: Vec<Self>) -> Self {
        Self::Vector(Rc::new(RefCell::new(VectorValue { elem, values })))
    }

    #[must_use]
    pub fn string(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    /// The runtime type of this value (the `typeOf` projection).
    #[must_use]
    pub fn value_type(&self) -> Type {
        match self {
            Self::Int(_) => Type::int(),
            Self::Float(_) => Type::float(),
            Self::Bool(_) => Type::boolean(),
            Self::Str(_) => Type::string(),
            Self::Vector(v) => Type::vector(v.borrow().elem.clone()),
            Self::Record(r) => r.descriptor.as_type(),
            Self::Closure(c) => c.function_type(),
            Self::Builtin(b) => b.function_type(),
            Self::Solid(_) => Type::solid(),
            Self::Polygon(_) => Type::polygon(),
            Self::Point(_) => Type::point(),
        }
    }

    /// Truthiness, defined per type: nonzero numbers, `true`, non-empty
    /// strings and vectors; records, callables, and geometry are always
    /// truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Bool(v) => *v,
            Self::Str(s) => !s.is_empty(),
            Self::Vector(v) => !v.borrow().values.is_empty(),
            Self::Record(_) | Self::Closure(_) | Self::Builtin(_) | Self::Solid(_) | Self::Polygon(_) | Self::Point(_) => {
                true
            }
        }
    }
}

/// Returns the canonical text of a float.
///
/// Uses ryu for the shortest decimal representation that round-trips, then
/// makes sure plain numbers keep a decimal point so `3.0` never prints as
/// an integer.
#[must_use]
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f.is_sign_negative() { "-inf" } else { "inf" }.to_owned();
    }
    let mut buffer = ryu::Buffer::new();
    let s = buffer.format(f);
    if s.contains('.') || s.contains('e') {
        s.to_owned()
    } else {
        format!("{s}.0")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{}", float_repr(*v)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Vector(v) => {
                write!(f, "[")?;
                for (i, value) in v.borrow().values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            Self::Record(r) => {
                write!(f, "{}(", r.descriptor.name)?;
                for (i, value) in r.fields.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Self::Closure(c) => match &c.name {
                Some(name) => write!(f, "<fun {name}>"),
                None => write!(f, "<lambda>"),
            },
            Self::Builtin(b) => write!(f, "<builtin {b}>"),
            Self::Solid(s) => write!(f, "<solid {} faces>", s.face_count()),
            Self::Polygon(p) => {
                write!(f, "polygon(")?;
                for (i, (x, y)) in p.vertices().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "({}, {})", float_repr(*x), float_repr(*y))?;
                }
                write!(f, ")")
            }
            Self::Point(p) => write!(
                f,
                "point({}, {}, {})",
                float_repr(p.x),
                float_repr(p.y),
                float_repr(p.z)
            ),
        }
    }
}

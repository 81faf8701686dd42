//! The static type representation and the matched-by relation.

use std::{fmt, rc::Rc};

/// Names of the built-in nominal types.
pub(crate) mod names {
    pub const INT: &str = "Int";
    pub const FLOAT: &str = "Float";
    pub const BOOLEAN: &str = "Boolean";
    pub const STRING: &str = "String";
    pub const ANY: &str = "Any";
    pub const SOLID: &str = "Solid";
    pub const POLYGON: &str = "Polygon";
    pub const POINT: &str = "Point";
}

/// A Simplex type.
///
/// `Simple` covers the primitives and user-defined data types; the other
/// variants are structural. Structural equality is derived; assignability is
/// [`Type::matched_by`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// A named nominal type.
    Simple(Rc<str>),
    /// A homogeneous ordered sequence.
    Vector(Box<Type>),
    /// A first-class callable. `arg_lists` enumerates the overloaded
    /// signatures (at least one); all share the return type.
    Function { arg_lists: Vec<Vec<Type>>, ret: Box<Type> },
    /// A callable attached to a target type.
    Method {
        target: Box<Type>,
        arg_lists: Vec<Vec<Type>>,
        ret: Box<Type>,
    },
}

impl Type {
    #[must_use]
    pub fn simple(name: &str) -> Self {
        Self::Simple(Rc::from(name))
    }

    #[must_use]
    pub fn vector(elem: Self) -> Self {
        Self::Vector(Box::new(elem))
    }

    #[must_use]
    pub fn function(arg_lists: Vec<Vec<Self>>, ret: Self) -> Self {
        Self::Function {
            arg_lists,
            ret: Box::new(ret),
        }
    }

    #[must_use]
    pub fn int() -> Self {
        Self::simple(names::INT)
    }

    #[must_use]
    pub fn float() -> Self {
        Self::simple(names::FLOAT)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::simple(names::BOOLEAN)
    }

    #[must_use]
    pub fn string() -> Self {
        Self::simple(names::STRING)
    }

    #[must_use]
    pub fn any() -> Self {
        Self::simple(names::ANY)
    }

    #[must_use]
    pub fn solid() -> Self {
        Self::simple(names::SOLID)
    }

    #[must_use]
    pub fn polygon() -> Self {
        Self::simple(names::POLYGON)
    }

    #[must_use]
    pub fn point() -> Self {
        Self::simple(names::POINT)
    }

    /// Whether this is the named simple type.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, Self::Simple(n) if &**n == name)
    }

    #[must_use]
    pub fn is_any(&self) -> bool {
        self.is_named(names::ANY)
    }

    /// The assignability relation: can a value of type `actual` be bound
    /// where `self` is declared?
    ///
    /// - identical nominal types match, and `Any` matches anything;
    /// - `[T]` matches `[U]` iff `T` matches `U`;
    /// - callables match iff the return types match and some pair of
    ///   argument lists matches pairwise (methods additionally require the
    ///   target types to match).
    #[must_use]
    pub fn matched_by(&self, actual: &Self) -> bool {
        match (self, actual) {
            (target, _) if target.is_any() => true,
            (Self::Simple(a), Self::Simple(b)) => a == b,
            (Self::Vector(t), Self::Vector(u)) => t.matched_by(u),
            (
                Self::Function { arg_lists: target_args, ret: target_ret },
                Self::Function { arg_lists: actual_args, ret: actual_ret },
            ) => target_ret.matched_by(actual_ret) && some_arg_list_matches(target_args, actual_args),
            (
                Self::Method {
                    target: target_self,
                    arg_lists: target_args,
                    ret: target_ret,
                },
                Self::Method {
                    target: actual_self,
                    arg_lists: actual_args,
                    ret: actual_ret,
                },
            ) => {
                target_self.matched_by(actual_self)
                    && target_ret.matched_by(actual_ret)
                    && some_arg_list_matches(target_args, actual_args)
            }
            _ => false,
        }
    }

    /// Structural equality. A named alias for the derived `==`, matching the
    /// type-descriptor surface.
    #[must_use]
    pub fn equals_structurally(&self, other: &Self) -> bool {
        self == other
    }
}

fn some_arg_list_matches(target: &[Vec<Type>], actual: &[Vec<Type>]) -> bool {
    target.iter().any(|t| {
        actual
            .iter()
            .any(|a| t.len() == a.len() && t.iter().zip(a).all(|(tt, at)| tt.matched_by(at)))
    })
}

fn write_arg_list(f: &mut fmt::Formatter<'_>, args: &[Type]) -> fmt::Result {
    write!(f, "(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{arg}")?;
    }
    write!(f, ")")
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(name) => write!(f, "{name}"),
            Self::Vector(elem) => write!(f, "[{elem}]"),
            Self::Function { arg_lists, ret } => {
                for (i, args) in arg_lists.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write_arg_list(f, args)?;
                }
                write!(f, " -> {ret}")
            }
            Self::Method { target, arg_lists, ret } => {
                write!(f, "{target}.")?;
                for (i, args) in arg_lists.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write_arg_list(f, args)?;
                }
                write!(f, " -> {ret}")
            }
        }
    }
}

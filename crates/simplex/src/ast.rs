//! The abstract syntax tree.
//!
//! Immutable after parsing. Every expression node is paired with its source
//! position via [`ExprLoc`]; interior nodes are boxed to keep `Expr` small.
//! Definition bodies that closures need to outlive the tree walk (functions,
//! lambdas, methods) are reference-counted so closure values can share them.

use std::rc::Rc;

use crate::{location::CodeRange, types::Type};

/// An expression paired with its source position.
#[derive(Debug, Clone)]
pub struct ExprLoc {
    pub expr: Expr,
    pub position: CodeRange,
}

impl ExprLoc {
    #[must_use]
    pub fn new(expr: Expr, position: CodeRange) -> Self {
        Self { expr, position }
    }
}

/// Binary operators. Each lowers to a method on the left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Subscript, `target[index]`.
    Index,
}

impl BinaryOp {
    /// The operation-table method this operator dispatches to.
    #[must_use]
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Add => "plus",
            Self::Sub => "minus",
            Self::Mul => "times",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Pow => "pow",
            Self::Eq | Self::Ne => "eq",
            Self::Lt | Self::Le | Self::Gt | Self::Ge => "compare",
            Self::Index => "sub",
        }
    }

    /// Surface spelling, for error messages.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "^",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Index => "[]",
        }
    }
}

/// Unary operators, lowered to `neg` and `not`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    #[must_use]
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Neg => "neg",
            Self::Not => "not",
        }
    }
}

/// Short-circuiting logical operators. Not method-dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// One `if`/`elif` arm of a conditional.
#[derive(Debug, Clone)]
pub struct CondClause {
    pub guard: ExprLoc,
    pub value: ExprLoc,
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StrLit(Rc<str>),
    /// A variable reference.
    Name(String),
    /// `name := value`; updates an existing binding, yields the value.
    Assign { name: String, value: Box<ExprLoc> },
    /// `{ e1; e2; ... }`; evaluated in a fresh child scope.
    Block(Vec<ExprLoc>),
    /// `let name(: T)? = init`; binds in the current scope, yields the value.
    Let {
        name: String,
        declared: Option<Type>,
        init: Box<ExprLoc>,
    },
    /// Ordered guarded clauses with a mandatory else.
    Cond {
        clauses: Vec<CondClause>,
        otherwise: Box<ExprLoc>,
    },
    While { cond: Box<ExprLoc>, body: Box<ExprLoc> },
    /// `for var in collection { body }` over a vector.
    For {
        var: String,
        collection: Box<ExprLoc>,
        body: Box<ExprLoc>,
    },
    /// `[e1, e2, ...]`.
    VectorLit(Vec<ExprLoc>),
    /// A call to a first-class callable.
    Call { callee: Box<ExprLoc>, args: Vec<ExprLoc> },
    /// A data-record constructor call, resolved from `Call` once the model's
    /// data definitions are known.
    MakeData { type_name: String, args: Vec<ExprLoc> },
    /// `target.field`.
    FieldRef { target: Box<ExprLoc>, field: String },
    /// `target.field := value`; mutates the record, yields the record.
    FieldUpdate {
        target: Box<ExprLoc>,
        field: String,
        value: Box<ExprLoc>,
    },
    Unary { op: UnaryOp, operand: Box<ExprLoc> },
    Binary {
        op: BinaryOp,
        left: Box<ExprLoc>,
        right: Box<ExprLoc>,
    },
    Logical {
        op: LogicalOp,
        left: Box<ExprLoc>,
        right: Box<ExprLoc>,
    },
    /// `target->method(args)`.
    MethodCall {
        target: Box<ExprLoc>,
        method: String,
        args: Vec<ExprLoc>,
    },
    Lambda(Rc<LambdaDef>),
}

/// A declared parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub declared: Type,
}

/// A named function definition.
///
/// `locals` holds nested function definitions, installed with the same
/// two-pass scheme as top-level definitions so they can be mutually
/// recursive.
#[derive(Debug)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub locals: Vec<Definition>,
    pub body: Vec<ExprLoc>,
    pub position: CodeRange,
}

impl FunctionDef {
    /// The function type this definition declares.
    #[must_use]
    pub fn function_type(&self) -> Type {
        Type::function(
            vec![self.params.iter().map(|p| p.declared.clone()).collect()],
            self.ret.clone(),
        )
    }
}

/// An anonymous function expression. The return type is inferred from the
/// body when not annotated.
#[derive(Debug)]
pub struct LambdaDef {
    pub params: Vec<Param>,
    pub ret: Option<Type>,
    pub body: Vec<ExprLoc>,
    pub position: CodeRange,
}

/// A method definition attached to an explicit target type.
#[derive(Debug)]
pub struct MethodDef {
    pub target: Type,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Type,
    pub body: Vec<ExprLoc>,
    pub position: CodeRange,
}

/// One field of a data definition.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub declared: Type,
}

/// A user-declared record type.
#[derive(Debug)]
pub struct DataDef {
    pub name: String,
    pub fields: Vec<Field>,
    pub position: CodeRange,
}

/// A top-level variable definition.
#[derive(Debug)]
pub struct VariableDef {
    pub name: String,
    pub declared: Option<Type>,
    pub init: ExprLoc,
    pub position: CodeRange,
}

/// A top-level (or, for functions, nested) definition.
#[derive(Debug, Clone)]
pub enum Definition {
    Variable(Rc<VariableDef>),
    Function(Rc<FunctionDef>),
    Method(Rc<MethodDef>),
    Data(Rc<DataDef>),
}

impl Definition {
    /// The defined name; for methods, the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Variable(def) => &def.name,
            Self::Function(def) => &def.name,
            Self::Method(def) => &def.name,
            Self::Data(def) => &def.name,
        }
    }

    #[must_use]
    pub fn position(&self) -> CodeRange {
        match self {
            Self::Variable(def) => def.position,
            Self::Function(def) => def.position,
            Self::Method(def) => def.position,
            Self::Data(def) => def.position,
        }
    }
}

/// A named artifact: a block of expressions whose results form the output.
#[derive(Debug)]
pub struct Product {
    pub name: String,
    pub body: Vec<ExprLoc>,
    pub position: CodeRange,
}

/// A whole parsed source file: definitions plus products.
#[derive(Debug)]
pub struct Model {
    pub definitions: Vec<Definition>,
    pub products: Vec<Product>,
}

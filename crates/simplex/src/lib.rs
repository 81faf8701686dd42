//! Simplex: a small language for programmatically describing 3D solid
//! models.
//!
//! A program declares data types, functions, methods, and variables, then
//! emits named *products* whose bodies evaluate to geometry or textual
//! values. The interpreter type-checks the whole program before execution,
//! evaluates each product in a lexical environment, and writes one artifact
//! per result kind.
//!
//! # Example
//! ```
//! use simplex::{CollectWriter, Runner};
//!
//! let source = r#"product "box" { cuboid(1.0, 2.0, 3.0)->move(1.0, 0.0, 0.0) }"#;
//! let mut program = Runner::parse(source, "box.sx").unwrap().analyze().unwrap();
//! let mut writer = CollectWriter::new();
//! let report = program.execute(None, "out", &mut writer);
//! assert!(report.success());
//! assert!(writer.files().contains_key("out-box.stl"));
//! ```

mod analyze;
mod artifact;
mod ast;
mod builtins;
mod driver;
mod env;
mod error;
mod eval;
mod lex;
mod location;
mod ops;
mod parse;
mod registry;
mod types;
mod value;

pub use crate::{
    artifact::{ArtifactWriter, CollectWriter, DiscardWriter, FsWriter},
    ast::{Definition, Expr, ExprLoc, Model, Product},
    builtins::Builtin,
    driver::{ExecutionReport, ProductOutcome, Program, Runner},
    env::{EnvArena, EnvId},
    error::{AnalyzeResult, ErrorKind, EvalResult, SimplexError},
    location::CodeRange,
    registry::TypeRegistry,
    types::Type,
    value::{float_repr, DataDescriptor, Value},
};

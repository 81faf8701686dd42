use std::fmt::{self, Display};

use strum::{Display as StrumDisplay, IntoStaticStr};

use crate::location::CodeRange;

/// Result type alias for static analysis.
pub type AnalyzeResult<T> = Result<T, SimplexError>;
/// Result type alias for evaluation.
pub type EvalResult<T> = Result<T, SimplexError>;

/// Classification of every error the interpreter can raise.
///
/// Uses strum derives so the kind prints exactly as its variant name in both
/// human-readable and JSON diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay, IntoStaticStr, serde::Serialize)]
pub enum ErrorKind {
    /// Syntax violation while lexing or parsing.
    Parser,
    /// A name or field is absent from the current scope.
    Undefined,
    /// A name is declared twice in one scope.
    Redefined,
    /// An expected type is not matched by the actual type.
    TypeMismatch,
    /// No callable signature has the actual arity.
    ParameterCount,
    /// An operator has no corresponding method on the target type.
    UnsupportedOperation,
    /// Any other static violation.
    Analysis,
    /// A dynamic violation, e.g. division by zero.
    Evaluation,
    /// Invariant breach inside the interpreter. Should never escape.
    Internal,
}

/// An error with its kind tag and, once known, a source location.
///
/// Locations attach innermost-first: [`SimplexError::at`] only sets the
/// location if none is present, so an error raised deep inside an expression
/// keeps its most precise position as it unwinds.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SimplexError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<CodeRange>,
}

impl SimplexError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Attaches a location unless one was already set deeper in the tree.
    #[must_use]
    pub fn at(mut self, location: CodeRange) -> Self {
        if self.location.is_none() {
            self.location = Some(location);
        }
        self
    }

    pub fn parser(message: impl Into<String>, location: CodeRange) -> Self {
        Self::new(ErrorKind::Parser, message).at(location)
    }

    pub fn undefined_name(name: &str) -> Self {
        Self::new(ErrorKind::Undefined, format!("name `{name}` is not declared in this scope"))
    }

    pub fn undefined_field(type_name: impl Display, field: &str) -> Self {
        Self::new(
            ErrorKind::Undefined,
            format!("type `{type_name}` has no field `{field}`"),
        )
    }

    pub fn undefined_method(target: impl Display, method: &str) -> Self {
        Self::new(
            ErrorKind::Undefined,
            format!("type `{target}` does not define method `{method}`"),
        )
    }

    pub fn redefined(name: &str) -> Self {
        Self::new(ErrorKind::Redefined, format!("name `{name}` is already declared in this scope"))
    }

    pub fn type_mismatch(expected: impl Display, actual: impl Display) -> Self {
        Self::new(
            ErrorKind::TypeMismatch,
            format!("expected `{expected}`, found `{actual}`"),
        )
    }

    pub fn parameter_count(callee: impl Display, actual: usize) -> Self {
        Self::new(
            ErrorKind::ParameterCount,
            format!("no signature of `{callee}` takes {actual} argument(s)"),
        )
    }

    pub fn unsupported_operation(target: impl Display, method: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedOperation,
            format!("type `{target}` does not support `{method}`"),
        )
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Analysis, message)
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Evaluation, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Display for SimplexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{} error at {location}: {}", self.kind, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for SimplexError {}

#[cfg(test)]
mod tests {
    use super::*;

    /// The innermost location wins; later `at` calls are no-ops.
    #[test]
    fn at_does_not_overwrite() {
        let inner = CodeRange::new(3, 7);
        let outer = CodeRange::new(1, 1);
        let err = SimplexError::evaluation("division by zero").at(inner).at(outer);
        assert_eq!(err.location, Some(inner));
    }

    #[test]
    fn display_includes_kind_and_location() {
        let err = SimplexError::undefined_name("x").at(CodeRange::new(2, 5));
        assert_eq!(err.to_string(), "Undefined error at 2:5: name `x` is not declared in this scope");
    }

    #[test]
    fn display_without_location() {
        let err = SimplexError::analysis("mixed element types");
        assert_eq!(err.to_string(), "Analysis error: mixed element types");
    }
}

//! Runtime error types and factory constructors.
//!
//! Errors of kinds (a)-(d) in the taxonomy — allocation, type, arithmetic,
//! control-flow misuse — are fatal to the Job that raised them: the
//! scheduler tears the Job down and fires its completion callback with no
//! result. Recoverable conditions (resource conflicts, unknown mailbox
//! names) never travel through this type; they surface as script-visible
//! `false`/`nil` values.
//!
//! Factory functions (`division_by_zero()`, `operation_not_supported(..)`)
//! are the public construction API; they populate both `kind` and
//! `message`.

use std::fmt;

use reed_ir::Span;

/// Result of evaluating one step or one operation.
pub type EvalResult<T = crate::Value> = Result<T, RuntimeError>;

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    // Arithmetic
    DivisionByZero,
    ModuloByZero,
    NegativeShift,

    // Type / operator
    OperationNotSupported {
        type_name: &'static str,
        op: String,
    },
    NotCallable {
        type_name: &'static str,
    },
    FrozenValue,

    // Calls
    WrongArgCount {
        name: String,
        expected: usize,
        got: usize,
    },

    // Names
    UndefinedSet {
        name: String,
    },
    UndefinedLabel {
        name: String,
    },

    // Control-flow misuse
    BreakOutsideLoop,
    ContinueOutsideLoop,

    // Assignment
    InvalidAssignTarget,

    // Anything else (native-function internals)
    Custom(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::DivisionByZero => write!(f, "division by zero"),
            ErrorKind::ModuloByZero => write!(f, "modulo by zero"),
            ErrorKind::NegativeShift => write!(f, "shift by a negative amount"),
            ErrorKind::OperationNotSupported { type_name, op } => {
                write!(f, "operation '{op}' not supported for type '{type_name}'")
            }
            ErrorKind::NotCallable { type_name } => {
                write!(f, "value of type '{type_name}' is not callable")
            }
            ErrorKind::FrozenValue => write!(f, "cannot modify a frozen value"),
            ErrorKind::WrongArgCount {
                name,
                expected,
                got,
            } => {
                write!(f, "function '{name}' expects {expected} argument(s), got {got}")
            }
            ErrorKind::UndefinedSet { name } => write!(f, "undefined set '{name}'"),
            ErrorKind::UndefinedLabel { name } => write!(f, "undefined label '{name}'"),
            ErrorKind::BreakOutsideLoop => write!(f, "'break' outside of a loop"),
            ErrorKind::ContinueOutsideLoop => write!(f, "'continue' outside of a loop"),
            ErrorKind::InvalidAssignTarget => write!(f, "invalid assignment target"),
            ErrorKind::Custom(msg) => f.write_str(msg),
        }
    }
}

/// A fatal runtime error.
///
/// Carries the span of the frame that was executing when the error was
/// raised, so reports can name the source location.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Option<Span>,
    /// Source name of the module that was executing, for reports.
    pub source: Option<String>,
}

impl RuntimeError {
    /// Create an error from its kind; the message is derived.
    pub fn new(kind: ErrorKind) -> Self {
        let message = kind.to_string();
        RuntimeError {
            kind,
            message,
            span: None,
            source: None,
        }
    }

    /// Attach a source span if none is present yet.
    ///
    /// The innermost frame wins: once a span is set, enclosing frames do
    /// not overwrite it.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() && !span.is_empty() {
            self.span = Some(span);
        }
        self
    }

    /// Attach the module's source name if none is present yet.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        if self.source.is_none() {
            self.source = Some(source.into());
        }
        self
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.source, self.span) {
            (Some(source), Some(span)) => {
                write!(f, "{} (at {source}:{span:?})", self.message)
            }
            (Some(source), None) => write!(f, "{} (in {source})", self.message),
            (None, Some(span)) => write!(f, "{} (at {span:?})", self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

// Factory constructors

pub fn division_by_zero() -> RuntimeError {
    RuntimeError::new(ErrorKind::DivisionByZero)
}

pub fn modulo_by_zero() -> RuntimeError {
    RuntimeError::new(ErrorKind::ModuloByZero)
}

pub fn negative_shift() -> RuntimeError {
    RuntimeError::new(ErrorKind::NegativeShift)
}

pub fn operation_not_supported(type_name: &'static str, op: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::OperationNotSupported {
        type_name,
        op: op.into(),
    })
}

pub fn not_callable(type_name: &'static str) -> RuntimeError {
    RuntimeError::new(ErrorKind::NotCallable { type_name })
}

pub fn frozen_value() -> RuntimeError {
    RuntimeError::new(ErrorKind::FrozenValue)
}

pub fn wrong_arg_count(name: impl Into<String>, expected: usize, got: usize) -> RuntimeError {
    RuntimeError::new(ErrorKind::WrongArgCount {
        name: name.into(),
        expected,
        got,
    })
}

pub fn undefined_set(name: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::UndefinedSet { name: name.into() })
}

pub fn undefined_label(name: impl Into<String>) -> RuntimeError {
    RuntimeError::new(ErrorKind::UndefinedLabel { name: name.into() })
}

pub fn break_outside_loop() -> RuntimeError {
    RuntimeError::new(ErrorKind::BreakOutsideLoop)
}

pub fn continue_outside_loop() -> RuntimeError {
    RuntimeError::new(ErrorKind::ContinueOutsideLoop)
}

pub fn invalid_assign_target() -> RuntimeError {
    RuntimeError::new(ErrorKind::InvalidAssignTarget)
}

pub fn custom(message: impl Into<String>) -> RuntimeError {
    let message = message.into();
    RuntimeError {
        kind: ErrorKind::Custom(message.clone()),
        message,
        span: None,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_messages() {
        assert_eq!(division_by_zero().message, "division by zero");
        assert_eq!(
            operation_not_supported("nil", "<<").message,
            "operation '<<' not supported for type 'nil'"
        );
        assert_eq!(
            wrong_arg_count("f", 2, 3).message,
            "function 'f' expects 2 argument(s), got 3"
        );
    }

    #[test]
    fn test_innermost_span_wins() {
        let err = division_by_zero()
            .with_span(Span::new(5, 8))
            .with_span(Span::new(0, 20));
        assert_eq!(err.span, Some(Span::new(5, 8)));
    }

    #[test]
    fn test_dummy_span_not_attached() {
        let err = division_by_zero().with_span(Span::DUMMY);
        assert_eq!(err.span, None);
    }

    #[test]
    fn test_report_names_source_and_span() {
        let err = division_by_zero()
            .with_span(Span::new(5, 8))
            .with_source("boot.rd");
        assert_eq!(err.to_string(), "division by zero (at boot.rd:5..8)");
        // First attribution wins, like spans.
        let err = err.with_source("other.rd");
        assert_eq!(err.source.as_deref(), Some("boot.rd"));
    }
}

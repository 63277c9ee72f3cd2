//! Error types and handling for the calc-rs crate.
//!
//! This module defines the error types used throughout the crate for formula
//! parsing, registration, and evaluation. Every public operation surfaces its
//! failure through [`CalcError`]; nothing is retried internally.

use core::fmt;

/// Result type used throughout the crate.
///
/// This is a convenience type alias that uses the `CalcError` type for the
/// error variant.
pub type Result<T> = core::result::Result<T, CalcError>;

/// Error type for formula parsing and evaluation.
///
/// This enum represents all possible errors that can occur while lexing,
/// building, registering, configuring, or evaluating formulas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    /// The formula text was empty or contained only whitespace.
    EmptyFormula,

    /// An argument to a public operation was unusable, such as a positional
    /// argument list whose length does not match the declared parameters of
    /// a bound formula.
    InvalidArgument(String),

    /// Error during lexical or structural analysis of a formula.
    ///
    /// This covers unrecognized characters, malformed numbers, mismatched
    /// brackets, trailing operators, unknown functions, and function calls
    /// with the wrong number of arguments. The position is the 0-based
    /// character index into the formula text where the problem was detected.
    Parse {
        /// Detailed error message, including the offending lexeme.
        message: String,
        /// 0-based character index into the source formula.
        position: usize,
    },

    /// Attempt to overwrite a registry entry that is not overwritable.
    ///
    /// Default library functions and constants are registered as
    /// non-overwritable; registering a function or constant under one of
    /// their names fails with this error.
    Registration {
        /// Name of the entry that could not be replaced.
        name: String,
    },

    /// A caller-supplied variable collides with a registered name.
    ///
    /// Variables may not shadow a non-overwritable constant or any
    /// registered function. Rename the variable or the registered entry.
    VariableName {
        /// The colliding variable name (lowercase).
        name: String,
    },

    /// A variable referenced by the formula was not bound at evaluation time.
    ///
    /// To resolve this error, add the variable to the environment passed to
    /// the evaluation call.
    UnboundVariable {
        /// The missing variable name (lowercase).
        name: String,
    },

    /// Invalid engine configuration, such as an unknown execution mode or a
    /// malformed culture.
    Config {
        /// Description of the rejected configuration value.
        message: String,
    },
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::EmptyFormula => write!(f, "formula text is empty"),
            CalcError::InvalidArgument(message) => write!(f, "invalid argument: {}", message),
            CalcError::Parse { message, position } => {
                write!(f, "parse error at position {}: {}", position, message)
            }
            CalcError::Registration { name } => {
                write!(f, "the name '{}' is not overwritable", name)
            }
            CalcError::VariableName { name } => {
                write!(
                    f,
                    "the variable '{}' collides with a registered function or constant",
                    name
                )
            }
            CalcError::UnboundVariable { name } => {
                write!(f, "variable '{}' is not defined", name)
            }
            CalcError::Config { message } => write!(f, "configuration error: {}", message),
        }
    }
}

impl std::error::Error for CalcError {}

impl CalcError {
    /// Builds a parse error from a position and a message.
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        CalcError::Parse {
            message: message.into(),
            position,
        }
    }
}

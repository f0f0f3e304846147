use thiserror::Error;

/// A fatal evaluation fault.
///
/// Recoverable conditions (a missing overload, incomparable constants,
/// division by zero) are reported on the diagnostic stream and the offending
/// stack is skipped; they never surface here. Everything that does surface
/// here terminates the query.
#[derive(Debug, Error)]
pub enum EvalError {
    /// A name used in the query resolves neither to a variable in scope nor
    /// to a vocabulary word.
    #[error("Unknown identifier `{0}'.")]
    UnknownIdentifier(String),

    /// A frame slot was bound twice.
    #[error("attempt to rebind a bound variable")]
    Rebind,

    /// A frame slot was read before it was bound.
    #[error("attempt to read an unbound variable")]
    UnboundRead,

    /// A predicate under an assertion could not produce a verdict, typically
    /// because its operands had unexpected types.
    #[error("predicate `{0}' failed to produce a verdict")]
    PredicateFailure(String),

    /// A failure raised by a value provider, such as the DWARF reader.
    #[error("{0}")]
    Runtime(String),
}

impl EvalError {
    /// Wraps an arbitrary error from a value provider.
    pub fn runtime<E: std::fmt::Display>(err: E) -> Self {
        EvalError::Runtime(err.to_string())
    }
}

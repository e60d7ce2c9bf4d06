//! Error types for memocache

use thiserror::Error;

/// Result type alias for memocache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while turning a call into a cache key
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Arguments do not fit the declared parameters
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// A bound argument cannot take part in a cache key
    #[error("{function}() argument '{param}' is unhashable: {type_name}")]
    UnhashableArgument {
        /// Function being called
        function: String,
        /// Parameter the value was bound to
        param: String,
        /// Type of the offending value
        type_name: &'static str,
    },

    /// Parameter list rejected at construction
    #[error("invalid signature for {function}(): {reason}")]
    InvalidSignature {
        /// Function being declared
        function: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Argument binding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// More positional arguments than parameters
    #[error("{function}() takes {max} positional arguments but {given} were given")]
    TooManyPositional {
        /// Function being called
        function: String,
        /// Number of declared parameters
        max: usize,
        /// Number of positional arguments supplied
        given: usize,
    },

    /// Keyword names no declared parameter
    #[error("{function}() got an unexpected keyword argument '{name}'")]
    UnexpectedKeyword {
        /// Function being called
        function: String,
        /// The unknown keyword
        name: String,
    },

    /// Same parameter supplied twice
    #[error("{function}() got multiple values for argument '{name}'")]
    MultipleValues {
        /// Function being called
        function: String,
        /// Parameter filled twice
        name: String,
    },

    /// Required parameters left unfilled
    #[error("{function}() missing required arguments: {}", .names.join(", "))]
    MissingArguments {
        /// Function being called
        function: String,
        /// Unfilled parameters, in declaration order
        names: Vec<String>,
    },
}

/// Failure of a memoized call: either the key could not be derived, or
/// the wrapped computation itself failed
#[derive(Debug, Error)]
pub enum CallError<E> {
    /// Binding or hashing the arguments failed
    #[error(transparent)]
    Key(#[from] Error),

    /// The computation's own error, untouched
    #[error(transparent)]
    Computation(E),
}

impl<E> CallError<E> {
    /// The computation's error, if that is what failed
    pub fn into_computation(self) -> Option<E> {
        match self {
            CallError::Computation(e) => Some(e),
            CallError::Key(_) => None,
        }
    }
}

//! Error types for reflection and invocation

use std::sync::Arc;

/// Result type for reflection operations
pub type ReflectResult<T> = Result<T, ReflectError>;

/// Error payload raised by an invoked callable.
pub type InvocationError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Reflection and invocation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflectError {
    /// Stored type is not the requested one and no converter path exists
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// No converter chain connects the two types
    #[error("No conversion from {from} to {to}")]
    ConversionUnavailable {
        /// Source type name
        from: String,
        /// Target type name
        to: String,
    },

    /// A converter exists but rejected the concrete value
    #[error("Conversion from {from} to {to} failed for this value")]
    ConversionFailed {
        /// Source type name
        from: String,
        /// Target type name
        to: String,
    },

    /// Wrong number of arguments for a callback
    #[error("Arity mismatch: expected {expected} arguments, got {got}")]
    ArityMismatch {
        /// Number of arguments the callback accepts
        expected: usize,
        /// Number of arguments supplied
        got: usize,
    },

    /// A positional argument could not be converted to the parameter type
    #[error("Argument {index} cannot be converted from {got} to {expected}")]
    ArgumentConversion {
        /// Zero-based argument position
        index: usize,
        /// Parameter type name
        expected: String,
        /// Supplied type name
        got: String,
    },

    /// The underlying callable failed
    #[error("Invocation failed: {0}")]
    InvocationFailure(InvocationError),

    /// Invoking an empty callback
    #[error("Callback is not invocable")]
    InvalidCallback,

    /// The receiver of a slot callback is gone
    #[error("Slot '{0}' is no longer available")]
    SlotUnavailable(String),

    /// Name lookup miss, for name-based conveniences that return a `Result`
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// What was looked up ("method", "field", "type", ...)
        kind: &'static str,
        /// The name that missed
        name: String,
    },

    /// Field access not permitted (read-only or described-only field)
    #[error("Field '{0}' does not permit this access")]
    AccessDenied(String),

    /// A future was settled twice
    #[error("Future is already settled")]
    AlreadySettled,

    /// Two members of one category share a name in a single meta object
    #[error("Duplicate {kind} '{name}' in {class}")]
    DuplicateMember {
        /// Member category
        kind: &'static str,
        /// Member name
        name: String,
        /// Declaring class name
        class: String,
    },

    /// Two meta objects registered under the same class name
    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    /// A declared base type is not registered
    #[error("Type '{class}' declares unknown base '{base}'")]
    UnknownBase {
        /// Declaring class name
        class: String,
        /// Missing base name
        base: String,
    },

    /// The process-wide registry was installed before
    #[error("Global meta registry is already installed")]
    AlreadyInstalled,

    /// Callback cannot be made variadic
    #[error("Variadic callbacks need a trailing ValueList parameter")]
    InvalidVariadic,
}

impl ReflectError {
    /// Wrap an error raised by an invoked callable.
    pub fn invocation<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ReflectError::InvocationFailure(Arc::new(error))
    }

    /// Access the original error of an `InvocationFailure`, if it has type `E`.
    pub fn invocation_payload<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            ReflectError::InvocationFailure(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn test_invocation_payload_roundtrip() {
        let err = ReflectError::invocation(DiskError);
        assert!(err.invocation_payload::<DiskError>().is_some());
        assert!(err.invocation_payload::<std::fmt::Error>().is_none());
        assert_eq!(err.to_string(), "Invocation failed: disk on fire");
    }

    #[test]
    fn test_payload_only_on_invocation_failure() {
        let err = ReflectError::AlreadySettled;
        assert!(err.invocation_payload::<DiskError>().is_none());
    }
}

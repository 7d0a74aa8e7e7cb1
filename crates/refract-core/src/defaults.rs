//! Default constants for the reflection core.

/// Maximum number of intermediate types a converter chain may pass through.
///
/// Resolution tries identity, then a direct converter, then chains through
/// at most this many intermediate types.
pub const MAX_CONVERSION_INTERMEDIATES: usize = 1;

/// Highest parameter count supported by the typed callback constructors.
pub const MAX_TYPED_ARITY: usize = 8;

/// Whether a registry build fails on bases that are not registered.
pub const DEFAULT_STRICT_BASES: bool = false;

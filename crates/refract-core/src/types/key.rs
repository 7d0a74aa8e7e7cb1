//! Runtime type identity

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Runtime identity of a concrete Rust type.
///
/// Equality and hashing use the `TypeId` only; the name is carried along
/// for diagnostics and for signatures exposed through meta objects.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Identity of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Underlying `TypeId`
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified Rust type name
    pub fn full_name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths stripped, e.g. `Vec<Value>`
    pub fn name(&self) -> String {
        short_type_name(self.name)
    }

    /// Check whether this is the identity of `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name())
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Strip module paths from a `std::any::type_name` string.
///
/// `alloc::vec::Vec<refract_core::value::Value>` becomes `Vec<Value>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    // Start of the path segment currently being written
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                out.truncate(segment_start);
            }
            c if c.is_alphanumeric() || c == '_' => out.push(c),
            c => {
                out.push(c);
                segment_start = out.len();
            }
        }
    }

    out
}

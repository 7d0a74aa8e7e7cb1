//! Meta registry: reflected descriptions of types
//!
//! A [`MetaObject`] lists a type's methods, fields, enumerations and
//! annotations, plus the names of its base types. A [`MetaRegistry`] owns
//! all meta objects of a program, resolves base names into links and
//! answers inheritance-aware and annotation queries. A [`Serializer`]
//! moves instances to and from string-keyed value maps through their
//! fields.
//!
//! # Example
//!
//! ```ignore
//! let point = MetaObject::builder("Point")
//!     .with_type::<Point>()
//!     .method(MetaMethod::constructor("new", |x: f64, y: f64| Point { x, y }))
//!     .method(MetaMethod::instance("length", |p: &mut Point| p.length()))
//!     .finish()?;
//!
//! let mut builder = MetaRegistry::builder();
//! builder.register(point)?;
//! let registry = builder.build()?;
//! ```

mod global;
mod member;
mod object;
mod registry;
mod serializer;

pub use global::{global, init_global, install_global, try_global};
pub use member::{
    Annotated, FieldAccess, MetaAnnotation, MetaEnum, MetaField, MetaMethod, MethodKind,
};
pub use object::{MetaObject, MetaObjectBuilder};
pub use registry::{MetaIndex, MetaRegistry, MetaRegistryBuilder, RegistryConfig};
pub use serializer::{InstanceCreator, RecursionDepth, Serializer, ValueConverter};

//! Refract Bindings - collaborator interfaces over the invocation core
//!
//! Template renderers, session stores, event sources and diagnostics sit
//! outside the reflection core and talk to it through these types:
//!
//! - [`Resolver`]: look up a named binding as a [`Callback`]
//!   ([`CallbackRegistry`], [`ObjectResolver`], [`ResolverChain`])
//! - [`SessionStore`]: per-session values ([`MemorySession`])
//! - [`EventDispatcher`]: named events delivered to connected callbacks
//! - [`diagnostics`]: labels and spans for logging reflected objects
//!
//! [`Callback`]: refract_core::Callback

#![warn(missing_docs)]

pub mod diagnostics;
pub mod events;
pub mod registry;
pub mod resolver;
pub mod session;

pub use events::EventDispatcher;
pub use registry::{CallbackRegistry, LinkedCallbacks};
pub use resolver::{ObjectResolver, Resolver, ResolverChain};
pub use session::{MemorySession, SessionStore};

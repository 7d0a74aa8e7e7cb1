//! Session state over generic values
//!
//! A session store keeps named [`Value`]s for one session and tracks
//! whether they changed since the last save. Persistence belongs to the
//! store's owner; this crate only provides the in-memory form.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;

use refract_core::{Callback, ReflectResult, Signature, TypeKey, Value};

use crate::resolver::Resolver;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Named values belonging to one session
pub trait SessionStore: Send + Sync {
    /// Session identifier
    fn id(&self) -> &str;

    /// Value stored under `key`
    fn get(&self, key: &str) -> Option<Value>;

    /// Store `value` under `key`, returning the previous value
    fn set(&self, key: &str, value: Value) -> Option<Value>;

    /// Remove `key`, returning its value
    fn remove(&self, key: &str) -> Option<Value>;

    /// Check if `key` is present
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Stored keys, sorted
    fn keys(&self) -> Vec<String>;

    /// Check if the session changed since the last [`mark_clean`](Self::mark_clean)
    fn is_dirty(&self) -> bool;

    /// Reset the dirty flag (after the owner persisted the session)
    fn mark_clean(&self);

    /// Value under `key` converted to `T`.
    ///
    /// `Ok(None)` if the key is absent; an error if the conversion fails.
    fn get_as<T: Clone + Send + Sync + 'static>(&self, key: &str) -> ReflectResult<Option<T>>
    where
        Self: Sized,
    {
        self.get(key).map(|value| value.to::<T>()).transpose()
    }
}

/// Session held in a concurrent map
#[derive(Debug)]
pub struct MemorySession {
    id: String,
    values: DashMap<String, Value>,
    dirty: AtomicBool,
}

impl MemorySession {
    /// Create an empty session with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: DashMap::new(),
            dirty: AtomicBool::new(false),
        }
    }

    /// Create an empty session with a generated id
    pub fn generated() -> Self {
        let n = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        Self::new(format!("session-{n}"))
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the session holds no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Remove every value
    pub fn clear(&self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.dirty.store(true, Ordering::Release);
        }
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::generated()
    }
}

impl SessionStore for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: Value) -> Option<Value> {
        self.dirty.store(true, Ordering::Release);
        self.values.insert(key.to_string(), value)
    }

    fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key).map(|(_, value)| value);
        if removed.is_some() {
            self.dirty.store(true, Ordering::Release);
        }
        removed
    }

    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.iter().map(|e| e.key().clone()).collect();
        keys.sort_unstable();
        keys
    }

    fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn mark_clean(&self) {
        self.dirty.store(false, Ordering::Release);
    }
}

/// Session values resolve as zero-argument callbacks returning the
/// value current at call time.
impl Resolver for std::sync::Arc<MemorySession> {
    fn resolve(&self, name: &str) -> Option<Callback> {
        if !self.contains(name) {
            return None;
        }
        let session = self.clone();
        let key = name.to_string();
        Some(Callback::from_raw(
            Signature::new(TypeKey::of::<Value>(), Vec::new()),
            move |_| Ok(session.get(&key).unwrap_or_default()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_get_remove() {
        let session = MemorySession::new("abc");
        assert_eq!(session.id(), "abc");
        assert!(session.is_empty());

        assert!(session.set("user", Value::new("ada")).is_none());
        assert!(session.contains("user"));
        assert_eq!(session.get("user").unwrap().to::<String>().unwrap(), "ada");

        let previous = session.set("user", Value::new("grace")).unwrap();
        assert_eq!(previous.to::<String>().unwrap(), "ada");

        assert!(session.remove("user").is_some());
        assert!(session.remove("user").is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn test_dirty_flag() {
        let session = MemorySession::generated();
        assert!(!session.is_dirty());
        session.set("n", Value::new(1i32));
        assert!(session.is_dirty());
        session.mark_clean();
        assert!(!session.is_dirty());

        // Removing an absent key is not a change
        session.remove("missing");
        assert!(!session.is_dirty());
        session.clear();
        assert!(session.is_dirty());
    }

    #[test]
    fn test_get_as_converts() {
        let session = MemorySession::new("typed");
        session.set("count", Value::new("42"));
        assert_eq!(session.get_as::<i64>("count").unwrap(), Some(42));
        assert_eq!(session.get_as::<i64>("absent").unwrap(), None);
        session.set("name", Value::new("x"));
        assert!(session.get_as::<i64>("name").is_err());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = MemorySession::generated();
        let b = MemorySession::generated();
        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("session-"));
    }

    #[test]
    fn test_keys_sorted() {
        let session = MemorySession::new("k");
        session.set("b", Value::null());
        session.set("a", Value::null());
        assert_eq!(session.keys(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_session_as_resolver() {
        let session = Arc::new(MemorySession::new("r"));
        session.set("title", Value::new("Home"));
        let title = session.resolve("title").unwrap();
        session.set("title", Value::new("About"));
        assert_eq!(title.invoke(&[]).unwrap().to::<String>().unwrap(), "About");
        assert!(session.resolve("absent").is_none());
    }
}

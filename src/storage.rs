//! Preference persistence for the selected breakdown property.
//!
//! The store is a plain string key/value capability so the selector can run
//! against `window.localStorage` in the browser and an in-memory map in tests.
//! Storage failures never surface to callers: a failed read is "absent" and a
//! failed write is dropped with a log line.

use crate::config::PREFERENCE_KEY_PREFIX;
use log::{debug, warn};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Scoped string key/value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }
}

/// `window.localStorage`, degrading to "absent" whenever it is unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BrowserStore;

impl BrowserStore {
    fn storage() -> Option<web_sys::Storage> {
        let window = web_sys::window()?;
        match window.local_storage() {
            Ok(storage) => storage,
            Err(err) => {
                debug!("localStorage unavailable: {:?}", err);
                None
            }
        }
    }
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage().and_then(|s| s.get_item(key).ok().flatten())
    }

    fn set(&self, key: &str, value: &str) {
        match Self::storage() {
            Some(storage) => {
                if let Err(err) = storage.set_item(key, value) {
                    warn!("Failed to persist preference {}: {:?}", key, err);
                }
            }
            None => debug!("Dropping preference write for {}: no storage", key),
        }
    }
}

/// In-memory store. Clones share the same map, which models "same client,
/// after reload" for a fresh selector instance.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl PartialEq for MemoryStore {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

/// Derive the storage key for a (site, goal) pair.
///
/// The pair is JSON-encoded after the prefix, so two different pairs can never
/// produce the same key (plain concatenation would map `("ab", "c")` and
/// `("a", "bc")` to the same string).
pub fn preference_scope(domain: &str, goal_name: &str) -> String {
    let pair = serde_json::Value::Array(vec![
        serde_json::Value::from(domain),
        serde_json::Value::from(goal_name),
    ]);
    format!("{}{}", PREFERENCE_KEY_PREFIX, pair)
}

/// A key/value store bound to one (site, goal) scope.
#[derive(Debug, Clone)]
pub struct PreferenceStore<S> {
    store: S,
    scope: String,
}

impl<S: KeyValueStore> PreferenceStore<S> {
    pub fn new(store: S, domain: &str, goal_name: &str) -> Self {
        Self {
            store,
            scope: preference_scope(domain, goal_name),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Last property chosen for this scope, if any.
    pub fn get(&self) -> Option<String> {
        self.store.get(&self.scope)
    }

    pub fn set(&self, prop_key: &str) {
        debug!("Persisting {} = {}", self.scope, prop_key);
        self.store.set(&self.scope, prop_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_keys_do_not_collide_on_concatenation() {
        assert_ne!(preference_scope("ab", "c"), preference_scope("a", "bc"));
        assert_ne!(
            preference_scope("example.com", "Signup"),
            preference_scope("example.co", "mSignup")
        );
    }

    #[test]
    fn scope_key_is_deterministic_and_prefixed() {
        let key = preference_scope("example.com", "Signup");
        assert_eq!(key, preference_scope("example.com", "Signup"));
        assert!(key.starts_with(PREFERENCE_KEY_PREFIX));
        assert_eq!(key, r#"goalPropTab__["example.com","Signup"]"#);
    }

    #[test]
    fn preference_write_is_visible_to_a_fresh_handle() {
        let store = MemoryStore::new();
        PreferenceStore::new(store.clone(), "example.com", "Signup").set("plan");

        let reloaded = PreferenceStore::new(store.clone(), "example.com", "Signup");
        assert_eq!(reloaded.get().as_deref(), Some("plan"));

        let other_goal = PreferenceStore::new(store, "example.com", "Purchase");
        assert_eq!(other_goal.get(), None);
    }

    #[test]
    fn writes_overwrite_previous_value() {
        let store = MemoryStore::new();
        let prefs = PreferenceStore::new(store.clone(), "example.com", "Signup");
        prefs.set("plan");
        prefs.set("country");
        assert_eq!(prefs.get().as_deref(), Some("country"));
        assert_eq!(store.len(), 1);
    }
}

//! Resolution of the active breakdown property.
//!
//! Three sources can name a property: the goal's declared list (its first
//! entry is the default), the last choice stored for this site and goal, and a
//! `props` filter in the URL. Precedence is URL > stored > default, and a
//! source naming a property the goal does not declare is skipped.

use crate::breakdown::BreakdownEvent;
use crate::query::{decode_prop_filter, Query};
use crate::storage::{KeyValueStore, PreferenceStore};
use crate::Goal;
use log::{debug, warn};

/// Pick the property to break the goal down by.
///
/// Returns `None` only when the goal declares no properties at all.
pub fn resolve_prop_key(goal: &Goal, stored: Option<&str>, query: &Query) -> Option<String> {
    let mut prop_key = goal.prop_names().first()?.as_str();

    if let Some(stored) = stored {
        if goal.has_prop(stored) {
            prop_key = stored;
        } else {
            debug!("Stored property {:?} not declared by goal {}", stored, goal.name());
        }
    }

    if let Some(from_url) = decode_prop_filter(query) {
        if goal.has_prop(from_url) {
            prop_key = from_url;
        } else {
            warn!(
                "URL property filter {:?} not declared by goal {}, ignoring",
                from_url, goal.name()
            );
        }
    }

    Some(prop_key.to_string())
}

/// Selector bound to one (site, goal) scope: resolves the initial property
/// and persists every user-initiated change.
#[derive(Debug, Clone)]
pub struct DimensionSelector<S> {
    goal: Goal,
    preferences: PreferenceStore<S>,
}

impl<S: KeyValueStore> DimensionSelector<S> {
    pub fn new(store: S, domain: &str, goal: Goal) -> Self {
        let preferences = PreferenceStore::new(store, domain, goal.name());
        Self { goal, preferences }
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Resolve against the stored preference and the given query.
    pub fn resolve(&self, query: &Query) -> Option<String> {
        resolve_prop_key(&self.goal, self.preferences.get().as_deref(), query)
    }

    /// Persist a user choice. Keys the goal does not declare are refused.
    pub fn remember(&self, prop_key: &str) -> bool {
        if !self.goal.has_prop(prop_key) {
            warn!("Refusing to store undeclared property {:?}", prop_key);
            return false;
        }
        self.preferences.set(prop_key);
        true
    }

    /// A tab click: persist the choice, then yield the event switching the
    /// breakdown to it. Undeclared keys yield nothing.
    pub fn select(&self, prop_key: &str) -> Option<BreakdownEvent> {
        self.remember(prop_key)
            .then(|| BreakdownEvent::DimensionChanged(prop_key.to_string()))
    }
}

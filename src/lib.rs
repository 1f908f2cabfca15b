//! Goal conversion breakdown by custom property, as a Yew component.
//!
//! A goal declares the custom properties it can be broken down by. The
//! breakdown view shows one tab per property, remembers the last tab chosen
//! for each site and goal, honours a `props` filter in the page URL, and loads
//! per-value conversion counts from the stats API.

use serde::{Deserialize, Serialize};

pub mod api;
pub mod breakdown;
pub mod components;
pub mod config;
pub mod hooks;
pub mod logging;
pub mod mount;
pub mod query;
pub mod selector;
pub mod storage;
pub mod utils;

pub use breakdown::{BreakdownEvent, BreakdownMachine, FetchController, FetchTicket, Phase};
pub use components::{PropertyBreakdown, PropertyBreakdownProps, Services};
pub use query::{decode_prop_filter, encode_value_filter, Query};

/// The tracked site the dashboard belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub domain: String,
    pub offset: Option<String>,
    pub has_goals: bool,
    pub inserted_at: Option<String>,
    pub embedded: bool,
    pub background: Option<String>,
    pub selfhosted: bool,
}

impl Site {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }
}

/// A conversion goal and the custom properties it can be broken down by.
///
/// Only built through [`Goal::new`], which keeps `prop_names` unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Goal {
    name: String,
    prop_names: Vec<String>,
}

impl Goal {
    /// Duplicate property names are dropped, keeping the first occurrence.
    pub fn new<I, P>(name: impl Into<String>, prop_names: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for prop in prop_names {
            let prop = prop.into();
            if !unique.contains(&prop) {
                unique.push(prop);
            }
        }
        Self {
            name: name.into(),
            prop_names: unique,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared properties in order; the first is the default.
    pub fn prop_names(&self) -> &[String] {
        &self.prop_names
    }

    pub fn has_prop(&self, key: &str) -> bool {
        self.prop_names.iter().any(|p| p == key)
    }
}

/// Conversions for one value of the selected property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub name: String,
    #[serde(default)]
    pub is_url: bool,
    pub count: u64,
    pub total_count: u64,
    /// Percentage, 0 to 100.
    pub conversion_rate: f64,
}

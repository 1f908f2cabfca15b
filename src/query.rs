//! Dashboard query state and its URL / API encodings.
//!
//! A [`Query`] is the decoded form of the page's URL search string. The
//! breakdown only reads the `goal` and `props` filters, but every other filter
//! is carried along so that links and API requests keep the dashboard's
//! current filter set intact.

use crate::config::{FILTERS_PARAM, GOAL_PARAM, PERIOD_PARAMS, PROPS_PARAM};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Filters other than `goal` and `props` that the dashboard keeps in the URL.
pub const OTHER_FILTER_PARAMS: [&str; 14] = [
    "source",
    "utm_medium",
    "utm_source",
    "utm_campaign",
    "referrer",
    "screen",
    "browser",
    "browser_version",
    "os",
    "os_version",
    "country",
    "page",
    "entry_page",
    "exit_page",
];

/// The single active property filter: `props={"<key>":"<value>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropFilter {
    pub key: String,
    pub value: String,
}

impl PropFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// JSON object form used in both URLs and API requests.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert(self.key.clone(), Value::String(self.value.clone()));
        Value::Object(obj)
    }

    /// Parse the `props` parameter. Anything that is not a non-empty JSON
    /// object is treated as "no filter". The first key as written is taken.
    pub fn from_param(raw: &str) -> Option<Self> {
        let obj: Map<String, Value> = match serde_json::from_str(raw) {
            Ok(obj) => obj,
            Err(err) => {
                warn!("Ignoring malformed props filter {:?}: {}", raw, err);
                return None;
            }
        };
        let (key, value) = obj.into_iter().next()?;
        let value = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Some(Self { key, value })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub goal: Option<String>,
    pub props: Option<PropFilter>,
    /// Remaining dashboard filters keyed by parameter name.
    pub other: BTreeMap<String, String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.goal.is_none() && self.props.is_none() && self.other.is_empty()
    }

    fn to_json(&self) -> Value {
        let mut obj = Map::new();
        if let Some(goal) = &self.goal {
            obj.insert(GOAL_PARAM.to_string(), Value::String(goal.clone()));
        }
        if let Some(props) = &self.props {
            obj.insert(PROPS_PARAM.to_string(), props.to_json());
        }
        for (name, value) in &self.other {
            obj.insert(name.clone(), Value::String(value.clone()));
        }
        Value::Object(obj)
    }
}

/// Decoded dashboard query: reporting period plus filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub period: Option<String>,
    pub date: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub filters: Filters,
}

impl Query {
    /// Parse a URL search string (with or without the leading `?`).
    /// Unknown parameters are ignored; empty values count as absent.
    pub fn from_search(search: &str) -> Self {
        let mut query = Query::default();
        let raw = search.strip_prefix('?').unwrap_or(search);

        for (name, value) in form_urlencoded::parse(raw.as_bytes()) {
            if value.is_empty() {
                continue;
            }
            let value = value.into_owned();
            match &*name {
                "period" => query.period = Some(value),
                "date" => query.date = Some(value),
                "from" => query.from = Some(value),
                "to" => query.to = Some(value),
                GOAL_PARAM => query.filters.goal = Some(value),
                PROPS_PARAM => query.filters.props = PropFilter::from_param(&value),
                other if OTHER_FILTER_PARAMS.contains(&other) => {
                    query.filters.other.insert(other.to_string(), value);
                }
                other => debug!("Ignoring query parameter {}", other),
            }
        }
        query
    }

    fn period_pairs(&self) -> impl Iterator<Item = (&'static str, &str)> {
        PERIOD_PARAMS
            .into_iter()
            .zip([&self.period, &self.date, &self.from, &self.to])
            .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
    }

    /// URL search form (`?period=...&goal=...`), or `""` for an empty query.
    pub fn to_search(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.period_pairs() {
            ser.append_pair(name, value);
        }
        if let Some(goal) = &self.filters.goal {
            ser.append_pair(GOAL_PARAM, goal);
        }
        if let Some(props) = &self.filters.props {
            ser.append_pair(PROPS_PARAM, &props.to_json().to_string());
        }
        for (name, value) in &self.filters.other {
            ser.append_pair(name, value);
        }
        with_question_mark(ser.finish())
    }

    /// Query string for stats API requests: period parameters plus all
    /// filters JSON-encoded under `filters`.
    pub fn to_api_params(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.period_pairs() {
            ser.append_pair(name, value);
        }
        ser.append_pair(FILTERS_PARAM, &self.filters.to_json().to_string());
        with_question_mark(ser.finish())
    }

    pub fn has_goal_filter(&self) -> bool {
        self.filters.goal.is_some()
    }
}

fn with_question_mark(encoded: String) -> String {
    if encoded.is_empty() {
        encoded
    } else {
        format!("?{}", encoded)
    }
}

/// Key of the active `props` filter, if any.
pub fn decode_prop_filter(query: &Query) -> Option<&str> {
    query.filters.props.as_ref().map(|p| p.key.as_str())
}

/// Rewrite a URL search string so that `props` filters on `key = value`.
///
/// Every other parameter is kept, in its original position. The result has no
/// leading `?`.
pub fn encode_value_filter(current_search: &str, key: &str, value: &str) -> String {
    let raw = current_search.strip_prefix('?').unwrap_or(current_search);
    let props = PropFilter::new(key, value).to_json().to_string();

    let mut ser = form_urlencoded::Serializer::new(String::new());
    let mut replaced = false;
    for (name, existing) in form_urlencoded::parse(raw.as_bytes()) {
        if name == PROPS_PARAM {
            if !replaced {
                ser.append_pair(PROPS_PARAM, &props);
                replaced = true;
            }
        } else {
            ser.append_pair(&name, &existing);
        }
    }
    if !replaced {
        ser.append_pair(PROPS_PARAM, &props);
    }
    ser.finish()
}

/// Same transformation as [`encode_value_filter`] on a decoded query.
pub fn encode_value_filter_as_query(query: &Query, key: &str, value: &str) -> Query {
    let mut next = query.clone();
    next.filters.props = Some(PropFilter::new(key, value));
    next
}

/// Read access to the page location.
pub trait UrlState {
    fn pathname(&self) -> String;
    fn search(&self) -> String;
}

/// `window.location`; an unavailable location reads as the site root.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BrowserLocation;

impl UrlState for BrowserLocation {
    fn pathname(&self) -> String {
        gloo_utils::window()
            .location()
            .pathname()
            .unwrap_or_else(|_| "/".to_string())
    }

    fn search(&self) -> String {
        gloo_utils::window()
            .location()
            .search()
            .unwrap_or_default()
    }
}

/// Fixed location, for tests and server-side use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticLocation {
    pub pathname: String,
    pub search: String,
}

impl StaticLocation {
    pub fn new(pathname: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            search: search.into(),
        }
    }
}

impl UrlState for StaticLocation {
    fn pathname(&self) -> String {
        self.pathname.clone()
    }

    fn search(&self) -> String {
        self.search.clone()
    }
}

/// Link target that narrows the current page to a single property value.
pub fn row_link(location: &dyn UrlState, key: &str, value: &str) -> String {
    format!(
        "{}?{}",
        location.pathname(),
        encode_value_filter(&location.search(), key, value)
    )
}

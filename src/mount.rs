//! Host page integration: reading the site and goal from the container
//! element's `data-*` attributes.

use crate::config::DEFAULT_LOG_LEVEL;
use crate::logging::parse_level;
use crate::{Goal, Site};
use log::LevelFilter;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MountError {
    NoContainer(String),
    MissingAttribute(&'static str),
    InvalidGoal(String),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::NoContainer(id) => write!(f, "No element with id {:?}", id),
            MountError::MissingAttribute(name) => write!(f, "Container is missing {}", name),
            MountError::InvalidGoal(reason) => write!(f, "Invalid goal: {}", reason),
        }
    }
}

impl std::error::Error for MountError {}

/// What the host page hands to the breakdown at mount time.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub site: Site,
    pub goal: Goal,
    pub log_level: LevelFilter,
}

fn flag(value: Option<String>) -> bool {
    value.as_deref() == Some("true")
}

/// Goal property names arrive either as a JSON array or comma separated.
fn parse_prop_names(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(names) = serde_json::from_str::<Vec<String>>(trimmed) {
            return names;
        }
    }
    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Log level from `data-log-level`, falling back to the default.
pub fn log_level(attr: impl Fn(&str) -> Option<String>) -> LevelFilter {
    attr("data-log-level")
        .as_deref()
        .and_then(parse_level)
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

impl HostConfig {
    /// Build from an attribute lookup, e.g. `|name| element.get_attribute(name)`.
    pub fn from_attributes(attr: impl Fn(&str) -> Option<String>) -> Result<Self, MountError> {
        let domain = attr("data-domain")
            .filter(|d| !d.is_empty())
            .ok_or(MountError::MissingAttribute("data-domain"))?;
        let goal_name = attr("data-goal-name")
            .filter(|g| !g.is_empty())
            .ok_or(MountError::MissingAttribute("data-goal-name"))?;
        let prop_names = attr("data-goal-prop-names")
            .map(|raw| parse_prop_names(&raw))
            .ok_or(MountError::MissingAttribute("data-goal-prop-names"))?;
        if prop_names.is_empty() {
            return Err(MountError::InvalidGoal(format!(
                "{} declares no properties",
                goal_name
            )));
        }

        let site = Site {
            domain,
            offset: attr("data-offset"),
            has_goals: flag(attr("data-has-goals")),
            inserted_at: attr("data-inserted-at"),
            embedded: flag(attr("data-embedded")),
            background: attr("data-background"),
            selfhosted: flag(attr("data-selfhosted")),
        };

        Ok(Self {
            site,
            goal: Goal::new(goal_name, prop_names),
            log_level: log_level(&attr),
        })
    }
}

//! Yew view components for the goal property breakdown.
//!
//! [`PropertyBreakdown`] is the entry point: it resolves the initial property
//! once per (site, goal) and mounts a [`BreakdownPanel`] keyed by that scope
//! and the goal's declared properties.
//! Everything below the panel renders straight from the state machine.

use crate::api::{HttpStatsApi, StatsApi};
use crate::breakdown::{BreakdownMachine, Phase};
use crate::hooks::use_property_breakdown;
use crate::query::{row_link, BrowserLocation, Query, UrlState};
use crate::selector::DimensionSelector;
use crate::storage::{preference_scope, BrowserStore, KeyValueStore};
use crate::utils::{bar_width_percent, format_count, format_number};
use crate::{BreakdownRow, Goal, Site};
use log::warn;
use std::rc::Rc;
use yew::prelude::*;

/// Capabilities the breakdown talks to. Defaults to the browser
/// implementations; tests and embedders can swap any of them.
#[derive(Clone)]
pub struct Services {
    pub store: Rc<dyn KeyValueStore>,
    pub api: Rc<dyn StatsApi>,
    pub location: Rc<dyn UrlState>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            store: Rc::new(BrowserStore),
            api: Rc::new(HttpStatsApi::default()),
            location: Rc::new(BrowserLocation),
        }
    }
}

impl PartialEq for Services {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
            && Rc::ptr_eq(&self.api, &other.api)
            && Rc::ptr_eq(&self.location, &other.location)
    }
}

/// Everything a single breakdown row displays.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub label: String,
    /// Link narrowing the dashboard to this value.
    pub href: String,
    /// Target of the external-link icon for URL-valued properties.
    pub external: Option<String>,
    pub bar_width: f64,
    pub count: String,
    pub total_count: String,
    pub conversion_rate: String,
}

/// Build the display model for one row of a loaded breakdown.
pub fn row_view(
    row: &BreakdownRow,
    all: &[BreakdownRow],
    prop_key: &str,
    location: &dyn UrlState,
) -> RowView {
    RowView {
        label: row.name.clone(),
        href: row_link(location, prop_key, &row.name),
        external: row.is_url.then(|| row.name.clone()),
        bar_width: bar_width_percent(row.count, all),
        count: format_count(row.count),
        total_count: format_count(row.total_count),
        conversion_rate: format!("{}%", format_number(row.conversion_rate)),
    }
}

/// Remount key for the panel: changes with the preference scope and with the
/// goal's declared properties, so either one restarts resolution.
pub fn panel_key(domain: &str, goal: &Goal) -> String {
    format!(
        "{}{}",
        preference_scope(domain, goal.name()),
        serde_json::Value::from(goal.prop_names().to_vec())
    )
}

#[derive(Properties, PartialEq)]
pub struct PropertyBreakdownProps {
    pub site: Site,
    pub goal: Goal,
    pub query: Query,
    #[prop_or_default]
    pub services: Services,
}

/// Breakdown of a goal's conversions by one of its custom properties.
#[function_component(PropertyBreakdown)]
pub fn property_breakdown(props: &PropertyBreakdownProps) -> Html {
    let initial = {
        let store = props.services.store.clone();
        let query = props.query.clone();
        use_memo(
            (props.site.domain.clone(), props.goal.clone()),
            move |(domain, goal)| {
                let selector = DimensionSelector::new(store, domain, goal.clone());
                let prop_key = selector.resolve(&query)?;
                BreakdownMachine::new(goal.clone(), prop_key, query.has_goal_filter()).map(Rc::new)
            },
        )
    };

    match &*initial {
        Some(machine) => html! {
            <BreakdownPanel
                key={panel_key(&props.site.domain, &props.goal)}
                initial={machine.clone()}
                site={props.site.clone()}
                query={props.query.clone()}
                services={props.services.clone()}
            />
        },
        None => {
            warn!("Goal {} declares no properties, nothing to break down", props.goal.name());
            html! {}
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct BreakdownPanelProps {
    pub initial: Rc<BreakdownMachine>,
    pub site: Site,
    pub query: Query,
    pub services: Services,
}

#[function_component(BreakdownPanel)]
pub fn breakdown_panel(props: &BreakdownPanelProps) -> Html {
    let handle = use_property_breakdown(
        props.initial.clone(),
        &props.site,
        &props.query,
        &props.services,
    );
    let machine = &*handle.state;

    html! {
        <div class="w-full pl-6 mt-4">
            <div class="flex items-center pb-1">
                <span class="text-xs font-bold text-gray-600 dark:text-gray-300">{ "Breakdown by:" }</span>
                <ul class="flex font-medium text-xs text-gray-500 dark:text-gray-400 space-x-2 leading-5 pl-1">
                    { for machine.goal().prop_names().iter().map(|name| html! {
                        <PropPill
                            key={name.clone()}
                            name={name.clone()}
                            active={name == machine.prop_key()}
                            on_select={handle.on_select.clone()}
                        />
                    }) }
                </ul>
            </div>
            { render_body(machine, props.services.location.as_ref(), &handle.on_retry) }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct PropPillProps {
    pub name: String,
    pub active: bool,
    pub on_select: Callback<String>,
}

/// One property tab. Only inactive tabs are clickable.
#[function_component(PropPill)]
pub fn prop_pill(props: &PropPillProps) -> Html {
    if props.active {
        return html! {
            <li class="inline-block h-5 text-indigo-700 dark:text-indigo-500 font-bold border-b-2 border-indigo-700 dark:border-indigo-500">
                { props.name.clone() }
            </li>
        };
    }

    let onclick = {
        let name = props.name.clone();
        props.on_select.reform(move |_: MouseEvent| name.clone())
    };
    html! {
        <li class="hover:text-indigo-600 cursor-pointer" {onclick}>{ props.name.clone() }</li>
    }
}

fn render_body(machine: &BreakdownMachine, location: &dyn UrlState, on_retry: &Callback<()>) -> Html {
    match machine.phase() {
        Phase::Idle | Phase::Loading(_) => html! {
            <div class="px-4 py-2"><div class="loading sm mx-auto"><div></div></div></div>
        },
        Phase::Failed(error) => {
            let onclick = on_retry.reform(|_: MouseEvent| ());
            html! {
                <div class="px-4 py-2 text-sm text-red-600 dark:text-red-400">
                    { format!("Failed to load breakdown: {}", error) }
                    <button class="ml-2 underline" {onclick}>{ "Retry" }</button>
                </div>
            }
        }
        Phase::Loaded(rows) if rows.is_empty() => html! {
            <div class="px-4 py-2 text-sm text-gray-500 dark:text-gray-400">{ "No data yet" }</div>
        },
        Phase::Loaded(rows) => rows
            .iter()
            .map(|row| render_row(&row_view(row, rows, machine.prop_key(), location)))
            .collect::<Html>(),
    }
}

fn render_row(view: &RowView) -> Html {
    html! {
        <div class="flex items-center justify-between my-2" key={view.label.clone()}>
            <div class="w-full h-8 relative" style="max-width: calc(100% - 16rem)">
                <div
                    class="absolute top-0 left-0 h-full bg-red-50 dark:bg-gray-500 dark:bg-opacity-15"
                    style={format!("width: {}%", view.bar_width)}
                ></div>
                <span class="flex px-2 group dark:text-gray-300 relative" style="margin-top: -26px">
                    <a href={view.href.clone()} class="hover:underline block truncate">{ view.label.clone() }</a>
                    { render_external_link(view.external.as_deref()) }
                </span>
            </div>
            <div class="dark:text-gray-200">
                <span class="font-medium inline-block w-20 text-right">{ view.count.clone() }</span>
                <span class="font-medium inline-block w-20 text-right">{ view.total_count.clone() }</span>
                <span class="font-medium inline-block w-20 text-right">{ view.conversion_rate.clone() }</span>
            </div>
        </div>
    }
}

fn render_external_link(target: Option<&str>) -> Html {
    let Some(target) = target else {
        return html! {};
    };
    html! {
        <a target="_blank" rel="noopener noreferrer" href={target.to_string()} class="hidden group-hover:block">
            <svg class="inline h-4 w-4 ml-1 -mt-1 text-gray-600 dark:text-gray-400" fill="currentColor" viewBox="0 0 20 20">
                <path d="M11 3a1 1 0 100 2h2.586l-6.293 6.293a1 1 0 101.414 1.414L15 6.414V9a1 1 0 102 0V4a1 1 0 00-1-1h-5z"></path>
                <path d="M5 5a2 2 0 00-2 2v8a2 2 0 002 2h8a2 2 0 002-2v-3a1 1 0 10-2 0v3H5V7h3a1 1 0 000-2H5z"></path>
            </svg>
        </a>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PropFilter, StaticLocation};

    fn row(name: &str, is_url: bool, count: u64) -> BreakdownRow {
        BreakdownRow {
            name: name.to_string(),
            is_url,
            count,
            total_count: 4_200,
            conversion_rate: 12.5,
        }
    }

    #[test]
    fn row_view_links_to_single_value_filter() {
        let location = StaticLocation::new("/example.com", "?period=30d&goal=Signup");
        let rows = vec![row("pro", false, 40), row("free", false, 10)];
        let view = row_view(&rows[1], &rows, "plan", &location);

        assert_eq!(view.label, "free");
        assert_eq!(view.external, None);
        assert_eq!(view.bar_width, 25.0);
        assert_eq!(view.count, "10");
        assert_eq!(view.total_count, "4.2k");
        assert_eq!(view.conversion_rate, "12.5%");

        let (path, search) = view.href.split_once('?').unwrap();
        assert_eq!(path, "/example.com");
        let linked = Query::from_search(search);
        assert_eq!(linked.filters.props, Some(PropFilter::new("plan", "free")));
        assert_eq!(linked.filters.goal.as_deref(), Some("Signup"));
    }

    #[test]
    fn url_rows_get_an_external_link() {
        let location = StaticLocation::new("/example.com", "");
        let rows = vec![row("https://blog.example.com/post", true, 1)];
        let view = row_view(&rows[0], &rows, "referrer_url", &location);
        assert_eq!(view.external.as_deref(), Some("https://blog.example.com/post"));
        assert_eq!(view.bar_width, 100.0);
    }

    #[test]
    fn panel_remounts_when_declared_properties_change() {
        let before = Goal::new("Signup", ["a", "b"]);
        let after = Goal::new("Signup", ["c"]);
        assert_eq!(panel_key("example.com", &before), panel_key("example.com", &before.clone()));
        assert_ne!(panel_key("example.com", &before), panel_key("example.com", &after));
        assert_ne!(panel_key("example.com", &before), panel_key("other.com", &before));
        assert_ne!(
            panel_key("example.com", &before),
            panel_key("example.com", &Goal::new("Purchase", ["a", "b"]))
        );
    }

    #[test]
    fn default_services_are_distinct_instances() {
        let services = Services::default();
        assert!(services == services.clone());
        assert!(services != Services::default());
    }
}

//! Mounts the goal property breakdown into the host page.

use goal_breakdown::config::CONTAINER_ID;
use goal_breakdown::logging;
use goal_breakdown::mount::{self, HostConfig, MountError};
use goal_breakdown::query::{BrowserLocation, Query, UrlState};
use goal_breakdown::{PropertyBreakdown, PropertyBreakdownProps, Services};
use log::{error, info};

fn run() -> Result<(), MountError> {
    let container = gloo_utils::document()
        .get_element_by_id(CONTAINER_ID)
        .ok_or_else(|| MountError::NoContainer(CONTAINER_ID.to_string()))?;

    logging::init(mount::log_level(|name| container.get_attribute(name)));

    let host = HostConfig::from_attributes(|name| container.get_attribute(name))?;
    let query = Query::from_search(&BrowserLocation.search());
    info!(
        "Mounting breakdown for {} / {} ({} properties)",
        host.site.domain,
        host.goal.name(),
        host.goal.prop_names().len()
    );

    let props = PropertyBreakdownProps {
        site: host.site,
        goal: host.goal,
        query,
        services: Services::default(),
    };
    yew::Renderer::<PropertyBreakdown>::with_root_and_props(container, props).render();
    Ok(())
}

/// Entry point: hooks up panic reporting, then renders into the container.
fn main() {
    console_error_panic_hook::set_once();
    if let Err(err) = run() {
        logging::init(goal_breakdown::config::DEFAULT_LOG_LEVEL);
        error!("Breakdown not mounted: {}", err);
    }
}

use crate::breakdown::{BreakdownEvent, BreakdownMachine, FetchController};
use crate::components::Services;
use crate::query::Query;
use crate::selector::DimensionSelector;
use crate::Site;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

impl Reducible for BreakdownMachine {
    type Action = BreakdownEvent;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        next.handle(action);
        Rc::new(next)
    }
}

/// State and callbacks driving one mounted breakdown panel.
#[derive(Clone)]
pub struct BreakdownHandle {
    /// Current selection and load state.
    pub state: UseReducerHandle<BreakdownMachine>,
    /// Persist the chosen property and load its breakdown.
    pub on_select: Callback<String>,
    /// Reload the current property after a failure.
    pub on_retry: Callback<()>,
}

/// Custom hook wiring the breakdown state machine to the stats API.
///
/// `initial` is only read on the first render; the panel is remounted (via
/// its `key`) when the site, the goal or its properties change. A changed `query` keeps the
/// selected property but re-fetches it.
#[hook]
pub fn use_property_breakdown(
    initial: Rc<BreakdownMachine>,
    site: &Site,
    query: &Query,
    services: &Services,
) -> BreakdownHandle {
    let state = use_reducer(move || (*initial).clone());
    let controller = use_mut_ref(FetchController::new);
    let mounted = use_mut_ref(|| false);

    // Mount, then re-fetch whenever the dashboard query changes.
    {
        let dispatcher = state.dispatcher();
        use_effect_with(query.clone(), move |query| {
            let already_mounted = std::mem::replace(&mut *mounted.borrow_mut(), true);
            dispatcher.dispatch(BreakdownEvent::for_query(already_mounted, query));
            || ()
        });
    }

    // Issue the request for every new ticket; the teardown aborts it when the
    // ticket is superseded or the panel unmounts.
    {
        let dispatcher = state.dispatcher();
        let api = services.api.clone();
        let domain = site.domain.clone();
        let query = query.clone();
        let controller = controller.clone();
        use_effect_with(state.pending_ticket().cloned(), move |ticket| {
            if let Some(ticket) = ticket.clone() {
                let request = controller
                    .borrow_mut()
                    .start(api.as_ref(), &domain, &query, ticket);
                spawn_local(async move {
                    if let Some(event) = request.await {
                        dispatcher.dispatch(event);
                    }
                });
            }
            move || controller.borrow_mut().cancel()
        });
    }

    let on_select = {
        let dispatcher = state.dispatcher();
        let selector =
            DimensionSelector::new(services.store.clone(), &site.domain, state.goal().clone());
        Callback::from(move |prop_key: String| {
            if let Some(event) = selector.select(&prop_key) {
                dispatcher.dispatch(event);
            }
        })
    };

    let on_retry = {
        let dispatcher = state.dispatcher();
        Callback::from(move |_: ()| dispatcher.dispatch(BreakdownEvent::Retry))
    };

    BreakdownHandle {
        state,
        on_select,
        on_retry,
    }
}

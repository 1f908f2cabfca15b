//! End-to-end selection and fetch flows against an in-memory store and a
//! stats API whose responses are released by hand.

use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use goal_breakdown::api::{ApiError, StatsApi};
use goal_breakdown::query::PropFilter;
use goal_breakdown::selector::DimensionSelector;
use goal_breakdown::storage::MemoryStore;
use goal_breakdown::{
    BreakdownEvent, BreakdownMachine, BreakdownRow, FetchController, Goal, Phase, Query,
};
use std::cell::RefCell;
use std::rc::Rc;

type Reply = Result<Vec<BreakdownRow>, ApiError>;

/// Records every request and hands back a future that completes only when
/// the test replies to it.
#[derive(Default)]
struct ManualApi {
    requests: RefCell<Vec<(String, Option<oneshot::Sender<Reply>>)>>,
}

impl ManualApi {
    fn requested_keys(&self) -> Vec<String> {
        self.requests.borrow().iter().map(|(k, _)| k.clone()).collect()
    }

    fn reply(&self, index: usize, reply: Reply) -> bool {
        let sender = self.requests.borrow_mut()[index].1.take();
        sender.map(|tx| tx.send(reply).is_ok()).unwrap_or(false)
    }

    fn is_cancelled(&self, index: usize) -> bool {
        self.requests.borrow()[index]
            .1
            .as_ref()
            .map(|tx| tx.is_canceled())
            .unwrap_or(false)
    }
}

impl StatsApi for ManualApi {
    fn prop_breakdown(
        &self,
        _domain: &str,
        prop_key: &str,
        _query: &Query,
    ) -> LocalBoxFuture<'static, Reply> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .borrow_mut()
            .push((prop_key.to_string(), Some(tx)));
        rx.map(|reply| reply.unwrap_or_else(|_| Err(ApiError::Network("dropped".into()))))
            .boxed_local()
    }
}

struct Harness {
    machine: Rc<RefCell<BreakdownMachine>>,
    controller: FetchController,
    api: Rc<ManualApi>,
    selector: DimensionSelector<MemoryStore>,
    query: Query,
    pool: LocalPool,
}

impl Harness {
    fn mount(store: MemoryStore, query: Query) -> Self {
        let goal = Goal::new("Signup", ["a", "b", "c"]);
        let selector = DimensionSelector::new(store, "example.com", goal.clone());
        let prop_key = selector.resolve(&query).unwrap();
        let machine = BreakdownMachine::new(goal, prop_key, query.has_goal_filter()).unwrap();
        let mut harness = Self {
            machine: Rc::new(RefCell::new(machine)),
            controller: FetchController::new(),
            api: Rc::new(ManualApi::default()),
            selector,
            query,
            pool: LocalPool::new(),
        };
        let mounted = BreakdownEvent::for_query(false, &harness.query);
        harness.dispatch(mounted);
        harness
    }

    fn dispatch(&mut self, event: BreakdownEvent) {
        let ticket = self.machine.borrow_mut().handle(event);
        if let Some(ticket) = ticket {
            let request = self
                .controller
                .start(self.api.as_ref(), "example.com", &self.query, ticket);
            let machine = self.machine.clone();
            self.pool
                .spawner()
                .spawn_local(async move {
                    if let Some(event) = request.await {
                        machine.borrow_mut().handle(event);
                    }
                })
                .unwrap();
        }
        self.pool.run_until_stalled();
    }

    /// A tab click, through the same path the view takes.
    fn change_prop_key(&mut self, key: &str) {
        let event = self.selector.select(key).expect("declared property");
        self.dispatch(event);
    }

    fn change_query(&mut self, query: Query) {
        self.query = query;
        let event = BreakdownEvent::for_query(true, &self.query);
        self.dispatch(event);
    }

    fn reply(&mut self, index: usize, reply: Reply) -> bool {
        let delivered = self.api.reply(index, reply);
        self.pool.run_until_stalled();
        delivered
    }

    fn state(&self) -> BreakdownMachine {
        self.machine.borrow().clone()
    }
}

fn goal_query() -> Query {
    Query::from_search("period=30d&goal=Signup")
}

fn rows(names: &[&str]) -> Vec<BreakdownRow> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| BreakdownRow {
            name: name.to_string(),
            is_url: false,
            count: 10 - i as u64,
            total_count: 20,
            conversion_rate: 50.0,
        })
        .collect()
}

#[test]
fn mount_fetches_default_property_and_renders_rows() {
    let mut h = Harness::mount(MemoryStore::new(), goal_query());
    assert_eq!(h.api.requested_keys(), ["a"]);
    assert!(h.state().is_loading());

    assert!(h.reply(0, Ok(rows(&["pro", "free"]))));
    let state = h.state();
    assert!(!state.is_loading());
    let names: Vec<_> = state.rows().unwrap().iter().map(|r| r.name.clone()).collect();
    assert_eq!(names, ["pro", "free"]);
}

#[test]
fn late_response_for_superseded_property_is_ignored() {
    let mut h = Harness::mount(MemoryStore::new(), goal_query());
    h.change_prop_key("b");
    assert_eq!(h.api.requested_keys(), ["a", "b"]);

    assert!(h.reply(1, Ok(rows(&["from-b"]))));
    // The request for "a" was aborted, so its reply has nowhere to go.
    assert!(!h.reply(0, Ok(rows(&["from-a"]))));

    let state = h.state();
    assert_eq!(state.prop_key(), "b");
    assert_eq!(state.rows().unwrap()[0].name, "from-b");
}

#[test]
fn switching_property_cancels_the_in_flight_request() {
    let mut h = Harness::mount(MemoryStore::new(), goal_query());
    assert!(!h.api.is_cancelled(0));
    h.change_prop_key("c");
    assert!(h.api.is_cancelled(0));
    assert!(!h.api.is_cancelled(1));
    assert_eq!(h.controller.in_flight().map(|t| t.prop_key.as_str()), Some("c"));
}

#[test]
fn no_goal_filter_means_no_request_and_endless_loading() {
    let mut h = Harness::mount(MemoryStore::new(), Query::from_search("period=30d"));
    assert!(h.api.requested_keys().is_empty());
    assert_eq!(h.state().phase(), &Phase::Idle);
    assert!(h.state().is_loading());

    h.change_prop_key("b");
    assert!(h.api.requested_keys().is_empty());
    assert!(h.state().is_loading());
    assert_eq!(h.state().prop_key(), "b");
}

#[test]
fn failed_fetch_moves_to_failed_and_retry_recovers() {
    let mut h = Harness::mount(MemoryStore::new(), goal_query());
    assert!(h.reply(
        0,
        Err(ApiError::Status {
            status: 500,
            message: "Internal error".into()
        })
    ));
    let state = h.state();
    assert!(!state.is_loading());
    assert_eq!(state.error(), Some("HTTP error 500: Internal error"));
    assert!(state.rows().is_none());

    h.dispatch(BreakdownEvent::Retry);
    assert_eq!(h.api.requested_keys(), ["a", "a"]);
    assert!(h.reply(1, Ok(rows(&["ok"]))));
    assert_eq!(h.state().rows().unwrap().len(), 1);
}

#[test]
fn chosen_property_is_preferred_after_reload() {
    let store = MemoryStore::new();
    let mut first = Harness::mount(store.clone(), goal_query());
    first.change_prop_key("c");
    drop(first);

    let reloaded = Harness::mount(store.clone(), goal_query());
    assert_eq!(reloaded.state().prop_key(), "c");
    assert_eq!(reloaded.api.requested_keys(), ["c"]);

    let mut with_filter = goal_query();
    with_filter.filters.props = Some(PropFilter::new("b", "x"));
    let filtered = Harness::mount(store, with_filter);
    assert_eq!(filtered.state().prop_key(), "b");
}

#[test]
fn unknown_url_property_falls_back_to_stored_choice() {
    let store = MemoryStore::new();
    Harness::mount(store.clone(), goal_query()).change_prop_key("b");

    let mut query = goal_query();
    query.filters.props = Some(PropFilter::new("not-a-prop", "x"));
    let h = Harness::mount(store, query);
    assert_eq!(h.state().prop_key(), "b");
}

#[test]
fn query_change_keeps_the_tab_and_refetches_it() {
    let mut h = Harness::mount(MemoryStore::new(), goal_query());
    h.change_prop_key("b");
    assert!(h.reply(1, Ok(rows(&["old"]))));

    h.change_query(Query::from_search("period=7d&goal=Signup"));
    assert_eq!(h.api.requested_keys(), ["a", "b", "b"]);
    assert_eq!(h.state().prop_key(), "b");
    assert!(h.state().is_loading());
    assert!(h.reply(2, Ok(rows(&["new"]))));
    assert_eq!(h.state().rows().unwrap()[0].name, "new");

    h.change_query(Query::from_search("period=7d"));
    assert_eq!(h.api.requested_keys().len(), 3);
    assert_eq!(h.state().phase(), &Phase::Idle);
}

#[test]
fn undeclared_tab_is_neither_stored_nor_fetched() {
    let store = MemoryStore::new();
    let h = Harness::mount(store.clone(), goal_query());
    assert_eq!(h.selector.select("zzz"), None);
    assert!(store.is_empty());
    assert_eq!(h.api.requested_keys(), ["a"]);
}

//! Selection state and fetch lifecycle for the property breakdown.
//!
//! [`BreakdownMachine`] is the single owner of the active property and of the
//! loading/result state. It is driven by discrete [`BreakdownEvent`]s and
//! tells the caller when a request must be issued by handing out a
//! [`FetchTicket`]. Only the ticket of the current `Loading` phase may resolve
//! the state; results for any older ticket are dropped.
//!
//! [`FetchController`] runs the request for a ticket and aborts the previous
//! in-flight request whenever a new one starts.

use crate::api::StatsApi;
use crate::query::Query;
use crate::{BreakdownRow, Goal};
use futures::future::{AbortHandle, Abortable};
use log::{debug, info, warn};
use std::future::Future;
use std::rc::Rc;

/// Identifies one request: the property it was issued for plus a counter
/// that is bumped on every fetch, so re-selecting a property after switching
/// away still yields a distinct ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub generation: u64,
    pub prop_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    /// No request applies (no goal filter selected). Rendered as loading.
    Idle,
    Loading(FetchTicket),
    Loaded(Rc<Vec<BreakdownRow>>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum BreakdownEvent {
    /// The view was mounted.
    Mounted,
    /// The user picked another property.
    DimensionChanged(String),
    /// The dashboard query changed under a mounted view.
    QueryChanged { has_goal_filter: bool },
    /// The user asked to reload after a failure.
    Retry,
    FetchResolved {
        ticket: FetchTicket,
        rows: Vec<BreakdownRow>,
    },
    FetchFailed {
        ticket: FetchTicket,
        error: String,
    },
}

impl BreakdownEvent {
    /// Event for a run of the query effect: the first run mounts the view,
    /// later runs report a changed query.
    pub fn for_query(already_mounted: bool, query: &Query) -> Self {
        if already_mounted {
            BreakdownEvent::QueryChanged {
                has_goal_filter: query.has_goal_filter(),
            }
        } else {
            BreakdownEvent::Mounted
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownMachine {
    goal: Goal,
    prop_key: String,
    phase: Phase,
    has_goal_filter: bool,
    generation: u64,
}

impl BreakdownMachine {
    /// Create the machine for an already resolved property.
    ///
    /// Returns `None` if `prop_key` is not declared by `goal`.
    pub fn new(goal: Goal, prop_key: String, has_goal_filter: bool) -> Option<Self> {
        if !goal.has_prop(&prop_key) {
            return None;
        }
        Some(Self {
            goal,
            prop_key,
            phase: Phase::Idle,
            has_goal_filter,
            generation: 0,
        })
    }

    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    pub fn prop_key(&self) -> &str {
        &self.prop_key
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Idle | Phase::Loading(_))
    }

    pub fn rows(&self) -> Option<&[BreakdownRow]> {
        match &self.phase {
            Phase::Loaded(rows) => Some(rows.as_slice()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed(msg) => Some(msg),
            _ => None,
        }
    }

    /// Ticket of the request currently allowed to resolve the state.
    pub fn pending_ticket(&self) -> Option<&FetchTicket> {
        match &self.phase {
            Phase::Loading(ticket) => Some(ticket),
            _ => None,
        }
    }

    /// Apply an event. Returns the ticket to fetch when the event starts a
    /// new request.
    pub fn handle(&mut self, event: BreakdownEvent) -> Option<FetchTicket> {
        match event {
            BreakdownEvent::Mounted | BreakdownEvent::Retry => self.start_fetch(),
            BreakdownEvent::DimensionChanged(prop_key) => {
                if !self.goal.has_prop(&prop_key) {
                    warn!("Ignoring undeclared property {:?}", prop_key);
                    return None;
                }
                if prop_key == self.prop_key && !matches!(self.phase, Phase::Failed(_)) {
                    return None;
                }
                info!("Breaking down {} by {}", self.goal.name(), prop_key);
                self.prop_key = prop_key;
                self.start_fetch()
            }
            BreakdownEvent::QueryChanged { has_goal_filter } => {
                self.has_goal_filter = has_goal_filter;
                self.start_fetch()
            }
            BreakdownEvent::FetchResolved { ticket, rows } => {
                if self.accepts(&ticket) {
                    debug!("{} rows for {}", rows.len(), ticket.prop_key);
                    self.phase = Phase::Loaded(Rc::new(rows));
                }
                None
            }
            BreakdownEvent::FetchFailed { ticket, error } => {
                if self.accepts(&ticket) {
                    warn!("Breakdown by {} failed: {}", ticket.prop_key, error);
                    self.phase = Phase::Failed(error);
                }
                None
            }
        }
    }

    fn accepts(&self, ticket: &FetchTicket) -> bool {
        let live = self.pending_ticket() == Some(ticket);
        if !live {
            debug!(
                "Discarding stale result for {} (generation {})",
                ticket.prop_key, ticket.generation
            );
        }
        live
    }

    fn start_fetch(&mut self) -> Option<FetchTicket> {
        if !self.has_goal_filter {
            debug!("No goal filter selected, not fetching");
            self.phase = Phase::Idle;
            return None;
        }
        self.generation += 1;
        let ticket = FetchTicket {
            generation: self.generation,
            prop_key: self.prop_key.clone(),
        };
        self.phase = Phase::Loading(ticket.clone());
        Some(ticket)
    }
}

/// Runs breakdown requests, keeping at most one in flight.
#[derive(Debug, Default)]
pub struct FetchController {
    in_flight: Option<(FetchTicket, AbortHandle)>,
}

impl FetchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref().map(|(ticket, _)| ticket)
    }

    /// Abort the in-flight request, if any.
    pub fn cancel(&mut self) {
        if let Some((ticket, handle)) = self.in_flight.take() {
            debug!("Aborting request for {}", ticket.prop_key);
            handle.abort();
        }
    }

    /// Start the request for `ticket`, aborting the previous one.
    ///
    /// The returned future yields the event to feed back into the machine,
    /// or `None` if the request was aborted.
    pub fn start<A: StatsApi + ?Sized>(
        &mut self,
        api: &A,
        domain: &str,
        query: &Query,
        ticket: FetchTicket,
    ) -> impl Future<Output = Option<BreakdownEvent>> + 'static {
        self.cancel();
        let (handle, registration) = AbortHandle::new_pair();
        let request = api.prop_breakdown(domain, &ticket.prop_key, query);
        self.in_flight = Some((ticket.clone(), handle));

        async move {
            match Abortable::new(request, registration).await {
                Ok(Ok(rows)) => Some(BreakdownEvent::FetchResolved { ticket, rows }),
                Ok(Err(err)) => Some(BreakdownEvent::FetchFailed {
                    ticket,
                    error: err.to_string(),
                }),
                Err(_aborted) => None,
            }
        }
    }
}

//! The dispatch engine shared by both router sides.
//!
//! [`Routes`] owns a route table and its chain registry behind one lock, so a
//! registration and its chain record are a single critical section. Dispatch
//! snapshots the matching routes, releases the lock, and then awaits each
//! handler in turn: route order first, handler order within a route.

use super::{
    chain::ChainRegistry,
    matcher::PathMatcher,
    table::{HandlerId, RouteHandle, RouteMatch, RouteTable},
};
use parking_lot::RwLock;
use std::{future::Future, sync::Arc};
use switchboard_core::{InboundMessage, Request, RouteError, Verb};

/// How dispatch of one message ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// Every matching handler ran.
    Completed,
    /// The message was a reply and reached no handler.
    Ignored,
    /// A handler failed; later handlers and routes were skipped.
    Aborted,
}

/// Summary of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// How dispatch ended.
    pub status: DispatchStatus,
    /// Routes whose pattern accepted the path.
    pub routes_matched: usize,
    /// Handlers invoked, including one that failed.
    pub handlers_run: usize,
}

impl DispatchOutcome {
    /// Outcome for a reply frame.
    pub const fn ignored() -> Self {
        Self {
            status: DispatchStatus::Ignored,
            routes_matched: 0,
            handlers_run: 0,
        }
    }

    /// Whether every matching handler ran.
    pub fn is_completed(&self) -> bool {
        self.status == DispatchStatus::Completed
    }
}

struct RoutesState<H: ?Sized> {
    table: RouteTable<H>,
    chains: ChainRegistry,
}

/// A route table with chained registration.
pub struct Routes<H: ?Sized> {
    state: RwLock<RoutesState<H>>,
}

impl<H: ?Sized> Default for Routes<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> Routes<H> {
    /// Create an empty set of routes.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RoutesState {
                table: RouteTable::new(),
                chains: ChainRegistry::new(),
            }),
        }
    }

    /// Compile `pattern` and append a route for `verb`.
    ///
    /// If a chain is active the route is recorded into it.
    pub fn register<I>(
        &self,
        verb: Verb,
        pattern: &str,
        handlers: I,
    ) -> Result<RouteHandle, RouteError>
    where
        I: IntoIterator<Item = Arc<H>>,
    {
        let matcher = PathMatcher::compile(pattern)?;
        let handlers: Vec<_> = handlers.into_iter().collect();

        let mut state = self.state.write();
        let handle = state.table.insert(verb, matcher, handlers);
        state.chains.record(verb, handle);
        tracing::trace!(%verb, pattern, chain = state.chains.active(), "route registered");
        Ok(handle)
    }

    /// Start recording registrations under `name`.
    pub fn start_chain(&self, name: &str) {
        self.state.write().chains.start(name);
    }

    /// Stop recording registrations.
    pub fn end_chain(&self) {
        self.state.write().chains.end();
    }

    /// Remove every route recorded under `name` and forget the chain.
    ///
    /// Returns the number of routes removed.
    pub fn clear_chain(&self, name: &str) -> usize {
        let mut state = self.state.write();
        let entries = state.chains.take(name);
        let removed = entries
            .into_iter()
            .filter(|entry| state.table.remove_route(entry.verb, entry.route))
            .count();
        tracing::debug!(chain = name, removed, "chain cleared");
        removed
    }

    /// The chain currently recording, if any.
    pub fn active_chain(&self) -> Option<String> {
        self.state.read().chains.active().map(str::to_owned)
    }

    /// Names of every recorded chain.
    pub fn chain_names(&self) -> Vec<String> {
        self.state.read().chains.names()
    }

    /// Remove a single route.
    pub fn remove_route(&self, verb: Verb, route: RouteHandle) -> bool {
        self.state.write().table.remove_route(verb, route)
    }

    /// Remove a single handler from its route.
    pub fn remove_handler(&self, verb: Verb, handler: HandlerId) -> bool {
        self.state.write().table.remove_handler(verb, handler)
    }

    /// Number of routes registered for `verb`.
    pub fn route_count(&self, verb: Verb) -> usize {
        self.state.read().table.routes(verb).len()
    }

    /// Snapshot of the routes matching a verb and path.
    pub fn matching(&self, verb: Verb, path: &str) -> Vec<RouteMatch<H>> {
        self.state.read().table.matching(verb, path)
    }

    /// Run every handler of every matching route, one at a time.
    ///
    /// Replies are ignored. The first handler error stops dispatch and is
    /// returned alongside the outcome; what to do with it is the caller's
    /// policy.
    pub async fn dispatch<F, Fut, E>(
        &self,
        message: &Arc<InboundMessage>,
        mut invoke: F,
    ) -> (DispatchOutcome, Result<(), E>)
    where
        F: FnMut(Arc<H>, Request) -> Fut,
        Fut: Future<Output = Result<(), E>>,
    {
        if message.is_reply() {
            tracing::debug!(
                verb = %message.verb,
                path = %message.path,
                "reply frame ignored by dispatch"
            );
            return (DispatchOutcome::ignored(), Ok(()));
        }

        let matches = self.matching(message.verb, &message.path);
        let mut outcome = DispatchOutcome {
            status: DispatchStatus::Completed,
            routes_matched: matches.len(),
            handlers_run: 0,
        };

        for RouteMatch { route, params } in matches {
            let request = Request::new(Arc::clone(message), params);
            for handler in route.handlers() {
                outcome.handlers_run += 1;
                if let Err(err) = invoke(Arc::clone(handler), request.clone()).await {
                    outcome.status = DispatchStatus::Aborted;
                    return (outcome, Err(err));
                }
            }
        }

        (outcome, Ok(()))
    }
}

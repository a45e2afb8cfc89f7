//! Per-verb route storage.

use super::matcher::PathMatcher;
use std::sync::Arc;
use switchboard_core::{Params, Verb};

/// Opaque handle to a registered route, unique within its table.
///
/// Chains record handles instead of handler identities, so two routes
/// registered with identical handlers stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteHandle(u64);

impl RouteHandle {
    /// Address the handler registered at `index` on this route.
    pub const fn handler(self, index: usize) -> HandlerId {
        HandlerId { route: self, index }
    }
}

/// Address of a single handler: its route plus its registration position.
///
/// Positions are stable: removing one handler does not renumber the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    route: RouteHandle,
    index: usize,
}

impl HandlerId {
    /// The route this handler belongs to.
    pub const fn route(&self) -> RouteHandle {
        self.route
    }

    /// Registration position within the route.
    pub const fn index(&self) -> usize {
        self.index
    }
}

/// A registered pattern with its ordered handler chain.
///
/// Templates are immutable; removing a handler swaps in a filtered copy, so a
/// dispatch already holding the old template finishes with the old chain.
pub struct RouteTemplate<H: ?Sized> {
    handle: RouteHandle,
    matcher: Arc<PathMatcher>,
    handlers: Vec<(usize, Arc<H>)>,
}

impl<H: ?Sized> RouteTemplate<H> {
    /// This route's handle.
    pub fn handle(&self) -> RouteHandle {
        self.handle
    }

    /// The pattern as registered.
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    /// Match a path against this route.
    pub fn matches(&self, path: &str) -> Option<Params> {
        self.matcher.matches(path)
    }

    /// Handlers in registration order.
    pub fn handlers(&self) -> impl Iterator<Item = &Arc<H>> {
        self.handlers.iter().map(|(_, handler)| handler)
    }

    /// Number of remaining handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    fn without_handler(&self, index: usize) -> Self {
        Self {
            handle: self.handle,
            matcher: Arc::clone(&self.matcher),
            handlers: self
                .handlers
                .iter()
                .filter(|(i, _)| *i != index)
                .map(|(i, h)| (*i, Arc::clone(h)))
                .collect(),
        }
    }
}

/// A route that accepted a path, with the parameters it captured.
pub struct RouteMatch<H: ?Sized> {
    /// The matching route.
    pub route: Arc<RouteTemplate<H>>,
    /// Captured, decoded parameters.
    pub params: Params,
}

/// Verb → ordered routes.
///
/// Insertion order is dispatch order. Every matching route fires; order is not
/// a priority.
pub struct RouteTable<H: ?Sized> {
    routes: [Vec<Arc<RouteTemplate<H>>>; 6],
    next_id: u64,
}

impl<H: ?Sized> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ?Sized> RouteTable<H> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            routes: std::array::from_fn(|_| Vec::new()),
            next_id: 0,
        }
    }

    /// Append a route for `verb`.
    pub fn insert(
        &mut self,
        verb: Verb,
        matcher: PathMatcher,
        handlers: Vec<Arc<H>>,
    ) -> RouteHandle {
        let handle = RouteHandle(self.next_id);
        self.next_id += 1;
        self.routes[verb.index()].push(Arc::new(RouteTemplate {
            handle,
            matcher: Arc::new(matcher),
            handlers: handlers.into_iter().enumerate().collect(),
        }));
        handle
    }

    /// Remove a whole route. Returns whether it was present.
    pub fn remove_route(&mut self, verb: Verb, handle: RouteHandle) -> bool {
        let routes = &mut self.routes[verb.index()];
        let before = routes.len();
        routes.retain(|route| route.handle != handle);
        routes.len() != before
    }

    /// Remove one handler from its route. The route stays registered.
    pub fn remove_handler(&mut self, verb: Verb, id: HandlerId) -> bool {
        let routes = &mut self.routes[verb.index()];
        let Some(slot) = routes.iter_mut().find(|route| route.handle == id.route) else {
            return false;
        };
        if !slot.handlers.iter().any(|(i, _)| *i == id.index) {
            return false;
        }
        *slot = Arc::new(slot.without_handler(id.index));
        true
    }

    /// Routes registered for `verb`, in dispatch order.
    pub fn routes(&self, verb: Verb) -> &[Arc<RouteTemplate<H>>] {
        &self.routes[verb.index()]
    }

    /// Every route for `verb` that accepts `path`, in dispatch order.
    pub fn matching(&self, verb: Verb, path: &str) -> Vec<RouteMatch<H>> {
        self.routes[verb.index()]
            .iter()
            .filter_map(|route| {
                route.matches(path).map(|params| RouteMatch {
                    route: Arc::clone(route),
                    params,
                })
            })
            .collect()
    }

    /// Total number of routes across all verbs.
    pub fn len(&self) -> usize {
        self.routes.iter().map(Vec::len).sum()
    }

    /// Whether no route is registered for any verb.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

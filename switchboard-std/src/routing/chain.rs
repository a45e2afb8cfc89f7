//! Named, revocable batches of route registrations.

use super::table::RouteHandle;
use std::collections::HashMap;
use switchboard_core::Verb;

/// One registration recorded into a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEntry {
    /// Verb the route was registered under.
    pub verb: Verb,
    /// The route.
    pub route: RouteHandle,
}

/// Records which routes were registered while a chain was active.
///
/// At most one chain records at a time. Routes registered with no active
/// chain are untracked and can only be removed by handle.
#[derive(Debug, Default)]
pub struct ChainRegistry {
    active: Option<String>,
    chains: HashMap<String, Vec<ChainEntry>>,
}

impl ChainRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` the active chain, discarding any previous record under it.
    pub fn start(&mut self, name: &str) {
        self.chains.insert(name.to_owned(), Vec::new());
        self.active = Some(name.to_owned());
    }

    /// Stop recording.
    pub fn end(&mut self) {
        self.active = None;
    }

    /// The chain currently recording, if any.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Record a registration into the active chain. No-op when none is active.
    pub fn record(&mut self, verb: Verb, route: RouteHandle) {
        if let Some(name) = &self.active {
            self.chains
                .entry(name.clone())
                .or_default()
                .push(ChainEntry { verb, route });
        }
    }

    /// Remove and return a chain's record.
    ///
    /// Taking the active chain also stops recording.
    pub fn take(&mut self, name: &str) -> Vec<ChainEntry> {
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        self.chains.remove(name).unwrap_or_default()
    }

    /// Entries recorded under `name`.
    pub fn entries(&self, name: &str) -> &[ChainEntry] {
        self.chains.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Names of every chain with a record, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.chains.keys().cloned().collect();
        names.sort();
        names
    }
}

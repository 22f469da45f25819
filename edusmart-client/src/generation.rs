use std::collections::HashMap;

use crate::api::{CourseId, ModuleId};

/// Identity of one comment list as the UI sees it: a course's Q&A thread, a
/// single module's discussion, or the aggregated view over every module of a
/// course.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ListKey {
    Course(CourseId),
    Module(ModuleId),
    AllModules(CourseId),
}

/// Proof that a fetch was the newest one for its list at the time it was
/// issued. Captured before the request goes out, checked when the response
/// lands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Ticket {
    key: ListKey,
    generation: u64,
}

/// Per-list monotonic fetch counters.
///
/// One counter per list identity, so switching between lists never makes a
/// fresh list's first fetch look stale. Counters only ever grow.
#[derive(Clone, Debug, Default)]
pub struct FetchGenerations(HashMap<ListKey, u64>);

impl FetchGenerations {
    pub fn new() -> FetchGenerations {
        FetchGenerations(HashMap::new())
    }

    /// Mark a new fetch as the current one for `key` and hand back its ticket.
    pub fn begin(&mut self, key: ListKey) -> Ticket {
        let generation = self.0.entry(key).or_insert(0);
        *generation += 1;
        Ticket {
            key,
            generation: *generation,
        }
    }

    /// A ticket stays current until another fetch begins for the same list.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.0
            .get(&ticket.key)
            .map_or(false, |g| *g == ticket.generation)
    }
}

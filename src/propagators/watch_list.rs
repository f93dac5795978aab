use std::collections::HashMap;

use crate::basic_types::{BoundEvent, ConstraintReference, Variable, BOUND_EVENT_COUNT};
use crate::constraints::ConstraintArena;
use crate::gourd_asserts::*;

/// A list of constraints watching one (variable, event) pair. Each entry
/// carries the polarity flag of the watched literal in the reference's flag
/// bit. Removal is deferred: detaching a constraint only marks the list, and
/// deleted entries are swept out the next time the list is read.
#[derive(Default)]
pub struct WatchList {
    needs_cleanup: bool,
    watchers: Vec<ConstraintReference>,
}

impl WatchList {
    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    pub fn needs_cleanup(&self) -> bool {
        self.needs_cleanup
    }

    pub fn mark_needs_cleanup(&mut self) {
        self.needs_cleanup = true;
    }

    /// Adds a watcher for a positive occurrence of the variable.
    pub fn push_positive(&mut self, reference: ConstraintReference) {
        self.watchers.push(reference.clear_flag());
    }

    /// Adds a watcher for a negated occurrence of the variable.
    pub fn push_negative(&mut self, reference: ConstraintReference) {
        self.watchers.push(reference.set_flag());
    }

    pub fn watchers(&self) -> &[ConstraintReference] {
        &self.watchers
    }

    fn clean(&mut self, arena: &ConstraintArena) {
        gourd_assert_simple!(self.needs_cleanup);
        self.watchers.retain(|reference| {
            if arena.is_deleted(*reference) {
                gourd_assert_moderate!(!arena.in_use(*reference));
                false
            } else {
                true
            }
        });
        self.needs_cleanup = false;
    }
}

/// Per (variable, event-kind) watch lists of one propagator.
#[derive(Default)]
pub struct WatchListManager {
    lists: Vec<WatchList>,
}

fn list_index(variable: Variable, event: BoundEvent) -> usize {
    variable.index() * BOUND_EVENT_COUNT + event as usize
}

impl WatchListManager {
    pub fn new() -> WatchListManager {
        WatchListManager { lists: vec![] }
    }

    pub fn add_variable(&mut self, variable: Variable) {
        let needed_size = (variable.index() + 1) * BOUND_EVENT_COUNT;
        if needed_size > self.lists.len() {
            self.lists.resize_with(needed_size, WatchList::default);
        }
    }

    /// The watch list for the given pair, swept of deleted entries if it was
    /// marked for cleanup.
    pub fn get_watch_list(
        &mut self,
        variable: Variable,
        event: BoundEvent,
        arena: &ConstraintArena,
    ) -> &mut WatchList {
        let list = &mut self.lists[list_index(variable, event)];
        if list.needs_cleanup() {
            list.clean(arena);
        }
        list
    }

    pub fn mark_needs_cleanup(&mut self, variable: Variable, event: BoundEvent) {
        self.lists[list_index(variable, event)].mark_needs_cleanup();
    }

    /// Takes the watchers out for iteration; the propagator puts the
    /// survivors back with [`WatchListManager::restore_watchers`].
    pub fn take_watchers(
        &mut self,
        variable: Variable,
        event: BoundEvent,
        arena: &ConstraintArena,
    ) -> Vec<ConstraintReference> {
        let list = self.get_watch_list(variable, event, arena);
        std::mem::take(&mut list.watchers)
    }

    pub fn restore_watchers(
        &mut self,
        variable: Variable,
        event: BoundEvent,
        watchers: Vec<ConstraintReference>,
    ) {
        let list = &mut self.lists[list_index(variable, event)];
        gourd_assert_moderate!(list.watchers.is_empty());
        list.watchers = watchers;
    }

    pub fn clean_all(&mut self, arena: &ConstraintArena) {
        for list in self.lists.iter_mut() {
            if list.needs_cleanup() {
                list.clean(arena);
            }
        }
    }

    /// No unswept list may hold a deleted constraint; lists already marked
    /// for cleanup are allowed to, until they are next read.
    pub(crate) fn debug_no_deleted_watchers(&self, arena: &ConstraintArena) -> bool {
        self.lists.iter().all(|list| {
            list.needs_cleanup()
                || list
                    .watchers()
                    .iter()
                    .all(|watcher| !arena.is_deleted(*watcher))
        })
    }

    /// Rewrites every watcher through the relocation map, preserving the
    /// polarity flag.
    pub fn gc_update(
        &mut self,
        relocation_map: &HashMap<ConstraintReference, ConstraintReference>,
    ) {
        for list in self.lists.iter_mut() {
            gourd_assert_simple!(!list.needs_cleanup());
            for watcher in list.watchers.iter_mut() {
                let relocated = relocation_map[&watcher.clear_flag()];
                *watcher = if watcher.flagged() {
                    relocated.set_flag()
                } else {
                    relocated
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WatchListManager;
    use crate::basic_types::{BoolLiteral, BoundEvent, VariableType};
    use crate::constraints::ConstraintArena;

    #[test]
    fn test_deferred_cleanup_sweeps_deleted_entries() {
        let mut arena = ConstraintArena::new();
        let x = arena.new_variable(VariableType::Integer);
        let y = arena.new_variable(VariableType::Integer);
        let literals = [BoolLiteral::new(x, false), BoolLiteral::new(y, false)];
        let kept = arena.allocate_clause(&literals, 1, false).unwrap();
        let deleted = arena.allocate_clause(&literals, 1, false).unwrap();

        let mut manager = WatchListManager::new();
        manager.add_variable(x);
        manager.add_variable(y);
        manager
            .get_watch_list(x, BoundEvent::UpperRefine, &arena)
            .push_positive(kept);
        manager
            .get_watch_list(x, BoundEvent::UpperRefine, &arena)
            .push_negative(deleted);

        arena.erase(deleted);
        //the deleted entry survives until the list is marked and read again
        assert!(manager.get_watch_list(x, BoundEvent::UpperRefine, &arena).len() == 2);

        manager.mark_needs_cleanup(x, BoundEvent::UpperRefine);
        let list = manager.get_watch_list(x, BoundEvent::UpperRefine, &arena);
        assert!(list.len() == 1);
        assert!(list.watchers()[0] == kept);
    }
}

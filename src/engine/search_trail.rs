use crate::basic_types::{BoundEvent, Variable};
use crate::gourd_asserts::*;

/// One bound-refinement event. The `first_bound` flag records whether this
/// event introduced the very first bound of its side for the variable, so
/// that backtracking can tell the decision heuristic when a side disappears.
#[derive(Clone, Copy, Debug)]
pub struct TrailEntry {
    pub kind: BoundEvent,
    pub first_bound: bool,
    pub variable: Variable,
}

/// An append-only log of bound refinements plus a side-stack of the trail
/// indices at which decisions were made.
#[derive(Default)]
pub struct SearchTrail {
    trail: Vec<TrailEntry>,
    decisions: Vec<usize>, //[i] is the trail index at which the i-th decision began
}

impl SearchTrail {
    pub fn new() -> SearchTrail {
        SearchTrail {
            trail: vec![],
            decisions: vec![],
        }
    }

    pub fn push(&mut self, kind: BoundEvent, variable: Variable, first_bound: bool) {
        gourd_assert_moderate!(kind != BoundEvent::Any);
        log::trace!(target: "trail", "{}[{}]", variable, kind);
        self.trail.push(TrailEntry {
            kind,
            first_bound,
            variable,
        });
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trail.is_empty()
    }

    pub fn last(&self) -> Option<&TrailEntry> {
        self.trail.last()
    }

    /// Removes the last event, together with the decision boundary that ends
    /// at the new trail length (if any).
    pub fn pop(&mut self) -> Option<TrailEntry> {
        let entry = self.trail.pop()?;
        if self.decisions.last() == Some(&self.trail.len()) {
            self.decisions.pop();
        }
        Some(entry)
    }

    pub fn new_decision_level(&mut self) {
        self.decisions.push(self.trail.len());
    }

    pub fn decision_level(&self) -> usize {
        self.decisions.len()
    }

    /// The decision level at which the event at `trail_index` was recorded.
    /// O(log n) by binary search over the decision boundaries.
    pub fn level_of_trail_index(&self, trail_index: usize) -> usize {
        let mut low = 0;
        let mut high = self.decisions.len();
        while low < high {
            let middle = (low + high) >> 1;
            if self.decisions[middle] <= trail_index {
                low = middle + 1;
            } else {
                high = middle;
            }
        }
        low
    }

    /// The last trail index belonging to the given level, or -1 when the
    /// level is empty of events.
    pub fn trail_index_of_level(&self, level: usize) -> i64 {
        gourd_assert_simple!(level <= self.decisions.len());
        if level == self.decisions.len() {
            self.trail.len() as i64 - 1
        } else {
            self.decisions[level] as i64 - 1
        }
    }
}

impl std::ops::Index<usize> for SearchTrail {
    type Output = TrailEntry;
    fn index(&self, index: usize) -> &TrailEntry {
        &self.trail[index]
    }
}

#[cfg(test)]
mod tests {
    use super::SearchTrail;
    use crate::basic_types::{BoundEvent, Variable, VariableType};

    fn var(id: u32) -> Variable {
        Variable::new(VariableType::Integer, id)
    }

    #[test]
    fn test_levels_and_boundaries() {
        let mut trail = SearchTrail::new();
        trail.push(BoundEvent::LowerRefine, var(0), true);
        trail.push(BoundEvent::UpperRefine, var(0), true);
        trail.new_decision_level();
        trail.push(BoundEvent::UpperRefine, var(1), true);
        trail.new_decision_level();
        trail.push(BoundEvent::LowerRefine, var(2), true);
        trail.push(BoundEvent::LowerRefine, var(1), false);

        assert!(trail.decision_level() == 2);
        assert!(trail.level_of_trail_index(0) == 0);
        assert!(trail.level_of_trail_index(1) == 0);
        assert!(trail.level_of_trail_index(2) == 1);
        assert!(trail.level_of_trail_index(3) == 2);
        assert!(trail.level_of_trail_index(4) == 2);

        assert!(trail.trail_index_of_level(0) == 1);
        assert!(trail.trail_index_of_level(1) == 2);
        assert!(trail.trail_index_of_level(2) == 4);
    }

    #[test]
    fn test_pop_removes_decision_boundaries() {
        let mut trail = SearchTrail::new();
        trail.push(BoundEvent::LowerRefine, var(0), true);
        trail.new_decision_level();
        trail.push(BoundEvent::UpperRefine, var(1), true);

        assert!(trail.pop().is_some());
        assert!(trail.decision_level() == 0);
        assert!(trail.len() == 1);
        assert!(trail.pop().is_some());
        assert!(trail.pop().is_none());
    }
}

use std::collections::HashMap;

use crate::basic_types::ConstraintReference;
use crate::gourd_asserts::*;

/// Status of the variable value.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ValueStatus {
    /// Value of the variable is still unassigned.
    #[default]
    Unassigned,
    /// Both bounds were refined to the same value.
    AssignedEqual,
    /// The variable was decided at its lower bound (the upper bound was
    /// refined down to the existing lower bound).
    AssignedFromBelow,
    /// The variable was decided at its upper bound (the lower bound was
    /// refined up to the existing upper bound).
    AssignedFromAbove,
}

/// Information about one bound refinement of a variable.
#[derive(Clone, Copy, Debug)]
pub struct BoundRecord {
    /// The index of the bound value in the bound table.
    pub bound_index: u32,
    /// The constraint that propagated the bound, or None for a global bound
    /// or a decision.
    pub reason: Option<ConstraintReference>,
    /// The trail index at which this bound was introduced.
    pub trail_index: u32,
}

/// The bound history of a single variable: two push-only stacks of bound
/// records whose trail indices are non-decreasing, so that any historical
/// query resolves with a binary search.
#[derive(Default)]
pub struct VariableInfo {
    value_status: ValueStatus,
    value_status_trail_index: Option<u32>,
    lower: Vec<BoundRecord>,
    upper: Vec<BoundRecord>,
}

//locates the last record whose trail index is at most the queried index
fn find(records: &[BoundRecord], trail_index: i64) -> Option<&BoundRecord> {
    let mut low = 0usize;
    let mut high = records.len();
    while low < high {
        let middle = (low + high) >> 1;
        if (records[middle].trail_index as i64) <= trail_index {
            low = middle + 1;
        } else {
            high = middle;
        }
    }
    low.checked_sub(1).map(|i| &records[i])
}

impl VariableInfo {
    pub fn new() -> VariableInfo {
        VariableInfo::default()
    }

    pub fn set_value_status(&mut self, status: ValueStatus, trail_index: usize) {
        if status == ValueStatus::Unassigned {
            self.value_status = status;
            self.value_status_trail_index = None;
        } else {
            self.value_status = status;
            self.value_status_trail_index = Some(trail_index as u32);
        }
    }

    pub fn value_status(&self) -> ValueStatus {
        self.value_status
    }

    pub fn value_status_at(&self, trail_index: i64) -> ValueStatus {
        match self.value_status_trail_index {
            Some(status_index) if (status_index as i64) <= trail_index => self.value_status,
            _ => ValueStatus::Unassigned,
        }
    }

    /// The trail index responsible for the current assignment, or -1.
    pub fn assignment_index(&self) -> i64 {
        self.value_status_trail_index
            .map_or(-1, |index| index as i64)
    }

    pub fn has_lower_bound(&self) -> bool {
        !self.lower.is_empty()
    }

    pub fn has_lower_bound_at(&self, trail_index: i64) -> bool {
        !self.lower.is_empty() && (self.lower[0].trail_index as i64) <= trail_index
    }

    pub fn lower_bound_record(&self) -> &BoundRecord {
        gourd_assert_simple!(self.has_lower_bound());
        self.lower.last().unwrap()
    }

    pub fn lower_bound_record_at(&self, trail_index: i64) -> &BoundRecord {
        gourd_assert_simple!(self.has_lower_bound_at(trail_index));
        find(&self.lower, trail_index).unwrap()
    }

    pub fn lower_bound_trail_index(&self) -> i64 {
        self.lower
            .last()
            .map_or(-1, |record| record.trail_index as i64)
    }

    pub fn lower_bound_trail_index_at(&self, trail_index: i64) -> i64 {
        find(&self.lower, trail_index).map_or(-1, |record| record.trail_index as i64)
    }

    pub fn push_lower_bound(&mut self, record: BoundRecord) {
        gourd_assert_simple!(
            self.lower.is_empty() || self.lower.last().unwrap().trail_index <= record.trail_index
        );
        self.lower.push(record);
    }

    pub fn pop_lower_bound(&mut self) {
        gourd_assert_simple!(self.has_lower_bound());
        let _ = self.lower.pop();
    }

    pub fn has_upper_bound(&self) -> bool {
        !self.upper.is_empty()
    }

    pub fn has_upper_bound_at(&self, trail_index: i64) -> bool {
        !self.upper.is_empty() && (self.upper[0].trail_index as i64) <= trail_index
    }

    pub fn upper_bound_record(&self) -> &BoundRecord {
        gourd_assert_simple!(self.has_upper_bound());
        self.upper.last().unwrap()
    }

    pub fn upper_bound_record_at(&self, trail_index: i64) -> &BoundRecord {
        gourd_assert_simple!(self.has_upper_bound_at(trail_index));
        find(&self.upper, trail_index).unwrap()
    }

    pub fn upper_bound_trail_index(&self) -> i64 {
        self.upper
            .last()
            .map_or(-1, |record| record.trail_index as i64)
    }

    pub fn upper_bound_trail_index_at(&self, trail_index: i64) -> i64 {
        find(&self.upper, trail_index).map_or(-1, |record| record.trail_index as i64)
    }

    pub fn push_upper_bound(&mut self, record: BoundRecord) {
        gourd_assert_simple!(
            self.upper.is_empty() || self.upper.last().unwrap().trail_index <= record.trail_index
        );
        self.upper.push(record);
    }

    pub fn pop_upper_bound(&mut self) {
        gourd_assert_simple!(self.has_upper_bound());
        let _ = self.upper.pop();
    }

    /// The most recent trail index at which either bound changed. With
    /// `include_assignment == false`, the refinement that completed an
    /// assignment (the decision itself) is skipped.
    pub fn last_modification_trail_index(&self, include_assignment: bool) -> i64 {
        let top_index = std::cmp::max(
            self.lower_bound_trail_index(),
            self.upper_bound_trail_index(),
        );
        self.last_modification_trail_index_at(include_assignment, top_index)
    }

    pub fn last_modification_trail_index_at(
        &self,
        include_assignment: bool,
        mut trail_index: i64,
    ) -> i64 {
        if !include_assignment {
            match self.value_status_at(trail_index) {
                ValueStatus::AssignedFromBelow => {
                    trail_index = self.upper_bound_trail_index_at(trail_index) - 1;
                }
                ValueStatus::AssignedFromAbove => {
                    trail_index = self.lower_bound_trail_index_at(trail_index) - 1;
                }
                _ => {}
            }
        }
        std::cmp::max(
            self.lower_bound_trail_index_at(trail_index),
            self.upper_bound_trail_index_at(trail_index),
        )
    }

    /// The number of live bound records that cite a reason constraint.
    pub(crate) fn count_reasoned_records(&self) -> usize {
        self.lower
            .iter()
            .chain(self.upper.iter())
            .filter(|record| record.reason.is_some())
            .count()
    }

    pub fn gc_update(
        &mut self,
        relocation_map: &HashMap<ConstraintReference, ConstraintReference>,
    ) {
        for record in self.lower.iter_mut().chain(self.upper.iter_mut()) {
            if let Some(reason) = record.reason {
                let relocated = relocation_map[&reason.clear_flag()];
                record.reason = Some(if reason.flagged() {
                    relocated.set_flag()
                } else {
                    relocated
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundRecord, ValueStatus, VariableInfo};

    fn record(bound_index: u32, trail_index: u32) -> BoundRecord {
        BoundRecord {
            bound_index,
            reason: None,
            trail_index,
        }
    }

    #[test]
    fn test_historical_lookup() {
        let mut info = VariableInfo::new();
        info.push_lower_bound(record(0, 2));
        info.push_lower_bound(record(5, 6));
        info.push_lower_bound(record(9, 11));

        assert!(!info.has_lower_bound_at(1));
        assert!(info.has_lower_bound_at(2));
        assert!(info.lower_bound_record_at(2).bound_index == 0);
        assert!(info.lower_bound_record_at(6).bound_index == 5);
        assert!(info.lower_bound_record_at(10).bound_index == 5);
        assert!(info.lower_bound_record_at(100).bound_index == 9);
        assert!(info.lower_bound_trail_index() == 11);
        assert!(info.lower_bound_trail_index_at(7) == 6);
    }

    #[test]
    fn test_value_status_history() {
        let mut info = VariableInfo::new();
        assert!(info.value_status() == ValueStatus::Unassigned);

        info.set_value_status(ValueStatus::AssignedEqual, 4);
        assert!(info.value_status_at(3) == ValueStatus::Unassigned);
        assert!(info.value_status_at(4) == ValueStatus::AssignedEqual);
        assert!(info.assignment_index() == 4);

        info.set_value_status(ValueStatus::Unassigned, 0);
        assert!(info.assignment_index() == -1);
        assert!(info.value_status_at(10) == ValueStatus::Unassigned);
    }

    #[test]
    fn test_last_modification_skips_the_decision() {
        let mut info = VariableInfo::new();
        //lower bound propagated at 3, then decided from below at 7 (upper refined)
        info.push_lower_bound(record(0, 3));
        info.push_upper_bound(record(1, 7));
        info.set_value_status(ValueStatus::AssignedFromBelow, 7);

        assert!(info.last_modification_trail_index(true) == 7);
        assert!(info.last_modification_trail_index(false) == 3);
    }
}

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use log::trace;
use num_bigint::BigInt;

use crate::basic_types::{
    BoolLiteral, BoundEvent, ConstraintReference, KeyValueHeap, SelectionScore, Variable,
};
use crate::constraints::ConstraintArena;
use crate::engine::search_trail::SearchTrail;
use crate::engine::variable_info::{BoundRecord, ValueStatus, VariableInfo};
use crate::gourd_asserts::*;

const MAX_VARIABLE_ACTIVITY: f64 = 1e100;

/// A global bound that was popped during backtracking and has to be
/// re-established afterwards.
pub struct ReassertEntry {
    pub variable: Variable,
    pub kind: BoundEvent,
    pub value: BigInt,
}

/// The state of the search: per-variable bound stacks with the bound-value
/// table, the trail, the conflict flag, and the heuristic bookkeeping used to
/// pick decision variables and values.
pub struct SolverState {
    in_conflict: bool,
    conflict_variable: Option<Variable>,
    variable_info: Vec<VariableInfo>,
    bounds: Vec<BigInt>, //the bound-value table; exactly one entry per trail event, popped in lockstep on backtracks
    variable_names: Vec<String>,
    phase: Vec<bool>, //true = assign to the lower bound
    heap: KeyValueHeap,
    linear_queue: BinaryHeap<Reverse<u32>>,
    variable_in_queue: Vec<bool>,
    dynamic_order: bool,
    activity_increment: f64,
    activity_decay: f64,
    trail: SearchTrail,
    reassert_list: Vec<ReassertEntry>,
}

impl SolverState {
    pub fn new() -> SolverState {
        SolverState {
            in_conflict: false,
            conflict_variable: None,
            variable_info: vec![],
            bounds: vec![],
            variable_names: vec![],
            phase: vec![],
            heap: KeyValueHeap::new(),
            linear_queue: BinaryHeap::new(),
            variable_in_queue: vec![],
            dynamic_order: true,
            activity_increment: 1.0,
            activity_decay: 1.001,
            trail: SearchTrail::new(),
            reassert_list: vec![],
        }
    }

    pub fn set_dynamic_order(&mut self, dynamic_order: bool) {
        self.dynamic_order = dynamic_order;
    }

    pub fn variables_count(&self) -> u32 {
        self.variable_info.len() as u32
    }

    pub fn variable_name(&self, variable: Variable) -> &str {
        &self.variable_names[variable]
    }

    /// Registers a variable with the state. Variables that are not added to
    /// the decision queue are never branched on (they are used when declared
    /// variables are rewritten into slack pairs).
    pub fn new_variable(&mut self, variable: Variable, name: &str, add_to_queue: bool) {
        gourd_assert_eq_simple!(variable.index(), self.variable_info.len());
        self.variable_info.push(VariableInfo::new());
        self.variable_names.push(name.to_string());
        self.phase.push(true);
        self.heap.grow(SelectionScore {
            has_lower_bound: false,
            has_upper_bound: false,
            activity: 1.0,
        });
        self.variable_in_queue.push(add_to_queue);
        if add_to_queue {
            self.linear_queue.push(Reverse(variable.id()));
        } else {
            self.heap.delete_key(variable.id());
        }
    }

    pub fn trail(&self) -> &SearchTrail {
        &self.trail
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn decision_level(&self) -> usize {
        self.trail.decision_level()
    }

    /// The last trail index at level 0.
    pub fn safe_index(&self) -> i64 {
        self.trail.trail_index_of_level(0)
    }

    /// We are safe if we made no decisions.
    pub fn is_safe(&self) -> bool {
        self.trail.decision_level() == 0
    }

    pub fn in_conflict(&self) -> bool {
        self.in_conflict
    }

    /// The last variable whose bounds crossed, i.e. lb(x) > ub(x).
    pub fn conflict_variable(&self) -> Variable {
        gourd_assert_simple!(self.conflict_variable.is_some());
        self.conflict_variable.unwrap()
    }
}

//methods for inspecting bounds and values
impl SolverState {
    pub fn has_lower_bound(&self, variable: Variable) -> bool {
        self.variable_info[variable].has_lower_bound()
    }

    pub fn has_lower_bound_at(&self, variable: Variable, trail_index: i64) -> bool {
        self.variable_info[variable].has_lower_bound_at(trail_index)
    }

    pub fn has_upper_bound(&self, variable: Variable) -> bool {
        self.variable_info[variable].has_upper_bound()
    }

    pub fn has_upper_bound_at(&self, variable: Variable, trail_index: i64) -> bool {
        self.variable_info[variable].has_upper_bound_at(trail_index)
    }

    pub fn lower_bound(&self, variable: Variable) -> &BigInt {
        &self.bounds[self.variable_info[variable].lower_bound_record().bound_index as usize]
    }

    pub fn lower_bound_at(&self, variable: Variable, trail_index: i64) -> &BigInt {
        let record = self.variable_info[variable].lower_bound_record_at(trail_index);
        &self.bounds[record.bound_index as usize]
    }

    pub fn upper_bound(&self, variable: Variable) -> &BigInt {
        &self.bounds[self.variable_info[variable].upper_bound_record().bound_index as usize]
    }

    pub fn upper_bound_at(&self, variable: Variable, trail_index: i64) -> &BigInt {
        let record = self.variable_info[variable].upper_bound_record_at(trail_index);
        &self.bounds[record.bound_index as usize]
    }

    pub fn lower_bound_reason(&self, variable: Variable) -> Option<ConstraintReference> {
        self.variable_info[variable].lower_bound_record().reason
    }

    pub fn lower_bound_reason_at(
        &self,
        variable: Variable,
        trail_index: i64,
    ) -> Option<ConstraintReference> {
        self.variable_info[variable]
            .lower_bound_record_at(trail_index)
            .reason
    }

    pub fn upper_bound_reason(&self, variable: Variable) -> Option<ConstraintReference> {
        self.variable_info[variable].upper_bound_record().reason
    }

    pub fn upper_bound_reason_at(
        &self,
        variable: Variable,
        trail_index: i64,
    ) -> Option<ConstraintReference> {
        self.variable_info[variable]
            .upper_bound_record_at(trail_index)
            .reason
    }

    pub fn lower_bound_trail_index(&self, variable: Variable) -> i64 {
        self.variable_info[variable].lower_bound_trail_index()
    }

    pub fn lower_bound_trail_index_at(&self, variable: Variable, trail_index: i64) -> i64 {
        self.variable_info[variable].lower_bound_trail_index_at(trail_index)
    }

    pub fn upper_bound_trail_index(&self, variable: Variable) -> i64 {
        self.variable_info[variable].upper_bound_trail_index()
    }

    pub fn upper_bound_trail_index_at(&self, variable: Variable, trail_index: i64) -> i64 {
        self.variable_info[variable].upper_bound_trail_index_at(trail_index)
    }

    pub fn last_modification_trail_index(
        &self,
        variable: Variable,
        include_assignment: bool,
    ) -> i64 {
        self.variable_info[variable].last_modification_trail_index(include_assignment)
    }

    pub fn value_status(&self, variable: Variable) -> ValueStatus {
        self.variable_info[variable].value_status()
    }

    pub fn value_status_at(&self, variable: Variable, trail_index: i64) -> ValueStatus {
        self.variable_info[variable].value_status_at(trail_index)
    }

    pub fn is_assigned(&self, variable: Variable) -> bool {
        self.value_status(variable) != ValueStatus::Unassigned
    }

    pub fn is_assigned_at(&self, variable: Variable, trail_index: i64) -> bool {
        self.value_status_at(variable, trail_index) != ValueStatus::Unassigned
    }

    pub fn value(&self, variable: Variable) -> &BigInt {
        gourd_assert_simple!(self.is_assigned(variable));
        if self.value_status(variable) == ValueStatus::AssignedFromBelow {
            self.lower_bound(variable)
        } else {
            self.upper_bound(variable)
        }
    }

    pub fn value_at(&self, variable: Variable, trail_index: i64) -> &BigInt {
        gourd_assert_simple!(self.is_assigned_at(variable, trail_index));
        if self.value_status_at(variable, trail_index) == ValueStatus::AssignedFromBelow {
            self.lower_bound_at(variable, trail_index)
        } else {
            self.upper_bound_at(variable, trail_index)
        }
    }

    pub fn bool_literal_value(&self, literal: BoolLiteral) -> u32 {
        literal.value(self.value(literal.variable()))
    }

    pub fn bool_literal_value_at(&self, literal: BoolLiteral, trail_index: i64) -> u32 {
        literal.value(self.value_at(literal.variable(), trail_index))
    }
}

//methods for changing bounds and values
impl SolverState {
    /// Appends a bound refinement to the trail: the reason's user count is
    /// increased, the bound-value table and the variable's bound stack grow by
    /// one record, equal bounds turn into an assignment, and crossing bounds
    /// raise the conflict flag. Events arriving while in conflict are dropped.
    pub fn enqueue_event(
        &mut self,
        kind: BoundEvent,
        variable: Variable,
        value: BigInt,
        reason: Option<ConstraintReference>,
        arena: &mut ConstraintArena,
    ) {
        trace!(target: "solver::state", "{}: {} to {}", kind, variable, value);

        //if we are already in conflict, just return
        if self.in_conflict {
            return;
        }

        let trail_index = self.trail.len();

        if let Some(reason) = reason {
            arena.add_user(reason);
        }

        let bound_index = self.bounds.len() as u32;

        match kind {
            BoundEvent::LowerRefine => {
                let first_bound = !self.variable_info[variable].has_lower_bound();
                gourd_assert_moderate!(
                    first_bound || value > *self.lower_bound(variable),
                    "A lower bound refinement must strictly improve the bound."
                );
                self.trail.push(kind, variable, first_bound);
                if first_bound {
                    self.change_heuristic_bound(variable, BoundEvent::LowerRefine, true);
                }
                self.bounds.push(value);
                self.variable_info[variable].push_lower_bound(BoundRecord {
                    bound_index,
                    reason,
                    trail_index: trail_index as u32,
                });
                //check for conflicts and assignment
                if self.variable_info[variable].has_upper_bound() {
                    let new_lower = &self.bounds[bound_index as usize];
                    let upper = self.upper_bound(variable);
                    if new_lower == upper
                        && self.variable_info[variable].value_status() == ValueStatus::Unassigned
                    {
                        //the bounds met, the variable is assigned at its upper bound
                        self.variable_info[variable]
                            .set_value_status(ValueStatus::AssignedEqual, trail_index);
                        self.phase[variable] = false;
                    } else if new_lower > upper {
                        self.in_conflict = true;
                        self.conflict_variable = Some(variable);
                    }
                }
            }
            BoundEvent::UpperRefine => {
                let first_bound = !self.variable_info[variable].has_upper_bound();
                gourd_assert_moderate!(
                    first_bound || value < *self.upper_bound(variable),
                    "An upper bound refinement must strictly improve the bound."
                );
                self.trail.push(kind, variable, first_bound);
                if first_bound {
                    self.change_heuristic_bound(variable, BoundEvent::UpperRefine, true);
                }
                self.bounds.push(value);
                self.variable_info[variable].push_upper_bound(BoundRecord {
                    bound_index,
                    reason,
                    trail_index: trail_index as u32,
                });
                //check for conflicts and assignment
                if self.variable_info[variable].has_lower_bound() {
                    let new_upper = &self.bounds[bound_index as usize];
                    let lower = self.lower_bound(variable);
                    if new_upper == lower
                        && self.variable_info[variable].value_status() == ValueStatus::Unassigned
                    {
                        //the bounds met, the variable is assigned at its lower bound
                        self.variable_info[variable]
                            .set_value_status(ValueStatus::AssignedEqual, trail_index);
                        self.phase[variable] = true;
                    } else if new_upper < lower {
                        self.in_conflict = true;
                        self.conflict_variable = Some(variable);
                    }
                }
            }
            BoundEvent::Any => panic!("Only bound refinements can be enqueued."),
        }
    }

    /// Pops every trail event above `trail_index` in reverse order, undoing
    /// the bound records and their side effects. Global (null-reason) bounds
    /// that are not decisions are scheduled for re-assertion.
    pub fn cancel_until(&mut self, trail_index: i64, arena: &mut ConstraintArena) {
        while self.trail.len() as i64 - 1 > trail_index {
            let entry = *self.trail.last().unwrap();
            self.backtrack_entry(&entry, arena);
            let _ = self.trail.pop();
            let _ = self.bounds.pop();
        }
        if self.in_conflict {
            let conflict_variable = self.conflict_variable();
            if !self.in_queue(conflict_variable) {
                self.enqueue_variable(conflict_variable);
            }
            self.in_conflict = false;
        }
    }

    fn backtrack_entry(
        &mut self,
        entry: &crate::engine::search_trail::TrailEntry,
        arena: &mut ConstraintArena,
    ) {
        let variable = entry.variable;

        match entry.kind {
            BoundEvent::LowerRefine => {
                let reason = self.variable_info[variable].lower_bound_record().reason;
                //release the user of the reason constraint
                if let Some(reason) = reason {
                    arena.remove_user(reason);
                }
                //if a bound on the variable is gone, inform the heuristic
                if entry.first_bound {
                    self.change_heuristic_bound(variable, BoundEvent::LowerRefine, false);
                }
                let status = self.variable_info[variable].value_status();
                if status != ValueStatus::Unassigned {
                    let just_assigned = self.variable_info[variable].assignment_index()
                        == self.variable_info[variable].lower_bound_trail_index();
                    //global bounds are re-asserted after the backtrack, unless this was the decision itself
                    if reason.is_none()
                        && !(status == ValueStatus::AssignedFromAbove && just_assigned)
                    {
                        self.add_to_reassert_list(variable, BoundEvent::LowerRefine);
                    }
                    if just_assigned {
                        if !self.in_queue(variable) {
                            self.enqueue_variable(variable);
                        }
                        self.variable_info[variable].set_value_status(ValueStatus::Unassigned, 0);
                    }
                } else if reason.is_none() {
                    //this is not a decision for sure, so re-assert the global bound
                    self.add_to_reassert_list(variable, BoundEvent::LowerRefine);
                }
                self.variable_info[variable].pop_lower_bound();
            }
            BoundEvent::UpperRefine => {
                let reason = self.variable_info[variable].upper_bound_record().reason;
                if let Some(reason) = reason {
                    arena.remove_user(reason);
                }
                if entry.first_bound {
                    self.change_heuristic_bound(variable, BoundEvent::UpperRefine, false);
                }
                let status = self.variable_info[variable].value_status();
                if status != ValueStatus::Unassigned {
                    let just_assigned = self.variable_info[variable].assignment_index()
                        == self.variable_info[variable].upper_bound_trail_index();
                    if reason.is_none()
                        && !(status == ValueStatus::AssignedFromBelow && just_assigned)
                    {
                        self.add_to_reassert_list(variable, BoundEvent::UpperRefine);
                    }
                    if just_assigned {
                        if !self.in_queue(variable) {
                            self.enqueue_variable(variable);
                        }
                        self.variable_info[variable].set_value_status(ValueStatus::Unassigned, 0);
                    }
                } else if reason.is_none() {
                    self.add_to_reassert_list(variable, BoundEvent::UpperRefine);
                }
                self.variable_info[variable].pop_upper_bound();
            }
            BoundEvent::Any => panic!("Only bound refinements appear on the trail."),
        }
    }

    fn add_to_reassert_list(&mut self, variable: Variable, kind: BoundEvent) {
        let value = match kind {
            BoundEvent::LowerRefine => self.lower_bound(variable).clone(),
            BoundEvent::UpperRefine => self.upper_bound(variable).clone(),
            BoundEvent::Any => unreachable!(),
        };
        self.reassert_list.push(ReassertEntry {
            variable,
            kind,
            value,
        });
    }

    /// Re-pushes the global bounds that were popped by backtracking; they
    /// carry no reason and must survive any backtrack.
    pub fn reassert_unit_bounds(&mut self, arena: &mut ConstraintArena) {
        let entries = std::mem::take(&mut self.reassert_list);
        for entry in entries {
            match entry.kind {
                BoundEvent::LowerRefine => {
                    if !self.has_lower_bound(entry.variable)
                        || *self.lower_bound(entry.variable) < entry.value
                    {
                        self.enqueue_event(
                            BoundEvent::LowerRefine,
                            entry.variable,
                            entry.value,
                            None,
                            arena,
                        );
                    }
                }
                BoundEvent::UpperRefine => {
                    if !self.has_upper_bound(entry.variable)
                        || *self.upper_bound(entry.variable) > entry.value
                    {
                        self.enqueue_event(
                            BoundEvent::UpperRefine,
                            entry.variable,
                            entry.value,
                            None,
                            arena,
                        );
                    }
                }
                BoundEvent::Any => unreachable!(),
            }
        }
    }

    pub fn gc_update(
        &mut self,
        relocation_map: &std::collections::HashMap<ConstraintReference, ConstraintReference>,
    ) {
        for info in self.variable_info.iter_mut() {
            info.gc_update(relocation_map);
        }
    }

    /// The total number of live bound records citing a reason constraint,
    /// which must equal the sum of all constraint user counts.
    pub(crate) fn debug_count_reasoned_records(&self) -> usize {
        self.variable_info
            .iter()
            .map(|info| info.count_reasoned_records())
            .sum()
    }
}

//methods for the decision and phase heuristics
impl SolverState {
    pub fn in_queue(&self, variable: Variable) -> bool {
        self.variable_in_queue[variable]
    }

    /// Pushes the variable back into the decision ordering.
    pub fn enqueue_variable(&mut self, variable: Variable) {
        gourd_assert_simple!(!self.in_queue(variable));
        if self.dynamic_order {
            self.heap.restore_key(variable.id());
        } else {
            self.linear_queue.push(Reverse(variable.id()));
        }
        self.variable_in_queue[variable] = true;
    }

    /// Returns the next unassigned variable in the variable order, or None
    /// when every variable is assigned. Assigned variables encountered on the
    /// way are discarded lazily.
    pub fn decide_variable(&mut self) -> Option<Variable> {
        if self.dynamic_order {
            while let Some(id) = self.heap.pop_max() {
                self.variable_in_queue[id as usize] = false;
                let variable = Variable::new(crate::basic_types::VariableType::Integer, id);
                if !self.is_assigned(variable) {
                    return Some(variable);
                }
            }
        } else {
            while let Some(Reverse(id)) = self.linear_queue.pop() {
                self.variable_in_queue[id as usize] = false;
                let variable = Variable::new(crate::basic_types::VariableType::Integer, id);
                if !self.is_assigned(variable) {
                    return Some(variable);
                }
            }
        }
        None
    }

    pub fn phase(&self, variable: Variable) -> bool {
        self.phase[variable]
    }

    pub fn set_phase(&mut self, variable: Variable, phase: bool) {
        self.phase[variable] = phase;
    }

    /// Decides a value for the variable by refining the opposite bound to the
    /// chosen side, which immediately records an assignment and re-enters
    /// propagation.
    pub fn decide_value(&mut self, variable: Variable, arena: &mut ConstraintArena) {
        gourd_assert_simple!(self.has_lower_bound(variable) || self.has_upper_bound(variable));
        gourd_assert_simple!(!self.is_assigned(variable));

        self.trail.new_decision_level();

        let has_lower = self.has_lower_bound(variable);
        let has_upper = self.has_upper_bound(variable);
        let choose_lower = if has_lower && !has_upper {
            true
        } else if !has_lower && has_upper {
            false
        } else {
            self.phase[variable]
        };

        if choose_lower {
            trace!(target: "solver::state", "assigning {} to lower bound", variable);
            let value = self.lower_bound(variable).clone();
            //in effect we are forcing a refinement of the upper bound
            self.variable_info[variable]
                .set_value_status(ValueStatus::AssignedFromBelow, self.trail.len());
            self.enqueue_event(BoundEvent::UpperRefine, variable, value, None, arena);
        } else {
            trace!(target: "solver::state", "assigning {} to upper bound", variable);
            let value = self.upper_bound(variable).clone();
            //in effect we are forcing a refinement of the lower bound
            self.variable_info[variable]
                .set_value_status(ValueStatus::AssignedFromAbove, self.trail.len());
            self.enqueue_event(BoundEvent::LowerRefine, variable, value, None, arena);
        }
    }

    fn change_heuristic_bound(&mut self, variable: Variable, kind: BoundEvent, present: bool) {
        if self.dynamic_order {
            match kind {
                BoundEvent::LowerRefine => self.heap.set_has_lower_bound(variable.id(), present),
                BoundEvent::UpperRefine => self.heap.set_has_upper_bound(variable.id(), present),
                BoundEvent::Any => unreachable!(),
            }
        }
    }

    pub fn bump_variable(&mut self, variable: Variable, times: f64) {
        if self.dynamic_order {
            self.heap
                .increment_activity(variable.id(), self.activity_increment * times);
            if self.heap.get_score(variable.id()).activity > MAX_VARIABLE_ACTIVITY {
                //this preserves the order, we're fine
                self.heap.divide_activities(MAX_VARIABLE_ACTIVITY);
                self.activity_increment *= 1.0 / MAX_VARIABLE_ACTIVITY;
            }
        }
    }

    pub fn decay_activities(&mut self) {
        //note that decaying activities is implemented as increasing the increment
        //  so that future bumps are more impactful
        self.activity_increment *= self.activity_decay;
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::SolverState;
    use crate::basic_types::{BoundEvent, Variable, VariableType};
    use crate::constraints::ConstraintArena;
    use crate::engine::variable_info::ValueStatus;

    fn new_variable(state: &mut SolverState, arena: &mut ConstraintArena) -> Variable {
        let variable = arena.new_variable(VariableType::Integer);
        state.new_variable(variable, &format!("x{}", variable.id()), true);
        variable
    }

    #[test]
    fn test_push_pop_lower_bounds() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let x = new_variable(&mut state, &mut arena);

        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(0), None, &mut arena);
        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(1), None, &mut arena);
        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(2), None, &mut arena);

        assert!(*state.lower_bound(x) == BigInt::from(2));
        assert!(*state.lower_bound_at(x, 0) == BigInt::from(0));
        assert!(*state.lower_bound_at(x, 1) == BigInt::from(1));
        assert!(*state.lower_bound_at(x, 2) == BigInt::from(2));

        state.cancel_until(1, &mut arena);
        assert!(*state.lower_bound(x) == BigInt::from(1));
        state.cancel_until(0, &mut arena);
        assert!(*state.lower_bound(x) == BigInt::from(0));
        state.cancel_until(-1, &mut arena);
        assert!(!state.has_lower_bound(x));
    }

    #[test]
    fn test_equal_bounds_assign_the_variable() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let x = new_variable(&mut state, &mut arena);

        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(3), None, &mut arena);
        assert!(!state.is_assigned(x));
        state.enqueue_event(BoundEvent::UpperRefine, x, BigInt::from(3), None, &mut arena);

        assert!(state.is_assigned(x));
        assert!(state.value_status(x) == ValueStatus::AssignedEqual);
        assert!(*state.value(x) == BigInt::from(3));
        assert!(!state.in_conflict());
    }

    #[test]
    fn test_crossing_bounds_raise_the_conflict_flag() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let x = new_variable(&mut state, &mut arena);

        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(5), None, &mut arena);
        state.enqueue_event(BoundEvent::UpperRefine, x, BigInt::from(4), None, &mut arena);

        assert!(state.in_conflict());
        assert!(state.conflict_variable() == x);

        //backtracking away the crossing bound clears the conflict
        state.cancel_until(0, &mut arena);
        assert!(!state.in_conflict());
        assert!(!state.has_upper_bound(x));
        assert!(state.has_lower_bound(x));
    }

    #[test]
    fn test_decide_value_assigns_via_the_opposite_bound() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let x = new_variable(&mut state, &mut arena);

        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(1), None, &mut arena);
        state.enqueue_event(BoundEvent::UpperRefine, x, BigInt::from(9), None, &mut arena);

        state.decide_value(x, &mut arena);

        assert!(state.decision_level() == 1);
        assert!(state.is_assigned(x));
        //the default phase assigns to the lower bound
        assert!(state.value_status(x) == ValueStatus::AssignedFromBelow);
        assert!(*state.value(x) == BigInt::from(1));

        //undoing the decision unassigns the variable again
        state.cancel_until(1, &mut arena);
        assert!(!state.is_assigned(x));
        assert!(state.decision_level() == 0);
        assert!(*state.upper_bound(x) == BigInt::from(9));
    }

    #[test]
    fn test_global_bounds_are_reasserted_after_backtracking() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let x = new_variable(&mut state, &mut arena);
        let y = new_variable(&mut state, &mut arena);

        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(0), None, &mut arena);
        state.enqueue_event(BoundEvent::UpperRefine, x, BigInt::from(1), None, &mut arena);
        state.enqueue_event(BoundEvent::LowerRefine, y, BigInt::from(0), None, &mut arena);
        state.enqueue_event(BoundEvent::UpperRefine, y, BigInt::from(1), None, &mut arena);
        let safe_index = state.trail_len() as i64 - 1;

        state.decide_value(x, &mut arena);
        //a global fact learned above level 0
        state.enqueue_event(BoundEvent::LowerRefine, y, BigInt::from(1), None, &mut arena);

        state.cancel_until(safe_index, &mut arena);
        assert!(*state.lower_bound(y) == BigInt::from(0));

        state.reassert_unit_bounds(&mut arena);
        assert!(*state.lower_bound(y) == BigInt::from(1));
        assert!(state.is_assigned(y));
    }
}

use log::trace;

use crate::basic_types::{BoolLiteral, BoundEvent, ConstraintKind, ConstraintReference, Variable};
use crate::constraints::ConstraintArena;
use crate::engine::SolverState;
use crate::gourd_asserts::*;
use crate::propagators::{
    add_bool_literal_watch, enqueue_bool_literal_true, PreprocessStatus, Propagator,
    WatchListManager,
};

/// The 2-watched-literal engine for clause constraints. The two watched
/// literals always sit at positions 0 and 1 of the record; a watch fires when
/// its literal becomes false, and the clause either migrates the watch to
/// another non-false literal or propagates the remaining watch to true.
pub struct ClausePropagator {
    watch_manager: WatchListManager,
    propagation_variable: Option<Variable>,
}

impl ClausePropagator {
    pub fn new() -> ClausePropagator {
        ClausePropagator {
            watch_manager: WatchListManager::new(),
            propagation_variable: None,
        }
    }

    //does simple preprocessing against the level-0 state, modifying the input literals
    //  removes duplicate literals (adjusting the constant for negated copies)
    //  removes literals that are false at level 0
    //  detects tautologies (a true literal, or both polarities of a variable)
    //  an empty result means the clause is inconsistent at level 0
    pub fn preprocess(
        &self,
        literals: &mut Vec<BoolLiteral>,
        constant: &mut i32,
        zero_level_index: i64,
        state: &mut SolverState,
        _arena: &mut ConstraintArena,
    ) -> PreprocessStatus {
        gourd_assert_ne_simple!(literals.len(), 0);

        trace!(target: "propagator::clause", "preprocessing {} literals", literals.len());

        //sort so that duplicates end up next to each other
        literals.sort_unstable();

        let mut last_kept: i64 = -1; //index of the last literal we are done with
        let mut current = 0;

        while current < literals.len() {
            let literal = literals[current];

            //check the semantic part against the level-0 assignment
            if state.is_assigned_at(literal.variable(), zero_level_index) {
                if state.bool_literal_value_at(literal, zero_level_index) > 0 {
                    return PreprocessStatus::Tautology;
                }
                //the literal is false at level 0, drop it
                if literal.is_negated() {
                    *constant += 1;
                }
                current += 1;
                continue;
            }

            //check the syntactic part
            if last_kept >= 0 && literal.variable() == literals[last_kept as usize].variable() {
                if literal.is_negated() == literals[last_kept as usize].is_negated() {
                    //a plain duplicate, skip it
                    if literal.is_negated() {
                        *constant += 1;
                    }
                    current += 1;
                } else {
                    //both polarities of the same variable
                    return PreprocessStatus::Tautology;
                }
            } else {
                last_kept += 1;
                literals[last_kept as usize] = literals[current];
                current += 1;
            }
        }

        if last_kept >= 0 {
            literals.truncate(last_kept as usize + 1);
            PreprocessStatus::Ok
        } else {
            PreprocessStatus::Inconsistent
        }
    }
}

impl ClausePropagator {
    pub(crate) fn debug_watch_manager(&self) -> &WatchListManager {
        &self.watch_manager
    }
}

impl Propagator for ClausePropagator {
    fn watch_manager(&mut self) -> &mut WatchListManager {
        &mut self.watch_manager
    }

    fn set_propagation_variable(&mut self, variable: Option<Variable>) {
        self.propagation_variable = variable;
    }

    fn attach(
        &mut self,
        reference: ConstraintReference,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Clause);
        trace!(target: "propagator::clause", "attaching {:?}", reference);

        let size = arena.len(reference);

        //move unassigned literals into the first two spots
        let mut num_unassigned = 0;
        for i in 0..size {
            if !state.is_assigned(arena.bool_literal(reference, i).variable()) {
                arena.swap_bool_literals(reference, i, num_unassigned);
                num_unassigned += 1;
                if num_unassigned == 2 {
                    break;
                }
            }
        }
        gourd_assert_simple!(num_unassigned > 0);

        //attach the first watch
        let first_literal = arena.bool_literal(reference, 0);
        add_bool_literal_watch(&mut self.watch_manager, first_literal, reference, arena);

        //if there is only one unassigned literal, the clause propagates right away
        if num_unassigned == 1 {
            trace!(target: "propagator::clause", "propagates at attachment");
            gourd_assert_moderate!(Some(first_literal.variable()) == self.propagation_variable);
            enqueue_bool_literal_true(first_literal, Some(reference), state, arena);

            //pick the second watch with the largest last-modification trail
            //index, so that backtracks re-arm the clause as early as possible
            for i in 2..size {
                let second = arena.bool_literal(reference, 1);
                let candidate = arena.bool_literal(reference, i);
                if state.last_modification_trail_index(second.variable(), true)
                    < state.last_modification_trail_index(candidate.variable(), true)
                {
                    arena.swap_bool_literals(reference, 1, i);
                }
            }
        }

        //attach the second watch
        let second_literal = arena.bool_literal(reference, 1);
        add_bool_literal_watch(&mut self.watch_manager, second_literal, reference, arena);
    }

    fn detach(&mut self, reference: ConstraintReference, arena: &ConstraintArena) {
        gourd_assert_simple!(!arena.in_use(reference));
        for i in 0..arena.len(reference) {
            let literal = arena.bool_literal(reference, i);
            self.watch_manager.mark_needs_cleanup(
                literal.variable(),
                crate::propagators::watch_event_for(literal),
            );
        }
    }

    //the clause propagator does not care which bound got refined, the watch
    //lists route only falsifying events here
    fn on_event(
        &mut self,
        variable: Variable,
        reference: ConstraintReference,
        _event: BoundEvent,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> bool {
        gourd_assert_moderate!(state.is_assigned(variable));

        //make sure that the propagating variable is at position 1
        if arena.bool_literal(reference, 0).variable() == variable {
            arena.swap_bool_literals(reference, 0, 1);
        } else {
            gourd_assert_moderate!(arena.bool_literal(reference, 1).variable() == variable);
        }

        //if the other watch is already true, the clause is satisfied
        let first_literal = arena.bool_literal(reference, 0);
        if state.is_assigned(first_literal.variable())
            && state.bool_literal_value(first_literal) == 1
        {
            return false;
        }

        //try to find a new watch
        let mut new_watch = 0;
        for i in 2..arena.len(reference) {
            let literal = arena.bool_literal(reference, i);
            if !state.is_assigned(literal.variable()) {
                new_watch = i;
                break;
            } else if state.bool_literal_value(literal) == 1 {
                //the clause is already satisfied
                return false;
            }
        }

        if new_watch == 0 {
            //no watch found: the remaining watch is the unit literal
            enqueue_bool_literal_true(first_literal, Some(reference), state, arena);
            false
        } else {
            trace!(target: "propagator::clause", "found a new watch at position {}", new_watch);
            arena.swap_bool_literals(reference, 1, new_watch);
            let second_literal = arena.bool_literal(reference, 1);
            add_bool_literal_watch(&mut self.watch_manager, second_literal, reference, arena);
            //since we changed the watch we can erase this one
            true
        }
    }

    fn repropagate(
        &mut self,
        reference: ConstraintReference,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        let Some(propagation_variable) = self.propagation_variable else {
            return;
        };

        //the first literal should be unchanged, the propagation cannot have happened before it
        let first_literal = arena.bool_literal(reference, 0);
        if first_literal.variable() != propagation_variable
            || state.is_assigned(propagation_variable)
        {
            return;
        }

        //check that the other literals are false; checking just the second one
        //is not enough, as many reassertions might have happened with learned
        //unit constraints
        for i in 1..arena.len(reference) {
            let literal = arena.bool_literal(reference, i);
            if !state.is_assigned(literal.variable()) || state.bool_literal_value(literal) == 1 {
                return;
            }
        }

        enqueue_bool_literal_true(first_literal, Some(reference), state, arena);
    }
}

#[cfg(test)]
mod tests {
    use super::ClausePropagator;
    use crate::basic_types::{BoolLiteral, BoundEvent, Variable, VariableType};
    use crate::constraints::ConstraintArena;
    use crate::engine::SolverState;
    use crate::propagators::PreprocessStatus;
    use num_bigint::BigInt;

    fn boolean_variable(state: &mut SolverState, arena: &mut ConstraintArena) -> Variable {
        let variable = arena.new_variable(VariableType::Integer);
        state.new_variable(variable, &format!("x{}", variable.id()), true);
        state.enqueue_event(BoundEvent::LowerRefine, variable, BigInt::from(0), None, arena);
        state.enqueue_event(BoundEvent::UpperRefine, variable, BigInt::from(1), None, arena);
        variable
    }

    #[test]
    fn test_preprocess_merges_duplicates_and_detects_tautologies() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let propagator = ClausePropagator::new();
        let x = boolean_variable(&mut state, &mut arena);
        let y = boolean_variable(&mut state, &mut arena);
        let zero_level_index = state.trail_len() as i64 - 1;

        let mut literals = vec![
            BoolLiteral::new(x, false),
            BoolLiteral::new(y, true),
            BoolLiteral::new(x, false),
        ];
        let mut constant = 0;
        let status =
            propagator.preprocess(&mut literals, &mut constant, zero_level_index, &mut state, &mut arena);
        assert!(status == PreprocessStatus::Ok);
        assert!(literals.len() == 2);

        let mut complementary = vec![BoolLiteral::new(x, false), BoolLiteral::new(x, true)];
        let mut constant = 0;
        let status = propagator.preprocess(
            &mut complementary,
            &mut constant,
            zero_level_index,
            &mut state,
            &mut arena,
        );
        assert!(status == PreprocessStatus::Tautology);
    }

    #[test]
    fn test_preprocess_is_idempotent() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let propagator = ClausePropagator::new();
        let x = boolean_variable(&mut state, &mut arena);
        let y = boolean_variable(&mut state, &mut arena);
        let z = boolean_variable(&mut state, &mut arena);
        let zero_level_index = state.trail_len() as i64 - 1;

        let mut literals = vec![
            BoolLiteral::new(z, true),
            BoolLiteral::new(x, false),
            BoolLiteral::new(y, true),
            BoolLiteral::new(x, false),
        ];
        let mut constant = 0;
        let first = propagator.preprocess(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut state,
            &mut arena,
        );
        assert!(first == PreprocessStatus::Ok);

        let once = literals.clone();
        let constant_once = constant;
        let second = propagator.preprocess(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut state,
            &mut arena,
        );
        assert!(second == PreprocessStatus::Ok);
        assert!(literals == once);
        assert!(constant == constant_once);
    }
}

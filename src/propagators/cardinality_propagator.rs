use log::trace;

use crate::basic_types::{BoolLiteral, BoundEvent, ConstraintKind, ConstraintReference, Variable};
use crate::constraints::ConstraintArena;
use crate::engine::SolverState;
use crate::gourd_asserts::*;
use crate::propagators::{
    add_bool_literal_watch, enqueue_bool_literal_true, PreprocessStatus, Propagator,
    WatchListManager,
};

/// The (k+1)-watched-literal engine for cardinality constraints
/// `l_1 + ... + l_n >= k`: the first k+1 literals of the record are watched,
/// and once k+1 non-false literals can no longer be found, the first k
/// literals are forced true.
pub struct CardinalityPropagator {
    watch_manager: WatchListManager,
    propagation_variable: Option<Variable>,
}

impl CardinalityPropagator {
    pub fn new() -> CardinalityPropagator {
        CardinalityPropagator {
            watch_manager: WatchListManager::new(),
            propagation_variable: None,
        }
    }

    //forces the first 'constant' literals of the record to true
    fn propagate_watched_prefix(
        &self,
        reference: ConstraintReference,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        let constant = arena.cardinality_constant(reference) as usize;
        for i in (0..constant).rev() {
            if state.in_conflict() {
                break;
            }
            let literal = arena.bool_literal(reference, i);
            enqueue_bool_literal_true(literal, Some(reference), state, arena);
        }
    }

    //preprocessing against the level-0 state
    //  literals assigned at level 0 are removed, and the constant is decreased by the number that were true
    //  duplicates on the same variable are not allowed in cardinality constraints
    pub fn preprocess(
        &self,
        literals: &mut Vec<BoolLiteral>,
        constant: &mut u32,
        zero_level_index: i64,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> PreprocessStatus {
        gourd_assert_ne_simple!(literals.len(), 0);

        trace!(target: "propagator::cardinality", "preprocessing {} literals >= {}", literals.len(), constant);

        if *constant == 0 {
            return PreprocessStatus::Tautology;
        }

        literals.sort_unstable();

        let mut last_kept: i64 = -1;
        let mut current = 0;
        let mut true_literal_count = 0;

        while current < literals.len() {
            let literal = literals[current];

            if state.is_assigned_at(literal.variable(), zero_level_index) {
                if state.bool_literal_value_at(literal, zero_level_index) == 1 {
                    true_literal_count += 1;
                    if true_literal_count >= *constant {
                        return PreprocessStatus::Tautology;
                    }
                }
                current += 1;
                continue;
            }

            if last_kept >= 0 && literal.variable() == literals[last_kept as usize].variable() {
                panic!("Duplicate variables are not allowed in cardinality constraints.");
            }
            last_kept += 1;
            literals[last_kept as usize] = literals[current];
            current += 1;
        }

        if last_kept < 0 {
            return PreprocessStatus::Inconsistent;
        }

        literals.truncate(last_kept as usize + 1);
        *constant -= true_literal_count;

        //with fewer literals than the constant the constraint cannot be satisfied
        if (literals.len() as u32) < *constant {
            trace!(target: "propagator::cardinality", "inconsistent");
            return PreprocessStatus::Inconsistent;
        }

        //with exactly matching literal count, every literal must be true globally
        if literals.len() as u32 == *constant {
            trace!(target: "propagator::cardinality", "propagating all literals");
            for literal in literals.iter() {
                enqueue_bool_literal_true(*literal, None, state, arena);
            }
            return PreprocessStatus::Tautology;
        }

        PreprocessStatus::Ok
    }
}

impl CardinalityPropagator {
    pub(crate) fn debug_watch_manager(&self) -> &WatchListManager {
        &self.watch_manager
    }
}

impl Propagator for CardinalityPropagator {
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
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Cardinality);
        trace!(target: "propagator::cardinality", "attaching {:?}", reference);

        let size = arena.len(reference);

        //sort the literals in order to attach:
        //  unassigned first, then true by decreasing trail index, then false by decreasing trail index
        let mut literals: Vec<BoolLiteral> =
            (0..size).map(|i| arena.bool_literal(reference, i)).collect();
        literals.sort_by(|&l1, &l2| {
            let l1_assigned = state.is_assigned(l1.variable());
            let l2_assigned = state.is_assigned(l2.variable());
            if !l1_assigned || !l2_assigned {
                //whatever is unassigned goes first
                return l1_assigned
                    .cmp(&l2_assigned)
                    .then(l1.variable().cmp(&l2.variable()));
            }
            //the true ones go before the false ones
            let l1_true = state.bool_literal_value(l1) == 1;
            let l2_true = state.bool_literal_value(l2) == 1;
            l2_true.cmp(&l1_true).then_with(|| {
                state
                    .last_modification_trail_index(l2.variable(), true)
                    .cmp(&state.last_modification_trail_index(l1.variable(), true))
            })
        });
        for (i, literal) in literals.iter().enumerate() {
            arena.set_bool_literal(reference, i, *literal);
        }

        //attach the first (k + 1) literals; hitting a false one means it is propagation time
        let constant = arena.cardinality_constant(reference) as usize;
        let mut propagate = false;
        for i in 0..=constant {
            let literal = arena.bool_literal(reference, i);
            add_bool_literal_watch(&mut self.watch_manager, literal, reference, arena);
            if state.is_assigned(literal.variable()) && state.bool_literal_value(literal) == 0 {
                propagate = true;
            }
        }

        if propagate {
            trace!(target: "propagator::cardinality", "constraint propagates at attachment");
            self.propagate_watched_prefix(reference, state, arena);
        }
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

    //the cardinality propagator does not care which bound got refined, it
    //only gets events that falsify the watched literal
    fn on_event(
        &mut self,
        variable: Variable,
        reference: ConstraintReference,
        event: BoundEvent,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> bool {
        gourd_assert_moderate!(state.is_assigned(variable));
        gourd_assert_moderate!(event != BoundEvent::Any);

        let constant = arena.cardinality_constant(reference) as usize;

        //make sure that the propagating variable is at position 'constant'
        for i in 0..constant {
            if arena.bool_literal(reference, i).variable() == variable {
                arena.swap_bool_literals(reference, i, constant);
                break;
            }
        }
        gourd_assert_moderate!(arena.bool_literal(reference, constant).variable() == variable);

        //try to find a new watch that is unassigned or true
        let mut new_watch = 0;
        for i in constant + 1..arena.len(reference) {
            let literal = arena.bool_literal(reference, i);
            if !state.is_assigned(literal.variable()) || state.bool_literal_value(literal) == 1 {
                new_watch = i;
                break;
            }
        }

        if new_watch == 0 {
            //no replacement watch: the first 'constant' literals must all be true
            self.propagate_watched_prefix(reference, state, arena);
            false
        } else {
            arena.swap_bool_literals(reference, constant, new_watch);
            let literal = arena.bool_literal(reference, constant);
            add_bool_literal_watch(&mut self.watch_manager, literal, reference, arena);
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
        trace!(target: "propagator::cardinality", "repropagating {:?}", reference);

        //if any literal outside the forced prefix is non-false, nothing propagates
        let constant = arena.cardinality_constant(reference) as usize;
        for i in constant..arena.len(reference) {
            let literal = arena.bool_literal(reference, i);
            if !state.is_assigned(literal.variable()) || state.bool_literal_value(literal) == 1 {
                return;
            }
        }

        self.propagate_watched_prefix(reference, state, arena);
    }
}

#[cfg(test)]
mod tests {
    use super::CardinalityPropagator;
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
    fn test_preprocess_detects_too_few_literals() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let propagator = CardinalityPropagator::new();
        let x = boolean_variable(&mut state, &mut arena);
        let y = boolean_variable(&mut state, &mut arena);
        let zero_level_index = state.trail_len() as i64 - 1;

        let mut literals = vec![BoolLiteral::new(x, false), BoolLiteral::new(y, false)];
        let mut constant = 3;
        let status = propagator.preprocess(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut state,
            &mut arena,
        );
        assert!(status == PreprocessStatus::Inconsistent);
    }

    #[test]
    fn test_preprocess_exact_count_propagates_globally() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let propagator = CardinalityPropagator::new();
        let x = boolean_variable(&mut state, &mut arena);
        let y = boolean_variable(&mut state, &mut arena);
        let zero_level_index = state.trail_len() as i64 - 1;

        let mut literals = vec![BoolLiteral::new(x, false), BoolLiteral::new(y, false)];
        let mut constant = 2;
        let status = propagator.preprocess(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut state,
            &mut arena,
        );
        assert!(status == PreprocessStatus::Tautology);
        //both variables were forced to 1 with a global (null) reason
        assert!(*state.lower_bound(x) == BigInt::from(1));
        assert!(*state.lower_bound(y) == BigInt::from(1));
        assert!(state.lower_bound_reason(x).is_none());
    }

    #[test]
    fn test_preprocess_zero_constant_is_a_tautology() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let propagator = CardinalityPropagator::new();
        let x = boolean_variable(&mut state, &mut arena);
        let zero_level_index = state.trail_len() as i64 - 1;

        let mut literals = vec![BoolLiteral::new(x, false)];
        let mut constant = 0;
        let status = propagator.preprocess(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut state,
            &mut arena,
        );
        assert!(status == PreprocessStatus::Tautology);
    }
}

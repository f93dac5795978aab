use log::trace;
use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{One, Signed, Zero};

use crate::basic_types::{BoundEvent, ConstraintKind, ConstraintReference, IntegerLiteral, Variable};
use crate::constraints::ConstraintArena;
use crate::engine::SolverState;
use crate::gourd_asserts::*;
use crate::propagators::{PreprocessStatus, Propagator, WatchListManager};

/// The bound-based engine for general integer constraints
/// `a_1*x_1 + ... + a_n*x_n >= c`. Every literal subscribes to the `Any`
/// watch list of its variable. For `a*x + sum >= c`, the best implied bound
/// on x uses the upper bounds of positively- and the lower bounds of
/// negatively-coefficiented other variables: `x >= ceil((c - maxsum)/a)` when
/// `a > 0`, and the symmetric floor bound when `a < 0`.
///
/// The literal at position 0 is the distinguished propagation candidate. When
/// some other variable lacks the bound the computation needs, that literal is
/// shuffled to position 0 so the constraint wakes up exactly when the missing
/// bound appears.
pub struct IntegerPropagator {
    watch_manager: WatchListManager,
    propagation_variable: Option<Variable>,
}

impl IntegerPropagator {
    pub fn new() -> IntegerPropagator {
        IntegerPropagator {
            watch_manager: WatchListManager::new(),
            propagation_variable: None,
        }
    }

    //sums coefficient * best bound over all literals except the one at
    //'skip_index'; None when some variable lacks the required side
    fn optimistic_sum(
        &self,
        reference: ConstraintReference,
        skip_index: usize,
        state: &SolverState,
        arena: &ConstraintArena,
    ) -> Option<BigInt> {
        let mut sum = BigInt::zero();
        for i in 0..arena.len(reference) {
            if i == skip_index {
                continue;
            }
            let variable = arena.integer_variable(reference, i);
            let coefficient = arena.integer_coefficient(reference, i);
            if coefficient.is_positive() {
                if !state.has_upper_bound(variable) {
                    return None;
                }
                sum += coefficient * state.upper_bound(variable);
            } else {
                if !state.has_lower_bound(variable) {
                    return None;
                }
                sum += coefficient * state.lower_bound(variable);
            }
        }
        Some(sum)
    }

    //enqueues the implied bound on the variable at 'index' if it strictly
    //improves the current bound
    fn propagate_implied_bound(
        &self,
        reference: ConstraintReference,
        index: usize,
        sum: BigInt,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        let variable = arena.integer_variable(reference, index);
        let coefficient = arena.integer_coefficient(reference, index).clone();
        let remainder = arena.integer_constant(reference) - sum;
        if coefficient.is_positive() {
            let bound = remainder.div_ceil(&coefficient);
            if !state.has_lower_bound(variable) || *state.lower_bound(variable) < bound {
                state.enqueue_event(BoundEvent::LowerRefine, variable, bound, Some(reference), arena);
            }
        } else {
            let bound = remainder.div_floor(&coefficient);
            if !state.has_upper_bound(variable) || *state.upper_bound(variable) > bound {
                state.enqueue_event(BoundEvent::UpperRefine, variable, bound, Some(reference), arena);
            }
        }
    }

    //preprocessing against the level-0 state
    //  level-0-assigned variables are substituted into the constant
    //  the coefficients and the constant are divided by their gcd (constant rounded up)
    pub fn preprocess(
        &self,
        literals: &mut Vec<IntegerLiteral>,
        constant: &mut BigInt,
        zero_level_index: i64,
        state: &mut SolverState,
        _arena: &mut ConstraintArena,
    ) -> PreprocessStatus {
        trace!(target: "propagator::integer", "preprocessing {} literals >= {}", literals.len(), constant);

        let mut gcd = BigInt::zero();
        let mut kept = 0;
        for current in 0..literals.len() {
            let variable = literals[current].variable;
            if zero_level_index >= 0 && state.is_assigned_at(variable, zero_level_index) {
                *constant -= literals[current].value(state.value_at(variable, zero_level_index));
            } else {
                gcd = if gcd.is_positive() {
                    gcd.gcd(&literals[current].coefficient)
                } else {
                    literals[current].coefficient.abs()
                };
                literals.swap(kept, current);
                kept += 1;
            }
        }
        literals.truncate(kept);

        if gcd > BigInt::one() {
            for literal in literals.iter_mut() {
                //the gcd divides every coefficient exactly
                literal.coefficient = &literal.coefficient / &gcd;
            }
            *constant = constant.div_ceil(&gcd);
        }

        if literals.is_empty() {
            return if constant.is_positive() {
                PreprocessStatus::Inconsistent
            } else {
                PreprocessStatus::Tautology
            };
        }

        PreprocessStatus::Ok
    }
}

impl IntegerPropagator {
    pub(crate) fn debug_watch_manager(&self) -> &WatchListManager {
        &self.watch_manager
    }
}

impl Propagator for IntegerPropagator {
    fn watch_manager(&mut self) -> &mut WatchListManager {
        &mut self.watch_manager
    }

    fn set_propagation_variable(&mut self, variable: Option<Variable>) {
        self.propagation_variable = variable;
    }

    //integer constraints wake up on either bound of any of their variables
    fn event_list(&self, _event: BoundEvent) -> BoundEvent {
        BoundEvent::Any
    }

    fn attach(
        &mut self,
        reference: ConstraintReference,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Integer);
        trace!(target: "propagator::integer", "attaching {:?}", reference);

        for i in 0..arena.len(reference) {
            let variable = arena.integer_variable(reference, i);
            let list = self
                .watch_manager
                .get_watch_list(variable, BoundEvent::Any, arena);
            if arena.integer_coefficient(reference, i).is_positive() {
                list.push_positive(reference);
            } else {
                list.push_negative(reference);
            }
        }

        //a learnt constraint must immediately enforce the propagation that
        //gave rise to its learning
        if arena.is_learnt(reference) {
            let propagation_variable = self.propagation_variable;
            gourd_assert_simple!(propagation_variable.is_some());
            let index = (0..arena.len(reference))
                .find(|&i| Some(arena.integer_variable(reference, i)) == propagation_variable)
                .expect("The propagation variable must occur in the learnt constraint.");

            let mut sum = BigInt::zero();
            for i in 0..arena.len(reference) {
                if i == index {
                    continue;
                }
                let variable = arena.integer_variable(reference, i);
                let coefficient = arena.integer_coefficient(reference, i);
                if coefficient.is_positive() {
                    sum += coefficient * state.upper_bound(variable);
                } else {
                    sum += coefficient * state.lower_bound(variable);
                }
            }

            let variable = arena.integer_variable(reference, index);
            let coefficient = arena.integer_coefficient(reference, index).clone();
            let remainder = arena.integer_constant(reference) - sum;
            if coefficient.is_positive() {
                let bound = remainder.div_ceil(&coefficient);
                state.enqueue_event(BoundEvent::LowerRefine, variable, bound, Some(reference), arena);
            } else {
                let bound = remainder.div_floor(&coefficient);
                state.enqueue_event(BoundEvent::UpperRefine, variable, bound, Some(reference), arena);
            }
        }
    }

    fn detach(&mut self, reference: ConstraintReference, arena: &ConstraintArena) {
        gourd_assert_simple!(!arena.in_use(reference));
        for i in 0..arena.len(reference) {
            let variable = arena.integer_variable(reference, i);
            self.watch_manager
                .mark_needs_cleanup(variable, BoundEvent::Any);
        }
    }

    //tries to derive the implied bound for the distinguished literal at
    //position 0; a missing bound elsewhere becomes the new sentinel
    fn on_event(
        &mut self,
        _variable: Variable,
        reference: ConstraintReference,
        _event: BoundEvent,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> bool {
        let mut sum = BigInt::zero();
        for i in 1..arena.len(reference) {
            let variable = arena.integer_variable(reference, i);
            let coefficient = arena.integer_coefficient(reference, i);
            if coefficient.is_positive() {
                if !state.has_upper_bound(variable) {
                    arena.swap_integer_literals(reference, 0, i);
                    return false;
                }
                sum += coefficient * state.upper_bound(variable);
            } else {
                if !state.has_lower_bound(variable) {
                    arena.swap_integer_literals(reference, 0, i);
                    return false;
                }
                sum += coefficient * state.lower_bound(variable);
            }
        }

        self.propagate_implied_bound(reference, 0, sum, state, arena);
        false
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

        let Some(index) = (0..arena.len(reference))
            .find(|&i| arena.integer_variable(reference, i) == propagation_variable)
        else {
            return;
        };

        //propagation is not possible while a bound is missing
        if let Some(sum) = self.optimistic_sum(reference, index, state, arena) {
            self.propagate_implied_bound(reference, index, sum, state, arena);
        }
    }

    /// Sweeps the variable's `Any` watch list and enqueues the tightest lower
    /// and upper bound implied by any single constraint, if they strictly
    /// improve on the current bounds.
    fn bound(&mut self, variable: Variable, state: &mut SolverState, arena: &mut ConstraintArena) {
        trace!(target: "propagator::integer", "bounding {}", variable);

        let watchers: Vec<ConstraintReference> = self
            .watch_manager
            .get_watch_list(variable, BoundEvent::Any, arena)
            .watchers()
            .to_vec();

        let mut best_lower: Option<(BigInt, ConstraintReference)> = None;
        let mut best_upper: Option<(BigInt, ConstraintReference)> = None;

        for reference in watchers {
            // ax >= c - S, where S is the optimistic estimate over the others
            let mut sum = BigInt::zero();
            let mut variable_index = None;
            let mut bounding_possible = true;
            for i in 0..arena.len(reference) {
                let literal_variable = arena.integer_variable(reference, i);
                let coefficient = arena.integer_coefficient(reference, i);
                if literal_variable == variable {
                    variable_index = Some(i);
                    continue;
                }
                if coefficient.is_positive() {
                    if state.has_upper_bound(literal_variable) {
                        sum += coefficient * state.upper_bound(literal_variable);
                    } else {
                        arena.swap_integer_literals(reference, 0, i);
                        bounding_possible = false;
                        break;
                    }
                } else if state.has_lower_bound(literal_variable) {
                    sum += coefficient * state.lower_bound(literal_variable);
                } else {
                    arena.swap_integer_literals(reference, 0, i);
                    bounding_possible = false;
                    break;
                }
            }

            if !bounding_possible {
                continue;
            }
            let variable_index =
                variable_index.expect("The bounded variable occurs in every watching constraint.");

            // (1) ax >= c - sum with a > 0 gives x >= ceil((c - sum) / a)
            // (2) -ax >= c - sum with a > 0 gives x <= floor((c - sum) / -a)
            let coefficient = arena.integer_coefficient(reference, variable_index);
            let remainder = arena.integer_constant(reference) - &sum;
            if coefficient.is_positive() {
                let bound = remainder.div_ceil(coefficient);
                if best_lower.as_ref().map_or(true, |(best, _)| bound > *best) {
                    best_lower = Some((bound, reference));
                }
            } else {
                let bound = remainder.div_floor(coefficient);
                if best_upper.as_ref().map_or(true, |(best, _)| bound < *best) {
                    best_upper = Some((bound, reference));
                }
            }
        }

        if let Some((bound, reference)) = best_lower {
            if !state.has_lower_bound(variable) || bound > *state.lower_bound(variable) {
                trace!(target: "propagator::integer", "{} >= {}", variable, bound);
                state.enqueue_event(BoundEvent::LowerRefine, variable, bound, Some(reference), arena);
            }
        }
        if let Some((bound, reference)) = best_upper {
            if !state.has_upper_bound(variable) || bound < *state.upper_bound(variable) {
                trace!(target: "propagator::integer", "{} <= {}", variable, bound);
                state.enqueue_event(BoundEvent::UpperRefine, variable, bound, Some(reference), arena);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::IntegerPropagator;
    use crate::basic_types::{BoundEvent, IntegerLiteral, Variable, VariableType};
    use crate::constraints::ConstraintArena;
    use crate::engine::SolverState;
    use crate::propagators::PreprocessStatus;

    fn new_variable(state: &mut SolverState, arena: &mut ConstraintArena) -> Variable {
        let variable = arena.new_variable(VariableType::Integer);
        state.new_variable(variable, &format!("x{}", variable.id()), true);
        variable
    }

    #[test]
    fn test_preprocess_divides_by_the_gcd() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let propagator = IntegerPropagator::new();
        let x = new_variable(&mut state, &mut arena);
        let y = new_variable(&mut state, &mut arena);

        //4x + 6y >= 7 becomes 2x + 3y >= 4
        let mut literals = vec![
            IntegerLiteral::new(BigInt::from(4), x),
            IntegerLiteral::new(BigInt::from(6), y),
        ];
        let mut constant = BigInt::from(7);
        let status = propagator.preprocess(&mut literals, &mut constant, -1, &mut state, &mut arena);
        assert!(status == PreprocessStatus::Ok);
        assert!(literals[0].coefficient == BigInt::from(2));
        assert!(literals[1].coefficient == BigInt::from(3));
        assert!(constant == BigInt::from(4));
    }

    #[test]
    fn test_preprocess_classifies_empty_constraints() {
        let mut arena = ConstraintArena::new();
        let mut state = SolverState::new();
        let propagator = IntegerPropagator::new();
        let x = new_variable(&mut state, &mut arena);

        //x is fixed to 2 at level 0, so 3x >= 7 reduces to 0 >= 1
        state.enqueue_event(BoundEvent::LowerRefine, x, BigInt::from(2), None, &mut arena);
        state.enqueue_event(BoundEvent::UpperRefine, x, BigInt::from(2), None, &mut arena);
        let zero_level_index = state.trail_len() as i64 - 1;

        let mut literals = vec![IntegerLiteral::new(BigInt::from(3), x)];
        let mut constant = BigInt::from(7);
        let status = propagator.preprocess(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut state,
            &mut arena,
        );
        assert!(status == PreprocessStatus::Inconsistent);

        //whereas 3x >= 6 reduces to 0 >= 0
        let mut literals = vec![IntegerLiteral::new(BigInt::from(3), x)];
        let mut constant = BigInt::from(6);
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

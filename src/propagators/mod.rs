mod cardinality_propagator;
mod clause_propagator;
mod integer_propagator;
mod watch_list;

pub use cardinality_propagator::CardinalityPropagator;
pub use clause_propagator::ClausePropagator;
pub use integer_propagator::IntegerPropagator;
pub use watch_list::WatchList;
pub use watch_list::WatchListManager;

use std::collections::HashMap;

use log::trace;

use crate::basic_types::{BoundEvent, ConstraintKind, ConstraintReference, Variable};
use crate::constraints::ConstraintArena;
use crate::engine::SolverState;

/// Status of preprocessing a constraint against the level-0 state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PreprocessStatus {
    /// Preprocessing went fine, use the literals to assert the constraint.
    Ok,
    /// Preprocessing determined that the constraint is unsatisfiable.
    Inconsistent,
    /// Preprocessing determined that the constraint is a tautology.
    Tautology,
}

/// The contract shared by the three propagation engines. A propagator never
/// fails directly: it reports problems by enqueueing bound refinements, and
/// the solver state detects the conflict through the lower > upper check.
pub trait Propagator {
    fn watch_manager(&mut self) -> &mut WatchListManager;

    /// The variable a learnt constraint is expected to propagate; used by
    /// attachment of learnt constraints and by repropagation.
    fn set_propagation_variable(&mut self, variable: Option<Variable>);

    /// Inserts the constraint into the relevant watch lists; may immediately
    /// enqueue propagation events.
    fn attach(
        &mut self,
        reference: ConstraintReference,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    );

    /// Marks the constraint's watch lists for deferred cleanup.
    fn detach(&mut self, reference: ConstraintReference, arena: &ConstraintArena);

    /// Reacts to a bound event for one watching constraint; returns true if
    /// the watch should be dropped from the list.
    fn on_event(
        &mut self,
        variable: Variable,
        reference: ConstraintReference,
        event: BoundEvent,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> bool;

    /// After backtracking to a level where the constraint had already
    /// propagated, re-fires the propagation if it still holds.
    fn repropagate(
        &mut self,
        reference: ConstraintReference,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    );

    /// Incomplete-propagator sweep deriving bounds for the variable (general
    /// integer constraints only).
    fn bound(&mut self, _variable: Variable, _state: &mut SolverState, _arena: &mut ConstraintArena) {
    }

    /// Which watch-list slot this propagator reads for a given event.
    /// Integer constraints subscribe to `Any` and wake up on either side.
    fn event_list(&self, event: BoundEvent) -> BoundEvent {
        event
    }

    fn add_variable(&mut self, variable: Variable) {
        self.watch_manager().add_variable(variable);
    }

    fn clean_all(&mut self, arena: &ConstraintArena) {
        self.watch_manager().clean_all(arena);
    }

    fn gc_update(&mut self, relocation_map: &HashMap<ConstraintReference, ConstraintReference>) {
        self.watch_manager().gc_update(relocation_map);
    }

    /// Routes the event to every watching constraint, compacting the watch
    /// list in place. On conflict the remaining watches are kept untouched.
    fn propagate_event(
        &mut self,
        variable: Variable,
        event: BoundEvent,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        if state.in_conflict() {
            return;
        }

        let list_event = self.event_list(event);
        let mut watchers = self.watch_manager().take_watchers(variable, list_event, arena);

        let mut end_index = 0;
        let mut current_index = 0;
        while current_index < watchers.len() {
            let reference = watchers[current_index];
            let remove_watch = self.on_event(variable, reference, event, state, arena);
            if !remove_watch {
                watchers[end_index] = watchers[current_index];
                end_index += 1;
            }
            current_index += 1;

            if state.in_conflict() {
                //copy the remaining watches and stop
                while current_index < watchers.len() {
                    watchers[end_index] = watchers[current_index];
                    end_index += 1;
                    current_index += 1;
                }
                break;
            }
        }
        watchers.truncate(end_index);

        self.watch_manager()
            .restore_watchers(variable, list_event, watchers);
    }
}

/// Info for doing repropagation.
#[derive(Clone, Copy, Debug)]
pub struct RepropagationInfo {
    /// Constraint that spawned the propagation.
    pub constraint: ConstraintReference,
    /// Trail index at which this propagation happened.
    pub trail_index: i64,
    /// Variable that got propagated.
    pub variable: Variable,
}

/// The three specialized engines behind one dispatch point. Within a single
/// event the propagators are invoked in a fixed order (clause, cardinality,
/// integer); the order is irrelevant for correctness but fixed for
/// reproducibility.
pub struct PropagatorCollection {
    clause: ClausePropagator,
    cardinality: CardinalityPropagator,
    integer: IntegerPropagator,
    /// Constraints that propagated something on attach (and might propagate
    /// something again after a backtrack).
    repropagation_list: Vec<RepropagationInfo>,
    /// Constraints that need to be checked for repropagation.
    to_repropagate: Vec<RepropagationInfo>,
}

impl PropagatorCollection {
    pub fn new() -> PropagatorCollection {
        PropagatorCollection {
            clause: ClausePropagator::new(),
            cardinality: CardinalityPropagator::new(),
            integer: IntegerPropagator::new(),
            repropagation_list: vec![],
            to_repropagate: vec![],
        }
    }

    fn for_each(&mut self, mut operation: impl FnMut(&mut dyn Propagator)) {
        operation(&mut self.clause);
        operation(&mut self.cardinality);
        operation(&mut self.integer);
    }

    fn owner(&mut self, kind: ConstraintKind) -> &mut dyn Propagator {
        match kind {
            ConstraintKind::Clause => &mut self.clause,
            ConstraintKind::Cardinality => &mut self.cardinality,
            ConstraintKind::Integer => &mut self.integer,
        }
    }

    pub fn add_variable(&mut self, variable: Variable) {
        self.for_each(|propagator| propagator.add_variable(variable));
    }

    pub fn set_propagation_variable(&mut self, variable: Option<Variable>) {
        self.for_each(|propagator| propagator.set_propagation_variable(variable));
    }

    pub fn clean_all(&mut self, arena: &ConstraintArena) {
        self.for_each(|propagator| propagator.clean_all(arena));
        //constraints removed from the database cannot fire again
        self.repropagation_list
            .retain(|info| !arena.is_deleted(info.constraint));
        self.to_repropagate
            .retain(|info| !arena.is_deleted(info.constraint));
    }

    /// Attaches the constraint to its owning propagator; if the attachment
    /// extended the trail, the constraint is remembered for repropagation
    /// after future backtracks.
    pub fn attach(
        &mut self,
        reference: ConstraintReference,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        let old_trail_size = state.trail_len();
        self.owner(reference.kind()).attach(reference, state, arena);
        if old_trail_size < state.trail_len() {
            self.repropagation_list.push(RepropagationInfo {
                constraint: reference,
                trail_index: old_trail_size as i64,
                variable: state.trail()[old_trail_size].variable,
            });
        }
    }

    pub fn detach(&mut self, reference: ConstraintReference, arena: &ConstraintArena) {
        self.owner(reference.kind()).detach(reference, arena);
    }

    /// Calls the propagators on the specific event that happened on the
    /// trigger variable.
    pub fn propagate_event(
        &mut self,
        variable: Variable,
        event: BoundEvent,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        trace!(target: "propagators", "{}[{}]", variable, event);
        self.clause.propagate_event(variable, event, state, arena);
        self.cardinality.propagate_event(variable, event, state, arena);
        self.integer.propagate_event(variable, event, state, arena);
    }

    /// Bounds a variable wrt the current constraints.
    pub fn bound(
        &mut self,
        variable: Variable,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) {
        self.clause.bound(variable, state, arena);
        self.cardinality.bound(variable, state, arena);
        self.integer.bound(variable, state, arena);
    }

    /// Moves the repropagation entries above the backtrack point to the
    /// pending queue.
    pub fn cancel_until(&mut self, trail_index: i64) {
        while self
            .repropagation_list
            .last()
            .is_some_and(|info| info.trail_index > trail_index)
        {
            let info = self.repropagation_list.pop().unwrap();
            self.to_repropagate.push(info);
        }
    }

    /// Repropagates the constraints that might still be propagating after a
    /// backtrack. Popped global bounds are re-asserted first; entries that
    /// cannot propagate at the current level are re-queued for later.
    pub fn repropagate(&mut self, state: &mut SolverState, arena: &mut ConstraintArena) {
        state.reassert_unit_bounds(arena);

        while !self.to_repropagate.is_empty() && !state.in_conflict() {
            let old_trail_size = state.trail_len();
            let current = *self.to_repropagate.last().unwrap();
            if arena.is_deleted(current.constraint) {
                let _ = self.to_repropagate.pop();
                continue;
            }
            let propagator = self.owner(current.constraint.kind());
            propagator.set_propagation_variable(Some(current.variable));
            propagator.repropagate(current.constraint, state, arena);
            //it propagated something again
            if old_trail_size < state.trail_len() {
                self.repropagation_list.push(RepropagationInfo {
                    constraint: current.constraint,
                    trail_index: old_trail_size as i64,
                    variable: state.trail()[old_trail_size].variable,
                });
            }
            let _ = self.to_repropagate.pop();
        }

        //if we got into a conflict we have to try again later
        while let Some(current) = self.to_repropagate.pop() {
            self.repropagation_list.push(RepropagationInfo {
                constraint: current.constraint,
                trail_index: state.trail_len() as i64 - 1,
                variable: current.variable,
            });
        }
    }

    pub fn debug_no_deleted_watchers(&self, arena: &ConstraintArena) -> bool {
        self.clause.debug_watch_manager().debug_no_deleted_watchers(arena)
            && self
                .cardinality
                .debug_watch_manager()
                .debug_no_deleted_watchers(arena)
            && self
                .integer
                .debug_watch_manager()
                .debug_no_deleted_watchers(arena)
    }

    pub fn gc_update(
        &mut self,
        relocation_map: &HashMap<ConstraintReference, ConstraintReference>,
    ) {
        self.for_each(|propagator| propagator.gc_update(relocation_map));
        for info in self
            .repropagation_list
            .iter_mut()
            .chain(self.to_repropagate.iter_mut())
        {
            let reference = info.constraint;
            let relocated = relocation_map[&reference.clear_flag()];
            info.constraint = if reference.flagged() {
                relocated.set_flag()
            } else {
                relocated
            };
        }
    }
}

//preprocessing dispatch; the literal types differ per kind so these are
//statically dispatched instead of going through the trait
impl PropagatorCollection {
    pub fn preprocess_clause(
        &mut self,
        literals: &mut Vec<crate::basic_types::BoolLiteral>,
        constant: &mut i32,
        zero_level_index: i64,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> PreprocessStatus {
        self.clause
            .preprocess(literals, constant, zero_level_index, state, arena)
    }

    pub fn preprocess_cardinality(
        &mut self,
        literals: &mut Vec<crate::basic_types::BoolLiteral>,
        constant: &mut u32,
        zero_level_index: i64,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> PreprocessStatus {
        self.cardinality
            .preprocess(literals, constant, zero_level_index, state, arena)
    }

    pub fn preprocess_integer(
        &mut self,
        literals: &mut Vec<crate::basic_types::IntegerLiteral>,
        constant: &mut num_bigint::BigInt,
        zero_level_index: i64,
        state: &mut SolverState,
        arena: &mut ConstraintArena,
    ) -> PreprocessStatus {
        self.integer
            .preprocess(literals, constant, zero_level_index, state, arena)
    }
}

//small helper shared by the clause and cardinality engines: a watch for a 0/1
//literal has to fire when the literal becomes false, so negated literals
//watch lower-bound refinements and positive literals watch upper-bound
//refinements
pub(crate) fn watch_event_for(literal: crate::basic_types::BoolLiteral) -> BoundEvent {
    if literal.is_negated() {
        BoundEvent::LowerRefine
    } else {
        BoundEvent::UpperRefine
    }
}

pub(crate) fn add_bool_literal_watch(
    watch_manager: &mut WatchListManager,
    literal: crate::basic_types::BoolLiteral,
    reference: ConstraintReference,
    arena: &ConstraintArena,
) {
    let list = watch_manager.get_watch_list(literal.variable(), watch_event_for(literal), arena);
    if literal.is_negated() {
        list.push_negative(reference);
    } else {
        list.push_positive(reference);
    }
}

pub(crate) fn enqueue_bool_literal_true(
    literal: crate::basic_types::BoolLiteral,
    reason: Option<ConstraintReference>,
    state: &mut SolverState,
    arena: &mut ConstraintArena,
) {
    use num_bigint::BigInt;
    use num_traits::{One, Zero};

    let variable = literal.variable();
    if literal.is_negated() {
        //1 - x >= 1, propagate the upper bound x <= 0
        if state.upper_bound(variable).is_one() {
            state.enqueue_event(BoundEvent::UpperRefine, variable, BigInt::zero(), reason, arena);
        }
    } else {
        //x >= 1, propagate the lower bound
        if state.lower_bound(variable).is_zero() {
            state.enqueue_event(BoundEvent::LowerRefine, variable, BigInt::one(), reason, arena);
        }
    }
}

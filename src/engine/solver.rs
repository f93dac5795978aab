use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::{debug, error, info, trace, warn};
use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{One, Signed, Zero};

use crate::basic_types::{
    BoolLiteral, BoundEvent, ConstraintKind, ConstraintReference, IntegerLiteral, Variable,
    VariableType,
};
use crate::constraints::ConstraintArena;
use crate::engine::conflict_analysis::{PropagationTag, TightCacheEntry};
use crate::engine::solver_stats::SolverStats;
use crate::engine::SolverState;
use crate::gourd_asserts::*;
use crate::heuristics::{ExplanationRemovalHeuristic, LubyRestartHeuristic};
use crate::propagators::{PreprocessStatus, PropagatorCollection};

/// The current state of the solver with respect to solving the problem.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SolverStatus {
    /// Solver has not (yet) determined the state of the problem.
    Unknown,
    /// The problem is unsatisfiable.
    Unsatisfiable,
    /// The problem is satisfiable.
    Satisfiable,
    /// Solver has been interrupted.
    Interrupted,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::Unknown => write!(f, "unknown"),
            SolverStatus::Unsatisfiable => write!(f, "unsat"),
            SolverStatus::Satisfiable => write!(f, "sat"),
            SolverStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// We distinguish and manage these kinds of constraints in different ways.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConstraintClass {
    /// Constraints coming from the input problem.
    Problem,
    /// Constraints we got while explaining conflicts.
    Explanation,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum Verbosity {
    #[default]
    Silent,
    Basic,
    Detailed,
    Extreme,
}

/// The recognized configuration options; every field defaults to the first
/// value of its enumeration in the documentation.
pub struct SolverOptions {
    /// Disables propagation for debugging when false.
    pub propagation: bool,
    /// Dynamic (activity-based) or linear variable selection.
    pub dynamic_order: bool,
    /// Post-satisfiable verification pass over all problem constraints.
    pub check_model: bool,
    /// Allow a plain Fourier-Motzkin resolvent before going for tight cuts.
    pub try_fourier_motzkin: bool,
    /// Rewrite each declared variable x as x+ - x- with x+, x- >= 0.
    pub replace_vars_with_slacks: bool,
    /// Symmetric initial bounds for each new variable.
    pub default_bound: Option<BigInt>,
    /// Initial lower bound for the global slack variable.
    pub bound_estimate: BigInt,
    pub verbosity: Verbosity,
}

impl Default for SolverOptions {
    fn default() -> SolverOptions {
        SolverOptions {
            propagation: true,
            dynamic_order: true,
            check_model: false,
            try_fourier_motzkin: false,
            replace_vars_with_slacks: false,
            default_bound: None,
            bound_estimate: BigInt::zero(),
            verbosity: Verbosity::Silent,
        }
    }
}

/// The conflict-driven solver for conjunctions of linear integer
/// inequalities. Clause and cardinality constraints are handled by
/// specialized watched-literal engines, general inequalities by bound
/// propagation, and conflicts are resolved into new constraints by the
/// tight-cut analysis.
pub struct Solver {
    pub(crate) arena: ConstraintArena,
    pub(crate) stats: SolverStats,
    pub(crate) restart_heuristic: LubyRestartHeuristic,
    pub(crate) explanation_removal_heuristic: ExplanationRemovalHeuristic,
    /// The original problem constraints.
    pub(crate) problem_constraints: Vec<ConstraintReference>,
    /// Constraints derived as explanations of conflicts.
    pub(crate) explanation_constraints: Vec<ConstraintReference>,
    pub(crate) constraint_activity_increment: f64,
    pub(crate) constraint_activity_decay: f64,
    pub(crate) variable_by_name: BTreeMap<String, Variable>,
    pub(crate) variable_to_positive_slack: HashMap<Variable, Variable>,
    pub(crate) variable_to_negative_slack: HashMap<Variable, Variable>,
    /// Index into the trail, to know what we have propagated so far.
    pub(crate) propagation_trail_index: usize,
    pub(crate) status: SolverStatus,
    pub(crate) state: SolverState,
    pub(crate) propagators: PropagatorCollection,
    pub(crate) check_model: bool,
    pub(crate) disable_propagation: bool,
    pub(crate) verbosity: Verbosity,
    pub(crate) slack_variable: Option<Variable>,
    pub(crate) slack_constraints_lower: Vec<Option<ConstraintReference>>,
    pub(crate) slack_constraints_upper: Vec<Option<ConstraintReference>>,
    pub(crate) bound_estimate: BigInt,
    pub(crate) default_bound: Option<BigInt>,
    pub(crate) replace_vars_with_slacks: bool,
    pub(crate) try_fourier_motzkin: bool,
    /// Variables involved in the current conflict, with their bump weights.
    pub(crate) conflict_variables: HashMap<Variable, f64>,
    /// Constraints involved in the current conflict.
    pub(crate) conflict_constraints: BTreeSet<ConstraintReference>,
    /// Cache of tightly propagating constraints keyed by
    /// (variable, trail index, side); purged above the backtrack point.
    pub(crate) tight_cache: BTreeMap<PropagationTag, TightCacheEntry>,
}

const MAX_CONSTRAINT_ACTIVITY: f64 = 1e20;

//construction and the public surface
impl Solver {
    pub fn new(options: SolverOptions) -> Solver {
        print_gourd_assert_warning_message!();

        let mut state = SolverState::new();
        state.set_dynamic_order(options.dynamic_order);
        Solver {
            arena: ConstraintArena::new(),
            stats: SolverStats::new(),
            restart_heuristic: LubyRestartHeuristic::new(),
            explanation_removal_heuristic: ExplanationRemovalHeuristic::new(),
            problem_constraints: vec![],
            explanation_constraints: vec![],
            constraint_activity_increment: 1.0,
            constraint_activity_decay: 1.001,
            variable_by_name: BTreeMap::new(),
            variable_to_positive_slack: HashMap::new(),
            variable_to_negative_slack: HashMap::new(),
            propagation_trail_index: 0,
            status: SolverStatus::Unknown,
            state,
            propagators: PropagatorCollection::new(),
            check_model: options.check_model,
            disable_propagation: !options.propagation,
            verbosity: options.verbosity,
            slack_variable: None,
            slack_constraints_lower: vec![],
            slack_constraints_upper: vec![],
            bound_estimate: options.bound_estimate,
            default_bound: options.default_bound,
            replace_vars_with_slacks: options.replace_vars_with_slacks,
            try_fourier_motzkin: options.try_fourier_motzkin,
            conflict_variables: HashMap::new(),
            conflict_constraints: BTreeSet::new(),
            tight_cache: BTreeMap::new(),
        }
    }

    /// Creates a new variable of the given name. With the slack rewriting
    /// enabled, the declared variable is replaced by the difference of two
    /// fresh nonnegative slack variables.
    pub fn new_variable(&mut self, variable_type: VariableType, name: &str) -> Variable {
        let name = name.replace(',', "_");

        let variable = self.arena.new_variable(variable_type);
        let mut last_variable_id = variable.id();
        self.stats.variables += 1;

        trace!(target: "solver", "new_variable({}) => {}", name, variable);

        self.state
            .new_variable(variable, &name, !self.replace_vars_with_slacks);

        if !self.replace_vars_with_slacks {
            let _ = self.variable_by_name.insert(name.clone(), variable);
            self.propagators.add_variable(variable);
        } else {
            //introduce the positive slack
            let positive_name = format!("{}_plus", name);
            let positive = self.arena.new_variable(variable_type);
            self.state.new_variable(positive, &positive_name, true);
            let _ = self.variable_by_name.insert(positive_name, positive);
            self.propagators.add_variable(positive);
            let _ = self.variable_to_positive_slack.insert(variable, positive);
            self.state
                .enqueue_event(BoundEvent::LowerRefine, positive, BigInt::zero(), None, &mut self.arena);

            //introduce the negative slack
            let negative_name = format!("{}_minus", name);
            let negative = self.arena.new_variable(variable_type);
            self.state.new_variable(negative, &negative_name, true);
            let _ = self.variable_by_name.insert(negative_name, negative);
            self.propagators.add_variable(negative);
            let _ = self.variable_to_negative_slack.insert(variable, negative);
            self.state
                .enqueue_event(BoundEvent::LowerRefine, negative, BigInt::zero(), None, &mut self.arena);

            last_variable_id = negative.id();
        }

        if self.slack_constraints_lower.len() <= last_variable_id as usize {
            self.slack_constraints_lower
                .resize(last_variable_id as usize + 1, None);
            self.slack_constraints_upper
                .resize(last_variable_id as usize + 1, None);
        }

        if let Some(bound) = self.default_bound.clone() {
            self.state
                .enqueue_event(BoundEvent::LowerRefine, variable, -bound.clone(), None, &mut self.arena);
            self.state
                .enqueue_event(BoundEvent::UpperRefine, variable, bound, None, &mut self.arena);
        }

        variable
    }

    pub fn get_variable_by_name(&self, name: &str) -> Option<Variable> {
        self.variable_by_name.get(name).copied()
    }

    /// Returns all the named variables in use.
    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variable_by_name
    }

    /// True if the variable is Boolean at level 0, i.e. 0 <= x <= 1.
    pub fn is_boolean(&self, variable: Variable) -> bool {
        let safe_index = self.state.safe_index();
        self.state.has_lower_bound_at(variable, safe_index)
            && self.state.has_upper_bound_at(variable, safe_index)
            && !self.state.lower_bound_at(variable, safe_index).is_negative()
            && *self.state.upper_bound_at(variable, safe_index) <= BigInt::one()
    }

    pub fn in_conflict(&self) -> bool {
        self.status == SolverStatus::Unsatisfiable || self.state.in_conflict()
    }

    /// Asserts a new clause constraint l1 \/ l2 \/ ... \/ ln.
    pub fn assert_clause(&mut self, literals: Vec<BoolLiteral>) -> Option<ConstraintReference> {
        self.assert_clause_constraint(literals, ConstraintClass::Problem)
    }

    /// Asserts a new cardinality constraint l1 + l2 + ... + ln >= k over 0/1
    /// literals.
    pub fn assert_cardinality(
        &mut self,
        literals: Vec<BoolLiteral>,
        constant: u32,
    ) -> Option<ConstraintReference> {
        self.assert_cardinality_constraint(literals, constant, ConstraintClass::Problem)
    }

    /// Asserts a new general integer inequality a1*x1 + ... + an*xn >= c.
    pub fn assert_integer(
        &mut self,
        literals: Vec<IntegerLiteral>,
        constant: BigInt,
    ) -> Option<ConstraintReference> {
        self.assert_integer_constraint(literals, constant, ConstraintClass::Problem)
    }

    pub fn has_lower_bound(&self, variable: Variable) -> bool {
        self.state.has_lower_bound(variable)
    }

    pub fn has_upper_bound(&self, variable: Variable) -> bool {
        self.state.has_upper_bound(variable)
    }

    pub fn lower_bound(&self, variable: Variable) -> BigInt {
        self.state.lower_bound(variable).clone()
    }

    pub fn upper_bound(&self, variable: Variable) -> BigInt {
        self.state.upper_bound(variable).clone()
    }

    /// Sets a global lower bound for the given variable.
    pub fn set_lower_bound(&mut self, variable: Variable, bound: BigInt) {
        gourd_assert_simple!(
            !self.has_lower_bound(variable) || bound > *self.state.lower_bound(variable)
        );
        if self.status != SolverStatus::Unsatisfiable {
            self.state
                .enqueue_event(BoundEvent::LowerRefine, variable, bound, None, &mut self.arena);
            self.propagate();
        }
    }

    /// Sets a global upper bound for the given variable.
    pub fn set_upper_bound(&mut self, variable: Variable, bound: BigInt) {
        gourd_assert_simple!(
            !self.has_upper_bound(variable) || bound < *self.state.upper_bound(variable)
        );
        if self.status != SolverStatus::Unsatisfiable {
            self.state
                .enqueue_event(BoundEvent::UpperRefine, variable, bound, None, &mut self.arena);
            self.propagate();
        }
    }

    /// The value of the variable in the satisfying assignment.
    pub fn value(&self, variable: Variable) -> BigInt {
        self.state.value(variable).clone()
    }

    pub fn statistics(&self) -> &SolverStats {
        &self.stats
    }

    /// Main public method responsible for solving the problem.
    pub fn solve(&mut self) -> SolverStatus {
        trace!(target: "solver", "solve()");

        self.stats.timer.reset();

        //if we already have an answer, return it
        if self.status != SolverStatus::Unknown {
            return self.status;
        }

        //go through the unbounded variables and bound them with the slack
        let named_variables: Vec<Variable> = self.variable_by_name.values().copied().collect();
        for variable in named_variables {
            if !self.state.has_lower_bound(variable) || !self.state.has_upper_bound(variable) {
                self.add_slack_variable_bound(variable);
            }
        }

        //do the search with restarts
        while self.status == SolverStatus::Unknown {
            self.status = self.search();
            self.stats.arena_capacity = self.arena.capacity_words() as u64;
            self.stats.arena_size = self.arena.size_words() as u64;
            self.stats.arena_wasted = self.arena.wasted_words() as u64;
            if self.verbosity >= Verbosity::Basic {
                println!("--------------------------------------------------------------");
                println!("{}", self.stats);
            }
            self.stats.restarts += 1;
            self.restart_heuristic.restart();
        }

        if self.status != SolverStatus::Satisfiable {
            //undo the trail
            self.backtrack(-1);
        } else if self.check_model {
            self.debug_check_model();
        }

        self.status
    }
}

//the main building blocks of the search
impl Solver {
    fn search(&mut self) -> SolverStatus {
        gourd_assert_simple!(self.status == SolverStatus::Unknown);

        while self.status != SolverStatus::Unsatisfiable {
            //propagate as much as possible
            self.propagate();

            if self.state.in_conflict() {
                //we have a new conflict
                self.stats.conflicts += 1;
                self.restart_heuristic.conflict();
                self.explanation_removal_heuristic.conflict();

                //a conflict without decisions means the problem is unsatisfiable
                if self.state.is_safe() {
                    info!("Conflict at level 0");
                    return SolverStatus::Unsatisfiable;
                }

                self.analyze_conflict();

                //if not in conflict, adapt to the new situation
                if self.status != SolverStatus::Unsatisfiable {
                    self.propagators.repropagate(&mut self.state, &mut self.arena);
                    self.decay_activities();
                }
            } else {
                //only check the full state after a propagation fixed point
                gourd_assert_extreme!(self.debug_check_state());

                //restart if needed
                if self.restart_heuristic.decide() {
                    let safe_index = self.state.safe_index();
                    self.backtrack(safe_index);
                    self.propagators.repropagate(&mut self.state, &mut self.arena);
                    return SolverStatus::Unknown;
                }
                //simplify the constraint database at the root
                if self.state.decision_level() == 0 {
                    self.simplify_constraint_database();
                    if self.status != SolverStatus::Unknown {
                        return self.status;
                    }
                }
                //reduce the learned database if needed
                if self.explanation_removal_heuristic.decide(
                    self.stats.explanation_constraints,
                    self.stats.problem_constraints,
                    self.stats.variables,
                ) {
                    self.reduce_constraint_database();
                }
                //select the next variable to branch on; the slack variable always goes first
                let decision_variable = match self.slack_variable {
                    Some(slack) if !self.state.is_assigned(slack) => slack,
                    _ => match self.state.decide_variable() {
                        Some(variable) => variable,
                        //all variables are assigned
                        None => return SolverStatus::Satisfiable,
                    },
                };
                //compute the bounds with the incomplete-propagator sweep
                self.compute_bounds(decision_variable);
                //if the variable has no bounds, we need to introduce them
                if !self.state.has_lower_bound(decision_variable)
                    && !self.state.has_upper_bound(decision_variable)
                {
                    self.add_slack_variable_bound(decision_variable);
                    self.compute_bounds(decision_variable);
                }
                //if the sweep assigned the variable or got us into a conflict,
                //continue with the main loop
                if self.state.in_conflict() || self.state.is_assigned(decision_variable) {
                    if !self.state.is_assigned(decision_variable)
                        && !self.state.in_queue(decision_variable)
                    {
                        self.state.enqueue_variable(decision_variable);
                    }
                    continue;
                }
                //set the phase based on the occurrence balance (non-boolean variables only)
                if !self.is_boolean(decision_variable) {
                    let phase = self.arena.occurrence_count(decision_variable, true)
                        >= self.arena.occurrence_count(decision_variable, false);
                    self.state.set_phase(decision_variable, phase);
                }
                //we now decide on the value
                self.stats.decisions += 1;
                self.state.decide_value(decision_variable, &mut self.arena);
            }
        }

        self.status
    }

    /// Drains the trail from the propagation index forward, routing each
    /// event to the watching constraints; stops on conflict.
    pub(crate) fn propagate(&mut self) {
        //propagation may be disabled during conflict analysis or for debugging
        if self.disable_propagation || self.state.in_conflict() {
            return;
        }

        while self.propagation_trail_index < self.state.trail_len() {
            let entry = self.state.trail()[self.propagation_trail_index];
            self.propagators
                .propagate_event(entry.variable, entry.kind, &mut self.state, &mut self.arena);
            if self.state.in_conflict() {
                return;
            }
            self.propagation_trail_index += 1;
        }
    }

    /// Backtracks to the given trail index: the state is unwound, the tight
    /// constraint cache above the index is purged, and the repropagation
    /// bookkeeping is updated.
    pub(crate) fn backtrack(&mut self, trail_index: i64) {
        trace!(target: "solver", "backtracking to trail index {}", trail_index);
        gourd_assert_simple!(trail_index >= self.state.safe_index() || trail_index == -1);

        self.state.cancel_until(trail_index, &mut self.arena);

        self.propagation_trail_index =
            std::cmp::min(self.propagation_trail_index, self.state.trail_len());

        //clean the tight constraint cache above this index
        let first_purged = PropagationTag {
            trail_index: trail_index + 1,
            variable: Variable::u32_to_variable(0),
            side: BoundEvent::LowerRefine,
        };
        let _ = self.tight_cache.split_off(&first_purged);

        self.propagators.cancel_until(trail_index);
    }

    fn compute_bounds(&mut self, variable: Variable) {
        trace!(target: "solver", "bounding {}", variable);
        self.propagators.bound(variable, &mut self.state, &mut self.arena);
    }

    fn decay_activities(&mut self) {
        self.state.decay_activities();
        self.constraint_activity_increment *= self.constraint_activity_decay;
    }

    pub(crate) fn bump_constraint(&mut self, reference: ConstraintReference) {
        if !self.arena.is_learnt(reference) {
            return;
        }
        let new_score = self.arena.score(reference) as f64 + self.constraint_activity_increment;
        if new_score > MAX_CONSTRAINT_ACTIVITY {
            //rescale all scores to keep them in range
            for i in 0..self.explanation_constraints.len() {
                let explanation = self.explanation_constraints[i];
                let score = self.arena.score(explanation);
                self.arena
                    .set_score(explanation, score * (1.0 / MAX_CONSTRAINT_ACTIVITY) as f32);
            }
            self.constraint_activity_increment *= 1.0 / MAX_CONSTRAINT_ACTIVITY;
        } else {
            self.arena.set_score(reference, new_score as f32);
        }
    }
}

//methods for adding and removing constraints
impl Solver {
    pub(crate) fn assert_clause_constraint(
        &mut self,
        mut literals: Vec<BoolLiteral>,
        constraint_class: ConstraintClass,
    ) -> Option<ConstraintReference> {
        trace!(target: "solver", "assert_clause_constraint({} literals)", literals.len());

        if self.status != SolverStatus::Unknown || self.state.in_conflict() {
            return None;
        }

        //the clause is stored in integer form: sum of +-x_i >= 1 - negatives
        let mut constant =
            1 - literals.iter().filter(|literal| literal.is_negated()).count() as i32;

        let zero_level_index = self.state.safe_index();
        let preprocess_status = self.propagators.preprocess_clause(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut self.state,
            &mut self.arena,
        );

        let mut constraint = None;
        match preprocess_status {
            PreprocessStatus::Ok => {
                if literals.len() > 1 {
                    let learnt = constraint_class != ConstraintClass::Problem;
                    let Ok(reference) = self.arena.allocate_clause(&literals, constant, learnt)
                    else {
                        self.status = SolverStatus::Interrupted;
                        return None;
                    };
                    self.attach_constraint(reference, constraint_class);
                    constraint = Some(reference);
                } else {
                    //unary clauses are absorbed into the variable bounds
                    let literal = literals[0];
                    let variable = literal.variable();
                    if literal.is_negated() {
                        //asserting x = 0
                        if self.state.upper_bound(variable).is_one() {
                            self.set_upper_bound(variable, BigInt::zero());
                        }
                    } else {
                        //asserting x = 1
                        if self.state.lower_bound(variable).is_zero() {
                            self.set_lower_bound(variable, BigInt::one());
                        }
                    }
                    debug!("Adding unary clause on {}", self.state.variable_name(variable));
                }
                self.propagate();
            }
            PreprocessStatus::Tautology => {}
            PreprocessStatus::Inconsistent => {
                self.status = SolverStatus::Unsatisfiable;
            }
        }

        constraint
    }

    pub(crate) fn assert_cardinality_constraint(
        &mut self,
        mut literals: Vec<BoolLiteral>,
        mut constant: u32,
        constraint_class: ConstraintClass,
    ) -> Option<ConstraintReference> {
        trace!(target: "solver", "assert_cardinality_constraint({} literals >= {})", literals.len(), constant);

        if self.status != SolverStatus::Unknown || self.state.in_conflict() {
            return None;
        }

        let zero_level_index = self.state.safe_index();
        let preprocess_status = self.propagators.preprocess_cardinality(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut self.state,
            &mut self.arena,
        );

        let mut constraint = None;
        match preprocess_status {
            PreprocessStatus::Ok => {
                let learnt = constraint_class != ConstraintClass::Problem;
                let Ok(reference) = self.arena.allocate_cardinality(&literals, constant, learnt)
                else {
                    self.status = SolverStatus::Interrupted;
                    return None;
                };
                self.attach_constraint(reference, constraint_class);
                constraint = Some(reference);
                self.propagate();
            }
            PreprocessStatus::Tautology => {}
            PreprocessStatus::Inconsistent => {
                self.status = SolverStatus::Unsatisfiable;
            }
        }

        constraint
    }

    pub(crate) fn assert_integer_constraint(
        &mut self,
        mut literals: Vec<IntegerLiteral>,
        mut constant: BigInt,
        constraint_class: ConstraintClass,
    ) -> Option<ConstraintReference> {
        trace!(target: "solver", "assert_integer_constraint({} literals >= {})", literals.len(), constant);

        if self.status != SolverStatus::Unknown || self.state.in_conflict() {
            return None;
        }

        //with the slack rewriting, replace every declared x by x+ - x-;
        //internal variables (the slack pairs themselves) pass through
        if self.replace_vars_with_slacks && constraint_class == ConstraintClass::Problem {
            let num_literals = literals.len();
            for i in 0..num_literals {
                let variable = literals[i].variable;
                let Some(positive) = self.variable_to_positive_slack.get(&variable).copied()
                else {
                    continue;
                };
                let coefficient = literals[i].coefficient.clone();
                literals[i] = IntegerLiteral::new(coefficient.clone(), positive);
                literals.push(IntegerLiteral::new(
                    -coefficient,
                    self.variable_to_negative_slack[&variable],
                ));
            }
        }

        let zero_level_index = self.state.safe_index();
        let preprocess_status = self.propagators.preprocess_integer(
            &mut literals,
            &mut constant,
            zero_level_index,
            &mut self.state,
            &mut self.arena,
        );

        let mut constraint = None;
        match preprocess_status {
            PreprocessStatus::Ok => {
                if literals.len() > 1 {
                    let learnt = constraint_class != ConstraintClass::Problem;
                    let Ok(reference) = self.arena.allocate_integer(&literals, &constant, learnt)
                    else {
                        self.status = SolverStatus::Interrupted;
                        return None;
                    };
                    self.attach_constraint(reference, constraint_class);
                    constraint = Some(reference);
                } else {
                    //a unary inequality is a plain bound on its variable
                    let literal = &literals[0];
                    let variable = literal.variable;
                    if literal.coefficient.is_negative() {
                        let bound = constant.div_floor(&literal.coefficient);
                        if !self.state.has_upper_bound(variable)
                            || bound < *self.state.upper_bound(variable)
                        {
                            self.set_upper_bound(variable, bound);
                        }
                    } else {
                        let bound = constant.div_ceil(&literal.coefficient);
                        if !self.state.has_lower_bound(variable)
                            || bound > *self.state.lower_bound(variable)
                        {
                            self.set_lower_bound(variable, bound);
                        }
                    }
                }
                self.propagate();
            }
            PreprocessStatus::Tautology => {}
            PreprocessStatus::Inconsistent => {
                self.status = SolverStatus::Unsatisfiable;
            }
        }

        constraint
    }

    fn attach_constraint(&mut self, reference: ConstraintReference, constraint_class: ConstraintClass) {
        trace!(target: "solver", "attaching {} {:?}", reference.kind(), reference);

        match constraint_class {
            ConstraintClass::Problem => {
                self.problem_constraints.push(reference);
                self.stats.problem_constraints += 1;
            }
            ConstraintClass::Explanation => {
                self.explanation_constraints.push(reference);
                self.stats.explanation_constraints += 1;
            }
        }

        match reference.kind() {
            ConstraintKind::Clause => self.stats.clause_constraints += 1,
            ConstraintKind::Cardinality => self.stats.cardinality_constraints += 1,
            ConstraintKind::Integer => self.stats.integer_constraints += 1,
        }

        self.propagators.attach(reference, &mut self.state, &mut self.arena);
    }

    fn remove_constraint(&mut self, reference: ConstraintReference, constraint_class: ConstraintClass) {
        gourd_assert_simple!(!self.arena.in_use(reference));
        trace!(target: "solver", "removing {:?}", reference);

        match constraint_class {
            ConstraintClass::Problem => {
                gourd_assert_simple!(self.stats.problem_constraints > 0);
                self.stats.problem_constraints -= 1;
            }
            ConstraintClass::Explanation => {
                gourd_assert_simple!(self.stats.explanation_constraints > 0);
                self.stats.explanation_constraints -= 1;
            }
        }

        match reference.kind() {
            ConstraintKind::Clause => self.stats.clause_constraints -= 1,
            ConstraintKind::Cardinality => self.stats.cardinality_constraints -= 1,
            ConstraintKind::Integer => self.stats.integer_constraints -= 1,
        }

        self.propagators.detach(reference, &self.arena);
        self.arena.erase(reference);
    }

    /// Removes learned clauses that became satisfied at the root; called only
    /// at decision level 0.
    fn simplify_constraint_database(&mut self) {
        gourd_assert_simple!(self.state.decision_level() == 0);

        let size = self.explanation_constraints.len();
        let mut kept = 0;
        for i in 0..size {
            let reference = self.explanation_constraints[i];
            if reference.kind() == ConstraintKind::Clause
                && !self.arena.is_deleted(reference)
                && !self.arena.in_use(reference)
            {
                let satisfied_at_root = (0..self.arena.len(reference)).any(|j| {
                    let literal = self.arena.bool_literal(reference, j);
                    self.state.is_assigned(literal.variable())
                        && self.state.bool_literal_value(literal) == 1
                });
                if satisfied_at_root {
                    self.remove_constraint(reference, ConstraintClass::Explanation);
                    continue;
                }
            }
            self.explanation_constraints[kept] = reference;
            kept += 1;
        }
        self.stats.removed_constraints += (size - kept) as u64;
        self.explanation_constraints.truncate(kept);
    }

    /// Prunes roughly half of the learned-explanation database by lowest
    /// score, keeping the constraints that currently explain a bound. Runs a
    /// garbage collection sweep when more than half the arena is wasted.
    fn reduce_constraint_database(&mut self) {
        trace!(target: "solver", "reducing the constraint database");

        {
            let arena = &self.arena;
            self.explanation_constraints.sort_by(|c1, c2| {
                arena
                    .score(*c1)
                    .partial_cmp(&arena.score(*c2))
                    .expect("Constraint scores are never NaN.")
            });
        }

        let size = self.explanation_constraints.len();
        let half_size = size / 2;
        let mut kept = 0;
        for i in 0..size {
            let reference = self.explanation_constraints[i];
            if self.arena.is_deleted(reference) {
                continue;
            }
            if self.arena.in_use(reference) {
                self.explanation_constraints[kept] = reference;
                kept += 1;
                continue;
            }
            if i < half_size {
                self.remove_constraint(reference, ConstraintClass::Explanation);
            } else {
                self.explanation_constraints[kept] = reference;
                kept += 1;
            }
        }

        debug!("Removed {} learned constraints", size - kept);
        self.stats.removed_constraints += (size - kept) as u64;
        self.explanation_constraints.truncate(kept);

        if self.arena.wasted_words() > self.arena.size_words() / 2 {
            self.collect_garbage();
        }
    }

    /// Compacts the arena: live constraints are moved to a fresh buffer, and
    /// every holder of a reference is rewritten through the relocation map.
    fn collect_garbage(&mut self) {
        debug!("Collecting garbage, {} words wasted", self.arena.wasted_words());

        let mut relocation_map: HashMap<ConstraintReference, ConstraintReference> = HashMap::new();

        self.propagators.clean_all(&self.arena);

        self.arena.gc_begin();
        self.arena
            .gc_move(&mut self.problem_constraints, &mut relocation_map);
        self.arena
            .gc_move(&mut self.explanation_constraints, &mut relocation_map);
        self.arena.gc_end();

        self.state.gc_update(&relocation_map);
        self.propagators.gc_update(&relocation_map);

        //update the slack constraints
        if self.slack_variable.is_some() {
            for entry in self
                .slack_constraints_lower
                .iter_mut()
                .chain(self.slack_constraints_upper.iter_mut())
            {
                if let Some(reference) = entry {
                    *entry = Some(relocation_map[reference]);
                }
            }
        }
    }

    /// Bounds an otherwise-unbounded variable through the global slack
    /// variable s: the pair x + s >= 0 and s - x >= 0 is asserted, and s is
    /// decided first. Larger values of s are reached on later restarts.
    fn add_slack_variable_bound(&mut self, variable: Variable) {
        gourd_assert_simple!(
            !self.state.has_lower_bound(variable) || !self.state.has_upper_bound(variable)
        );

        if self.slack_variable.is_none() {
            let slack = self.new_variable(VariableType::Integer, "slack");
            self.slack_variable = Some(slack);
        }
        let slack = self.slack_variable.unwrap();

        if self.slack_constraints_lower[variable.index()].is_none() {
            //the lower bound constraint (x >= -s), i.e. x + s >= 0
            let literals = vec![
                IntegerLiteral::new(BigInt::one(), variable),
                IntegerLiteral::new(BigInt::one(), slack),
            ];
            self.slack_constraints_lower[variable.index()] =
                self.assert_integer_constraint(literals, BigInt::zero(), ConstraintClass::Problem);

            //the upper bound constraint (x <= s), i.e. s - x >= 0
            let literals = vec![
                IntegerLiteral::new(-BigInt::one(), variable),
                IntegerLiteral::new(BigInt::one(), slack),
            ];
            self.slack_constraints_upper[variable.index()] =
                self.assert_integer_constraint(literals, BigInt::zero(), ConstraintClass::Problem);
        }

        if !self.state.has_lower_bound(slack) {
            self.state.enqueue_event(
                BoundEvent::LowerRefine,
                slack,
                self.bound_estimate.clone(),
                None,
                &mut self.arena,
            );
        }

        if !self.state.is_assigned(slack) {
            self.state.decide_value(slack, &mut self.arena);
        }

        info!(
            "Adding slack variable bound for variable {}",
            self.state.variable_name(variable)
        );
    }

    /// Evaluates every problem constraint under the final assignment.
    fn debug_check_model(&self) {
        gourd_assert_simple!(self.status == SolverStatus::Satisfiable);

        let mut ok = true;
        for reference in &self.problem_constraints {
            let satisfied = self.is_constraint_satisfied(*reference);
            if !satisfied {
                ok = false;
                error!("Constraint {:?} not satisfied by the model", reference);
            }
        }

        if ok {
            info!("All constraints satisfied");
        }
        gourd_assert_simple!(ok, "The model violates a problem constraint.");
    }

    /// Checks the internal invariants: equal bounds imply an assignment,
    /// swept watch lists hold no deleted constraints, and the constraint
    /// user counts agree with the live bound records citing a reason.
    pub fn debug_check_state(&self) -> bool {
        //equal bounds imply an assignment
        for variable in
            crate::basic_types::VariableGeneratorIterator::new(0, self.state.variables_count())
        {
            if self.state.has_lower_bound(variable)
                && self.state.has_upper_bound(variable)
                && self.state.lower_bound(variable) == self.state.upper_bound(variable)
                && !self.state.is_assigned(variable)
            {
                return false;
            }
        }

        if !self.propagators.debug_no_deleted_watchers(&self.arena) {
            return false;
        }

        let total_users: u64 = self
            .problem_constraints
            .iter()
            .chain(self.explanation_constraints.iter())
            .map(|reference| self.arena.users(*reference) as u64)
            .sum();
        total_users == self.state.debug_count_reasoned_records() as u64
    }

    fn is_constraint_satisfied(&self, reference: ConstraintReference) -> bool {
        match reference.kind() {
            ConstraintKind::Clause => {
                //find a true literal
                (0..self.arena.len(reference)).any(|i| {
                    self.state
                        .bool_literal_value(self.arena.bool_literal(reference, i))
                        == 1
                })
            }
            ConstraintKind::Cardinality => {
                let num_true = (0..self.arena.len(reference))
                    .filter(|&i| {
                        self.state
                            .bool_literal_value(self.arena.bool_literal(reference, i))
                            == 1
                    })
                    .count();
                num_true as u32 >= self.arena.cardinality_constant(reference)
            }
            ConstraintKind::Integer => {
                let mut sum = BigInt::zero();
                for i in 0..self.arena.len(reference) {
                    sum += self.arena.integer_coefficient(reference, i)
                        * self.state.value(self.arena.integer_variable(reference, i));
                }
                sum >= *self.arena.integer_constant(reference)
            }
        }
    }
}

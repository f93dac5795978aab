use std::collections::{BinaryHeap, HashSet};

use log::{debug, trace};
use num_bigint::BigInt;
use num_integer::Integer as _;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::basic_types::{
    BoolLiteral, BoundEvent, ConstraintKind, ConstraintReference, IntegerLiteral, Variable,
};
use crate::engine::solver::{ConstraintClass, Solver, SolverStatus};
use crate::engine::variable_info::ValueStatus;
use crate::gourd_asserts::*;

/// A linear constraint under construction: a kind tag and an ordered map from
/// variables to their coefficients, read as `sum coeff * var >= constant`
/// with the constant carried alongside. A `None` kind means the shape has not
/// been classified (yet).
#[derive(Clone, Default, Debug)]
pub struct CoefficientMap {
    pub kind: Option<ConstraintKind>,
    pub coefficients: std::collections::BTreeMap<Variable, BigInt>,
}

impl CoefficientMap {
    pub fn new() -> CoefficientMap {
        CoefficientMap::default()
    }

    pub fn clear(&mut self) {
        self.kind = None;
        self.coefficients.clear();
    }
}

impl std::fmt::Display for CoefficientMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, (variable, coefficient)) in self.coefficients.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}*{}", coefficient, variable)?;
        }
        Ok(())
    }
}

/// Identifies the propagation that established a bound: the variable, the
/// trail index of the refinement, and which side was refined. The ordering is
/// by trail index first, so that a backtrack purges the cache with a single
/// split, and the elimination queue processes the most recent bounds first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PropagationTag {
    pub trail_index: i64,
    pub variable: Variable,
    pub side: BoundEvent,
}

pub struct TightCacheEntry {
    pub coefficients: CoefficientMap,
    pub constant: BigInt,
}

impl Solver {
    /// Analyzes the current conflict: the pair of constraints blaming the
    /// conflict variable is resolved (directly via Fourier-Motzkin when
    /// enabled and conflicting, otherwise after lifting the non-resolvent
    /// sides into tightly propagating form), the search backtracks, and the
    /// resulting cut is asserted. The learned constraint may itself conflict
    /// at the lower level, in which case analysis resumes from it.
    pub(crate) fn analyze_conflict(&mut self) {
        //propagation is disabled for the duration of the analysis; the flag
        //is restored on every exit path
        let saved_disable_propagation = self.disable_propagation;
        self.disable_propagation = true;
        self.analyze_conflict_inner();
        self.disable_propagation = saved_disable_propagation;
    }

    fn analyze_conflict_inner(&mut self) {
        gourd_assert_simple!(self.state.in_conflict());

        //although we resolve the conflict, the learned constraint might be
        //stronger than envisioned, so we must check again
        while self.state.in_conflict() {
            if self.status != SolverStatus::Unknown {
                return;
            }

            self.conflict_variables.clear();
            self.conflict_constraints.clear();

            let mut conflict_variable = self.state.conflict_variable();

            //the two constraints blaming the conflict variable, as coefficient maps
            let mut lower_coefficients = CoefficientMap::new();
            let mut upper_coefficients = CoefficientMap::new();
            let mut result_coefficients = CoefficientMap::new();
            let mut c_lower = BigInt::zero();
            let mut c_upper = BigInt::zero();
            let mut result_constant = BigInt::zero();

            let trail_size = self.state.trail_len() as i64;
            self.set_up_constraint_map(
                conflict_variable,
                trail_size,
                BoundEvent::LowerRefine,
                &mut lower_coefficients,
                &mut c_lower,
            );
            self.set_up_constraint_map(
                conflict_variable,
                trail_size,
                BoundEvent::UpperRefine,
                &mut upper_coefficients,
                &mut c_upper,
            );

            //the resolvent is the side with the smaller coefficient on the
            //conflict variable (any strategy is better than no strategy)
            let mut resolvent = if lower_coefficients.coefficients[&conflict_variable].abs()
                < upper_coefficients.coefficients[&conflict_variable].abs()
            {
                BoundEvent::LowerRefine
            } else {
                BoundEvent::UpperRefine
            };

            //resolve until not in conflict
            loop {
                self.stats.conflicts_in_analysis += 1;

                trace!(target: "solver", "LB: {} >= {}", lower_coefficients, c_lower);
                trace!(target: "solver", "UB: {} >= {}", upper_coefficients, c_upper);
                trace!(target: "solver", "in conflict: {}", conflict_variable);

                //try a plain Fourier-Motzkin resolvent first when allowed
                if self.try_fourier_motzkin {
                    self.resolve_coefficient_maps(
                        conflict_variable,
                        &lower_coefficients,
                        &c_lower,
                        &upper_coefficients,
                        &c_upper,
                        &mut result_coefficients,
                        &mut result_constant,
                    );
                }
                if !self.try_fourier_motzkin
                    || !self.is_conflicting(&result_coefficients, &result_constant)
                {
                    //the non-resolvent sides must be made tightly propagating
                    //with respect to the conflict variable before resolution
                    let top_index = self.state.trail_len() as i64 - 1;
                    if resolvent != BoundEvent::LowerRefine {
                        self.tightly_propagating_constraint(
                            BoundEvent::LowerRefine,
                            true,
                            conflict_variable,
                            top_index,
                            &mut lower_coefficients,
                            &mut c_lower,
                        );
                    }
                    trace!(target: "solver", "lower tight: {} >= {}", lower_coefficients, c_lower);
                    if resolvent != BoundEvent::UpperRefine {
                        self.tightly_propagating_constraint(
                            BoundEvent::UpperRefine,
                            true,
                            conflict_variable,
                            top_index,
                            &mut upper_coefficients,
                            &mut c_upper,
                        );
                    }
                    trace!(target: "solver", "upper tight: {} >= {}", upper_coefficients, c_upper);

                    self.resolve_coefficient_maps(
                        conflict_variable,
                        &lower_coefficients,
                        &c_lower,
                        &upper_coefficients,
                        &c_upper,
                        &mut result_coefficients,
                        &mut result_constant,
                    );
                    trace!(target: "solver", "resolved tight: {} >= {}", result_coefficients, result_constant);

                    self.stats.dynamic_cuts += 1;
                } else {
                    self.stats.fourier_motzkin_cuts += 1;
                }

                //an empty resolvent with a positive constant means unsat
                if result_coefficients.coefficients.is_empty() {
                    gourd_assert_simple!(result_constant.is_positive());
                    self.status = SolverStatus::Unsatisfiable;
                    return;
                }

                //backtrack to the latest trail index at which the resulting
                //constraint can propagate an improvement
                let (top_variable, top_trail_index) = self.top_trail_info(&result_coefficients);
                conflict_variable = top_variable;
                self.backtrack(top_trail_index);

                //asserting the constraint might introduce a conflict on the
                //top variable, so let's check
                if self.is_conflicting(&result_coefficients, &result_constant) {
                    //conflicting at level 0 means we are done
                    if self.state.is_safe() {
                        self.status = SolverStatus::Unsatisfiable;
                        return;
                    }
                    //since in conflict, we keep the result on one side and
                    //fetch the current opposite bound's constraint as the other
                    let trail_size = self.state.trail_len() as i64;
                    if result_coefficients.coefficients[&conflict_variable].is_positive() {
                        std::mem::swap(&mut lower_coefficients, &mut result_coefficients);
                        std::mem::swap(&mut c_lower, &mut result_constant);
                        self.set_up_constraint_map(
                            conflict_variable,
                            trail_size,
                            BoundEvent::UpperRefine,
                            &mut upper_coefficients,
                            &mut c_upper,
                        );
                        resolvent = BoundEvent::LowerRefine;
                    } else {
                        self.set_up_constraint_map(
                            conflict_variable,
                            trail_size,
                            BoundEvent::LowerRefine,
                            &mut lower_coefficients,
                            &mut c_lower,
                        );
                        std::mem::swap(&mut upper_coefficients, &mut result_coefficients);
                        std::mem::swap(&mut c_upper, &mut result_constant);
                        resolvent = BoundEvent::UpperRefine;
                    }
                } else {
                    //we're done, not in conflict anymore
                    break;
                }
            }

            //assert the new constraint; it must propagate the conflict variable
            let old_trail_size = self.state.trail_len();
            self.propagators.set_propagation_variable(Some(conflict_variable));
            let conflict_constraint =
                self.assert_tight_constraint(&result_coefficients, result_constant.clone());
            if self.status != SolverStatus::Unknown {
                return;
            }
            gourd_assert_simple!(self.state.trail_len() > old_trail_size);

            //bump the variables that participated in the conflict
            let bumped_variables = std::mem::take(&mut self.conflict_variables);
            for (variable, times) in bumped_variables {
                self.state.bump_variable(variable, times);
            }

            //bump the reason constraints that participated
            let bumped_constraints = std::mem::take(&mut self.conflict_constraints);
            for reference in bumped_constraints {
                self.bump_constraint(reference);
            }

            if let Some(reference) = conflict_constraint {
                self.bump_constraint(reference);
                debug!("Learned cut: {:?} ({})", reference, reference.kind());
            }

            //also go through the cached constraints and assert any units
            let unit_entries: Vec<(CoefficientMap, BigInt)> = self
                .tight_cache
                .values()
                .filter(|entry| entry.coefficients.coefficients.len() == 1)
                .map(|entry| (entry.coefficients.clone(), entry.constant.clone()))
                .collect();
            for (coefficients, constant) in unit_entries {
                let (variable, coefficient) = coefficients
                    .coefficients
                    .iter()
                    .next()
                    .map(|(variable, coefficient)| (*variable, coefficient.clone()))
                    .unwrap();
                if coefficient.is_positive() {
                    let bound = constant.div_ceil(&coefficient);
                    if !self.state.has_lower_bound(variable)
                        || bound > *self.state.lower_bound(variable)
                    {
                        let _ = self.assert_tight_constraint(&coefficients, constant);
                    }
                } else {
                    let bound = constant.div_floor(&coefficient);
                    if !self.state.has_upper_bound(variable)
                        || bound < *self.state.upper_bound(variable)
                    {
                        let _ = self.assert_tight_constraint(&coefficients, constant);
                    }
                }
            }
        }
    }

    /// Asserts the resolved coefficient map as a learned constraint of the
    /// kind its classification determined.
    pub(crate) fn assert_tight_constraint(
        &mut self,
        coefficients: &CoefficientMap,
        constant: BigInt,
    ) -> Option<ConstraintReference> {
        match coefficients.kind {
            Some(ConstraintKind::Clause) => {
                let literals: Vec<BoolLiteral> = coefficients
                    .coefficients
                    .iter()
                    .map(|(variable, coefficient)| {
                        BoolLiteral::new(*variable, coefficient.is_negative())
                    })
                    .collect();
                self.assert_clause_constraint(literals, ConstraintClass::Explanation)
            }
            Some(ConstraintKind::Cardinality) => {
                let mut num_negative = 0i64;
                let literals: Vec<BoolLiteral> = coefficients
                    .coefficients
                    .iter()
                    .map(|(variable, coefficient)| {
                        let negated = coefficient.is_negative();
                        if negated {
                            num_negative += 1;
                        }
                        BoolLiteral::new(*variable, negated)
                    })
                    .collect();
                //the integer-form constant turns back into a count of true literals
                let count = constant
                    .to_i64()
                    .expect("Cardinality constants fit in a machine word.")
                    + num_negative;
                if count <= 0 {
                    return None;
                }
                self.assert_cardinality_constraint(
                    literals,
                    count as u32,
                    ConstraintClass::Explanation,
                )
            }
            //unclassified maps are general integer constraints
            Some(ConstraintKind::Integer) | None => {
                let literals: Vec<IntegerLiteral> = coefficients
                    .coefficients
                    .iter()
                    .map(|(variable, coefficient)| {
                        IntegerLiteral::new(coefficient.clone(), *variable)
                    })
                    .collect();
                self.assert_integer_constraint(literals, constant, ConstraintClass::Explanation)
            }
        }
    }

    /// Builds the coefficient map of the constraint that established the
    /// given bound of the variable at the given trail index. A global bound
    /// (null reason) produces the synthetic map `+-x >= +-b`. Participating
    /// variables and reason constraints are recorded for activity bumping.
    pub(crate) fn set_up_constraint_map(
        &mut self,
        variable: Variable,
        trail_index: i64,
        side: BoundEvent,
        coefficients: &mut CoefficientMap,
        constant: &mut BigInt,
    ) {
        coefficients.clear();

        let bump_value = 1.0;

        let reason = match side {
            BoundEvent::LowerRefine => {
                let reason = self.state.lower_bound_reason_at(variable, trail_index);
                if reason.is_none() {
                    // x >= bound
                    let _ = coefficients.coefficients.insert(variable, BigInt::one());
                    *constant = self.state.lower_bound_at(variable, trail_index).clone();
                    coefficients.kind = if !constant.is_negative()
                        && self.state.has_upper_bound_at(variable, trail_index)
                        && *self.state.upper_bound_at(variable, trail_index) <= BigInt::one()
                    {
                        Some(ConstraintKind::Clause)
                    } else {
                        Some(ConstraintKind::Integer)
                    };
                    *self.conflict_variables.entry(variable).or_insert(0.0) += bump_value;
                    return;
                }
                reason.unwrap()
            }
            BoundEvent::UpperRefine => {
                let reason = self.state.upper_bound_reason_at(variable, trail_index);
                if reason.is_none() {
                    // -x >= -bound
                    let _ = coefficients.coefficients.insert(variable, -BigInt::one());
                    *constant = -self.state.upper_bound_at(variable, trail_index);
                    coefficients.kind = if *constant <= BigInt::one()
                        && self.state.has_lower_bound_at(variable, trail_index)
                        && !self.state.lower_bound_at(variable, trail_index).is_negative()
                    {
                        Some(ConstraintKind::Clause)
                    } else {
                        Some(ConstraintKind::Integer)
                    };
                    *self.conflict_variables.entry(variable).or_insert(0.0) += bump_value;
                    return;
                }
                reason.unwrap()
            }
            BoundEvent::Any => unreachable!("Bounds are established by refinements only."),
        };

        //the propagating constraint participates in the conflict
        let _ = self.conflict_constraints.insert(reason);

        coefficients.kind = Some(reason.kind());
        match reason.kind() {
            ConstraintKind::Clause => {
                for i in 0..self.arena.len(reason) {
                    let literal = self.arena.bool_literal(reason, i);
                    let _ = coefficients
                        .coefficients
                        .insert(literal.variable(), BigInt::from(literal.coefficient()));
                    *self.conflict_variables.entry(literal.variable()).or_insert(0.0) += bump_value;
                }
                *constant = BigInt::from(self.arena.clause_constant(reason));
            }
            ConstraintKind::Cardinality => {
                let mut num_negative = 0i64;
                for i in 0..self.arena.len(reason) {
                    let literal = self.arena.bool_literal(reason, i);
                    if literal.is_negated() {
                        num_negative += 1;
                    }
                    let _ = coefficients
                        .coefficients
                        .insert(literal.variable(), BigInt::from(literal.coefficient()));
                    *self.conflict_variables.entry(literal.variable()).or_insert(0.0) += bump_value;
                }
                //cardinality constants are counts; the map carries the integer form
                *constant =
                    BigInt::from(self.arena.cardinality_constant(reason) as i64 - num_negative);
            }
            ConstraintKind::Integer => {
                for i in 0..self.arena.len(reason) {
                    let literal_variable = self.arena.integer_variable(reason, i);
                    let _ = coefficients
                        .coefficients
                        .insert(literal_variable, self.arena.integer_coefficient(reason, i).clone());
                    *self.conflict_variables.entry(literal_variable).or_insert(0.0) += bump_value;
                }
                *constant = self.arena.integer_constant(reason).clone();
            }
        }
    }

    /// Computes the Fourier-Motzkin resolvent of the two bound constraints on
    /// `variable`, cancels it, divides by the gcd (constant rounded up), and
    /// classifies the result as clause, cardinality, or integer.
    pub(crate) fn resolve_coefficient_maps(
        &self,
        variable: Variable,
        lower_coefficients: &CoefficientMap,
        c_lower: &BigInt,
        upper_coefficients: &CoefficientMap,
        c_upper: &BigInt,
        result_coefficients: &mut CoefficientMap,
        result_constant: &mut BigInt,
    ) {
        result_coefficients.clear();

        // I1: a1 x + p >= c1 with a1 > 0
        // I2: a2 x + q >= c2 with a2 < 0
        // the resolvent cancelling x is -a2*I1 + a1*I2
        let a_lower = lower_coefficients.coefficients[&variable].clone();
        let a_upper = upper_coefficients.coefficients[&variable].clone();
        gourd_assert_moderate!(a_lower.is_positive() && a_upper.is_negative());

        let mut all_boolean = true;
        let both_constraints_are_clauses = lower_coefficients.kind == Some(ConstraintKind::Clause)
            && upper_coefficients.kind == Some(ConstraintKind::Clause);

        for (other, coefficient) in &lower_coefficients.coefficients {
            if !self.is_boolean(*other) {
                all_boolean = false;
            }
            let _ = result_coefficients
                .coefficients
                .insert(*other, -&a_upper * coefficient);
        }
        for (other, coefficient) in &upper_coefficients.coefficients {
            if !self.is_boolean(*other) {
                all_boolean = false;
            }
            *result_coefficients
                .coefficients
                .entry(*other)
                .or_insert_with(BigInt::zero) += &a_lower * coefficient;
        }

        //drop the cancelled variables and compute the gcd; if both inputs
        //were clauses every surviving coefficient collapses to +-1
        let mut cancelled_variables = vec![];
        let mut num_negative = 0i64;
        let mut gcd = BigInt::zero();
        for (other, coefficient) in result_coefficients.coefficients.iter_mut() {
            if coefficient.is_zero() {
                cancelled_variables.push(*other);
            } else {
                if coefficient.is_positive() {
                    if both_constraints_are_clauses {
                        *coefficient = BigInt::one();
                    }
                } else {
                    if both_constraints_are_clauses {
                        *coefficient = -BigInt::one();
                    }
                    num_negative += 1;
                }
                gcd = if gcd.is_zero() {
                    coefficient.abs()
                } else {
                    gcd.gcd(coefficient)
                };
            }
        }
        //if the gcd is zero, everything got cancelled
        if gcd.is_zero() {
            gcd = BigInt::one();
        }
        for other in cancelled_variables {
            let _ = result_coefficients.coefficients.remove(&other);
        }

        //divide the constraint by the gcd
        let mut cardinality = all_boolean;
        for (_, coefficient) in result_coefficients.coefficients.iter_mut() {
            gourd_assert_moderate!(coefficient.is_multiple_of(&gcd));
            *coefficient = &*coefficient / &gcd;
            if cardinality && !coefficient.abs().is_one() {
                cardinality = false;
            }
        }

        //the constant rounds up, which is exactly the integer cut
        *result_constant = (-&a_upper * c_lower + &a_lower * c_upper).div_ceil(&gcd);

        //re-derive the constraint kind from the result's shape
        if !cardinality {
            result_coefficients.kind = Some(ConstraintKind::Integer);
        } else if both_constraints_are_clauses
            || *result_constant == BigInt::from(1 - num_negative)
        {
            result_coefficients.kind = Some(ConstraintKind::Clause);
            //the clause form fixes the constant
            *result_constant = BigInt::from(1 - num_negative);
        } else {
            result_coefficients.kind = Some(ConstraintKind::Cardinality);
        }
    }

    /// Whether the constraint is infeasible under the current bounds: even
    /// the optimistic evaluation stays below the constant. Unbounded
    /// variables make the constraint trivially satisfiable.
    pub(crate) fn is_conflicting(
        &self,
        coefficients: &CoefficientMap,
        constant: &BigInt,
    ) -> bool {
        let mut sum = BigInt::zero();
        for (variable, coefficient) in &coefficients.coefficients {
            if coefficient.is_positive() {
                if self.state.has_upper_bound(*variable) {
                    sum += coefficient * self.state.upper_bound(*variable);
                } else {
                    return false;
                }
            } else if self.state.has_lower_bound(*variable) {
                sum += coefficient * self.state.lower_bound(*variable);
            } else {
                return false;
            }
        }
        sum < *constant
    }

    /// The most recent trail index at which the constraint can still
    /// propagate an improvement, together with the variable modified there.
    /// For decided variables the decision refinement itself is skipped.
    pub(crate) fn top_trail_info(&self, coefficients: &CoefficientMap) -> (Variable, i64) {
        let mut top_trail_index = -1;
        let mut top_variable = None;

        for (variable, coefficient) in &coefficients.coefficients {
            gourd_assert_moderate!(!coefficient.is_zero());

            match self.state.value_status(*variable) {
                ValueStatus::AssignedFromBelow => {
                    let trail_index = self.state.upper_bound_trail_index(*variable) - 1;
                    if trail_index >= top_trail_index {
                        top_trail_index = trail_index;
                        top_variable = Some(*variable);
                    }
                }
                ValueStatus::AssignedFromAbove => {
                    let trail_index = self.state.lower_bound_trail_index(*variable) - 1;
                    if trail_index >= top_trail_index {
                        top_trail_index = trail_index;
                        top_variable = Some(*variable);
                    }
                }
                _ => {
                    let trail_index = self.state.last_modification_trail_index(*variable, true);
                    if trail_index > top_trail_index {
                        top_trail_index = trail_index;
                        top_variable = Some(*variable);
                    }
                }
            }
        }

        (
            top_variable.expect("The resolvent has at least one variable."),
            top_trail_index,
        )
    }

    //the propagation tag of the bound that fixed the variable's contribution
    //to a propagating constraint at the given trail index
    fn propagation_tag(
        &self,
        variable: Variable,
        coefficient: &BigInt,
        trail_index: i64,
    ) -> PropagationTag {
        match self.state.value_status_at(variable, trail_index) {
            ValueStatus::AssignedFromBelow => PropagationTag {
                trail_index: self.state.lower_bound_trail_index_at(variable, trail_index),
                variable,
                side: BoundEvent::LowerRefine,
            },
            ValueStatus::AssignedFromAbove => PropagationTag {
                trail_index: self.state.upper_bound_trail_index_at(variable, trail_index),
                variable,
                side: BoundEvent::UpperRefine,
            },
            _ => {
                if coefficient.is_positive() {
                    PropagationTag {
                        trail_index: self.state.upper_bound_trail_index_at(variable, trail_index),
                        variable,
                        side: BoundEvent::UpperRefine,
                    }
                } else {
                    PropagationTag {
                        trail_index: self.state.lower_bound_trail_index_at(variable, trail_index),
                        variable,
                        side: BoundEvent::LowerRefine,
                    }
                }
            }
        }
    }

    /// Lifts the constraint in `out_coefficients` into tightly propagating
    /// form with respect to `x`, i.e. |coefficient of x| = 1, by recursively
    /// eliminating every other variable whose coefficient is not divisible by
    /// |a_x|. Each elimination combines in the (recursively tightened)
    /// constraint that propagated that variable's bound, multiplied by the
    /// least non-negative factor cancelling the contribution modulo |a_x|.
    /// Results are cached by (variable, trail index, side).
    pub(crate) fn tightly_propagating_constraint(
        &mut self,
        side: BoundEvent,
        replace: bool,
        x: Variable,
        trail_index: i64,
        out_coefficients: &mut CoefficientMap,
        out_constant: &mut BigInt,
    ) {
        trace!(target: "solver", "tightening [{}] {} for {} >= {} at {}", side, x, out_coefficients, out_constant, trail_index);

        let x_coefficient = out_coefficients.coefficients[&x].clone();
        gourd_assert_simple!(!x_coefficient.is_zero());
        let x_coefficient_abs = x_coefficient.abs();

        //the constraint is already tight if the coefficient of x is +-1
        if x_coefficient_abs.is_one() {
            let _ = self.tight_cache.insert(
                PropagationTag {
                    trail_index,
                    variable: x,
                    side,
                },
                TightCacheEntry {
                    coefficients: out_coefficients.clone(),
                    constant: out_constant.clone(),
                },
            );
            return;
        }

        //check the cache, unless we are dealing with the resolvent itself
        if !replace {
            let tag = PropagationTag {
                trail_index,
                variable: x,
                side,
            };
            if let Some(entry) = self.tight_cache.get(&tag) {
                *out_coefficients = entry.coefficients.clone();
                *out_constant = entry.constant.clone();
                return;
            }
        }

        //coefficients keyed by the propagation that established each
        //contribution; the most recent tags are eliminated first
        let mut coefficients: std::collections::BTreeMap<PropagationTag, BigInt> =
            std::collections::BTreeMap::new();
        let mut queue: BinaryHeap<PropagationTag> = BinaryHeap::new();
        let mut in_queue: HashSet<PropagationTag> = HashSet::new();

        for (variable, coefficient) in &out_coefficients.coefficients {
            let tag = if *variable != x {
                let tag = self.propagation_tag(*variable, coefficient, trail_index);
                trace!(target: "solver", "adding {} with time {}", variable, tag.trail_index);
                queue.push(tag);
                let _ = in_queue.insert(tag);
                tag
            } else {
                //x itself is never eliminated
                PropagationTag {
                    trail_index,
                    variable: x,
                    side: BoundEvent::Any,
                }
            };
            let _ = coefficients.insert(tag, coefficient.clone());
        }
        out_coefficients.clear();

        while let Some(tag) = queue.pop() {
            let _ = in_queue.remove(&tag);
            let variable = tag.variable;
            let variable_coefficient = coefficients[&tag].clone();
            let variable_index = tag.trail_index;

            trace!(target: "solver", "eliminating {} with coefficient {} at time {}", variable, variable_coefficient, variable_index);

            //contributions already divisible by |a_x| need no elimination
            if variable_coefficient.is_multiple_of(&x_coefficient_abs) && variable != x {
                continue;
            }

            //fetch (or recursively compute) the tight constraint that
            //propagated this bound
            let (tight_coefficients, tight_rhs) = match self.tight_cache.get(&tag) {
                Some(entry) => (entry.coefficients.clone(), entry.constant.clone()),
                None => {
                    let mut tight_coefficients = CoefficientMap::new();
                    let mut tight_rhs = BigInt::zero();
                    self.set_up_constraint_map(
                        variable,
                        variable_index,
                        tag.side,
                        &mut tight_coefficients,
                        &mut tight_rhs,
                    );
                    self.tightly_propagating_constraint(
                        tag.side,
                        false,
                        variable,
                        variable_index,
                        &mut tight_coefficients,
                        &mut tight_rhs,
                    );
                    (tight_coefficients, tight_rhs)
                }
            };
            trace!(target: "solver", "tight: {} >= {}", tight_coefficients, tight_rhs);

            let variable_coefficient_tight = tight_coefficients.coefficients[&variable].clone();
            gourd_assert_simple!(variable_coefficient_tight.abs().is_one());

            //with the non-tight coefficient a and the tight coefficient b,
            //the multiplier -a*b cancels the contribution of the variable; if
            //it comes out negative, it is bumped by the least multiple of
            //|a_x| that makes it non-negative
            let mut multiplier = -&variable_coefficient * &variable_coefficient_tight;
            if multiplier.is_negative() {
                multiplier += (-&multiplier).div_ceil(&x_coefficient_abs) * &x_coefficient_abs;
            }
            trace!(target: "solver", "multiplier: {}", multiplier);

            for (tight_variable, tight_coefficient) in &tight_coefficients.coefficients {
                if *tight_variable != variable {
                    let tight_tag =
                        self.propagation_tag(*tight_variable, tight_coefficient, variable_index);
                    if !in_queue.contains(&tight_tag) {
                        let _ = in_queue.insert(tight_tag);
                        queue.push(tight_tag);
                    }
                    *coefficients.entry(tight_tag).or_insert_with(BigInt::zero) +=
                        tight_coefficient * &multiplier;
                } else {
                    *coefficients.entry(tag).or_insert_with(BigInt::zero) +=
                        tight_coefficient * &multiplier;
                }
            }

            *out_constant += &tight_rhs * &multiplier;
        }

        //fold the tagged contributions back into per-variable coefficients;
        //everything is divisible by |a_x| now
        for (tag, coefficient) in &coefficients {
            if !coefficient.is_zero() {
                gourd_assert_advanced!(coefficient.is_multiple_of(&x_coefficient_abs));
                *out_coefficients
                    .coefficients
                    .entry(tag.variable)
                    .or_insert_with(BigInt::zero) += coefficient / &x_coefficient_abs;
            }
        }
        out_coefficients
            .coefficients
            .retain(|_, coefficient| !coefficient.is_zero());

        //round the constant up
        *out_constant = out_constant.div_ceil(&x_coefficient_abs);

        let _ = self.tight_cache.insert(
            PropagationTag {
                trail_index,
                variable: x,
                side,
            },
            TightCacheEntry {
                coefficients: out_coefficients.clone(),
                constant: out_constant.clone(),
            },
        );
    }
}

/// Decides when to prune the learned-explanation database. The allowed size
/// is a factor of the problem size plus twice the number of variables; the
/// factor grows by one at every adjustment, and the adjustment interval
/// starts at 100 conflicts and stretches by 10% each time.
pub struct ExplanationRemovalHeuristic {
    explanation_constraints_factor: f64,
    explanation_constraints_factor_adjust: u64,
    num_conflicts: u64,
}

const FACTOR_INIT: f64 = 1.0;
const FACTOR_INCREASE: f64 = 1.0;
const FACTOR_ADJUST_INIT: u64 = 100;
const FACTOR_ADJUST_INCREASE: f64 = 1.1;

impl ExplanationRemovalHeuristic {
    pub fn new() -> ExplanationRemovalHeuristic {
        ExplanationRemovalHeuristic {
            explanation_constraints_factor: FACTOR_INIT,
            explanation_constraints_factor_adjust: FACTOR_ADJUST_INIT,
            num_conflicts: 0,
        }
    }

    pub fn conflict(&mut self) {
        self.num_conflicts += 1;
        if self.num_conflicts == self.explanation_constraints_factor_adjust {
            self.num_conflicts = 0;
            self.explanation_constraints_factor += FACTOR_INCREASE;
            self.explanation_constraints_factor_adjust =
                (self.explanation_constraints_factor_adjust as f64 * FACTOR_ADJUST_INCREASE) as u64;
        }
    }

    pub fn decide(
        &self,
        num_explanation_constraints: u64,
        num_problem_constraints: u64,
        num_variables: u64,
    ) -> bool {
        num_explanation_constraints as f64
            >= num_problem_constraints as f64 * self.explanation_constraints_factor
                + 2.0 * num_variables as f64
    }
}

#[cfg(test)]
mod tests {
    use super::ExplanationRemovalHeuristic;

    #[test]
    fn test_threshold_and_adjustment() {
        let mut heuristic = ExplanationRemovalHeuristic::new();

        //initial factor 1.0: learned >= problem + 2 * variables
        assert!(!heuristic.decide(11, 10, 1));
        assert!(heuristic.decide(12, 10, 1));

        //after 100 conflicts the factor grows to 2.0
        for _ in 0..100 {
            heuristic.conflict();
        }
        assert!(!heuristic.decide(12, 10, 1));
        assert!(heuristic.decide(22, 10, 1));
    }
}

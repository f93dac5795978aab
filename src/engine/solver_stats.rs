use crate::basic_types::Stopwatch;

/// All the solver statistics in one place.
pub struct SolverStats {
    /// Number of decisions made.
    pub decisions: u64,
    /// Number of variables.
    pub variables: u64,
    /// Number of conflicts during search.
    pub conflicts: u64,
    /// Number of conflicts encountered inside conflict analysis.
    pub conflicts_in_analysis: u64,
    /// Number of restarts.
    pub restarts: u64,
    /// Number of problem constraints.
    pub problem_constraints: u64,
    /// Number of explanation constraints.
    pub explanation_constraints: u64,
    /// Number of removed constraints.
    pub removed_constraints: u64,
    /// Number of created clause constraints.
    pub clause_constraints: u64,
    /// Number of created cardinality constraints.
    pub cardinality_constraints: u64,
    /// Number of created integer constraints.
    pub integer_constraints: u64,
    /// Number of Fourier-Motzkin cuts.
    pub fourier_motzkin_cuts: u64,
    /// Number of dynamic (tightly propagating) cuts.
    pub dynamic_cuts: u64,
    /// Allocated arena memory in words.
    pub arena_capacity: u64,
    /// Used arena memory in words.
    pub arena_size: u64,
    /// Wasted arena memory in words.
    pub arena_wasted: u64,
    /// The timer.
    pub timer: Stopwatch,
}

impl SolverStats {
    pub fn new() -> SolverStats {
        SolverStats {
            decisions: 0,
            variables: 0,
            conflicts: 0,
            conflicts_in_analysis: 0,
            restarts: 0,
            problem_constraints: 0,
            explanation_constraints: 0,
            removed_constraints: 0,
            clause_constraints: 0,
            cardinality_constraints: 0,
            integer_constraints: 0,
            fourier_motzkin_cuts: 0,
            dynamic_cuts: 0,
            arena_capacity: 0,
            arena_size: 0,
            arena_wasted: 0,
            timer: Stopwatch::starting_now(),
        }
    }
}

impl std::fmt::Display for SolverStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Decisions               : {}", self.decisions)?;
        writeln!(f, "Conflicts (search)      : {}", self.conflicts)?;
        writeln!(f, "Conflicts (analysis)    : {}", self.conflicts_in_analysis)?;
        writeln!(f, "Restarts                : {}", self.restarts)?;
        writeln!(f, "Variables               : {}", self.variables)?;
        writeln!(f, "Problem constraints     : {}", self.problem_constraints)?;
        writeln!(f, "Explanations            : {}", self.explanation_constraints)?;
        writeln!(f, "Clause constraints      : {}", self.clause_constraints)?;
        writeln!(f, "Cardinality constraints : {}", self.cardinality_constraints)?;
        writeln!(f, "Integer constraints     : {}", self.integer_constraints)?;
        writeln!(f, "Removed constraints     : {}", self.removed_constraints)?;
        writeln!(f, "Fourier-Motzkin cuts    : {}", self.fourier_motzkin_cuts)?;
        writeln!(f, "Dynamic cuts            : {}", self.dynamic_cuts)?;
        writeln!(f, "Allocated memory        : {}", self.arena_capacity)?;
        writeln!(f, "Used memory             : {}", self.arena_size)?;
        writeln!(f, "Wasted memory           : {}", self.arena_wasted)?;
        writeln!(f, "Elapsed time            : {:.3}s", self.timer.elapsed().as_secs_f64())
    }
}

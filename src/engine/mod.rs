mod conflict_analysis;
mod search_trail;
mod solver;
mod solver_state;
mod solver_stats;
mod variable_info;

pub use conflict_analysis::CoefficientMap;
pub use conflict_analysis::PropagationTag;
pub use search_trail::SearchTrail;
pub use search_trail::TrailEntry;
pub use solver::ConstraintClass;
pub use solver::Solver;
pub use solver::SolverOptions;
pub use solver::SolverStatus;
pub use solver::Verbosity;
pub use solver_state::SolverState;
pub use solver_stats::SolverStats;
pub use variable_info::ValueStatus;
pub use variable_info::VariableInfo;

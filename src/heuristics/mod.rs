mod explanation_removal;
mod restart_luby;

pub use explanation_removal::ExplanationRemovalHeuristic;
pub use restart_luby::LubyRestartHeuristic;

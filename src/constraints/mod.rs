mod constraint_arena;

pub use constraint_arena::ArenaOutOfMemory;
pub use constraint_arena::ConstraintArena;

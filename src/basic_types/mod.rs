mod bound_event;
mod constraint_reference;
mod key_value_heap;
mod literal;
mod stopwatch;
mod variable;

pub use bound_event::BoundEvent;
pub use bound_event::BOUND_EVENT_COUNT;
pub use constraint_reference::ConstraintKind;
pub use constraint_reference::ConstraintReference;
pub use key_value_heap::KeyValueHeap;
pub use key_value_heap::SelectionScore;
pub use literal::BoolLiteral;
pub use literal::IntegerLiteral;
pub use stopwatch::Stopwatch;
pub use variable::Variable;
pub use variable::VariableGeneratorIterator;
pub use variable::VariableType;

/// The events a bound change can generate. `LowerRefine` and `UpperRefine`
/// appear on the trail; `Any` exists only as a watch-list slot for constraints
/// that must wake up on either side (general integer constraints).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BoundEvent {
    LowerRefine = 0,
    UpperRefine = 1,
    Any = 2,
}

pub const BOUND_EVENT_COUNT: usize = 3;

impl std::fmt::Display for BoundEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundEvent::LowerRefine => write!(f, "refine_lower_bound"),
            BoundEvent::UpperRefine => write!(f, "refine_upper_bound"),
            BoundEvent::Any => write!(f, "any"),
        }
    }
}

use bitfield::{Bit, BitMut, BitRange};

use crate::gourd_asserts::*;

/// The three constraint specializations held by the arena.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConstraintKind {
    Clause = 0,
    Cardinality = 1,
    Integer = 2,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintKind::Clause => write!(f, "Clause"),
            ConstraintKind::Cardinality => write!(f, "Cardinality"),
            ConstraintKind::Integer => write!(f, "Integer"),
        }
    }
}

/// A packed reference to a constraint in the arena.
///
/// The information is packed into 64 bits as follows:
/// 1. bits 0-2 hold the constraint kind tag;
/// 2. bit 3 is a free flag bit that watch lists use to mark the polarity of
///    the watched literal; it travels with the reference but never influences
///    which record is addressed;
/// 3. the remaining bits hold the word offset of the record in the arena.
///
/// Relocation during garbage collection must preserve the flag bit: holders
/// clear the flag before looking a reference up in the relocation map and
/// re-apply it to the result.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ConstraintReference {
    code: u64,
}

const KIND_BITS: usize = 3;
const DATA_BITS: usize = KIND_BITS + 1;

impl ConstraintReference {
    pub fn new(kind: ConstraintKind, offset: usize) -> ConstraintReference {
        gourd_assert_moderate!((offset as u64) < (1u64 << (64 - DATA_BITS)));
        ConstraintReference {
            code: (offset as u64) << DATA_BITS | kind as u64,
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match <u64 as BitRange<u64>>::bit_range(&self.code, KIND_BITS - 1, 0) {
            0 => ConstraintKind::Clause,
            1 => ConstraintKind::Cardinality,
            2 => ConstraintKind::Integer,
            tag => panic!("Corrupt constraint reference tag: {}", tag),
        }
    }

    pub fn offset(&self) -> usize {
        (self.code >> DATA_BITS) as usize
    }

    pub fn flagged(&self) -> bool {
        self.code.bit(KIND_BITS)
    }

    pub fn set_flag(self) -> ConstraintReference {
        let mut code = self.code;
        code.set_bit(KIND_BITS, true);
        ConstraintReference { code }
    }

    pub fn clear_flag(self) -> ConstraintReference {
        let mut code = self.code;
        code.set_bit(KIND_BITS, false);
        ConstraintReference { code }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConstraintKind, ConstraintReference};

    #[test]
    fn test_packing_round_trip() {
        for kind in [
            ConstraintKind::Clause,
            ConstraintKind::Cardinality,
            ConstraintKind::Integer,
        ] {
            let reference = ConstraintReference::new(kind, 4196);
            assert!(reference.kind() == kind);
            assert!(reference.offset() == 4196);
            assert!(!reference.flagged());
        }
    }

    #[test]
    fn test_flag_does_not_touch_the_offset() {
        let reference = ConstraintReference::new(ConstraintKind::Integer, 80);
        let flagged = reference.set_flag();
        assert!(flagged.flagged());
        assert!(flagged.offset() == reference.offset());
        assert!(flagged.kind() == reference.kind());
        assert!(flagged.clear_flag() == reference);
    }
}

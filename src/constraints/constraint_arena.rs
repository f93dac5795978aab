use std::collections::HashMap;

use log::trace;
use num_bigint::BigInt;
use num_traits::Signed;

use crate::basic_types::{
    BoolLiteral, ConstraintKind, ConstraintReference, IntegerLiteral, Variable, VariableType,
};
use crate::gourd_asserts::*;

/// Raised when growing the arena fails; the search cannot continue and
/// terminates with the interrupted status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaOutOfMemory;

/// The constraint arena allocates variable-size constraint records inside one
/// contiguous word buffer and hands out packed references. Erased records only
/// increase the wasted counter; the memory is reclaimed by a mark-and-compact
/// garbage collection sweep that fills a relocation map for every holder of a
/// reference.
///
/// A record is laid out as four header words followed by the literal words:
///   word 0: learnt bit, deleted bit, literal count
///   word 1: user count (the number of live bounds this constraint explains)
///   word 2: removal score (f32 bits)
///   word 3: the constant (clause/cardinality store it directly, integer
///           constraints store an index into the big integer pool)
///   rest:   one word per 0/1 literal, or (variable, coefficient index) word
///           pairs for integer literals
///
/// Arbitrary-precision values are not plain words, so the arena owns a side
/// pool of big integers addressed by the index words; the pool is compacted
/// together with the buffer during garbage collection.
pub struct ConstraintArena {
    buffer: Vec<u32>,
    numbers: Vec<BigInt>,
    wasted: usize,
    gc_buffer: Vec<u32>,
    gc_numbers: Vec<BigInt>,
    variables_count: u32,
    variable_occurs_count: Vec<u32>, //[2i] counts negated occurrences of variable i, [2i+1] positive occurrences
}

const HEADER_WORDS: usize = 4;
const WORD_LEARNT: u32 = 1;
const WORD_DELETED: u32 = 2;
const SIZE_SHIFT: usize = 2;

const INITIAL_CAPACITY_WORDS: usize = 1 << 14;

fn align(words: usize) -> usize {
    //records are kept 8-byte aligned
    (words + 1) & !1usize
}

impl ConstraintArena {
    pub fn new() -> ConstraintArena {
        ConstraintArena {
            buffer: Vec::with_capacity(INITIAL_CAPACITY_WORDS),
            numbers: vec![],
            wasted: 0,
            gc_buffer: vec![],
            gc_numbers: vec![],
            variables_count: 0,
            variable_occurs_count: vec![],
        }
    }

    pub fn new_variable(&mut self, variable_type: VariableType) -> Variable {
        let variable = Variable::new(variable_type, self.variables_count);
        self.variables_count += 1;
        self.variable_occurs_count
            .resize(2 * self.variables_count as usize, 0);
        trace!(target: "constraints", "new_variable() => {}", variable);
        variable
    }

    pub fn variables_count(&self) -> u32 {
        self.variables_count
    }

    /// The number of times the variable occurs with the given polarity across
    /// all live constraints.
    pub fn occurrence_count(&self, variable: Variable, negated: bool) -> u32 {
        if negated {
            self.variable_occurs_count[2 * variable.index()]
        } else {
            self.variable_occurs_count[2 * variable.index() + 1]
        }
    }

    fn count_occurrence(&mut self, variable: Variable, negated: bool, delta: i32) {
        let index = 2 * variable.index() + !negated as usize;
        let count = &mut self.variable_occurs_count[index];
        *count = count.wrapping_add_signed(delta);
    }

    pub fn size_words(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity_words(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn wasted_words(&self) -> usize {
        self.wasted
    }

    fn allocate(&mut self, words: usize) -> Result<usize, ArenaOutOfMemory> {
        let words = align(words);
        let required = self.buffer.len() + words;
        if required > self.buffer.capacity() {
            //grow by 1.5x until the request fits
            let mut new_capacity = self.buffer.capacity().max(INITIAL_CAPACITY_WORDS);
            while new_capacity < required {
                new_capacity += new_capacity >> 1;
            }
            self.buffer
                .try_reserve_exact(new_capacity - self.buffer.len())
                .map_err(|_| ArenaOutOfMemory)?;
        }
        let offset = self.buffer.len();
        self.buffer.resize(offset + words, 0);
        Ok(offset)
    }

    fn push_number(&mut self, value: BigInt) -> u32 {
        let index = self.numbers.len() as u32;
        self.numbers.push(value);
        index
    }

    fn write_header(&mut self, offset: usize, num_literals: usize, learnt: bool) {
        self.buffer[offset] = (num_literals as u32) << SIZE_SHIFT | learnt as u32 * WORD_LEARNT;
        self.buffer[offset + 1] = 0;
        self.buffer[offset + 2] = 0f32.to_bits();
    }

    pub fn allocate_clause(
        &mut self,
        literals: &[BoolLiteral],
        constant: i32,
        learnt: bool,
    ) -> Result<ConstraintReference, ArenaOutOfMemory> {
        gourd_assert_simple!(literals.len() >= 2);
        let offset = self.allocate(HEADER_WORDS + literals.len())?;
        self.write_header(offset, literals.len(), learnt);
        self.buffer[offset + 3] = constant as u32;
        for (i, literal) in literals.iter().enumerate() {
            self.buffer[offset + HEADER_WORDS + i] = literal.to_u32();
            self.count_occurrence(literal.variable(), literal.is_negated(), 1);
        }
        let reference = ConstraintReference::new(ConstraintKind::Clause, offset);
        trace!(target: "constraints", "allocate_clause() => {:?}", reference);
        Ok(reference)
    }

    pub fn allocate_cardinality(
        &mut self,
        literals: &[BoolLiteral],
        constant: u32,
        learnt: bool,
    ) -> Result<ConstraintReference, ArenaOutOfMemory> {
        gourd_assert_simple!(literals.len() >= 2);
        let offset = self.allocate(HEADER_WORDS + literals.len())?;
        self.write_header(offset, literals.len(), learnt);
        self.buffer[offset + 3] = constant;
        for (i, literal) in literals.iter().enumerate() {
            self.buffer[offset + HEADER_WORDS + i] = literal.to_u32();
            self.count_occurrence(literal.variable(), literal.is_negated(), 1);
        }
        let reference = ConstraintReference::new(ConstraintKind::Cardinality, offset);
        trace!(target: "constraints", "allocate_cardinality() => {:?}", reference);
        Ok(reference)
    }

    pub fn allocate_integer(
        &mut self,
        literals: &[IntegerLiteral],
        constant: &BigInt,
        learnt: bool,
    ) -> Result<ConstraintReference, ArenaOutOfMemory> {
        gourd_assert_simple!(literals.len() >= 2);
        let offset = self.allocate(HEADER_WORDS + 2 * literals.len())?;
        self.write_header(offset, literals.len(), learnt);
        self.buffer[offset + 3] = self.numbers.len() as u32;
        self.numbers.push(constant.clone());
        for (i, literal) in literals.iter().enumerate() {
            gourd_assert_moderate!(!num_traits::Zero::is_zero(&literal.coefficient));
            self.buffer[offset + HEADER_WORDS + 2 * i] = literal.variable.to_u32();
            let coefficient_index = self.push_number(literal.coefficient.clone());
            self.buffer[offset + HEADER_WORDS + 2 * i + 1] = coefficient_index;
            self.count_occurrence(literal.variable, literal.is_negated(), 1);
        }
        let reference = ConstraintReference::new(ConstraintKind::Integer, offset);
        trace!(target: "constraints", "allocate_integer() => {:?}", reference);
        Ok(reference)
    }

    fn record_words(&self, reference: ConstraintReference) -> usize {
        let literal_words = match reference.kind() {
            ConstraintKind::Clause | ConstraintKind::Cardinality => self.len(reference),
            ConstraintKind::Integer => 2 * self.len(reference),
        };
        align(HEADER_WORDS + literal_words)
    }

    /// Marks the constraint as deleted and accounts its memory as wasted; the
    /// record itself survives until the next garbage collection sweep.
    pub fn erase(&mut self, reference: ConstraintReference) {
        gourd_assert_simple!(!self.in_use(reference));
        gourd_assert_moderate!(!self.is_deleted(reference));

        for i in 0..self.len(reference) {
            let (variable, negated) = match reference.kind() {
                ConstraintKind::Clause | ConstraintKind::Cardinality => {
                    let literal = self.bool_literal(reference, i);
                    (literal.variable(), literal.is_negated())
                }
                ConstraintKind::Integer => (
                    self.integer_variable(reference, i),
                    self.integer_coefficient(reference, i).is_negative(),
                ),
            };
            self.count_occurrence(variable, negated, -1);
        }

        self.buffer[reference.offset()] |= WORD_DELETED;
        self.wasted += self.record_words(reference);
    }
}

//header accessors
impl ConstraintArena {
    pub fn len(&self, reference: ConstraintReference) -> usize {
        (self.buffer[reference.offset()] >> SIZE_SHIFT) as usize
    }

    pub fn is_learnt(&self, reference: ConstraintReference) -> bool {
        self.buffer[reference.offset()] & WORD_LEARNT != 0
    }

    pub fn is_deleted(&self, reference: ConstraintReference) -> bool {
        self.buffer[reference.offset()] & WORD_DELETED != 0
    }

    pub fn users(&self, reference: ConstraintReference) -> u32 {
        self.buffer[reference.offset() + 1]
    }

    pub fn in_use(&self, reference: ConstraintReference) -> bool {
        self.users(reference) > 0
    }

    pub fn add_user(&mut self, reference: ConstraintReference) {
        gourd_assert_moderate!(!self.is_deleted(reference));
        self.buffer[reference.offset() + 1] += 1;
    }

    pub fn remove_user(&mut self, reference: ConstraintReference) {
        gourd_assert_simple!(self.users(reference) > 0);
        self.buffer[reference.offset() + 1] -= 1;
    }

    pub fn score(&self, reference: ConstraintReference) -> f32 {
        f32::from_bits(self.buffer[reference.offset() + 2])
    }

    pub fn set_score(&mut self, reference: ConstraintReference, score: f32) {
        self.buffer[reference.offset() + 2] = score.to_bits();
    }
}

//literal and constant accessors
impl ConstraintArena {
    pub fn bool_literal(&self, reference: ConstraintReference, index: usize) -> BoolLiteral {
        gourd_assert_moderate!(reference.kind() != ConstraintKind::Integer);
        gourd_assert_moderate!(index < self.len(reference));
        BoolLiteral::u32_to_literal(self.buffer[reference.offset() + HEADER_WORDS + index])
    }

    pub fn set_bool_literal(
        &mut self,
        reference: ConstraintReference,
        index: usize,
        literal: BoolLiteral,
    ) {
        gourd_assert_moderate!(reference.kind() != ConstraintKind::Integer);
        gourd_assert_moderate!(index < self.len(reference));
        self.buffer[reference.offset() + HEADER_WORDS + index] = literal.to_u32();
    }

    pub fn swap_bool_literals(&mut self, reference: ConstraintReference, i: usize, j: usize) {
        gourd_assert_moderate!(i < self.len(reference) && j < self.len(reference));
        let base = reference.offset() + HEADER_WORDS;
        self.buffer.swap(base + i, base + j);
    }

    pub fn clause_constant(&self, reference: ConstraintReference) -> i32 {
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Clause);
        self.buffer[reference.offset() + 3] as i32
    }

    pub fn cardinality_constant(&self, reference: ConstraintReference) -> u32 {
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Cardinality);
        self.buffer[reference.offset() + 3]
    }

    pub fn integer_variable(&self, reference: ConstraintReference, index: usize) -> Variable {
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Integer);
        gourd_assert_moderate!(index < self.len(reference));
        Variable::u32_to_variable(self.buffer[reference.offset() + HEADER_WORDS + 2 * index])
    }

    pub fn integer_coefficient(&self, reference: ConstraintReference, index: usize) -> &BigInt {
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Integer);
        gourd_assert_moderate!(index < self.len(reference));
        &self.numbers[self.buffer[reference.offset() + HEADER_WORDS + 2 * index + 1] as usize]
    }

    pub fn integer_literal(&self, reference: ConstraintReference, index: usize) -> IntegerLiteral {
        IntegerLiteral::new(
            self.integer_coefficient(reference, index).clone(),
            self.integer_variable(reference, index),
        )
    }

    pub fn swap_integer_literals(&mut self, reference: ConstraintReference, i: usize, j: usize) {
        gourd_assert_moderate!(i < self.len(reference) && j < self.len(reference));
        let base = reference.offset() + HEADER_WORDS;
        self.buffer.swap(base + 2 * i, base + 2 * j);
        self.buffer.swap(base + 2 * i + 1, base + 2 * j + 1);
    }

    pub fn integer_constant(&self, reference: ConstraintReference) -> &BigInt {
        gourd_assert_moderate!(reference.kind() == ConstraintKind::Integer);
        &self.numbers[self.buffer[reference.offset() + 3] as usize]
    }
}

//mark-and-compact garbage collection
impl ConstraintArena {
    pub fn gc_begin(&mut self) {
        gourd_assert_simple!(self.gc_buffer.is_empty() && self.gc_numbers.is_empty());
        self.gc_buffer = Vec::with_capacity(self.buffer.len());
    }

    /// Moves every live constraint of the given database into the fresh
    /// buffer, recording `old -> new` in the relocation map and replacing the
    /// entries of the database in place.
    pub fn gc_move(
        &mut self,
        constraints: &mut [ConstraintReference],
        relocation_map: &mut HashMap<ConstraintReference, ConstraintReference>,
    ) {
        for entry in constraints.iter_mut() {
            let old_reference = *entry;
            gourd_assert_simple!(!old_reference.flagged());
            gourd_assert_moderate!(!self.is_deleted(old_reference));

            let words = self.record_words(old_reference);
            let new_offset = self.gc_buffer.len();
            let old_offset = old_reference.offset();

            self.gc_buffer
                .extend_from_slice(&self.buffer[old_offset..old_offset + words]);

            //big integer indices are rewritten to point into the compacted pool
            if old_reference.kind() == ConstraintKind::Integer {
                let size = self.len(old_reference);
                for header_relative in
                    std::iter::once(3).chain((0..size).map(|i| HEADER_WORDS + 2 * i + 1))
                {
                    let old_index = self.gc_buffer[new_offset + header_relative] as usize;
                    self.gc_buffer[new_offset + header_relative] = self.gc_numbers.len() as u32;
                    self.gc_numbers.push(self.numbers[old_index].clone());
                }
            }

            let new_reference = ConstraintReference::new(old_reference.kind(), new_offset);
            let previous = relocation_map.insert(old_reference, new_reference);
            gourd_assert_simple!(
                previous.is_none(),
                "A constraint may live in one database only."
            );
            *entry = new_reference;
        }
    }

    pub fn gc_end(&mut self) {
        self.buffer = std::mem::take(&mut self.gc_buffer);
        self.numbers = std::mem::take(&mut self.gc_numbers);
        self.wasted = 0;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use num_bigint::BigInt;

    use super::ConstraintArena;
    use crate::basic_types::{BoolLiteral, IntegerLiteral, VariableType};

    #[test]
    fn test_clause_round_trip() {
        let mut arena = ConstraintArena::new();
        let x = arena.new_variable(VariableType::Integer);
        let y = arena.new_variable(VariableType::Integer);

        let literals = vec![BoolLiteral::new(x, false), BoolLiteral::new(y, true)];
        let reference = arena.allocate_clause(&literals, 0, false).unwrap();

        assert!(arena.len(reference) == 2);
        assert!(!arena.is_learnt(reference));
        assert!(!arena.is_deleted(reference));
        assert!(arena.clause_constant(reference) == 0);
        assert!(arena.bool_literal(reference, 0) == literals[0]);
        assert!(arena.bool_literal(reference, 1) == literals[1]);
        assert!(arena.occurrence_count(x, false) == 1);
        assert!(arena.occurrence_count(y, true) == 1);

        arena.swap_bool_literals(reference, 0, 1);
        assert!(arena.bool_literal(reference, 0) == literals[1]);
    }

    #[test]
    fn test_integer_round_trip() {
        let mut arena = ConstraintArena::new();
        let x = arena.new_variable(VariableType::Integer);
        let y = arena.new_variable(VariableType::Integer);

        let literals = vec![
            IntegerLiteral::new(BigInt::from(3), x),
            IntegerLiteral::new(BigInt::from(-5), y),
        ];
        let reference = arena
            .allocate_integer(&literals, &BigInt::from(7), true)
            .unwrap();

        assert!(arena.is_learnt(reference));
        assert!(*arena.integer_constant(reference) == BigInt::from(7));
        assert!(arena.integer_literal(reference, 0) == literals[0]);
        assert!(arena.integer_literal(reference, 1) == literals[1]);
        assert!(arena.occurrence_count(y, true) == 1);
    }

    #[test]
    fn test_erase_accounts_wasted_memory() {
        let mut arena = ConstraintArena::new();
        let x = arena.new_variable(VariableType::Integer);
        let y = arena.new_variable(VariableType::Integer);

        let literals = vec![BoolLiteral::new(x, false), BoolLiteral::new(y, false)];
        let reference = arena.allocate_clause(&literals, 1, false).unwrap();
        assert!(arena.wasted_words() == 0);

        arena.erase(reference);
        assert!(arena.is_deleted(reference));
        assert!(arena.wasted_words() > 0);
        assert!(arena.occurrence_count(x, false) == 0);
    }

    #[test]
    fn test_gc_relocates_and_preserves_content() {
        let mut arena = ConstraintArena::new();
        let x = arena.new_variable(VariableType::Integer);
        let y = arena.new_variable(VariableType::Integer);

        let erased = arena
            .allocate_clause(&[BoolLiteral::new(x, false), BoolLiteral::new(y, false)], 1, false)
            .unwrap();
        let kept_literals = vec![
            IntegerLiteral::new(BigInt::from(2), x),
            IntegerLiteral::new(BigInt::from(3), y),
        ];
        let kept = arena
            .allocate_integer(&kept_literals, &BigInt::from(4), false)
            .unwrap();
        arena.erase(erased);

        let mut database = vec![kept];
        let mut relocation_map = HashMap::new();
        arena.gc_begin();
        arena.gc_move(&mut database, &mut relocation_map);
        arena.gc_end();

        assert!(arena.wasted_words() == 0);
        let relocated = relocation_map[&kept];
        assert!(database[0] == relocated);
        assert!(arena.len(relocated) == 2);
        assert!(*arena.integer_constant(relocated) == BigInt::from(4));
        assert!(arena.integer_literal(relocated, 0) == kept_literals[0]);
        assert!(arena.integer_literal(relocated, 1) == kept_literals[1]);
    }

    #[test]
    fn test_gc_on_compact_arena_changes_nothing() {
        let mut arena = ConstraintArena::new();
        let x = arena.new_variable(VariableType::Integer);
        let y = arena.new_variable(VariableType::Integer);

        let reference = arena
            .allocate_clause(&[BoolLiteral::new(x, false), BoolLiteral::new(y, true)], 0, false)
            .unwrap();
        let size_before = arena.size_words();

        let mut database = vec![reference];
        let mut relocation_map = HashMap::new();
        arena.gc_begin();
        arena.gc_move(&mut database, &mut relocation_map);
        arena.gc_end();

        //with zero wasted words the sweep is an identity
        assert!(relocation_map[&reference] == reference);
        assert!(database[0] == reference);
        assert!(arena.size_words() == size_before);
        assert!(arena.bool_literal(reference, 1) == BoolLiteral::new(y, true));
    }
}

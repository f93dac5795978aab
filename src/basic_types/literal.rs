use num_bigint::BigInt;
use num_traits::Signed;

use super::Variable;

/// A 0/1 literal: a variable plus a sign bit. Both clause and cardinality
/// constraints store their literals in this form; the numeric value of the
/// literal is 1 if the underlying variable satisfies the sign and 0 otherwise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct BoolLiteral {
    code: u32,
}

impl BoolLiteral {
    pub fn new(variable: Variable, negated: bool) -> BoolLiteral {
        BoolLiteral {
            code: variable.id() * 2 + negated as u32,
        }
    }

    pub fn is_negated(&self) -> bool {
        (self.code & 1) == 1
    }

    pub fn variable(&self) -> Variable {
        Variable::new(crate::basic_types::VariableType::Integer, self.code / 2)
    }

    /// The coefficient the literal contributes when viewed as a linear term.
    pub fn coefficient(&self) -> i32 {
        if self.is_negated() {
            -1
        } else {
            1
        }
    }

    /// The 0/1 value of the literal given the value of its variable.
    pub fn value(&self, variable_value: &BigInt) -> u32 {
        let variable_is_positive = variable_value.is_positive();
        if self.is_negated() {
            !variable_is_positive as u32
        } else {
            variable_is_positive as u32
        }
    }

    pub fn to_u32(self) -> u32 {
        self.code
    }

    pub fn u32_to_literal(code: u32) -> BoolLiteral {
        BoolLiteral { code }
    }
}

impl std::ops::Not for BoolLiteral {
    type Output = BoolLiteral;
    fn not(self) -> BoolLiteral {
        BoolLiteral::new(self.variable(), !self.is_negated())
    }
}

impl std::fmt::Display for BoolLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_negated() {
            write!(f, "~{}", self.variable())
        } else {
            write!(f, "{}", self.variable())
        }
    }
}

/// An integer literal: a non-zero arbitrary-precision coefficient times a
/// variable. Its numeric value is `coefficient * value(variable)`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct IntegerLiteral {
    pub coefficient: BigInt,
    pub variable: Variable,
}

impl IntegerLiteral {
    pub fn new(coefficient: BigInt, variable: Variable) -> IntegerLiteral {
        IntegerLiteral {
            coefficient,
            variable,
        }
    }

    pub fn is_negated(&self) -> bool {
        self.coefficient.is_negative()
    }

    pub fn value(&self, variable_value: &BigInt) -> BigInt {
        &self.coefficient * variable_value
    }
}

impl std::fmt::Display for IntegerLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}*{}", self.coefficient, self.variable)
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigInt;

    use super::BoolLiteral;
    use crate::basic_types::{Variable, VariableType};

    #[test]
    fn test_negation() {
        let variable = Variable::new(VariableType::Integer, 7);
        let literal = BoolLiteral::new(variable, false);
        assert!(!literal.is_negated());
        assert!((!literal).is_negated());
        assert!(!(!(!literal)).is_negated());
        assert!(literal.variable() == (!literal).variable());
    }

    #[test]
    fn test_value() {
        let variable = Variable::new(VariableType::Integer, 0);
        let positive = BoolLiteral::new(variable, false);
        let negative = BoolLiteral::new(variable, true);

        assert!(positive.value(&BigInt::from(1)) == 1);
        assert!(positive.value(&BigInt::from(0)) == 0);
        assert!(negative.value(&BigInt::from(1)) == 0);
        assert!(negative.value(&BigInt::from(0)) == 1);
    }
}

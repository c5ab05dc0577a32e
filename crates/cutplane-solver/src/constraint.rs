use std::collections::BTreeMap;
use std::fmt;

use num_rational::BigRational;
use num_traits::Signed;

use crate::numeric::int;
use crate::polynomial::Polynomial;

/// The two-sided bound `0 <= poly <= range - 1` on an integer-valued expression
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeConstraint {
    pub poly: Polynomial,
    pub range: i64,
}

impl RangeConstraint {
    pub fn new(poly: Polynomial, range: i64) -> Self {
        Self { poly, range }
    }

    /// Whether `assignment` (original variable names) puts `poly` inside the range.
    /// An unassigned variable makes the constraint unsatisfied.
    pub fn is_satisfied_by(&self, assignment: &BTreeMap<String, BigRational>) -> bool {
        match self.poly.evaluate(assignment) {
            Some(value) => !value.is_negative() && value <= int(self.range - 1),
            None => false,
        }
    }
}

impl fmt::Display for RangeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0 <= {} < {}", self.poly, self.range)
    }
}

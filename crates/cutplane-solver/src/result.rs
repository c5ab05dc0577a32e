use std::collections::BTreeMap;

use num_rational::BigRational;
use num_traits::Zero;

use crate::polynomial::Polynomial;
use crate::standard_form::{NEG_SUFFIX, POS_SUFFIX};

/// Typed outcome of a single solve
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// An optimal integer solution was found
    Optimal,
    /// The range constraints admit no rational point
    EmptyFeasibleRegion,
    /// The LP relaxation is unbounded
    Unbounded,
    /// The relaxation is feasible but contains no integer point
    IntegerInfeasible,
}

/// Optimal solution for one objective
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IlpResult {
    /// The objective that was minimized
    pub objective: Polynomial,
    /// Its optimal value, constant term included
    pub value: BigRational,
    /// Value of every standard-form variable (`v_pos`, `v_neg`, `slackN`)
    pub solution: BTreeMap<String, BigRational>,
}

impl IlpResult {
    /// Values of the original variables, recombined as `v = v_pos - v_neg`.
    ///
    /// The solver reports split variables as they are; this is for callers
    /// that want the original names back.
    pub fn original_values(&self) -> BTreeMap<String, BigRational> {
        let mut values = BTreeMap::new();
        for (name, value) in &self.solution {
            let Some(base) = name.strip_suffix(POS_SUFFIX) else {
                continue;
            };
            let negative = self
                .solution
                .get(&format!("{}{}", base, NEG_SUFFIX))
                .cloned()
                .unwrap_or_else(BigRational::zero);
            values.insert(base.to_string(), value - negative);
        }
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::int;

    #[test]
    fn test_original_values() {
        let solution: BTreeMap<String, BigRational> = [
            ("x_pos", 0),
            ("x_neg", 2),
            ("y_pos", 5),
            ("y_neg", 1),
            ("slack0", 7),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), int(v)))
        .collect();
        let result = IlpResult {
            objective: Polynomial::var("x"),
            value: int(-2),
            solution,
        };
        let values = result.original_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values["x"], int(-2));
        assert_eq!(values["y"], int(4));
    }
}

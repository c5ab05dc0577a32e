use std::collections::BTreeMap;

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::constraint::RangeConstraint;
use crate::error::IlpError;
use crate::numeric::{denominator_lcm, int};
use crate::polynomial::{CONSTANT, Polynomial};
use crate::tableau::Tableau;

pub const POS_SUFFIX: &str = "_pos";
pub const NEG_SUFFIX: &str = "_neg";

pub fn slack_name(index: usize) -> String {
    format!("slack{}", index)
}

/// Builds the initial tableau for minimizing `objective` over the integer
/// points satisfying `constraints`.
///
/// Every variable `v` is split into `v_pos - v_neg` (both non-negative) and
/// each side of every range gets its own slack, so `0 <= p <= range - 1`
/// becomes the two equality rows `p - slack_i = 0` and
/// `p + slack_{i+1} - range + 1 = 0`. Columns are shared across constraints
/// and numbered in first-seen order.
pub fn make_standard_form_tableau(
    constraints: &[RangeConstraint],
    objective: &Polynomial,
) -> Result<Tableau, IlpError> {
    let mut columns = Columns::default();
    let mut lp_constraints: Vec<Polynomial> = Vec::with_capacity(constraints.len() * 2);
    let mut slack_count = 0;

    for c in constraints {
        let mut poly = c.poly.clone();
        let local_vars: Vec<String> = poly.variables().map(str::to_string).collect();
        for var in &local_vars {
            let pos = format!("{}{}", var, POS_SUFFIX);
            let neg = format!("{}{}", var, NEG_SUFFIX);
            poly.substitute(var, &(Polynomial::var(&pos) - Polynomial::var(&neg)));
            columns.register_pair(pos, neg);
        }

        // Scale to integer coefficients so slacks stay integral at integer
        // points; Gomory cuts are only valid over all-integer rows.
        let scale = BigRational::from_integer(denominator_lcm(poly.terms().map(|(_, c)| c)));
        let poly = poly.scaled(&scale);
        let upper = scale * (int(c.range) - BigRational::one());

        let lower_slack = slack_name(slack_count);
        lp_constraints.push(&poly - &Polynomial::var(&lower_slack));
        columns.register(lower_slack);
        slack_count += 1;

        let upper_slack = slack_name(slack_count);
        lp_constraints.push(&poly + &Polynomial::var(&upper_slack) - Polynomial::constant(upper));
        columns.register(upper_slack);
        slack_count += 1;
    }

    let Columns {
        names,
        index,
        opposites,
    } = columns;
    let cols = names.len() + 2;
    let mut tableau = Tableau::new(lp_constraints.len() + 1, cols, names).with_opposites(opposites);
    write_objective_row(&mut tableau, objective)?;

    let rhs = tableau.rhs_col();
    for (i, poly) in lp_constraints.iter().enumerate() {
        let row = i + 1;
        // The RHS column must be non-negative: keep the row's sign when the
        // constant is non-positive (it moves across as -constant), else negate.
        let keep_sign = !poly.constant_term().is_positive();
        for (name, coeff) in poly.terms() {
            let value = if keep_sign { coeff.clone() } else { -coeff };
            if name == CONSTANT {
                tableau.set(row, rhs, -value);
            } else {
                let col = *index
                    .get(name)
                    .ok_or_else(|| IlpError::UnknownVariable(name.to_string()))?;
                tableau.set(row, col, value);
            }
        }
    }

    Ok(tableau)
}

/// Overwrites row 0 with `objective`, using the `_pos`/`_neg` pairs recorded
/// in the tableau's opposites table. Leaves the row un-priced.
pub fn write_objective_row(tableau: &mut Tableau, objective: &Polynomial) -> Result<(), IlpError> {
    let pairs: BTreeMap<String, (usize, usize)> = tableau
        .opposites()
        .iter()
        .filter_map(|(&pos, &neg)| {
            tableau.var_names()[pos - 1]
                .strip_suffix(POS_SUFFIX)
                .map(|base| (base.to_string(), (pos, neg)))
        })
        .collect();

    if let Some(unknown) = objective.variables().find(|v| !pairs.contains_key(*v)) {
        return Err(IlpError::UnknownVariable(unknown.to_string()));
    }

    for col in 0..tableau.cols() {
        tableau.set(0, col, BigRational::zero());
    }
    tableau.set(0, 0, BigRational::one());
    for (base, &(pos, neg)) in &pairs {
        let coeff = objective.coefficient(base);
        if coeff.is_zero() {
            continue;
        }
        // Reversed signs: the first row holds -objective
        tableau.set(0, pos, -&coeff);
        tableau.set(0, neg, coeff);
    }
    Ok(())
}

#[derive(Default)]
struct Columns {
    names: Vec<String>,
    index: BTreeMap<String, usize>,
    opposites: BTreeMap<usize, usize>,
}

impl Columns {
    /// Column 0 is the objective column, so variables start at 1.
    fn register(&mut self, name: String) -> usize {
        if let Some(&col) = self.index.get(&name) {
            return col;
        }
        let col = self.names.len() + 1;
        self.index.insert(name.clone(), col);
        self.names.push(name);
        col
    }

    fn register_pair(&mut self, pos: String, neg: String) {
        let pos = self.register(pos);
        let neg = self.register(neg);
        self.opposites.insert(pos, neg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::ratio;

    fn row(tableau: &Tableau, i: usize) -> Vec<BigRational> {
        tableau.row(i).to_vec()
    }

    fn ints(values: &[i64]) -> Vec<BigRational> {
        values.iter().map(|&v| int(v)).collect()
    }

    #[test]
    fn test_sum_constraint_layout() {
        // 0 <= x + y <= 3, minimize -x - y
        let constraints = vec![RangeConstraint::new(Polynomial::var("x") + Polynomial::var("y"), 4)];
        let objective = -(Polynomial::var("x") + Polynomial::var("y"));
        let t = make_standard_form_tableau(&constraints, &objective).unwrap();

        assert_eq!(
            t.var_names(),
            &["x_pos", "x_neg", "y_pos", "y_neg", "slack0", "slack1"]
        );
        assert_eq!(row(&t, 0), ints(&[1, 1, -1, 1, -1, 0, 0, 0]));
        assert_eq!(row(&t, 1), ints(&[0, 1, -1, 1, -1, -1, 0, 0]));
        assert_eq!(row(&t, 2), ints(&[0, 1, -1, 1, -1, 0, 1, 3]));
        assert_eq!(t.opposites(), &BTreeMap::from([(1, 2), (3, 4)]));
    }

    #[test]
    fn test_positive_constant_negates_row() {
        // 0 <= 3 - x <= 3
        let constraints = vec![RangeConstraint::new(
            Polynomial::constant(int(3)) - Polynomial::var("x"),
            4,
        )];
        let t = make_standard_form_tableau(&constraints, &Polynomial::zero()).unwrap();
        // 3 - x - slack0 = 0 is stored as x + slack0 = 3
        assert_eq!(row(&t, 1), ints(&[0, 1, -1, 1, 0, 3]));
        // -x + slack1 = 0
        assert_eq!(row(&t, 2), ints(&[0, -1, 1, 0, 1, 0]));
    }

    #[test]
    fn test_constant_only_constraint_still_gets_slacks() {
        let constraints = vec![RangeConstraint::new(Polynomial::constant(int(2)), 5)];
        let t = make_standard_form_tableau(&constraints, &Polynomial::zero()).unwrap();
        assert_eq!(t.var_names(), &["slack0", "slack1"]);
        assert_eq!(t.rows(), 3);
        assert_eq!(row(&t, 1), ints(&[0, 1, 0, 2]));
        assert_eq!(row(&t, 2), ints(&[0, 0, 1, 2]));
    }

    #[test]
    fn test_rational_coefficients_are_scaled() {
        // 0 <= x/2 <= 2 becomes 0 <= x <= 4
        let constraints = vec![RangeConstraint::new(Polynomial::term("x", ratio(1, 2)), 3)];
        let t = make_standard_form_tableau(&constraints, &Polynomial::zero()).unwrap();
        assert_eq!(row(&t, 1), ints(&[0, 1, -1, -1, 0, 0]));
        assert_eq!(row(&t, 2), ints(&[0, 1, -1, 0, 1, 4]));
    }

    #[test]
    fn test_unknown_objective_variable() {
        let constraints = vec![RangeConstraint::new(Polynomial::var("x"), 3)];
        let err = make_standard_form_tableau(&constraints, &Polynomial::var("z")).unwrap_err();
        assert_eq!(err, IlpError::UnknownVariable("z".to_string()));
    }

    #[test]
    fn test_columns_shared_across_constraints() {
        let constraints = vec![
            RangeConstraint::new(Polynomial::var("x"), 3),
            RangeConstraint::new(Polynomial::var("x") + Polynomial::var("y"), 5),
        ];
        let t = make_standard_form_tableau(&constraints, &Polynomial::zero()).unwrap();
        assert_eq!(
            t.var_names(),
            &["x_pos", "x_neg", "slack0", "slack1", "y_pos", "y_neg", "slack2", "slack3"]
        );
        assert_eq!(t.rows(), 5);
    }

    #[test]
    fn test_deterministic() {
        let constraints = vec![
            RangeConstraint::new(Polynomial::var("j") - Polynomial::var("i"), 7),
            RangeConstraint::new(Polynomial::var("i") + Polynomial::term("k", int(4)), 16),
        ];
        let objective = Polynomial::var("k") - Polynomial::term("j", int(2));
        let a = make_standard_form_tableau(&constraints, &objective).unwrap();
        let b = make_standard_form_tableau(&constraints, &objective).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_extreme_range_does_not_overflow() {
        let constraints = vec![RangeConstraint::new(Polynomial::var("x"), i64::MIN)];
        let t = make_standard_form_tableau(&constraints, &Polynomial::zero()).unwrap();
        // x + slack1 = i64::MIN - 1, stored negated with a positive RHS
        assert_eq!(t.get(2, t.rhs_col()), &(int(1) - int(i64::MIN)));
        assert_eq!(row(&t, 2)[..5], ints(&[0, -1, 1, 0, -1])[..]);
    }

    #[test]
    fn test_write_objective_row_overwrites() {
        let constraints = vec![RangeConstraint::new(Polynomial::var("x") + Polynomial::var("y"), 4)];
        let mut t = make_standard_form_tableau(&constraints, &Polynomial::var("x")).unwrap();
        write_objective_row(&mut t, &Polynomial::term("y", int(3))).unwrap();
        assert_eq!(row(&t, 0), ints(&[1, 0, 0, -3, 3, 0, 0, 0]));
    }
}

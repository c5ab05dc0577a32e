use num_rational::BigRational;
use num_traits::One;
use tracing::trace;

use crate::numeric::fractional_part;
use crate::tableau::Tableau;

/// Adds the Gomory fractional cut derived from `row` of a canonical tableau.
///
/// For the row `x_B + sum(a_j * x_j) = b` the cut is
/// `sum(frac(a_j) * x_j) - s = frac(b)` with a fresh slack `s >= 0` (named
/// `slack_name`). Every integer point of the original rows satisfies it, the
/// current vertex (non-basic columns at zero) does not when `frac(b) > 0`.
/// The returned tableau has one more row and column and is not canonical.
pub fn add_gomory_cut(tableau: &Tableau, row: usize, slack_name: impl Into<String>) -> Tableau {
    let mut cut = tableau.extended(slack_name);
    let new_row = tableau.rows();
    let old_rhs = tableau.rhs_col();

    for col in 0..old_rhs {
        cut.set(new_row, col, fractional_part(tableau.get(row, col)));
    }
    cut.set(new_row, old_rhs, -BigRational::one());
    cut.set(new_row, cut.rhs_col(), fractional_part(tableau.get(row, old_rhs)));

    trace!(row, cut = ?cut.row(new_row), "built Gomory cut");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{int, ratio};
    use crate::tableau::LpStatus;

    /// minimize -x subject to 2x + s = 3
    fn half_integral_lp() -> Tableau {
        let mut t = Tableau::new(2, 4, vec!["x".to_string(), "s".to_string()]);
        t.set(0, 0, int(1));
        t.set(0, 1, int(1));
        t.set(1, 1, int(2));
        t.set(1, 2, int(1));
        t.set(1, 3, int(3));
        t
    }

    /// `row . [z, vars.., rhs]` residual for a full assignment of the variable columns
    fn residual(t: &Tableau, row: usize, values: &[BigRational]) -> BigRational {
        let lhs: BigRational = values
            .iter()
            .enumerate()
            .map(|(j, v)| t.get(row, j + 1) * v)
            .sum();
        lhs - t.get(row, t.rhs_col())
    }

    #[test]
    fn test_cut_shape() {
        let mut t = half_integral_lp();
        assert_eq!(t.make_optimal(false), LpStatus::Optimal);
        assert_eq!(t.solution(), vec![ratio(3, 2), int(0)]);

        let cut = add_gomory_cut(&t, 1, "cut0");
        assert_eq!(cut.rows(), 3);
        assert_eq!(cut.cols(), 5);
        assert_eq!(cut.var_names(), &["x", "s", "cut0"]);
        // x + s/2 = 3/2  =>  s/2 - cut0 = 1/2
        assert_eq!(
            cut.row(2),
            &[int(0), int(0), ratio(1, 2), int(-1), ratio(1, 2)]
        );
        // earlier rows get a zero in the new column and keep their RHS
        assert_eq!(cut.get(1, 3), &int(0));
        assert_eq!(cut.get(1, 4), &ratio(3, 2));
    }

    #[test]
    fn test_cut_separates_fractional_vertex() {
        let mut t = half_integral_lp();
        assert_eq!(t.make_optimal(false), LpStatus::Optimal);
        let cut = add_gomory_cut(&t, 1, "cut0");

        // The fractional vertex x = 3/2, s = 0 would need cut0 = -1/2
        let vertex_slack = -(ratio(1, 2));
        assert!(vertex_slack < int(0));
        assert_eq!(
            residual(&cut, 2, &[ratio(3, 2), int(0), vertex_slack]),
            int(0)
        );

        // Integer points x in {0, 1} (s = 3 - 2x) keep every row satisfied
        // with a non-negative cut slack.
        for x in 0..=1 {
            let s = int(3 - 2 * x);
            let cut_slack = &s / int(2) - ratio(1, 2);
            assert!(cut_slack >= int(0));
            let values = [int(x), s, cut_slack];
            assert_eq!(residual(&cut, 2, &values), int(0));
        }
    }

    #[test]
    fn test_cut_reaches_integer_optimum() {
        let mut t = half_integral_lp();
        assert_eq!(t.make_optimal(false), LpStatus::Optimal);
        assert_eq!(t.objective_value(), ratio(-3, 2));

        let mut cut = add_gomory_cut(&t, 1, "cut0");
        assert_eq!(cut.make_optimal(false), LpStatus::Optimal);
        assert_eq!(cut.objective_value(), int(-1));
        assert_eq!(cut.solution(), vec![int(1), int(1), int(0)]);
    }
}

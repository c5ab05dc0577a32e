use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use tracing::trace;

/// Outcome of driving a tableau to optimality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    /// An optimal vertex was reached
    Optimal,
    /// The constraints admit no point
    Infeasible,
    /// The objective decreases without bound
    Unbounded,
}

/// Dense simplex tableau over exact rationals.
///
/// Layout: row 0 is the objective row `[1, -c, 0]` encoding `z - c.x = 0`
/// (the objective is minimized), rows `1..` are equality constraints
/// `a.x = b`. Column 0 is the `z` column, the last column holds the
/// right-hand sides, and columns `1..=n` line up with `var_names`.
///
/// The tableau is canonical when every constraint row has a basic column
/// (a unit column with a 1 in that row), every RHS is non-negative and the
/// objective row is zero on the basic columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tableau {
    data: Vec<Vec<BigRational>>,
    var_names: Vec<String>,
    /// `*_pos` column -> `*_neg` column
    opposites: BTreeMap<usize, usize>,
    /// Basic column of each row, row 0 included (column 0). Empty when not canonical.
    basis: Vec<usize>,
}

impl Tableau {
    /// A zero tableau. `cols` must be `var_names.len() + 2`.
    pub fn new(rows: usize, cols: usize, var_names: Vec<String>) -> Self {
        assert!(rows >= 1, "tableau needs an objective row");
        assert_eq!(
            var_names.len() + 2,
            cols,
            "tableau columns must line up with variable names"
        );
        Self {
            data: vec![vec![BigRational::zero(); cols]; rows],
            var_names,
            opposites: BTreeMap::new(),
            basis: Vec::new(),
        }
    }

    pub fn with_opposites(mut self, opposites: BTreeMap<usize, usize>) -> Self {
        self.opposites = opposites;
        self
    }

    /// Copy with one extra (zero) row at the bottom and one extra (zero)
    /// column named `name` just before the RHS column. Opposites carry over;
    /// the copy is not canonical.
    pub fn extended(&self, name: impl Into<String>) -> Tableau {
        let rhs = self.rhs_col();
        let mut data: Vec<Vec<BigRational>> = self
            .data
            .iter()
            .map(|row| {
                let mut out = Vec::with_capacity(row.len() + 1);
                out.extend_from_slice(&row[..rhs]);
                out.push(BigRational::zero());
                out.push(row[rhs].clone());
                out
            })
            .collect();
        data.push(vec![BigRational::zero(); self.cols() + 1]);

        let mut var_names = self.var_names.clone();
        var_names.push(name.into());

        Tableau {
            data,
            var_names,
            opposites: self.opposites.clone(),
            basis: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.data.len()
    }

    pub fn cols(&self) -> usize {
        self.data[0].len()
    }

    pub fn rhs_col(&self) -> usize {
        self.cols() - 1
    }

    pub fn get(&self, row: usize, col: usize) -> &BigRational {
        &self.data[row][col]
    }

    /// Overwrites one entry. Editing row 0 keeps the basis; call
    /// [`Tableau::price_out`] afterwards. Editing constraint rows requires
    /// re-canonicalization (`make_optimal(false)`).
    pub fn set(&mut self, row: usize, col: usize, value: BigRational) {
        self.data[row][col] = value;
    }

    pub fn row(&self, row: usize) -> &[BigRational] {
        &self.data[row]
    }

    pub fn var_names(&self) -> &[String] {
        &self.var_names
    }

    pub fn opposites(&self) -> &BTreeMap<usize, usize> {
        &self.opposites
    }

    pub fn basis(&self) -> &[usize] {
        &self.basis
    }

    pub fn is_canonical(&self) -> bool {
        !self.basis.is_empty()
    }

    /// Brings the tableau to canonical form. Returns `false` when the
    /// constraints admit no point.
    ///
    /// Existing unit columns are reused as basic columns; every other row gets
    /// an artificial column and phase 1 minimizes their sum. Rows that turn
    /// out to be linear combinations of the others are removed.
    pub fn convert_to_canonical_form(&mut self) -> bool {
        self.basis.clear();
        let rows = self.rows();
        let rhs = self.rhs_col();

        for row in self.data.iter_mut().skip(1) {
            if row[rhs].is_negative() {
                for value in row.iter_mut() {
                    *value = -value.clone();
                }
            }
        }

        let mut basis: Vec<Option<usize>> = vec![None; rows];
        basis[0] = Some(0);
        for col in 1..rhs {
            if let Some(row) = self.unit_row(col) {
                if basis[row].is_none() {
                    basis[row] = Some(col);
                }
            }
        }

        let missing: Vec<usize> = (1..rows).filter(|&i| basis[i].is_none()).collect();
        let basis = if missing.is_empty() {
            basis.into_iter().flatten().collect()
        } else {
            match self.phase_one(&basis, &missing) {
                Some(basis) => basis,
                None => return false,
            }
        };

        self.basis = basis;
        self.price_out();
        true
    }

    /// Drives the tableau to an optimal vertex, canonicalizing first unless
    /// `already_canonical` is set (and the tableau actually has a basis).
    pub fn make_optimal(&mut self, already_canonical: bool) -> LpStatus {
        let canonical = already_canonical && self.is_canonical();
        if !canonical && !self.convert_to_canonical_form() {
            return LpStatus::Infeasible;
        }
        let rows = self.rows();
        let rhs = self.rhs_col();
        run_simplex(&mut self.data, &mut self.basis, 0, 1..rows, rhs)
    }

    /// Re-derives the objective row's reduced costs for the current basis,
    /// after an external edit to row 0.
    pub fn price_out(&mut self) {
        let (objective, constraints) = self.data.split_at_mut(1);
        let objective = &mut objective[0];
        for (row, &col) in constraints.iter().zip(self.basis.iter().skip(1)) {
            let factor = objective[col].clone();
            if factor.is_zero() {
                continue;
            }
            for (target, value) in objective.iter_mut().zip(row) {
                *target -= &factor * value;
            }
        }
    }

    /// Objective value at the current vertex
    pub fn objective_value(&self) -> BigRational {
        self.data[0][self.rhs_col()].clone()
    }

    /// Value of every variable column at the current vertex (basic columns
    /// take their row's RHS, non-basic ones are zero).
    pub fn solution(&self) -> Vec<BigRational> {
        let rhs = self.rhs_col();
        let mut values = vec![BigRational::zero(); self.var_names.len()];
        for (row, &col) in self.basis.iter().enumerate().skip(1) {
            values[col - 1] = self.data[row][rhs].clone();
        }
        values
    }

    /// The constraint row in which `col` is a unit vector, if any
    fn unit_row(&self, col: usize) -> Option<usize> {
        let mut found = None;
        for (i, row) in self.data.iter().enumerate().skip(1) {
            let value = &row[col];
            if value.is_zero() {
                continue;
            }
            if !value.is_one() || found.is_some() {
                return None;
            }
            found = Some(i);
        }
        found
    }

    fn phase_one(&mut self, partial: &[Option<usize>], missing: &[usize]) -> Option<Vec<usize>> {
        let rows = self.rows();
        let real = self.rhs_col();
        let artificial = missing.len();
        let rhs = real + artificial;

        let mut work: Vec<Vec<BigRational>> = self
            .data
            .iter()
            .map(|row| {
                let mut out = Vec::with_capacity(rhs + 1);
                out.extend_from_slice(&row[..real]);
                out.extend(std::iter::repeat_with(BigRational::zero).take(artificial));
                out.push(row[real].clone());
                out
            })
            .collect();

        let mut basis: Vec<usize> = partial.iter().map(|b| b.unwrap_or(0)).collect();
        for (k, &row) in missing.iter().enumerate() {
            work[row][real + k] = BigRational::one();
            basis[row] = real + k;
        }

        // Auxiliary objective "minimize the sum of artificials", already priced
        // out: the sum of the rows that own an artificial, zero on artificials.
        let mut aux = vec![BigRational::zero(); rhs + 1];
        for &row in missing {
            for (target, value) in aux.iter_mut().zip(&work[row]) {
                *target += value;
            }
        }
        for value in &mut aux[real..rhs] {
            *value = BigRational::zero();
        }
        work.push(aux);

        if run_simplex(&mut work, &mut basis, rows, 1..rows, rhs) != LpStatus::Optimal {
            return None;
        }
        if !work[rows][rhs].is_zero() {
            trace!(residual = %work[rows][rhs], "phase 1 left artificials positive");
            return None;
        }

        let mut redundant = Vec::new();
        for row in 1..rows {
            if basis[row] < real {
                continue;
            }
            match (1..real).find(|&col| !work[row][col].is_zero()) {
                Some(col) => pivot(&mut work, &mut basis, row, col),
                None => redundant.push(row),
            }
        }
        if !redundant.is_empty() {
            trace!(rows = ?redundant, "dropping redundant constraint rows");
        }

        work.pop();
        let mut data = Vec::with_capacity(rows - redundant.len());
        let mut kept_basis = Vec::with_capacity(rows - redundant.len());
        for (i, mut row) in work.into_iter().enumerate() {
            if redundant.contains(&i) {
                continue;
            }
            let rhs_value = row[rhs].clone();
            row.truncate(real);
            row.push(rhs_value);
            data.push(row);
            kept_basis.push(basis[i]);
        }
        self.data = data;
        Some(kept_basis)
    }
}

/// Primal simplex with Bland's rule on `mat`, optimizing `obj_row` over the
/// constraint rows in `rows`. Columns `1..enter_end` may enter the basis.
fn run_simplex(
    mat: &mut [Vec<BigRational>],
    basis: &mut [usize],
    obj_row: usize,
    rows: Range<usize>,
    enter_end: usize,
) -> LpStatus {
    let rhs = mat[obj_row].len() - 1;
    loop {
        let Some(col) = (1..enter_end).find(|&j| mat[obj_row][j].is_positive()) else {
            return LpStatus::Optimal;
        };

        let mut leaving: Option<(usize, BigRational)> = None;
        for i in rows.clone() {
            let coeff = &mat[i][col];
            if !coeff.is_positive() {
                continue;
            }
            let ratio = &mat[i][rhs] / coeff;
            let better = match &leaving {
                None => true,
                Some((best_row, best)) => {
                    ratio < *best || (ratio == *best && basis[i] < basis[*best_row])
                }
            };
            if better {
                leaving = Some((i, ratio));
            }
        }

        let Some((row, _)) = leaving else {
            return LpStatus::Unbounded;
        };
        pivot(mat, basis, row, col);
    }
}

fn pivot(mat: &mut [Vec<BigRational>], basis: &mut [usize], row: usize, col: usize) {
    let pivot_value = mat[row][col].clone();
    for value in mat[row].iter_mut() {
        *value /= &pivot_value;
    }
    let pivot_row = mat[row].clone();
    for (i, other) in mat.iter_mut().enumerate() {
        if i == row {
            continue;
        }
        let factor = other[col].clone();
        if factor.is_zero() {
            continue;
        }
        for (target, value) in other.iter_mut().zip(&pivot_row) {
            *target -= &factor * value;
        }
    }
    basis[row] = col;
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[z, {}, rhs]", self.var_names.join(", "))?;
        for row in &self.data {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "[{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

use std::collections::BTreeMap;

use num_rational::BigRational;
use tracing::debug;

use crate::branch_bound::{Incumbent, Search};
use crate::constraint::RangeConstraint;
use crate::error::IlpError;
use crate::polynomial::Polynomial;
use crate::result::{IlpResult, SolveStatus};
use crate::standard_form::{make_standard_form_tableau, write_objective_row};
use crate::tableau::Tableau;

/// Exact integer linear programming solver using Gomory cutting planes
#[derive(Debug, Clone)]
pub struct IlpSolver {
    /// Maximum number of cuts per search before giving up
    max_cuts: usize,
    var_names: Vec<String>,
    incumbent: Option<Incumbent>,
}

impl Default for IlpSolver {
    fn default() -> Self {
        Self {
            max_cuts: 10_000,
            var_names: Vec::new(),
            incumbent: None,
        }
    }
}

impl IlpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_cuts(mut self, max: usize) -> Self {
        self.max_cuts = max;
        self
    }

    /// Minimizes `objective` over the integer points satisfying every
    /// constraint. The solution stays available through the accessors until
    /// the next solve.
    pub fn solve(
        &mut self,
        constraints: &[RangeConstraint],
        objective: &Polynomial,
    ) -> Result<SolveStatus, IlpError> {
        debug!(constraints = constraints.len(), objective = %objective, "solving");
        self.incumbent = None;

        let mut tableau = make_standard_form_tableau(constraints, objective)?;
        self.var_names = tableau.var_names().to_vec();
        if !tableau.convert_to_canonical_form() {
            debug!("feasible region empty");
            return Ok(SolveStatus::EmptyFeasibleRegion);
        }
        self.solve_tableau(tableau, true)
    }

    /// Runs a fresh cutting-plane search from `tableau`, replacing any
    /// previous solution.
    pub fn solve_tableau(
        &mut self,
        tableau: Tableau,
        already_canonical: bool,
    ) -> Result<SolveStatus, IlpError> {
        let mut search = Search::new(self.max_cuts);
        self.incumbent = None;
        let status = search.run(tableau, already_canonical)?;
        self.incumbent = search.into_incumbent();
        Ok(status)
    }

    /// Solves every objective over the same constraints, canonicalizing the
    /// shared tableau only once. Results follow the order of `objectives`.
    ///
    /// Fails as a whole on the first objective without an optimum.
    pub fn batch_solve(
        &mut self,
        constraints: &[RangeConstraint],
        objectives: &[Polynomial],
    ) -> Result<Vec<IlpResult>, IlpError> {
        debug!(
            constraints = constraints.len(),
            objectives = objectives.len(),
            "batch solving"
        );
        let mut base = make_standard_form_tableau(constraints, &Polynomial::zero())?;
        self.var_names = base.var_names().to_vec();
        if !base.convert_to_canonical_form() {
            return Err(IlpError::EmptyFeasibleRegion);
        }

        let mut results = Vec::with_capacity(objectives.len());
        for objective in objectives {
            let mut specific = base.clone();
            write_objective_row(&mut specific, objective)?;
            specific.price_out();

            match self.solve_tableau(specific, true)? {
                SolveStatus::Optimal => {}
                SolveStatus::Unbounded => {
                    return Err(IlpError::Unbounded {
                        objective: objective.to_string(),
                    });
                }
                SolveStatus::EmptyFeasibleRegion | SolveStatus::IntegerInfeasible => {
                    return Err(IlpError::IntegerInfeasible {
                        objective: objective.to_string(),
                    });
                }
            }
            if let Some(result) = self.result(objective) {
                results.push(result);
            }
        }
        Ok(results)
    }

    pub fn is_feasible(&self) -> bool {
        self.incumbent.is_some()
    }

    /// Optimal LP value of the last solve, without the objective's constant
    pub fn objective_value(&self) -> Option<&BigRational> {
        self.incumbent.as_ref().map(|best| &best.objective)
    }

    /// Value of every standard-form variable in the last optimum. Empty when
    /// no integer solution was found.
    pub fn report_solution(&self) -> BTreeMap<String, BigRational> {
        let Some(best) = &self.incumbent else {
            return BTreeMap::new();
        };
        // Cut slacks sit past the base columns and are left out
        self.var_names
            .iter()
            .cloned()
            .zip(best.solution.iter().cloned())
            .collect()
    }

    /// Packages the last optimum for `objective`
    pub fn result(&self, objective: &Polynomial) -> Option<IlpResult> {
        let best = self.incumbent.as_ref()?;
        Some(IlpResult {
            objective: objective.clone(),
            value: &best.objective + objective.constant_term(),
            solution: self.report_solution(),
        })
    }
}

use num_rational::BigRational;
use num_traits::Signed;
use tracing::{Level, debug, trace};

use crate::error::IlpError;
use crate::gomory::add_gomory_cut;
use crate::numeric::{fractional_part, is_integral, ratio};
use crate::result::SolveStatus;
use crate::tableau::{LpStatus, Tableau};

/// Best integer solution found so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incumbent {
    pub objective: BigRational,
    /// One value per tableau column, aligned with the tableau's variable names
    pub solution: Vec<BigRational>,
}

/// What a single search node decided
#[derive(Debug)]
enum Node {
    Infeasible,
    Unbounded,
    /// LP bound no better than the incumbent
    Dominated,
    Integral,
    Cut(Tableau),
}

/// State of one cutting-plane search. Create a fresh one per independent
/// solve; nothing here is shared between objectives.
#[derive(Debug)]
pub struct Search {
    max_cuts: usize,
    cuts: usize,
    incumbent: Option<Incumbent>,
}

impl Search {
    pub fn new(max_cuts: usize) -> Self {
        Self {
            max_cuts,
            cuts: 0,
            incumbent: None,
        }
    }

    /// Runs the search from `tableau` until the single active path ends.
    ///
    /// Each non-integral node has exactly one child (the node plus one
    /// Gomory cut), so the tree is a path and is walked iteratively.
    pub fn run(&mut self, tableau: Tableau, already_canonical: bool) -> Result<SolveStatus, IlpError> {
        let mut tableau = tableau;
        let mut canonical = already_canonical;
        let mut depth = 0usize;

        let last = loop {
            match self.solve_step(&mut tableau, canonical)? {
                Node::Cut(next) => {
                    tableau = next;
                    canonical = false;
                    depth += 1;
                }
                node => break node,
            }
        };

        let status = match (last, depth) {
            _ if self.incumbent.is_some() => SolveStatus::Optimal,
            (Node::Infeasible, 0) => SolveStatus::EmptyFeasibleRegion,
            (Node::Unbounded, 0) => SolveStatus::Unbounded,
            _ => SolveStatus::IntegerInfeasible,
        };
        debug!(?status, cuts = self.cuts, "search finished");
        Ok(status)
    }

    pub fn incumbent(&self) -> Option<&Incumbent> {
        self.incumbent.as_ref()
    }

    pub fn into_incumbent(self) -> Option<Incumbent> {
        self.incumbent
    }

    pub fn cuts(&self) -> usize {
        self.cuts
    }

    fn solve_step(&mut self, tableau: &mut Tableau, already_canonical: bool) -> Result<Node, IlpError> {
        match tableau.make_optimal(already_canonical) {
            LpStatus::Optimal => {}
            LpStatus::Infeasible => {
                trace!("feasible region empty; pruning branch");
                return Ok(Node::Infeasible);
            }
            LpStatus::Unbounded => {
                trace!("relaxation unbounded; pruning branch");
                return Ok(Node::Unbounded);
            }
        }

        // The LP relaxation bounds every integer point below this node
        let value = tableau.objective_value();
        if let Some(best) = &self.incumbent {
            if value >= best.objective {
                trace!(objective = %value, "objective proven suboptimal; pruning branch");
                return Ok(Node::Dominated);
            }
        }

        let Some((row, fraction)) = most_fractional_row(tableau) else {
            let solution = tableau.solution();
            debug_assert!(solution.iter().all(is_integral));
            debug!(objective = %value, "found new best integer solution");
            trace!(tableau = %tableau, "integer vertex");
            self.incumbent = Some(Incumbent {
                objective: value,
                solution,
            });
            return Ok(Node::Integral);
        };

        if self.cuts >= self.max_cuts {
            return Err(IlpError::CutLimitReached {
                limit: self.max_cuts,
            });
        }
        if tracing::enabled!(Level::TRACE) {
            if let Some(col) = most_fractional_variable(&tableau.solution()) {
                trace!(
                    variable = %tableau.var_names()[col],
                    objective = %value,
                    tableau = %tableau,
                    "non-integer vertex"
                );
            }
        }
        debug!(row, fraction = %fraction, "requesting Gomory cut");
        let cut = add_gomory_cut(tableau, row, format!("cut{}", self.cuts));
        self.cuts += 1;
        Ok(Node::Cut(cut))
    }
}

/// Constraint row whose RHS has the greatest fractional part (first one on
/// ties), or `None` when the current vertex is integral.
///
/// Basic variables take their row's RHS and the rest are zero, so this is
/// also the integrality test for the vertex.
pub fn most_fractional_row(tableau: &Tableau) -> Option<(usize, BigRational)> {
    let rhs = tableau.rhs_col();
    let mut best: Option<(usize, BigRational)> = None;
    for row in 1..tableau.rows() {
        let fraction = fractional_part(tableau.get(row, rhs));
        let greater = match &best {
            None => !is_integral(&fraction),
            Some((_, current)) => fraction > *current,
        };
        if greater {
            best = Some((row, fraction));
        }
    }
    best
}

/// Index of the value closest to a half-integer, ignoring integral ones.
/// Only used to annotate traces; the cut row comes from
/// [`most_fractional_row`].
fn most_fractional_variable(values: &[BigRational]) -> Option<usize> {
    let half = ratio(1, 2);
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !is_integral(v))
        .map(|(i, v)| (i, (fractional_part(v) - &half).abs()))
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
}

mod branch_bound;
mod constraint;
mod error;
mod gomory;
pub mod numeric;
mod polynomial;
mod result;
mod solver;
mod standard_form;
mod tableau;

pub use branch_bound::{Incumbent, Search, most_fractional_row};
pub use constraint::RangeConstraint;
pub use error::IlpError;
pub use gomory::add_gomory_cut;
pub use polynomial::{CONSTANT, Polynomial};
pub use result::{IlpResult, SolveStatus};
pub use solver::IlpSolver;
pub use standard_form::{NEG_SUFFIX, POS_SUFFIX, make_standard_form_tableau, slack_name, write_objective_row};
pub use tableau::{LpStatus, Tableau};

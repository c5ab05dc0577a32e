use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IlpError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Feasible region empty")]
    EmptyFeasibleRegion,
    #[error("Feasible region has empty intersection with integers (objective {objective})")]
    IntegerInfeasible { objective: String },
    #[error("Objective {objective} is unbounded over the feasible region")]
    Unbounded { objective: String },
    #[error("Gave up after {limit} Gomory cuts")]
    CutLimitReached { limit: usize },
}

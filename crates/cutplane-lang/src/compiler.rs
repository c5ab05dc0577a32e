use std::collections::BTreeSet;
use std::path::Path;

use cutplane_solver::{Polynomial, RangeConstraint};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};
use thiserror::Error;

use crate::Parser;
use crate::ast::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Non-linear term: {0}")]
    NonLinear(String),
    #[error("Division by zero in expression")]
    DivisionByZero,
    #[error("Division by non-constant expression: {0}")]
    NonConstantDivisor(String),
    #[error("Bound of constraint {constraint} is not constant: {bound}")]
    NonConstantBound { constraint: String, bound: String },
    #[error("Bound of constraint {constraint} is not an integer: {bound}")]
    NonIntegralBound { constraint: String, bound: String },
    #[error("Bounds of constraint {0} do not fit in a 64-bit range")]
    BoundOutOfRange(String),
    #[error("Constraint {0} admits no value")]
    EmptyRange(String),
    #[error("Constraint {0} must be `lo <= expr <= hi` or `lhs == rhs`")]
    InvalidComparison(String),
    #[error("Variable {0} appears in an objective but in no constraint")]
    UnconstrainedVariable(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error in {0}: {1}")]
    ParseError(String, String),
}

/// A constraint lowered to the solver's range form
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledConstraint {
    pub name: String,
    pub constraint: RangeConstraint,
}

/// An objective in minimization form
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledObjective {
    pub name: String,
    pub sense: Sense,
    /// The expression as written, negated for `maximize`
    pub minimized: Polynomial,
}

impl CompiledObjective {
    /// Converts a value of `minimized` back to the written objective's value
    pub fn reported_value(&self, minimized_value: &BigRational) -> BigRational {
        match self.sense {
            Sense::Minimize => minimized_value.clone(),
            Sense::Maximize => -minimized_value,
        }
    }
}

/// Compiled representation of a problem file ready for solving
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledProblem {
    pub constraints: Vec<CompiledConstraint>,
    pub objectives: Vec<CompiledObjective>,
}

impl CompiledProblem {
    pub fn range_constraints(&self) -> Vec<RangeConstraint> {
        self.constraints.iter().map(|c| c.constraint.clone()).collect()
    }

    pub fn minimized_objectives(&self) -> Vec<Polynomial> {
        self.objectives.iter().map(|o| o.minimized.clone()).collect()
    }

    /// Every variable named by a constraint, sorted
    pub fn variables(&self) -> BTreeSet<String> {
        self.constraints
            .iter()
            .flat_map(|c| c.constraint.poly.variables().map(str::to_string))
            .collect()
    }
}

/// Compiler for converting an AST into range constraints and objectives
#[derive(Debug, Default)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Parse and compile a problem from source text
    pub fn compile_source(&self, source: &str) -> Result<CompiledProblem, CompileError> {
        let program = Parser::parse(source)
            .map_err(|e| CompileError::ParseError("<source>".to_string(), e.to_string()))?;
        self.compile(&program)
    }

    /// Read, parse and compile a problem file
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledProblem, CompileError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            CompileError::IoError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let program = Parser::parse(&source)
            .map_err(|e| CompileError::ParseError(path.display().to_string(), e.to_string()))?;
        self.compile(&program)
    }

    pub fn compile(&self, program: &Program) -> Result<CompiledProblem, CompileError> {
        let mut problem = CompiledProblem::default();

        for item in &program.items {
            match item {
                Item::Constraint(decl) => {
                    let name = decl
                        .label
                        .clone()
                        .unwrap_or_else(|| format!("constraint{}", problem.constraints.len()));
                    let constraint = self.compile_constraint(&name, decl)?;
                    problem.constraints.push(CompiledConstraint { name, constraint });
                }
                Item::Objective(decl) => {
                    let name = decl
                        .label
                        .clone()
                        .unwrap_or_else(|| format!("objective{}", problem.objectives.len()));
                    let written = self.lower(&decl.expr)?;
                    let minimized = match decl.sense {
                        Sense::Minimize => written,
                        Sense::Maximize => -written,
                    };
                    problem.objectives.push(CompiledObjective {
                        name,
                        sense: decl.sense,
                        minimized,
                    });
                }
            }
        }

        let known = problem.variables();
        for objective in &problem.objectives {
            if let Some(unknown) = objective.minimized.variables().find(|v| !known.contains(*v)) {
                return Err(CompileError::UnconstrainedVariable(unknown.to_string()));
            }
        }

        Ok(problem)
    }

    fn compile_constraint(
        &self,
        name: &str,
        decl: &ConstraintDecl,
    ) -> Result<RangeConstraint, CompileError> {
        match decl.comparisons.as_slice() {
            [Comparison { op: Comparator::Eq, expr }] => {
                let poly = self.lower(&decl.first)? - self.lower(expr)?;
                Ok(RangeConstraint::new(poly, 1))
            }
            [lower, upper]
                if lower.op != Comparator::Eq && upper.op != Comparator::Eq =>
            {
                let mut lo = self.integral_bound(name, &decl.first)?;
                let expr = self.lower(&lower.expr)?;
                let mut hi = self.integral_bound(name, &upper.expr)?;
                if lower.op == Comparator::Lt {
                    lo += 1;
                }
                if upper.op == Comparator::Lt {
                    hi -= 1;
                }
                if hi < lo {
                    return Err(CompileError::EmptyRange(name.to_string()));
                }
                let range = (&hi - &lo + BigInt::one())
                    .to_i64()
                    .ok_or_else(|| CompileError::BoundOutOfRange(name.to_string()))?;
                let shifted = expr - Polynomial::constant(BigRational::from_integer(lo));
                Ok(RangeConstraint::new(shifted, range))
            }
            _ => Err(CompileError::InvalidComparison(name.to_string())),
        }
    }

    fn integral_bound(&self, constraint: &str, expr: &Expr) -> Result<BigInt, CompileError> {
        let poly = self.lower(expr)?;
        if !poly.is_constant() {
            return Err(CompileError::NonConstantBound {
                constraint: constraint.to_string(),
                bound: expr.to_string(),
            });
        }
        let value = poly.constant_term();
        if !value.is_integer() {
            return Err(CompileError::NonIntegralBound {
                constraint: constraint.to_string(),
                bound: expr.to_string(),
            });
        }
        Ok(value.to_integer())
    }

    /// Lowers a linear expression to a polynomial with rational coefficients
    fn lower(&self, expr: &Expr) -> Result<Polynomial, CompileError> {
        match expr {
            Expr::Number(n) => Ok(Polynomial::constant(BigRational::from_integer(BigInt::from(*n)))),
            Expr::Var { name, .. } => Ok(Polynomial::var(name.as_str())),
            Expr::Neg(inner) => Ok(-self.lower(inner)?),
            Expr::Paren(inner) => self.lower(inner),
            Expr::BinaryOp { left, op, right } => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                match op {
                    BinaryOp::Add => Ok(l + r),
                    BinaryOp::Sub => Ok(l - r),
                    BinaryOp::Mul => {
                        if l.is_constant() {
                            Ok(r.scaled(&l.constant_term()))
                        } else if r.is_constant() {
                            Ok(l.scaled(&r.constant_term()))
                        } else {
                            Err(CompileError::NonLinear(expr.to_string()))
                        }
                    }
                    BinaryOp::Div => {
                        if !r.is_constant() {
                            return Err(CompileError::NonConstantDivisor(right.to_string()));
                        }
                        let divisor = r.constant_term();
                        if divisor.is_zero() {
                            return Err(CompileError::DivisionByZero);
                        }
                        Ok(l.scaled(&(BigRational::one() / divisor)))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseError;
    use cutplane_solver::numeric::{int, ratio};

    fn compile(source: &str) -> Result<CompiledProblem, CompileError> {
        Compiler::new().compile_source(source)
    }

    #[test]
    fn test_compile_range_constraint() {
        let problem = compile("constraint rows: 0 <= i + 4*j < 16").unwrap();
        assert_eq!(problem.constraints.len(), 1);
        let c = &problem.constraints[0];
        assert_eq!(c.name, "rows");
        assert_eq!(c.constraint.range, 16);
        assert_eq!(
            c.constraint.poly,
            Polynomial::var("i") + Polynomial::term("j", int(4))
        );
    }

    #[test]
    fn test_lower_bound_shifts_expression() {
        let problem = compile("constraint 2 <= x - y <= 5").unwrap();
        let c = &problem.constraints[0];
        assert_eq!(c.name, "constraint0");
        assert_eq!(c.constraint.range, 4);
        assert_eq!(c.constraint.poly.constant_term(), int(-2));
        assert_eq!(c.constraint.poly.coefficient("y"), int(-1));
    }

    #[test]
    fn test_strict_bounds() {
        let problem = compile("constraint -3 < x < 3").unwrap();
        let c = &problem.constraints[0];
        // -2 <= x <= 2
        assert_eq!(c.constraint.range, 5);
        assert_eq!(c.constraint.poly.constant_term(), int(2));
    }

    #[test]
    fn test_equality() {
        let problem = compile("constraint x + y == 3").unwrap();
        let c = &problem.constraints[0];
        assert_eq!(c.constraint.range, 1);
        assert_eq!(c.constraint.poly.constant_term(), int(-3));
    }

    #[test]
    fn test_rational_coefficients() {
        let problem = compile("constraint 0 <= x / 2 + (y - 1) * 3 <= 6").unwrap();
        let poly = &problem.constraints[0].constraint.poly;
        assert_eq!(poly.coefficient("x"), ratio(1, 2));
        assert_eq!(poly.coefficient("y"), int(3));
        assert_eq!(poly.constant_term(), int(-3));
    }

    #[test]
    fn test_maximize_is_negated() {
        let problem = compile("constraint 0 <= x <= 3\nmaximize best: 2*x + 1").unwrap();
        let obj = &problem.objectives[0];
        assert_eq!(obj.name, "best");
        assert_eq!(obj.sense, Sense::Maximize);
        assert_eq!(obj.minimized.coefficient("x"), int(-2));
        assert_eq!(obj.minimized.constant_term(), int(-1));
        assert_eq!(obj.reported_value(&int(-7)), int(7));
    }

    #[test]
    fn test_non_linear_product() {
        let err = compile("constraint 0 <= x * y <= 3").unwrap_err();
        assert_eq!(err, CompileError::NonLinear("x * y".to_string()));
    }

    #[test]
    fn test_division_errors() {
        assert_eq!(
            compile("constraint 0 <= x / (2 - 2) <= 3").unwrap_err(),
            CompileError::DivisionByZero
        );
        assert_eq!(
            compile("constraint 0 <= 4 / x <= 3").unwrap_err(),
            CompileError::NonConstantDivisor("x".to_string())
        );
    }

    #[test]
    fn test_bound_errors() {
        assert!(matches!(
            compile("constraint y <= x <= 3").unwrap_err(),
            CompileError::NonConstantBound { .. }
        ));
        assert!(matches!(
            compile("constraint 1/2 <= x <= 3").unwrap_err(),
            CompileError::NonIntegralBound { .. }
        ));
        assert_eq!(
            compile("constraint c: 3 <= x < 3").unwrap_err(),
            CompileError::EmptyRange("c".to_string())
        );
    }

    #[test]
    fn test_invalid_comparisons() {
        assert_eq!(
            compile("constraint x <= 3").unwrap_err(),
            CompileError::InvalidComparison("constraint0".to_string())
        );
        assert_eq!(
            compile("constraint 0 <= x == 3").unwrap_err(),
            CompileError::InvalidComparison("constraint0".to_string())
        );
    }

    #[test]
    fn test_unconstrained_objective_variable() {
        assert_eq!(
            compile("constraint 0 <= x <= 3\nminimize x + z").unwrap_err(),
            CompileError::UnconstrainedVariable("z".to_string())
        );
    }

    #[test]
    fn test_parse_error_is_wrapped() {
        assert!(matches!(
            compile("constraint 0 <= x <=").unwrap_err(),
            CompileError::ParseError(..)
        ));
    }

    /// Writes `source` to a fresh file under the system temp directory
    fn temp_problem(name: &str, source: &str) -> std::path::PathBuf {
        let file = format!("cutplane-{}-{}.cut", std::process::id(), name);
        let path = std::env::temp_dir().join(file);
        std::fs::write(&path, source).unwrap();
        path
    }

    #[test]
    fn test_compile_file() {
        let path = temp_problem("ok", "constraint 0 <= x <= 3\nminimize x");
        let problem = Compiler::new().compile_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(problem.constraints.len(), 1);
        assert_eq!(problem.objectives.len(), 1);
    }

    #[test]
    fn test_compile_file_missing() {
        let path = std::env::temp_dir().join("cutplane-does-not-exist.cut");
        match Compiler::new().compile_file(&path).unwrap_err() {
            CompileError::IoError(message) => {
                assert!(message.contains("cutplane-does-not-exist.cut"));
            }
            other => panic!("Expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn test_compile_file_parse_error_names_path() {
        let path = temp_problem("broken", "constraint 0 <= x <=");
        let err = Compiler::new().compile_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(
            err,
            CompileError::ParseError(
                path.display().to_string(),
                ParseError::UnexpectedEof.to_string()
            )
        );
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_demo_files_compile() {
        let knapsack = compile(include_str!("../../../demos/knapsack.cut")).unwrap();
        assert_eq!(knapsack.constraints.len(), 5);
        assert_eq!(knapsack.objectives.len(), 2);
        assert_eq!(knapsack.variables().len(), 4);

        let lattice = compile(include_str!("../../../demos/lattice.cut")).unwrap();
        assert_eq!(lattice.constraints[0].name, "cells");
        assert_eq!(lattice.constraints[0].constraint.range, 16);
        assert_eq!(lattice.objectives[1].name, "objective1");
    }

    #[test]
    fn test_compile_and_solve() {
        use cutplane_solver::{IlpSolver, SolveStatus};

        let source = r#"
            // a small knapsack
            constraint 0 <= a <= 1
            constraint 0 <= b <= 1
            constraint 0 <= c <= 1
            constraint weight: 0 <= 3*a + 4*b + 2*c <= 6
            maximize value: 4*a + 5*b + 3*c
        "#;
        let problem = compile(source).unwrap();
        let objective = &problem.objectives[0];

        let mut solver = IlpSolver::new();
        let status = solver
            .solve(&problem.range_constraints(), &objective.minimized)
            .unwrap();
        assert_eq!(status, SolveStatus::Optimal);

        let result = solver.result(&objective.minimized).unwrap();
        assert_eq!(objective.reported_value(&result.value), int(8));
        let values = result.original_values();
        assert_eq!(values["b"], int(1));
        assert_eq!(values["c"], int(1));
    }
}

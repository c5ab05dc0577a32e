use clap::{Parser, Subcommand};
use cutplane_lang::{CompiledProblem, Compiler, Item};
use cutplane_solver::{IlpResult, IlpSolver, Polynomial, SolveStatus};
use num_rational::BigRational;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cutplane")]
#[command(about = "Exact integer linear programming with Gomory cuts", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a problem file and output the AST
    Parse {
        /// The file to parse
        file: PathBuf,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Check a problem file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
    /// Solve every objective in a problem file
    Solve {
        /// The file containing the problem
        file: PathBuf,
        /// Give up after this many Gomory cuts per objective
        #[arg(long, default_value_t = 10_000)]
        max_cuts: usize,
        /// Also print the internal standard-form solution
        #[arg(long)]
        raw: bool,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
}

/// `RUST_LOG` wins over `-v`; logs go to stderr so stdout stays parseable.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    std::process::exit(1);
}

fn read_source(file: &Path) -> String {
    std::fs::read_to_string(file).unwrap_or_else(|e| fail(format!("Error reading file: {}", e)))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Parse { file, format } => {
            let source = read_source(&file);
            match cutplane_lang::Parser::parse(&source) {
                Ok(program) => {
                    if format == "json" {
                        match serde_json::to_string_pretty(&program) {
                            Ok(text) => println!("{}", text),
                            Err(e) => fail(format!("Error encoding JSON: {}", e)),
                        }
                    } else {
                        println!("{:#?}", program);
                    }
                }
                Err(e) => fail(format!("Parse error: {}", e)),
            }
        }
        Commands::Check { file } => {
            let source = read_source(&file);
            let program = match cutplane_lang::Parser::parse(&source) {
                Ok(p) => p,
                Err(e) => fail(format!("✗ {} has errors:\n  {}", file.display(), e)),
            };
            if let Err(e) = Compiler::new().compile(&program) {
                fail(format!("✗ {} has errors:\n  {}", file.display(), e));
            }

            let constraints = program
                .items
                .iter()
                .filter(|item| matches!(item, Item::Constraint(_)))
                .count();
            println!("✓ {} is valid", file.display());
            println!("  {} constraints", constraints);
            println!("  {} objectives", program.items.len() - constraints);
        }
        Commands::Solve {
            file,
            max_cuts,
            raw,
            format,
        } => {
            let problem = match Compiler::new().compile_file(&file) {
                Ok(p) => p,
                Err(e) => fail(format!("Compile error: {}", e)),
            };
            info!(
                constraints = problem.constraints.len(),
                objectives = problem.objectives.len(),
                "compiled {}",
                file.display()
            );

            let mut solver = IlpSolver::new().with_max_cuts(max_cuts);
            let results = if problem.objectives.is_empty() {
                check_feasibility(&mut solver, &problem)
            } else {
                match solver.batch_solve(&problem.range_constraints(), &problem.minimized_objectives()) {
                    Ok(results) => results,
                    Err(e) => fail(format!("Solve error: {}", e)),
                }
            };

            if format == "json" {
                print_json(&problem, &results, raw);
            } else {
                print_pretty(&problem, &results, raw);
            }
        }
    }
}

/// Solves with a zero objective, which only asks for some integer point
fn check_feasibility(solver: &mut IlpSolver, problem: &CompiledProblem) -> Vec<IlpResult> {
    let objective = Polynomial::zero();
    match solver.solve(&problem.range_constraints(), &objective) {
        Ok(SolveStatus::Optimal) => solver.result(&objective).into_iter().collect(),
        Ok(SolveStatus::EmptyFeasibleRegion) => fail("Status: INFEASIBLE (feasible region empty)"),
        Ok(SolveStatus::IntegerInfeasible) => fail("Status: INFEASIBLE (no integer point)"),
        Ok(SolveStatus::Unbounded) => fail("Status: UNBOUNDED"),
        Err(e) => fail(format!("Solve error: {}", e)),
    }
}

/// Pairs each result with its objective's name and reported value
fn labelled<'a>(
    problem: &'a CompiledProblem,
    results: &'a [IlpResult],
) -> impl Iterator<Item = (&'a str, Option<BigRational>, &'a IlpResult)> {
    results.iter().enumerate().map(move |(i, result)| match problem.objectives.get(i) {
        Some(objective) => (
            objective.name.as_str(),
            Some(objective.reported_value(&result.value)),
            result,
        ),
        None => ("feasibility", None, result),
    })
}

fn print_pretty(problem: &CompiledProblem, results: &[IlpResult], raw: bool) {
    println!("Status: OPTIMAL");
    for (name, value, result) in labelled(problem, results) {
        println!();
        match value {
            Some(value) => println!("{}: {}", name, value),
            None => println!("{}: integer point found", name),
        }
        for (var, value) in result.original_values() {
            println!("  {:20} {:>10}", var, value.to_string());
        }
        if raw {
            println!("  raw:");
            for (var, value) in &result.solution {
                println!("    {:20} {:>10}", var, value.to_string());
            }
        }
    }
}

fn print_json(problem: &CompiledProblem, results: &[IlpResult], raw: bool) {
    let entries: Vec<_> = labelled(problem, results)
        .map(|(name, value, result)| {
            let values: serde_json::Map<_, _> = result
                .original_values()
                .into_iter()
                .map(|(var, value)| (var, json!(value.to_string())))
                .collect();
            let mut entry = json!({
                "objective": name,
                "value": value.map(|v| v.to_string()),
                "values": values,
            });
            if raw {
                let solution: serde_json::Map<_, _> = result
                    .solution
                    .iter()
                    .map(|(var, value)| (var.clone(), json!(value.to_string())))
                    .collect();
                entry["raw"] = json!(solution);
            }
            entry
        })
        .collect();

    match serde_json::to_string_pretty(&json!({ "status": "optimal", "results": entries })) {
        Ok(text) => println!("{}", text),
        Err(e) => fail(format!("Error encoding JSON: {}", e)),
    }
}

use std::fs;

use log::{debug, warn};
use num_bigint::BigInt;

use crate::basic_types::{IntegerLiteral, Variable, VariableType};
use crate::engine::Solver;
use crate::result::{GourdError, GourdResult};

/// Reads the line-oriented ILP text format: every constraint row has the form
///
/// ```text
/// c1 x1 c2 x2 ... >= c ;
/// ```
///
/// with arbitrary-precision integer coefficients. Lines starting with `*` are
/// comments. An objective row `min: ... ;` is accepted but ignored since the
/// solver decides feasibility only.
pub fn parse_ilp(file_location: &str, solver: &mut Solver) -> GourdResult<()> {
    let file_contents = fs::read_to_string(file_location)
        .map_err(|error| GourdError::FileReadingError(error, file_location.to_string()))?;

    debug!("Reading file: {}", file_location);

    let mut variables: Vec<Variable> = vec![];

    for (line_number, line) in file_contents.lines().enumerate() {
        let line = line.trim();

        //skip the comments and empty lines
        if line.is_empty() || line.starts_with('*') {
            continue;
        }

        //the objective is a non-goal, feasibility is all that is decided
        if line.starts_with("min:") {
            warn!("Ignoring the objective function on line {}", line_number + 1);
            continue;
        }

        let mut tokens = line.split_whitespace().peekable();
        let mut literals: Vec<IntegerLiteral> = vec![];

        //read the coefficient-variable pairs until the relation symbol
        while tokens.peek().is_some_and(|token| !token.starts_with(">=")) {
            let coefficient = next_integer(&mut tokens, line_number)?;
            let variable_token = tokens.next().ok_or_else(|| {
                GourdError::ParseError(line_number + 1, "expected a variable".to_string())
            })?;
            let variable_id: usize = variable_token
                .strip_prefix('x')
                .and_then(|raw| raw.parse().ok())
                .ok_or_else(|| {
                    GourdError::ParseError(line_number + 1, "expected a variable".to_string())
                })?;
            make_variables(solver, &mut variables, variable_id + 1);
            literals.push(IntegerLiteral::new(coefficient, variables[variable_id]));
        }

        //the relation symbol
        if tokens.next() != Some(">=") {
            return Err(GourdError::ParseError(
                line_number + 1,
                "expected a relation symbol".to_string(),
            ));
        }

        //the constant
        let constant = next_integer(&mut tokens, line_number)?;

        //the row must end with ';'
        if tokens.next() != Some(";") {
            return Err(GourdError::ParseError(
                line_number + 1,
                "expected end of constraint (;)".to_string(),
            ));
        }

        let _ = solver.assert_integer(literals, constant);
    }

    Ok(())
}

fn make_variables(solver: &mut Solver, variables: &mut Vec<Variable>, num_variables: usize) {
    while variables.len() < num_variables {
        let variable =
            solver.new_variable(VariableType::Integer, &format!("x{}", variables.len()));
        variables.push(variable);
    }
}

fn next_integer(
    tokens: &mut std::iter::Peekable<std::str::SplitWhitespace<'_>>,
    line_number: usize,
) -> GourdResult<BigInt> {
    tokens
        .next()
        .and_then(|token| token.parse::<BigInt>().ok())
        .ok_or_else(|| GourdError::ParseError(line_number + 1, "expected a number".to_string()))
}

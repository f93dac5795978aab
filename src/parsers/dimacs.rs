use std::fs;

use log::debug;
use num_bigint::BigInt;
use num_traits::{One, Zero};

use crate::basic_types::{BoolLiteral, Variable, VariableType};
use crate::engine::Solver;
use crate::result::{GourdError, GourdResult};

/// Reads a DIMACS CNF file and asserts each clause into the solver. Every
/// propositional variable becomes an integer variable with the global bounds
/// 0 <= x <= 1.
pub fn parse_cnf(file_location: &str, solver: &mut Solver) -> GourdResult<()> {
    //this is a slow method of reading for large files, but for now it will do
    let file_contents = fs::read_to_string(file_location)
        .map_err(|error| GourdError::FileReadingError(error, file_location.to_string()))?;

    //skip comments, i.e. lines that start with 'c'
    let mut lines = file_contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.starts_with('c') && !line.trim().is_empty());

    //read the header line: 'p cnf [num variables] [num clauses]'
    let (header_line_number, header) = lines
        .next()
        .ok_or_else(|| GourdError::ParseError(0, "missing header".to_string()))?;
    let mut header_tokens = header.split_whitespace();
    if header_tokens.next() != Some("p") || header_tokens.next() != Some("cnf") {
        return Err(GourdError::ParseError(
            header_line_number + 1,
            "expected the header 'p cnf'".to_string(),
        ));
    }
    let num_variables: usize = parse_token(header_tokens.next(), header_line_number)?;
    let num_clauses: usize = parse_token(header_tokens.next(), header_line_number)?;

    debug!("Reading file: {}", file_location);
    debug!("Number of variables: {}", num_variables);
    debug!("Number of clauses: {}", num_clauses);

    let variables: Vec<Variable> = (0..num_variables)
        .map(|i| {
            let variable = solver.new_variable(VariableType::Integer, &format!("x{}", i + 1));
            solver.set_lower_bound(variable, BigInt::zero());
            solver.set_upper_bound(variable, BigInt::one());
            variable
        })
        .collect();

    let mut num_clauses_read = 0;
    for (line_number, line) in lines {
        let mut literals: Vec<BoolLiteral> = vec![];
        for token in line.split_whitespace() {
            let index: i64 = parse_token(Some(token), line_number)?;
            if index == 0 {
                continue;
            }
            let variable_index = index.unsigned_abs() as usize - 1; //the file indexes variables from 1
            if variable_index >= variables.len() {
                return Err(GourdError::ParseError(
                    line_number + 1,
                    format!("variable {} exceeds the declared count", index),
                ));
            }
            literals.push(BoolLiteral::new(variables[variable_index], index < 0));
        }
        let _ = solver.assert_clause(literals);
        num_clauses_read += 1;
    }

    if num_clauses != num_clauses_read {
        return Err(GourdError::ParseError(
            header_line_number + 1,
            format!(
                "the header declares {} clauses but the file contains {}",
                num_clauses, num_clauses_read
            ),
        ));
    }

    Ok(())
}

fn parse_token<T: std::str::FromStr>(token: Option<&str>, line_number: usize) -> GourdResult<T> {
    token
        .and_then(|token| token.parse::<T>().ok())
        .ok_or_else(|| GourdError::ParseError(line_number + 1, "expected a number".to_string()))
}

use num_bigint::BigInt;

use gourd::{BoolLiteral, IntegerLiteral, Solver, SolverOptions, SolverStatus, Variable, VariableType};

fn new_solver() -> Solver {
    Solver::new(SolverOptions {
        check_model: true,
        ..SolverOptions::default()
    })
}

fn boolean_variable(solver: &mut Solver, name: &str) -> Variable {
    let variable = solver.new_variable(VariableType::Integer, name);
    solver.set_lower_bound(variable, BigInt::from(0));
    solver.set_upper_bound(variable, BigInt::from(1));
    variable
}

fn bounded_variable(solver: &mut Solver, name: &str, lower: i64, upper: i64) -> Variable {
    let variable = solver.new_variable(VariableType::Integer, name);
    solver.set_lower_bound(variable, BigInt::from(lower));
    solver.set_upper_bound(variable, BigInt::from(upper));
    variable
}

fn integer_literal(coefficient: i64, variable: Variable) -> IntegerLiteral {
    IntegerLiteral::new(BigInt::from(coefficient), variable)
}

#[test]
fn test_all_binary_clause_combinations_are_unsat() {
    //x1 \/ x2, ~x1 \/ x2, x1 \/ ~x2, ~x1 \/ ~x2
    let mut solver = new_solver();
    let x1 = boolean_variable(&mut solver, "x1");
    let x2 = boolean_variable(&mut solver, "x2");

    for (negate_first, negate_second) in
        [(false, false), (true, false), (false, true), (true, true)]
    {
        let _ = solver.assert_clause(vec![
            BoolLiteral::new(x1, negate_first),
            BoolLiteral::new(x2, negate_second),
        ]);
    }

    assert!(solver.solve() == SolverStatus::Unsatisfiable);
}

#[test]
fn test_opposing_binary_sums_are_unsat() {
    //x + y >= 1 and -x - y >= 0 with 0 <= x, y <= 1
    let mut solver = new_solver();
    let x = boolean_variable(&mut solver, "x");
    let y = boolean_variable(&mut solver, "y");

    let _ = solver.assert_integer(
        vec![integer_literal(1, x), integer_literal(1, y)],
        BigInt::from(1),
    );
    let _ = solver.assert_integer(
        vec![integer_literal(-1, x), integer_literal(-1, y)],
        BigInt::from(0),
    );

    assert!(solver.solve() == SolverStatus::Unsatisfiable);
}

#[test]
fn test_feasible_inequalities_produce_a_model() {
    //2x + 3y >= 4, -2x + 3y >= 4, 3y - x >= 0 with 0 <= x, y <= 10
    let mut solver = new_solver();
    let x = bounded_variable(&mut solver, "x", 0, 10);
    let y = bounded_variable(&mut solver, "y", 0, 10);

    let _ = solver.assert_integer(
        vec![integer_literal(2, x), integer_literal(3, y)],
        BigInt::from(4),
    );
    let _ = solver.assert_integer(
        vec![integer_literal(-2, x), integer_literal(3, y)],
        BigInt::from(4),
    );
    let _ = solver.assert_integer(
        vec![integer_literal(3, y), integer_literal(-1, x)],
        BigInt::from(0),
    );

    assert!(solver.solve() == SolverStatus::Satisfiable);
    assert!(solver.debug_check_state());

    let x_value = solver.value(x);
    let y_value = solver.value(y);
    assert!(BigInt::from(2) * &x_value + BigInt::from(3) * &y_value >= BigInt::from(4));
    assert!(BigInt::from(-2) * &x_value + BigInt::from(3) * &y_value >= BigInt::from(4));
    assert!(BigInt::from(3) * &y_value - &x_value >= BigInt::from(0));
}

#[test]
fn test_pigeonhole_is_unsat() {
    //4 pigeons into 3 holes: every pigeon gets a hole, no hole holds two
    const NUM_PIGEONS: usize = 4;
    const NUM_HOLES: usize = 3;

    let mut solver = new_solver();
    let mut placements = vec![];
    for pigeon in 0..NUM_PIGEONS {
        let mut row = vec![];
        for hole in 0..NUM_HOLES {
            row.push(boolean_variable(
                &mut solver,
                &format!("p{}_{}", pigeon, hole),
            ));
        }
        placements.push(row);
    }

    for pigeon in 0..NUM_PIGEONS {
        let literals = (0..NUM_HOLES)
            .map(|hole| BoolLiteral::new(placements[pigeon][hole], false))
            .collect();
        let _ = solver.assert_clause(literals);
    }
    for hole in 0..NUM_HOLES {
        let literals = (0..NUM_PIGEONS)
            .map(|pigeon| integer_literal(-1, placements[pigeon][hole]))
            .collect();
        let _ = solver.assert_integer(literals, BigInt::from(-1));
    }

    assert!(solver.solve() == SolverStatus::Unsatisfiable);
}

#[test]
fn test_interval_model_reports_the_first_satisfiable_value() {
    //x >= 5 and -x >= -10 admit any x in [5, 10]; the phase picks 5
    let mut solver = new_solver();
    let x = solver.new_variable(VariableType::Integer, "x");

    let _ = solver.assert_integer(vec![integer_literal(1, x)], BigInt::from(5));
    let _ = solver.assert_integer(vec![integer_literal(-1, x)], BigInt::from(-10));

    assert!(solver.solve() == SolverStatus::Satisfiable);
    assert!(solver.value(x) == BigInt::from(5));
}

#[test]
fn test_coprime_coefficients_are_satisfiable() {
    //3x + 5y >= 7 and -3x - 5y >= -11 with x, y in {0, ..., 3}
    let mut solver = new_solver();
    let x = bounded_variable(&mut solver, "x", 0, 3);
    let y = bounded_variable(&mut solver, "y", 0, 3);

    let _ = solver.assert_integer(
        vec![integer_literal(3, x), integer_literal(5, y)],
        BigInt::from(7),
    );
    let _ = solver.assert_integer(
        vec![integer_literal(-3, x), integer_literal(-5, y)],
        BigInt::from(-11),
    );

    assert!(solver.solve() == SolverStatus::Satisfiable);

    let sum = BigInt::from(3) * solver.value(x) + BigInt::from(5) * solver.value(y);
    assert!(sum >= BigInt::from(7));
    assert!(sum <= BigInt::from(11));
}

#[test]
fn test_complementary_unit_constraints_conflict_without_decisions() {
    //x >= 1 and -x >= 0 cross at level 0
    let mut solver = new_solver();
    let x = solver.new_variable(VariableType::Integer, "x");

    let _ = solver.assert_integer(vec![integer_literal(1, x)], BigInt::from(1));
    let _ = solver.assert_integer(vec![integer_literal(-1, x)], BigInt::from(0));

    assert!(solver.solve() == SolverStatus::Unsatisfiable);
    assert!(solver.statistics().decisions == 0);
}

#[test]
fn test_unit_clause_becomes_a_global_bound() {
    let mut solver = new_solver();
    let x = boolean_variable(&mut solver, "x");
    let y = boolean_variable(&mut solver, "y");
    let z = boolean_variable(&mut solver, "z");

    //the unit clause fixes x = 1 at level 0
    let _ = solver.assert_clause(vec![BoolLiteral::new(x, false)]);
    assert!(solver.lower_bound(x) == BigInt::from(1));

    //and it survives the search (and any backtracking within)
    let _ = solver.assert_clause(vec![BoolLiteral::new(x, true), BoolLiteral::new(y, false)]);
    let _ = solver.assert_clause(vec![BoolLiteral::new(y, true), BoolLiteral::new(z, false)]);
    assert!(solver.solve() == SolverStatus::Satisfiable);
    assert!(solver.value(x) == BigInt::from(1));
    assert!(solver.value(y) == BigInt::from(1));
    assert!(solver.value(z) == BigInt::from(1));
}

#[test]
fn test_unsat_answer_is_stable_across_solves() {
    let mut solver = new_solver();
    let x = boolean_variable(&mut solver, "x");

    let _ = solver.assert_clause(vec![BoolLiteral::new(x, false)]);
    let _ = solver.assert_clause(vec![BoolLiteral::new(x, true)]);

    assert!(solver.solve() == SolverStatus::Unsatisfiable);
    //re-solving without adding constraints keeps the answer
    assert!(solver.solve() == SolverStatus::Unsatisfiable);
}

#[test]
fn test_cardinality_constraints_count_true_literals() {
    //at least 2 of {x, y, z}, but y and z exclude each other
    let mut solver = new_solver();
    let x = boolean_variable(&mut solver, "x");
    let y = boolean_variable(&mut solver, "y");
    let z = boolean_variable(&mut solver, "z");

    let _ = solver.assert_cardinality(
        vec![
            BoolLiteral::new(x, false),
            BoolLiteral::new(y, false),
            BoolLiteral::new(z, false),
        ],
        2,
    );
    let _ = solver.assert_clause(vec![BoolLiteral::new(y, true), BoolLiteral::new(z, true)]);

    assert!(solver.solve() == SolverStatus::Satisfiable);
    assert!(solver.value(x) == BigInt::from(1));
    let num_true = [y, z]
        .iter()
        .filter(|variable| solver.value(**variable) == BigInt::from(1))
        .count();
    assert!(num_true == 1);
}

#[test]
fn test_at_most_k_cardinality_is_respected() {
    //at least 2 of the negations means at most 1 of {x, y, z} is true,
    //while the sum constraint asks for at least one
    let mut solver = new_solver();
    let x = boolean_variable(&mut solver, "x");
    let y = boolean_variable(&mut solver, "y");
    let z = boolean_variable(&mut solver, "z");

    let _ = solver.assert_cardinality(
        vec![
            BoolLiteral::new(x, true),
            BoolLiteral::new(y, true),
            BoolLiteral::new(z, true),
        ],
        2,
    );
    let _ = solver.assert_integer(
        vec![integer_literal(1, x), integer_literal(1, y), integer_literal(1, z)],
        BigInt::from(1),
    );

    assert!(solver.solve() == SolverStatus::Satisfiable);
    let num_true = [x, y, z]
        .iter()
        .filter(|variable| solver.value(**variable) == BigInt::from(1))
        .count();
    assert!(num_true == 1);
}

#[test]
fn test_unbounded_variables_are_handled_through_the_slack() {
    //y has no upper bound; x + y >= 3 with x <= 1 forces y >= 2
    let mut solver = new_solver();
    let x = bounded_variable(&mut solver, "x", 0, 1);
    let y = solver.new_variable(VariableType::Integer, "y");
    solver.set_lower_bound(y, BigInt::from(0));

    let _ = solver.assert_integer(
        vec![integer_literal(1, x), integer_literal(1, y)],
        BigInt::from(3),
    );

    assert!(solver.solve() == SolverStatus::Satisfiable);
    assert!(solver.value(x).clone() + solver.value(y).clone() >= BigInt::from(3));
}

#[test]
fn test_linear_order_finds_the_same_answers() {
    let mut solver = Solver::new(SolverOptions {
        dynamic_order: false,
        check_model: true,
        ..SolverOptions::default()
    });
    let x = bounded_variable(&mut solver, "x", 0, 10);
    let y = bounded_variable(&mut solver, "y", 0, 10);

    let _ = solver.assert_integer(
        vec![integer_literal(2, x), integer_literal(3, y)],
        BigInt::from(4),
    );
    let _ = solver.assert_integer(
        vec![integer_literal(-2, x), integer_literal(3, y)],
        BigInt::from(4),
    );

    assert!(solver.solve() == SolverStatus::Satisfiable);
    let x_value = solver.value(x);
    let y_value = solver.value(y);
    assert!(BigInt::from(2) * &x_value + BigInt::from(3) * &y_value >= BigInt::from(4));
    assert!(BigInt::from(-2) * &x_value + BigInt::from(3) * &y_value >= BigInt::from(4));
}

#[test]
fn test_fourier_motzkin_resolution_stays_sound() {
    let mut solver = Solver::new(SolverOptions {
        try_fourier_motzkin: true,
        check_model: true,
        ..SolverOptions::default()
    });

    let x1 = boolean_variable(&mut solver, "x1");
    let x2 = boolean_variable(&mut solver, "x2");
    for (negate_first, negate_second) in
        [(false, false), (true, false), (false, true), (true, true)]
    {
        let _ = solver.assert_clause(vec![
            BoolLiteral::new(x1, negate_first),
            BoolLiteral::new(x2, negate_second),
        ]);
    }

    assert!(solver.solve() == SolverStatus::Unsatisfiable);
}

#[test]
fn test_default_bound_applies_to_new_variables() {
    let mut solver = Solver::new(SolverOptions {
        default_bound: Some(BigInt::from(4)),
        check_model: true,
        ..SolverOptions::default()
    });
    let x = solver.new_variable(VariableType::Integer, "x");

    assert!(solver.has_lower_bound(x) && solver.has_upper_bound(x));
    assert!(solver.lower_bound(x) == BigInt::from(-4));
    assert!(solver.upper_bound(x) == BigInt::from(4));

    let _ = solver.assert_integer(vec![integer_literal(1, x)], BigInt::from(-2));
    assert!(solver.solve() == SolverStatus::Satisfiable);
    let value = solver.value(x);
    assert!(value >= BigInt::from(-2) && value <= BigInt::from(4));
}

#[test]
fn test_replaced_variables_solve_through_their_slack_pair() {
    //every row over x is rewritten to x+ - x- internally
    let mut solver = Solver::new(SolverOptions {
        replace_vars_with_slacks: true,
        ..SolverOptions::default()
    });
    let x = solver.new_variable(VariableType::Integer, "x");
    let y = solver.new_variable(VariableType::Integer, "y");

    //0 <= x, y <= 1 and x + y >= 1, written as rows
    let rows: [(i64, i64, i64); 5] = [
        (1, 0, 0),
        (-1, 0, -1),
        (0, 1, 0),
        (0, -1, -1),
        (1, 1, 1),
    ];
    for (a, b, c) in rows {
        let mut literals = vec![];
        if a != 0 {
            literals.push(integer_literal(a, x));
        }
        if b != 0 {
            literals.push(integer_literal(b, y));
        }
        let _ = solver.assert_integer(literals, BigInt::from(c));
    }

    assert!(solver.solve() == SolverStatus::Satisfiable);

    //reconstruct the declared values from the slack pairs
    let x_value = solver.value(solver.get_variable_by_name("x_plus").unwrap())
        - solver.value(solver.get_variable_by_name("x_minus").unwrap());
    let y_value = solver.value(solver.get_variable_by_name("y_plus").unwrap())
        - solver.value(solver.get_variable_by_name("y_minus").unwrap());
    assert!(&x_value + &y_value >= BigInt::from(1));
    assert!(x_value >= BigInt::from(0) && x_value <= BigInt::from(1));
    assert!(y_value >= BigInt::from(0) && y_value <= BigInt::from(1));
}

#[test]
fn test_deep_clause_chain_propagates_to_the_end() {
    //x0 and a chain of implications force every variable to 1
    const CHAIN_LENGTH: usize = 20;
    let mut solver = new_solver();
    let variables: Vec<Variable> = (0..CHAIN_LENGTH)
        .map(|i| boolean_variable(&mut solver, &format!("x{}", i)))
        .collect();

    let _ = solver.assert_clause(vec![BoolLiteral::new(variables[0], false)]);
    for i in 1..CHAIN_LENGTH {
        let _ = solver.assert_clause(vec![
            BoolLiteral::new(variables[i - 1], true),
            BoolLiteral::new(variables[i], false),
        ]);
    }

    assert!(solver.solve() == SolverStatus::Satisfiable);
    for variable in variables {
        assert!(solver.value(variable) == BigInt::from(1));
    }
}

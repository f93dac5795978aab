use std::io::Write;

use log::{error, info, LevelFilter};
use num_bigint::BigInt;

use gourd::arguments::ArgumentHandler;
use gourd::engine::{Solver, SolverOptions, SolverStatus, Verbosity};
use gourd::parsers;
use gourd::result::{GourdError, GourdResult};

fn create_argument_handler() -> ArgumentHandler {
    let mut argument_handler = ArgumentHandler::new();

    argument_handler.define_new_category("general", "Input and output of the solver.");
    argument_handler.define_string_argument(
        "file-location",
        "general",
        "The instance to solve; '.cnf' files are read as DIMACS, everything else as the ILP row format.",
        "",
        &[],
    );
    argument_handler.define_string_argument(
        "expected-answer",
        "general",
        "When set, the process exits with a non-zero code unless the reported answer matches.",
        "none",
        &["none", "sat", "unsat"],
    );
    argument_handler.define_string_argument(
        "verbosity",
        "general",
        "How much output to print while solving.",
        "silent",
        &["silent", "basic", "detailed", "extreme"],
    );
    argument_handler.define_bool_argument(
        "print-model",
        "general",
        "Print the satisfying assignment after a sat answer.",
        false,
    );
    argument_handler.define_bool_argument(
        "print-stats",
        "general",
        "Print the solver statistics after solving.",
        false,
    );
    argument_handler.define_bool_argument(
        "omit-timestamp",
        "general",
        "Leave out the timestamp from the log messages.",
        false,
    );
    argument_handler.define_bool_argument(
        "omit-call-site",
        "general",
        "Leave out the call site from the log messages.",
        false,
    );

    argument_handler.define_new_category("search", "Parameters steering the search.");
    argument_handler.define_bool_argument(
        "propagation",
        "search",
        "Disabling propagation is only useful for debugging.",
        true,
    );
    argument_handler.define_string_argument(
        "order",
        "search",
        "The variable-selection strategy.",
        "dynamic",
        &["dynamic", "linear"],
    );
    argument_handler.define_bool_argument(
        "check-model",
        "search",
        "Verify every problem constraint under the final assignment.",
        false,
    );
    argument_handler.define_bool_argument(
        "try-fourier-motzkin",
        "search",
        "Try a plain Fourier-Motzkin resolvent before computing tight cuts.",
        false,
    );
    argument_handler.define_bool_argument(
        "replace-vars-with-slacks",
        "search",
        "Rewrite each declared variable x as the difference of two nonnegative slacks.",
        false,
    );
    argument_handler.define_integer_argument(
        "default-bound",
        "search",
        "Symmetric initial bounds for each new variable; negative means no initial bounds.",
        -1,
        i64::MIN,
        i64::MAX,
    );
    argument_handler.define_integer_argument(
        "bound-estimate",
        "search",
        "Initial lower bound for the global slack variable.",
        0,
        0,
        i64::MAX,
    );

    argument_handler
}

fn parse_verbosity(argument_handler: &ArgumentHandler) -> Verbosity {
    match argument_handler.get_string_argument("verbosity").as_str() {
        "silent" => Verbosity::Silent,
        "basic" => Verbosity::Basic,
        "detailed" => Verbosity::Detailed,
        "extreme" => Verbosity::Extreme,
        verbosity => panic!("Unknown verbosity: {}", verbosity),
    }
}

fn solver_options_from_arguments(argument_handler: &ArgumentHandler) -> SolverOptions {
    let default_bound = argument_handler.get_integer_argument("default-bound");
    SolverOptions {
        propagation: argument_handler.get_bool_argument("propagation"),
        dynamic_order: argument_handler.get_string_argument("order") == "dynamic",
        check_model: argument_handler.get_bool_argument("check-model"),
        try_fourier_motzkin: argument_handler.get_bool_argument("try-fourier-motzkin"),
        replace_vars_with_slacks: argument_handler.get_bool_argument("replace-vars-with-slacks"),
        default_bound: (default_bound >= 0).then(|| BigInt::from(default_bound)),
        bound_estimate: BigInt::from(argument_handler.get_integer_argument("bound-estimate")),
        verbosity: parse_verbosity(argument_handler),
    }
}

fn configure_logging(
    verbosity: Verbosity,
    omit_timestamp: bool,
    omit_call_site: bool,
) -> std::io::Result<()> {
    let level_filter = match verbosity {
        Verbosity::Silent => LevelFilter::Warn,
        Verbosity::Basic => LevelFilter::Info,
        Verbosity::Detailed => LevelFilter::Debug,
        Verbosity::Extreme => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "c ")?;
            if !omit_timestamp {
                write!(buf, "{} ", buf.timestamp())?;
            }
            write!(buf, "{} ", record.level())?;
            if !omit_call_site {
                write!(
                    buf,
                    "[{}:{}] ",
                    record.file().unwrap_or("unknown"),
                    record.line().unwrap_or(0)
                )?;
            }
            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .init();
    info!("Logging successfully configured");
    Ok(())
}

fn print_model(solver: &Solver) {
    for (name, variable) in solver.variables() {
        println!("{} = {}", name, solver.value(*variable));
    }
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(error) => {
            error!("Execution failed, error: {}", error);
            std::process::exit(1);
        }
    }
}

fn run() -> GourdResult<()> {
    let mut argument_handler = create_argument_handler();
    argument_handler.print_help_summary_if_needed_and_exit();
    argument_handler.parse_command_line_arguments();

    let verbosity = parse_verbosity(&argument_handler);
    configure_logging(
        verbosity,
        argument_handler.get_bool_argument("omit-timestamp"),
        argument_handler.get_bool_argument("omit-call-site"),
    )?;

    if verbosity >= Verbosity::Basic {
        argument_handler.print_arguments_different_from_default();
    }

    let file_location = argument_handler.get_string_argument("file-location");
    info!("File location: {file_location}");
    if file_location.is_empty() {
        return Err(GourdError::MissingFileError);
    }

    let mut solver = Solver::new(solver_options_from_arguments(&argument_handler));

    if file_location.ends_with(".cnf") {
        parsers::parse_cnf(&file_location, &mut solver)?;
    } else {
        parsers::parse_ilp(&file_location, &mut solver)?;
    }

    let status = solver.solve();
    println!("{}", status);

    if status == SolverStatus::Satisfiable && argument_handler.get_bool_argument("print-model") {
        print_model(&solver);
    }

    if argument_handler.get_bool_argument("print-stats") {
        println!("{}", solver.statistics());
    }

    match argument_handler.get_string_argument("expected-answer").as_str() {
        "sat" if status != SolverStatus::Satisfiable => Err(GourdError::UnexpectedAnswer),
        "unsat" if status != SolverStatus::Unsatisfiable => Err(GourdError::UnexpectedAnswer),
        _ => Ok(()),
    }
}

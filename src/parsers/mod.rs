mod dimacs;
mod ilp;

pub use dimacs::parse_cnf;
pub use ilp::parse_ilp;

mod argument_handler;

pub use argument_handler::ArgumentHandler;

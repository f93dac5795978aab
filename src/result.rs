use thiserror::Error;

pub type GourdResult<T> = Result<T, GourdError>;

#[derive(Error, Debug)]
pub enum GourdError {
    #[error("Parse error at line {0}: {1}")]
    ParseError(usize, String),
    #[error("IO error, more details: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Failed to read file {1}, more details: {0}")]
    FileReadingError(std::io::Error, String),
    #[error("The supplied file format is not supported.")]
    InvalidInstanceFile,
    #[error("No file location given")]
    MissingFileError,
    #[error("The reported answer does not match the expected answer.")]
    UnexpectedAnswer,
}

use thiserror::Error;

/// Errors raised by the sequence and table demos.
#[derive(Debug, Error, PartialEq)]
pub enum DemoError {
    /// A column minimum of zero makes the max/min ratio undefined.
    #[error("column {column} has a minimum of zero; max/min ratio is undefined")]
    DivideByZero { column: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl DemoError {
    pub fn invalid(message: impl Into<String>) -> Self {
        DemoError::InvalidInput(message.into())
    }
}

pub type DemoResult<T> = Result<T, DemoError>;

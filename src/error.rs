use thiserror::Error;

#[derive(Error, Debug)]
pub enum SskError {
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),
}

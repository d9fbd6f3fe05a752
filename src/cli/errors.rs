use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid element width: {width}. Must be 2, 4 or 8")]
    InvalidWidth { width: usize },

    #[error("File size {size} of {path} is not a multiple of element width {width}")]
    UnalignedFile {
        path: String,
        size: u64,
        width: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Reader error: {0}")]
    Reader(#[from] eopr::Error),
}

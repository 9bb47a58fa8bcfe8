use thiserror::Error;

/// Errors raised while reading an HWPX package and decoding its parts.
#[derive(Error, Debug)]
pub enum HwpxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed XML in part {part}: {message}")]
    MalformedPart { part: String, message: String },

    #[error("missing required part: {0}")]
    MissingPart(String),
}

impl HwpxError {
    pub fn malformed(part: &str, message: impl std::fmt::Display) -> Self {
        Self::MalformedPart {
            part: part.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HwpxError>;

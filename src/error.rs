use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubcorrectError {
    #[error("line {line}: could not parse '{text}' as a subtitle number")]
    MalformedIndex { line: usize, text: String },

    #[error("line {line}: '{text}' is not a valid timing line")]
    MalformedTiming { line: usize, text: String },

    #[error("line {line}: could not parse '{field}' as a time code")]
    UnparsableTimeCode { line: usize, field: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("illegal session state: {0}")]
    IllegalSessionState(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("input channel was closed while waiting for an answer")]
    InputClosed,

    #[error("'{}' already exists and overwriting was not requested", .0.display())]
    TargetExists(PathBuf),

    #[error("unsupported character encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl SubcorrectError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        SubcorrectError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubcorrectError>;

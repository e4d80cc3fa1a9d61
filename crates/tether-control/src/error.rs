use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Hard failures. Soft conditions travel as [`crate::Warning`] instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("shell channel is not connected")]
    NotConnected,

    #[error("command requires sudo but no sudo password is configured")]
    MissingCredential,

    #[error("failed to execute: {command}")]
    ExecutionFailed { command: String },

    #[error("there was no answer from the shell")]
    NoAnswer,

    #[error("the path {path} does not exist")]
    NotFoundFile { path: String },

    #[error("the {file} file must be of the .{extension} type")]
    BadFileType { file: String, extension: String },

    #[error("invalid command template: {0}")]
    InvalidTemplate(String),

    #[error("invalid prompt pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("shell channel error: {0}")]
    Channel(String),
}

impl Error {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotConnected => "not_connected",
            Error::MissingCredential => "missing_credential",
            Error::ExecutionFailed { .. } => "execution_failed",
            Error::NoAnswer => "no_answer",
            Error::NotFoundFile { .. } => "not_found_file",
            Error::BadFileType { .. } => "bad_file_type",
            Error::InvalidTemplate(_) => "invalid_template",
            Error::InvalidPattern(_) => "invalid_pattern",
            Error::Channel(_) => "channel",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Channel(err.to_string())
    }
}

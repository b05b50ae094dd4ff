use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Every failure the helper can report, on either side of the HTTP boundary.
///
/// `Display` is the text a caller sees in the response body, so the variants
/// carry captured subprocess output verbatim instead of summarizing it.
#[derive(Debug, Error)]
pub enum HelperError {
    #[error("{message}, Output:{output}")]
    CommandFailed { message: String, output: String },

    #[error("save error: {output}")]
    SaveFailed { output: String },

    #[error("failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("missing request field `{0}`")]
    MissingField(&'static str),

    #[error("invalid `{field}` value {value:?}: {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error(
        "short read from {}: expected {expected} bytes at offset {start}, got {actual}",
        .path.display()
    )]
    ShortRead {
        path: PathBuf,
        start: u64,
        expected: usize,
        actual: usize,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("create dir {} encountered error", .dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("runtime home is not configured; set ACCEL_RUNTIME_HOME or JAVA_HOME")]
    MissingRuntimeHome,

    #[error("helper reported failure: {0}")]
    Remote(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl HelperError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn invalid_field(
        field: &'static str,
        value: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Renders the error followed by its `source()` chain, outermost first.
    pub fn cause_chain(&self) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = StdError::source(self);
        while let Some(cause) = current {
            chain.push(cause.to_string());
            current = cause.source();
        }
        chain
    }
}

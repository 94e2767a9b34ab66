//! Error types for the JTL decoder.

use thiserror::Error;

/// Result type alias for JTL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while sniffing or decoding a JTL source.
///
/// All variants are fatal to the decode in progress: a `Records` iterator
/// stops after yielding one of them.
#[derive(Debug, Error)]
pub enum Error {
    /// The source could not be opened or read.
    #[error("I/O error: {0}")]
    ResourceAccess(#[from] std::io::Error),

    /// The source encoding could not be determined, or the decoder options
    /// cannot be honoured.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The source is not well-formed, or a numeric field holds non-numeric content.
    #[error("Malformed source: {0}")]
    MalformedSource(String),
}

impl Error {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedSource(msg.into())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(io) => {
                // quick-xml shares the io error behind an Arc
                Error::ResourceAccess(std::io::Error::new(io.kind(), io.to_string()))
            }
            other => Error::MalformedSource(other.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::MalformedSource(format!("bad attribute: {}", err))
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            match err.into_kind() {
                csv::ErrorKind::Io(io) => Error::ResourceAccess(io),
                other => Error::MalformedSource(format!("{:?}", other)),
            }
        } else {
            Error::MalformedSource(err.to_string())
        }
    }
}

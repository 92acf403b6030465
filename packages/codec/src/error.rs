//! Codec errors.

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("line {line} has no '=' delimiter: {content:?}")]
    MalformedEntry { line: usize, content: String },

    #[error("variables file is not valid UTF-8: {source}")]
    InvalidUtf8 {
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },
}

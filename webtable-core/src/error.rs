use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: &'static str },

    #[error("Malformed row key '{key}': {reason}")]
    MalformedRowKey { key: String, reason: &'static str },

    #[error("Malformed column '{column}': {reason}")]
    MalformedColumn { column: String, reason: &'static str },
}

impl Error {
    pub(crate) fn malformed(url: &str, reason: &'static str) -> Self {
        Error::MalformedUrl {
            url: url.to_string(),
            reason,
        }
    }

    pub(crate) fn malformed_key(key: &str, reason: &'static str) -> Self {
        Error::MalformedRowKey {
            key: key.to_string(),
            reason,
        }
    }

    pub(crate) fn malformed_column(column: &str, reason: &'static str) -> Self {
        Error::MalformedColumn {
            column: column.to_string(),
            reason,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

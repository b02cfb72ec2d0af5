//! Error types for lifebook operations.

use thiserror::Error;

/// Errors that can occur while building or exporting a book.
///
/// Problems with a single item (an image that will not decode, a character
/// the PDF encoding cannot represent) are never reported here: the exporter
/// skips the item and keeps going.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("a book needs at least one story")]
    EmptyBook,

    #[error("unknown format style: {0:?} (expected interview, biography or narrative)")]
    UnknownFormatStyle(String),

    #[error("unknown cover choice: {0:?} (expected simple or uploaded)")]
    UnknownCoverChoice(String),

    #[error("unknown export format: {0:?}")]
    UnknownFormat(String),

    #[error("{format} export is not available in this build")]
    Unavailable {
        format: &'static str,
        feature: &'static str,
    },
}

impl Error {
    /// Whether this error comes from how the crate was built rather than
    /// from the book being exported.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Unavailable { .. })
    }

    /// Installation hint to show alongside a configuration error.
    pub fn hint(&self) -> Option<String> {
        match self {
            Error::Unavailable { feature, .. } => Some(format!(
                "rebuild lifebook with `--features {feature}` to enable this format"
            )),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_configuration_error() {
        let err = Error::Unavailable {
            format: "PDF",
            feature: "pdf",
        };
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "PDF export is not available in this build");
        assert!(err.hint().unwrap().contains("--features pdf"));
    }

    #[test]
    fn test_contract_errors_have_no_hint() {
        assert!(!Error::EmptyBook.is_configuration());
        assert!(Error::EmptyBook.hint().is_none());
        assert!(
            Error::UnknownFormatStyle("memoir".into())
                .to_string()
                .contains("\"memoir\"")
        );
    }
}

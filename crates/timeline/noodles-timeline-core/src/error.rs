//! Errors and load diagnostics for timeline documents.

use thiserror::Error;

/// Fatal problems reading a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Recoverable problem met while loading; the offending element is skipped.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LoadIssue {
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: String },
    #[error("<{element}> has invalid {attribute}='{value}'")]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
    },
    #[error("unexpected <{found}> inside <{parent}>")]
    UnexpectedElement { parent: String, found: String },
    #[error("wrong root element '{found}'")]
    WrongRoot { found: String },
}

impl LoadIssue {
    pub(crate) fn missing(element: &str, attribute: &str) -> Self {
        Self::MissingAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
        }
    }

    pub(crate) fn invalid(element: &str, attribute: &str, value: &str) -> Self {
        Self::InvalidAttribute {
            element: element.to_string(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }
}

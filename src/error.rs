use thiserror::Error;

#[derive(Debug, Error)]
pub enum SvgPenError {
    #[error("malformed markup: {0}")]
    MalformedMarkup(String),
    #[error("malformed value for `{attribute}` on <{element}>: {message}")]
    MalformedAttributeValue {
        element: String,
        attribute: String,
        message: String,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("raster error: {0}")]
    Raster(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SvgPenError {
    pub(crate) fn markup(message: impl Into<String>) -> Self {
        SvgPenError::MalformedMarkup(message.into())
    }

    pub(crate) fn attribute(
        element: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SvgPenError::MalformedAttributeValue {
            element: element.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Re-labels an attribute error raised by a helper that did not know which
    /// element and attribute it was parsing for.
    pub(crate) fn locate(self, element: &str, attribute: &str) -> Self {
        match self {
            SvgPenError::MalformedAttributeValue { message, .. } => {
                SvgPenError::MalformedAttributeValue {
                    element: element.to_string(),
                    attribute: attribute.to_string(),
                    message,
                }
            }
            other => other,
        }
    }
}

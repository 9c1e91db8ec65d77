use std::fmt;

/// Terminal failures of a single analysis request.
///
/// The `Display` output is the user-visible message stored by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Image could not be read or is not a supported image payload
    CannotProcessImage,

    /// The classifier call itself failed
    Classifier(String),

    /// The classifier succeeded but returned no observations
    NoResults,

    /// Another analysis is still in flight for this session
    Busy,
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::CannotProcessImage => write!(f, "cannot process image"),
            AnalysisError::Classifier(detail) => write!(f, "analysis error: {}", detail),
            AnalysisError::NoResults => write!(f, "no results found"),
            AnalysisError::Busy => write!(f, "analysis already in progress"),
        }
    }
}

impl std::error::Error for AnalysisError {}

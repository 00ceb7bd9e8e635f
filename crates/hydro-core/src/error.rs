use thiserror::Error;

/// Failure of a single call against the issue tracker.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    #[error("tracker returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("issue not found: {0}")]
    NotFound(String),

    #[error("tracker unreachable: {0}")]
    Transport(String),

    #[error("unexpected tracker payload: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum HydroError {
    #[error("{0}")]
    Validation(String),

    #[error("link type '{0}' does not exist in the tracker")]
    MissingLinkType(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Tracker(TrackerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<TrackerError> for HydroError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::NotFound(key) => HydroError::NotFound(key),
            other => HydroError::Tracker(other),
        }
    }
}

impl HydroError {
    /// True for failures raised before any mutation because a precondition
    /// did not hold.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            HydroError::Validation(_) | HydroError::MissingLinkType(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HydroError>;
pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_not_found_becomes_hydro_not_found() {
        let err: HydroError = TrackerError::NotFound("CH-1".into()).into();
        assert!(matches!(err, HydroError::NotFound(ref k) if k == "CH-1"));
    }

    #[test]
    fn missing_link_type_is_a_validation_failure() {
        assert!(HydroError::MissingLinkType("blocks".into()).is_validation());
        assert!(!HydroError::Config("x".into()).is_validation());
    }
}

//! Error kinds surfaced by the job core.

use std::path::PathBuf;

use crate::fetcher::FetchError;

/// Errors raised at submission, query, or inside a dispatched job.
///
/// `Validation` and `NotFound` reach clients directly. `Resource` and
/// `Collaborator` only ever happen on a worker and are recorded into the job.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Rejected input (empty URL list, unknown preset, malformed URL).
    #[error("{0}")]
    Validation(String),

    /// Unknown job id or missing output file.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Output directory could not be created or written.
    #[error("output directory {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The media fetcher failed.
    #[error(transparent)]
    Collaborator(#[from] FetchError),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            CoreError::validation("No URL provided").to_string(),
            "No URL provided"
        );
        assert_eq!(
            CoreError::not_found("job", "abc").to_string(),
            "job abc not found"
        );
        let err = CoreError::Resource {
            path: PathBuf::from("/nope"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "output directory /nope: denied");
    }
}
